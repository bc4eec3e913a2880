//! Cost Explorer API data models.
//!
//! Wire shapes for the `x-amz-json-1.1` `GetCostAndUsage` call. Field names
//! follow the service's PascalCase convention via serde renames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `GetCostAndUsage` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetCostAndUsageRequest {
    /// Half-open date range in `YYYY-MM-DD` form
    pub time_period: TimePeriod,
    /// Bucket width, always `MONTHLY` for this tool
    pub granularity: String,
    /// Requested metrics, always `BlendedCost` for this tool
    pub metrics: Vec<String>,
    /// Optional grouping dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<GroupDefinition>>,
}

/// Date range in the API's string form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimePeriod {
    pub start: String,
    pub end: String,
}

/// One grouping dimension of a request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupDefinition {
    #[serde(rename = "Type")]
    pub kind: String,
    pub key: String,
}

/// `GetCostAndUsage` response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetCostAndUsageResponse {
    #[serde(default)]
    pub results_by_time: Vec<ResultByTime>,
}

/// One time bucket of a response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: TimePeriod,
    /// Metric totals for the bucket, keyed by metric name
    #[serde(default)]
    pub total: HashMap<String, MetricValue>,
    /// Per-dimension results, present when the request grouped
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Whether the bucket is still an estimate
    #[serde(default)]
    pub estimated: bool,
}

/// Amount/unit pair for one metric
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    /// Decimal amount as a string, e.g. "1234.5670000000"
    pub amount: String,
    pub unit: String,
}

/// Results for one dimension value inside a bucket
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    /// Dimension values, a single service name for SERVICE grouping
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub metrics: HashMap<String, MetricValue>,
}

/// Error body returned by `x-amz-json-1.1` endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsErrorBody {
    /// Fault type, e.g. `com.amazonaws...#AccessDeniedException`
    #[serde(rename = "__type", default)]
    pub kind: String,
    #[serde(rename = "Message", alias = "message", default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_pascal_case() {
        let request = GetCostAndUsageRequest {
            time_period: TimePeriod {
                start: "2022-04-01".to_string(),
                end: "2022-05-01".to_string(),
            },
            granularity: "MONTHLY".to_string(),
            metrics: vec!["BlendedCost".to_string()],
            group_by: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["TimePeriod"]["Start"], "2022-04-01");
        assert_eq!(json["Granularity"], "MONTHLY");
        assert_eq!(json["Metrics"][0], "BlendedCost");
        assert!(json.get("GroupBy").is_none());
    }

    #[test]
    fn test_group_by_serializes_type_key() {
        let request = GetCostAndUsageRequest {
            time_period: TimePeriod {
                start: "2022-04-01".to_string(),
                end: "2022-05-01".to_string(),
            },
            granularity: "MONTHLY".to_string(),
            metrics: vec!["BlendedCost".to_string()],
            group_by: Some(vec![GroupDefinition {
                kind: "DIMENSION".to_string(),
                key: "SERVICE".to_string(),
            }]),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["GroupBy"][0]["Type"], "DIMENSION");
        assert_eq!(json["GroupBy"][0]["Key"], "SERVICE");
    }

    #[test]
    fn test_response_deserializes_totals_and_groups() {
        let body = r#"{
            "ResultsByTime": [{
                "TimePeriod": {"Start": "2022-04-01", "End": "2022-05-01"},
                "Total": {"BlendedCost": {"Amount": "1234.5670000000", "Unit": "USD"}},
                "Groups": [{
                    "Keys": ["Amazon Elastic Compute Cloud - Compute"],
                    "Metrics": {"BlendedCost": {"Amount": "200.25", "Unit": "USD"}}
                }],
                "Estimated": true
            }]
        }"#;

        let response: GetCostAndUsageResponse = serde_json::from_str(body).unwrap();
        let bucket = &response.results_by_time[0];
        assert_eq!(bucket.time_period.start, "2022-04-01");
        assert_eq!(bucket.total["BlendedCost"].amount, "1234.5670000000");
        assert_eq!(
            bucket.groups[0].keys[0],
            "Amazon Elastic Compute Cloud - Compute"
        );
        assert!(bucket.estimated);
    }

    #[test]
    fn test_error_body_tolerates_missing_fields() {
        let parsed: AwsErrorBody = serde_json::from_str("{}").unwrap();
        assert!(parsed.kind.is_empty());
        assert!(parsed.message.is_empty());

        let parsed: AwsErrorBody = serde_json::from_str(
            r#"{"__type": "com.amazonaws.ce#ThrottlingException", "Message": "slow down"}"#,
        )
        .unwrap();
        assert!(parsed.kind.ends_with("ThrottlingException"));
        assert_eq!(parsed.message, "slow down");
    }
}
