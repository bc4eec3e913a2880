//! AWS Cost Explorer API client.
//!
//! Speaks the service's `x-amz-json-1.1` protocol against the regional
//! `ce.<region>.amazonaws.com` endpoint. SigV4 signing is handled by the
//! deployment's signing proxy; this client forwards session tokens when
//! present.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use super::credentials::{assume_role, role_arn_for_account, AccessKeys, DEFAULT_ROLE_NAME};
use super::models::{
    AwsErrorBody, GetCostAndUsageRequest, GetCostAndUsageResponse, GroupDefinition, MetricValue,
    ResultByTime, TimePeriod,
};
use crate::period::BillingPeriod;
use crate::providers::{BillingClient, BillingError, ClientBroker, PeriodCost, ServiceCost};

const COST_AND_USAGE_TARGET: &str = "AWSInsightsIndexService.GetCostAndUsage";
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const BLENDED_COST: &str = "BlendedCost";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// AWS Cost Explorer billing client for one credential context.
#[derive(Debug, Clone)]
pub struct CostExplorer {
    client: Client,
    keys: AccessKeys,
    endpoint: String,
}

impl CostExplorer {
    /// Create a new Cost Explorer client for a region.
    ///
    /// # Errors
    ///
    /// Returns an error when the keys or region are empty, or the HTTP
    /// client cannot be constructed.
    pub fn new(keys: AccessKeys, region: &str) -> Result<Self, BillingError> {
        Self::with_http(http_client()?, keys, region)
    }

    /// Create a client that reads keys from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when `AWS_ACCESS_KEY_ID` or `AWS_SECRET_ACCESS_KEY`
    /// is not set.
    pub fn from_env(region: &str) -> Result<Self, BillingError> {
        Self::new(AccessKeys::from_env()?, region)
    }

    fn with_http(client: Client, keys: AccessKeys, region: &str) -> Result<Self, BillingError> {
        if keys.access_key_id.is_empty() {
            return Err(BillingError::Auth(
                "AWS access key id is required".to_string(),
            ));
        }
        if region.is_empty() {
            return Err(BillingError::Config("region is required".to_string()));
        }
        Ok(Self {
            client,
            keys,
            endpoint: format!("https://ce.{region}.amazonaws.com"),
        })
    }

    /// Override the API endpoint, used by tests against a local server.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Make a `GetCostAndUsage` call.
    async fn get_cost_and_usage(
        &self,
        request: &GetCostAndUsageRequest,
    ) -> Result<GetCostAndUsageResponse, BillingError> {
        debug!(
            endpoint = %self.endpoint,
            start = %request.time_period.start,
            end = %request.time_period.end,
            "Making Cost Explorer request"
        );

        let mut call = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", COST_AND_USAGE_TARGET)
            .header("Content-Type", AMZ_JSON_CONTENT_TYPE)
            .header(
                "X-Amz-Date",
                chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
            )
            .json(request);
        if let Some(token) = &self.keys.session_token {
            call = call.header("X-Amz-Security-Token", token);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &error_text));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| {
            warn!(error = %error, "Unparseable Cost Explorer response");
            BillingError::Serialization(error)
        })
    }

    /// Build the request body for a period.
    fn request_body(period: &BillingPeriod, by_service: bool) -> GetCostAndUsageRequest {
        GetCostAndUsageRequest {
            time_period: TimePeriod {
                start: period.start.format("%Y-%m-%d").to_string(),
                end: period.end.format("%Y-%m-%d").to_string(),
            },
            granularity: "MONTHLY".to_string(),
            metrics: vec![BLENDED_COST.to_string()],
            group_by: by_service.then(|| {
                vec![GroupDefinition {
                    kind: "DIMENSION".to_string(),
                    key: "SERVICE".to_string(),
                }]
            }),
        }
    }
}

#[async_trait]
impl BillingClient for CostExplorer {
    fn name(&self) -> &str {
        "aws-cost-explorer"
    }

    #[instrument(skip(self), fields(provider = "aws-cost-explorer"))]
    async fn blended_costs(
        &self,
        period: &BillingPeriod,
    ) -> Result<Vec<PeriodCost>, BillingError> {
        let request = Self::request_body(period, false);
        let response = self.get_cost_and_usage(&request).await?;
        response.results_by_time.iter().map(to_period_cost).collect()
    }

    #[instrument(skip(self), fields(provider = "aws-cost-explorer"))]
    async fn blended_costs_by_service(
        &self,
        period: &BillingPeriod,
    ) -> Result<Vec<ServiceCost>, BillingError> {
        let request = Self::request_body(period, true);
        let response = self.get_cost_and_usage(&request).await?;

        let mut costs = Vec::new();
        for bucket in &response.results_by_time {
            costs.extend(to_service_costs(bucket)?);
        }
        Ok(costs)
    }
}

/// One shared credential context for every account.
///
/// Used when the configured profile can already read billing data for all
/// roster accounts, e.g. an organization payer account.
#[derive(Debug, Clone)]
pub struct ProfileBroker {
    client: Arc<CostExplorer>,
}

impl ProfileBroker {
    /// Create a broker that reuses one client across accounts.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be constructed.
    pub fn new(keys: AccessKeys, region: &str) -> Result<Self, BillingError> {
        Ok(Self::from_client(CostExplorer::new(keys, region)?))
    }

    /// Wrap an already-configured client.
    #[must_use]
    pub fn from_client(client: CostExplorer) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl ClientBroker for ProfileBroker {
    async fn client_for(&self, _account_id: &str) -> Result<Arc<dyn BillingClient>, BillingError> {
        let client: Arc<dyn BillingClient> = self.client.clone();
        Ok(client)
    }
}

/// Assumes a cross-account role before handing out each scoped client.
#[derive(Debug, Clone)]
pub struct RoleBroker {
    http: Client,
    base: AccessKeys,
    region: String,
    role_name: String,
    sts_endpoint: String,
    billing_endpoint: Option<String>,
}

impl RoleBroker {
    /// Create a broker that assumes `OrganizationAccountAccessRole` in each
    /// account.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(base: AccessKeys, region: &str) -> Result<Self, BillingError> {
        if region.is_empty() {
            return Err(BillingError::Config("region is required".to_string()));
        }
        Ok(Self {
            http: http_client()?,
            base,
            region: region.to_string(),
            role_name: DEFAULT_ROLE_NAME.to_string(),
            sts_endpoint: format!("https://sts.{region}.amazonaws.com"),
            billing_endpoint: None,
        })
    }

    /// Use a different role name when deriving per-account ARNs.
    #[must_use]
    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = role_name.into();
        self
    }

    /// Override the STS endpoint, used by tests.
    #[must_use]
    pub fn with_sts_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sts_endpoint = endpoint.into();
        self
    }

    /// Override the Cost Explorer endpoint of built clients, used by tests.
    #[must_use]
    pub fn with_billing_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.billing_endpoint = Some(endpoint.into());
        self
    }

    /// Assume an explicit role ARN and return a client scoped to it.
    ///
    /// # Errors
    ///
    /// Returns an error when STS rejects the assumption or the scoped
    /// client cannot be constructed.
    pub async fn scoped_to_arn(
        &self,
        role_arn: &str,
    ) -> Result<Arc<dyn BillingClient>, BillingError> {
        let session = assume_role(&self.http, &self.sts_endpoint, &self.base, role_arn).await?;
        let mut client = CostExplorer::with_http(self.http.clone(), session, &self.region)?;
        if let Some(endpoint) = &self.billing_endpoint {
            client = client.with_endpoint(endpoint);
        }
        Ok(Arc::new(client))
    }
}

#[async_trait]
impl ClientBroker for RoleBroker {
    async fn client_for(&self, account_id: &str) -> Result<Arc<dyn BillingClient>, BillingError> {
        let role_arn = role_arn_for_account(account_id, &self.role_name);
        self.scoped_to_arn(&role_arn).await
    }
}

fn http_client() -> Result<Client, BillingError> {
    Client::builder()
        .user_agent("costbook/0.1.0")
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(BillingError::Http)
}

/// Map a non-success response onto the error taxonomy.
fn classify_error(status: StatusCode, body: &str) -> BillingError {
    let parsed: AwsErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        body.to_string()
    } else {
        parsed.message
    };

    if parsed.kind.ends_with("AccessDeniedException")
        || parsed.kind.ends_with("UnrecognizedClientException")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        BillingError::Auth(message)
    } else if parsed.kind.ends_with("ThrottlingException")
        || parsed.kind.ends_with("LimitExceededException")
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        BillingError::Throttled(message)
    } else if parsed.kind.ends_with("ValidationException")
        || parsed.kind.ends_with("DataUnavailableException")
    {
        BillingError::InvalidRequest(message)
    } else {
        BillingError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Parse the API's string amount, rounded to two decimal places.
fn parse_amount(raw: &str) -> Result<f64, BillingError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| BillingError::MalformedResponse(format!("unparseable amount '{raw}'")))?;
    Ok((value * 100.0).round() / 100.0)
}

fn bucket_period(time_period: &TimePeriod) -> Result<BillingPeriod, BillingError> {
    let parse = |raw: &str| {
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            BillingError::MalformedResponse(format!("unparseable bucket date '{raw}'"))
        })
    };
    Ok(BillingPeriod {
        start: parse(&time_period.start)?,
        end: parse(&time_period.end)?,
    })
}

fn blended_metric<'a>(
    metrics: &'a std::collections::HashMap<String, MetricValue>,
    context: &TimePeriod,
) -> Result<&'a MetricValue, BillingError> {
    metrics.get(BLENDED_COST).ok_or_else(|| {
        BillingError::MalformedResponse(format!(
            "bucket {}..{} has no {BLENDED_COST} metric",
            context.start, context.end
        ))
    })
}

fn to_period_cost(bucket: &ResultByTime) -> Result<PeriodCost, BillingError> {
    let metric = blended_metric(&bucket.total, &bucket.time_period)?;
    Ok(PeriodCost {
        period: bucket_period(&bucket.time_period)?,
        amount: parse_amount(&metric.amount)?,
        unit: metric.unit.clone(),
        estimated: bucket.estimated,
    })
}

fn to_service_costs(bucket: &ResultByTime) -> Result<Vec<ServiceCost>, BillingError> {
    let period = bucket_period(&bucket.time_period)?;
    bucket
        .groups
        .iter()
        .map(|group| {
            let metric = blended_metric(&group.metrics, &bucket.time_period)?;
            Ok(ServiceCost {
                service: group.keys.first().cloned().unwrap_or_default(),
                amount: parse_amount(&metric.amount)?,
                unit: metric.unit.clone(),
                period,
            })
        })
        .collect()
}
