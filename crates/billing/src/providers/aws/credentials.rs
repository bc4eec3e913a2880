//! Credential material and STS role assumption.
//!
//! Keys are read from the conventional environment variables; cross-account
//! access assumes a role through the STS Query API with a bounded session.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::providers::traits::BillingError;

/// Session name attached to assumed-role sessions
const ROLE_SESSION_NAME: &str = "costbook-report";

/// Lifetime of assumed-role sessions, in seconds
const SESSION_DURATION_SECS: u32 = 1800;

/// Role name used when deriving a per-account role ARN
pub const DEFAULT_ROLE_NAME: &str = "OrganizationAccountAccessRole";

/// A set of AWS credential material
#[derive(Debug, Clone)]
pub struct AccessKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present only for temporary (assumed-role) sessions
    pub session_token: Option<String>,
}

impl AccessKeys {
    /// Create static keys without a session token
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read keys from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    ///
    /// Picks up `AWS_SESSION_TOKEN` as well when the environment already
    /// carries a temporary session.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Config`] when either required variable is
    /// missing.
    pub fn from_env() -> Result<Self, BillingError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| BillingError::Config("AWS_ACCESS_KEY_ID not set".to_string()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| BillingError::Config("AWS_SECRET_ACCESS_KEY not set".to_string()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

/// Build the fixed-pattern cross-account role ARN for an account
#[must_use]
pub fn role_arn_for_account(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{account_id}:role/{role_name}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleEnvelope {
    assume_role_response: AssumeRoleResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    assume_role_result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: SessionCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsErrorEnvelope {
    #[serde(default)]
    error: StsErrorBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Assume a role and return its temporary keys
///
/// # Errors
///
/// Returns [`BillingError::Auth`] when STS denies the assumption and
/// [`BillingError::Api`] for other failures.
pub async fn assume_role(
    client: &Client,
    endpoint: &str,
    base: &AccessKeys,
    role_arn: &str,
) -> Result<AccessKeys, BillingError> {
    debug!(role_arn = %role_arn, endpoint = %endpoint, "Assuming role");

    let duration = SESSION_DURATION_SECS.to_string();
    let mut request = client
        .post(endpoint)
        .query(&[
            ("Action", "AssumeRole"),
            ("Version", "2011-06-15"),
            ("RoleArn", role_arn),
            ("RoleSessionName", ROLE_SESSION_NAME),
            ("DurationSeconds", duration.as_str()),
        ])
        .header("Accept", "application/json")
        .header(
            "X-Amz-Date",
            chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
        );
    if let Some(token) = &base.session_token {
        request = request.header("X-Amz-Security-Token", token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let parsed: StsErrorEnvelope = serde_json::from_str(&body).unwrap_or_default();
        let message = if parsed.error.message.is_empty() {
            body
        } else {
            parsed.error.message
        };
        if status.as_u16() == 403 || parsed.error.code == "AccessDenied" {
            return Err(BillingError::Auth(format!(
                "could not assume {role_arn}: {message}"
            )));
        }
        return Err(BillingError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: AssumeRoleEnvelope = serde_json::from_str(&body)?;
    let session = envelope.assume_role_response.assume_role_result.credentials;
    info!(role_arn = %role_arn, "Assumed role");

    Ok(AccessKeys {
        access_key_id: session.access_key_id,
        secret_access_key: session.secret_access_key,
        session_token: Some(session.session_token),
    })
}
