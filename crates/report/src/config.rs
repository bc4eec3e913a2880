//! Run configuration, resolved once at startup.

use std::sync::Arc;

use anyhow::{bail, Result};
use costbook_billing::providers::{
    AccessKeys, BillingClient, ClientBroker, CostExplorer, ProfileBroker, RoleBroker,
};

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_REGION: &str = "eu-west-2";
pub const DEFAULT_WORKBOOK: &str = "costbook";
pub const DEFAULT_ROSTER: &str = "accounts.csv";

/// How account-scoped billing clients get their credentials.
#[derive(Debug, Clone)]
pub enum AccessMode {
    /// Assume this role in each roster account (the default).
    AssumeRole { role_name: String },
    /// Use the profile credentials directly for every account.
    Direct,
}

/// Credential context shared by every run mode.
///
/// The profile is a logging label for the session; the actual keys come
/// from the conventional environment variables.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: String,
    pub region: String,
    pub access: AccessMode,
}

impl RunConfig {
    /// Check the fields no run can start without.
    ///
    /// # Errors
    ///
    /// Returns an error on an empty profile, region, or role name. These
    /// are configuration faults, fatal before anything is fetched.
    pub fn validate(&self) -> Result<()> {
        if self.profile.trim().is_empty() {
            bail!("profile must not be empty");
        }
        if self.region.trim().is_empty() {
            bail!("region must not be empty");
        }
        if let AccessMode::AssumeRole { role_name } = &self.access {
            if role_name.trim().is_empty() {
                bail!("role name must not be empty");
            }
        }
        Ok(())
    }

    /// Build the per-account broker this config calls for.
    ///
    /// # Errors
    ///
    /// Returns an error when the environment carries no keys or the HTTP
    /// client cannot be constructed.
    pub fn broker(&self) -> Result<Box<dyn ClientBroker>> {
        let keys = AccessKeys::from_env()?;
        match &self.access {
            AccessMode::AssumeRole { role_name } => Ok(Box::new(
                RoleBroker::new(keys, &self.region)?.with_role_name(role_name),
            )),
            AccessMode::Direct => Ok(Box::new(ProfileBroker::new(keys, &self.region)?)),
        }
    }

    /// One client for the modes that are not per-account: the profile
    /// credentials directly, or an explicitly assumed role ARN.
    ///
    /// # Errors
    ///
    /// Returns an error when keys are missing or the role assumption is
    /// rejected.
    pub async fn single_client(&self, role_arn: Option<&str>) -> Result<Arc<dyn BillingClient>> {
        let keys = AccessKeys::from_env()?;
        match role_arn {
            Some(arn) => {
                let broker = RoleBroker::new(keys, &self.region)?;
                Ok(broker.scoped_to_arn(arn).await?)
            }
            None => Ok(Arc::new(CostExplorer::new(keys, &self.region)?)),
        }
    }
}

/// Validate a name that becomes `<name>.csv` inside the workbook.
///
/// # Errors
///
/// Returns an error for empty names and anything that would escape the
/// workbook directory.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("sheet name must not be empty");
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        bail!("sheet name '{name}' must not contain path separators");
    }
    Ok(())
}
