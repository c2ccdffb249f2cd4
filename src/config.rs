//! Switch Configuration
//!
//! Loads the containment policy document from the switch config file:
//!
//! ```json
//! {
//!   "switchConfigVersion": "1.0",
//!   "switchPolicies": { "scpPolicy": { "Version": "2012-10-17", "Statement": [] } }
//! }
//! ```
//!
//! The policy document is kept as raw JSON text and never interpreted.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::path::PathBuf;
use tracing::debug;

use crate::error::KillSwitchError;

/// Default config file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "switch.conf";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchConfig {
    switch_config_version: String,
    switch_policies: SwitchPolicies,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchPolicies {
    scp_policy: Option<Box<RawValue>>,
}

/// Opaque SCP document text, transmitted as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainmentPolicyDocument {
    content: String,
    config_version: String,
}

impl ContainmentPolicyDocument {
    pub fn new(content: impl Into<String>, config_version: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            config_version: config_version.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn config_version(&self) -> &str {
        &self.config_version
    }

    /// Parse a switch config body
    pub fn from_config_str(source_name: &str, body: &str) -> Result<Self, KillSwitchError> {
        let config: SwitchConfig =
            serde_json::from_str(body).map_err(|e| KillSwitchError::Config {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;

        // `"scpPolicy": null` deserializes to None
        let policy = config
            .switch_policies
            .scp_policy
            .ok_or_else(|| KillSwitchError::Config {
                source_name: source_name.to_string(),
                reason: "switchPolicies.scpPolicy is missing".to_string(),
            })?;

        Ok(Self::new(policy.get(), config.switch_config_version))
    }
}

/// Source of the containment policy document
#[async_trait]
pub trait ContainmentPolicySource: Send + Sync {
    /// Name used in error messages and logs
    fn name(&self) -> String;

    async fn load(&self) -> Result<ContainmentPolicyDocument, KillSwitchError>;
}

/// Reads the switch config from a file on every load
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileConfigSource {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

#[async_trait]
impl ContainmentPolicySource for FileConfigSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<ContainmentPolicyDocument, KillSwitchError> {
        debug!("Loading switch config from {}", self.path.display());

        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| KillSwitchError::Config {
                source_name: self.name(),
                reason: e.to_string(),
            })?;

        let document = ContainmentPolicyDocument::from_config_str(&self.name(), &body)?;

        debug!(
            config_version = %document.config_version(),
            bytes = document.as_str().len(),
            "Switch config loaded"
        );
        Ok(document)
    }
}
