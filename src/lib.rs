//! AWS Kill Switch Library
//!
//! On-demand containment of a compromised AWS account: attach a highly
//! restrictive SCP through the organization management account, or strip
//! (and optionally delete) an IAM role in the target account.
//!
//! ## Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use killswitch::{AwsSessionFactory, Dispatcher, FileConfigSource, RemediationRequest};
//!
//! let dispatcher = Dispatcher::new(
//!     Arc::new(AwsSessionFactory),
//!     Arc::new(FileConfigSource::new("switch.conf")),
//! );
//!
//! let request: RemediationRequest = serde_json::from_str(r#"{
//!     "action": "delete_role",
//!     "target_account_id": "111122223333",
//!     "assumed_role_name": "KillSwitchRole",
//!     "target_identity_name": "compromised-role"
//! }"#)?;
//!
//! let outcome = dispatcher.dispatch(&request).await?;
//! println!("{}", outcome);
//! ```

pub mod aws;
pub mod broker;
pub mod config;
pub mod containment;
pub mod dispatcher;
pub mod error;
pub mod providers;
pub mod remediation;
pub mod types;

#[cfg(test)]
mod test_support;

pub use aws::AwsSessionFactory;
pub use broker::{CredentialBroker, ScopedCredentials};
pub use config::{ContainmentPolicyDocument, ContainmentPolicySource, FileConfigSource};
pub use dispatcher::Dispatcher;
pub use error::{KillSwitchError, ProviderError};
pub use types::{ActionKind, RemediationOutcome, RemediationPlan, RemediationRequest, DEFAULT_REGION};
