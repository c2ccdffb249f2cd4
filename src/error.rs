//! Kill Switch Errors
//!
//! One variant per failure kind. Every variant names the account, role or
//! policy it concerns so an operator can finish or reconcile a partially
//! applied remediation by hand.

use thiserror::Error;

/// Error reported by a capability provider (STS, IAM, Organizations).
///
/// Carries the provider's own message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Which policy listing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyListKind {
    Managed,
    Inline,
}

impl std::fmt::Display for PolicyListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyListKind::Managed => write!(f, "attached"),
            PolicyListKind::Inline => write!(f, "inline"),
        }
    }
}

/// Errors that can occur while dispatching a remediation
#[derive(Debug, Error)]
pub enum KillSwitchError {
    /// A required request field is missing or empty
    #[error("{0}")]
    Validation(String),

    /// The action is not one of the supported actions
    #[error("invalid action: {0:?}")]
    InvalidAction(String),

    /// The containment policy document could not be loaded
    #[error("error loading config file {source_name}: {reason}")]
    Config { source_name: String, reason: String },

    /// Role assumption was refused by the provider
    #[error("error assuming role {role_arn}: {source}")]
    Credential {
        role_arn: String,
        #[source]
        source: ProviderError,
    },

    /// Listing managed or inline policies failed
    #[error("error listing {kind} policies for role {identity_name} in account {account_id}: {source}")]
    List {
        kind: PolicyListKind,
        identity_name: String,
        account_id: String,
        #[source]
        source: ProviderError,
    },

    /// Detaching a managed policy failed
    #[error(
        "error detaching policy {policy_arn} from role {identity_name} in account {account_id} \
         ({detached_before} detached before failure): {source}"
    )]
    Detach {
        policy_arn: String,
        identity_name: String,
        account_id: String,
        detached_before: usize,
        #[source]
        source: ProviderError,
    },

    /// Deleting an inline policy failed
    #[error("error deleting inline policy {policy_name} from role {identity_name} in account {account_id}: {source}")]
    InlinePolicyDelete {
        policy_name: String,
        identity_name: String,
        account_id: String,
        #[source]
        source: ProviderError,
    },

    /// Deleting the role itself failed
    #[error("error deleting role {identity_name} in account {account_id}: {source}")]
    IdentityDelete {
        identity_name: String,
        account_id: String,
        #[source]
        source: ProviderError,
    },

    /// Creating the service control policy failed
    #[error("error creating SCP in management account {management_account_id}: {source}")]
    PolicyCreation {
        management_account_id: String,
        #[source]
        source: ProviderError,
    },

    /// Attaching the created service control policy failed.
    /// The policy identified by `policy_id` exists and is left in place.
    #[error("error attaching SCP {policy_id} to account {target_account_id}: {source}")]
    PolicyAttach {
        policy_id: String,
        target_account_id: String,
        #[source]
        source: ProviderError,
    },
}

impl KillSwitchError {
    /// Stable tag for machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            KillSwitchError::Validation(_) => "validation_error",
            KillSwitchError::InvalidAction(_) => "invalid_action_error",
            KillSwitchError::Config { .. } => "config_error",
            KillSwitchError::Credential { .. } => "credential_error",
            KillSwitchError::List { .. } => "list_error",
            KillSwitchError::Detach { .. } => "detach_error",
            KillSwitchError::InlinePolicyDelete { .. } => "inline_policy_delete_error",
            KillSwitchError::IdentityDelete { .. } => "identity_delete_error",
            KillSwitchError::PolicyCreation { .. } => "policy_creation_error",
            KillSwitchError::PolicyAttach { .. } => "policy_attach_error",
        }
    }

    /// True for errors raised before any cloud call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KillSwitchError::Validation(_) | KillSwitchError::InvalidAction(_)
        )
    }
}
