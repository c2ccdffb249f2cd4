//! Capability Providers
//!
//! Trait-based abstractions over the cloud services the executors drive:
//! role assumption, IAM role policy management and organization policy
//! management. The AWS implementations live in [`crate::aws`].

use async_trait::async_trait;

use crate::broker::ScopedCredentials;
use crate::error::ProviderError;

/// Opens a provider session for one region
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn session(&self, region: &str) -> Box<dyn CloudSession>;
}

/// A per-request provider session
///
/// Provider clients are built from credentials by value, so each client is
/// bound to exactly one assumed role.
#[async_trait]
pub trait CloudSession: Send + Sync {
    fn region(&self) -> &str;

    /// Exchange the caller's identity for credentials of `role_arn`
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<ScopedCredentials, ProviderError>;

    fn identity_policies(&self, credentials: ScopedCredentials) -> Box<dyn IdentityPolicyProvider>;

    fn organizations(&self, credentials: ScopedCredentials) -> Box<dyn OrganizationProvider>;
}

/// A managed policy attached to a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPolicy {
    pub policy_arn: String,
}

impl AttachedPolicy {
    pub fn new(policy_arn: impl Into<String>) -> Self {
        Self {
            policy_arn: policy_arn.into(),
        }
    }
}

/// IAM role policy operations
#[async_trait]
pub trait IdentityPolicyProvider: Send + Sync {
    /// All managed policies attached to the role, in provider order
    async fn list_attached_role_policies(
        &self,
        role_name: &str,
    ) -> Result<Vec<AttachedPolicy>, ProviderError>;

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str)
        -> Result<(), ProviderError>;

    /// All inline policy names embedded in the role, in provider order
    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError>;

    async fn delete_role_policy(&self, role_name: &str, policy_name: &str)
        -> Result<(), ProviderError>;

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError>;
}

/// Service control policy to create
#[derive(Debug, Clone, Copy)]
pub struct ScpDefinition<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub content: &'a str,
}

/// Organization policy operations
#[async_trait]
pub trait OrganizationProvider: Send + Sync {
    /// Create a service control policy, returning its id
    async fn create_policy(&self, policy: ScpDefinition<'_>) -> Result<String, ProviderError>;

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> Result<(), ProviderError>;
}
