//! Credential Broker
//!
//! Mints short-lived credentials for a role in a given account by
//! building the role ARN and delegating to the session's STS capability.

use std::time::SystemTime;
use tracing::info;

use crate::error::KillSwitchError;
use crate::providers::CloudSession;

/// Temporary credentials bound to one assumed role.
///
/// Not `Clone`: a credential set is consumed when a provider client is
/// built from it. `Debug` never prints secret material.
pub struct ScopedCredentials {
    role_arn: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expires_at: Option<SystemTime>,
}

impl ScopedCredentials {
    pub fn new(
        role_arn: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expires_at: Option<SystemTime>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expires_at,
        }
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    pub(crate) fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub(crate) fn session_token(&self) -> &str {
        &self.session_token
    }
}

impl std::fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedCredentials")
            .field("role_arn", &self.role_arn)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// AWS partition, derived from the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Aws,
    AwsCn,
    AwsUsGov,
}

impl Partition {
    pub fn for_region(region: &str) -> Self {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Aws => write!(f, "aws"),
            Partition::AwsCn => write!(f, "aws-cn"),
            Partition::AwsUsGov => write!(f, "aws-us-gov"),
        }
    }
}

/// Build `arn:<partition>:iam::<account>:role/<role>`
pub fn role_arn(partition: Partition, account_id: &str, role_name: &str) -> String {
    format!("arn:{}:iam::{}:role/{}", partition, account_id, role_name)
}

/// Assumes roles through a provider session
pub struct CredentialBroker<'a> {
    session: &'a dyn CloudSession,
    partition: Partition,
    session_name: String,
}

impl<'a> CredentialBroker<'a> {
    /// `purpose` ends up in the STS session name, e.g. `killswitch-delete_role-1a2b3c4d`
    pub fn new(session: &'a dyn CloudSession, purpose: &str) -> Self {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            session,
            partition: Partition::for_region(session.region()),
            session_name: format!("killswitch-{}-{}", purpose, &run_id[..8]),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Assume `role_name` in `account_id`
    pub async fn assume(
        &self,
        account_id: &str,
        role_name: &str,
    ) -> Result<ScopedCredentials, KillSwitchError> {
        let role_arn = role_arn(self.partition, account_id, role_name);

        let credentials = self
            .session
            .assume_role(&role_arn, &self.session_name)
            .await
            .map_err(|source| KillSwitchError::Credential {
                role_arn: role_arn.clone(),
                source,
            })?;

        info!(
            role_arn = %role_arn,
            session_name = %self.session_name,
            "Assumed role"
        );
        Ok(credentials)
    }
}
