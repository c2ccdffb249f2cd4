//! Organization Containment Executor
//!
//! Creates a highly restrictive service control policy through the
//! organization management account and attaches it to the target account.

use chrono::Utc;
use tracing::{info, warn};

use crate::broker::CredentialBroker;
use crate::config::ContainmentPolicyDocument;
use crate::error::KillSwitchError;
use crate::providers::{CloudSession, ScpDefinition};
use crate::types::{ActionKind, RemediationOutcome};

pub const SCP_NAME: &str = "HighlyRestrictiveSCP";
pub const SCP_DESCRIPTION: &str = "Highly Restrictive SCP";

/// Runs `apply_scp`
pub struct ContainmentExecutor<'a> {
    session: &'a dyn CloudSession,
}

impl<'a> ContainmentExecutor<'a> {
    pub fn new(session: &'a dyn CloudSession) -> Self {
        Self { session }
    }

    /// Create the SCP in the management account and attach it to the target.
    ///
    /// Create and attach are separate calls. When attach fails the created
    /// policy is left in place and its id is reported in the error.
    pub async fn apply_scp(
        &self,
        management_account_id: &str,
        target_account_id: &str,
        assumed_role: &str,
        policy: &ContainmentPolicyDocument,
    ) -> Result<RemediationOutcome, KillSwitchError> {
        let broker = CredentialBroker::new(self.session, ActionKind::ApplyScp.as_str());
        let credentials = broker.assume(management_account_id, assumed_role).await?;
        let organizations = self.session.organizations(credentials);

        info!(
            management_account_id = %management_account_id,
            config_version = %policy.config_version(),
            "Creating service control policy"
        );

        let policy_id = organizations
            .create_policy(ScpDefinition {
                name: SCP_NAME,
                description: SCP_DESCRIPTION,
                content: policy.as_str(),
            })
            .await
            .map_err(|source| KillSwitchError::PolicyCreation {
                management_account_id: management_account_id.to_string(),
                source,
            })?;

        info!(policy_id = %policy_id, "Service control policy created");

        let attached = organizations
            .attach_policy(&policy_id, target_account_id)
            .await;
        if let Err(source) = attached {
            warn!(
                policy_id = %policy_id,
                target_account_id = %target_account_id,
                "SCP attach failed; created policy is orphaned and must be reconciled manually"
            );
            return Err(KillSwitchError::PolicyAttach {
                policy_id,
                target_account_id: target_account_id.to_string(),
                source,
            });
        }

        info!(
            policy_id = %policy_id,
            target_account_id = %target_account_id,
            "Service control policy attached"
        );

        Ok(RemediationOutcome {
            action: ActionKind::ApplyScp,
            target_account_id: target_account_id.to_string(),
            region: self.session.region().to_string(),
            message: format!(
                "SCP applied to account {} with policy ID {}",
                target_account_id, policy_id
            ),
            policy_id: Some(policy_id),
            detached_policies: Vec::new(),
            deleted_inline_policies: Vec::new(),
            identity_deleted: false,
            completed_at: Utc::now(),
        })
    }
}
