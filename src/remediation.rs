//! Policy Remediation Executor
//!
//! Strips every managed and inline policy from a role in the target
//! account, then optionally deletes the role. Steps run strictly in order
//! and stop at the first failure; nothing already done is rolled back.

use chrono::Utc;
use tracing::{info, warn};

use crate::broker::CredentialBroker;
use crate::error::{KillSwitchError, PolicyListKind};
use crate::providers::CloudSession;
use crate::types::{ActionKind, IdentityAction, RemediationOutcome};

/// Runs `detach_policies` and `delete_role`
pub struct RemediationExecutor<'a> {
    session: &'a dyn CloudSession,
}

impl<'a> RemediationExecutor<'a> {
    pub fn new(session: &'a dyn CloudSession) -> Self {
        Self { session }
    }

    /// Remediate `identity_name` in `target_account_id` acting as `assumed_role`
    pub async fn remediate(
        &self,
        action: IdentityAction,
        target_account_id: &str,
        assumed_role: &str,
        identity_name: &str,
    ) -> Result<RemediationOutcome, KillSwitchError> {
        let kind = ActionKind::from(action);
        let broker = CredentialBroker::new(self.session, kind.as_str());
        let credentials = broker.assume(target_account_id, assumed_role).await?;
        let iam = self.session.identity_policies(credentials);

        let attached = iam
            .list_attached_role_policies(identity_name)
            .await
            .map_err(|source| KillSwitchError::List {
                kind: PolicyListKind::Managed,
                identity_name: identity_name.to_string(),
                account_id: target_account_id.to_string(),
                source,
            })?;

        info!(
            account_id = %target_account_id,
            identity = %identity_name,
            count = attached.len(),
            "Detaching managed policies"
        );

        let mut detached_policies = Vec::with_capacity(attached.len());
        for policy in attached {
            let detached = iam
                .detach_role_policy(identity_name, &policy.policy_arn)
                .await;
            if let Err(source) = detached {
                warn!(
                    account_id = %target_account_id,
                    identity = %identity_name,
                    policy_arn = %policy.policy_arn,
                    detached_before = detached_policies.len(),
                    "Managed policy detach failed; earlier detachments stay in effect"
                );
                return Err(KillSwitchError::Detach {
                    policy_arn: policy.policy_arn,
                    identity_name: identity_name.to_string(),
                    account_id: target_account_id.to_string(),
                    detached_before: detached_policies.len(),
                    source,
                });
            }
            info!(policy_arn = %policy.policy_arn, "Detached managed policy");
            detached_policies.push(policy.policy_arn);
        }

        let inline = iam
            .list_role_policies(identity_name)
            .await
            .map_err(|source| KillSwitchError::List {
                kind: PolicyListKind::Inline,
                identity_name: identity_name.to_string(),
                account_id: target_account_id.to_string(),
                source,
            })?;

        info!(
            account_id = %target_account_id,
            identity = %identity_name,
            count = inline.len(),
            "Deleting inline policies"
        );

        let mut deleted_inline_policies = Vec::with_capacity(inline.len());
        for policy_name in inline {
            iam.delete_role_policy(identity_name, &policy_name)
                .await
                .map_err(|source| KillSwitchError::InlinePolicyDelete {
                    policy_name: policy_name.clone(),
                    identity_name: identity_name.to_string(),
                    account_id: target_account_id.to_string(),
                    source,
                })?;
            info!(policy_name = %policy_name, "Deleted inline policy");
            deleted_inline_policies.push(policy_name);
        }

        let message = if action.deletes_identity() {
            iam.delete_role(identity_name)
                .await
                .map_err(|source| KillSwitchError::IdentityDelete {
                    identity_name: identity_name.to_string(),
                    account_id: target_account_id.to_string(),
                    source,
                })?;
            info!(
                account_id = %target_account_id,
                identity = %identity_name,
                "Role deleted"
            );
            format!(
                "Role {} and its policies are detached and deleted in account {}",
                identity_name, target_account_id
            )
        } else {
            format!(
                "Policies detached from role {} in account {}",
                identity_name, target_account_id
            )
        };

        Ok(RemediationOutcome {
            action: kind,
            target_account_id: target_account_id.to_string(),
            region: self.session.region().to_string(),
            message,
            policy_id: None,
            detached_policies,
            deleted_inline_policies,
            identity_deleted: action.deletes_identity(),
            completed_at: Utc::now(),
        })
    }
}
