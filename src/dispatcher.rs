//! Remediation Dispatcher
//!
//! Validates a request, loads the containment policy when needed, opens a
//! provider session for the request's region and routes to the executor
//! for the action. The dispatcher makes no cloud calls itself.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::ContainmentPolicySource;
use crate::containment::ContainmentExecutor;
use crate::error::KillSwitchError;
use crate::providers::SessionFactory;
use crate::remediation::RemediationExecutor;
use crate::types::{PlanTarget, RemediationOutcome, RemediationPlan, RemediationRequest};

/// Entry point for remediation requests
///
/// Holds no per-request state and can be shared across concurrent
/// invocations.
#[derive(Clone)]
pub struct Dispatcher {
    sessions: Arc<dyn SessionFactory>,
    policies: Arc<dyn ContainmentPolicySource>,
}

impl Dispatcher {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        policies: Arc<dyn ContainmentPolicySource>,
    ) -> Self {
        Self { sessions, policies }
    }

    /// Validate without touching configuration or the cloud
    pub fn plan(&self, request: &RemediationRequest) -> Result<RemediationPlan, KillSwitchError> {
        request.validate()
    }

    /// Validate and execute a remediation request
    #[instrument(skip_all, fields(action = %request.action, account_id = %request.target_account_id))]
    pub async fn dispatch(
        &self,
        request: &RemediationRequest,
    ) -> Result<RemediationOutcome, KillSwitchError> {
        let plan = self.plan(request)?;

        info!(region = %plan.region, "Remediation request validated");

        match &plan.target {
            PlanTarget::Organization {
                management_account_id,
            } => {
                let policy = self.policies.load().await?;
                let session = self.sessions.session(&plan.region).await;

                ContainmentExecutor::new(session.as_ref())
                    .apply_scp(
                        management_account_id,
                        &plan.target_account_id,
                        &plan.assumed_role_name,
                        &policy,
                    )
                    .await
            }
            PlanTarget::Identity {
                action,
                identity_name,
            } => {
                let session = self.sessions.session(&plan.region).await;

                RemediationExecutor::new(session.as_ref())
                    .remediate(
                        *action,
                        &plan.target_account_id,
                        &plan.assumed_role_name,
                        identity_name,
                    )
                    .await
            }
        }
    }
}
