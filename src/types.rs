//! Kill Switch Types
//!
//! Request, validated plan and outcome types, plus the per-action
//! validation table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::error::KillSwitchError;

/// Region used when a request does not name one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Remediation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a restrictive SCP and attach it to the target account
    ApplyScp,
    /// Strip all managed and inline policies from a role
    DetachPolicies,
    /// Strip all policies from a role, then delete it
    DeleteRole,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::ApplyScp,
        ActionKind::DetachPolicies,
        ActionKind::DeleteRole,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ApplyScp => "apply_scp",
            ActionKind::DetachPolicies => "detach_policies",
            ActionKind::DeleteRole => "delete_role",
        }
    }

    /// Field that must be non-empty for this action, beyond the target
    /// account and assumed role every action needs. Its value becomes the
    /// plan target.
    pub fn required_field(&self) -> RequestField {
        match self {
            ActionKind::ApplyScp => RequestField::OrgManagementAccountId,
            ActionKind::DetachPolicies | ActionKind::DeleteRole => RequestField::TargetIdentityName,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = KillSwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| KillSwitchError::InvalidAction(s.to_string()))
    }
}

/// Actions handled by the policy remediation executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityAction {
    DetachPolicies,
    DeleteRole,
}

impl IdentityAction {
    pub fn deletes_identity(&self) -> bool {
        matches!(self, IdentityAction::DeleteRole)
    }
}

impl From<IdentityAction> for ActionKind {
    fn from(action: IdentityAction) -> Self {
        match action {
            IdentityAction::DetachPolicies => ActionKind::DetachPolicies,
            IdentityAction::DeleteRole => ActionKind::DeleteRole,
        }
    }
}

/// Request fields subject to per-action validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestField {
    TargetAccountId,
    AssumedRoleName,
    TargetIdentityName,
    OrgManagementAccountId,
}

impl RequestField {
    pub fn name(&self) -> &'static str {
        match self {
            RequestField::TargetAccountId => "target_account_id",
            RequestField::AssumedRoleName => "assumed_role_name",
            RequestField::TargetIdentityName => "target_identity_name",
            RequestField::OrgManagementAccountId => "org_management_account_id",
        }
    }
}

/// Absent and `null` both decode to an empty string
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Inbound remediation request
///
/// `action` stays a raw string until validation so an unknown value is
/// reported as an invalid action rather than a decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemediationRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub target_account_id: String,
    #[serde(default, alias = "role_to_assume", deserialize_with = "null_as_empty")]
    pub assumed_role_name: String,
    #[serde(default, alias = "target_role_name", skip_serializing_if = "Option::is_none")]
    pub target_identity_name: Option<String>,
    #[serde(
        default,
        alias = "org_management_account",
        skip_serializing_if = "Option::is_none"
    )]
    pub org_management_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl RemediationRequest {
    fn field(&self, field: RequestField) -> Option<&str> {
        let value = match field {
            RequestField::TargetAccountId => Some(self.target_account_id.as_str()),
            RequestField::AssumedRoleName => Some(self.assumed_role_name.as_str()),
            RequestField::TargetIdentityName => self.target_identity_name.as_deref(),
            RequestField::OrgManagementAccountId => self.org_management_account_id.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    fn require(&self, field: RequestField, action: ActionKind) -> Result<String, KillSwitchError> {
        self.field(field).map(str::to_string).ok_or_else(|| {
            KillSwitchError::Validation(format!(
                "{} is required for {} action",
                field.name(),
                action
            ))
        })
    }

    /// Validate the request into an immutable plan.
    ///
    /// Checks run in a fixed order: common fields, then the action name,
    /// then the action's own required fields. No I/O happens here.
    pub fn validate(&self) -> Result<RemediationPlan, KillSwitchError> {
        let (target_account_id, assumed_role_name) = match (
            self.field(RequestField::TargetAccountId),
            self.field(RequestField::AssumedRoleName),
        ) {
            (Some(account), Some(role)) => (account.to_string(), role.to_string()),
            _ => {
                return Err(KillSwitchError::Validation(
                    "target_account_id and assumed_role_name are required".to_string(),
                ))
            }
        };

        let region = self
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string();

        let action: ActionKind = self.action.trim().parse()?;

        let subject = self.require(action.required_field(), action)?;

        let target = match action {
            ActionKind::ApplyScp => PlanTarget::Organization {
                management_account_id: subject,
            },
            ActionKind::DetachPolicies => PlanTarget::Identity {
                action: IdentityAction::DetachPolicies,
                identity_name: subject,
            },
            ActionKind::DeleteRole => PlanTarget::Identity {
                action: IdentityAction::DeleteRole,
                identity_name: subject,
            },
        };

        Ok(RemediationPlan {
            action,
            target_account_id,
            assumed_role_name,
            region,
            target,
        })
    }
}

/// What a validated plan acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanTarget {
    /// apply_scp: act through the organization management account
    Organization { management_account_id: String },
    /// detach_policies / delete_role: act on one role in the target account
    Identity {
        action: IdentityAction,
        identity_name: String,
    },
}

/// A validated remediation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationPlan {
    pub action: ActionKind,
    pub target_account_id: String,
    pub assumed_role_name: String,
    pub region: String,
    pub target: PlanTarget,
}

impl RemediationPlan {
    /// Format the plan for display
    pub fn display(&self) -> String {
        let target = match &self.target {
            PlanTarget::Organization {
                management_account_id,
            } => format!("  Management Account: {}", management_account_id),
            PlanTarget::Identity { identity_name, .. } => {
                format!("  Target Role: {}", identity_name)
            }
        };
        format!(
            "Remediation Plan:\n  Action: {}\n  Target Account: {}\n  Assumed Role: {}\n  Region: {}\n{}",
            self.action, self.target_account_id, self.assumed_role_name, self.region, target
        )
    }
}

/// Result of a successful remediation
#[derive(Debug, Clone, Serialize)]
pub struct RemediationOutcome {
    pub action: ActionKind,
    pub target_account_id: String,
    pub region: String,
    /// Human-readable confirmation
    pub message: String,
    /// SCP created by apply_scp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// Managed policy ARNs detached, in detach order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detached_policies: Vec<String>,
    /// Inline policy names deleted, in delete order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deleted_inline_policies: Vec<String>,
    pub identity_deleted: bool,
    pub completed_at: DateTime<Utc>,
}

impl std::fmt::Display for RemediationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
