//! In-memory capability providers that record every call.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::broker::ScopedCredentials;
use crate::config::{ContainmentPolicyDocument, ContainmentPolicySource};
use crate::error::{KillSwitchError, ProviderError};
use crate::providers::{
    AttachedPolicy, CloudSession, IdentityPolicyProvider, OrganizationProvider, ScpDefinition,
    SessionFactory,
};

pub const TEST_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Deny","Action":"*","Resource":"*"}]}"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Session { region: String },
    AssumeRole { role_arn: String },
    Client { service: &'static str, role_arn: String },
    ListAttached { role: String },
    Detach { role: String, policy_arn: String },
    ListInline { role: String },
    DeleteInline { role: String, policy_name: String },
    DeleteRole { role: String },
    CreatePolicy { name: String, description: String, content: String },
    AttachPolicy { policy_id: String, target_id: String },
}

#[derive(Debug, Clone, Default)]
struct Behavior {
    managed: Vec<String>,
    inline: Vec<String>,
    policy_id: Option<String>,
    fail_assume: Option<String>,
    fail_list_managed: Option<String>,
    fail_list_inline: Option<String>,
    /// 1-based index of the detach call that fails
    fail_detach_at: Option<usize>,
    fail_inline_delete_at: Option<usize>,
    fail_delete_role: Option<String>,
    fail_create: Option<String>,
    fail_attach: Option<String>,
}

/// Scriptable fake cloud
#[derive(Debug, Clone, Default)]
pub struct MockCloud {
    behavior: Behavior,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockCloud {
    pub fn with_managed(mut self, arns: &[&str]) -> Self {
        self.behavior.managed = arns.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_inline(mut self, names: &[&str]) -> Self {
        self.behavior.inline = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_policy_id(mut self, id: &str) -> Self {
        self.behavior.policy_id = Some(id.to_string());
        self
    }

    pub fn fail_assume(mut self, message: &str) -> Self {
        self.behavior.fail_assume = Some(message.to_string());
        self
    }

    pub fn fail_list_managed(mut self, message: &str) -> Self {
        self.behavior.fail_list_managed = Some(message.to_string());
        self
    }

    pub fn fail_list_inline(mut self, message: &str) -> Self {
        self.behavior.fail_list_inline = Some(message.to_string());
        self
    }

    pub fn fail_detach_at(mut self, k: usize) -> Self {
        self.behavior.fail_detach_at = Some(k);
        self
    }

    pub fn fail_inline_delete_at(mut self, k: usize) -> Self {
        self.behavior.fail_inline_delete_at = Some(k);
        self
    }

    pub fn fail_delete_role(mut self, message: &str) -> Self {
        self.behavior.fail_delete_role = Some(message.to_string());
        self
    }

    pub fn fail_create(mut self, message: &str) -> Self {
        self.behavior.fail_create = Some(message.to_string());
        self
    }

    pub fn fail_attach(mut self, message: &str) -> Self {
        self.behavior.fail_attach = Some(message.to_string());
        self
    }

    pub fn open_session(&self, region: &str) -> MockSession {
        MockSession {
            cloud: self.clone(),
            region: region.to_string(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call.clone());
        calls
            .iter()
            .filter(|c| std::mem::discriminant(*c) == std::mem::discriminant(&call))
            .count()
    }
}

#[async_trait]
impl SessionFactory for MockCloud {
    async fn session(&self, region: &str) -> Box<dyn CloudSession> {
        self.record(Call::Session {
            region: region.to_string(),
        });
        Box::new(self.open_session(region))
    }
}

pub struct MockSession {
    cloud: MockCloud,
    region: String,
}

#[async_trait]
impl CloudSession for MockSession {
    fn region(&self) -> &str {
        &self.region
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        _session_name: &str,
    ) -> Result<ScopedCredentials, ProviderError> {
        self.cloud.record(Call::AssumeRole {
            role_arn: role_arn.to_string(),
        });
        if let Some(message) = &self.cloud.behavior.fail_assume {
            return Err(ProviderError::new(message.clone()));
        }
        Ok(ScopedCredentials::new(
            role_arn,
            "ASIAMOCK",
            "mock-secret",
            "mock-token",
            None,
        ))
    }

    fn identity_policies(&self, credentials: ScopedCredentials) -> Box<dyn IdentityPolicyProvider> {
        self.cloud.record(Call::Client {
            service: "iam",
            role_arn: credentials.role_arn().to_string(),
        });
        Box::new(MockIam {
            cloud: self.cloud.clone(),
        })
    }

    fn organizations(&self, credentials: ScopedCredentials) -> Box<dyn OrganizationProvider> {
        self.cloud.record(Call::Client {
            service: "organizations",
            role_arn: credentials.role_arn().to_string(),
        });
        Box::new(MockOrganizations {
            cloud: self.cloud.clone(),
        })
    }
}

struct MockIam {
    cloud: MockCloud,
}

#[async_trait]
impl IdentityPolicyProvider for MockIam {
    async fn list_attached_role_policies(
        &self,
        role_name: &str,
    ) -> Result<Vec<AttachedPolicy>, ProviderError> {
        self.cloud.record(Call::ListAttached {
            role: role_name.to_string(),
        });
        match &self.cloud.behavior.fail_list_managed {
            Some(message) => Err(ProviderError::new(message.clone())),
            None => Ok(self
                .cloud
                .behavior
                .managed
                .iter()
                .map(AttachedPolicy::new)
                .collect()),
        }
    }

    async fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), ProviderError> {
        let n = self.cloud.record(Call::Detach {
            role: role_name.to_string(),
            policy_arn: policy_arn.to_string(),
        });
        if self.cloud.behavior.fail_detach_at == Some(n) {
            return Err(ProviderError::new("UnmodifiableEntity: policy is locked"));
        }
        Ok(())
    }

    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        self.cloud.record(Call::ListInline {
            role: role_name.to_string(),
        });
        match &self.cloud.behavior.fail_list_inline {
            Some(message) => Err(ProviderError::new(message.clone())),
            None => Ok(self.cloud.behavior.inline.clone()),
        }
    }

    async fn delete_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<(), ProviderError> {
        let n = self.cloud.record(Call::DeleteInline {
            role: role_name.to_string(),
            policy_name: policy_name.to_string(),
        });
        if self.cloud.behavior.fail_inline_delete_at == Some(n) {
            return Err(ProviderError::new("ServiceFailure"));
        }
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError> {
        self.cloud.record(Call::DeleteRole {
            role: role_name.to_string(),
        });
        match &self.cloud.behavior.fail_delete_role {
            Some(message) => Err(ProviderError::new(message.clone())),
            None => Ok(()),
        }
    }
}

struct MockOrganizations {
    cloud: MockCloud,
}

#[async_trait]
impl OrganizationProvider for MockOrganizations {
    async fn create_policy(&self, policy: ScpDefinition<'_>) -> Result<String, ProviderError> {
        self.cloud.record(Call::CreatePolicy {
            name: policy.name.to_string(),
            description: policy.description.to_string(),
            content: policy.content.to_string(),
        });
        if let Some(message) = &self.cloud.behavior.fail_create {
            return Err(ProviderError::new(message.clone()));
        }
        Ok(self
            .cloud
            .behavior
            .policy_id
            .clone()
            .unwrap_or_else(|| "p-mock0001".to_string()))
    }

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> Result<(), ProviderError> {
        self.cloud.record(Call::AttachPolicy {
            policy_id: policy_id.to_string(),
            target_id: target_id.to_string(),
        });
        match &self.cloud.behavior.fail_attach {
            Some(message) => Err(ProviderError::new(message.clone())),
            None => Ok(()),
        }
    }
}

/// Policy source that counts loads
#[derive(Debug, Clone, Default)]
pub struct StaticPolicySource {
    fail: bool,
    loads: Arc<Mutex<usize>>,
}

impl StaticPolicySource {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn loads(&self) -> usize {
        *self.loads.lock().unwrap()
    }
}

#[async_trait]
impl ContainmentPolicySource for StaticPolicySource {
    fn name(&self) -> String {
        "static".to_string()
    }

    async fn load(&self) -> Result<ContainmentPolicyDocument, KillSwitchError> {
        *self.loads.lock().unwrap() += 1;
        if self.fail {
            return Err(KillSwitchError::Config {
                source_name: self.name(),
                reason: "unreadable".to_string(),
            });
        }
        Ok(ContainmentPolicyDocument::new(TEST_POLICY, "1.0"))
    }
}
