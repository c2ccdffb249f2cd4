//! AWS Provider Adapters
//!
//! Implements the capability provider traits on the AWS SDK for Rust.
//! The base session uses the default credential chain (environment,
//! profile, IMDS, IRSA); every IAM or Organizations client is built from
//! assumed-role credentials instead.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_organizations::types::PolicyType;
use aws_sdk_sts::error::DisplayErrorContext;
use std::future::Future;
use std::time::SystemTime;
use tracing::debug;

use crate::broker::ScopedCredentials;
use crate::error::ProviderError;
use crate::providers::{
    AttachedPolicy, CloudSession, IdentityPolicyProvider, OrganizationProvider, ScpDefinition,
    SessionFactory,
};

const CREDENTIALS_PROVIDER_NAME: &str = "killswitch-assumed-role";

fn sdk_error<E: std::error::Error>(operation: &str, err: E) -> ProviderError {
    ProviderError::new(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

/// One page of a marker-paginated IAM listing
struct Page<T> {
    items: Vec<T>,
    is_truncated: bool,
    marker: Option<String>,
}

/// Follow IAM `Marker` pagination until the listing is exhausted.
///
/// A truncated page without a marker ends the listing.
async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut marker = None;

    loop {
        let page = fetch(marker.take()).await?;
        items.extend(page.items);

        match page.marker {
            Some(next) if page.is_truncated => marker = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

/// Builds AWS sessions from the default credential chain
#[derive(Debug, Default, Clone)]
pub struct AwsSessionFactory;

#[async_trait]
impl SessionFactory for AwsSessionFactory {
    async fn session(&self, region: &str) -> Box<dyn CloudSession> {
        debug!("Loading AWS config for region {}", region);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Box::new(AwsSession::new(region, config))
    }
}

/// AWS session for one region
pub struct AwsSession {
    region: String,
    config: SdkConfig,
    sts: aws_sdk_sts::Client,
}

impl AwsSession {
    pub fn new(region: &str, config: SdkConfig) -> Self {
        let sts = aws_sdk_sts::Client::new(&config);
        Self {
            region: region.to_string(),
            config,
            sts,
        }
    }

    fn credentials(credentials: ScopedCredentials) -> Credentials {
        Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            credentials.expires_at(),
            CREDENTIALS_PROVIDER_NAME,
        )
    }
}

#[async_trait]
impl CloudSession for AwsSession {
    fn region(&self) -> &str {
        &self.region
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<ScopedCredentials, ProviderError> {
        let output = self
            .sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| sdk_error("STS AssumeRole", e))?;

        let creds = output
            .credentials()
            .ok_or_else(|| ProviderError::new("STS AssumeRole response missing Credentials"))?;

        Ok(ScopedCredentials::new(
            role_arn,
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token(),
            SystemTime::try_from(*creds.expiration()).ok(),
        ))
    }

    fn identity_policies(&self, credentials: ScopedCredentials) -> Box<dyn IdentityPolicyProvider> {
        let config = aws_sdk_iam::config::Builder::from(&self.config)
            .credentials_provider(Self::credentials(credentials))
            .build();

        Box::new(AwsIamProvider {
            client: aws_sdk_iam::Client::from_conf(config),
        })
    }

    fn organizations(&self, credentials: ScopedCredentials) -> Box<dyn OrganizationProvider> {
        let config = aws_sdk_organizations::config::Builder::from(&self.config)
            .credentials_provider(Self::credentials(credentials))
            .build();

        Box::new(AwsOrganizationsProvider {
            client: aws_sdk_organizations::Client::from_conf(config),
        })
    }
}

/// IAM role policy operations
pub struct AwsIamProvider {
    client: aws_sdk_iam::Client,
}

#[async_trait]
impl IdentityPolicyProvider for AwsIamProvider {
    async fn list_attached_role_policies(
        &self,
        role_name: &str,
    ) -> Result<Vec<AttachedPolicy>, ProviderError> {
        collect_pages(|marker| {
            let request = self
                .client
                .list_attached_role_policies()
                .role_name(role_name)
                .set_marker(marker);
            async move {
                let output = request
                    .send()
                    .await
                    .map_err(|e| sdk_error("IAM ListAttachedRolePolicies", e))?;

                Ok(Page {
                    items: output
                        .attached_policies()
                        .iter()
                        .filter_map(|p| p.policy_arn().map(AttachedPolicy::new))
                        .collect(),
                    is_truncated: output.is_truncated(),
                    marker: output.marker().map(str::to_string),
                })
            }
        })
        .await
    }

    async fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| sdk_error("IAM DetachRolePolicy", e))?;
        Ok(())
    }

    async fn list_role_policies(&self, role_name: &str) -> Result<Vec<String>, ProviderError> {
        collect_pages(|marker| {
            let request = self
                .client
                .list_role_policies()
                .role_name(role_name)
                .set_marker(marker);
            async move {
                let output = request
                    .send()
                    .await
                    .map_err(|e| sdk_error("IAM ListRolePolicies", e))?;

                Ok(Page {
                    items: output.policy_names().to_vec(),
                    is_truncated: output.is_truncated(),
                    marker: output.marker().map(str::to_string),
                })
            }
        })
        .await
    }

    async fn delete_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> Result<(), ProviderError> {
        self.client
            .delete_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(|e| sdk_error("IAM DeleteRolePolicy", e))?;
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ProviderError> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| sdk_error("IAM DeleteRole", e))?;
        Ok(())
    }
}

/// Organizations policy operations
pub struct AwsOrganizationsProvider {
    client: aws_sdk_organizations::Client,
}

#[async_trait]
impl OrganizationProvider for AwsOrganizationsProvider {
    async fn create_policy(&self, policy: ScpDefinition<'_>) -> Result<String, ProviderError> {
        let output = self
            .client
            .create_policy()
            .name(policy.name)
            .description(policy.description)
            .content(policy.content)
            .r#type(PolicyType::ServiceControlPolicy)
            .send()
            .await
            .map_err(|e| sdk_error("Organizations CreatePolicy", e))?;

        output
            .policy()
            .and_then(|p| p.policy_summary())
            .and_then(|s| s.id())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new("Organizations CreatePolicy response missing policy id"))
    }

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> Result<(), ProviderError> {
        self.client
            .attach_policy()
            .policy_id(policy_id)
            .target_id(target_id)
            .send()
            .await
            .map_err(|e| sdk_error("Organizations AttachPolicy", e))?;
        Ok(())
    }
}
