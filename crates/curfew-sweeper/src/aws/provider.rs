//! Provider abstraction over the cloud control plane
//!
//! The orchestrator and executor talk to the provider only through
//! `ResourceProvider`, so the sweep pipeline can be driven by an in-memory
//! implementation in tests without touching AWS.

use super::context::AwsContext;
use anyhow::Result;
use curfew_common::{ResourceKind, ResourceRecord};
use std::future::Future;

/// The control-plane operations the sweep pipeline needs.
pub trait ResourceProvider: Send + Sync {
    /// The region this provider is bound to
    fn region(&self) -> &str;

    /// Inventory all resources of one kind in this region
    fn list_resources(
        &self,
        kind: ResourceKind,
    ) -> impl Future<Output = Result<Vec<ResourceRecord>>> + Send;

    /// Apply the kind's deactivation action to the resource
    fn apply_action(&self, record: &ResourceRecord) -> impl Future<Output = Result<()>> + Send;

    /// Wait until the resource reports the terminal state of its action.
    /// Only called for kinds where `awaits_terminal_state()` is true.
    fn await_terminal_state(
        &self,
        record: &ResourceRecord,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort marker tagging of a deactivated resource
    fn tag_swept(
        &self,
        record: &ResourceRecord,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// AWS implementation of [`ResourceProvider`] for one region.
pub struct AwsProvider {
    pub(crate) region: String,
    pub(crate) ec2: aws_sdk_ec2::Client,
    pub(crate) rds: aws_sdk_rds::Client,
    pub(crate) ecs: aws_sdk_ecs::Client,
    pub(crate) elb: aws_sdk_elasticloadbalancingv2::Client,
    pub(crate) s3: aws_sdk_s3::Client,
    pub(crate) opensearch: aws_sdk_opensearch::Client,
    pub(crate) workspaces: aws_sdk_workspaces::Client,
}

impl AwsProvider {
    /// Create a provider for the region (loads AWS config from the
    /// environment).
    pub async fn new(region: &str) -> Self {
        let ctx = AwsContext::new(region).await;
        Self::from_context(&ctx)
    }

    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            region: ctx.region().to_string(),
            ec2: ctx.ec2_client(),
            rds: ctx.rds_client(),
            ecs: ctx.ecs_client(),
            elb: ctx.elb_client(),
            s3: ctx.s3_client(),
            opensearch: ctx.opensearch_client(),
            workspaces: ctx.workspaces_client(),
        }
    }
}

impl ResourceProvider for AwsProvider {
    fn region(&self) -> &str {
        &self.region
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>> {
        self.list_kind(kind).await
    }

    async fn apply_action(&self, record: &ResourceRecord) -> Result<()> {
        self.apply_kind_action(record).await
    }

    async fn await_terminal_state(&self, record: &ResourceRecord) -> Result<()> {
        self.await_kind_terminal(record).await
    }

    async fn tag_swept(&self, record: &ResourceRecord, reason: &str) -> Result<()> {
        self.tag_swept_resource(record, reason).await
    }
}
