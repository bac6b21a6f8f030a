//! Per-kind deactivation actions
//!
//! One action per kind: stop for instances, databases, and desktops,
//! scale-to-zero for service groups, delete for the rest. Stops that start
//! an asynchronous transition are paired with a terminal-state wait.

use super::error::classify_sdk_error;
use super::provider::AwsProvider;
use super::tags::{format_swept_at, TAG_SWEPT_AT, TAG_SWEPT_REASON};
use crate::wait::{wait_for_state, WaitConfig};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::InstanceStateName;
use chrono::Utc;
use curfew_common::{ResourceKind, ResourceRecord};
use tracing::info;

impl AwsProvider {
    pub(crate) async fn apply_kind_action(&self, record: &ResourceRecord) -> Result<()> {
        info!(
            resource = %record.reference(),
            action = %record.kind.action(),
            "Applying action"
        );
        match record.kind {
            ResourceKind::ComputeInstance => self.stop_compute_instance(&record.id).await,
            ResourceKind::ManagedDatabase => self.stop_managed_database(&record.id).await,
            ResourceKind::ServiceGroup => self.scale_service_to_zero(record).await,
            ResourceKind::NatGateway => self.delete_nat_gateway(&record.id).await,
            ResourceKind::LoadBalancer => self.delete_load_balancer(record).await,
            ResourceKind::ObjectStoreBucket => self.delete_bucket(&record.id).await,
            ResourceKind::SearchDomain => self.delete_search_domain(&record.id).await,
            ResourceKind::VirtualDesktop => self.stop_virtual_desktop(&record.id).await,
        }
    }

    pub(crate) async fn await_kind_terminal(&self, record: &ResourceRecord) -> Result<()> {
        match record.kind {
            ResourceKind::ComputeInstance => self.wait_for_instance_stopped(&record.id).await,
            ResourceKind::ManagedDatabase => self.wait_for_database_stopped(&record.id).await,
            // Everything else completes at the API call
            _ => Ok(()),
        }
    }

    async fn stop_compute_instance(&self, instance_id: &str) -> Result<()> {
        self.ec2
            .stop_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .with_context(|| format!("Failed to stop instance {instance_id}"))?;
        Ok(())
    }

    async fn wait_for_instance_stopped(&self, instance_id: &str) -> Result<()> {
        wait_for_state(
            WaitConfig::default(),
            || async {
                let response = self
                    .ec2
                    .describe_instances()
                    .instance_ids(instance_id)
                    .send()
                    .await;

                match response {
                    Ok(resp) => {
                        let state = resp
                            .reservations()
                            .first()
                            .and_then(|r| r.instances().first())
                            .and_then(|i| i.state())
                            .and_then(|s| s.name());
                        match state {
                            Some(InstanceStateName::Stopped)
                            | Some(InstanceStateName::Terminated) => Ok(true),
                            None => Ok(true), // no state info = gone
                            _ => Ok(false),
                        }
                    }
                    Err(e) => {
                        let err = anyhow::Error::from(e);
                        if classify_sdk_error(&err).is_not_found() {
                            Ok(true)
                        } else {
                            Err(err.context("Failed to check instance state"))
                        }
                    }
                }
            },
            &format!("instance {instance_id} stopped"),
        )
        .await
    }

    async fn stop_managed_database(&self, db_id: &str) -> Result<()> {
        self.rds
            .stop_db_instance()
            .db_instance_identifier(db_id)
            .send()
            .await
            .with_context(|| format!("Failed to stop database {db_id}"))?;
        Ok(())
    }

    async fn wait_for_database_stopped(&self, db_id: &str) -> Result<()> {
        // Database stops take minutes, not seconds
        let config = WaitConfig {
            initial_delay: std::time::Duration::from_secs(15),
            max_delay: std::time::Duration::from_secs(60),
            timeout: std::time::Duration::from_secs(1800),
        };
        wait_for_state(
            config,
            || async {
                let response = self
                    .rds
                    .describe_db_instances()
                    .db_instance_identifier(db_id)
                    .send()
                    .await;

                match response {
                    Ok(resp) => {
                        let status = resp
                            .db_instances()
                            .first()
                            .and_then(|db| db.db_instance_status());
                        Ok(matches!(status, Some("stopped") | None))
                    }
                    Err(e) => {
                        let err = anyhow::Error::from(e);
                        if classify_sdk_error(&err).is_not_found() {
                            Ok(true)
                        } else {
                            Err(err.context("Failed to check database state"))
                        }
                    }
                }
            },
            &format!("database {db_id} stopped"),
        )
        .await
    }

    async fn scale_service_to_zero(&self, record: &ResourceRecord) -> Result<()> {
        let cluster = record
            .parent
            .as_deref()
            .context("Service group record has no owning cluster")?;
        self.ecs
            .update_service()
            .cluster(cluster)
            .service(&record.id)
            .desired_count(0)
            .send()
            .await
            .with_context(|| format!("Failed to scale down service {}", record.id))?;
        Ok(())
    }

    async fn delete_nat_gateway(&self, nat_id: &str) -> Result<()> {
        self.ec2
            .delete_nat_gateway()
            .nat_gateway_id(nat_id)
            .send()
            .await
            .with_context(|| format!("Failed to delete NAT gateway {nat_id}"))?;
        Ok(())
    }

    async fn delete_load_balancer(&self, record: &ResourceRecord) -> Result<()> {
        let arn = record
            .arn
            .as_deref()
            .context("Load balancer record has no ARN")?;
        self.elb
            .delete_load_balancer()
            .load_balancer_arn(arn)
            .send()
            .await
            .with_context(|| format!("Failed to delete load balancer {}", record.id))?;
        Ok(())
    }

    /// Buckets must be empty before deletion, so objects are drained first.
    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let mut request = self.s3.list_objects_v2().bucket(bucket);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to list objects in {bucket}"))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    self.s3
                        .delete_object()
                        .bucket(bucket)
                        .key(key)
                        .send()
                        .await
                        .with_context(|| format!("Failed to delete object {bucket}/{key}"))?;
                }
            }

            continuation = response.next_continuation_token().map(|s| s.to_string());
            if continuation.is_none() {
                break;
            }
        }

        self.s3
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .with_context(|| format!("Failed to delete bucket {bucket}"))?;
        Ok(())
    }

    async fn delete_search_domain(&self, domain: &str) -> Result<()> {
        self.opensearch
            .delete_domain()
            .domain_name(domain)
            .send()
            .await
            .with_context(|| format!("Failed to delete search domain {domain}"))?;
        Ok(())
    }

    async fn stop_virtual_desktop(&self, workspace_id: &str) -> Result<()> {
        let request = aws_sdk_workspaces::types::StopRequest::builder()
            .workspace_id(workspace_id)
            .build();
        let response = self
            .workspaces
            .stop_workspaces()
            .stop_workspace_requests(request)
            .send()
            .await
            .with_context(|| format!("Failed to stop virtual desktop {workspace_id}"))?;

        // This API reports per-workspace failures in the response body
        if let Some(failed) = response.failed_requests().first() {
            anyhow::bail!(
                "Failed to stop virtual desktop {workspace_id}: {}",
                failed.error_message().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    /// Mark a deactivated resource with sweep tags. Deleted kinds leave
    /// nothing to tag and are a no-op.
    pub(crate) async fn tag_swept_resource(
        &self,
        record: &ResourceRecord,
        reason: &str,
    ) -> Result<()> {
        let swept_at = format_swept_at(Utc::now());
        match record.kind {
            ResourceKind::ComputeInstance => {
                self.ec2
                    .create_tags()
                    .resources(&record.id)
                    .tags(
                        aws_sdk_ec2::types::Tag::builder()
                            .key(TAG_SWEPT_AT)
                            .value(&swept_at)
                            .build(),
                    )
                    .tags(
                        aws_sdk_ec2::types::Tag::builder()
                            .key(TAG_SWEPT_REASON)
                            .value(reason)
                            .build(),
                    )
                    .send()
                    .await
                    .with_context(|| format!("Failed to tag instance {}", record.id))?;
            }
            ResourceKind::ManagedDatabase => {
                let arn = record
                    .arn
                    .as_deref()
                    .context("Database record has no ARN for tagging")?;
                self.rds
                    .add_tags_to_resource()
                    .resource_name(arn)
                    .tags(
                        aws_sdk_rds::types::Tag::builder()
                            .key(TAG_SWEPT_AT)
                            .value(&swept_at)
                            .build(),
                    )
                    .tags(
                        aws_sdk_rds::types::Tag::builder()
                            .key(TAG_SWEPT_REASON)
                            .value(reason)
                            .build(),
                    )
                    .send()
                    .await
                    .with_context(|| format!("Failed to tag database {}", record.id))?;
            }
            ResourceKind::ServiceGroup => {
                let arn = record
                    .arn
                    .as_deref()
                    .context("Service record has no ARN for tagging")?;
                self.ecs
                    .tag_resource()
                    .resource_arn(arn)
                    .tags(
                        aws_sdk_ecs::types::Tag::builder()
                            .key(TAG_SWEPT_AT)
                            .value(&swept_at)
                            .build(),
                    )
                    .tags(
                        aws_sdk_ecs::types::Tag::builder()
                            .key(TAG_SWEPT_REASON)
                            .value(reason)
                            .build(),
                    )
                    .send()
                    .await
                    .with_context(|| format!("Failed to tag service {}", record.id))?;
            }
            // Deleted or provider-managed kinds: nothing to tag
            _ => {}
        }
        Ok(())
    }
}
