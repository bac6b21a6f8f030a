//! Per-kind resource inventory
//!
//! Each listing produces immutable `ResourceRecord`s with everything later
//! stages need: creation time, tags, the instance class or unit count for
//! the cost estimate, and — for service groups — the owning cluster, so no
//! second lookup pass is needed at execution time.
//!
//! Only resources in an active state are listed (running instances,
//! available databases, services with a nonzero desired count); anything
//! already stopped has nothing to sweep.

use super::provider::AwsProvider;
use super::tags;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ecs::types::ServiceField;
use chrono::DateTime;
use curfew_common::{ResourceKind, ResourceRecord};
use std::collections::HashMap;
use tracing::debug;

/// ECS DescribeServices accepts at most this many services per call
const ECS_DESCRIBE_BATCH: usize = 10;

/// ELBv2 DescribeTags accepts at most this many ARNs per call
const ELB_TAG_BATCH: usize = 20;

/// OpenSearch DescribeDomains accepts at most this many names per call
const OPENSEARCH_DESCRIBE_BATCH: usize = 5;

impl AwsProvider {
    pub(crate) async fn list_kind(&self, kind: ResourceKind) -> Result<Vec<ResourceRecord>> {
        let records = match kind {
            ResourceKind::ComputeInstance => self.list_compute_instances().await?,
            ResourceKind::ManagedDatabase => self.list_managed_databases().await?,
            ResourceKind::ServiceGroup => self.list_service_groups().await?,
            ResourceKind::NatGateway => self.list_nat_gateways().await?,
            ResourceKind::LoadBalancer => self.list_load_balancers().await?,
            ResourceKind::ObjectStoreBucket => self.list_object_store_buckets().await?,
            ResourceKind::SearchDomain => self.list_search_domains().await?,
            ResourceKind::VirtualDesktop => self.list_virtual_desktops().await?,
        };
        debug!(kind = %kind, count = records.len(), region = %self.region, "Inventoried resources");
        Ok(records)
    }

    async fn list_compute_instances(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.ec2.describe_instances().filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .build(),
            );
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe instances")?;

            for reservation in response.reservations() {
                for instance in reservation.instances() {
                    let Some(instance_id) = instance.instance_id() else {
                        continue;
                    };
                    let tag_map = tags::extract_ec2_tags(instance.tags());
                    records.push(ResourceRecord {
                        kind: ResourceKind::ComputeInstance,
                        region: self.region.clone(),
                        id: instance_id.to_string(),
                        name: tags::name_from_tags(&tag_map, instance_id),
                        created_at: instance
                            .launch_time()
                            .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                        instance_class: instance.instance_type().map(|t| t.as_str().to_string()),
                        tags: tag_map,
                        parent: None,
                        arn: None,
                        size_factor: 1.0,
                    });
                }
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(records)
    }

    async fn list_managed_databases(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.rds.describe_db_instances();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe database instances")?;

            for db in response.db_instances() {
                if db.db_instance_status() != Some("available") {
                    continue;
                }
                let Some(db_id) = db.db_instance_identifier() else {
                    continue;
                };
                let tag_map = tags::extract_rds_tags(db.tag_list());
                records.push(ResourceRecord {
                    kind: ResourceKind::ManagedDatabase,
                    region: self.region.clone(),
                    id: db_id.to_string(),
                    name: db_id.to_string(),
                    created_at: db
                        .instance_create_time()
                        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                    instance_class: db.db_instance_class().map(|c| c.to_string()),
                    tags: tag_map,
                    parent: None,
                    arn: db.db_instance_arn().map(|a| a.to_string()),
                    size_factor: 1.0,
                });
            }

            marker = response.marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        Ok(records)
    }

    /// Service groups need the owning cluster to act; it is resolved here,
    /// once, and carried on the record.
    async fn list_service_groups(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();

        let mut cluster_arns = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut request = self.ecs.list_clusters();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request.send().await.context("Failed to list clusters")?;
            cluster_arns.extend(response.cluster_arns().iter().cloned());
            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        for cluster in &cluster_arns {
            let mut service_arns = Vec::new();
            let mut next_token: Option<String> = None;
            loop {
                let mut request = self.ecs.list_services().cluster(cluster);
                if let Some(token) = &next_token {
                    request = request.next_token(token);
                }
                let response = request
                    .send()
                    .await
                    .with_context(|| format!("Failed to list services in {cluster}"))?;
                service_arns.extend(response.service_arns().iter().cloned());
                next_token = response.next_token().map(|s| s.to_string());
                if next_token.is_none() {
                    break;
                }
            }

            for chunk in service_arns.chunks(ECS_DESCRIBE_BATCH) {
                let response = self
                    .ecs
                    .describe_services()
                    .cluster(cluster)
                    .set_services(Some(chunk.to_vec()))
                    .include(ServiceField::Tags)
                    .send()
                    .await
                    .with_context(|| format!("Failed to describe services in {cluster}"))?;

                for service in response.services() {
                    if service.desired_count() <= 0 {
                        continue;
                    }
                    let Some(service_name) = service.service_name() else {
                        continue;
                    };
                    let tag_map = tags::extract_ecs_tags(service.tags());
                    records.push(ResourceRecord {
                        kind: ResourceKind::ServiceGroup,
                        region: self.region.clone(),
                        id: service_name.to_string(),
                        name: service_name.to_string(),
                        created_at: service
                            .created_at()
                            .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                        instance_class: None,
                        tags: tag_map,
                        parent: Some(cluster.clone()),
                        arn: service.service_arn().map(|a| a.to_string()),
                        size_factor: f64::from(service.desired_count()),
                    });
                }
            }
        }

        Ok(records)
    }

    async fn list_nat_gateways(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.ec2.describe_nat_gateways().filter(
                Filter::builder().name("state").values("available").build(),
            );
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe NAT gateways")?;

            for nat in response.nat_gateways() {
                let Some(nat_id) = nat.nat_gateway_id() else {
                    continue;
                };
                let tag_map = tags::extract_ec2_tags(nat.tags());
                records.push(ResourceRecord {
                    kind: ResourceKind::NatGateway,
                    region: self.region.clone(),
                    id: nat_id.to_string(),
                    name: tags::name_from_tags(&tag_map, nat_id),
                    created_at: nat
                        .create_time()
                        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                    instance_class: None,
                    tags: tag_map,
                    parent: None,
                    arn: None,
                    size_factor: 1.0,
                });
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(records)
    }

    async fn list_load_balancers(&self) -> Result<Vec<ResourceRecord>> {
        let mut balancers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.elb.describe_load_balancers();
            if let Some(m) = &marker {
                request = request.marker(m);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe load balancers")?;
            balancers.extend(response.load_balancers().iter().cloned());
            marker = response.next_marker().map(|s| s.to_string());
            if marker.is_none() {
                break;
            }
        }

        // Tags come from a separate call, batched by ARN
        let mut tags_by_arn: HashMap<String, HashMap<String, String>> = HashMap::new();
        let arns: Vec<String> = balancers
            .iter()
            .filter_map(|lb| lb.load_balancer_arn().map(|a| a.to_string()))
            .collect();
        for chunk in arns.chunks(ELB_TAG_BATCH) {
            let response = self
                .elb
                .describe_tags()
                .set_resource_arns(Some(chunk.to_vec()))
                .send()
                .await
                .context("Failed to describe load balancer tags")?;
            for description in response.tag_descriptions() {
                if let Some(arn) = description.resource_arn() {
                    tags_by_arn.insert(arn.to_string(), tags::extract_elb_tags(description.tags()));
                }
            }
        }

        let mut records = Vec::new();
        for lb in balancers {
            let (Some(arn), Some(name)) = (lb.load_balancer_arn(), lb.load_balancer_name()) else {
                continue;
            };
            let tag_map = tags_by_arn.remove(arn).unwrap_or_default();
            records.push(ResourceRecord {
                kind: ResourceKind::LoadBalancer,
                region: self.region.clone(),
                id: name.to_string(),
                name: name.to_string(),
                created_at: lb
                    .created_time()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                instance_class: None,
                tags: tag_map,
                parent: None,
                arn: Some(arn.to_string()),
                size_factor: 1.0,
            });
        }

        Ok(records)
    }

    /// Bucket listing is account-global; each record is attributed to the
    /// region the bucket actually lives in, and only buckets in this
    /// provider's region are kept so no bucket is swept twice.
    async fn list_object_store_buckets(&self) -> Result<Vec<ResourceRecord>> {
        let response = self
            .s3
            .list_buckets()
            .send()
            .await
            .context("Failed to list buckets")?;

        let mut records = Vec::new();
        for bucket in response.buckets() {
            let Some(bucket_name) = bucket.name() else {
                continue;
            };

            let location = self
                .s3
                .get_bucket_location()
                .bucket(bucket_name)
                .send()
                .await
                .with_context(|| format!("Failed to get location of bucket {bucket_name}"))?;
            let bucket_region = location
                .location_constraint()
                .map(|c| c.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("us-east-1");
            if bucket_region != self.region {
                continue;
            }

            // Untagged buckets are common; treat a tagging error as no tags
            let tag_map = match self
                .s3
                .get_bucket_tagging()
                .bucket(bucket_name)
                .send()
                .await
            {
                Ok(resp) => tags::extract_s3_tags(resp.tag_set()),
                Err(_) => HashMap::new(),
            };

            records.push(ResourceRecord {
                kind: ResourceKind::ObjectStoreBucket,
                region: self.region.clone(),
                id: bucket_name.to_string(),
                name: bucket_name.to_string(),
                created_at: bucket
                    .creation_date()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                instance_class: None,
                tags: tag_map,
                parent: None,
                arn: None,
                size_factor: 1.0,
            });
        }

        Ok(records)
    }

    /// The domain API reports no creation timestamp; the
    /// `curfew:created-at` tag is the only age source for this kind.
    async fn list_search_domains(&self) -> Result<Vec<ResourceRecord>> {
        let names_response = self
            .opensearch
            .list_domain_names()
            .send()
            .await
            .context("Failed to list search domains")?;
        let names: Vec<String> = names_response
            .domain_names()
            .iter()
            .filter_map(|d| d.domain_name().map(|n| n.to_string()))
            .collect();

        let mut records = Vec::new();
        for chunk in names.chunks(OPENSEARCH_DESCRIBE_BATCH) {
            let response = self
                .opensearch
                .describe_domains()
                .set_domain_names(Some(chunk.to_vec()))
                .send()
                .await
                .context("Failed to describe search domains")?;

            for domain in response.domain_status_list() {
                if domain.deleted() == Some(true) {
                    continue;
                }
                let domain_name = domain.domain_name();
                let arn = domain.arn();

                let tag_map = match self.opensearch.list_tags().arn(arn).send().await {
                    Ok(resp) => tags::extract_opensearch_tags(resp.tag_list()),
                    Err(_) => HashMap::new(),
                };

                let node_count = domain
                    .cluster_config()
                    .and_then(|c| c.instance_count())
                    .unwrap_or(1);

                records.push(ResourceRecord {
                    kind: ResourceKind::SearchDomain,
                    region: self.region.clone(),
                    id: domain_name.to_string(),
                    name: domain_name.to_string(),
                    created_at: tags::created_at_from_tags(&tag_map),
                    instance_class: None,
                    tags: tag_map,
                    parent: None,
                    arn: Some(arn.to_string()),
                    size_factor: f64::from(node_count.max(1)),
                });
            }
        }

        Ok(records)
    }

    /// Virtual desktops also lack a creation timestamp in the API; the
    /// `curfew:created-at` tag fallback applies.
    async fn list_virtual_desktops(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.workspaces.describe_workspaces();
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }
            let response = request
                .send()
                .await
                .context("Failed to describe virtual desktops")?;

            for workspace in response.workspaces() {
                if workspace.state().map(|s| s.as_str()) != Some("AVAILABLE") {
                    continue;
                }
                let Some(workspace_id) = workspace.workspace_id() else {
                    continue;
                };

                let tag_map = match self
                    .workspaces
                    .describe_tags()
                    .resource_id(workspace_id)
                    .send()
                    .await
                {
                    Ok(resp) => tags::extract_workspaces_tags(resp.tag_list()),
                    Err(_) => HashMap::new(),
                };

                let name = workspace
                    .user_name()
                    .map(|u| format!("{workspace_id} ({u})"))
                    .unwrap_or_else(|| workspace_id.to_string());

                records.push(ResourceRecord {
                    kind: ResourceKind::VirtualDesktop,
                    region: self.region.clone(),
                    id: workspace_id.to_string(),
                    name,
                    created_at: tags::created_at_from_tags(&tag_map),
                    instance_class: None,
                    tags: tag_map,
                    parent: None,
                    arn: None,
                    size_factor: 1.0,
                });
            }

            next_token = response.next_token().map(|s| s.to_string());
            if next_token.is_none() {
                break;
            }
        }

        Ok(records)
    }
}
