//! Swept resource kinds and their lifecycle behavior
//!
//! The sweeper acts on a closed set of resource kinds. Each kind knows which
//! deactivation action applies to it, whether acting on it needs a parent
//! identifier, and whether the provider models an asynchronous transition
//! that must be awaited after the action.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deactivation action applied to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Stop the resource; it can be started again later
    Stop,
    /// Scale the resource down to zero units, keeping its definition
    ScaleToZero,
    /// Delete the resource outright
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Stop => "stop",
            Action::ScaleToZero => "scale-to-zero",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of cloud resources managed by the sweeper
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// EC2 instance
    ComputeInstance,
    /// RDS database instance
    ManagedDatabase,
    /// ECS service (acting requires the owning cluster)
    ServiceGroup,
    /// NAT gateway
    NatGateway,
    /// ELBv2 load balancer
    LoadBalancer,
    /// S3 bucket
    ObjectStoreBucket,
    /// OpenSearch domain
    SearchDomain,
    /// WorkSpaces virtual desktop
    VirtualDesktop,
}

impl ResourceKind {
    /// Every kind, in scan order
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::ComputeInstance,
        ResourceKind::ManagedDatabase,
        ResourceKind::ServiceGroup,
        ResourceKind::NatGateway,
        ResourceKind::LoadBalancer,
        ResourceKind::ObjectStoreBucket,
        ResourceKind::SearchDomain,
        ResourceKind::VirtualDesktop,
    ];

    /// The deactivation action for this kind
    pub fn action(self) -> Action {
        match self {
            ResourceKind::ComputeInstance => Action::Stop,
            ResourceKind::ManagedDatabase => Action::Stop,
            ResourceKind::ServiceGroup => Action::ScaleToZero,
            ResourceKind::NatGateway => Action::Delete,
            ResourceKind::LoadBalancer => Action::Delete,
            ResourceKind::ObjectStoreBucket => Action::Delete,
            ResourceKind::SearchDomain => Action::Delete,
            ResourceKind::VirtualDesktop => Action::Stop,
        }
    }

    /// Kinds that cannot be acted on without a parent identifier.
    ///
    /// The parent is resolved once at discovery time and carried on the
    /// record, so no second lookup pass is needed when acting.
    pub fn requires_parent(self) -> bool {
        matches!(self, ResourceKind::ServiceGroup)
    }

    /// Kinds whose action starts an asynchronous transition that the
    /// executor waits out before marking the action complete.
    pub fn awaits_terminal_state(self) -> bool {
        matches!(
            self,
            ResourceKind::ComputeInstance | ResourceKind::ManagedDatabase
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::ComputeInstance => "compute-instance",
            ResourceKind::ManagedDatabase => "managed-database",
            ResourceKind::ServiceGroup => "service-group",
            ResourceKind::NatGateway => "nat-gateway",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::ObjectStoreBucket => "object-store-bucket",
            ResourceKind::SearchDomain => "search-domain",
            ResourceKind::VirtualDesktop => "virtual-desktop",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
