//! Cluster metrics snapshot types.

use std::collections::BTreeMap;

use crate::SCHEMA_VERSION;

/// A point-in-time aggregate of one cluster's resources and health.
///
/// Snapshots are produced by a fetcher once per refresh cycle and are never
/// mutated afterwards. The polling engine stores and returns them as opaque
/// values.
///
/// # Example
///
/// ```rust
/// use clusterwatch_types::{ClusterMetrics, PodPhase, ResourceUsage};
///
/// let metrics = ClusterMetrics::builder()
///     .node("cp-1", |n| {
///         n.ready(true)
///          .capacity("8", "32Gi")
///          .usage("1250m", "12Gi")
///     })
///     .pod("kube-system", PodPhase::Running)
///     .pod_usage("kube-system/coredns-0", ResourceUsage::new("5m", "20Mi"))
///     .service("ClusterIP")
///     .service("LoadBalancer")
///     .namespaces(4)
///     .build();
///
/// assert_eq!(metrics.services.total, 2);
/// assert_eq!(metrics.pods.by_namespace["kube-system"], 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClusterMetrics {
    /// [`SCHEMA_VERSION`] of the fetcher that produced the snapshot.
    /// Snapshots written before the field existed read back as the current
    /// version.
    #[cfg_attr(feature = "serde", serde(default = "schema_version"))]
    pub version: u32,

    /// Node counts, readiness and per-node resources.
    pub nodes: NodeSummary,

    /// Pod counts by phase and namespace.
    pub pods: PodSummary,

    /// Service counts by type.
    pub services: ServiceSummary,

    /// Number of namespaces in the cluster.
    pub namespaces: u32,

    /// Aggregate capacity and usage across the cluster.
    pub cluster_resources: ClusterResources,
}

impl ClusterMetrics {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> ClusterMetricsBuilder {
        ClusterMetricsBuilder::new()
    }

}

impl Default for ClusterMetrics {
    fn default() -> Self {
        Self {
            version: schema_version(),
            nodes: NodeSummary::default(),
            pods: PodSummary::default(),
            services: ServiceSummary::default(),
            namespaces: 0,
            cluster_resources: ClusterResources::default(),
        }
    }
}

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Node-level summary.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NodeSummary {
    pub total: u32,
    pub ready: u32,
    pub not_ready: u32,
    /// Per-node capacity and usage, in the order the API listed them.
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: Vec<NodeMetrics>,
}

/// Capacity and usage of a single node.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeMetrics {
    pub name: String,
    /// Current usage as reported by metrics-server. Empty when unavailable.
    pub resources: ResourceUsage,
    pub capacity: ResourceUsage,
}

/// A CPU/memory pair, kept as display strings (`"250m"`, `"512Mi"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceUsage {
    pub cpu: String,
    pub memory: String,
}

impl ResourceUsage {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.memory.is_empty()
    }
}

/// Pod-level summary.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PodSummary {
    pub total: u32,
    pub status: PodPhaseCounts,
    pub by_namespace: BTreeMap<String, u32>,
    /// Usage per pod name, only for pods metrics-server reported on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resources: BTreeMap<String, ResourceUsage>,
}

/// Pod counts for the four terminal/non-terminal phases.
///
/// Pods in the `Unknown` phase count towards [`PodSummary::total`] only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PodPhaseCounts {
    pub running: u32,
    pub pending: u32,
    pub failed: u32,
    pub succeeded: u32,
}

impl PodPhaseCounts {
    fn count(&mut self, phase: PodPhase) {
        match phase {
            PodPhase::Running => self.running += 1,
            PodPhase::Pending => self.pending += 1,
            PodPhase::Failed => self.failed += 1,
            PodPhase::Succeeded => self.succeeded += 1,
            PodPhase::Unknown => {}
        }
    }
}

/// Lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PodPhase {
    Running,
    Pending,
    Failed,
    Succeeded,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(phase: &str) -> Self {
        match phase {
            "Running" => PodPhase::Running,
            "Pending" => PodPhase::Pending,
            "Failed" => PodPhase::Failed,
            "Succeeded" => PodPhase::Succeeded,
            _ => PodPhase::Unknown,
        }
    }
}

/// Service-level summary.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ServiceSummary {
    pub total: u32,
    pub by_type: BTreeMap<String, u32>,
}

/// Aggregate capacity and usage, as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterResources {
    #[cfg_attr(feature = "serde", serde(rename = "totalCPU"))]
    pub total_cpu: String,
    #[cfg_attr(feature = "serde", serde(rename = "totalMemory"))]
    pub total_memory: String,
    #[cfg_attr(feature = "serde", serde(rename = "usedCPU"))]
    pub used_cpu: String,
    #[cfg_attr(feature = "serde", serde(rename = "usedMemory"))]
    pub used_memory: String,
}

/// Builder for [`ClusterMetrics`].
///
/// Totals and per-bucket counts are derived from the nodes, pods and
/// services added, so they can never disagree with each other.
#[derive(Debug, Default)]
pub struct ClusterMetricsBuilder {
    nodes: NodeSummary,
    pods: PodSummary,
    services: ServiceSummary,
    namespaces: u32,
    resources: ClusterResources,
}

impl ClusterMetricsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node configured with a closure.
    pub fn node<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(NodeMetricsBuilder) -> NodeMetricsBuilder,
    {
        let (metrics, ready) = f(NodeMetricsBuilder::new(name)).build();
        self.nodes.total += 1;
        if ready {
            self.nodes.ready += 1;
        } else {
            self.nodes.not_ready += 1;
        }
        self.nodes.metrics.push(metrics);
        self
    }

    /// Count a pod in `namespace` with the given phase.
    pub fn pod(mut self, namespace: impl Into<String>, phase: PodPhase) -> Self {
        self.pods.total += 1;
        self.pods.status.count(phase);
        *self.pods.by_namespace.entry(namespace.into()).or_insert(0) += 1;
        self
    }

    /// Attach usage figures to a pod, keyed `namespace/name`.
    pub fn pod_usage(mut self, name: impl Into<String>, usage: ResourceUsage) -> Self {
        self.pods.resources.insert(name.into(), usage);
        self
    }

    /// Count a service of the given type (`ClusterIP`, `NodePort`, ...).
    pub fn service(mut self, service_type: impl Into<String>) -> Self {
        self.services.total += 1;
        *self.services.by_type.entry(service_type.into()).or_insert(0) += 1;
        self
    }

    pub fn namespaces(mut self, count: u32) -> Self {
        self.namespaces = count;
        self
    }

    pub fn resources(mut self, resources: ClusterResources) -> Self {
        self.resources = resources;
        self
    }

    pub fn build(self) -> ClusterMetrics {
        ClusterMetrics {
            version: SCHEMA_VERSION,
            nodes: self.nodes,
            pods: self.pods,
            services: self.services,
            namespaces: self.namespaces,
            cluster_resources: self.resources,
        }
    }
}

/// Builder for a single node's metrics.
#[derive(Debug)]
pub struct NodeMetricsBuilder {
    name: String,
    ready: bool,
    capacity: ResourceUsage,
    usage: ResourceUsage,
}

impl NodeMetricsBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: false,
            capacity: ResourceUsage::default(),
            usage: ResourceUsage::default(),
        }
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn capacity(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        self.capacity = ResourceUsage::new(cpu, memory);
        self
    }

    pub fn usage(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        self.usage = ResourceUsage::new(cpu, memory);
        self
    }

    fn build(self) -> (NodeMetrics, bool) {
        (
            NodeMetrics {
                name: self.name,
                resources: self.usage,
                capacity: self.capacity,
            },
            self.ready,
        )
    }
}
