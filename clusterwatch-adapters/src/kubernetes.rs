//! Kubernetes fetcher using the core API and `metrics.k8s.io`.
//!
//! Credentials are a base64-encoded kubeconfig. Each fetch builds a client
//! from it, lists nodes, pods, services and namespaces, and then asks
//! metrics-server for live usage. Usage is best-effort: a cluster without
//! metrics-server still yields a snapshot, just with empty usage figures.
//!
//! ## Metrics Collected
//!
//! - **Nodes**: total, ready/not-ready (by the `Ready` condition), capacity
//!   and usage per node
//! - **Pods**: total, counts by phase and by namespace, usage per pod
//! - **Services**: total and counts by type
//! - **Namespaces**: count
//! - **Cluster resources**: total capacity (`"8 cores"`, `"31964Mi"`) and
//!   usage summed over pods (`"1250m"`, `"2048Mi"`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use clusterwatch_adapters::kubernetes::KubeFetcher;
//! use clusterwatch_types::Credentials;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = KubeFetcher::builder().usage_metrics(true).build();
//!
//!     let credentials = Credentials::new(std::env::var("KUBECONFIG_B64")?);
//!     KubeFetcher::validate_credentials(&credentials)?;
//!
//!     let metrics = fetcher.collect(&credentials).await?;
//!     println!(
//!         "{} nodes ({} ready), {} pods",
//!         metrics.nodes.total, metrics.nodes.ready, metrics.pods.total
//!     );
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use serde::Deserialize;
use tracing::debug;

use clusterwatch_core::{FetchError, Fetcher};
use clusterwatch_types::{
    ClusterMetrics, ClusterResources, Credentials, PodPhase, ResourceUsage,
};

use crate::quantity::{
    cpu_cores, cpu_millis, format_cores, format_mebibytes, format_millis, memory_bytes,
};
use crate::AdapterError;

const METRICS_GROUP: &str = "metrics.k8s.io";
const METRICS_VERSION: &str = "v1beta1";

/// Fetches cluster metrics from a Kubernetes API server.
#[derive(Debug, Clone)]
pub struct KubeFetcher {
    usage_metrics: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl KubeFetcher {
    /// Create a new builder for configuring the fetcher.
    pub fn builder() -> KubeFetcherBuilder {
        KubeFetcherBuilder::default()
    }

    /// Check that credentials decode to a kubeconfig naming at least one
    /// cluster. Does not contact the cluster.
    pub fn validate_credentials(credentials: &Credentials) -> Result<(), AdapterError> {
        decode_kubeconfig(credentials).map(|_| ())
    }

    /// Collect a metrics snapshot from the cluster.
    pub async fn collect(&self, credentials: &Credentials) -> Result<ClusterMetrics, AdapterError> {
        let kubeconfig = decode_kubeconfig(credentials)?;
        let client = self.client(kubeconfig).await?;

        let lp = ListParams::default();
        let nodes: Api<Node> = Api::all(client.clone());
        let pods: Api<Pod> = Api::all(client.clone());
        let services: Api<Service> = Api::all(client.clone());
        let namespaces: Api<Namespace> = Api::all(client.clone());

        let (nodes, pods, services, namespaces) = tokio::try_join!(
            nodes.list(&lp),
            pods.list(&lp),
            services.list(&lp),
            namespaces.list(&lp),
        )?;

        let usage = if self.usage_metrics {
            fetch_usage(&client).await
        } else {
            Usage::default()
        };

        Ok(summarize(&ClusterObjects {
            nodes: nodes.items,
            pods: pods.items,
            services: services.items,
            namespaces: namespaces.items.len(),
            usage,
        }))
    }

    async fn client(&self, kubeconfig: Kubeconfig) -> Result<Client, AdapterError> {
        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| AdapterError::Kubeconfig(e.to_string()))?;
        config.connect_timeout = Some(self.connect_timeout);
        config.read_timeout = Some(self.read_timeout);

        Ok(Client::try_from(config)?)
    }
}

impl Default for KubeFetcher {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl Fetcher for KubeFetcher {
    async fn fetch(&self, credentials: &Credentials) -> Result<ClusterMetrics, FetchError> {
        Ok(self.collect(credentials).await?)
    }
}

/// Builder for configuring a KubeFetcher.
#[derive(Debug, Default)]
pub struct KubeFetcherBuilder {
    usage_metrics: Option<bool>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl KubeFetcherBuilder {
    /// Query `metrics.k8s.io` for live usage (default: true).
    pub fn usage_metrics(mut self, enabled: bool) -> Self {
        self.usage_metrics = Some(enabled);
        self
    }

    /// Set the connection timeout (default: 10 seconds).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-request read timeout (default: 15 seconds).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Build the fetcher.
    pub fn build(self) -> KubeFetcher {
        KubeFetcher {
            usage_metrics: self.usage_metrics.unwrap_or(true),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            read_timeout: self.read_timeout.unwrap_or(Duration::from_secs(15)),
        }
    }
}

fn decode_kubeconfig(credentials: &Credentials) -> Result<Kubeconfig, AdapterError> {
    let bytes = STANDARD
        .decode(credentials.expose().trim())
        .map_err(|e| AdapterError::Credentials(e.to_string()))?;
    let yaml = String::from_utf8(bytes).map_err(|e| AdapterError::Credentials(e.to_string()))?;

    let kubeconfig =
        Kubeconfig::from_yaml(&yaml).map_err(|e| AdapterError::Kubeconfig(e.to_string()))?;
    if kubeconfig.clusters.is_empty() {
        return Err(AdapterError::Kubeconfig("no clusters defined".to_string()));
    }
    Ok(kubeconfig)
}

/// Live usage reported by metrics-server.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Keyed by node name.
    pub nodes: BTreeMap<String, RawUsage>,
    /// Keyed by `namespace/name`.
    pub pods: BTreeMap<String, PodUsage>,
}

/// Usage quantities as reported, unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawUsage {
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
}

/// A pod's usage summed over its containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PodUsage {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
}

// metrics.k8s.io payloads, beyond the object metadata

#[derive(Debug, Deserialize)]
struct NodeMetricsDoc {
    #[serde(default)]
    usage: RawUsage,
}

#[derive(Debug, Deserialize)]
struct PodMetricsDoc {
    #[serde(default)]
    containers: Vec<ContainerMetricsDoc>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetricsDoc {
    #[serde(default)]
    usage: RawUsage,
}

async fn fetch_usage(client: &Client) -> Usage {
    let lp = ListParams::default();
    let mut usage = Usage::default();

    let node_api: Api<DynamicObject> =
        Api::all_with(client.clone(), &metrics_resource("NodeMetrics", "nodes"));
    match node_api.list(&lp).await {
        Ok(list) => {
            for obj in list.items {
                let Some(name) = obj.metadata.name.clone() else {
                    continue;
                };
                if let Ok(doc) = serde_json::from_value::<NodeMetricsDoc>(obj.data) {
                    usage.nodes.insert(name, doc.usage);
                }
            }
        }
        Err(e) => debug!(error = %e, "Node usage unavailable"),
    }

    let pod_api: Api<DynamicObject> =
        Api::all_with(client.clone(), &metrics_resource("PodMetrics", "pods"));
    match pod_api.list(&lp).await {
        Ok(list) => {
            for obj in list.items {
                let (Some(namespace), Some(name)) =
                    (obj.metadata.namespace.clone(), obj.metadata.name.clone())
                else {
                    continue;
                };
                if let Ok(doc) = serde_json::from_value::<PodMetricsDoc>(obj.data) {
                    usage
                        .pods
                        .insert(pod_key(&namespace, &name), sum_containers(&doc.containers));
                }
            }
        }
        Err(e) => debug!(error = %e, "Pod usage unavailable"),
    }

    usage
}

fn metrics_resource(kind: &str, plural: &str) -> ApiResource {
    let gvk = GroupVersionKind::gvk(METRICS_GROUP, METRICS_VERSION, kind);
    ApiResource::from_gvk_with_plural(&gvk, plural)
}

fn sum_containers(containers: &[ContainerMetricsDoc]) -> PodUsage {
    containers.iter().fold(PodUsage::default(), |acc, c| PodUsage {
        cpu_millis: acc.cpu_millis + c.usage.cpu.as_deref().map(millis_or_zero).unwrap_or(0),
        memory_bytes: acc.memory_bytes
            + c.usage.memory.as_deref().map(bytes_or_zero).unwrap_or(0),
    })
}

fn pod_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

/// Everything a snapshot is computed from.
#[derive(Debug, Clone, Default)]
pub struct ClusterObjects {
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
    pub services: Vec<Service>,
    pub namespaces: usize,
    pub usage: Usage,
}

/// Aggregate listed objects and usage into a snapshot.
pub fn summarize(objects: &ClusterObjects) -> ClusterMetrics {
    let mut builder = ClusterMetrics::builder();
    let mut total_cores = 0u64;
    let mut total_memory = 0u64;

    for node in &objects.nodes {
        let name = node.metadata.name.clone().unwrap_or_default();
        let capacity = node.status.as_ref().and_then(|s| s.capacity.as_ref());
        let cpu_capacity = capacity.and_then(|c| c.get("cpu")).map(|q| q.0.clone());
        let memory_capacity = capacity.and_then(|c| c.get("memory")).map(|q| q.0.clone());

        total_cores += cpu_capacity.as_deref().map(cores_or_zero).unwrap_or(0);
        total_memory += memory_capacity.as_deref().map(bytes_or_zero).unwrap_or(0);

        let usage = objects
            .usage
            .nodes
            .get(&name)
            .map(display_usage)
            .unwrap_or_default();

        builder = builder.node(name, |n| {
            n.ready(node_ready(node))
                .capacity(
                    cpu_capacity.unwrap_or_default(),
                    memory_capacity.unwrap_or_default(),
                )
                .usage(usage.cpu, usage.memory)
        });
    }

    let mut used_millis = 0u64;
    let mut used_memory = 0u64;

    for pod in &objects.pods {
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        let name = pod.metadata.name.clone().unwrap_or_default();
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Unknown);

        let key = pod_key(&namespace, &name);
        builder = builder.pod(namespace, phase);

        if let Some(usage) = objects.usage.pods.get(&key) {
            used_millis += usage.cpu_millis;
            used_memory += usage.memory_bytes;
            builder = builder.pod_usage(
                key,
                ResourceUsage::new(
                    format_millis(usage.cpu_millis),
                    format_mebibytes(usage.memory_bytes),
                ),
            );
        }
    }

    for service in &objects.services {
        let service_type = service
            .spec
            .as_ref()
            .and_then(|s| s.type_.clone())
            .unwrap_or_else(|| "ClusterIP".to_string());
        builder = builder.service(service_type);
    }

    builder
        .namespaces(u32::try_from(objects.namespaces).unwrap_or(u32::MAX))
        .resources(ClusterResources {
            total_cpu: format_cores(total_cores),
            total_memory: format_mebibytes(total_memory),
            used_cpu: format_millis(used_millis),
            used_memory: format_mebibytes(used_memory),
        })
        .build()
}

/// Ready iff the first `Ready` condition has status `"True"`.
fn node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True")
}

fn display_usage(raw: &RawUsage) -> ResourceUsage {
    ResourceUsage::new(
        raw.cpu
            .as_deref()
            .map(|q| format_millis(millis_or_zero(q)))
            .unwrap_or_default(),
        raw.memory
            .as_deref()
            .map(|q| format_mebibytes(bytes_or_zero(q)))
            .unwrap_or_default(),
    )
}

fn cores_or_zero(q: &str) -> u64 {
    cpu_cores(q).unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring unparseable CPU quantity");
        0
    })
}

fn millis_or_zero(q: &str) -> u64 {
    cpu_millis(q).unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring unparseable CPU quantity");
        0
    })
}

fn bytes_or_zero(q: &str) -> u64 {
    memory_bytes(q).unwrap_or_else(|e| {
        debug!(error = %e, "Ignoring unparseable memory quantity");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus, PodStatus, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    const KUBECONFIG: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: test
  cluster:
    server: https://127.0.0.1:6443
contexts:
- name: test
  context:
    cluster: test
    user: test
current-context: test
users:
- name: test
  user:
    token: abc123
"#;

    fn node(name: &str, ready: Option<&str>, cpu: &str, memory: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                capacity: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity(cpu.to_string())),
                    ("memory".to_string(), Quantity(memory.to_string())),
                ])),
                conditions: ready.map(|status| {
                    vec![
                        NodeCondition {
                            type_: "MemoryPressure".to_string(),
                            status: "False".to_string(),
                            ..Default::default()
                        },
                        NodeCondition {
                            type_: "Ready".to_string(),
                            status: status.to_string(),
                            ..Default::default()
                        },
                    ]
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod(namespace: &str, name: &str, phase: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn service(service_type: Option<&str>) -> Service {
        Service {
            spec: Some(ServiceSpec {
                type_: service_type.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn objects() -> ClusterObjects {
        ClusterObjects {
            nodes: vec![
                node("worker-1", Some("True"), "4", "16Gi"),
                node("worker-2", Some("False"), "3500m", "8Gi"),
                node("worker-3", None, "2", "4Gi"),
            ],
            pods: vec![
                pod("default", "web-1", "Running"),
                pod("default", "web-2", "Pending"),
                pod("kube-system", "dns", "Running"),
                pod("batch", "job-1", "Succeeded"),
                pod("batch", "job-2", "Failed"),
            ],
            services: vec![
                service(Some("ClusterIP")),
                service(Some("NodePort")),
                service(None),
            ],
            namespaces: 4,
            usage: Usage::default(),
        }
    }

    #[test]
    fn test_node_readiness() {
        let metrics = summarize(&objects());
        assert_eq!(metrics.nodes.total, 3);
        assert_eq!(metrics.nodes.ready, 1);
        assert_eq!(metrics.nodes.not_ready, 2);
        assert_eq!(metrics.nodes.metrics[1].capacity.cpu, "3500m");
        assert_eq!(metrics.nodes.metrics[0].capacity.memory, "16Gi");
    }

    #[test]
    fn test_total_capacity_rounds_cores_per_node() {
        let metrics = summarize(&objects());
        // 4 + ceil(3.5) + 2
        assert_eq!(metrics.cluster_resources.total_cpu, "10 cores");
        assert_eq!(metrics.cluster_resources.total_memory, "28672Mi");
    }

    #[test]
    fn test_pod_counts() {
        let metrics = summarize(&objects());
        assert_eq!(metrics.pods.total, 5);
        assert_eq!(metrics.pods.status.running, 2);
        assert_eq!(metrics.pods.status.pending, 1);
        assert_eq!(metrics.pods.status.succeeded, 1);
        assert_eq!(metrics.pods.status.failed, 1);
        assert_eq!(metrics.pods.by_namespace.get("default"), Some(&2));
        assert_eq!(metrics.pods.by_namespace.get("batch"), Some(&2));
        assert_eq!(metrics.pods.by_namespace.get("kube-system"), Some(&1));
    }

    #[test]
    fn test_services_default_to_cluster_ip() {
        let metrics = summarize(&objects());
        assert_eq!(metrics.services.total, 3);
        assert_eq!(metrics.services.by_type.get("ClusterIP"), Some(&2));
        assert_eq!(metrics.services.by_type.get("NodePort"), Some(&1));
        assert_eq!(metrics.namespaces, 4);
    }

    #[test]
    fn test_usage_is_summed_over_listed_pods() {
        let mut objects = objects();
        objects.usage.pods.insert(
            pod_key("default", "web-1"),
            PodUsage {
                cpu_millis: 250,
                memory_bytes: 128 * 1024 * 1024,
            },
        );
        objects.usage.pods.insert(
            pod_key("kube-system", "dns"),
            PodUsage {
                cpu_millis: 1000,
                memory_bytes: 64 * 1024 * 1024,
            },
        );
        // Usage for a pod that no longer exists is ignored
        objects.usage.pods.insert(
            pod_key("default", "gone"),
            PodUsage {
                cpu_millis: 5000,
                memory_bytes: 0,
            },
        );

        let metrics = summarize(&objects);
        assert_eq!(metrics.cluster_resources.used_cpu, "1250m");
        assert_eq!(metrics.cluster_resources.used_memory, "192Mi");
        assert_eq!(
            metrics.pods.resources.get("default/web-1"),
            Some(&ResourceUsage::new("250m", "128Mi"))
        );
        assert_eq!(metrics.pods.resources.len(), 2);
    }

    #[test]
    fn test_node_usage_is_attached_by_name() {
        let mut objects = objects();
        objects.usage.nodes.insert(
            "worker-1".to_string(),
            RawUsage {
                cpu: Some("1500000000n".to_string()),
                memory: Some("2097152Ki".to_string()),
            },
        );

        let metrics = summarize(&objects);
        assert_eq!(
            metrics.nodes.metrics[0].resources,
            ResourceUsage::new("1500m", "2048Mi")
        );
        assert!(metrics.nodes.metrics[1].resources.is_empty());
    }

    #[test]
    fn test_without_usage_reports_zero() {
        let metrics = summarize(&objects());
        assert_eq!(metrics.cluster_resources.used_cpu, "0m");
        assert_eq!(metrics.cluster_resources.used_memory, "0Mi");
        assert!(metrics.pods.resources.is_empty());
    }

    #[test]
    fn test_empty_cluster() {
        let metrics = summarize(&ClusterObjects::default());
        assert_eq!(metrics.nodes.total, 0);
        assert_eq!(metrics.cluster_resources.total_cpu, "0 cores");
        assert_eq!(metrics.cluster_resources.total_memory, "0Mi");
    }

    #[test]
    fn test_unparseable_capacity_counts_as_zero() {
        let objects = ClusterObjects {
            nodes: vec![
                node("good", Some("True"), "2", "1Gi"),
                node("bad", Some("True"), "lots", "???"),
            ],
            ..Default::default()
        };

        let metrics = summarize(&objects);
        assert_eq!(metrics.cluster_resources.total_cpu, "2 cores");
        assert_eq!(metrics.cluster_resources.total_memory, "1024Mi");
    }

    #[test]
    fn test_sum_containers() {
        let doc: PodMetricsDoc = serde_json::from_value(serde_json::json!({
            "containers": [
                {"name": "app", "usage": {"cpu": "200m", "memory": "100Mi"}},
                {"name": "sidecar", "usage": {"cpu": "50000000n", "memory": "28Mi"}}
            ]
        }))
        .unwrap();

        assert_eq!(
            sum_containers(&doc.containers),
            PodUsage {
                cpu_millis: 250,
                memory_bytes: 128 * 1024 * 1024,
            }
        );
    }

    #[test]
    fn test_validate_credentials_accepts_kubeconfig() {
        let credentials = Credentials::new(STANDARD.encode(KUBECONFIG));
        assert!(KubeFetcher::validate_credentials(&credentials).is_ok());
    }

    #[test]
    fn test_validate_credentials_rejects_bad_base64() {
        let err = KubeFetcher::validate_credentials(&Credentials::new("not base64!!")).unwrap_err();
        assert!(matches!(err, AdapterError::Credentials(_)));
        assert!(err.to_string().starts_with("invalid kubeconfig encoding"));
    }

    #[test]
    fn test_validate_credentials_rejects_config_without_clusters() {
        let credentials = Credentials::new(STANDARD.encode("apiVersion: v1\nkind: Config\n"));
        let err = KubeFetcher::validate_credentials(&credentials).unwrap_err();
        assert!(matches!(err, AdapterError::Kubeconfig(_)));
    }

    #[tokio::test]
    async fn test_fetch_reports_credentials_error() {
        let fetcher = KubeFetcher::default();
        let err = fetcher
            .fetch(&Credentials::new("%%%"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), clusterwatch_core::FetchErrorKind::Credentials);
    }

    #[test]
    fn test_builder_defaults() {
        let fetcher = KubeFetcher::builder().build();
        assert!(fetcher.usage_metrics);
        assert_eq!(fetcher.connect_timeout, Duration::from_secs(10));
        assert_eq!(fetcher.read_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_builder_custom() {
        let fetcher = KubeFetcher::builder()
            .usage_metrics(false)
            .read_timeout(Duration::from_secs(5))
            .build();
        assert!(!fetcher.usage_metrics);
        assert_eq!(fetcher.read_timeout, Duration::from_secs(5));
    }
}
