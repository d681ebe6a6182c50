//! CRI runtime driver
//!
//! Talks `runtime.v1` gRPC to containerd, CRI-O or any other CRI runtime
//! over its unix socket. Every call is bounded by the configured timeout.

use super::RuntimeDriver;
use crate::models::{ContainerDescriptor, ContainerUsage, PodDescriptor, StatsFilter};
use crate::proto::{
    ContainerConfig, ContainerMetadata, ContainerStatsFilter, CreateContainerRequest, DnsConfig,
    ImageServiceClient, ImageSpec, ImageStatusRequest, KeyValue, ListContainerStatsRequest,
    ListPodSandboxRequest, PodSandbox, PodSandboxConfig, PodSandboxFilter, PodSandboxMetadata,
    PullImageRequest, RemovePodSandboxRequest, RunPodSandboxRequest, RuntimeServiceClient,
    StartContainerRequest, StopPodSandboxRequest, VersionRequest,
};
use crate::spec::{self, ContainerDefaults, ContainerTemplate, SandboxDefaults};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::{debug, error, info, warn};

const DEFAULT_PAUSE_IMAGE: &str = "registry.k8s.io/pause:3.9";

/// Configuration for the CRI runtime driver
#[derive(Debug, Clone)]
pub struct CriRuntimeConfig {
    /// Runtime socket (e.g., "unix:///run/containerd/containerd.sock")
    pub endpoint: String,
    /// Bound on every runtime call
    pub call_timeout: Duration,
    /// Bound on establishing the connection
    pub connect_timeout: Duration,
    pub pause_image: String,
    pub sandbox_defaults: SandboxDefaults,
    pub container_defaults: ContainerDefaults,
}

impl Default for CriRuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///run/containerd/containerd.sock".to_string(),
            call_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pause_image: DEFAULT_PAUSE_IMAGE.to_string(),
            sandbox_defaults: SandboxDefaults::default(),
            container_defaults: ContainerDefaults::default(),
        }
    }
}

/// Runtime driver backed by a CRI gRPC connection
pub struct CriRuntime {
    config: CriRuntimeConfig,
    runtime_client: RuntimeServiceClient<Channel>,
    image_client: ImageServiceClient<Channel>,
    /// Images already confirmed present on the node
    known_images: Mutex<HashSet<String>>,
}

/// Whether cleanup owns `sandbox`: only sandboxes in the benchmark namespace
pub(crate) fn in_namespace(sandbox: &PodSandbox, namespace: &str) -> bool {
    sandbox
        .metadata
        .as_ref()
        .is_some_and(|m| m.namespace == namespace)
}

/// Socket path for unix endpoints, `None` for network endpoints
pub(crate) fn unix_socket_path(endpoint: &str) -> Option<PathBuf> {
    if let Some(path) = endpoint.strip_prefix("unix://") {
        return Some(PathBuf::from(path));
    }
    if endpoint.starts_with('/') {
        return Some(PathBuf::from(endpoint));
    }
    None
}

async fn connect_channel(endpoint: &str, connect_timeout: Duration) -> Result<Channel> {
    if endpoint.is_empty() {
        anyhow::bail!("Runtime endpoint unspecified");
    }

    match unix_socket_path(endpoint) {
        Some(path) => {
            // The URI is required by tonic but ignored by the connector
            Endpoint::try_from("http://[::]:50051")?
                .connect_timeout(connect_timeout)
                .connect_with_connector(service_fn(move |_: Uri| {
                    let path = path.clone();
                    async move { UnixStream::connect(path).await }
                }))
                .await
                .with_context(|| format!("Failed to connect to {}", endpoint))
        }
        None => Channel::from_shared(endpoint.to_string())
            .with_context(|| format!("Invalid runtime endpoint: {}", endpoint))?
            .connect_timeout(connect_timeout)
            .connect()
            .await
            .with_context(|| format!("Failed to connect to {}", endpoint)),
    }
}

impl CriRuntime {
    /// Connect to the runtime socket
    pub async fn connect(config: CriRuntimeConfig) -> Result<Self> {
        let channel = connect_channel(&config.endpoint, config.connect_timeout).await?;

        info!(endpoint = %config.endpoint, "Connected to container runtime");

        Ok(Self {
            runtime_client: RuntimeServiceClient::new(channel.clone()),
            image_client: ImageServiceClient::new(channel),
            config,
            known_images: Mutex::new(HashSet::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Await a gRPC call under the per-call timeout
    async fn call<T, F>(&self, method: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<tonic::Response<T>, tonic::Status>>,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            Ok(Err(status)) => Err(anyhow::anyhow!(
                "{} failed: {} ({:?})",
                method,
                status.message(),
                status.code()
            )),
            Err(_) => Err(anyhow::anyhow!(
                "{} timed out after {:?}",
                method,
                self.config.call_timeout
            )),
        }
    }

    fn sandbox_config(&self, pod_name: &str, unique_id: &str) -> PodSandboxConfig {
        let defaults = &self.config.sandbox_defaults;
        PodSandboxConfig {
            metadata: Some(PodSandboxMetadata {
                name: pod_name.to_string(),
                uid: format!("{}-{}", defaults.uid, unique_id),
                namespace: defaults.namespace.clone(),
                attempt: 1,
            }),
            hostname: defaults.hostname.clone(),
            log_directory: defaults.log_directory.clone(),
            dns_config: Some(DnsConfig {
                servers: Vec::new(),
                searches: defaults.dns_searches.clone(),
                options: Vec::new(),
            }),
            labels: defaults.labels.clone(),
            annotations: defaults.annotations.clone(),
        }
    }

    fn container_config(&self, template: &ContainerTemplate) -> ContainerConfig {
        let defaults = &self.config.container_defaults;
        ContainerConfig {
            metadata: Some(ContainerMetadata {
                name: template.name.clone(),
                attempt: 1,
            }),
            image: Some(ImageSpec {
                image: template.image.clone(),
                annotations: Default::default(),
            }),
            command: template.command.clone(),
            args: template.args.clone(),
            working_dir: defaults.working_dir.clone(),
            envs: defaults
                .envs
                .iter()
                .map(|e| KeyValue {
                    key: e.key.clone(),
                    value: e.value.clone(),
                })
                .collect(),
            labels: defaults.labels.clone(),
            annotations: Default::default(),
            log_path: defaults.log_path.clone(),
        }
    }

    /// Pull `image` unless the runtime already has it
    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.known_images.lock().await.contains(image) {
            return Ok(());
        }

        let spec = ImageSpec {
            image: image.to_string(),
            annotations: Default::default(),
        };

        let mut client = self.image_client.clone();
        let status = self
            .call(
                "ImageStatus",
                client.image_status(ImageStatusRequest {
                    image: Some(spec.clone()),
                    verbose: false,
                }),
            )
            .await;

        let present = matches!(status, Ok(ref s) if s.image.is_some());
        if !present {
            info!(image, "Pulling image");
            self.call(
                "PullImage",
                client.pull_image(PullImageRequest {
                    image: Some(spec),
                    sandbox_config: None,
                }),
            )
            .await?;
        }

        self.known_images.lock().await.insert(image.to_string());
        Ok(())
    }

    async fn stop_sandbox(&self, sandbox_id: &str) -> Result<()> {
        let mut client = self.runtime_client.clone();
        self.call(
            "StopPodSandbox",
            client.stop_pod_sandbox(StopPodSandboxRequest {
                pod_sandbox_id: sandbox_id.to_string(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn remove_sandbox(&self, sandbox_id: &str) -> Result<()> {
        let mut client = self.runtime_client.clone();
        self.call(
            "RemovePodSandbox",
            client.remove_pod_sandbox(RemovePodSandboxRequest {
                pod_sandbox_id: sandbox_id.to_string(),
            }),
        )
        .await?;
        Ok(())
    }

    /// Best-effort removal of a sandbox whose containers could not be created
    async fn discard_sandbox(&self, sandbox_id: &str) {
        if let Err(e) = self.stop_sandbox(sandbox_id).await {
            warn!(sandbox_id, error = %e, "Failed to stop partially created pod");
        }
        if let Err(e) = self.remove_sandbox(sandbox_id).await {
            warn!(sandbox_id, error = %e, "Failed to remove partially created pod");
        }
    }
}

#[async_trait]
impl RuntimeDriver for CriRuntime {
    async fn clean(&self) -> Result<()> {
        let namespace = &self.config.sandbox_defaults.namespace;
        let mut client = self.runtime_client.clone();
        let response = self
            .call(
                "ListPodSandbox",
                client.list_pod_sandbox(ListPodSandboxRequest {
                    filter: Some(PodSandboxFilter::default()),
                }),
            )
            .await?;

        let mut removed = 0usize;
        for sandbox in response.items {
            if !in_namespace(&sandbox, namespace) {
                continue;
            }

            if let Err(e) = self.stop_sandbox(&sandbox.id).await {
                error!(sandbox_id = %sandbox.id, error = %e, "Error stopping pod during cleanup");
            }
            match self.remove_sandbox(&sandbox.id).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    error!(sandbox_id = %sandbox.id, error = %e, "Error removing pod during cleanup")
                }
            }
        }

        info!(namespace = %namespace, removed, "CRI cleanup complete");
        Ok(())
    }

    async fn create_pod_from_spec(
        &self,
        spec_file: &Path,
        unique_id: &str,
    ) -> Result<PodDescriptor> {
        let manifest = tokio::fs::read_to_string(spec_file)
            .await
            .with_context(|| format!("Failed to read pod manifest {}", spec_file.display()))?;
        let pod_template = spec::parse_pod_manifest(&manifest)?;

        self.ensure_image(&self.config.pause_image).await?;
        for container in &pod_template.containers {
            self.ensure_image(&container.image).await?;
        }

        let mut descriptor = pod_template.descriptor(unique_id);
        let sandbox_config = self.sandbox_config(&descriptor.name, unique_id);

        let mut client = self.runtime_client.clone();
        let sandbox = self
            .call(
                "RunPodSandbox",
                client.run_pod_sandbox(RunPodSandboxRequest {
                    config: Some(sandbox_config.clone()),
                    runtime_handler: self.config.sandbox_defaults.runtime_handler.clone(),
                }),
            )
            .await?;

        if sandbox.pod_sandbox_id.is_empty() {
            anyhow::bail!("PodSandboxId is not set for pod {}", descriptor.name);
        }
        descriptor.sandbox_id = sandbox.pod_sandbox_id;

        for (template, container) in pod_template
            .containers
            .iter()
            .zip(descriptor.containers.iter_mut())
        {
            let created = self
                .call(
                    "CreateContainer",
                    client.create_container(CreateContainerRequest {
                        pod_sandbox_id: descriptor.sandbox_id.clone(),
                        config: Some(self.container_config(template)),
                        sandbox_config: Some(sandbox_config.clone()),
                    }),
                )
                .await
                .and_then(|r| {
                    if r.container_id.is_empty() {
                        anyhow::bail!("ContainerId is not set for container {}", template.name);
                    }
                    Ok(r.container_id)
                });

            match created {
                Ok(id) => container.container_id = id,
                Err(e) => {
                    self.discard_sandbox(&descriptor.sandbox_id).await;
                    return Err(e.context(format!(
                        "Failed to create container {} in pod {}",
                        template.name, descriptor.name
                    )));
                }
            }
        }

        debug!(pod = %descriptor.name, sandbox_id = %descriptor.sandbox_id, "Pod created");
        Ok(descriptor)
    }

    async fn run(&self, container: &ContainerDescriptor) -> Result<Duration> {
        let start = Instant::now();
        let mut client = self.runtime_client.clone();
        self.call(
            "StartContainer",
            client.start_container(StartContainerRequest {
                container_id: container.container_id.clone(),
            }),
        )
        .await?;
        Ok(start.elapsed())
    }

    async fn stop_pod(&self, pod: &PodDescriptor) -> Result<Duration> {
        let start = Instant::now();
        self.stop_sandbox(&pod.sandbox_id).await?;
        Ok(start.elapsed())
    }

    async fn remove_pod(&self, pod: &PodDescriptor) -> Result<Duration> {
        let start = Instant::now();
        self.remove_sandbox(&pod.sandbox_id).await?;
        Ok(start.elapsed())
    }

    async fn stats(&self, filter: &StatsFilter) -> Result<Vec<ContainerUsage>> {
        let mut request_filter = ContainerStatsFilter::default();
        match filter {
            StatsFilter::All => {}
            StatsFilter::Container(id) => request_filter.id = id.clone(),
            StatsFilter::Pod(id) => request_filter.pod_sandbox_id = id.clone(),
        }

        let mut client = self.runtime_client.clone();
        let response = self
            .call(
                "ListContainerStats",
                client.list_container_stats(ListContainerStatsRequest {
                    filter: Some(request_filter),
                }),
            )
            .await?;

        Ok(response
            .stats
            .into_iter()
            .map(|s| {
                let attributes = s.attributes.unwrap_or_default();
                ContainerUsage {
                    name: attributes.metadata.map(|m| m.name).unwrap_or_default(),
                    container_id: attributes.id,
                    cpu_core_ns: s
                        .cpu
                        .and_then(|c| c.usage_core_nano_seconds)
                        .map(|v| v.value)
                        .unwrap_or(0),
                    working_set_bytes: s
                        .memory
                        .and_then(|m| m.working_set_bytes)
                        .map(|v| v.value)
                        .unwrap_or(0),
                    writable_layer_bytes: s
                        .writable_layer
                        .and_then(|w| w.used_bytes)
                        .map(|v| v.value)
                        .unwrap_or(0),
                }
            })
            .collect())
    }

    async fn info(&self) -> Result<String> {
        let mut client = self.runtime_client.clone();
        let version = self
            .call(
                "Version",
                client.version(VersionRequest {
                    version: "v1".to_string(),
                }),
            )
            .await?;

        Ok(format!(
            "{} {} (CRI API {})",
            version.runtime_name, version.runtime_version, version.runtime_api_version
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_socket_path() {
        assert_eq!(
            unix_socket_path("unix:///run/containerd/containerd.sock"),
            Some(PathBuf::from("/run/containerd/containerd.sock"))
        );
        assert_eq!(
            unix_socket_path("/var/run/crio/crio.sock"),
            Some(PathBuf::from("/var/run/crio/crio.sock"))
        );
        assert_eq!(unix_socket_path("http://127.0.0.1:10010"), None);
    }

    #[test]
    fn test_clean_only_owns_benchmark_namespace() {
        let sandbox = |namespace: Option<&str>| PodSandbox {
            id: "sb".to_string(),
            metadata: namespace.map(|ns| PodSandboxMetadata {
                name: "pod-basic-pod-0".to_string(),
                uid: "cospeck-0".to_string(),
                namespace: ns.to_string(),
                attempt: 0,
            }),
            ..Default::default()
        };

        assert!(in_namespace(&sandbox(Some("cospeck")), "cospeck"));
        assert!(!in_namespace(&sandbox(Some("kube-system")), "cospeck"));
        assert!(!in_namespace(&sandbox(None), "cospeck"));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_endpoint() {
        let config = CriRuntimeConfig {
            endpoint: String::new(),
            ..Default::default()
        };
        assert!(CriRuntime::connect(config).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_fails_for_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let config = CriRuntimeConfig {
            endpoint: format!("unix://{}", dir.path().join("missing.sock").display()),
            connect_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        assert!(CriRuntime::connect(config).await.is_err());
    }
}
