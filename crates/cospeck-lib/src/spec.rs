//! Pod manifest parsing
//!
//! Turns a Kubernetes Pod manifest into the pod and container templates the
//! runtime driver instantiates, plus the JSON base configs applied to every
//! sandbox and container.

use crate::models::{ContainerDescriptor, PodDescriptor};
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Prefix of every benchmark pod name
pub const POD_NAME_PREFIX: &str = "pod-";

/// Container shape taken from the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTemplate {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
}

/// Pod shape taken from the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTemplate {
    pub name: String,
    pub containers: Vec<ContainerTemplate>,
}

impl PodTemplate {
    /// Name of the pod created for iteration `unique_id`
    pub fn pod_name(&self, unique_id: &str) -> String {
        format!("{}{}-{}", POD_NAME_PREFIX, self.name, unique_id)
    }

    /// Descriptor for iteration `unique_id`, before the runtime assigns IDs
    pub fn descriptor(&self, unique_id: &str) -> PodDescriptor {
        PodDescriptor {
            name: self.pod_name(unique_id),
            sandbox_id: String::new(),
            containers: self
                .containers
                .iter()
                .map(|c| ContainerDescriptor {
                    name: c.name.clone(),
                    image: c.image.clone(),
                    command: c.command.clone(),
                    trace: false,
                    container_id: String::new(),
                })
                .collect(),
        }
    }
}

/// Parse a Pod manifest from YAML
pub fn parse_pod_manifest(yaml: &str) -> Result<PodTemplate> {
    let pod: Pod = serde_yaml::from_str(yaml).context("Failed to parse pod manifest")?;

    let name = pod
        .metadata
        .name
        .filter(|n| !n.is_empty())
        .context("Pod manifest has no metadata.name")?;

    let spec = pod.spec.context("Pod manifest has no spec")?;
    if spec.containers.is_empty() {
        anyhow::bail!("Pod manifest {} declares no containers", name);
    }

    let containers = spec
        .containers
        .into_iter()
        .map(|c| {
            let image = c
                .image
                .filter(|i| !i.is_empty())
                .with_context(|| format!("Container {} has no image", c.name))?;
            Ok(ContainerTemplate {
                name: c.name,
                image,
                command: c.command.unwrap_or_default(),
                args: c.args.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PodTemplate { name, containers })
}

/// Read and parse a Pod manifest file
pub fn load_pod_manifest(path: &Path) -> Result<PodTemplate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pod manifest {}", path.display()))?;
    parse_pod_manifest(&content)
}

/// Base settings applied to every pod sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxDefaults {
    pub namespace: String,
    pub uid: String,
    pub hostname: String,
    pub log_directory: String,
    pub dns_searches: Vec<String>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    /// Runtime handler (RuntimeClass) to request, empty for the default
    pub runtime_handler: String,
}

impl Default for SandboxDefaults {
    fn default() -> Self {
        Self {
            namespace: "cospeck.test.cri".to_string(),
            uid: "cospeck-test-cri".to_string(),
            hostname: "cospeck_host".to_string(),
            log_directory: String::new(),
            dns_searches: Vec::new(),
            labels: HashMap::from([("group".to_string(), "test".to_string())]),
            annotations: HashMap::new(),
            runtime_handler: String::new(),
        }
    }
}

/// Environment variable for containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Base settings applied to every container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerDefaults {
    pub working_dir: String,
    pub envs: Vec<EnvVar>,
    pub labels: HashMap<String, String>,
    pub log_path: String,
}

impl Default for ContainerDefaults {
    fn default() -> Self {
        Self {
            working_dir: "/".to_string(),
            envs: vec![
                EnvVar {
                    key: "PATH".to_string(),
                    value: "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"
                        .to_string(),
                },
                EnvVar {
                    key: "TERM".to_string(),
                    value: "xterm".to_string(),
                },
            ],
            labels: HashMap::new(),
            log_path: String::new(),
        }
    }
}

/// Load a JSON base config, or the defaults when no file is given
pub fn load_defaults<T>(path: Option<&Path>) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read base config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse base config {}", path.display()))
        }
        None => Ok(T::default()),
    }
}
