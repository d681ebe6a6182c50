//! Pods registered during a benchmark run

use crate::error::BenchError;
use crate::models::{PodDescriptor, TrackedPod};
use std::time::Duration;
use tokio::sync::Mutex;

/// Thread-safe list of tracked pods in completion order.
///
/// The lock is only held for the duration of a single read or update,
/// never across a runtime call.
#[derive(Debug, Default)]
pub struct PodRegistry {
    pods: Mutex<Vec<TrackedPod>>,
}

impl PodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pod and return its position
    pub async fn append(&self, tracked: TrackedPod) -> Result<usize, BenchError> {
        if tracked.pod.sandbox_id.is_empty() {
            return Err(BenchError::MissingSandboxId(tracked.pod.name));
        }
        let mut pods = self.pods.lock().await;
        pods.push(tracked);
        Ok(pods.len() - 1)
    }

    /// Position of `pod`, matched by sandbox ID.
    ///
    /// Returns `len()` when the pod is not registered; callers must compare
    /// against the length.
    pub async fn find(&self, pod: &PodDescriptor) -> usize {
        let pods = self.pods.lock().await;
        pods.iter()
            .position(|p| p.pod.sandbox_id == pod.sandbox_id)
            .unwrap_or(pods.len())
    }

    pub async fn len(&self) -> usize {
        self.pods.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pods.lock().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<TrackedPod> {
        self.pods.lock().await.clone()
    }

    /// Descriptors of pods registered at or after `cursor`
    pub async fn pods_from(&self, cursor: usize) -> Vec<PodDescriptor> {
        let pods = self.pods.lock().await;
        pods.iter().skip(cursor).map(|p| p.pod.clone()).collect()
    }

    pub async fn set_destruction_time(&self, sandbox_id: &str, elapsed: Duration) -> bool {
        self.update(sandbox_id, |p| p.destruction_time = Some(elapsed))
            .await
    }

    pub async fn set_average_memory(&self, sandbox_id: &str, mem_mib: f64) -> bool {
        self.update(sandbox_id, |p| p.average_memory_mib = Some(mem_mib))
            .await
    }

    async fn update(&self, sandbox_id: &str, apply: impl FnOnce(&mut TrackedPod)) -> bool {
        let mut pods = self.pods.lock().await;
        match pods.iter_mut().find(|p| p.pod.sandbox_id == sandbox_id) {
            Some(pod) => {
                apply(pod);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tracked(name: &str, sandbox_id: &str) -> TrackedPod {
        TrackedPod::new(
            PodDescriptor {
                name: name.to_string(),
                sandbox_id: sandbox_id.to_string(),
                containers: Vec::new(),
            },
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_append_and_find() {
        let registry = PodRegistry::new();
        registry.append(tracked("a", "s1")).await.unwrap();
        registry.append(tracked("b", "s2")).await.unwrap();

        assert_eq!(registry.find(&tracked("b", "s2").pod).await, 1);
        // Not found is one past the end
        assert_eq!(registry.find(&tracked("c", "s3").pod).await, 2);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_rejects_empty_sandbox_id() {
        let registry = PodRegistry::new();
        let result = registry.append(tracked("a", "")).await;

        assert!(matches!(result, Err(BenchError::MissingSandboxId(_))));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_updates_by_sandbox_id() {
        let registry = PodRegistry::new();
        registry.append(tracked("a", "s1")).await.unwrap();

        assert!(
            registry
                .set_destruction_time("s1", Duration::from_millis(30))
                .await
        );
        assert!(registry.set_average_memory("s1", 8.0).await);
        assert!(!registry.set_average_memory("missing", 1.0).await);

        let pods = registry.snapshot().await;
        assert_eq!(pods[0].destruction_time, Some(Duration::from_millis(30)));
        assert_eq!(pods[0].average_memory_mib, Some(8.0));
    }

    #[tokio::test]
    async fn test_pods_from_cursor() {
        let registry = PodRegistry::new();
        for i in 0..4 {
            registry
                .append(tracked(&format!("p{}", i), &format!("s{}", i)))
                .await
                .unwrap();
        }

        let late = registry.pods_from(3).await;
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].sandbox_id, "s3");
        assert!(registry.pods_from(10).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends() {
        let registry = Arc::new(PodRegistry::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .append(tracked(&format!("p{}", i), &format!("s{}", i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len().await, 50);
    }
}
