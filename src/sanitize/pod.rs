use super::container::ContainerCheck;
use super::listers::PodLister;
use super::refs::{DEFAULT_SERVICE_ACCOUNT, service_account_name};
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::config::PodPolicy;
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Issue, Level, Outcome, ROOT};
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;

const PHASE_RUNNING: &str = "Running";
const PHASE_SUCCEEDED: &str = "Succeeded";

/// Checks pod phase, service account and every container.
pub struct PodSanitizer<L> {
    lister: Arc<L>,
    policy: PodPolicy,
    collector: Collector,
}

impl<L: PodLister> PodSanitizer<L> {
    pub fn new(lister: Arc<L>, policy: PodPolicy) -> Self {
        Self {
            lister,
            policy,
            collector: Collector::new(),
        }
    }

    fn check_pod(&mut self, fqn: &str, pod: &Pod) {
        self.collector.init_outcome(fqn);

        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown");
        if phase != PHASE_RUNNING && phase != PHASE_SUCCEEDED {
            self.collector.add(
                fqn,
                Issue::new(ROOT, Level::Error, "Pod is in an unhappy phase ({})").with_args([phase]),
            );
        }

        let Some(spec) = &pod.spec else {
            return;
        };
        if service_account_name(spec) == DEFAULT_SERVICE_ACCOUNT {
            self.collector
                .add_info(fqn, "Uses \"default\" ServiceAccount");
        }

        let statuses = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();
        let running = phase == PHASE_RUNNING;

        let mut check = ContainerCheck::new(&mut self.collector, fqn, &self.policy);
        for container in spec.init_containers.iter().flatten() {
            check.check_init(container);
        }
        for container in &spec.containers {
            let status = statuses.iter().find(|s| s.name == container.name);
            check.check(container, status, running);
        }
    }
}

impl<L: PodLister + Send + Sync> Sanitizer for PodSanitizer<L> {
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::Pod
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        for (fqn, pod) in lister.list_pods() {
            check_cancelled(cancel, self.kind())?;
            self.check_pod(fqn, pod);
        }
        Ok(())
    }

    fn outcome(&self) -> &Outcome {
        self.collector.outcome()
    }

    fn into_outcome(self: Box<Self>) -> Outcome {
        self.collector.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, Object};
    use serde_json::json;

    fn cache(pods: Vec<serde_json::Value>) -> Arc<Cache> {
        Arc::new(Cache::from_objects(
            pods.into_iter()
                .map(|p| Object::Pod(serde_json::from_value(p).unwrap())),
        ))
    }

    fn healthy_container(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "image": "fred:1.0",
            "livenessProbe": {"tcpSocket": {"port": 80}},
            "readinessProbe": {"tcpSocket": {"port": 80}},
            "resources": {"requests": {"cpu": "100m"}, "limits": {"cpu": "200m"}}
        })
    }

    fn status(name: &str, ready: bool) -> serde_json::Value {
        json!({"name": name, "ready": ready, "restartCount": 0, "image": "fred:1.0", "imageID": ""})
    }

    #[test]
    fn test_healthy_pod() {
        let cache = cache(vec![json!({
            "metadata": {"name": "p1", "namespace": "default"},
            "spec": {"serviceAccountName": "fred", "containers": [healthy_container("c1")]},
            "status": {"phase": "Running", "containerStatuses": [status("c1", true)]}
        })]);
        let mut s = PodSanitizer::new(cache, PodPolicy::default());
        s.sanitize(&CancelToken::new()).unwrap();

        assert!(s.outcome().contains("default/p1"));
        assert_eq!(s.outcome().max_severity("default/p1"), Level::Ok);
    }

    #[test]
    fn test_unhappy_pod() {
        let cache = cache(vec![json!({
            "metadata": {"name": "p1", "namespace": "default"},
            "spec": {
                "initContainers": [{"name": "i1", "image": "init"}],
                "containers": [healthy_container("c1")]
            },
            "status": {"phase": "Pending", "containerStatuses": [status("c1", false)]}
        })]);
        let mut s = PodSanitizer::new(cache, PodPolicy::default());
        s.sanitize(&CancelToken::new()).unwrap();

        let outcome = s.outcome();
        let root: Vec<String> = outcome
            .for_group("default/p1", ROOT)
            .iter()
            .map(|i| i.message())
            .collect();
        assert_eq!(
            root,
            vec![
                "Pod is in an unhappy phase (Pending)",
                "Uses \"default\" ServiceAccount",
            ]
        );
        assert_eq!(outcome.max_group_severity("default/p1", "i1"), Level::Error);
        // Readiness only matters once the pod is running.
        assert_eq!(outcome.max_group_severity("default/p1", "c1"), Level::Ok);
    }

    #[test]
    fn test_restarts_limit() {
        let pod = json!({
            "metadata": {"name": "p1", "namespace": "default"},
            "spec": {"serviceAccountName": "fred", "containers": [healthy_container("c1")]},
            "status": {"phase": "Running", "containerStatuses": [
                {"name": "c1", "ready": true, "restartCount": 3, "image": "fred:1.0", "imageID": ""}
            ]}
        });

        let mut s = PodSanitizer::new(cache(vec![pod.clone()]), PodPolicy { restarts_limit: 2 });
        s.sanitize(&CancelToken::new()).unwrap();
        assert_eq!(s.outcome().max_group_severity("default/p1", "c1"), Level::Warn);

        let mut s = PodSanitizer::new(cache(vec![pod]), PodPolicy::default());
        s.sanitize(&CancelToken::new()).unwrap();
        assert_eq!(s.outcome().max_group_severity("default/p1", "c1"), Level::Ok);
    }
}
