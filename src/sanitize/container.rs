//! Container-level checks, recorded under one group per container.

use crate::config::PodPolicy;
use crate::issues::{Collector, Issue, Level};
use k8s_openapi::api::core::v1::{Container, ContainerStatus};

const LATEST_TAG: &str = "latest";

/// Tag of an image reference, ignoring any registry port. Digests count as
/// a tag.
pub fn image_tag(image: &str) -> Option<&str> {
    if let Some((_, digest)) = image.split_once('@') {
        return Some(digest);
    }
    let name = image.rsplit('/').next().unwrap_or(image);
    name.split_once(':').map(|(_, tag)| tag).filter(|t| !t.is_empty())
}

pub struct ContainerCheck<'a> {
    collector: &'a mut Collector,
    fqn: &'a str,
    policy: &'a PodPolicy,
}

impl<'a> ContainerCheck<'a> {
    pub fn new(collector: &'a mut Collector, fqn: &'a str, policy: &'a PodPolicy) -> Self {
        Self {
            collector,
            fqn,
            policy,
        }
    }

    fn add(&mut self, group: &str, level: Level, template: &'static str, args: &[String]) {
        self.collector.add(
            self.fqn,
            Issue::new(group, level, template).with_args(args.iter()),
        );
    }

    /// Init containers run to completion, so only their image is checked.
    pub fn check_init(&mut self, container: &Container) {
        self.check_image(container);
    }

    pub fn check(&mut self, container: &Container, status: Option<&ContainerStatus>, running: bool) {
        self.check_image(container);
        self.check_probes(container);
        self.check_resources(container);
        self.check_ports(container);
        if let Some(status) = status {
            self.check_status(&container.name, status, running);
        }
    }

    fn check_image(&mut self, container: &Container) {
        let group = container.name.as_str();
        let Some(image) = container.image.as_deref() else {
            return;
        };
        match image_tag(image) {
            None => self.add(group, Level::Error, "Untagged docker image in use", &[]),
            Some(LATEST_TAG) => {
                self.add(group, Level::Warn, "Image tagged \"latest\" in use", &[])
            }
            Some(_) => {}
        }
    }

    fn check_probes(&mut self, container: &Container) {
        let group = container.name.as_str();
        match (&container.liveness_probe, &container.readiness_probe) {
            (None, None) => self.add(group, Level::Warn, "No probes defined", &[]),
            (None, Some(_)) => self.add(group, Level::Warn, "No liveness probe", &[]),
            (Some(_), None) => self.add(group, Level::Warn, "No readiness probe", &[]),
            (Some(_), Some(_)) => {}
        }
    }

    fn check_resources(&mut self, container: &Container) {
        let group = container.name.as_str();
        let resources = container.resources.as_ref();
        let has_requests = resources
            .and_then(|r| r.requests.as_ref())
            .is_some_and(|r| !r.is_empty());
        let has_limits = resources
            .and_then(|r| r.limits.as_ref())
            .is_some_and(|l| !l.is_empty());
        match (has_requests, has_limits) {
            (false, false) => self.add(group, Level::Warn, "No resources defined", &[]),
            (true, false) => self.add(group, Level::Warn, "No resource limits defined", &[]),
            (false, true) => self.add(group, Level::Warn, "No resource requests defined", &[]),
            (true, true) => {}
        }
    }

    fn check_ports(&mut self, container: &Container) {
        let group = container.name.as_str();
        for port in container.ports.iter().flatten() {
            if port.name.as_deref().is_none_or(str::is_empty) {
                self.add(
                    group,
                    Level::Info,
                    "Unnamed port {}",
                    &[port.container_port.to_string()],
                );
            }
        }
    }

    fn check_status(&mut self, group: &str, status: &ContainerStatus, running: bool) {
        if running && !status.ready {
            self.add(group, Level::Error, "Container is not ready", &[]);
        }
        if status.restart_count > self.policy.restarts_limit {
            self.add(
                group,
                Level::Warn,
                "Restarted {} times",
                &[status.restart_count.to_string()],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn container(value: serde_json::Value) -> Container {
        serde_json::from_value(value).unwrap()
    }

    fn messages(collector: &Collector) -> Vec<String> {
        collector
            .outcome()
            .get("default/p1")
            .map(|issues| issues.iter().map(|i| i.message()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_image_tag() {
        assert_eq!(image_tag("fred"), None);
        assert_eq!(image_tag("fred:1.0"), Some("1.0"));
        assert_eq!(image_tag("fred:"), None);
        assert_eq!(image_tag("registry:5000/fred"), None);
        assert_eq!(image_tag("registry:5000/fred:latest"), Some("latest"));
        assert_eq!(image_tag("fred@sha256:abc"), Some("sha256:abc"));
    }

    #[test]
    fn test_healthy_container() {
        let c = container(json!({
            "name": "c1",
            "image": "fred:1.0",
            "livenessProbe": {"tcpSocket": {"port": 80}},
            "readinessProbe": {"tcpSocket": {"port": 80}},
            "resources": {"requests": {"cpu": "100m"}, "limits": {"cpu": "200m"}},
            "ports": [{"name": "http", "containerPort": 80}]
        }));
        let status: ContainerStatus = serde_json::from_value(json!({
            "name": "c1", "ready": true, "restartCount": 0, "image": "fred:1.0", "imageID": ""
        }))
        .unwrap();

        let mut collector = Collector::new();
        let policy = PodPolicy::default();
        ContainerCheck::new(&mut collector, "default/p1", &policy).check(&c, Some(&status), true);
        assert!(messages(&collector).is_empty());
    }

    #[test]
    fn test_bare_container() {
        let c = container(json!({
            "name": "c1",
            "image": "fred",
            "ports": [{"containerPort": 80}]
        }));
        let status: ContainerStatus = serde_json::from_value(json!({
            "name": "c1", "ready": false, "restartCount": 7, "image": "fred", "imageID": ""
        }))
        .unwrap();

        let mut collector = Collector::new();
        let policy = PodPolicy::default();
        ContainerCheck::new(&mut collector, "default/p1", &policy).check(&c, Some(&status), true);

        assert_eq!(
            messages(&collector),
            vec![
                "Untagged docker image in use",
                "No probes defined",
                "No resources defined",
                "Unnamed port 80",
                "Container is not ready",
                "Restarted 7 times",
            ]
        );
        let outcome = collector.outcome();
        assert_eq!(outcome.max_group_severity("default/p1", "c1"), Level::Error);
        assert_eq!(outcome.for_group("default/p1", "c1").len(), 6);
    }

    #[test]
    fn test_latest_and_partial_probes() {
        let c = container(json!({
            "name": "c1",
            "image": "fred:latest",
            "livenessProbe": {"tcpSocket": {"port": 80}},
            "resources": {"requests": {"cpu": "100m"}}
        }));
        let mut collector = Collector::new();
        let policy = PodPolicy::default();
        ContainerCheck::new(&mut collector, "default/p1", &policy).check(&c, None, false);

        assert_eq!(
            messages(&collector),
            vec![
                "Image tagged \"latest\" in use",
                "No readiness probe",
                "No resource limits defined",
            ]
        );
    }
}
