use super::listers::ServiceLister;
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::config::ServicePolicy;
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Issue, Level, Outcome, ROOT};
use k8s_openapi::api::core::v1::{Pod, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::sync::Arc;

const TYPE_EXTERNAL_NAME: &str = "ExternalName";
const TYPE_LOAD_BALANCER: &str = "LoadBalancer";
const TYPE_NODE_PORT: &str = "NodePort";
const CLUSTER_IP_NONE: &str = "None";
const PROTOCOL_TCP: &str = "TCP";
const PROTOCOL_UDP: &str = "UDP";

/// Checks services against their pods and endpoints.
pub struct ServiceSanitizer<L> {
    lister: Arc<L>,
    policy: ServicePolicy,
    collector: Collector,
}

impl<L: ServiceLister> ServiceSanitizer<L> {
    pub fn new(lister: Arc<L>, policy: ServicePolicy) -> Self {
        Self {
            lister,
            policy,
            collector: Collector::new(),
        }
    }

    fn check_service(&mut self, fqn: &str, svc: &Service) {
        self.collector.init_outcome(fqn);
        let Some(spec) = &svc.spec else {
            return;
        };
        let ns = svc.metadata.namespace.as_deref().unwrap_or_default();
        let kind = spec.type_.as_deref().unwrap_or("ClusterIP");

        let lister = Arc::clone(&self.lister);
        let pod = spec
            .selector
            .as_ref()
            .filter(|s| !s.is_empty())
            .and_then(|selector| lister.get_pod(ns, selector));

        // ExternalName services front something outside the cluster, so
        // only their port declarations are meaningful.
        if kind != TYPE_EXTERNAL_NAME {
            self.check_pods(fqn, spec, pod.is_some());
            self.check_endpoints(fqn, spec);
            self.check_type(fqn, kind);
        }

        for port in spec.ports.iter().flatten() {
            self.check_port(fqn, port, pod);
        }
    }

    fn check_pods(&mut self, fqn: &str, spec: &ServiceSpec, has_pod: bool) {
        let has_selector = spec.selector.as_ref().is_some_and(|s| !s.is_empty());
        if has_selector && !has_pod {
            self.collector
                .add_warn(fqn, "No pods match service selector");
        }
    }

    fn check_endpoints(&mut self, fqn: &str, spec: &ServiceSpec) {
        if spec.cluster_ip.as_deref() == Some(CLUSTER_IP_NONE) {
            return;
        }
        let has_addresses = self.lister.get_endpoints(fqn).is_some_and(|ep| {
            let subsets = ep.subsets.as_deref().unwrap_or_default();
            !subsets.is_empty()
                && subsets
                    .iter()
                    .all(|s| s.addresses.as_ref().is_some_and(|a| !a.is_empty()))
        });
        if !has_addresses {
            self.collector.add_warn(fqn, "No associated endpoints");
        }
    }

    fn check_type(&mut self, fqn: &str, kind: &str) {
        match kind {
            TYPE_LOAD_BALANCER => self
                .collector
                .add_info(fqn, "Type LoadBalancer detected. Could be expensive"),
            TYPE_NODE_PORT => self
                .collector
                .add_info(fqn, "Do you mean it? Type NodePort detected"),
            _ => {}
        }
    }

    fn check_port(&mut self, fqn: &str, port: &ServicePort, pod: Option<&Pod>) {
        let protocol = port.protocol.as_deref().unwrap_or(PROTOCOL_TCP);
        if protocol != PROTOCOL_TCP && !(protocol == PROTOCOL_UDP && self.policy.allow_udp) {
            self.collector.add(
                fqn,
                Issue::new(ROOT, Level::Warn, "Use of {} protocol on port {}")
                    .with_args([protocol.to_string(), port.port.to_string()]),
            );
        }

        // Unnamed ports carry no contract with the backing containers.
        let Some(name) = port.name.as_deref().filter(|n| !n.is_empty()) else {
            return;
        };
        let (Some(target), Some(pod)) = (&port.target_port, pod) else {
            return;
        };
        if !exposes_port(pod, target) {
            self.collector.add(
                fqn,
                Issue::new(ROOT, Level::Error, "No target ports match service port {}")
                    .with_args([format!("{}:{}", name, target_label(target))]),
            );
        }
    }
}

fn target_label(target: &IntOrString) -> String {
    match target {
        IntOrString::Int(n) => n.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

/// True when a container of `pod` declares the target port.
fn exposes_port(pod: &Pod, target: &IntOrString) -> bool {
    let Some(spec) = &pod.spec else {
        return false;
    };
    spec.containers
        .iter()
        .flat_map(|c| c.ports.iter().flatten())
        .any(|p| match target {
            IntOrString::Int(n) => p.container_port == *n,
            IntOrString::String(name) => p.name.as_deref() == Some(name.as_str()),
        })
}

impl<L: ServiceLister + Send + Sync> Sanitizer for ServiceSanitizer<L> {
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::Service
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        for (fqn, svc) in lister.list_services() {
            check_cancelled(cancel, self.kind())?;
            self.check_service(fqn, svc);
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
