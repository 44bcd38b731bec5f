use super::listers::NodeLister;
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Issue, Level, Outcome, ROOT};
use k8s_openapi::api::core::v1::Node;
use std::sync::Arc;

const PRESSURE_CONDITIONS: [&str; 3] = ["MemoryPressure", "DiskPressure", "PIDPressure"];

/// Checks node readiness, pressure conditions and schedulability.
pub struct NodeSanitizer<L> {
    lister: Arc<L>,
    collector: Collector,
}

impl<L: NodeLister> NodeSanitizer<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self {
            lister,
            collector: Collector::new(),
        }
    }

    fn check_node(&mut self, fqn: &str, node: &Node) {
        self.collector.init_outcome(fqn);

        let conditions = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_deref())
            .unwrap_or_default();

        let ready = conditions
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True");
        if !ready {
            self.collector.add_error(fqn, "Node is not ready");
        }

        for condition in conditions {
            if PRESSURE_CONDITIONS.contains(&condition.type_.as_str()) && condition.status == "True" {
                self.collector.add(
                    fqn,
                    Issue::new(ROOT, Level::Warn, "Node is under {}").with_args([&condition.type_]),
                );
            }
        }

        let unschedulable = node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);
        if unschedulable {
            self.collector.add_info(fqn, "Node is cordoned");
        }
    }
}

impl<L: NodeLister + Send + Sync> Sanitizer for NodeSanitizer<L> {
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::Node
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        for (fqn, node) in lister.list_nodes() {
            check_cancelled(cancel, self.kind())?;
            self.check_node(fqn, node);
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

    fn sanitize(node: serde_json::Value) -> Outcome {
        let cache = Cache::from_objects([Object::Node(serde_json::from_value(node).unwrap())]);
        let mut s = NodeSanitizer::new(Arc::new(cache));
        s.sanitize(&CancelToken::new()).unwrap();
        s.collector.into_outcome()
    }

    #[test]
    fn test_ready_node() {
        let outcome = sanitize(json!({
            "metadata": {"name": "n1"},
            "status": {"conditions": [
                {"type": "Ready", "status": "True"},
                {"type": "MemoryPressure", "status": "False"}
            ]}
        }));
        assert_eq!(outcome.get("n1").unwrap().len(), 0);
    }

    #[test]
    fn test_troubled_node() {
        let outcome = sanitize(json!({
            "metadata": {"name": "n1"},
            "spec": {"unschedulable": true},
            "status": {"conditions": [
                {"type": "Ready", "status": "False"},
                {"type": "DiskPressure", "status": "True"},
                {"type": "PIDPressure", "status": "True"}
            ]}
        }));
        let messages: Vec<String> = outcome.get("n1").unwrap().iter().map(|i| i.message()).collect();
        assert_eq!(
            messages,
            vec![
                "Node is not ready",
                "Node is under DiskPressure",
                "Node is under PIDPressure",
                "Node is cordoned",
            ]
        );
        assert_eq!(outcome.max_severity("n1"), Level::Error);
    }
}
