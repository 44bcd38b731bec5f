use super::listers::{NamespaceLister, PodLister};
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Issue, Level, Outcome, ROOT};
use k8s_openapi::api::core::v1::Namespace;
use std::collections::HashSet;
use std::sync::Arc;

/// Namespaces that may legitimately run no pods.
pub const SYSTEM_NAMESPACES: [&str; 4] = ["kube-system", "kube-public", "kube-node-lease", "default"];

/// Checks namespace phase and usage.
pub struct NamespaceSanitizer<L> {
    lister: Arc<L>,
    collector: Collector,
}

impl<L: NamespaceLister + PodLister> NamespaceSanitizer<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self {
            lister,
            collector: Collector::new(),
        }
    }

    fn check_namespace(&mut self, fqn: &str, ns: &Namespace, used: &HashSet<&str>) {
        self.collector.init_outcome(fqn);

        let phase = ns
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Active");
        if phase != "Active" {
            self.collector.add(
                fqn,
                Issue::new(ROOT, Level::Error, "Namespace is {}").with_args([phase]),
            );
        }

        if !SYSTEM_NAMESPACES.contains(&fqn) && !used.contains(fqn) {
            self.collector.add_info(fqn, "Namespace has no pods. Is it still used?");
        }
    }
}

impl<L: NamespaceLister + PodLister + Send + Sync> Sanitizer for NamespaceSanitizer<L> {
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::Namespace
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        let used: HashSet<&str> = lister
            .list_pods()
            .filter_map(|(_, pod)| pod.metadata.namespace.as_deref())
            .collect();
        for (fqn, ns) in lister.list_namespaces() {
            check_cancelled(cancel, self.kind())?;
            self.check_namespace(fqn, ns, &used);
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

    #[test]
    fn test_namespaces() {
        let objects = vec![
            Object::Namespace(
                serde_json::from_value(json!({"metadata": {"name": "fred"}, "status": {"phase": "Active"}}))
                    .unwrap(),
            ),
            Object::Namespace(
                serde_json::from_value(json!({"metadata": {"name": "blee"}, "status": {"phase": "Terminating"}}))
                    .unwrap(),
            ),
            Object::Namespace(serde_json::from_value(json!({"metadata": {"name": "kube-public"}})).unwrap()),
            Object::Pod(
                serde_json::from_value(json!({"metadata": {"name": "p1", "namespace": "fred"}})).unwrap(),
            ),
        ];
        let mut s = NamespaceSanitizer::new(Arc::new(Cache::from_objects(objects)));
        s.sanitize(&CancelToken::new()).unwrap();

        let outcome = s.outcome();
        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.max_severity("fred"), Level::Ok);
        assert_eq!(outcome.max_severity("kube-public"), Level::Ok);

        let blee: Vec<String> = outcome.get("blee").unwrap().iter().map(|i| i.message()).collect();
        assert_eq!(
            blee,
            vec!["Namespace is Terminating", "Namespace has no pods. Is it still used?"]
        );
    }
}
