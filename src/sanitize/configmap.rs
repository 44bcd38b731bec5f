use super::listers::{ConfigMapLister, PodLister};
use super::refs::References;
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Outcome};
use std::sync::Arc;

/// Flags configmaps no pod references.
pub struct ConfigMapSanitizer<L> {
    lister: Arc<L>,
    collector: Collector,
}

impl<L: ConfigMapLister + PodLister> ConfigMapSanitizer<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self {
            lister,
            collector: Collector::new(),
        }
    }
}

impl<L: ConfigMapLister + PodLister + Send + Sync> Sanitizer for ConfigMapSanitizer<L> {
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::ConfigMap
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        let refs = References::from_pods(lister.list_pods().map(|(_, pod)| pod));
        for (fqn, _) in lister.list_configmaps() {
            check_cancelled(cancel, self.kind())?;
            self.collector.init_outcome(fqn);
            if !refs.uses_config_map(fqn) {
                self.collector.add_info(fqn, "Used? Unable to locate resource reference");
            }
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
