use super::listers::{PodLister, SecretLister, ServiceAccountLister};
use super::refs::References;
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Outcome};
use std::sync::Arc;

/// Secrets of this type are managed by the cluster itself.
const SERVICE_ACCOUNT_TOKEN: &str = "kubernetes.io/service-account-token";

/// Flags secrets neither pods nor service accounts reference.
pub struct SecretSanitizer<L> {
    lister: Arc<L>,
    collector: Collector,
}

impl<L: SecretLister + PodLister + ServiceAccountLister> SecretSanitizer<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self {
            lister,
            collector: Collector::new(),
        }
    }

    fn references(&self) -> References {
        let mut refs = References::from_pods(self.lister.list_pods().map(|(_, pod)| pod));
        for (_, sa) in self.lister.list_service_accounts() {
            refs.add_service_account(sa);
        }
        refs
    }
}

impl<L: SecretLister + PodLister + ServiceAccountLister + Send + Sync> Sanitizer
    for SecretSanitizer<L>
{
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::Secret
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        let refs = self.references();
        for (fqn, secret) in lister.list_secrets() {
            if secret.type_.as_deref() == Some(SERVICE_ACCOUNT_TOKEN) {
                continue;
            }
            check_cancelled(cancel, self.kind())?;
            self.collector.init_outcome(fqn);
            if !refs.uses_secret(fqn) {
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
