use super::listers::{PodLister, SecretLister, ServiceAccountLister};
use super::refs::{DEFAULT_SERVICE_ACCOUNT, RefName, References};
use super::{Sanitizer, SanitizerKind, check_cancelled};
use crate::cache::fqn;
use crate::context::CancelToken;
use crate::error::SanitizeError;
use crate::issues::{Collector, Issue, Level, Outcome, ROOT};
use k8s_openapi::api::core::v1::ServiceAccount;
use std::sync::Arc;

/// Checks service account usage and the secrets they point at.
pub struct ServiceAccountSanitizer<L> {
    lister: Arc<L>,
    collector: Collector,
}

impl<L: ServiceAccountLister + PodLister + SecretLister> ServiceAccountSanitizer<L> {
    pub fn new(lister: Arc<L>) -> Self {
        Self {
            lister,
            collector: Collector::new(),
        }
    }

    fn check_service_account(&mut self, sa_fqn: &str, sa: &ServiceAccount, refs: &References) {
        self.collector.init_outcome(sa_fqn);

        let ns = sa.metadata.namespace.as_deref().unwrap_or_default();
        let name = sa.metadata.name.as_deref().unwrap_or_default();
        if name != DEFAULT_SERVICE_ACCOUNT && !refs.uses_service_account(sa_fqn) {
            self.collector.add_info(sa_fqn, "Used? Unable to locate resource reference");
        }

        let names = sa
            .secrets
            .iter()
            .flatten()
            .filter_map(|r| r.name.ref_name())
            .chain(
                sa.image_pull_secrets
                    .iter()
                    .flatten()
                    .filter_map(|r| r.name.ref_name()),
            );
        for secret in names {
            if self.lister.get_secret(&fqn(ns, secret)).is_none() {
                self.collector.add(
                    sa_fqn,
                    Issue::new(ROOT, Level::Warn, "References a secret \"{}\" which does not exist")
                        .with_args([secret]),
                );
            }
        }
    }
}

impl<L: ServiceAccountLister + PodLister + SecretLister + Send + Sync> Sanitizer
    for ServiceAccountSanitizer<L>
{
    fn kind(&self) -> SanitizerKind {
        SanitizerKind::ServiceAccount
    }

    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError> {
        let lister = Arc::clone(&self.lister);
        let refs = References::from_pods(lister.list_pods().map(|(_, pod)| pod));
        for (fqn, sa) in lister.list_service_accounts() {
            check_cancelled(cancel, self.kind())?;
            self.check_service_account(fqn, sa, &refs);
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
