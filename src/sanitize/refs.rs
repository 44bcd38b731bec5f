//! Which configmaps, secrets and service accounts pods actually use.

use crate::cache::fqn;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, ServiceAccount};
use std::collections::HashSet;

pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Object reference names are `String` on some API fields and
/// `Option<String>` on others. Empty names count as absent.
pub(crate) trait RefName {
    fn ref_name(&self) -> Option<&str>;
}

impl RefName for String {
    fn ref_name(&self) -> Option<&str> {
        (!self.is_empty()).then_some(self.as_str())
    }
}

impl RefName for Option<String> {
    fn ref_name(&self) -> Option<&str> {
        self.as_deref().filter(|n| !n.is_empty())
    }
}

/// Service account a pod runs under.
pub fn service_account_name(spec: &PodSpec) -> &str {
    spec.service_account_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_SERVICE_ACCOUNT)
}

/// FQN sets of every configmap, secret and service account in use.
#[derive(Debug, Default)]
pub struct References {
    config_maps: HashSet<String>,
    secrets: HashSet<String>,
    service_accounts: HashSet<String>,
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pods<'a>(pods: impl IntoIterator<Item = &'a Pod>) -> Self {
        let mut refs = Self::new();
        for pod in pods {
            refs.add_pod(pod);
        }
        refs
    }

    pub fn add_pod(&mut self, pod: &Pod) {
        let Some(spec) = &pod.spec else {
            return;
        };
        let ns = pod.metadata.namespace.as_deref().unwrap_or_default();

        self.service_accounts
            .insert(fqn(ns, service_account_name(spec)));

        for secret in spec.image_pull_secrets.iter().flatten() {
            if let Some(name) = secret.name.ref_name() {
                self.secrets.insert(fqn(ns, name));
            }
        }

        for volume in spec.volumes.iter().flatten() {
            if let Some(name) = volume.config_map.as_ref().and_then(|c| c.name.ref_name()) {
                self.config_maps.insert(fqn(ns, name));
            }
            if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.ref_name()) {
                self.secrets.insert(fqn(ns, name));
            }
            let sources = volume
                .projected
                .as_ref()
                .and_then(|p| p.sources.as_ref())
                .into_iter()
                .flatten();
            for source in sources {
                if let Some(name) = source.config_map.as_ref().and_then(|c| c.name.ref_name()) {
                    self.config_maps.insert(fqn(ns, name));
                }
                if let Some(name) = source.secret.as_ref().and_then(|s| s.name.ref_name()) {
                    self.secrets.insert(fqn(ns, name));
                }
            }
        }

        let containers = spec
            .init_containers
            .iter()
            .flatten()
            .chain(spec.containers.iter());
        for container in containers {
            self.add_container(ns, container);
        }
    }

    fn add_container(&mut self, ns: &str, container: &Container) {
        for var in container.env.iter().flatten() {
            let Some(source) = &var.value_from else {
                continue;
            };
            if let Some(name) = source.config_map_key_ref.as_ref().and_then(|r| r.name.ref_name()) {
                self.config_maps.insert(fqn(ns, name));
            }
            if let Some(name) = source.secret_key_ref.as_ref().and_then(|r| r.name.ref_name()) {
                self.secrets.insert(fqn(ns, name));
            }
        }

        for source in container.env_from.iter().flatten() {
            if let Some(name) = source.config_map_ref.as_ref().and_then(|r| r.name.ref_name()) {
                self.config_maps.insert(fqn(ns, name));
            }
            if let Some(name) = source.secret_ref.as_ref().and_then(|r| r.name.ref_name()) {
                self.secrets.insert(fqn(ns, name));
            }
        }
    }

    /// Secrets a service account mounts or pulls images with.
    pub fn add_service_account(&mut self, sa: &ServiceAccount) {
        let ns = sa.metadata.namespace.as_deref().unwrap_or_default();
        for secret in sa.secrets.iter().flatten() {
            if let Some(name) = secret.name.ref_name() {
                self.secrets.insert(fqn(ns, name));
            }
        }
        for secret in sa.image_pull_secrets.iter().flatten() {
            if let Some(name) = secret.name.ref_name() {
                self.secrets.insert(fqn(ns, name));
            }
        }
    }

    pub fn uses_config_map(&self, fqn: &str) -> bool {
        self.config_maps.contains(fqn)
    }

    pub fn uses_secret(&self, fqn: &str) -> bool {
        self.secrets.contains(fqn)
    }

    pub fn uses_service_account(&self, fqn: &str) -> bool {
        self.service_accounts.contains(fqn)
    }
}
