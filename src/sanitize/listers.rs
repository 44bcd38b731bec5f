//! Read capabilities sanitizers depend on.
//!
//! Each sanitizer names the listers it needs instead of reaching into the
//! cache, so tests can hand it a fixture and the cache stays the only
//! production implementation.

use crate::cache::{Cache, fqn};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Namespace, Node, Pod, Secret, Service, ServiceAccount,
};
use std::collections::BTreeMap;

pub trait NodeLister {
    fn list_nodes(&self) -> impl Iterator<Item = (&str, &Node)>;
}

pub trait NamespaceLister {
    fn list_namespaces(&self) -> impl Iterator<Item = (&str, &Namespace)>;
}

pub trait PodLister {
    fn list_pods(&self) -> impl Iterator<Item = (&str, &Pod)>;
}

pub trait ConfigMapLister {
    fn list_configmaps(&self) -> impl Iterator<Item = (&str, &ConfigMap)>;
}

pub trait SecretLister {
    fn list_secrets(&self) -> impl Iterator<Item = (&str, &Secret)>;

    fn get_secret(&self, fqn: &str) -> Option<&Secret>;
}

pub trait ServiceAccountLister {
    fn list_service_accounts(&self) -> impl Iterator<Item = (&str, &ServiceAccount)>;
}

pub trait ServiceLister {
    fn list_services(&self) -> impl Iterator<Item = (&str, &Service)>;

    /// First pod in `namespace` whose labels carry every selector entry.
    fn get_pod(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Option<&Pod>;

    fn get_endpoints(&self, fqn: &str) -> Option<&Endpoints>;
}

/// True when `labels` carries every key/value of a non-empty `selector`.
pub fn matches_selector(
    labels: Option<&BTreeMap<String, String>>,
    selector: &BTreeMap<String, String>,
) -> bool {
    if selector.is_empty() {
        return false;
    }
    let Some(labels) = labels else {
        return false;
    };
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

impl NodeLister for Cache {
    fn list_nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.list_as::<Node>()
    }
}

impl NamespaceLister for Cache {
    fn list_namespaces(&self) -> impl Iterator<Item = (&str, &Namespace)> {
        self.list_as::<Namespace>()
    }
}

impl PodLister for Cache {
    fn list_pods(&self) -> impl Iterator<Item = (&str, &Pod)> {
        self.list_as::<Pod>()
    }
}

impl ConfigMapLister for Cache {
    fn list_configmaps(&self) -> impl Iterator<Item = (&str, &ConfigMap)> {
        self.list_as::<ConfigMap>()
    }
}

impl SecretLister for Cache {
    fn list_secrets(&self) -> impl Iterator<Item = (&str, &Secret)> {
        self.list_as::<Secret>()
    }

    fn get_secret(&self, fqn: &str) -> Option<&Secret> {
        self.get_as::<Secret>(fqn)
    }
}

impl ServiceAccountLister for Cache {
    fn list_service_accounts(&self) -> impl Iterator<Item = (&str, &ServiceAccount)> {
        self.list_as::<ServiceAccount>()
    }
}

impl ServiceLister for Cache {
    fn list_services(&self) -> impl Iterator<Item = (&str, &Service)> {
        self.list_as::<Service>()
    }

    fn get_pod(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Option<&Pod> {
        let prefix = fqn(namespace, "");
        self.list_as::<Pod>()
            .filter(|(pod_fqn, _)| pod_fqn.starts_with(&prefix))
            .map(|(_, pod)| pod)
            .find(|pod| matches_selector(pod.metadata.labels.as_ref(), selector))
    }

    fn get_endpoints(&self, fqn: &str) -> Option<&Endpoints> {
        self.get_as::<Endpoints>(fqn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Object;
    use serde_json::json;

    fn pod(namespace: &str, name: &str, app: &str) -> Object {
        Object::Pod(
            serde_json::from_value(json!({
                "metadata": {"name": name, "namespace": namespace, "labels": {"app": app}},
            }))
            .unwrap(),
        )
    }

    fn selector(app: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("app".to_string(), app.to_string())])
    }

    #[test]
    fn test_matches_selector() {
        let labels = BTreeMap::from([
            ("app".to_string(), "fred".to_string()),
            ("tier".to_string(), "web".to_string()),
        ]);
        assert!(matches_selector(Some(&labels), &selector("fred")));
        assert!(!matches_selector(Some(&labels), &selector("blee")));
        assert!(!matches_selector(None, &selector("fred")));
        assert!(!matches_selector(Some(&labels), &BTreeMap::new()));
    }

    #[test]
    fn test_get_pod_scoped_to_namespace() {
        let cache = Cache::from_objects(vec![
            pod("default", "p1", "fred"),
            pod("other", "p2", "blee"),
            pod("defaultx", "p3", "blee"),
        ]);

        let found = cache.get_pod("default", &selector("fred")).unwrap();
        assert_eq!(found.metadata.name.as_deref(), Some("p1"));
        assert!(cache.get_pod("default", &selector("blee")).is_none());
        assert!(cache.get_pod("other", &selector("blee")).is_some());
    }
}
