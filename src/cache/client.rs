//! Kubernetes API fetcher.
//!
//! Lists and gets core resources through a `kube::Client`. A namespace
//! scope narrows namespaced lists to that namespace and reduces the
//! Namespace list to the single scoped namespace.
//!
//! # Example
//!
//! ```rust,ignore
//! use popeye::cache::{Cache, KubeFetcher, Kind};
//!
//! let fetcher = KubeFetcher::new(None, Some("default".to_string())).await?;
//! let mut cache = Cache::new();
//! cache.populate(&fetcher, &[Kind::Pod, Kind::Service], &cancel).await?;
//! ```

use super::{Cacheable, Fetcher, Kind, Object, fqn};
use crate::error::FetchError;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Namespace, Node, Pod, Secret, Service, ServiceAccount,
};
use kube::{
    Client, Config,
    api::{Api, ListParams},
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Fetcher backed by a live cluster connection.
#[derive(Clone)]
pub struct KubeFetcher {
    client: Client,
    namespace: Option<String>,
}

impl KubeFetcher {
    /// Connect using the default kubeconfig, or the named context.
    pub async fn new(context: Option<&str>, namespace: Option<String>) -> Result<Self, FetchError> {
        let config = match context {
            Some(context) => {
                let kubeconfig = kube::config::Kubeconfig::read()
                    .map_err(|e| FetchError::Client(e.to_string()))?;
                Config::from_custom_kubeconfig(
                    kubeconfig,
                    &kube::config::KubeConfigOptions {
                        context: Some(context.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| FetchError::Client(e.to_string()))?
            }
            None => Config::infer()
                .await
                .map_err(|e| FetchError::Client(e.to_string()))?,
        };
        let client = Client::try_from(config).map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::from_client(client, namespace))
    }

    pub fn from_client(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn cluster_api<K>(&self) -> Api<K>
    where
        K: kube::Resource,
        K::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }

    /// Api over the scoped namespace, or all namespaces when unscoped.
    fn scoped_api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    fn namespaced_api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn list_api<K>(api: Api<K>, kind: Kind) -> Result<Vec<Object>, FetchError>
    where
        K: kube::Resource + Cacheable + Clone + DeserializeOwned + Debug,
    {
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| FetchError::List { kind, source })?;
        Ok(list.items.into_iter().map(Cacheable::into_object).collect())
    }

    async fn get_api<K>(
        api: Api<K>,
        kind: Kind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Object>, FetchError>
    where
        K: kube::Resource + Cacheable + Clone + DeserializeOwned + Debug,
    {
        let object = api.get_opt(name).await.map_err(|source| FetchError::Get {
            kind,
            fqn: fqn(namespace, name),
            source,
        })?;
        Ok(object.map(Cacheable::into_object))
    }
}

impl Fetcher for KubeFetcher {
    async fn list(&self, kind: Kind) -> Result<Vec<Object>, FetchError> {
        log::debug!("Listing {} (namespace: {:?})", kind, self.namespace);
        match kind {
            Kind::Node => Self::list_api(self.cluster_api::<Node>(), kind).await,
            Kind::Namespace => match &self.namespace {
                Some(ns) => Ok(self.get(kind, "", ns).await?.into_iter().collect()),
                None => Self::list_api(self.cluster_api::<Namespace>(), kind).await,
            },
            Kind::Pod => Self::list_api(self.scoped_api::<Pod>(), kind).await,
            Kind::Service => Self::list_api(self.scoped_api::<Service>(), kind).await,
            Kind::Endpoints => Self::list_api(self.scoped_api::<Endpoints>(), kind).await,
            Kind::ConfigMap => Self::list_api(self.scoped_api::<ConfigMap>(), kind).await,
            Kind::Secret => Self::list_api(self.scoped_api::<Secret>(), kind).await,
            Kind::ServiceAccount => {
                Self::list_api(self.scoped_api::<ServiceAccount>(), kind).await
            }
        }
    }

    async fn get(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Object>, FetchError> {
        match kind {
            Kind::Node => Self::get_api(self.cluster_api::<Node>(), kind, "", name).await,
            Kind::Namespace => {
                Self::get_api(self.cluster_api::<Namespace>(), kind, "", name).await
            }
            Kind::Pod => {
                Self::get_api(self.namespaced_api::<Pod>(namespace), kind, namespace, name).await
            }
            Kind::Service => {
                let api = self.namespaced_api::<Service>(namespace);
                Self::get_api(api, kind, namespace, name).await
            }
            Kind::Endpoints => {
                let api = self.namespaced_api::<Endpoints>(namespace);
                Self::get_api(api, kind, namespace, name).await
            }
            Kind::ConfigMap => {
                let api = self.namespaced_api::<ConfigMap>(namespace);
                Self::get_api(api, kind, namespace, name).await
            }
            Kind::Secret => {
                let api = self.namespaced_api::<Secret>(namespace);
                Self::get_api(api, kind, namespace, name).await
            }
            Kind::ServiceAccount => {
                let api = self.namespaced_api::<ServiceAccount>(namespace);
                Self::get_api(api, kind, namespace, name).await
            }
        }
    }
}
