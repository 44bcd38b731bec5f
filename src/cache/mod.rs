//! Per-run snapshot of cluster resources.
//!
//! The cache is filled once by [`Cache::populate`] and then shared
//! read-only (behind an `Arc`) with every sanitizer. Lookups never
//! trigger I/O.

pub mod client;
pub mod fetcher;

pub use client::KubeFetcher;
pub use fetcher::Fetcher;

use crate::context::CancelToken;
use crate::error::FetchError;
use futures_util::StreamExt;
use futures_util::stream;
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Namespace, Node, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::pin::pin;

/// Upper bound on concurrent list calls during population.
const MAX_CONCURRENT_FETCHES: usize = 4;

static EMPTY: BTreeMap<String, Object> = BTreeMap::new();

/// Fully-qualified name: `namespace/name`, or `name` when cluster scoped.
pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", namespace, name)
}

/// FQN of an object from its metadata.
pub fn meta_fqn(meta: &ObjectMeta) -> String {
    fqn(
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default(),
    )
}

/// Resource kinds the cache can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Node,
    Namespace,
    Pod,
    Service,
    Endpoints,
    ConfigMap,
    Secret,
    ServiceAccount,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Node,
        Kind::Namespace,
        Kind::Pod,
        Kind::Service,
        Kind::Endpoints,
        Kind::ConfigMap,
        Kind::Secret,
        Kind::ServiceAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Namespace => "namespace",
            Self::Pod => "pod",
            Self::Service => "service",
            Self::Endpoints => "endpoints",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::ServiceAccount => "serviceaccount",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed access to the objects of one kind.
pub trait Cacheable: Sized + 'static {
    const KIND: Kind;

    fn from_object(object: &Object) -> Option<&Self>;

    fn into_object(self) -> Object;
}

macro_rules! cached_objects {
    ($($kind:ident),* $(,)?) => {
        /// A cluster object held by the cache.
        #[derive(Debug, Clone)]
        pub enum Object {
            $($kind($kind),)*
        }

        impl Object {
            pub fn kind(&self) -> Kind {
                match self {
                    $(Self::$kind(_) => Kind::$kind,)*
                }
            }

            pub fn meta(&self) -> &ObjectMeta {
                match self {
                    $(Self::$kind(o) => &o.metadata,)*
                }
            }
        }

        $(
            impl Cacheable for $kind {
                const KIND: Kind = Kind::$kind;

                fn from_object(object: &Object) -> Option<&Self> {
                    match object {
                        Object::$kind(o) => Some(o),
                        _ => None,
                    }
                }

                fn into_object(self) -> Object {
                    Object::$kind(self)
                }
            }
        )*
    };
}

cached_objects!(
    Node,
    Namespace,
    Pod,
    Service,
    Endpoints,
    ConfigMap,
    Secret,
    ServiceAccount,
);

impl Object {
    pub fn fqn(&self) -> String {
        meta_fqn(self.meta())
    }
}

/// Snapshot of cluster objects, one ordered map per kind keyed by FQN.
#[derive(Debug, Default)]
pub struct Cache {
    snapshots: HashMap<Kind, BTreeMap<String, Object>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from already fetched objects.
    pub fn from_objects(objects: impl IntoIterator<Item = Object>) -> Self {
        let mut cache = Self::new();
        for object in objects {
            cache
                .snapshots
                .entry(object.kind())
                .or_default()
                .insert(object.fqn(), object);
        }
        cache
    }

    /// Fetch `kinds` through `fetcher`, one concurrent list per kind.
    ///
    /// Results are stored in `kinds` order. The first failing kind stops
    /// population; kinds stored before it are kept, later ones are not.
    pub async fn populate<F: Fetcher>(
        &mut self,
        fetcher: &F,
        kinds: &[Kind],
        cancel: &CancelToken,
    ) -> Result<(), FetchError> {
        let mut fetches = pin!(
            stream::iter(kinds.iter().copied())
                .map(|kind| async move { (kind, fetcher.list(kind).await) })
                .buffered(MAX_CONCURRENT_FETCHES)
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                next = fetches.next() => next,
            };
            let Some((kind, fetched)) = next else {
                break;
            };
            let objects = fetched?;
            log::debug!("Cached {} {} object(s)", objects.len(), kind);
            self.store(kind, objects);
        }

        Ok(())
    }

    fn store(&mut self, kind: Kind, objects: Vec<Object>) {
        let snapshot = self.snapshots.entry(kind).or_default();
        for object in objects {
            snapshot.insert(object.fqn(), object);
        }
    }

    pub fn is_populated(&self, kind: Kind) -> bool {
        self.snapshots.contains_key(&kind)
    }

    /// Snapshot of `kind`, empty if it was never populated.
    pub fn list(&self, kind: Kind) -> &BTreeMap<String, Object> {
        self.snapshots.get(&kind).unwrap_or(&EMPTY)
    }

    pub fn get(&self, kind: Kind, fqn: &str) -> Option<&Object> {
        self.snapshots.get(&kind)?.get(fqn)
    }

    /// Typed view of one kind, in FQN order.
    pub fn list_as<T: Cacheable>(&self) -> impl Iterator<Item = (&str, &T)> {
        self.list(T::KIND)
            .iter()
            .filter_map(|(fqn, o)| T::from_object(o).map(|t| (fqn.as_str(), t)))
    }

    pub fn get_as<T: Cacheable>(&self, fqn: &str) -> Option<&T> {
        self.get(T::KIND, fqn).and_then(T::from_object)
    }
}
