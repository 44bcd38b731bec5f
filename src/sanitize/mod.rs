//! Per-kind resource sanitizers.
//!
//! Every sanitizer owns one [`Collector`](crate::issues::Collector), reads
//! the run's cache through lister traits and never looks at another
//! sanitizer's findings, so the coordinator can run them in parallel.

pub mod configmap;
pub mod container;
pub mod listers;
pub mod namespace;
pub mod node;
pub mod pod;
pub mod refs;
pub mod secret;
pub mod service;
pub mod serviceaccount;

pub use configmap::ConfigMapSanitizer;
pub use namespace::NamespaceSanitizer;
pub use node::NodeSanitizer;
pub use pod::PodSanitizer;
pub use secret::SecretSanitizer;
pub use service::ServiceSanitizer;
pub use serviceaccount::ServiceAccountSanitizer;

use crate::cache::Kind;
use crate::context::{CancelToken, RunContext};
use crate::error::SanitizeError;
use crate::issues::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Sanitizer Trait
// ============================================================================

/// Capability every resource checker implements.
pub trait Sanitizer: Send {
    fn kind(&self) -> SanitizerKind;

    /// Check every cached resource of this kind. Cancellation is observed
    /// between resources, never in the middle of one.
    fn sanitize(&mut self, cancel: &CancelToken) -> Result<(), SanitizeError>;

    /// Findings accumulated so far.
    fn outcome(&self) -> &Outcome;

    fn into_outcome(self: Box<Self>) -> Outcome;
}

/// Bail out of a sanitize loop once the run is cancelled.
pub(crate) fn check_cancelled(
    cancel: &CancelToken,
    kind: SanitizerKind,
) -> Result<(), SanitizeError> {
    if cancel.is_cancelled() {
        return Err(SanitizeError::Cancelled(kind.as_str()));
    }
    Ok(())
}

// ============================================================================
// Sanitizer Registry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanitizerKind {
    #[serde(alias = "no")]
    Node,
    #[serde(alias = "ns")]
    Namespace,
    #[serde(alias = "po")]
    Pod,
    #[serde(alias = "svc")]
    Service,
    #[serde(alias = "cm")]
    ConfigMap,
    #[serde(alias = "sec")]
    Secret,
    #[serde(alias = "sa")]
    ServiceAccount,
}

impl SanitizerKind {
    /// Registry order, which is also report section order.
    pub const ALL: [SanitizerKind; 7] = [
        SanitizerKind::Node,
        SanitizerKind::Namespace,
        SanitizerKind::Pod,
        SanitizerKind::Service,
        SanitizerKind::ConfigMap,
        SanitizerKind::Secret,
        SanitizerKind::ServiceAccount,
    ];

    /// Parse a sanitizer name or its short alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "node" | "no" => Some(Self::Node),
            "namespace" | "ns" => Some(Self::Namespace),
            "pod" | "po" => Some(Self::Pod),
            "service" | "svc" => Some(Self::Service),
            "configmap" | "cm" => Some(Self::ConfigMap),
            "secret" | "sec" => Some(Self::Secret),
            "serviceaccount" | "sa" => Some(Self::ServiceAccount),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Namespace => "namespace",
            Self::Pod => "pod",
            Self::Service => "service",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::ServiceAccount => "serviceaccount",
        }
    }

    /// Cache kinds this sanitizer reads.
    pub fn required_kinds(&self) -> &'static [Kind] {
        match self {
            Self::Node => &[Kind::Node],
            Self::Namespace => &[Kind::Namespace, Kind::Pod],
            Self::Pod => &[Kind::Pod],
            Self::Service => &[Kind::Service, Kind::Endpoints, Kind::Pod],
            Self::ConfigMap => &[Kind::ConfigMap, Kind::Pod],
            Self::Secret => &[Kind::Secret, Kind::Pod, Kind::ServiceAccount],
            Self::ServiceAccount => &[Kind::ServiceAccount, Kind::Pod, Kind::Secret],
        }
    }

    /// Build this sanitizer over the run's cache and configuration.
    pub fn build(&self, ctx: &RunContext) -> Box<dyn Sanitizer> {
        let cache = Arc::clone(&ctx.cache);
        match self {
            Self::Node => Box::new(NodeSanitizer::new(cache)),
            Self::Namespace => Box::new(NamespaceSanitizer::new(cache)),
            Self::Pod => Box::new(PodSanitizer::new(cache, ctx.config.pod.clone())),
            Self::Service => Box::new(ServiceSanitizer::new(cache, ctx.config.service.clone())),
            Self::ConfigMap => Box::new(ConfigMapSanitizer::new(cache)),
            Self::Secret => Box::new(SecretSanitizer::new(cache)),
            Self::ServiceAccount => Box::new(ServiceAccountSanitizer::new(cache)),
        }
    }
}

impl fmt::Display for SanitizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Union of the cache kinds `sanitizers` need, in first-seen order.
pub fn required_kinds(sanitizers: &[SanitizerKind]) -> Vec<Kind> {
    let mut kinds = Vec::new();
    for kind in sanitizers.iter().flat_map(|s| s.required_kinds()) {
        if !kinds.contains(kind) {
            kinds.push(*kind);
        }
    }
    kinds
}
