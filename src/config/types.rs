use crate::error::ConfigError;
use crate::issues::Level;
use crate::sanitize::SanitizerKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Prefix marking an exclude entry as a regular expression.
const REGEX_PREFIX: &str = "rx:";

/// Run configuration. Immutable once a run starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Sanitizers to run. Empty means all of them.
    pub sanitizers: Vec<SanitizerKind>,

    /// Resources whose worst issue is below this level are hidden from the
    /// rendered report. Tallies always count every resource.
    pub min_level: Level,

    /// Restrict the scan to one namespace.
    pub namespace: Option<String>,

    /// Per-sanitizer FQNs to skip. Entries prefixed with `rx:` are regular
    /// expressions, anything else must match the FQN exactly.
    pub excludes: BTreeMap<String, Vec<String>>,

    pub service: ServicePolicy,

    pub pod: PodPolicy,

    /// Overall run deadline in seconds.
    pub timeout_secs: Option<u64>,
}

/// Service sanitizer policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServicePolicy {
    /// Accept UDP service ports without a warning.
    pub allow_udp: bool,
}

/// Pod sanitizer policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodPolicy {
    /// Container restarts tolerated before a warning.
    pub restarts_limit: i32,
}

impl Default for PodPolicy {
    fn default() -> Self {
        Self { restarts_limit: 5 }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sanitizers by name.
    pub fn with_sanitizers<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ConfigError> {
        self.sanitizers = names
            .iter()
            .map(|n| {
                SanitizerKind::parse(n.as_ref())
                    .ok_or_else(|| ConfigError::UnknownSanitizer(n.as_ref().to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Add an exclude entry for a sanitizer.
    pub fn exclude(mut self, sanitizer: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.excludes
            .entry(sanitizer.into())
            .or_default()
            .push(pattern.into());
        self
    }

    /// Sanitizers to run, in registry order.
    pub fn enabled_sanitizers(&self) -> Vec<SanitizerKind> {
        SanitizerKind::ALL
            .iter()
            .copied()
            .filter(|k| self.sanitizers.is_empty() || self.sanitizers.contains(k))
            .collect()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Check the configuration, compiling every exclude pattern.
    pub fn validate(&self) -> Result<Excludes, ConfigError> {
        let mut compiled = HashMap::new();
        for (section, patterns) in &self.excludes {
            let kind = SanitizerKind::parse(section)
                .ok_or_else(|| ConfigError::UnknownSanitizer(section.clone()))?;
            let matchers = patterns
                .iter()
                .map(|p| Matcher::compile(section, p))
                .collect::<Result<Vec<_>, _>>()?;
            // Alias sections (`svc` and `service`) share one rule list.
            compiled.entry(kind).or_insert_with(Vec::new).extend(matchers);
        }
        Ok(Excludes(compiled))
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    fn compile(section: &str, entry: &str) -> Result<Self, ConfigError> {
        match entry.strip_prefix(REGEX_PREFIX) {
            Some(rx) => Regex::new(rx)
                .map(Self::Pattern)
                .map_err(|e| ConfigError::InvalidPattern {
                    section: section.to_string(),
                    pattern: entry.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(Self::Exact(entry.to_string())),
        }
    }

    fn matches(&self, fqn: &str) -> bool {
        match self {
            Self::Exact(name) => name == fqn,
            Self::Pattern(rx) => rx.is_match(fqn),
        }
    }
}

/// Compiled exclude rules, produced by [`Config::validate`].
#[derive(Debug, Clone, Default)]
pub struct Excludes(HashMap<SanitizerKind, Vec<Matcher>>);

impl Excludes {
    pub fn is_excluded(&self, kind: SanitizerKind, fqn: &str) -> bool {
        self.0
            .get(&kind)
            .is_some_and(|matchers| matchers.iter().any(|m| m.matches(fqn)))
    }
}
