//! Issue and severity model.
//!
//! - `Level` - totally ordered severity (`Ok < Info < Warn < Error`)
//! - `Issue` - one finding, with its message template kept apart from its arguments
//! - `Outcome` - resource FQN to the issues raised against it
//! - `Collector` - the single writer of one sanitizer's `Outcome`
//! - `Tally` - per-resource rollup of an `Outcome` plus its score

pub mod collector;
pub mod tally;

pub use collector::Collector;
pub use tally::{Tally, grade};

use serde::de::{self, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Group holding issues that belong to the resource itself.
pub const ROOT: &str = "__root__";

/// Severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    #[default]
    Ok = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Ok, Level::Info, Level::Warn, Level::Error];

    /// Parse a level name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ok" => Some(Self::Ok),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Console glyph for the level.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Ok => "✅",
            Self::Info => "🔊",
            Self::Warn => "😱",
            Self::Error => "💥",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LevelVisitor;

        impl Visitor<'_> for LevelVisitor {
            type Value = Level;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a level name (ok, info, warn, error) or code 0-3")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Level, E> {
                Level::parse(v).ok_or_else(|| E::custom(format!("unknown level '{}'", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Level, E> {
                Level::from_code(v).ok_or_else(|| E::custom(format!("unknown level code {}", v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Level, E> {
                u64::try_from(v)
                    .ok()
                    .and_then(Level::from_code)
                    .ok_or_else(|| E::custom(format!("unknown level code {}", v)))
            }
        }

        deserializer.deserialize_any(LevelVisitor)
    }
}

/// A single finding against a resource.
///
/// The message is stored as a template with `{}` placeholders plus the
/// arguments that fill them, so callers can match on either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub group: String,
    pub level: Level,
    template: Cow<'static, str>,
    args: Vec<String>,
}

impl Issue {
    pub fn new(group: impl Into<String>, level: Level, template: impl Into<Cow<'static, str>>) -> Self {
        Self {
            group: group.into(),
            level,
            template: template.into(),
            args: Vec::new(),
        }
    }

    /// Attach the arguments substituted into the template's placeholders.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToString,
    {
        self.args = args.into_iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Render the message. Placeholders without an argument are kept verbatim.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut args = self.args.iter();
        let mut rest = self.template.as_ref();
        while let Some(at) = rest.find("{}") {
            out.push_str(&rest[..at]);
            match args.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("{}"),
            }
            rest = &rest[at + 2..];
        }
        out.push_str(rest);
        out
    }

    pub fn is_group(&self, group: &str) -> bool {
        self.group == group
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl Serialize for Issue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Issue", 3)?;
        state.serialize_field("group", &self.group)?;
        state.serialize_field("level", &self.level)?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

/// Issues for one resource, in insertion order.
pub type Issues = Vec<Issue>;

/// Highest level among `issues`, or `Ok` when there are none.
pub fn max_severity<'a>(issues: impl IntoIterator<Item = &'a Issue>) -> Level {
    issues.into_iter().map(|i| i.level).max().unwrap_or_default()
}

/// Findings of one sanitizer, keyed by resource FQN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Outcome(BTreeMap<String, Issues>);

impl Outcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fqn: &str) -> Option<&Issues> {
        self.0.get(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.0.contains_key(fqn)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resources in FQN order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Issues)> {
        self.0.iter()
    }

    pub(crate) fn slot(&mut self, fqn: &str) -> &mut Issues {
        self.0.entry(fqn.to_string()).or_default()
    }

    /// Keep only resources whose FQN satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|fqn, _| keep(fqn));
    }

    /// Issues of `fqn` in `group`, in their original order.
    pub fn for_group(&self, fqn: &str, group: &str) -> Vec<&Issue> {
        self.0
            .get(fqn)
            .map(|issues| issues.iter().filter(|i| i.is_group(group)).collect())
            .unwrap_or_default()
    }

    pub fn max_group_severity(&self, fqn: &str, group: &str) -> Level {
        max_severity(self.for_group(fqn, group))
    }

    /// Highest level across every group of `fqn`.
    pub fn max_severity(&self, fqn: &str) -> Level {
        self.0.get(fqn).map(max_severity).unwrap_or_default()
    }

    /// Copy holding only resources whose highest level reaches `level`.
    pub fn filter(&self, level: Level) -> Outcome {
        self.0
            .iter()
            .filter(|(_, issues)| max_severity(issues.iter()) >= level)
            .map(|(fqn, issues)| (fqn.clone(), issues.clone()))
            .collect()
    }
}

impl FromIterator<(String, Issues)> for Outcome {
    fn from_iter<T: IntoIterator<Item = (String, Issues)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Outcome {
    type Item = (&'a String, &'a Issues);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Issues>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
