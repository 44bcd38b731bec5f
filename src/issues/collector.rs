use super::{Issue, Level, Outcome, ROOT};
use std::borrow::Cow;

/// Accumulates the findings of one sanitizer run.
///
/// A collector is owned by exactly one sanitizer until its run ends, so it
/// needs no synchronization.
#[derive(Debug, Default)]
pub struct Collector {
    outcome: Outcome,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }

    /// Register a scanned resource so it is tallied even without issues.
    pub fn init_outcome(&mut self, fqn: &str) {
        self.outcome.slot(fqn);
    }

    pub fn add(&mut self, fqn: &str, issue: Issue) {
        self.outcome.slot(fqn).push(issue);
    }

    pub fn add_issue(
        &mut self,
        fqn: &str,
        group: &str,
        level: Level,
        message: impl Into<Cow<'static, str>>,
    ) {
        self.add(fqn, Issue::new(group, level, message));
    }

    pub fn add_ok(&mut self, fqn: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, ROOT, Level::Ok, message);
    }

    pub fn add_info(&mut self, fqn: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, ROOT, Level::Info, message);
    }

    pub fn add_warn(&mut self, fqn: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, ROOT, Level::Warn, message);
    }

    pub fn add_error(&mut self, fqn: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, ROOT, Level::Error, message);
    }

    pub fn add_sub_info(&mut self, fqn: &str, group: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, group, Level::Info, message);
    }

    pub fn add_sub_warn(&mut self, fqn: &str, group: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, group, Level::Warn, message);
    }

    pub fn add_sub_error(&mut self, fqn: &str, group: &str, message: impl Into<Cow<'static, str>>) {
        self.add_issue(fqn, group, Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_preserves_order() {
        let mut c = Collector::new();
        c.add_warn("default/p1", "first");
        c.add_sub_error("default/p1", "c1", "second");
        c.add_info("default/p1", "third");
        c.add_warn("default/p1", "first");

        let issues = c.outcome().get("default/p1").unwrap();
        let msgs: Vec<String> = issues.iter().map(Issue::message).collect();
        assert_eq!(msgs, ["first", "second", "third", "first"]);
        assert_eq!(issues[1].group, "c1");
        assert_eq!(issues[1].level, Level::Error);
    }

    #[test]
    fn test_init_outcome_creates_empty_slot() {
        let mut c = Collector::new();
        c.init_outcome("fred");
        c.init_outcome("fred");
        assert_eq!(c.outcome().len(), 1);
        assert!(c.outcome().get("fred").unwrap().is_empty());
    }
}
