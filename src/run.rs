//! Run coordinator.
//!
//! One run validates the configuration, populates the cache with every kind
//! the enabled sanitizers read, runs those sanitizers in parallel and merges
//! their outcomes into a report. Only configuration errors abort a run;
//! fetch and sanitizer failures, as well as cancellation, end up in the
//! report's error list.

use crate::cache::{Cache, Fetcher, Kind};
use crate::config::{Config, Excludes};
use crate::context::{CancelToken, RunContext};
use crate::error::{FetchError, Result, SanitizeError};
use crate::issues::{Outcome, Tally};
use crate::report::Builder;
use crate::sanitize::{SanitizerKind, required_kinds};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Result of one sanitizer, ready to be merged.
struct Finding {
    kind: SanitizerKind,
    result: std::result::Result<(), SanitizeError>,
    outcome: Outcome,
}

/// Sanitize the cluster behind `fetcher` according to `config`.
pub async fn run<F: Fetcher>(fetcher: &F, config: Config, cancel: CancelToken) -> Result<Builder> {
    let start = Instant::now();
    let excludes = config.validate()?;
    let enabled = config.enabled_sanitizers();
    let mut report = Builder::new().with_min_level(config.min_level);

    log::info!(
        "Sanitizing with {}",
        enabled.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
    );

    let mut cache = Cache::new();
    match cache.populate(fetcher, &required_kinds(&enabled), &cancel).await {
        Ok(()) => {}
        Err(FetchError::Cancelled) => {
            log::warn!("Run cancelled while populating the cache");
            report.mark_cancelled();
            return Ok(report);
        }
        Err(e) => {
            log::warn!("Continuing with a partial cache: {}", e);
            report.add_error(&e);
        }
    }

    let (runnable, skipped): (Vec<_>, Vec<_>) = enabled
        .into_iter()
        .partition(|k| k.required_kinds().iter().all(|kind| cache.is_populated(*kind)));
    for kind in &skipped {
        log::warn!("Skipping {} sanitizer: {} not available", kind, missing(&cache, *kind));
    }

    let ctx = RunContext::new(Arc::new(cache), Arc::new(config), cancel.clone());
    let findings = tokio::task::spawn_blocking(move || sanitize_all(&ctx, &runnable, &excludes)).await;
    let findings = match findings {
        Ok(findings) => findings,
        Err(e) => {
            report.add_error(format!("Sanitizers aborted: {}", e));
            Vec::new()
        }
    };

    merge(&mut report, findings);

    log::info!(
        "Sanitized {} section(s) in {:?}, score {} ({})",
        report.sections().len(),
        start.elapsed(),
        report.score(),
        report.grade()
    );
    Ok(report)
}

fn missing(cache: &Cache, kind: SanitizerKind) -> String {
    kind.required_kinds()
        .iter()
        .filter(|k| !cache.is_populated(**k))
        .map(Kind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run every sanitizer on the rayon pool. Output keeps `kinds` order.
fn sanitize_all(ctx: &RunContext, kinds: &[SanitizerKind], excludes: &Excludes) -> Vec<Finding> {
    kinds
        .par_iter()
        .map(|&kind| {
            let mut finding = isolate(kind, || {
                let mut sanitizer = kind.build(ctx);
                let result = sanitizer.sanitize(&ctx.cancel);
                (result, sanitizer.into_outcome())
            });
            finding.outcome.retain(|fqn| !excludes.is_excluded(kind, fqn));
            log::debug!("{} sanitizer checked {} resource(s)", kind, finding.outcome.len());
            finding
        })
        .collect()
}

/// Run one sanitizer body, turning a panic into a failed finding so
/// sibling sanitizers still report.
fn isolate<F>(kind: SanitizerKind, body: F) -> Finding
where
    F: FnOnce() -> (std::result::Result<(), SanitizeError>, Outcome),
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok((result, outcome)) => Finding {
            kind,
            result,
            outcome,
        },
        Err(payload) => Finding {
            kind,
            result: Err(SanitizeError::Failed {
                sanitizer: kind.as_str(),
                reason: panic_reason(payload.as_ref()),
            }),
            outcome: Outcome::new(),
        },
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panicked".to_string()
    }
}

/// Single writer step folding sanitizer results into the report.
fn merge(report: &mut Builder, findings: Vec<Finding>) {
    for finding in findings {
        match finding.result {
            Ok(()) => {
                let tally = Tally::from_outcome(&finding.outcome);
                report.add_section(finding.kind.as_str(), finding.outcome, tally);
            }
            Err(SanitizeError::Cancelled(_)) => report.mark_cancelled(),
            Err(e) => {
                log::warn!("{}", e);
                report.add_error(&e);
            }
        }
    }
}
