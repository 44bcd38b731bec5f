//! # Popeye
//!
//! A read-only Kubernetes cluster sanitizer. It snapshots live cluster
//! resources once per run, checks every resource against a battery of
//! best-practice rules, and reports per-resource findings with a score and
//! a letter grade.
//!
//! ## Example
//!
//! ```rust,no_run
//! use popeye::{CancelToken, Config, KubeFetcher, run};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fetcher = KubeFetcher::new(None, None).await?;
//! let report = run(&fetcher, Config::default(), CancelToken::new()).await?;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod issues;
pub mod report;
pub mod run;
pub mod sanitize;

pub use cache::{Cache, Fetcher, Kind, KubeFetcher, Object};
pub use config::Config;
pub use context::{CancelToken, RunContext};
pub use error::{Error, Result};
pub use issues::{Collector, Issue, Level, Outcome, Tally};
pub use report::{Builder, Console, OutputFormat};
pub use run::run;
pub use sanitize::{Sanitizer, SanitizerKind};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
