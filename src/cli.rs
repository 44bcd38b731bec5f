use crate::config::Config;
use crate::error::ConfigError;
use crate::issues::Level;
use crate::report::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "popeye")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A Kubernetes cluster sanitizer")]
#[command(long_about = "Scans a live Kubernetes cluster, checks nodes, namespaces, pods, services, configmaps, secrets and service accounts against best practices, and reports a score.")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, value_name = "NAME")]
    pub context: Option<String>,

    /// Only scan this namespace
    #[arg(short, long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Sanitizers to run (repeatable, defaults to all)
    #[arg(short, long = "sanitizer", value_name = "SANITIZER")]
    pub sanitizers: Vec<String>,

    /// Hide resources whose worst issue is below this level
    #[arg(short = 'l', long, value_enum)]
    pub level: Option<LevelArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "console")]
    pub output: FormatArg,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Ok,
    Info,
    Warn,
    Error,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Ok => Level::Ok,
            LevelArg::Info => Level::Info,
            LevelArg::Warn => Level::Warn,
            LevelArg::Error => Level::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Console,
    Json,
    Yaml,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Console => OutputFormat::Console,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Yaml => OutputFormat::Yaml,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    /// Layer command line overrides on top of the loaded configuration.
    pub fn apply(&self, mut config: Config) -> Result<Config, ConfigError> {
        if !self.sanitizers.is_empty() {
            config = config.with_sanitizers(&self.sanitizers)?;
        }
        if let Some(level) = self.level {
            config = config.with_min_level(level.into());
        }
        if let Some(ns) = &self.namespace {
            config = config.with_namespace(ns.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(secs);
        }
        Ok(config)
    }
}
