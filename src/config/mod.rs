pub mod types;

pub use types::{Config, Excludes, PodPolicy, ServicePolicy};

use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".popeye.yaml";

/// Get the global config file path (~/.popeye.yaml)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_FILE_NAME))
}

/// Get the local config file path (./.popeye.yaml)
pub fn local_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load configuration from an explicit file, else the local then the
/// global default location, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        return load_from_file(path);
    }

    let local = local_config_path();
    if local.exists() {
        return load_from_file(&local);
    }

    if let Some(global) = global_config_path() {
        if global.exists() {
            return load_from_file(&global);
        }
    }

    Ok(Config::default())
}

/// Load configuration from a YAML file.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    log::debug!("Loading configuration from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    load_from_str(&content)
}

/// Load configuration from a YAML string.
pub fn load_from_str(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::Level;
    use crate::sanitize::SanitizerKind;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.sanitizers.is_empty());
        assert_eq!(config.min_level, Level::Ok);
        assert!(!config.service.allow_udp);
        assert_eq!(config.pod.restarts_limit, 5);
        assert_eq!(config.enabled_sanitizers().len(), SanitizerKind::ALL.len());
    }

    #[test]
    fn test_load_from_str() {
        let config = load_from_str(
            r#"
sanitizers: [service, pod]
minLevel: warn
namespace: default
service:
  allowUdp: true
pod:
  restartsLimit: 10
excludes:
  service:
    - default/kubernetes
    - "rx:^kube-system/"
"#,
        )
        .unwrap();

        assert_eq!(
            config.enabled_sanitizers(),
            vec![SanitizerKind::Pod, SanitizerKind::Service]
        );
        assert_eq!(config.min_level, Level::Warn);
        assert_eq!(config.namespace.as_deref(), Some("default"));
        assert!(config.service.allow_udp);
        assert_eq!(config.pod.restarts_limit, 10);

        let excludes = config.validate().unwrap();
        assert!(excludes.is_excluded(SanitizerKind::Service, "default/kubernetes"));
        assert!(excludes.is_excluded(SanitizerKind::Service, "kube-system/dns"));
        assert!(!excludes.is_excluded(SanitizerKind::Service, "default/fred"));
        assert!(!excludes.is_excluded(SanitizerKind::Pod, "default/kubernetes"));
    }

    #[test]
    fn test_load_empty() {
        assert_eq!(load_from_str("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_load_rejects_unknown_sanitizer() {
        let err = load_from_str("sanitizers: [deployment]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate_bad_pattern() {
        let config = Config::new().exclude("pod", "rx:([");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_validate_unknown_section() {
        let config = Config::new().exclude("deployment", "default/fred");
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::UnknownSanitizer(_)
        ));
    }

    #[test]
    fn test_validate_merges_alias_sections() {
        let excludes = Config::new()
            .exclude("service", "default/kubernetes")
            .exclude("svc", "default/other")
            .validate()
            .unwrap();
        assert!(excludes.is_excluded(SanitizerKind::Service, "default/kubernetes"));
        assert!(excludes.is_excluded(SanitizerKind::Service, "default/other"));
        assert!(!excludes.is_excluded(SanitizerKind::Pod, "default/other"));
    }

    #[test]
    fn test_with_sanitizers() {
        let config = Config::new().with_sanitizers(&["svc", "node"]).unwrap();
        assert_eq!(
            config.enabled_sanitizers(),
            vec![SanitizerKind::Node, SanitizerKind::Service]
        );
        assert!(Config::new().with_sanitizers(&["bozo"]).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "minLevel: error\ntimeoutSecs: 30").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.min_level, Level::Error);
        assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(30)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
