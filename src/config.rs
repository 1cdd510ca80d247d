//! Configuration discovery and loading.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Conventional project configuration file name.
pub const CONFIG_FILE_NAME: &str = "antimon.toml";

/// Environment variable naming an explicit configuration file.
pub const ENV_CONFIG: &str = "ANTIMON_CONFIG";

/// Default audit log file name, placed next to the configuration file.
pub const AUDIT_LOG_NAME: &str = "antimon.log";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// One named, data-driven detection rule.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatternConfig {
    pub enabled: bool,
    pub description: String,
    /// Regexes checked against the joined content.
    pub content_patterns: Vec<String>,
    /// Regexes checked against the target file path.
    pub file_patterns: Vec<String>,
    /// Regexes checked against the joined content, reported as imports.
    pub import_patterns: Vec<String>,
    pub message: String,
    pub severity: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            description: String::new(),
            content_patterns: Vec::new(),
            file_patterns: Vec::new(),
            import_patterns: Vec::new(),
            message: "Security issue detected".to_string(),
            severity: "error".to_string(),
        }
    }
}

/// Audit logging settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging.
    pub enabled: bool,
    /// Path to the audit log file. Relative paths resolve against the
    /// directory of the configuration file.
    pub path: Option<String>,
}

/// Where the active configuration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    #[default]
    Defaults,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Named rules in file order.
    pub patterns: Vec<(String, PatternConfig)>,
    pub audit: AuditConfig,
    pub source: ConfigSource,
}

/// On-disk shape. `patterns` stays a table so rule order survives
/// (the `preserve_order` feature keeps insertion order).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    patterns: toml::Table,
    audit: AuditConfig,
}

impl Config {
    /// Load configuration: `explicit` path if given, else the first file
    /// found by [`Config::discover`], else the built-in defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_file(path);
        }

        match Self::discover(cwd) {
            Some(path) => Self::load_file(&path),
            None => {
                debug!("no configuration file found, using built-in rules");
                Ok(Self::defaults())
            }
        }
    }

    /// Like [`Config::load`], but any failure is logged and replaced by
    /// the built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>, cwd: &Path) -> Self {
        Self::load(explicit, cwd).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load configuration, using built-in rules");
            Self::defaults()
        })
    }

    /// Find a configuration file: `antimon.toml` in `start` or any parent,
    /// then `.antimon/config.toml` in `start`, then `~/.antimon/config.toml`.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let project = start.join(".antimon").join("config.toml");
        if project.is_file() {
            return Some(project);
        }

        dirs::home_dir()
            .map(|home| home.join(".antimon").join("config.toml"))
            .filter(|user| user.is_file())
    }

    /// Load one configuration file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content, ConfigSource::File(path.to_path_buf()))?;
        debug!(path = %path.display(), rules = config.patterns.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration text. A rule whose fields have the wrong shape is
    /// skipped; the rest of the file still loads.
    pub fn from_toml_str(content: &str, source: ConfigSource) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut patterns = Vec::with_capacity(raw.patterns.len());
        for (name, value) in raw.patterns {
            match value.try_into::<PatternConfig>() {
                Ok(rule) => patterns.push((name, rule)),
                Err(e) => warn!(rule = %name, error = %e, "skipping malformed pattern rule"),
            }
        }

        Ok(Self {
            patterns,
            audit: raw.audit,
            source,
        })
    }

    /// True when rules came from a file rather than the built-in set.
    pub fn is_user_defined(&self) -> bool {
        matches!(self.source, ConfigSource::File(_))
    }

    /// Resolved audit log path, when auditing is enabled.
    pub fn audit_log_path(&self) -> Option<PathBuf> {
        if !self.audit.enabled {
            return None;
        }
        let base = match &self.source {
            ConfigSource::File(path) => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            ConfigSource::Defaults => PathBuf::from("."),
        };
        let path = match &self.audit.path {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(AUDIT_LOG_NAME),
        };
        Some(if path.is_absolute() { path } else { base.join(path) })
    }

    /// The built-in rule set used when no configuration file exists.
    pub fn defaults() -> Self {
        let rule = |description: &str, message: &str, severity: &str| PatternConfig {
            description: description.to_string(),
            message: message.to_string(),
            severity: severity.to_string(),
            ..Default::default()
        };
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let patterns = vec![
            (
                "external_ai_apis".to_string(),
                PatternConfig {
                    content_patterns: strings(&[
                        r"openai\.com",
                        r"claude\.ai",
                        r"gemini\.google\.com",
                        r"cohere\.ai",
                        r"huggingface\.co",
                    ]),
                    import_patterns: strings(&[
                        r"import openai",
                        r"from openai import",
                        r"import anthropic",
                        r"from anthropic import",
                    ]),
                    ..rule(
                        "External AI API usage detection",
                        "External AI API usage detected",
                        "warning",
                    )
                },
            ),
            (
                "api_keys".to_string(),
                PatternConfig {
                    content_patterns: strings(&[
                        r"sk-[a-zA-Z0-9]{48}",
                        r"AIza[0-9A-Za-z\-_]{35}",
                        r"AKIA[0-9A-Z]{16}",
                        r"ghp_[a-zA-Z0-9]{36}",
                        r#"api_key\s*=\s*["'][^"']+["']"#,
                    ]),
                    ..rule(
                        "Hardcoded API keys and credentials",
                        "Hardcoded API key detected",
                        "error",
                    )
                },
            ),
            (
                "sensitive_files".to_string(),
                PatternConfig {
                    file_patterns: strings(&[
                        r"/etc/passwd",
                        r"/etc/shadow",
                        r"\.ssh/id_rsa",
                        r"\.ssh/id_ed25519",
                        r"\.env$",
                        r"\.pem$",
                        r"\.key$",
                        r"secrets/.*",
                        r"config/database\.yml",
                    ]),
                    ..rule(
                        "Access to sensitive files",
                        "Access to sensitive file detected",
                        "error",
                    )
                },
            ),
            (
                "docker_operations".to_string(),
                PatternConfig {
                    content_patterns: strings(&[
                        r"docker\s+run.*--privileged",
                        r"FROM.*:latest",
                        r"docker\s+exec.*sh",
                    ]),
                    ..rule(
                        "Docker operations that might be risky",
                        "Potentially risky Docker operation detected",
                        "warning",
                    )
                },
            ),
            (
                "localhost_connections".to_string(),
                PatternConfig {
                    content_patterns: strings(&[
                        r"localhost:[0-9]+",
                        r"127\.0\.0\.1:[0-9]+",
                        r"0\.0\.0\.0:[0-9]+",
                    ]),
                    ..rule(
                        "Localhost connections and specific port access",
                        "Localhost connection detected",
                        "warning",
                    )
                },
            ),
        ];

        Self {
            patterns,
            audit: AuditConfig::default(),
            source: ConfigSource::Defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[patterns.zeta]
content_patterns = ['COMPANY_SECRET_[A-Z0-9]+']
message = "Company secret detected"

[patterns.alpha]
enabled = false
file_patterns = ['\.vault$']
severity = "warning"

[ai_detectors.always]
enabled = true

[audit]
enabled = true
"#;

    #[test]
    fn test_defaults_cover_categories() {
        let config = Config::defaults();
        let names: Vec<&str> = config.patterns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "external_ai_apis",
                "api_keys",
                "sensitive_files",
                "docker_operations",
                "localhost_connections"
            ]
        );
        assert!(!config.is_user_defined());
        assert!(config.audit_log_path().is_none());
    }

    #[test]
    fn test_parse_preserves_order_and_defaults() {
        let config = Config::from_toml_str(SAMPLE, ConfigSource::Defaults).unwrap();
        assert_eq!(config.patterns[0].0, "zeta");
        assert_eq!(config.patterns[1].0, "alpha");

        let zeta = &config.patterns[0].1;
        assert!(zeta.enabled);
        assert_eq!(zeta.severity, "error");
        assert_eq!(zeta.message, "Company secret detected");

        let alpha = &config.patterns[1].1;
        assert!(!alpha.enabled);
        assert_eq!(alpha.message, "Security issue detected");
        assert!(config.audit.enabled);
    }

    #[test]
    fn test_malformed_rule_is_skipped() {
        let toml = r#"
[patterns.bad]
content_patterns = "not a list"

[patterns.good]
content_patterns = ["x"]
"#;
        let config = Config::from_toml_str(toml, ConfigSource::Defaults).unwrap();
        assert_eq!(config.patterns.len(), 1);
        assert_eq!(config.patterns[0].0, "good");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(matches!(
            Config::from_toml_str("[patterns", ConfigSource::Defaults),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing), dir.path()),
            Err(ConfigError::NotFound(_))
        ));
        // Falls back to the built-in rules.
        let config = Config::load_or_default(Some(&missing), dir.path());
        assert_eq!(config.source, ConfigSource::Defaults);
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let found = Config::discover(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));

        let config = Config::load(None, &nested).unwrap();
        assert!(config.is_user_defined());
        assert_eq!(config.audit_log_path(), Some(dir.path().join(AUDIT_LOG_NAME)));
    }

    #[test]
    fn test_discover_project_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".antimon")).unwrap();
        fs::write(dir.path().join(".antimon").join("config.toml"), SAMPLE).unwrap();

        let found = Config::discover(dir.path()).unwrap();
        assert!(found.ends_with(".antimon/config.toml"));
    }

    #[test]
    fn test_audit_path_override() {
        let toml = "[audit]\nenabled = true\npath = \"/var/log/antimon.jsonl\"\n";
        let config =
            Config::from_toml_str(toml, ConfigSource::File(PathBuf::from("/p/antimon.toml"))).unwrap();
        assert_eq!(config.audit_log_path(), Some(PathBuf::from("/var/log/antimon.jsonl")));
    }
}
