//! Configuration loader implementation

use crate::env::EnvOverrides;
use crate::schema::RuntimeConfig;
use crate::validation::ConfigValidator;
use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use types::ConfigError;

/// File name searched for when no explicit path is given
pub const CONFIG_FILE_STEM: &str = "config";

/// Accepted extensions, in lookup order
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Directories searched for a config file, in lookup order
pub const DEFAULT_SEARCH_PATHS: &[&str] = &[".", "/etc/shipinator"];

/// Configuration loader merging defaults, a YAML file and environment variables
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    env: EnvOverrides,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader using the default search paths and the process environment
    pub fn new() -> Self {
        Self {
            file: None,
            search_paths: DEFAULT_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            env: EnvOverrides::from_env(),
        }
    }

    /// Use this file instead of searching; it must exist
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    /// Load configuration from the process environment and an optional explicit file
    pub fn load(config_path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
        let mut loader = Self::new();
        if let Some(path) = config_path {
            loader = loader.with_file(path);
        }
        loader.resolve()
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<RuntimeConfig, ConfigError> {
        let figment = Self::merge_yaml(Self::defaults(), yaml_content, "string")?;
        Self::finish(figment)
    }

    /// Merge every layer and check the result
    pub fn resolve(&self) -> Result<RuntimeConfig, ConfigError> {
        let mut figment = Self::defaults();

        match self.locate()? {
            Some(path) => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| ConfigError::Source {
                        source_name: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                figment = Self::merge_yaml(figment, &content, &path.display().to_string())?;
                info!("Configuration file loaded from: {}", path.display());
            }
            None => {
                debug!(
                    "No configuration file found in {:?}, using defaults and environment",
                    self.search_paths
                );
            }
        }

        if !self.env.is_empty() {
            debug!(
                "Environment overrides: {}",
                self.env.keys().collect::<Vec<_>>().join(", ")
            );
        }
        figment = figment.merge(self.env.clone());

        Self::finish(figment)
    }

    /// Config file that `resolve` would read, if any
    pub fn locate(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            return Ok(Some(path.clone()));
        }

        for dir in &self.search_paths {
            for extension in CONFIG_EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", CONFIG_FILE_STEM, extension));
                if candidate.is_file() {
                    return Ok(Some(candidate));
                }
            }
        }

        Ok(None)
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(RuntimeConfig::default()))
    }

    fn merge_yaml(figment: Figment, content: &str, source: &str) -> Result<Figment, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse(format!("{}: {}", source, message));

        let mut value: Value =
            serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        match value {
            // An empty document contributes nothing.
            Value::Null => return Ok(figment),
            Value::Mapping(_) => {}
            _ => return Err(parse_error("expected a mapping at the top level".to_string())),
        }

        strip_nulls(&mut value);
        let layer = serde_yaml::to_string(&value).map_err(|e| parse_error(e.to_string()))?;

        // Type-check the file on its own; a later layer must not mask a bad value.
        Self::defaults()
            .merge(Yaml::string(&layer))
            .extract::<RuntimeConfig>()
            .map_err(|e| parse_error(e.to_string()))?;

        Ok(figment.merge(Yaml::string(&layer)))
    }

    fn finish(figment: Figment) -> Result<RuntimeConfig, ConfigError> {
        let config: RuntimeConfig = figment
            .extract()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration
    fn validate(config: &RuntimeConfig) -> Result<(), ConfigError> {
        if let Some(field) = ConfigValidator::missing_required(config) {
            return Err(ConfigError::MissingField {
                field: field.to_string(),
            });
        }

        let report = ConfigValidator::validate(config);
        debug!("{}", report.summary());
        for issue in &report.warnings {
            warn!("Configuration warning: {}", issue);
        }

        match report.errors.into_iter().next() {
            Some(issue) => Err(ConfigError::Validation {
                field: issue.field,
                message: issue.message,
            }),
            None => Ok(()),
        }
    }

    /// Get default configuration
    pub fn defaults_config() -> RuntimeConfig {
        RuntimeConfig::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml_content = serde_yaml::to_string(&Self::defaults_config())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, yaml_content).map_err(|e| ConfigError::Source {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Drop null entries so an empty key falls back to the lower layers
fn strip_nulls(value: &mut Value) {
    if let Value::Mapping(mapping) = value {
        mapping.retain(|_, entry| !entry.is_null());
        for (_, entry) in mapping.iter_mut() {
            strip_nulls(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::fs;
    use tempfile::TempDir;

    fn isolated(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new()
            .with_search_paths([dir.path()])
            .with_env(EnvOverrides::default())
    }

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            r#"
listen_addr: ":9090"
db:
  host: "dbhost"
  port: "5433"
  user: "myuser"
  password: "mypass"
  name: "mydb"
  ssl_mode: "require"
artifact_path: "/tmp/artifacts"
kubeconfig: "/home/user/.kube/config"
log_level: "debug"
"#,
        );

        let config = isolated(&dir).with_file(&path).resolve().unwrap();
        assert_eq!(config.listen_addr, ":9090");
        assert_eq!(config.db.host, "dbhost");
        assert_eq!(config.db.port, "5433");
        assert_eq!(config.db.user, "myuser");
        assert_eq!(config.db.password, "mypass");
        assert_eq!(config.db.name, "mydb");
        assert_eq!(config.db.ssl_mode, "require");
        assert_eq!(config.artifact_path, "/tmp/artifacts");
        assert_eq!(config.kube_config_path, "/home/user/.kube/config");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_env_overrides_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "config.yaml",
            "db:\n  name: \"fromyaml\"\nlog_level: \"warn\"\n",
        );

        let env = EnvOverrides::from_pairs([
            ("SHIPINATOR_DB_NAME", "fromenv"),
            ("SHIPINATOR_LOG_LEVEL", "error"),
        ]);
        let config = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap();
        assert_eq!(config.db.name, "fromenv");
        assert_eq!(config.log_level, "error");
    }

    #[test]
    fn test_missing_db_name_fails() {
        let dir = TempDir::new().unwrap();
        let err = isolated(&dir).resolve().unwrap_err();
        match err {
            ConfigError::MissingField { field } => assert_eq!(field, "db.name"),
            other => panic!("expected missing db.name, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_with_env_db_name() {
        let dir = TempDir::new().unwrap();
        let env = EnvOverrides::from_pairs([("SHIPINATOR_DB_NAME", "shipinator")]);
        let config = isolated(&dir).with_env(env).resolve().unwrap();

        let mut expected = RuntimeConfig::default();
        expected.db.name = "shipinator".to_string();
        assert_eq!(config, expected);
        assert_eq!(config.kube_config_path, "");
    }

    #[test]
    fn test_empty_file_with_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.yaml", "");

        let env = EnvOverrides::from_pairs([("SHIPINATOR_DB_NAME", "shipinator")]);
        let config = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap();
        assert_eq!(config.db.name, "shipinator");
        assert_eq!(config.listen_addr, ":8080");
        assert_eq!(config.db.host, "localhost");
    }

    #[test]
    fn test_layers_merge_per_key() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "config.yaml",
            "listen_addr: \":9000\"\ndb:\n  host: filehost\n  name: filedb\n",
        );

        let env = EnvOverrides::from_pairs([
            ("SHIPINATOR_DB_PORT", "6432"),
            ("SHIPINATOR_DB_SSL_MODE", "require"),
        ]);
        let config = isolated(&dir).with_env(env).resolve().unwrap();

        // file
        assert_eq!(config.listen_addr, ":9000");
        assert_eq!(config.db.host, "filehost");
        assert_eq!(config.db.name, "filedb");
        // environment
        assert_eq!(config.db.port, "6432");
        assert_eq!(config.db.ssl_mode, "require");
        // defaults
        assert_eq!(config.db.user, "postgres");
        assert_eq!(config.artifact_path, "/var/lib/shipinator/artifacts");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_nested_env_override_without_file_section() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.yml", "log_level: info\n");

        let env = EnvOverrides::from_pairs([
            ("SHIPINATOR_DB_NAME", "app"),
            ("SHIPINATOR_DB_SSL_MODE", "verify-full"),
            ("SHIPINATOR_KUBECONFIG", "/etc/kube/config"),
        ]);
        let config = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap();
        assert_eq!(config.db.ssl_mode, "verify-full");
        assert_eq!(config.kube_config_path, "/etc/kube/config");
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = isolated(&dir).with_file(&missing).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }), "{:?}", err);
    }

    #[test]
    fn test_unreadable_file_is_source_error() {
        let dir = TempDir::new().unwrap();
        let err = isolated(&dir).with_file(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Source { .. }), "{:?}", err);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let cases = [
            "db: [unterminated\n",
            "- a\n- list\n",
            "db: \"not a mapping\"\n",
            "db:\n  port: [5432]\n",
        ];
        for content in cases {
            let dir = TempDir::new().unwrap();
            let path = write_config(&dir, "config.yaml", content);
            let env = EnvOverrides::from_pairs([("SHIPINATOR_DB_NAME", "app")]);
            let err = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)), "{:?}: {:?}", content, err);
        }
    }

    #[test]
    fn test_search_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_config(&second, "config.yaml", "db:\n  name: second\n");

        let loader = ConfigLoader::new()
            .with_search_paths([first.path(), second.path()])
            .with_env(EnvOverrides::default());
        assert_eq!(loader.resolve().unwrap().db.name, "second");

        write_config(&first, "config.yml", "db:\n  name: first\n");
        assert_eq!(loader.locate().unwrap(), Some(first.path().join("config.yml")));
        assert_eq!(loader.resolve().unwrap().db.name, "first");
    }

    #[test]
    fn test_numeric_port_in_file() {
        let config = ConfigLoader::load_from_str("db:\n  name: app\n  port: 5433\n").unwrap();
        assert_eq!(config.db.port, "5433");
    }

    #[test]
    fn test_bad_file_value_not_masked_by_env() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.yaml", "db: \"not a mapping\"\n");

        let env = EnvOverrides::from_pairs([
            ("SHIPINATOR_DB_NAME", "app"),
            ("SHIPINATOR_DB_HOST", "envhost"),
        ]);
        let err = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap_err();
        match err {
            ConfigError::Parse(message) => {
                assert!(message.contains(&path.display().to_string()), "{}", message)
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_scalars_in_text_fields() {
        let config =
            ConfigLoader::load_from_str("db:\n  name: 2024\n  password: 123456\n").unwrap();
        assert_eq!(config.db.name, "2024");
        assert_eq!(config.db.password, "123456");
    }

    #[test]
    fn test_null_leaf_falls_back() {
        let config =
            ConfigLoader::load_from_str("log_level:\ndb:\n  name: app\n  host: ~\n").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.db.host, "localhost");

        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "config.yaml", "db:\nlisten_addr: \":9000\"\n");
        let env = EnvOverrides::from_pairs([("SHIPINATOR_DB_NAME", "app")]);
        let config = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap();
        assert_eq!(config.db.name, "app");
        assert_eq!(config.db.port, "5432");
        assert_eq!(config.listen_addr, ":9000");
    }

    #[test]
    fn test_invalid_log_level_is_validation_error() {
        let err = ConfigLoader::load_from_str("db:\n  name: app\nlog_level: loud\n").unwrap_err();
        match err {
            ConfigError::Validation { field, .. } => assert_eq!(field, "log_level"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config =
            ConfigLoader::load_from_str("db:\n  name: app\n  pool_size: 4\nmetrics: true\n")
                .unwrap();
        assert_eq!(config.db.name, "app");
    }

    #[test]
    fn test_create_example() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        ConfigLoader::create_example(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("listen_addr:"));
        assert!(content.contains("ssl_mode:"));

        let env = EnvOverrides::from_pairs([("SHIPINATOR_DB_NAME", "example")]);
        let config = isolated(&dir).with_file(&path).with_env(env).resolve().unwrap();
        assert_eq!(config.db.name, "example");
        assert_eq!(config.listen_addr, ConfigLoader::defaults_config().listen_addr);
    }

    #[test]
    fn test_process_environment_and_working_directory() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "db:\n  name: fromyaml\n  host: filehost\n")?;
            jail.set_env("SHIPINATOR_DB_NAME", "fromenv");
            jail.set_env("SHIPINATOR_DB_USER", "deployer");

            let config = ConfigLoader::load(None).expect("config should resolve");
            assert_eq!(config.db.name, "fromenv");
            assert_eq!(config.db.user, "deployer");
            assert_eq!(config.db.host, "filehost");

            let err = ConfigLoader::load(Some(Path::new("missing.yaml"))).unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound { .. }));
            Ok(())
        });
    }
}
