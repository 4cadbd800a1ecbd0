//! Configuration schema definitions
//!
//! Every leaf is text. YAML numbers and booleans are accepted for any of them
//! and kept in their written form, so `password: 123456` reads as `"123456"`.

use serde::{Deserialize, Deserializer, Serialize};

/// Main runtime configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// HTTP listen address, `:8080` binds every interface
    #[serde(default = "default_listen_addr", deserialize_with = "scalar_string")]
    pub listen_addr: String,
    /// Database configuration
    #[serde(default)]
    pub db: DbConfig,
    /// Directory where build artifacts are stored
    #[serde(default = "default_artifact_path", deserialize_with = "scalar_string")]
    pub artifact_path: String,
    /// Path to the kubeconfig used for deploys
    #[serde(default, rename = "kubeconfig", deserialize_with = "scalar_string")]
    pub kube_config_path: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", deserialize_with = "scalar_string")]
    pub log_level: String,
}

/// Postgres connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_db_host", deserialize_with = "scalar_string")]
    pub host: String,
    #[serde(default = "default_db_port", deserialize_with = "scalar_string")]
    pub port: String,
    #[serde(default = "default_db_user", deserialize_with = "scalar_string")]
    pub user: String,
    #[serde(default = "default_db_password", deserialize_with = "scalar_string")]
    pub password: String,
    /// Database name, no default
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: String,
    /// Postgres sslmode
    #[serde(default = "default_ssl_mode", deserialize_with = "scalar_string")]
    pub ssl_mode: String,
}

// Default value functions
fn default_listen_addr() -> String {
    ":8080".to_string()
}

fn default_artifact_path() -> String {
    "/var/lib/shipinator/artifacts".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> String {
    "5432".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_password() -> String {
    "postgres".to_string()
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

/// Accept any scalar for a text leaf. Mappings, sequences and null are rejected.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Unsigned(number) => number.to_string(),
        Scalar::Signed(number) => number.to_string(),
        Scalar::Float(number) => number.to_string(),
        Scalar::Bool(flag) => flag.to_string(),
    })
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            db: DbConfig::default(),
            artifact_path: default_artifact_path(),
            kube_config_path: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: default_db_password(),
            name: String::new(),
            ssl_mode: default_ssl_mode(),
        }
    }
}
