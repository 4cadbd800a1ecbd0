//! Configuration validation utilities

use crate::schema::RuntimeConfig;
use types::ValidationReport;

/// Log levels understood by the service
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Postgres `sslmode` values
pub const SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// Configuration validator, run once every layer has been merged
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &RuntimeConfig) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_required(config, &mut report);
        Self::validate_database(config, &mut report);
        Self::validate_logging(config, &mut report);

        report
    }

    /// First key that must be set but is still empty
    pub fn missing_required(config: &RuntimeConfig) -> Option<&'static str> {
        Self::required(config)
            .into_iter()
            .find(|(_, value)| value.is_empty())
            .map(|(field, _)| field)
    }

    fn required(config: &RuntimeConfig) -> [(&'static str, &str); 1] {
        [("db.name", config.db.name.as_str())]
    }

    fn validate_required(config: &RuntimeConfig, report: &mut ValidationReport) {
        for (field, value) in Self::required(config) {
            if value.is_empty() {
                report.add_error(field, "is required");
            }
        }
    }

    fn validate_database(config: &RuntimeConfig, report: &mut ValidationReport) {
        match config.db.port.parse::<u16>() {
            Ok(0) | Err(_) => {
                report.add_error(
                    "db.port",
                    &format!(
                        "Invalid port: {}. Expected a number between 1 and 65535",
                        config.db.port
                    ),
                );
            }
            Ok(_) => {}
        }

        if !SSL_MODES.contains(&config.db.ssl_mode.as_str()) {
            report.add_error(
                "db.ssl_mode",
                &format!(
                    "Invalid ssl mode: {}. Valid modes: {:?}",
                    config.db.ssl_mode, SSL_MODES
                ),
            );
        }

        if config.db.ssl_mode == "disable" && !is_local_host(&config.db.host) {
            report.add_warning(
                "db.ssl_mode",
                &format!("TLS is disabled for remote database host {}", config.db.host),
            );
        }
    }

    fn validate_logging(config: &RuntimeConfig, report: &mut ValidationReport) {
        let level = config.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            report.add_error(
                "log_level",
                &format!(
                    "Invalid log level: {}. Valid levels: {:?}",
                    config.log_level, LOG_LEVELS
                ),
            );
        }

        if level == "trace" || level == "debug" {
            report.add_warning(
                "log_level",
                "Debug/trace logging may impact performance in production",
            );
        }
    }
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1") || host.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.db.name = "shipinator".to_string();
        config
    }

    #[test]
    fn test_defaults_only_miss_db_name() {
        let report = ConfigValidator::validate(&RuntimeConfig::default());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "db.name");
        assert_eq!(
            ConfigValidator::missing_required(&RuntimeConfig::default()),
            Some("db.name")
        );
    }

    #[test]
    fn test_named_defaults_are_valid() {
        let config = named_config();
        let report = ConfigValidator::validate(&config);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(!report.has_warnings());
        assert_eq!(ConfigValidator::missing_required(&config), None);
    }

    #[test]
    fn test_log_level() {
        let mut config = named_config();
        config.log_level = "WARN".to_string();
        assert!(ConfigValidator::validate(&config).is_valid());

        config.log_level = "verbose".to_string();
        let report = ConfigValidator::validate(&config);
        assert!(report.error_for("log_level").is_some());

        config.log_level = "debug".to_string();
        let report = ConfigValidator::validate(&config);
        assert!(report.is_valid());
        assert!(report.has_warnings());
    }

    #[test]
    fn test_database_port_and_ssl_mode() {
        let mut config = named_config();
        config.db.port = "postgres".to_string();
        config.db.ssl_mode = "sometimes".to_string();

        let report = ConfigValidator::validate(&config);
        assert!(report.error_for("db.port").is_some());
        assert!(report.error_for("db.ssl_mode").is_some());

        config.db.port = "0".to_string();
        config.db.ssl_mode = "verify-full".to_string();
        let report = ConfigValidator::validate(&config);
        assert_eq!(report.errors.len(), 1);
        assert!(report.error_for("db.port").is_some());
    }

    #[test]
    fn test_remote_host_without_tls_warns() {
        let mut config = named_config();
        config.db.host = "db.internal".to_string();

        let report = ConfigValidator::validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].field, "db.ssl_mode");
    }
}
