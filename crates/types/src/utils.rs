//! Utility functions and helpers

/// Map a dotted configuration key to its environment variable name.
///
/// Dots and dashes become underscores and the result is uppercased behind
/// `prefix`, so `db.ssl_mode` with prefix `SHIPINATOR_` becomes
/// `SHIPINATOR_DB_SSL_MODE`.
pub fn env_var_name(prefix: &str, key: &str) -> String {
    let normalized: String = key
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("{}{}", prefix, normalized)
}

/// Mask a secret for logging, keeping only whether it is set
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "********"
    }
}

/// Plural suffix for counts in log and CLI messages
pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
