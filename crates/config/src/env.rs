//! Environment variable overrides
//!
//! Every leaf key is bound explicitly, nested ones included, so an override
//! such as `SHIPINATOR_DB_SSL_MODE` applies even when the config file never
//! mentions `db`. Splitting variable names on `_` cannot work here because
//! keys like `ssl_mode` contain underscores themselves.

use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::collections::{BTreeMap, HashMap};
use types::utils::env_var_name;

/// Prefix shared by every override variable
pub const ENV_PREFIX: &str = "SHIPINATOR_";

/// Every configuration leaf that can be overridden from the environment
pub const ENV_BINDINGS: &[&str] = &[
    "listen_addr",
    "artifact_path",
    "kubeconfig",
    "log_level",
    "db.host",
    "db.port",
    "db.user",
    "db.password",
    "db.name",
    "db.ssl_mode",
];

/// Values picked up for the bound keys, keyed by dotted config path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    values: BTreeMap<String, String>,
}

impl EnvOverrides {
    /// Read the bound variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build overrides from explicit `(VARIABLE, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables count as unset.
        let values = ENV_BINDINGS
            .iter()
            .filter_map(|key| {
                lookup(&env_var_name(ENV_PREFIX, key))
                    .filter(|value| !value.is_empty())
                    .map(|value| (key.to_string(), value))
            })
            .collect();

        Self { values }
    }

    /// Override for a dotted key such as `db.name`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Dotted keys that have an override
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Provider for EnvOverrides {
    fn metadata(&self) -> Metadata {
        Metadata::named("environment variable(s)")
            .interpolater(|_, keys| env_var_name(ENV_PREFIX, &keys.join(".")))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        for (key, value) in &self.values {
            insert_nested(&mut dict, key, value.clone());
        }

        Ok(Map::from([(Profile::Default, dict)]))
    }
}

fn insert_nested(dict: &mut Dict, key: &str, value: String) {
    match key.split_once('.') {
        Some((head, rest)) => {
            let entry = dict
                .entry(head.to_string())
                .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
            if let Value::Dict(_, inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
        None => {
            dict.insert(key.to_string(), Value::String(Tag::Default, value));
        }
    }
}
