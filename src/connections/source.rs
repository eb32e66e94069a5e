use std::collections::BTreeMap;

/// Environment variable holding a JSON object of all connections.
pub const CONNECTIONS_VAR: &str = "MONGODB_CONNECTIONS";
/// Prefix of environment variables each holding the connection of one instance.
pub const NAMED_PREFIX: &str = "MONGODB_URI_";
/// Environment variable holding the connection of the `default` instance.
pub const LEGACY_VAR: &str = "MONGODB_URI";

/// Where connection configuration is read from.
///
/// Empty values are reported as absent.
pub trait ConnectionSource {
    /// Structured blob describing all connections.
    fn connections_blob(&self) -> Option<String>;

    /// Individually named connection entries.
    ///
    /// The keys are the entry names with the [`NAMED_PREFIX`] already stripped,
    /// but not yet normalized.
    fn named_entries(&self) -> BTreeMap<String, String>;

    /// Single connection without an instance name.
    fn legacy_uri(&self) -> Option<String>;
}

/// Reads connections from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

impl ConnectionSource for EnvSource {
    fn connections_blob(&self) -> Option<String> {
        non_empty_var(CONNECTIONS_VAR)
    }

    fn named_entries(&self) -> BTreeMap<String, String> {
        std::env::vars_os()
            .filter_map(|(key, value)| {
                let key = key.into_string().ok()?;
                let name = key.strip_prefix(NAMED_PREFIX)?;
                match value.into_string() {
                    Ok(value) => Some((name.to_string(), value)),
                    Err(_) => {
                        log::warn!(target: "connections", "Ignoring {key}: value is not valid UTF-8");
                        None
                    }
                }
            })
            .collect()
    }

    fn legacy_uri(&self) -> Option<String> {
        non_empty_var(LEGACY_VAR)
    }
}

/// Fixed connection configuration, e.g. assembled by a caller or a test.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub blob: Option<String>,
    pub named: BTreeMap<String, String>,
    pub legacy: Option<String>,
}

impl ConnectionSource for StaticSource {
    fn connections_blob(&self) -> Option<String> {
        self.blob.clone().filter(|blob| !blob.is_empty())
    }

    fn named_entries(&self) -> BTreeMap<String, String> {
        self.named.clone()
    }

    fn legacy_uri(&self) -> Option<String> {
        self.legacy.clone().filter(|uri| !uri.is_empty())
    }
}
