//! Static metadata loaded once at startup.
//!
//! # Responsibilities
//! - Collect `SCT_METADATA_CONTENT_<KEY>` environment entries
//! - Filter configured and environment metadata into transitive/disposable subsets
//! - Merge each pair with environment values taking precedence
//! - Parse the region/zone/campus location triple
//!
//! # Design Decisions
//! - Loading never fails: bad entries are logged and skipped
//! - Results are frozen behind `Arc` so request contexts can share them

use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;

use serde::Serialize;

use crate::config::MetadataConfig;
use crate::metadata::MetadataMap;

pub const ENV_METADATA_PREFIX: &str = "SCT_METADATA_CONTENT_";
pub const ENV_METADATA_CONTENT_TRANSITIVE: &str = "SCT_METADATA_CONTENT_TRANSITIVE";
pub const ENV_METADATA_CONTENT_DISPOSABLE: &str = "SCT_METADATA_CONTENT_DISPOSABLE";
pub const ENV_METADATA_REGION: &str = "SCT_METADATA_REGION";
pub const ENV_METADATA_ZONE: &str = "SCT_METADATA_ZONE";
pub const ENV_METADATA_CAMPUS: &str = "SCT_METADATA_CAMPUS";

pub const LOCATION_KEY_REGION: &str = "region";
pub const LOCATION_KEY_ZONE: &str = "zone";
pub const LOCATION_KEY_CAMPUS: &str = "campus";

/// Region / zone / campus of the local process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub region: Option<String>,
    pub zone: Option<String>,
    pub campus: Option<String>,
}

impl Location {
    fn from_env(env: &HashMap<String, String>) -> Self {
        let read = |name: &str| {
            env.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            region: read(ENV_METADATA_REGION),
            zone: read(ENV_METADATA_ZONE),
            campus: read(ENV_METADATA_CAMPUS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.zone.is_none() && self.campus.is_none()
    }

    /// Present entries keyed by `region`, `zone` and `campus`.
    pub fn to_metadata(&self) -> MetadataMap {
        let mut map = MetadataMap::new();
        for (key, value) in [
            (LOCATION_KEY_REGION, &self.region),
            (LOCATION_KEY_ZONE, &self.zone),
            (LOCATION_KEY_CAMPUS, &self.campus),
        ] {
            if let Some(value) = value {
                map.insert(key.to_string(), value.clone());
            }
        }
        map
    }
}

/// Immutable baseline every request context starts from.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataManager {
    env_metadata: Arc<MetadataMap>,
    env_transitive_metadata: Arc<MetadataMap>,
    env_disposable_metadata: Arc<MetadataMap>,
    config_metadata: Arc<MetadataMap>,
    config_transitive_metadata: Arc<MetadataMap>,
    config_disposable_metadata: Arc<MetadataMap>,
    merged_metadata: Arc<MetadataMap>,
    merged_transitive_metadata: Arc<MetadataMap>,
    merged_disposable_metadata: Arc<MetadataMap>,
    location: Location,
}

impl StaticMetadataManager {
    /// Load from configuration and the process environment.
    pub fn new(config: &MetadataConfig) -> Self {
        Self::from_sources(config, std::env::vars_os())
    }

    /// Load from configuration and an explicit set of environment entries.
    pub fn from_sources<I, K, V>(config: &MetadataConfig, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let env = collect_env(env);

        let env_metadata = parse_env_metadata(&env);
        let env_transitive = select_listed(&env_metadata, env.get(ENV_METADATA_CONTENT_TRANSITIVE));
        let env_disposable = select_listed(&env_metadata, env.get(ENV_METADATA_CONTENT_DISPOSABLE));

        let config_metadata = config.content.clone();
        let config_transitive = select_keys(&config_metadata, &config.transitive);
        let config_disposable = select_keys(&config_metadata, &config.disposable);

        let manager = Self {
            merged_metadata: Arc::new(merge(&config_metadata, &env_metadata)),
            merged_transitive_metadata: Arc::new(merge(&config_transitive, &env_transitive)),
            merged_disposable_metadata: Arc::new(merge(&config_disposable, &env_disposable)),
            env_metadata: Arc::new(env_metadata),
            env_transitive_metadata: Arc::new(env_transitive),
            env_disposable_metadata: Arc::new(env_disposable),
            config_metadata: Arc::new(config_metadata),
            config_transitive_metadata: Arc::new(config_transitive),
            config_disposable_metadata: Arc::new(config_disposable),
            location: Location::from_env(&env),
        };

        tracing::info!(
            merged = ?manager.merged_metadata,
            transitive = ?manager.merged_transitive_metadata,
            disposable = ?manager.merged_disposable_metadata,
            location = ?manager.location,
            "Loaded static metadata"
        );

        manager
    }

    pub fn env_metadata(&self) -> &Arc<MetadataMap> {
        &self.env_metadata
    }

    pub fn env_transitive_metadata(&self) -> &Arc<MetadataMap> {
        &self.env_transitive_metadata
    }

    pub fn env_disposable_metadata(&self) -> &Arc<MetadataMap> {
        &self.env_disposable_metadata
    }

    pub fn config_metadata(&self) -> &Arc<MetadataMap> {
        &self.config_metadata
    }

    pub fn config_transitive_metadata(&self) -> &Arc<MetadataMap> {
        &self.config_transitive_metadata
    }

    pub fn config_disposable_metadata(&self) -> &Arc<MetadataMap> {
        &self.config_disposable_metadata
    }

    /// All static metadata; also the local label set for routing.
    pub fn merged_metadata(&self) -> &Arc<MetadataMap> {
        &self.merged_metadata
    }

    /// Seed of every request's `Transitive` fragment.
    pub fn merged_transitive_metadata(&self) -> &Arc<MetadataMap> {
        &self.merged_transitive_metadata
    }

    /// Seed of every request's `Disposable` fragment.
    pub fn merged_disposable_metadata(&self) -> &Arc<MetadataMap> {
        &self.merged_disposable_metadata
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

fn collect_env<I, K, V>(env: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut out = HashMap::new();
    for (key, value) in env {
        match (key.as_ref().to_str(), value.as_ref().to_str()) {
            (Some(k), Some(v)) => {
                out.insert(k.to_string(), v.to_string());
            }
            (Some(k), None) if k.starts_with(ENV_METADATA_PREFIX) => {
                tracing::warn!(key = %k, "Skipping non UTF-8 metadata environment value");
            }
            _ => {}
        }
    }
    out
}

fn parse_env_metadata(env: &HashMap<String, String>) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in env {
        if key == ENV_METADATA_CONTENT_TRANSITIVE || key == ENV_METADATA_CONTENT_DISPOSABLE {
            continue;
        }
        let Some(source_key) = key.strip_prefix(ENV_METADATA_PREFIX) else {
            continue;
        };
        if source_key.trim().is_empty() || value.trim().is_empty() {
            tracing::debug!(key = %key, "Skipping blank metadata environment entry");
            continue;
        }
        tracing::info!(key = %source_key, value = %value, "Resolved metadata from env");
        metadata.insert(source_key.to_string(), value.clone());
    }
    metadata
}

/// Picks the entries named by a comma-separated list variable.
fn select_listed(metadata: &MetadataMap, list: Option<&String>) -> MetadataMap {
    let Some(list) = list else {
        return MetadataMap::new();
    };
    let keys: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    select_keys(metadata, &keys)
}

fn select_keys(metadata: &MetadataMap, keys: &[String]) -> MetadataMap {
    let mut out = MetadataMap::new();
    for key in keys {
        match metadata.get(key) {
            Some(value) if !value.trim().is_empty() => {
                out.insert(key.clone(), value.clone());
            }
            _ => tracing::warn!(key = %key, "Listed metadata key has no value"),
        }
    }
    out
}

fn merge(config: &MetadataMap, env: &MetadataMap) -> MetadataMap {
    let mut merged = config.clone();
    merged.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
