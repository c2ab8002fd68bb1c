//! Per-request metadata context.
//!
//! A context is a fixed set of named fragments. Each fragment is an
//! immutable map behind an [`ArcSwap`]; writes build a new map and swap
//! the pointer, so a reader holding a fragment keeps a consistent view.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::metadata::MetadataMap;

/// System fragment keys written by the ingress adapter.
pub const LOCAL_NAMESPACE: &str = "LOCAL_NAMESPACE";
pub const LOCAL_SERVICE: &str = "LOCAL_SERVICE";
pub const LOCAL_PATH: &str = "LOCAL_PATH";

/// Load-balancer fragment keys written after instance selection.
pub const LOAD_BALANCER_SERVICE: &str = "service";
pub const LOAD_BALANCER_HOST: &str = "host";
pub const LOAD_BALANCER_PORT: &str = "port";

const FRAGMENT_COUNT: usize = 6;

/// Named fragments of a [`MetadataContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Forwarded to every downstream hop.
    Transitive,
    /// Sent to the next hop only.
    Disposable,
    /// Disposable metadata received from the previous hop. Never forwarded.
    UpstreamDisposable,
    /// Request-local.
    Custom,
    /// Caller namespace, service and path.
    System,
    /// Instance chosen for the current outbound call.
    LoadBalancer,
}

impl Fragment {
    pub const ALL: [Fragment; FRAGMENT_COUNT] = [
        Fragment::Transitive,
        Fragment::Disposable,
        Fragment::UpstreamDisposable,
        Fragment::Custom,
        Fragment::System,
        Fragment::LoadBalancer,
    ];

    fn index(self) -> usize {
        match self {
            Fragment::Transitive => 0,
            Fragment::Disposable => 1,
            Fragment::UpstreamDisposable => 2,
            Fragment::Custom => 3,
            Fragment::System => 4,
            Fragment::LoadBalancer => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Fragment::Transitive => "transitive",
            Fragment::Disposable => "disposable",
            Fragment::UpstreamDisposable => "upstream-disposable",
            Fragment::Custom => "custom",
            Fragment::System => "system",
            Fragment::LoadBalancer => "load-balancer",
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of one in-flight request.
pub struct MetadataContext {
    fragments: [ArcSwap<MetadataMap>; FRAGMENT_COUNT],
}

impl MetadataContext {
    /// Create a context with every fragment empty.
    pub fn new() -> Self {
        Self {
            fragments: std::array::from_fn(|_| ArcSwap::from_pointee(MetadataMap::new())),
        }
    }

    fn slot(&self, fragment: Fragment) -> &ArcSwap<MetadataMap> {
        &self.fragments[fragment.index()]
    }

    /// Current map of a fragment. Empty if never written.
    pub fn get_fragment_context(&self, fragment: Fragment) -> Arc<MetadataMap> {
        self.slot(fragment).load_full()
    }

    /// Replace a fragment wholesale.
    pub fn put_fragment_context(&self, fragment: Fragment, map: impl Into<Arc<MetadataMap>>) {
        self.slot(fragment).store(map.into());
    }

    /// Merge entries into a fragment; new values win on collision.
    pub fn merge_fragment_context<I, K, V>(&self, fragment: Fragment, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if entries.is_empty() {
            return;
        }
        self.slot(fragment).rcu(|current| {
            let mut next = MetadataMap::clone(current);
            next.extend(entries.iter().cloned());
            next
        });
    }

    pub fn get_fragment_value(&self, fragment: Fragment, key: &str) -> Option<String> {
        self.slot(fragment).load().get(key).cloned()
    }

    pub fn put_fragment_value(&self, fragment: Fragment, key: impl Into<String>, value: impl Into<String>) {
        self.merge_fragment_context(fragment, [(key.into(), value.into())]);
    }

    pub fn remove_fragment_value(&self, fragment: Fragment, key: &str) {
        self.slot(fragment).rcu(|current| {
            let mut next = MetadataMap::clone(current);
            next.remove(key);
            next
        });
    }

    /// Merge into the transitive fragment, new values winning.
    pub fn set_transitive_metadata(&self, metadata: MetadataMap) {
        self.merge_fragment_context(Fragment::Transitive, metadata);
    }

    pub fn put_transitive_custom_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_fragment_value(Fragment::Transitive, key, value);
    }

    pub fn put_disposable_custom_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_fragment_value(Fragment::Disposable, key, value);
    }

    pub fn put_custom_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_fragment_value(Fragment::Custom, key, value);
    }

    pub fn put_system_metadata(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put_fragment_value(Fragment::System, key, value);
    }

    pub fn get_all_transitive_custom_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::Transitive)
    }

    pub fn get_transitive_custom_metadata(&self, key: &str) -> Option<String> {
        self.get_fragment_value(Fragment::Transitive, key)
    }

    pub fn get_disposable_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::Disposable)
    }

    pub fn get_upstream_disposable_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::UpstreamDisposable)
    }

    pub fn get_custom_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::Custom)
    }

    pub fn get_system_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::System)
    }

    /// Record the instance chosen for the current outbound call.
    pub fn set_load_balancer_instance(&self, service: &str, host: &str, port: u16) {
        let mut map = MetadataMap::new();
        map.insert(LOAD_BALANCER_SERVICE.to_string(), service.to_string());
        map.insert(LOAD_BALANCER_HOST.to_string(), host.to_string());
        map.insert(LOAD_BALANCER_PORT.to_string(), port.to_string());
        self.put_fragment_context(Fragment::LoadBalancer, map);
    }

    pub fn get_load_balancer_metadata(&self) -> Arc<MetadataMap> {
        self.get_fragment_context(Fragment::LoadBalancer)
    }
}

impl Default for MetadataContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetadataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for fragment in Fragment::ALL {
            map.entry(&fragment.as_str(), &*self.slot(fragment).load());
        }
        map.finish()
    }
}
