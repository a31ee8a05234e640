//! GPU occupancy collection: device-process discovery, user resolution,
//! and per-cycle aggregation into a device → users mapping.

pub mod device;
pub mod tool;
pub mod user;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// One observed (GPU identifier, OS process id) association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProcessPair {
    pub device_id: String,
    pub process_id: String,
}

/// Final output of one collection cycle: device → set of user names.
pub type DeviceUserSet = HashMap<String, HashSet<String>>;

/// Lists the (device, pid) pairs currently running compute workloads.
#[async_trait]
pub trait DeviceProcessSource: Send + Sync {
    /// Degrades to an empty list on tool failure; never a hard error.
    async fn list_device_processes(&self) -> Vec<DeviceProcessPair>;
}

/// Resolves a process id to its owning user account.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// `None` when the owner cannot be determined (process gone,
    /// permission denied, tool failure).
    async fn resolve_user(&self, process_id: &str) -> Option<String>;
}

/// Runs one collection cycle: discovery, deduplicated concurrent user
/// resolution, then re-association of users with their devices.
///
/// Everything the cycle builds is scoped to the `collect` call; nothing
/// carries over between cycles.
pub struct Aggregator<S, R> {
    source: S,
    resolver: Arc<R>,
}

impl<S, R> Aggregator<S, R>
where
    S: DeviceProcessSource,
    R: UserResolver + 'static,
{
    pub fn new(source: S, resolver: R) -> Self {
        Self {
            source,
            resolver: Arc::new(resolver),
        }
    }

    pub async fn collect(&self) -> DeviceUserSet {
        let pairs = self.source.list_device_processes().await;
        if pairs.is_empty() {
            return DeviceUserSet::new();
        }

        // A pid may appear once per device it touches; resolve it only once.
        let unique: HashSet<&str> = pairs.iter().map(|p| p.process_id.as_str()).collect();

        let mut tasks = JoinSet::new();
        for pid in unique {
            let resolver = Arc::clone(&self.resolver);
            let pid = pid.to_string();
            tasks.spawn(async move {
                let user = resolver.resolve_user(&pid).await;
                (pid, user)
            });
        }

        // Barrier: nothing is emitted until the slowest resolution returns.
        // Failed resolutions leave no entry, not an empty sentinel.
        let mut users: HashMap<String, String> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pid, Some(user))) => {
                    users.insert(pid, user);
                }
                Ok((_, None)) => {}
                Err(err) => warn!("user resolution task failed: {err}"),
            }
        }

        // Re-walk the original pairs to restore the device association the
        // dedup step discarded; a shared pid credits every device it ran on.
        let mut out = DeviceUserSet::new();
        for pair in &pairs {
            if let Some(user) = users.get(&pair.process_id) {
                out.entry(pair.device_id.clone())
                    .or_default()
                    .insert(user.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource(Vec<DeviceProcessPair>);

    #[async_trait]
    impl DeviceProcessSource for StaticSource {
        async fn list_device_processes(&self) -> Vec<DeviceProcessPair> {
            self.0.clone()
        }
    }

    /// Answers from a fixed table, counting every lookup.
    struct TableResolver {
        answers: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl TableResolver {
        fn new(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(pid, user)| (pid.to_string(), user.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UserResolver for TableResolver {
        async fn resolve_user(&self, process_id: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(process_id).cloned()
        }
    }

    fn pair(device: &str, pid: &str) -> DeviceProcessPair {
        DeviceProcessPair {
            device_id: device.to_string(),
            process_id: pid.to_string(),
        }
    }

    fn users(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn shared_pid_credits_every_device() {
        let source = StaticSource(vec![
            pair("GPU-1", "100"),
            pair("GPU-1", "101"),
            pair("GPU-2", "100"),
        ]);
        let aggregator = Aggregator::new(source, TableResolver::new(&[("100", "alice")]));

        let out = aggregator.collect().await;

        assert_eq!(out.len(), 2);
        assert_eq!(out["GPU-1"], users(&["alice"]));
        assert_eq!(out["GPU-2"], users(&["alice"]));
    }

    #[tokio::test]
    async fn resolver_runs_once_per_unique_pid() {
        let source = StaticSource(vec![
            pair("GPU-1", "100"),
            pair("GPU-2", "100"),
            pair("GPU-3", "100"),
            pair("GPU-3", "200"),
        ]);
        let aggregator =
            Aggregator::new(source, TableResolver::new(&[("100", "alice"), ("200", "bob")]));

        aggregator.collect().await;

        assert_eq!(aggregator.resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_discovery_issues_no_resolver_calls() {
        let aggregator = Aggregator::new(StaticSource(Vec::new()), TableResolver::new(&[]));

        let out = aggregator.collect().await;

        assert!(out.is_empty());
        assert_eq!(aggregator.resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_users() {
        // 101 never resolves; 100 does. Same device.
        let source = StaticSource(vec![pair("GPU-1", "100"), pair("GPU-1", "101")]);
        let aggregator = Aggregator::new(source, TableResolver::new(&[("100", "alice")]));

        let out = aggregator.collect().await;

        assert_eq!(out["GPU-1"], users(&["alice"]));
    }

    #[tokio::test]
    async fn device_with_only_failed_pids_is_absent() {
        let source = StaticSource(vec![pair("GPU-1", "100"), pair("GPU-2", "999")]);
        let aggregator = Aggregator::new(source, TableResolver::new(&[("100", "alice")]));

        let out = aggregator.collect().await;

        assert_eq!(out.len(), 1);
        assert!(out.contains_key("GPU-1"));
        assert!(!out.contains_key("GPU-2"));
    }

    #[tokio::test]
    async fn duplicate_users_on_a_device_collapse() {
        // Two processes, one owner.
        let source = StaticSource(vec![pair("GPU-1", "100"), pair("GPU-1", "200")]);
        let aggregator =
            Aggregator::new(source, TableResolver::new(&[("100", "alice"), ("200", "alice")]));

        let out = aggregator.collect().await;

        assert_eq!(out["GPU-1"], users(&["alice"]));
    }

    #[tokio::test]
    async fn set_content_is_deterministic() {
        let raw = vec![
            pair("GPU-1", "100"),
            pair("GPU-2", "200"),
            pair("GPU-2", "300"),
        ];
        let table: &[(&str, &str)] = &[("100", "alice"), ("200", "bob"), ("300", "carol")];

        let first = Aggregator::new(StaticSource(raw.clone()), TableResolver::new(table))
            .collect()
            .await;
        let second = Aggregator::new(StaticSource(raw), TableResolver::new(table))
            .collect()
            .await;

        assert_eq!(first, second);
    }
}
