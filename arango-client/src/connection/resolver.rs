//! Host selection: load balancing strategies, dead-host tracking and leader affinity.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rand::Rng;

use arango_core::{ArangoError, Result};

use super::{HostEndpoint, HostHandle};
use crate::config::LoadBalancing;

/// A strategy for picking one host out of the currently alive set.
pub trait LoadBalancer: Send + Sync {
    /// Selects a host. Returns `None` if `hosts` is empty.
    fn select<'a>(&self, hosts: &'a [HostEndpoint]) -> Option<&'a HostEndpoint>;
}

impl fmt::Debug for dyn LoadBalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoadBalancer")
    }
}

/// Always picks the first alive host, so traffic fails over in configuration order.
#[derive(Debug, Default)]
pub struct FirstHostLoadBalancer;

impl LoadBalancer for FirstHostLoadBalancer {
    fn select<'a>(&self, hosts: &'a [HostEndpoint]) -> Option<&'a HostEndpoint> {
        hosts.first()
    }
}

/// Cycles through hosts. The counter is modulo the alive count at selection time.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    index: AtomicUsize,
}

impl RoundRobinLoadBalancer {
    pub fn new() -> Self {
        Self {
            index: AtomicUsize::new(0),
        }
    }
}

impl LoadBalancer for RoundRobinLoadBalancer {
    fn select<'a>(&self, hosts: &'a [HostEndpoint]) -> Option<&'a HostEndpoint> {
        if hosts.is_empty() {
            return None;
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % hosts.len();
        Some(&hosts[idx])
    }
}

/// Picks one random host and sticks with it while it stays in the alive set.
#[derive(Debug, Default)]
pub struct OneRandomLoadBalancer {
    chosen: Mutex<Option<HostEndpoint>>,
}

impl OneRandomLoadBalancer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for OneRandomLoadBalancer {
    fn select<'a>(&self, hosts: &'a [HostEndpoint]) -> Option<&'a HostEndpoint> {
        if hosts.is_empty() {
            return None;
        }
        let mut chosen = self.chosen.lock();
        if let Some(current) = chosen.as_ref() {
            if let Some(host) = hosts.iter().find(|h| *h == current) {
                return Some(host);
            }
        }
        let idx = rand::thread_rng().gen_range(0..hosts.len());
        *chosen = Some(hosts[idx].clone());
        Some(&hosts[idx])
    }
}

/// Creates the load balancer for a policy.
pub fn load_balancer_for(policy: LoadBalancing) -> Arc<dyn LoadBalancer> {
    match policy {
        LoadBalancing::None => Arc::new(FirstHostLoadBalancer),
        LoadBalancing::RoundRobin => Arc::new(RoundRobinLoadBalancer::new()),
        LoadBalancing::OneRandom => Arc::new(OneRandomLoadBalancer::new()),
    }
}

/// Hosts marked unhealthy, each until its cool-down expires.
#[derive(Debug)]
pub struct DeadHosts {
    cooldown: Duration,
    marks: Mutex<HashMap<HostEndpoint, Instant>>,
}

impl DeadHosts {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            marks: Mutex::new(HashMap::new()),
        }
    }

    /// Marks `host` dead for the cool-down interval, starting now.
    pub fn mark(&self, host: &HostEndpoint) {
        let until = Instant::now() + self.cooldown;
        self.marks.lock().insert(host.clone(), until);
    }

    /// Returns true while `host`'s mark has not expired. Expired marks are removed.
    pub fn is_dead(&self, host: &HostEndpoint) -> bool {
        let mut marks = self.marks.lock();
        match marks.get(host) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                marks.remove(host);
                false
            }
            None => false,
        }
    }

    /// Returns the hosts of `hosts` that are not marked dead, in order.
    pub fn alive(&self, hosts: &[HostEndpoint]) -> Vec<HostEndpoint> {
        let now = Instant::now();
        let mut marks = self.marks.lock();
        marks.retain(|_, until| *until > now);
        hosts
            .iter()
            .filter(|h| !marks.contains_key(*h))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.marks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.marks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Chooses the host for each dispatch.
///
/// A populated [`HostHandle`] whose host is alive wins. Otherwise non-dirty
/// requests go to the known leader if it is alive, and everything else is
/// left to the load balancer over the alive hosts. When every host is marked
/// dead the marks are cleared and selection is retried once.
#[derive(Debug)]
pub struct HostResolver {
    hosts: RwLock<Vec<HostEndpoint>>,
    leader: Mutex<Option<HostEndpoint>>,
    dead: Arc<DeadHosts>,
    balancer: Arc<dyn LoadBalancer>,
}

impl HostResolver {
    pub fn new(hosts: Vec<HostEndpoint>, policy: LoadBalancing, dead: Arc<DeadHosts>) -> Self {
        Self::with_balancer(hosts, load_balancer_for(policy), dead)
    }

    pub fn with_balancer(
        hosts: Vec<HostEndpoint>,
        balancer: Arc<dyn LoadBalancer>,
        dead: Arc<DeadHosts>,
    ) -> Self {
        Self {
            hosts: RwLock::new(hosts),
            leader: Mutex::new(None),
            dead,
            balancer,
        }
    }

    /// Resolves the host for one dispatch and records it in `handle`.
    pub fn resolve(&self, handle: &HostHandle, dirty_read: bool) -> Result<HostEndpoint> {
        if let Some(host) = handle.get() {
            if !self.dead.is_dead(&host) {
                return Ok(host);
            }
            handle.clear_if(&host);
        }

        let host = match self.pick(dirty_read) {
            Some(host) => host,
            None => {
                tracing::warn!("all hosts marked dead, clearing marks");
                self.dead.clear();
                self.pick(dirty_read).ok_or_else(|| {
                    ArangoError::NoHostAvailable("no hosts configured".to_string())
                })?
            }
        };

        handle.set(host.clone());
        Ok(host)
    }

    fn pick(&self, dirty_read: bool) -> Option<HostEndpoint> {
        let alive = self.dead.alive(&self.hosts.read());

        if !dirty_read {
            if let Some(leader) = self.leader.lock().as_ref() {
                if alive.contains(leader) {
                    return Some(leader.clone());
                }
            }
        }

        self.balancer.select(&alive).cloned()
    }

    /// Marks `host` dead for the cool-down interval.
    pub fn mark_dead(&self, host: &HostEndpoint) {
        tracing::warn!(host = %host, "marking host dead");
        self.dead.mark(host);
        let mut leader = self.leader.lock();
        if leader.as_ref() == Some(host) {
            *leader = None;
        }
    }

    pub fn is_alive(&self, host: &HostEndpoint) -> bool {
        !self.dead.is_dead(host)
    }

    /// Records the leader advertised by a server. Unknown hosts are ignored.
    pub fn set_leader(&self, host: HostEndpoint) -> bool {
        if !self.hosts.read().contains(&host) {
            tracing::debug!(host = %host, "ignoring leader outside the host list");
            return false;
        }
        tracing::info!(host = %host, "leader changed");
        *self.leader.lock() = Some(host);
        true
    }

    pub fn leader(&self) -> Option<HostEndpoint> {
        self.leader.lock().clone()
    }

    pub fn hosts(&self) -> Vec<HostEndpoint> {
        self.hosts.read().clone()
    }

    /// Replaces the host set. An empty list is ignored.
    pub fn set_hosts(&self, hosts: Vec<HostEndpoint>) {
        if hosts.is_empty() {
            return;
        }
        let mut current = self.hosts.write();
        if *current != hosts {
            tracing::info!(count = hosts.len(), "host list updated");
            *current = hosts;
        }
    }
}
