//! Percentage-based gradual migration between a legacy and a new backend.
//!
//! A request either carries a stable identity (the `id` query parameter),
//! in which case it is bucketed deterministically, or it does not, in which
//! case it gets an independent random draw.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{BackendTarget, MigrationConfig};
use crate::routing::bucket::bucket;

/// Which side of a migration handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Legacy,
    New,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Legacy => f.write_str("legacy"),
            Selector::New => f.write_str("new"),
        }
    }
}

/// How a selector is derived for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Bucketed by a stable identity; same identity, same answer.
    Deterministic(&'a str),
    /// No identity available; one independent draw per request.
    Randomized,
}

impl<'a> Decision<'a> {
    /// Blank identities count as absent.
    pub fn from_identity(identity: Option<&'a str>) -> Self {
        match identity.map(str::trim) {
            Some(id) if !id.is_empty() => Decision::Deterministic(id),
            _ => Decision::Randomized,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Decision::Deterministic(_) => "deterministic",
            Decision::Randomized => "randomized",
        }
    }
}

/// Source of per-request rolls for requests without an identity.
///
/// Shared by every worker, so implementations must be safe for concurrent use.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `0..100`.
    fn roll(&self) -> u8;
}

/// OS-seeded generator behind a lock. Seeded once at construction.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Fixed seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SeededRandom {
    fn roll(&self) -> u8 {
        self.rng.lock().random_range(0..100)
    }
}

/// Pure selection for an identity-bearing request.
pub fn select_deterministic(percent: u8, identity: &str) -> Selector {
    if bucket(&format!("id={identity}")) < percent {
        Selector::New
    } else {
        Selector::Legacy
    }
}

/// Select a side of the migration for one request.
///
/// Disabled or 0% always yields legacy, 100% always yields new; anything in
/// between is bucketed by identity or rolled.
pub fn select(config: &MigrationConfig, decision: Decision<'_>, random: &dyn RandomSource) -> Selector {
    if !config.enabled || config.percent == 0 {
        return Selector::Legacy;
    }
    if config.percent >= 100 {
        return Selector::New;
    }

    match decision {
        Decision::Deterministic(identity) => select_deterministic(config.percent, identity),
        Decision::Randomized => {
            if random.roll() < config.percent {
                Selector::New
            } else {
                Selector::Legacy
            }
        }
    }
}

/// A migration policy bound to one path group and its pair of backends.
pub struct MigrationPolicy {
    config: MigrationConfig,
    legacy: BackendTarget,
    new: BackendTarget,
    random: Arc<dyn RandomSource>,
}

/// The outcome of routing one request through a [`MigrationPolicy`].
#[derive(Debug)]
pub struct RouteDecision<'a> {
    pub selector: Selector,
    pub decision: Decision<'a>,
    pub target: &'a BackendTarget,
}

impl MigrationPolicy {
    pub fn new(
        config: MigrationConfig,
        legacy: BackendTarget,
        new: BackendTarget,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            config,
            legacy,
            new,
            random,
        }
    }

    pub fn route<'a>(&'a self, identity: Option<&'a str>) -> RouteDecision<'a> {
        let decision = Decision::from_identity(identity);
        let selector = select(&self.config, decision, self.random.as_ref());
        let target = match selector {
            Selector::Legacy => &self.legacy,
            Selector::New => &self.new,
        };
        RouteDecision {
            selector,
            decision,
            target,
        }
    }
}

impl fmt::Debug for MigrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationPolicy")
            .field("config", &self.config)
            .field("legacy", &self.legacy.name)
            .field("new", &self.new.name)
            .finish()
    }
}
