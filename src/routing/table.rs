//! Ordered path table mapping request paths to bindings.
//!
//! Entries are evaluated in order; first match wins. More specific entries
//! (such as the movies health check) are listed ahead of the prefixes they
//! would otherwise fall under.

use std::sync::Arc;

use crate::config::{BackendTarget, Config};
use crate::routing::policy::{MigrationPolicy, RandomSource};

/// How a path is matched against a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    /// Only this exact path.
    Exact(String),
    /// This path or anything below it (`/api/users`, `/api/users/7`),
    /// but not siblings sharing the prefix (`/api/usersx`).
    Prefix(String),
}

impl PathMatch {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatch::Exact(p) => path == p,
            PathMatch::Prefix(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            PathMatch::Exact(p) | PathMatch::Prefix(p) => p,
        }
    }
}

/// What happens to a request once its path matched.
#[derive(Debug)]
pub enum Binding {
    /// Answered locally without contacting a backend.
    Liveness,
    /// Always forwarded to one backend.
    Static(BackendTarget),
    /// Split between two backends by a migration policy.
    Migrated(MigrationPolicy),
}

#[derive(Debug)]
pub struct RouteEntry {
    pub path: PathMatch,
    pub binding: Binding,
}

/// Read-only routing table built once at startup.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    fallback: RouteEntry,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>, fallback: BackendTarget) -> Self {
        Self {
            entries,
            fallback: RouteEntry {
                path: PathMatch::Prefix("/".to_string()),
                binding: Binding::Static(fallback),
            },
        }
    }

    /// The strangler-fig layout: users stay on the monolith, events go to the
    /// events service, movies migrate gradually, everything else stays legacy.
    pub fn from_config(config: &Config, random: Arc<dyn RandomSource>) -> Self {
        let backends = &config.backends;
        let movies_policy = MigrationPolicy::new(
            config.migration,
            backends.legacy.clone(),
            backends.movies.clone(),
            random,
        );

        let entries = vec![
            RouteEntry {
                path: PathMatch::Exact("/health".to_string()),
                binding: Binding::Liveness,
            },
            RouteEntry {
                path: PathMatch::Prefix("/api/users".to_string()),
                binding: Binding::Static(backends.legacy.clone()),
            },
            RouteEntry {
                path: PathMatch::Prefix("/api/events".to_string()),
                binding: Binding::Static(backends.events.clone()),
            },
            // Health of the movies service must not depend on the split.
            RouteEntry {
                path: PathMatch::Exact("/api/movies/health".to_string()),
                binding: Binding::Static(backends.movies.clone()),
            },
            RouteEntry {
                path: PathMatch::Prefix("/api/movies".to_string()),
                binding: Binding::Migrated(movies_policy),
            },
            RouteEntry {
                path: PathMatch::Prefix("/api".to_string()),
                binding: Binding::Static(backends.legacy.clone()),
            },
        ];

        Self::new(entries, backends.legacy.clone())
    }

    /// First matching entry, or the legacy fallback.
    pub fn lookup(&self, path: &str) -> &RouteEntry {
        self.entries
            .iter()
            .find(|entry| entry.path.matches(path))
            .unwrap_or(&self.fallback)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }
}
