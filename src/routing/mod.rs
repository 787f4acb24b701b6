//! Routing decisions: bucketing, migration policy, and the path table.

pub mod bucket;
pub mod policy;
pub mod table;

pub use bucket::bucket;
pub use policy::{
    select, Decision, MigrationPolicy, RandomSource, RouteDecision, SeededRandom, Selector,
};
pub use table::{Binding, PathMatch, RouteEntry, RouteTable};
