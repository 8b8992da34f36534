//! Routing strategies for choosing an engine when the caller names none.
//!
//! Ranking is a pure function of the candidates, the priority order and the
//! performance snapshot. Every strategy breaks ties by priority order, so the
//! same inputs always produce the same ranking.

use crate::tracker::EnginePerformanceStats;
use montage_abstraction::{EngineInfo, EngineKind};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Engine selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// First available engine in priority order.
    #[default]
    Priority,
    /// Free engines first, then paid ones, each in priority order.
    FreeFirst,
    /// Lowest recorded average generation time.
    Fastest,
    /// Lowest declared cost per second.
    Cheapest,
    /// Least recently used.
    LoadBalance,
}

impl RoutingStrategy {
    /// All strategies.
    pub const ALL: [Self; 5] =
        [Self::Priority, Self::FreeFirst, Self::Fastest, Self::Cheapest, Self::LoadBalance];

    /// Configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::FreeFirst => "free_first",
            Self::Fastest => "fastest",
            Self::Cheapest => "cheapest",
            Self::LoadBalance => "load_balance",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|strategy| strategy.as_str() == normalized).ok_or_else(|| {
            format!(
                "{} (valid options: priority, free_first, fastest, cheapest, load_balance)",
                s
            )
        })
    }
}

/// An available engine considered for routing.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Engine identifier.
    pub kind: EngineKind,
    /// The engine's capability description.
    pub info: EngineInfo,
}

/// Position of `kind` in the priority order. Unlisted kinds sort after all
/// listed ones, in declaration order.
fn priority_key(kind: EngineKind, priority: &[EngineKind]) -> (usize, EngineKind) {
    let position = priority.iter().position(|k| *k == kind).unwrap_or(priority.len());
    (position, kind)
}

/// Orders `candidates` from most to least preferred under `strategy`.
///
/// # Arguments
/// * `strategy` - Selection policy
/// * `candidates` - Engines that passed availability checks
/// * `priority` - Configured priority order, used for ties
/// * `stats` - Performance snapshot
pub fn rank(
    strategy: RoutingStrategy,
    candidates: &[Candidate],
    priority: &[EngineKind],
    stats: &HashMap<EngineKind, EnginePerformanceStats>,
) -> Vec<EngineKind> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by_key(|c| priority_key(c.kind, priority));
    ordered.dedup_by_key(|c| c.kind);

    // Stable sorts below keep priority order among equal keys.
    match strategy {
        RoutingStrategy::Priority => {}
        RoutingStrategy::FreeFirst => ordered.sort_by_key(|c| !c.info.is_free),
        RoutingStrategy::Fastest => ordered.sort_by(|a, b| {
            let avg = |kind: EngineKind| {
                stats
                    .get(&kind)
                    .map(|s| s.avg_generation_secs)
                    .filter(|avg| *avg > 0.0)
            };
            match (avg(a.kind), avg(b.kind)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
        RoutingStrategy::Cheapest => {
            ordered.sort_by(|a, b| a.info.cost_per_second.total_cmp(&b.info.cost_per_second));
        }
        RoutingStrategy::LoadBalance => {
            ordered.sort_by_key(|c| stats.get(&c.kind).and_then(|s| s.last_used));
        }
    }

    ordered.into_iter().map(|c| c.kind).collect()
}
