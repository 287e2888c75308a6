//! Built-in scheduling policies for capsim.
//!
//! This crate provides the [`SchedulingPolicy`] trait, the [`QueueOrder`]
//! comparator and the built-in node placement policies:
//!
//! | Policy | Config tag | Node choice |
//! |--------|------------|-------------|
//! | [`FirstFitDecreasing`] | `FFD` | Lowest-id node with room |
//! | [`BestFitDecreasing`] | `BFD` | Node left with the fewest free GPUs |
//!
//! Both see the queue through the same [`QueueOrder`]: priority, optional
//! inference boost, then size descending.

pub mod best_fit;
pub mod first_fit;
pub mod ordering;
pub mod traits;

pub use best_fit::BestFitDecreasing;
pub use first_fit::FirstFitDecreasing;
pub use ordering::QueueOrder;
pub use traits::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of policies selectable from configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    #[default]
    #[serde(rename = "FFD", alias = "ffd", alias = "first_fit_decreasing")]
    FirstFitDecreasing,
    #[serde(rename = "BFD", alias = "bfd", alias = "best_fit_decreasing")]
    BestFitDecreasing,
}

impl PolicyKind {
    /// Instantiate the policy.
    pub fn build(&self) -> Box<dyn SchedulingPolicy> {
        match self {
            PolicyKind::FirstFitDecreasing => Box::new(FirstFitDecreasing::new()),
            PolicyKind::BestFitDecreasing => Box::new(BestFitDecreasing::new()),
        }
    }

    /// Canonical lookup name, matching [`SchedulingPolicy::name`].
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::FirstFitDecreasing => "first_fit_decreasing",
            PolicyKind::BestFitDecreasing => "best_fit_decreasing",
        }
    }

    /// Parse a CLI/config spelling: the short tag or the canonical name,
    /// case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ffd" | "first_fit_decreasing" => Some(PolicyKind::FirstFitDecreasing),
            "bfd" | "best_fit_decreasing" => Some(PolicyKind::BestFitDecreasing),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create a scheduling policy by name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn SchedulingPolicy>> {
    PolicyKind::from_name(name).map(|kind| kind.build())
}

/// List all available built-in policy names.
pub fn available_policies() -> Vec<&'static str> {
    vec![
        PolicyKind::FirstFitDecreasing.name(),
        PolicyKind::BestFitDecreasing.name(),
    ]
}
