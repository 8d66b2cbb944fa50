//! Scenario files: scripted storage operations replayed by `storage-cli replay`.
//!
//! ```ron
//! (
//!     machine: "furnace",
//!     steps: [
//!         Insert(target: Items, resource: "coal", amount: 16),
//!         Scope(commit: false, steps: [InsertEnergy(500)]),
//!         Sync,
//!     ],
//! )
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use storage_core::Overlay;

/// Which resource storage of the machine a step addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Items,
    Fluids,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Insert into the storage; `matching` tops up existing stacks first.
    Insert {
        target: Target,
        resource: String,
        amount: u64,
        #[serde(default)]
        overlay: Overlay,
        #[serde(default)]
        matching: bool,
    },
    /// Extract `amount` of `resource` (any resource when omitted).
    Extract {
        target: Target,
        #[serde(default)]
        resource: Option<String>,
        amount: u64,
    },
    /// Consume from one item slot, leaving the remainder behind.
    Consume { slot: usize, amount: u64 },
    /// Move between two slot groups of the same storage.
    Move {
        target: Target,
        from: Vec<usize>,
        to: Vec<usize>,
        resource: String,
        #[serde(default)]
        overlay: Overlay,
        amount: u64,
    },
    InsertEnergy(u64),
    ExtractEnergy(u64),
    /// Run `steps` in a nested transaction, then commit or abort it.
    Scope { commit: bool, steps: Vec<Step> },
    /// Encode pending changes and apply them to the mirror.
    Sync,
}

impl Step {
    /// Resource storage the step operates on, if any.
    pub fn target(&self) -> Option<Target> {
        match self {
            Self::Insert { target, .. }
            | Self::Extract { target, .. }
            | Self::Move { target, .. } => Some(*target),
            Self::Consume { .. } => Some(Target::Items),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Layout name under `machines/`.
    pub machine: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse scenario RON: {}", e))
    }
}
