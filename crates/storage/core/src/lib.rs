//! In-memory slot storage engine for simulated devices.
//!
//! `storage-core` holds typed resources (items, fluids, energy) in
//! capacity-bounded slots, groups slots into storages, and offers nested
//! [`Transaction`] scopes so composite operations either fully apply or fully
//! roll back. Every committed change bumps a per-slot modification counter,
//! which drives both [`ChangeCache`] invalidation and the delta wire protocol
//! in [`sync`].
//!
//! The engine is single-threaded: handles are `Rc`-shared and must stay on
//! the thread that created them.
pub mod cache;
pub mod config;
pub mod energy;
pub mod error;
pub mod machine;
pub mod overlay;
pub mod resource;
pub mod slot;
pub mod storage;
pub mod sync;
pub mod transaction;
pub mod transfer;
pub mod wire;

pub use cache::ChangeCache;
pub use config::StorageConfig;
pub use energy::{EnergySpec, EnergyStorage};
pub use error::{EngineError, ErrorSeverity};
pub use machine::{MachineRecord, MachineSpec, MachineStorage};
pub use overlay::{Overlay, OverlayValue};
pub use resource::{
    Catalog, CatalogError, FluidHandle, ItemHandle, Resource, ResourceDefinition, ResourceFilter,
    ResourceKind, ResourceOracle, ResourceSelector,
};
pub use slot::{RecordError, ResourceSlot, SlotRecord, SlotSpec, SlotState};
pub use storage::{ResourceStorage, SpecError, StorageRecord, StorageSpec};
pub use sync::{
    DeltaSync, EnumField, SyncBatch, ValueField, apply_delta, apply_delta_tx, encode_delta,
};
pub use transaction::{Participant, Transaction, TransactionResult};
pub use transfer::{ResourceFlow, SlotDisplay, TransferType};
pub use wire::{WireError, WireReader, WireValue, WireWriter};
