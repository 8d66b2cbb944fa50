//! End-to-end storage scenarios.
//!
//! Each test walks one concrete situation a device runs into: filling a slot,
//! hitting capacity, refusing a foreign resource, rolling back a tentative
//! extraction, syncing a single changed slot and topping up matching stacks.

use std::sync::Arc;

use storage_core::{
    Catalog, DeltaSync, ItemHandle, Overlay, ResourceDefinition, ResourceSelector,
    ResourceStorage, SlotSpec, StorageSpec, Transaction, apply_delta, encode_delta,
};

const A: ItemHandle = ItemHandle(0);
const B: ItemHandle = ItemHandle(1);

fn catalog() -> Arc<Catalog<ItemHandle>> {
    Arc::new(
        Catalog::new(vec![
            ResourceDefinition::new("iron_ore"),
            ResourceDefinition::new("copper_ore"),
        ])
        .expect("catalog should be valid"),
    )
}

fn storage(slots: usize) -> ResourceStorage<ItemHandle> {
    ResourceStorage::new(StorageSpec::uniform(slots, SlotSpec::new(64)), catalog())
        .expect("storage spec should be valid")
}

#[test]
fn test_insert_into_empty_slot() {
    let storage = storage(1);
    let slot = storage.slot(0);

    assert_eq!(slot.insert(A, &Overlay::EMPTY, 10), 10);
    assert_eq!(slot.resource(), Some(A));
    assert!(slot.overlay().is_empty());
    assert_eq!(slot.amount(), 10);
}

#[test]
fn test_insert_is_capped_at_capacity() {
    let storage = storage(1);
    let slot = storage.slot(0);
    slot.insert(A, &Overlay::EMPTY, 10);

    assert_eq!(slot.insert(A, &Overlay::EMPTY, 60), 54);
    assert_eq!(slot.amount(), 64);
    assert!(slot.is_full());
}

#[test]
fn test_foreign_resource_is_refused() {
    let storage = storage(1);
    let slot = storage.slot(0);
    slot.insert(A, &Overlay::EMPTY, 10);
    let before = slot.snapshot();

    assert_eq!(slot.insert(B, &Overlay::EMPTY, 5), 0);
    assert_eq!(slot.snapshot(), before);
}

#[test]
fn test_aborted_extraction_restores_slot_and_counter() {
    let storage = storage(1);
    let slot = storage.slot(0);
    slot.insert(A, &Overlay::EMPTY, 10);
    let counter = slot.modifications();

    let mut tx = Transaction::open();
    assert_eq!(slot.extract_tx(ResourceSelector::of(A), 5, Some(&mut tx)), 5);
    assert_eq!(slot.amount(), 5);
    tx.abort();

    assert_eq!(slot.resource(), Some(A));
    assert_eq!(slot.amount(), 10);
    assert_eq!(slot.modifications(), counter);
}

#[test]
fn test_single_changed_slot_delta() {
    let sender = storage(3);
    let receiver = storage(3);
    sender.slot(0).insert(A, &Overlay::EMPTY, 4);
    sender.slot(2).insert(B, &Overlay::EMPTY, 9);
    receiver
        .read_full_payload(&sender)
        .expect("initial full sync should apply");

    let previous = sender.baseline();
    sender.slot(1).insert(A, &Overlay::EMPTY.with("purity", 3i64), 12);
    let payload = encode_delta(&sender, &previous).expect("delta should encode");

    assert_eq!(payload[0], 1, "count");
    assert_eq!(payload[1], 1, "index");

    apply_delta(&receiver, &payload).expect("delta should apply");
    assert_eq!(receiver.snapshot_contents(), sender.snapshot_contents());
}

#[test]
fn test_insert_matching_tops_up_existing_stack_first() {
    let storage = storage(2);
    storage.slot(0).insert(A, &Overlay::EMPTY, 3);

    assert_eq!(storage.insert_matching(A, &Overlay::EMPTY, 70, None), 70);
    assert_eq!(storage.slot(0).amount(), 64);
    assert_eq!(storage.slot(1).amount(), 6);
}

#[test]
fn test_move_between_storages_is_atomic() {
    let input = storage(1);
    let output = storage(1);
    input.slot(0).insert(A, &Overlay::EMPTY, 40);
    output.slot(0).insert(A, &Overlay::EMPTY, 50);

    assert_eq!(input.move_to(&output, A, &Overlay::EMPTY, 30, None), 14);
    assert_eq!(input.slot(0).amount(), 26);
    assert_eq!(output.slot(0).amount(), 64);

    // A move inside an aborted outer scope leaves both sides as they were
    let mut outer = Transaction::open();
    output.slot(0).clear();
    assert_eq!(input.move_to(&output, A, &Overlay::EMPTY, 26, Some(&mut outer)), 26);
    outer.abort();
    assert_eq!(input.slot(0).amount(), 26);
    assert!(output.slot(0).is_empty());
}

/// Test-only helpers kept local to the scenarios.
trait ScenarioExt {
    fn read_full_payload(
        &self,
        source: &ResourceStorage<ItemHandle>,
    ) -> Result<(), storage_core::WireError>;

    fn snapshot_contents(&self) -> Vec<(Option<ItemHandle>, Overlay, u64)>;
}

impl ScenarioExt for ResourceStorage<ItemHandle> {
    fn read_full_payload(
        &self,
        source: &ResourceStorage<ItemHandle>,
    ) -> Result<(), storage_core::WireError> {
        let payload = encode_delta(source, &source.unsent())?;
        apply_delta(self, &payload)
    }

    fn snapshot_contents(&self) -> Vec<(Option<ItemHandle>, Overlay, u64)> {
        self.snapshot()
            .into_iter()
            .map(|state| (state.resource, state.overlay, state.amount))
            .collect()
    }
}
