// Property-based tests for the delta wire protocol
//
// 1. A delta from any acknowledged state reproduces the sender's state
// 2. When every slot changed, the delta is byte-identical to count + full form
// 3. A sync batch keeps a mirror identical across rounds of random changes

use std::sync::Arc;

use proptest::prelude::*;
use storage_core::{
    Catalog, DeltaSync, EnumField, ItemHandle, Overlay, ResourceDefinition, ResourceStorage,
    SlotSpec, StorageSpec, SyncBatch, TransferType, ValueField, WireWriter, apply_delta,
    encode_delta,
};

const SLOTS: usize = 5;

fn storage() -> ResourceStorage<ItemHandle> {
    let catalog = Catalog::new(vec![
        ResourceDefinition::new("sand"),
        ResourceDefinition::new("glass"),
        ResourceDefinition::new("lens").with_max_amount(8),
    ])
    .unwrap();
    ResourceStorage::new(StorageSpec::uniform(SLOTS, SlotSpec::new(64)), Arc::new(catalog)).unwrap()
}

/// `(slot, resource, tint, amount)`; amount `0` clears the slot.
type Write = (usize, u32, Option<i64>, u64);

fn write_strategy() -> impl Strategy<Value = Write> {
    (0..SLOTS, 0u32..3, prop::option::of(-2i64..3), 0u64..=64)
}

fn apply_writes(storage: &ResourceStorage<ItemHandle>, writes: &[Write]) {
    for &(index, resource, tint, amount) in writes {
        let slot = storage.slot(index);
        let overlay = tint.map_or(Overlay::EMPTY, |tint| Overlay::EMPTY.with("tint", tint));
        let amount = amount.min(slot.capacity_for(ItemHandle(resource), &overlay));
        if amount == 0 {
            slot.clear();
        } else {
            slot.set(Some(ItemHandle(resource)), overlay, amount);
        }
    }
}

fn contents(storage: &ResourceStorage<ItemHandle>) -> Vec<(Option<ItemHandle>, Overlay, u64)> {
    storage
        .snapshot()
        .into_iter()
        .map(|state| (state.resource, state.overlay, state.amount))
        .collect()
}

proptest! {
    #[test]
    fn delta_reproduces_sender_state(
        initial in prop::collection::vec(write_strategy(), 0..10),
        changes in prop::collection::vec(write_strategy(), 0..10),
    ) {
        let sender = storage();
        let receiver = storage();
        apply_writes(&sender, &initial);
        apply_delta(&receiver, &encode_delta(&sender, &sender.unsent()).unwrap()).unwrap();
        prop_assert_eq!(contents(&receiver), contents(&sender));

        let previous = sender.baseline();
        apply_writes(&sender, &changes);
        let payload = encode_delta(&sender, &previous).unwrap();
        apply_delta(&receiver, &payload).unwrap();

        prop_assert_eq!(contents(&receiver), contents(&sender));
        prop_assert_eq!(receiver.digest().unwrap(), sender.digest().unwrap());
    }

    #[test]
    fn all_changed_delta_equals_full_form(
        writes in prop::collection::vec(write_strategy(), 0..10),
    ) {
        let sender = storage();
        apply_writes(&sender, &writes);
        let previous = sender.baseline();
        for slot in sender.iter() {
            slot.clear();
        }
        apply_writes(&sender, &writes);

        let mut full = WireWriter::new();
        full.write_varint(SLOTS as u64);
        sender.write_full(&mut full).unwrap();
        prop_assert_eq!(encode_delta(&sender, &previous).unwrap(), full.into_bytes());
    }

    #[test]
    fn batch_keeps_mirror_in_step(
        rounds in prop::collection::vec(
            (
                prop::collection::vec(write_strategy(), 0..4),
                any::<u16>(),
                prop::option::of(0usize..5),
            ),
            1..6,
        ),
    ) {
        let sender = storage();
        let receiver = storage();
        let progress = ValueField::new(0u16);
        let mirror_progress = ValueField::new(0u16);
        let mode = EnumField::<TransferType>::new(None);
        let mirror_mode = EnumField::<TransferType>::new(None);

        let mut outgoing = SyncBatch::new();
        outgoing.register(sender.clone());
        outgoing.register(progress.clone());
        outgoing.register(mode.clone());
        let mut incoming = SyncBatch::new();
        incoming.register(receiver.clone());
        incoming.register(mirror_progress.clone());
        incoming.register(mirror_mode.clone());

        for (writes, value, ordinal) in rounds {
            apply_writes(&sender, &writes);
            progress.set(value);
            mode.set(ordinal.and_then(|ordinal| {
                use strum::IntoEnumIterator;
                TransferType::iter().nth(ordinal)
            }));

            if let Some(payload) = outgoing.encode().unwrap() {
                incoming.decode(&payload).unwrap();
            }
            prop_assert_eq!(contents(&receiver), contents(&sender));
            prop_assert_eq!(mirror_progress.get(), progress.get());
            prop_assert_eq!(mirror_mode.get(), mode.get());
            prop_assert!(!outgoing.has_changes());
        }
    }
}
