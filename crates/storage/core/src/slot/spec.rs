use crate::resource::{Resource, ResourceFilter};
use crate::transfer::{ResourceFlow, SlotDisplay, TransferType};

/// Construction-time description of one slot.
#[derive(Clone, Debug)]
pub struct SlotSpec<R: Resource> {
    /// Nominal capacity; per-resource and per-overlay limits may lower it further.
    pub capacity: u64,
    pub transfer: TransferType,
    /// Applied to external insertion only.
    pub filter: ResourceFilter<R>,
    pub display: Option<SlotDisplay>,
}

impl<R: Resource> SlotSpec<R> {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            transfer: TransferType::default(),
            filter: ResourceFilter::Any,
            display: None,
        }
    }

    pub fn with_transfer(mut self, transfer: TransferType) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_filter(mut self, filter: ResourceFilter<R>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_display(mut self, x: i32, y: i32) -> Self {
        self.display = Some(SlotDisplay::new(x, y));
        self
    }

    pub fn external_flow(&self) -> ResourceFlow {
        self.transfer.external_flow()
    }
}
