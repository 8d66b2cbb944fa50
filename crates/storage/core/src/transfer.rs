//! Slot transfer metadata: who may move resources in and out of a slot.

use bitflags::bitflags;

/// Role a slot plays in its device, governing external and player access.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TransferType {
    /// External: insertion only. Players: insertion and extraction.
    Input,
    /// External: extraction only. Players: extraction only.
    Output,
    /// External and players: insertion and extraction.
    #[default]
    Storage,
    /// External: no access. Players: insertion and extraction (battery slots).
    Transfer,
    /// External and players: insertion and extraction (bucket slots).
    Processing,
}

impl TransferType {
    pub const fn external_insertion(self) -> bool {
        matches!(self, Self::Input | Self::Storage | Self::Processing)
    }

    pub const fn external_extraction(self) -> bool {
        matches!(self, Self::Output | Self::Storage | Self::Processing)
    }

    pub const fn player_insertion(self) -> bool {
        !matches!(self, Self::Output)
    }

    pub const fn player_extraction(self) -> bool {
        true
    }

    /// Directions external automation may move resources through this slot.
    ///
    /// Empty for slots closed to external access.
    pub fn external_flow(self) -> ResourceFlow {
        let mut flow = ResourceFlow::empty();
        flow.set(ResourceFlow::INPUT, self.external_insertion());
        flow.set(ResourceFlow::OUTPUT, self.external_extraction());
        flow
    }

    pub const fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }

    pub const fn is_output(self) -> bool {
        matches!(self, Self::Output)
    }
}

bitflags! {
    /// Direction resources may flow relative to the owning device.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ResourceFlow: u8 {
        const INPUT  = 0b01;
        const OUTPUT = 0b10;
        const BOTH   = Self::INPUT.bits() | Self::OUTPUT.bits();
    }
}

impl ResourceFlow {
    pub fn can_flow_in(self) -> bool {
        self.contains(Self::INPUT)
    }

    pub fn can_flow_out(self) -> bool {
        self.contains(Self::OUTPUT)
    }
}

/// Screen position of a slot in its device panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotDisplay {
    pub x: i32,
    pub y: i32,
}

impl SlotDisplay {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
