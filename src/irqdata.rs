//! Flags and small value types shared by the descriptor, chip, and
//! dispatch layers.

use bitflags::bitflags;

bitflags! {
    /// Status bits carried by an [`crate::irqdesc::IrqDesc`].
    ///
    /// `DISABLED` and `depth` move together: `depth == 0` implies
    /// `DISABLED` is clear, and vice versa (see [`crate::irqdesc::IrqDesc::depth`]).
    pub struct IrqStatus: u32 {
        /// Hardware for this virq is masked/shut down; no dispatch occurs.
        const DISABLED    = 1 << 0;
        /// Chip-level mask bit, independent of the disable-depth counter.
        const MASKED      = 1 << 1;
        /// Set for the duration of `generic_handle_irq`; excludes
        /// concurrent dispatch of the same virq.
        const IN_PROGRESS = 1 << 2;
        /// Set while the owning system is suspended.
        const SUSPENDED   = 1 << 3;
    }
}

/// Edge/level sensitivity of a descriptor's hardware line. At most one of
/// these applies at a time, unlike the request-time [`IrqHandleFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerType {
    #[default]
    None,
    EdgeRising,
    EdgeFalling,
    LevelHigh,
    LevelLow,
}

bitflags! {
    /// Flags passed to [`crate::manage::request_irq`].
    pub struct IrqHandleFlags: u32 {
        const TRIGGER_RISING  = 1 << 0;
        const TRIGGER_FALLING = 1 << 1;
        const TRIGGER_HIGH    = 1 << 2;
        const TRIGGER_LOW     = 1 << 3;
        /// This handler is willing to share its virq with others that also
        /// set `SHARED`.
        const SHARED          = 1 << 4;
    }
}

impl IrqHandleFlags {
    const TRIGGER_MASK: IrqHandleFlags = IrqHandleFlags::from_bits_truncate(
        Self::TRIGGER_RISING.bits | Self::TRIGGER_FALLING.bits | Self::TRIGGER_HIGH.bits | Self::TRIGGER_LOW.bits,
    );

    /// The [`TriggerType`] implied by this flag set, if any trigger bit is set.
    pub fn trigger_type(&self) -> Option<TriggerType> {
        if self.contains(IrqHandleFlags::TRIGGER_RISING) {
            Some(TriggerType::EdgeRising)
        } else if self.contains(IrqHandleFlags::TRIGGER_FALLING) {
            Some(TriggerType::EdgeFalling)
        } else if self.contains(IrqHandleFlags::TRIGGER_HIGH) {
            Some(TriggerType::LevelHigh)
        } else if self.contains(IrqHandleFlags::TRIGGER_LOW) {
            Some(TriggerType::LevelLow)
        } else {
            None
        }
    }

    pub fn has_trigger(&self) -> bool {
        self.intersects(Self::TRIGGER_MASK)
    }
}
