use core::ops::Add;

/// Stable, system-wide interrupt handle. `0` is reserved as [`IrqNumber::INVALID`].
crate::int_like!(IrqNumber, u32);

impl IrqNumber {
    pub const INVALID: IrqNumber = IrqNumber::new(0);

    pub const fn is_valid(&self) -> bool {
        self.data() != 0
    }
}

impl Add<u32> for IrqNumber {
    type Output = IrqNumber;

    fn add(self, rhs: u32) -> IrqNumber {
        IrqNumber::new(self.data() + rhs)
    }
}

/// Controller-local interrupt identifier. Opaque to everything above the
/// owning domain; only that domain's `ops` give it meaning.
crate::int_like!(HardwareIrqNumber, u32);

impl HardwareIrqNumber {
    /// Placeholder hwirq on a freshly allocated descriptor, before a
    /// domain fills in the real value.
    pub const INVALID: HardwareIrqNumber = HardwareIrqNumber::new(u32::MAX);
}

impl Add<u32> for HardwareIrqNumber {
    type Output = HardwareIrqNumber;

    fn add(self, rhs: u32) -> HardwareIrqNumber {
        HardwareIrqNumber::new(self.data() + rhs)
    }
}
