//! Placeholder chip bound to a descriptor before any real chip is attached.
//! Every operation is the trait default (`ENOSYS` for the fallible ones,
//! no-op for `ack`/`eoi`); domains overwrite `desc.chip` with the real one
//! as part of `ops.map`.

use alloc::sync::Arc;

use lazy_static::lazy_static;

use crate::irqchip::IrqChip;

#[derive(Debug)]
struct NoIrqChip;

impl IrqChip for NoIrqChip {
    fn name(&self) -> &'static str {
        "none"
    }
}

lazy_static! {
    static ref NO_IRQ_CHIP: Arc<dyn IrqChip> = Arc::new(NoIrqChip);
}

pub fn no_irq_chip() -> Arc<dyn IrqChip> {
    NO_IRQ_CHIP.clone()
}
