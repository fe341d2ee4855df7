//! Controller-facing vtable. Concrete drivers (GIC, PLIC, MSI-X chips — all
//! out of scope here) implement [`IrqChip`] and are handed to a domain at
//! creation time.

use alloc::sync::Arc;
use core::any::Any;
use core::fmt::Debug;

use system_error::SystemError;

use crate::irqdata::TriggerType;
use crate::numbers::HardwareIrqNumber;

/// Opaque per-instance data a chip attaches to one hwirq. Stored on the
/// descriptor as `chip_data` and handed back on every chip call.
pub trait IrqChipData: Any + Send + Sync + Debug {}

/// Controller primitive operations. Every method is optional; the core
/// substitutes the defaults documented on each when a chip omits it (see
/// [`crate::manage`] and [`crate::dispatch`] for where the defaults are
/// actually applied).
pub trait IrqChip: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Masks the line. When unimplemented, the core only flips the
    /// descriptor's software `MASKED` bit — it does not fall back to
    /// `irq_disable` (that substitution only runs the other direction,
    /// see `irq_disable` below).
    fn irq_mask(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }

    /// Unmasks the line. Same software-only fallback as `irq_mask`.
    fn irq_unmask(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }

    /// Enables the interrupt. The core falls back to `irq_unmask` when
    /// this is unimplemented.
    fn irq_enable(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }

    /// Disables the interrupt. The core falls back to `irq_mask` when
    /// this is unimplemented.
    fn irq_disable(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }

    /// Start-of-interrupt acknowledgement. No-op default.
    fn irq_ack(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) {}

    /// End-of-interrupt. No-op default.
    fn irq_eoi(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) {}

    fn irq_set_type(
        &self,
        _hwirq: HardwareIrqNumber,
        _data: Option<&Arc<dyn IrqChipData>>,
        _trigger: TriggerType,
    ) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }

    /// SMP affinity is not enforced by the core (see crate docs); a chip
    /// may still record the request.
    fn irq_set_affinity(
        &self,
        _hwirq: HardwareIrqNumber,
        _data: Option<&Arc<dyn IrqChipData>>,
        _cpu: u32,
    ) -> Result<(), SystemError> {
        Err(SystemError::ENOSYS)
    }
}
