//! Driver-facing entry points: `request_irq`/`free_irq` and the
//! enable/disable depth counter.

use alloc::string::String;
use alloc::sync::Arc;

use log::warn;
use system_error::SystemError;

use crate::irqdata::{IrqHandleFlags, IrqStatus};
use crate::irqdesc::{DevData, IrqAction, IrqDesc, IrqHandler};
use crate::irqdomain;
use crate::numbers::IrqNumber;
use crate::registry;

/// Masks the line. Falls back to toggling the software `MASKED` bit alone
/// when the chip has no `irq_mask` (no hardware call is substituted).
fn do_mask(desc: &Arc<IrqDesc>) {
    let chip = desc.lock().chip.clone();
    let chip_data = desc.lock().chip_data.clone();
    let hwirq = desc.hwirq();
    if chip.irq_mask(hwirq, chip_data.as_ref()).is_err() {
        // no-op: software bit set below regardless of chip support
    }
    desc.lock().status.insert(IrqStatus::MASKED);
}

fn do_unmask(desc: &Arc<IrqDesc>) {
    let chip = desc.lock().chip.clone();
    let chip_data = desc.lock().chip_data.clone();
    let hwirq = desc.hwirq();
    let _ = chip.irq_unmask(hwirq, chip_data.as_ref());
    desc.lock().status.remove(IrqStatus::MASKED);
}

/// Enables the line. Falls back to `irq_unmask` when the chip has no
/// `irq_enable`.
fn do_enable(desc: &Arc<IrqDesc>) {
    let chip = desc.lock().chip.clone();
    let chip_data = desc.lock().chip_data.clone();
    let hwirq = desc.hwirq();
    if chip.irq_enable(hwirq, chip_data.as_ref()).is_err() {
        do_unmask(desc);
    } else {
        desc.lock().status.remove(IrqStatus::MASKED);
    }
}

/// Disables the line. Falls back to `irq_disable` when the chip has no
/// `irq_disable`.
fn do_disable(desc: &Arc<IrqDesc>) {
    let chip = desc.lock().chip.clone();
    let chip_data = desc.lock().chip_data.clone();
    let hwirq = desc.hwirq();
    if chip.irq_disable(hwirq, chip_data.as_ref()).is_err() {
        do_mask(desc);
    } else {
        desc.lock().status.insert(IrqStatus::MASKED);
    }
}

/// Registers `handler` against `virq`. The first registration on a virq
/// clears `DISABLED` and unmasks the line; later registrations on a shared
/// virq leave hardware state untouched.
pub fn request_irq(
    virq: IrqNumber,
    name: String,
    handler: Arc<dyn IrqHandler>,
    flags: IrqHandleFlags,
    dev_data: DevData,
) -> Result<(), SystemError> {
    let desc = registry::to_desc(virq).ok_or(SystemError::EINVAL)?;

    if flags.has_trigger() {
        let trigger = flags.trigger_type().unwrap();
        let chip = desc.lock().chip.clone();
        let chip_data = desc.lock().chip_data.clone();
        let hwirq = desc.hwirq();
        if chip.irq_set_type(hwirq, chip_data.as_ref(), trigger).is_ok() {
            desc.lock().trigger_type = trigger;
        }
    }

    let action = Arc::new(IrqAction {
        handler,
        flags,
        dev_data,
        name,
    });

    let was_empty = desc.add_action(action, flags)?;
    if was_empty {
        desc.lock().depth = 0;
        desc.lock().status.remove(IrqStatus::DISABLED);
        do_enable(&desc);
    }
    Ok(())
}

/// Removes the registration matching `dev_data` by pointer identity. The
/// last removal re-disables the line.
pub fn free_irq(virq: IrqNumber, dev_data: &DevData) {
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };
    let Some((_removed, now_empty)) = desc.remove_action(dev_data) else {
        warn!("free_irq: no matching action for virq {:?}", virq);
        return;
    };
    if now_empty {
        do_disable(&desc);
        desc.lock().depth = 1;
        desc.lock().status.insert(IrqStatus::DISABLED);
    }
}

/// Increments the disable depth; only the transition from `0` to `1`
/// actually disables the line.
pub fn disable_irq(virq: IrqNumber) {
    disable_irq_nosync(virq);
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };
    while desc.status().contains(IrqStatus::IN_PROGRESS) {
        core::hint::spin_loop();
    }
}

/// Same as [`disable_irq`] but returns immediately without waiting for an
/// in-flight dispatch on another CPU to finish.
pub fn disable_irq_nosync(virq: IrqNumber) {
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };
    let depth = {
        let mut inner = desc.lock();
        inner.depth += 1;
        inner.depth
    };
    if depth == 1 {
        desc.lock().status.insert(IrqStatus::DISABLED);
        do_disable(&desc);
    }
}

/// Decrements the disable depth; only the transition from `1` to `0`
/// actually re-enables the line. Balances exactly one prior `disable_irq`
/// or `disable_irq_nosync` call.
pub fn enable_irq(virq: IrqNumber) {
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };
    let depth = {
        let mut inner = desc.lock();
        if inner.depth == 0 {
            warn!("enable_irq: unbalanced enable on virq {:?}", virq);
            return;
        }
        inner.depth -= 1;
        inner.depth
    };
    if depth == 0 {
        desc.lock().status.remove(IrqStatus::DISABLED);
        do_enable(&desc);
    }
}

/// Activates the domain mapping chain and enables the line in one call;
/// a convenience wrapper most callers want over [`irqdomain::activate_irq`]
/// followed by [`enable_irq`].
pub fn startup_irq(virq: IrqNumber) -> Result<(), SystemError> {
    irqdomain::activate_irq(virq, false)?;
    enable_irq(virq);
    Ok(())
}

pub fn shutdown_irq(virq: IrqNumber) {
    disable_irq(virq);
    irqdomain::deactivate_irq(virq);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irqchip::{IrqChip, IrqChipData};
    use crate::irqdomain::{self, DomainOps};
    use crate::numbers::HardwareIrqNumber;
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct CountingChip {
        masked: AtomicU32,
    }
    impl IrqChip for CountingChip {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn irq_mask(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
            self.masked.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn irq_unmask(&self, _hwirq: HardwareIrqNumber, _data: Option<&Arc<dyn IrqChipData>>) -> Result<(), SystemError> {
            self.masked.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct NoopOps;
    impl DomainOps for NoopOps {}

    #[derive(Debug)]
    struct NoopHandler;
    impl IrqHandler for NoopHandler {
        fn handle(&self, _dev_data: &DevData) {}
    }

    #[test]
    fn request_irq_enables_then_free_disables() {
        let chip = Arc::new(CountingChip {
            masked: AtomicU32::new(0),
        });
        let domain = irqdomain::create_linear(
            String::from("test"),
            4,
            Arc::new(NoopOps),
            chip,
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(1));
        assert!(virq.is_valid());

        let dev_data: DevData = Arc::new(1u32);
        request_irq(
            virq,
            String::from("test-dev"),
            Arc::new(NoopHandler),
            IrqHandleFlags::empty(),
            dev_data.clone(),
        )
        .unwrap();
        assert!(!registry::to_desc(virq).unwrap().status().contains(IrqStatus::DISABLED));

        free_irq(virq, &dev_data);
        assert!(registry::to_desc(virq).unwrap().status().contains(IrqStatus::DISABLED));
    }

    #[test]
    fn disable_enable_depth_is_balanced() {
        let chip = Arc::new(CountingChip {
            masked: AtomicU32::new(0),
        });
        let domain = irqdomain::create_linear(
            String::from("test2"),
            4,
            Arc::new(NoopOps),
            chip,
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(1));
        let dev_data: DevData = Arc::new(2u32);
        request_irq(
            virq,
            String::from("d"),
            Arc::new(NoopHandler),
            IrqHandleFlags::empty(),
            dev_data,
        )
        .unwrap();

        disable_irq_nosync(virq);
        disable_irq_nosync(virq);
        assert_eq!(registry::to_desc(virq).unwrap().depth(), 2);
        enable_irq(virq);
        assert!(registry::to_desc(virq).unwrap().status().contains(IrqStatus::DISABLED));
        enable_irq(virq);
        assert!(!registry::to_desc(virq).unwrap().status().contains(IrqStatus::DISABLED));
    }
}
