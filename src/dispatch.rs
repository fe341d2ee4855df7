//! The dispatch path: `generic_handle_irq` and the trap-entry wrapper
//! `irq_domain_handle_irq`. This is what the architecture's exception
//! vector calls once it has a raw hardware interrupt number in hand.

use alloc::sync::Arc;

use crate::irqdata::IrqStatus;
use crate::irqdesc::IrqDesc;
use crate::irqdomain::Domain;
use crate::numbers::{HardwareIrqNumber, IrqNumber};
use crate::registry;

/// Runs the handler chain for `virq`.
///
/// Missing descriptor or a disabled line both count as spurious and are
/// silently dropped — the core never panics on a bad dispatch, only on
/// driver-side protocol violations (see crate error-handling notes).
pub fn generic_handle_irq(virq: IrqNumber) {
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };

    let head = {
        let mut inner = desc.lock();
        if inner.status.contains(IrqStatus::DISABLED) {
            inner.spurious_count += 1;
            return;
        }
        inner.status.insert(IrqStatus::IN_PROGRESS);
        let chip = inner.chip.clone();
        let chip_data = inner.chip_data.clone();
        let hwirq = inner.hwirq;
        drop(inner);
        chip.irq_ack(hwirq, chip_data.as_ref());
        let mut inner = desc.lock();
        inner.count += 1;
        inner.action_chain.clone()
    };

    if head.is_empty() {
        desc.lock().spurious_count += 1;
    } else {
        for action in head.iter() {
            action.handler.handle(&action.dev_data);
        }
    }

    let mut inner = desc.lock();
    inner.status.remove(IrqStatus::IN_PROGRESS);
    let chip = inner.chip.clone();
    let chip_data = inner.chip_data.clone();
    let hwirq = inner.hwirq;
    drop(inner);
    chip.irq_eoi(hwirq, chip_data.as_ref());
}

/// Resolves `hwirq` against `domain` and dispatches the resulting virq.
/// This is the entry point architecture trap code is expected to call;
/// a lookup miss is spurious, exactly as in [`generic_handle_irq`].
pub fn irq_domain_handle_irq(domain: &Arc<Domain>, hwirq: HardwareIrqNumber) {
    let virq = domain.find_mapping(hwirq).unwrap_or(IrqNumber::INVALID);
    if !virq.is_valid() {
        record_domain_spurious(domain);
        return;
    }
    generic_handle_irq(virq);
}

fn record_domain_spurious(_domain: &Arc<Domain>) {
    // No per-domain spurious counter is kept; the per-descriptor one
    // already lives on the virq side and there is nothing to charge
    // this miss against before a mapping exists.
}

/// Looks up the live descriptor for `virq`, if any. Thin wrapper kept
/// here (rather than re-exporting `registry::to_desc` directly) so the
/// dispatch-adjacent introspection surface has one home.
pub fn to_desc(virq: IrqNumber) -> Option<Arc<IrqDesc>> {
    registry::to_desc(virq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irqchip::IrqChip;
    use crate::irqdata::IrqHandleFlags;
    use crate::irqdesc::{DevData, IrqHandler};
    use crate::irqdomain::{self, DomainOps};
    use crate::manage::request_irq;
    use alloc::string::String;
    use core::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct PlainChip;
    impl IrqChip for PlainChip {
        fn name(&self) -> &'static str {
            "plain"
        }
    }

    struct NoopOps;
    impl DomainOps for NoopOps {}

    #[derive(Debug)]
    struct CountingHandler {
        calls: Arc<AtomicU32>,
    }
    impl IrqHandler for CountingHandler {
        fn handle(&self, _dev_data: &DevData) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dispatch_invokes_handler_and_counts() {
        let domain = irqdomain::create_linear(
            String::from("dispatch-test"),
            16,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(3));
        let calls = Arc::new(AtomicU32::new(0));
        let dev_data: DevData = Arc::new(7u32);
        request_irq(
            virq,
            String::from("dev"),
            Arc::new(CountingHandler { calls: calls.clone() }),
            IrqHandleFlags::empty(),
            dev_data,
        )
        .unwrap();

        generic_handle_irq(virq);
        generic_handle_irq(virq);
        generic_handle_irq(virq);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(to_desc(virq).unwrap().count(), 3);
    }

    #[test]
    fn disabled_descriptor_counts_spurious() {
        let domain = irqdomain::create_linear(
            String::from("dispatch-test-2"),
            16,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(4));
        generic_handle_irq(virq);
        assert_eq!(to_desc(virq).unwrap().spurious_count(), 1);
    }

    #[test]
    fn missing_mapping_is_spurious_and_does_not_panic() {
        let domain = irqdomain::create_linear(
            String::from("dispatch-test-3"),
            16,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        irq_domain_handle_irq(&domain, HardwareIrqNumber::new(9));
    }

    #[test]
    fn shared_chain_dispatches_in_registration_order() {
        let domain = irqdomain::create_linear(
            String::from("dispatch-test-4"),
            16,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(5));

        let order: Arc<spin::Mutex<alloc::vec::Vec<u32>>> = Arc::new(spin::Mutex::new(alloc::vec::Vec::new()));

        #[derive(Debug)]
        struct OrderingHandler {
            order: Arc<spin::Mutex<alloc::vec::Vec<u32>>>,
            tag: u32,
        }
        impl IrqHandler for OrderingHandler {
            fn handle(&self, _dev_data: &DevData) {
                self.order.lock().push(self.tag);
            }
        }

        let shared = IrqHandleFlags::SHARED;
        request_irq(
            virq,
            String::from("h1"),
            Arc::new(OrderingHandler { order: order.clone(), tag: 1 }),
            shared,
            Arc::new(1u32),
        )
        .unwrap();
        request_irq(
            virq,
            String::from("h2"),
            Arc::new(OrderingHandler { order: order.clone(), tag: 2 }),
            shared,
            Arc::new(2u32),
        )
        .unwrap();
        let third = request_irq(
            virq,
            String::from("h3"),
            Arc::new(OrderingHandler { order: order.clone(), tag: 3 }),
            IrqHandleFlags::empty(),
            Arc::new(3u32),
        );
        assert!(third.is_err());

        generic_handle_irq(virq);
        assert_eq!(order.lock().as_slice(), &[1u32, 2][..]);
    }
}
