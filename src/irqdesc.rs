//! The descriptor table: one [`IrqDesc`] per live virq, and the handler
//! chain each descriptor carries.

use core::any::Any;
use core::fmt::Debug;

use alloc::string::String;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};
use system_error::SystemError;

use crate::dummychip::no_irq_chip;
use crate::irqchip::{IrqChip, IrqChipData};
use crate::irqdata::{IrqStatus, TriggerType};
use crate::irqdomain::Domain;
use crate::numbers::{HardwareIrqNumber, IrqNumber};

/// Opaque cookie identifying one registration. Matched by pointer identity
/// in [`crate::manage::free_irq`], exactly as the driver passed it to
/// `request_irq`.
pub type DevData = Arc<dyn Any + Send + Sync>;

/// A handler registered through `request_irq`.
pub trait IrqHandler: Send + Sync + Debug {
    fn handle(&self, dev_data: &DevData);
}

/// One entry in a descriptor's handler chain.
#[derive(Debug)]
pub struct IrqAction {
    pub handler: Arc<dyn IrqHandler>,
    pub flags: crate::irqdata::IrqHandleFlags,
    pub dev_data: DevData,
    pub name: String,
}

impl IrqAction {
    fn shares_with(&self, other_flags: crate::irqdata::IrqHandleFlags) -> bool {
        self.flags.contains(crate::irqdata::IrqHandleFlags::SHARED)
            && other_flags.contains(crate::irqdata::IrqHandleFlags::SHARED)
    }
}

#[derive(Debug)]
pub(crate) struct InnerIrqDesc {
    pub hwirq: HardwareIrqNumber,
    pub domain: Option<Weak<Domain>>,
    /// Parent descriptor in a hierarchy domain. `None` for linear/tree.
    pub parent_desc: Option<Arc<IrqDesc>>,
    pub chip: Arc<dyn IrqChip>,
    pub chip_data: Option<Arc<dyn IrqChipData>>,
    pub action_chain: Vec<Arc<IrqAction>>,
    pub status: IrqStatus,
    pub depth: u32,
    pub trigger_type: TriggerType,
    /// Target CPU mask. Stored but never consulted: SMP affinity is not
    /// enforced by this core.
    pub cpu_mask: u32,
    pub count: u64,
    pub spurious_count: u64,
    pub last_timestamp: u64,
}

impl InnerIrqDesc {
    fn can_share_with(&self, flags: crate::irqdata::IrqHandleFlags) -> bool {
        match self.action_chain.first() {
            None => true,
            Some(head) => head.shares_with(flags),
        }
    }
}

/// One per allocated virq. Survives for as long as either a domain mapping
/// or a non-empty action chain references it (see invariant 7 in the
/// crate's design notes: a virq is never reused while handlers remain).
#[derive(Debug)]
pub struct IrqDesc {
    irq: IrqNumber,
    inner: Mutex<InnerIrqDesc>,
}

impl IrqDesc {
    /// Freshly allocated descriptor: disabled, masked, `depth = 1`, no chip
    /// bound yet, empty action chain — matches the layout `desc_alloc`
    /// hands back before a domain fills in `hwirq`/`chip`.
    pub(crate) fn new(irq: IrqNumber) -> Arc<Self> {
        Arc::new(IrqDesc {
            irq,
            inner: Mutex::new(InnerIrqDesc {
                hwirq: HardwareIrqNumber::INVALID,
                domain: None,
                parent_desc: None,
                chip: no_irq_chip(),
                chip_data: None,
                action_chain: Vec::new(),
                status: IrqStatus::DISABLED | IrqStatus::MASKED,
                depth: 1,
                trigger_type: TriggerType::None,
                cpu_mask: 0,
                count: 0,
                spurious_count: 0,
                last_timestamp: 0,
            }),
        })
    }

    pub fn irq(&self) -> IrqNumber {
        self.irq
    }

    pub fn hwirq(&self) -> HardwareIrqNumber {
        self.inner.lock().hwirq
    }

    pub fn domain(&self) -> Option<Arc<Domain>> {
        self.inner.lock().domain.as_ref().and_then(Weak::upgrade)
    }

    pub fn parent_desc(&self) -> Option<Arc<IrqDesc>> {
        self.inner.lock().parent_desc.clone()
    }

    pub fn status(&self) -> IrqStatus {
        self.inner.lock().status
    }

    pub fn depth(&self) -> u32 {
        self.inner.lock().depth
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn spurious_count(&self) -> u64 {
        self.inner.lock().spurious_count
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.inner.lock().trigger_type
    }

    pub fn has_handlers(&self) -> bool {
        !self.inner.lock().action_chain.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.inner.lock().action_chain.len()
    }

    pub(crate) fn lock(&self) -> MutexGuard<InnerIrqDesc> {
        self.inner.lock()
    }

    pub(crate) fn set_hwirq(&self, hwirq: HardwareIrqNumber) {
        self.inner.lock().hwirq = hwirq;
    }

    pub(crate) fn set_domain(&self, domain: &Arc<Domain>) {
        self.inner.lock().domain = Some(Arc::downgrade(domain));
    }

    pub(crate) fn set_chip(&self, chip: Arc<dyn IrqChip>, chip_data: Option<Arc<dyn IrqChipData>>) {
        let mut inner = self.inner.lock();
        inner.chip = chip;
        inner.chip_data = chip_data;
    }

    pub(crate) fn set_parent_desc(&self, parent: Option<Arc<IrqDesc>>) {
        self.inner.lock().parent_desc = parent;
    }

    /// Appends a new action, or rejects if sharing discipline is violated.
    /// Returns whether the chain was empty before this call (callers use
    /// this to decide whether to clear `DISABLED` and unmask).
    pub(crate) fn add_action(
        &self,
        action: Arc<IrqAction>,
        flags: crate::irqdata::IrqHandleFlags,
    ) -> Result<bool, SystemError> {
        let mut inner = self.inner.lock();
        if !inner.can_share_with(flags) {
            return Err(SystemError::EBUSY);
        }
        let was_empty = inner.action_chain.is_empty();
        inner.action_chain.push(action);
        Ok(was_empty)
    }

    /// Removes the first action whose `dev_data` matches by pointer
    /// identity. Returns the removed action and whether the chain is now
    /// empty.
    pub(crate) fn remove_action(&self, dev_data: &DevData) -> Option<(Arc<IrqAction>, bool)> {
        let mut inner = self.inner.lock();
        let idx = inner
            .action_chain
            .iter()
            .position(|a| Arc::ptr_eq(&a.dev_data, dev_data))?;
        let removed = inner.action_chain.remove(idx);
        Some((removed, inner.action_chain.is_empty()))
    }
}

/// Process-wide `virq -> descriptor` table. `O(1)` lookup by construction:
/// a flat array sized to `MAX_IRQ_DESC`.
pub(crate) struct IrqDescTable {
    descs: Mutex<Vec<Option<Arc<IrqDesc>>>>,
}

/// Highest virq this table indexes, plus one. Matches [`crate::virq_alloc::MAX_VIRQ`]
/// via `virq_alloc`; kept separate here since the two concerns (virq identity vs.
/// descriptor storage) are independently replaceable.
pub const MAX_IRQ_DESC: usize = 1024;

impl IrqDescTable {
    pub(crate) fn new() -> Self {
        let mut descs = Vec::with_capacity(MAX_IRQ_DESC);
        descs.resize_with(MAX_IRQ_DESC, || None);
        IrqDescTable {
            descs: Mutex::new(descs),
        }
    }

    /// `O(1)` lookup; `None` if `virq` has no live descriptor.
    pub(crate) fn to_desc(&self, virq: IrqNumber) -> Option<Arc<IrqDesc>> {
        let idx = virq.data() as usize;
        if idx >= MAX_IRQ_DESC {
            return None;
        }
        self.descs.lock()[idx].clone()
    }

    /// Idempotent: returns the existing descriptor if `virq` already has
    /// one, otherwise allocates and installs a fresh one.
    pub(crate) fn desc_alloc(&self, virq: IrqNumber) -> Option<Arc<IrqDesc>> {
        let idx = virq.data() as usize;
        if idx >= MAX_IRQ_DESC {
            return None;
        }
        let mut descs = self.descs.lock();
        if let Some(existing) = &descs[idx] {
            return Some(existing.clone());
        }
        let desc = IrqDesc::new(virq);
        descs[idx] = Some(desc.clone());
        Some(desc)
    }

    /// Fatal if the descriptor still carries handlers: freeing it would
    /// silently orphan a registered driver, which is a programming error
    /// rather than a recoverable condition (see crate error-handling
    /// policy).
    pub(crate) fn desc_free(&self, virq: IrqNumber) {
        let idx = virq.data() as usize;
        if idx >= MAX_IRQ_DESC {
            return;
        }
        let mut descs = self.descs.lock();
        if let Some(desc) = &descs[idx] {
            assert!(
                !desc.has_handlers(),
                "freeing irq descriptor {:?} with active handlers",
                virq
            );
        }
        descs[idx] = None;
    }
}

/// Directly rebinds a descriptor's `hwirq` and `chip`/`chip_data`,
/// bypassing the owning domain's mapping storage. Intended for the rare
/// manual-binding path (e.g. a legacy fixed IRQ wired up before any
/// domain exists) rather than ordinary driver use, which should go
/// through [`crate::irqdomain::create_mapping`] instead.
pub fn set_hwirq_and_chip(
    desc: &Arc<IrqDesc>,
    hwirq: HardwareIrqNumber,
    chip: Arc<dyn IrqChip>,
    chip_data: Option<Arc<dyn IrqChipData>>,
) {
    desc.set_hwirq(hwirq);
    desc.set_chip(chip, chip_data);
}
