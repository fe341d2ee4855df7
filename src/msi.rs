//! Per-device MSI descriptor layer: local vector indices backed by a
//! device bitmap, routed through a designated tree domain for global
//! `hwirq`/`virq` allocation.
//!
//! A device's local indices (`0..nvec`) are not `hwirq`s — they only
//! identify one of this device's vectors among its own siblings. Each
//! index is bound to a distinct, contiguous `hwirq` reserved in the MSI
//! domain the device was initialized against.

use core::fmt::Debug;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;
use bitmap::traits::BitMapOps;
use bitmap::AllocBitmap;
use spin::Mutex;
use system_error::SystemError;

use crate::irqdomain::{self, Domain};
use crate::manage;
use crate::numbers::{HardwareIrqNumber, IrqNumber};

bitflags! {
    pub struct MsiAllocFlags: u32 {
        /// Request `min_vecs` rather than `max_vecs` when the controller
        /// cannot satisfy the larger count.
        const USE_DEF_NUM_VECS = 1 << 0;
        /// Device supports more than one simultaneously armed vector;
        /// absent, the allocation is clamped to a single vector.
        const MULTI_VECTOR     = 1 << 1;
    }
}

/// Address/data pair written to hardware to arm one MSI vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsiMsg {
    pub address_lo: u32,
    pub address_hi: u32,
    pub data: u32,
}

impl MsiMsg {
    pub const fn new(address: u64, data: u32) -> Self {
        MsiMsg {
            address_lo: address as u32,
            address_hi: (address >> 32) as u32,
            data,
        }
    }

    pub const fn address(&self) -> u64 {
        ((self.address_hi as u64) << 32) | self.address_lo as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsiState {
    Unbound,
    Allocated,
    Armed,
    Masked,
    Unmasked,
}

#[derive(Debug)]
struct InnerMsiDesc {
    hwirq: HardwareIrqNumber,
    virq: IrqNumber,
    msg: MsiMsg,
    state: MsiState,
    refcount: u32,
}

/// One entry in a device's MSI descriptor list: a single allocated and
/// (eventually) armed vector.
#[derive(Debug)]
pub struct MsiDesc {
    index: u32,
    inner: Mutex<InnerMsiDesc>,
}

impl MsiDesc {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn hwirq(&self) -> HardwareIrqNumber {
        self.inner.lock().hwirq
    }

    pub fn virq(&self) -> IrqNumber {
        self.inner.lock().virq
    }

    pub fn state(&self) -> MsiState {
        self.inner.lock().state
    }

    pub fn msg(&self) -> MsiMsg {
        self.inner.lock().msg
    }

    pub fn compose_msg(&self, msg: MsiMsg) {
        let mut inner = self.inner.lock();
        inner.msg = msg;
        inner.state = MsiState::Armed;
    }

    /// Writes the already-composed message out and marks the vector
    /// unmasked. Actually poking hardware is a chip/controller concern
    /// (out of scope here); this only advances the descriptor's state.
    pub fn write_msg(&self) {
        let mut inner = self.inner.lock();
        if inner.state == MsiState::Armed || inner.state == MsiState::Masked {
            inner.state = MsiState::Unmasked;
        }
    }

    pub fn incref(&self) {
        self.inner.lock().refcount += 1;
    }

    pub fn decref(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.refcount = inner.refcount.saturating_sub(1);
        inner.refcount
    }
}

struct InnerMsiDeviceData {
    domain: Arc<Domain>,
    descs: Vec<Arc<MsiDesc>>,
    used: AllocBitmap,
    max_vecs: u32,
    hwirq_base: Option<u32>,
}

/// Per-device MSI state, attached once via [`msi_device_init`].
pub struct MsiDeviceData {
    name: String,
    inner: Mutex<InnerMsiDeviceData>,
}

impl Debug for MsiDeviceData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MsiDeviceData").field("name", &self.name).finish()
    }
}

/// Attaches a fresh, empty MSI record to a device. `max_vecs` bounds how
/// many local indices this device may ever hold at once; `domain` is the
/// tree domain `hwirq`s are reserved from.
pub fn msi_device_init(name: String, domain: Arc<Domain>, max_vecs: u32) -> Arc<MsiDeviceData> {
    Arc::new(MsiDeviceData {
        name,
        inner: Mutex::new(InnerMsiDeviceData {
            domain,
            descs: Vec::new(),
            used: AllocBitmap::new(max_vecs as usize),
            max_vecs,
            hwirq_base: None,
        }),
    })
}

impl MsiDeviceData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> Vec<Arc<MsiDesc>> {
        self.inner.lock().descs.clone()
    }

    pub fn descriptor(&self, index: u32) -> Option<Arc<MsiDesc>> {
        self.inner
            .lock()
            .descs
            .iter()
            .find(|d| d.index == index)
            .cloned()
    }
}

/// Allocates `nvec` vectors for `dev` and maps each through `dev`'s MSI
/// domain. Returns the number of vectors actually allocated, or an error
/// if the device-local bitmap or the domain's hwirq space is exhausted.
///
/// `nvec` is `max_vecs` unless [`MsiAllocFlags::USE_DEF_NUM_VECS`] is set
/// (then `min_vecs`); absent [`MsiAllocFlags::MULTI_VECTOR`], it is
/// clamped to 1.
pub fn msi_alloc_vectors(
    dev: &Arc<MsiDeviceData>,
    min_vecs: u32,
    max_vecs: u32,
    flags: MsiAllocFlags,
) -> Result<u32, SystemError> {
    let mut nvec = if flags.contains(MsiAllocFlags::USE_DEF_NUM_VECS) {
        min_vecs
    } else {
        max_vecs
    };
    if !flags.contains(MsiAllocFlags::MULTI_VECTOR) {
        nvec = nvec.min(1);
    }
    if nvec == 0 {
        return Err(SystemError::EINVAL);
    }

    let mut inner = dev.inner.lock();
    if nvec as usize > inner.used.len() {
        return Err(SystemError::ENOMEM);
    }

    let mut indices = Vec::with_capacity(nvec as usize);
    for i in 0..inner.used.len() {
        if inner.used.get(i) == Some(false) {
            indices.push(i as u32);
            if indices.len() == nvec as usize {
                break;
            }
        }
    }
    if indices.len() < nvec as usize {
        return Err(SystemError::EBUSY);
    }

    let domain = inner.domain.clone();
    let Some(hwirq_base) = irqdomain::alloc_hwirq_range(&domain, nvec as usize) else {
        return Err(SystemError::ENOMEM);
    };

    let mut descs = Vec::with_capacity(nvec as usize);
    for (offset, &index) in indices.iter().enumerate() {
        let hwirq = HardwareIrqNumber::new(hwirq_base + offset as u32);
        let virq = irqdomain::create_mapping(&domain, hwirq);
        if !virq.is_valid() {
            for d in &descs {
                let d: &Arc<MsiDesc> = d;
                irqdomain::dispose_mapping(d.virq());
                inner.used.set(d.index() as usize, false);
            }
            irqdomain::free_hwirq_range(&domain, hwirq_base, nvec as usize);
            return Err(SystemError::ENOMEM);
        }
        inner.used.set(index as usize, true);
        descs.push(Arc::new(MsiDesc {
            index,
            inner: Mutex::new(InnerMsiDesc {
                hwirq,
                virq,
                msg: MsiMsg::default(),
                state: MsiState::Allocated,
                refcount: 1,
            }),
        }));
    }

    inner.hwirq_base = Some(hwirq_base);
    inner.descs.extend(descs);
    Ok(nvec)
}

/// Disposes every mapping owned by `dev`, releases the reserved hwirq
/// range, and clears the device-local bitmap.
pub fn msi_free_vectors(dev: &Arc<MsiDeviceData>) {
    let mut inner = dev.inner.lock();
    let domain = inner.domain.clone();
    let removed: Vec<Arc<MsiDesc>> = inner.descs.drain(..).collect();
    let nvec = removed.len();
    for desc in &removed {
        irqdomain::dispose_mapping(desc.virq());
        inner.used.set(desc.index() as usize, false);
    }
    if let Some(base) = inner.hwirq_base.take() {
        irqdomain::free_hwirq_range(&domain, base, nvec);
    }
}

/// Delegates to `disable_irq_nosync` on the descriptor's virq.
pub fn msi_mask_irq(desc: &Arc<MsiDesc>) {
    manage::disable_irq_nosync(desc.virq());
    desc.inner.lock().state = MsiState::Masked;
}

/// Delegates to `enable_irq` on the descriptor's virq.
pub fn msi_unmask_irq(desc: &Arc<MsiDesc>) {
    manage::enable_irq(desc.virq());
    desc.inner.lock().state = MsiState::Unmasked;
}
