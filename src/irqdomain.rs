//! Interrupt domains: the `hwirq <-> virq` mapping owned by one controller,
//! in linear (dense), tree (sparse), or hierarchy (cascaded) flavors.

use core::any::Any;
use core::fmt::Debug;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;
use system_error::SystemError;

use radix_tree::{RadixTree, TAG_ALLOCATED, TAG_MSI};

use crate::irqchip::{IrqChip, IrqChipData};
use crate::irqdata::TriggerType;
use crate::irqdesc::IrqDesc;
use crate::numbers::{HardwareIrqNumber, IrqNumber};
use crate::registry;

/// Largest size accepted by [`create_linear`] / [`create_hierarchy`].
pub const LINEAR_MAX_SIZE: usize = 10_000;
/// Default ceiling on `hwirq` for a tree domain when the caller doesn't
/// name a tighter one.
pub const TREE_DEFAULT_MAX_HWIRQ: u32 = (1 << 24) - 1;

/// Vtable a controller driver supplies per domain. Every method is
/// optional; the defaults shown are applied by the domain layer itself.
pub trait DomainOps: Send + Sync {
    /// Called once a descriptor has been installed in the domain's storage
    /// and filled with `hwirq`/`domain`/`chip`. Returning `Err` rolls the
    /// whole mapping back.
    fn map(
        &self,
        _domain: &Arc<Domain>,
        _virq: IrqNumber,
        _hwirq: HardwareIrqNumber,
    ) -> Result<(), SystemError> {
        Ok(())
    }

    fn unmap(&self, _domain: &Arc<Domain>, _virq: IrqNumber) {}

    /// Device-tree-specifier translation. Out of scope collaborators
    /// (device-tree parsing) feed this; the default is unimplemented.
    fn xlate(
        &self,
        _domain: &Arc<Domain>,
        _specifier: &[u32],
    ) -> Result<(HardwareIrqNumber, TriggerType), SystemError> {
        Err(SystemError::ENOSYS)
    }

    fn alloc(
        &self,
        _domain: &Arc<Domain>,
        _base_virq: IrqNumber,
        _count: usize,
        _arg: Option<&dyn Any>,
    ) -> Result<(), SystemError> {
        Ok(())
    }

    fn free(&self, _domain: &Arc<Domain>, _base_virq: IrqNumber, _count: usize) {}

    fn activate(
        &self,
        _domain: &Arc<Domain>,
        _desc: &Arc<IrqDesc>,
        _early: bool,
    ) -> Result<(), SystemError> {
        Ok(())
    }

    fn deactivate(&self, _domain: &Arc<Domain>, _desc: &Arc<IrqDesc>) {}

    /// Hierarchy-only. Default identity, matching a cascade where the
    /// child's `hwirq` space happens to coincide with the parent's.
    fn child_to_parent_hwirq(&self, hwirq: HardwareIrqNumber) -> HardwareIrqNumber {
        hwirq
    }
}

/// Slot contents for a tree domain's backing radix tree. `Reserved` marks
/// an `hwirq` set aside by `alloc_hwirq_range` before any descriptor
/// exists there; it is invisible to `find_mapping`.
#[derive(Clone)]
pub(crate) enum TreeSlot {
    Mapped(Arc<IrqDesc>),
    Reserved,
}

pub(crate) enum DomainStorage {
    Linear {
        map: Vec<Option<Arc<IrqDesc>>>,
        revmap: Vec<IrqNumber>,
    },
    Tree {
        tree: RadixTree<TreeSlot>,
        max_hwirq: u32,
    },
    Hierarchy {
        parent: Arc<Domain>,
        map: Vec<Option<Arc<IrqDesc>>>,
        revmap: Vec<IrqNumber>,
    },
}

/// A controller's `hwirq <-> virq` mapping. One of three storage flavors;
/// see the crate's data-model notes for why a sum type beats a union of
/// pointer fields here (it rules out reading the wrong variant's layout).
pub struct Domain {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) ops: Arc<dyn DomainOps>,
    pub(crate) chip: Arc<dyn IrqChip>,
    pub(crate) chip_data: Option<Arc<dyn IrqChipData>>,
    pub(crate) storage: Mutex<DomainStorage>,
}

impl Debug for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl Domain {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_tree(&self) -> bool {
        matches!(&*self.storage.lock(), DomainStorage::Tree { .. })
    }

    pub fn is_hierarchy(&self) -> bool {
        matches!(&*self.storage.lock(), DomainStorage::Hierarchy { .. })
    }

    pub fn parent(&self) -> Option<Arc<Domain>> {
        match &*self.storage.lock() {
            DomainStorage::Hierarchy { parent, .. } => Some(parent.clone()),
            _ => None,
        }
    }

    /// `find_mapping`: reserved tree slots never produce a result.
    pub fn find_mapping(&self, hwirq: HardwareIrqNumber) -> Option<IrqNumber> {
        match &*self.storage.lock() {
            DomainStorage::Linear { revmap, .. } | DomainStorage::Hierarchy { revmap, .. } => {
                let idx = hwirq.data() as usize;
                revmap.get(idx).filter(|v| v.is_valid()).copied()
            }
            DomainStorage::Tree { tree, .. } => match tree.lookup(hwirq.data()) {
                Some(TreeSlot::Mapped(desc)) => Some(desc.irq()),
                _ => None,
            },
        }
    }

    fn install_mapping(&self, hwirq: HardwareIrqNumber, desc: Arc<IrqDesc>) -> Result<(), SystemError> {
        let mut storage = self.storage.lock();
        match &mut *storage {
            DomainStorage::Linear { map, revmap } | DomainStorage::Hierarchy { map, revmap, .. } => {
                let idx = hwirq.data() as usize;
                if idx >= map.len() {
                    return Err(SystemError::EINVAL);
                }
                if map[idx].is_some() {
                    panic!("duplicate mapping installed at hwirq {:?}", hwirq);
                }
                map[idx] = Some(desc.clone());
                revmap[idx] = desc.irq();
                Ok(())
            }
            DomainStorage::Tree { tree, max_hwirq } => {
                let key = hwirq.data();
                if key > *max_hwirq {
                    return Err(SystemError::EINVAL);
                }
                if let Some(TreeSlot::Mapped(_)) = tree.lookup(key) {
                    panic!("duplicate radix tree insert for hwirq {:?}", hwirq);
                }
                tree.replace(key, TreeSlot::Mapped(desc));
                tree.tag_set(key, TAG_ALLOCATED);
                Ok(())
            }
        }
    }

    fn clear_mapping(&self, hwirq: HardwareIrqNumber) {
        let mut storage = self.storage.lock();
        match &mut *storage {
            DomainStorage::Linear { map, revmap } | DomainStorage::Hierarchy { map, revmap, .. } => {
                let idx = hwirq.data() as usize;
                if idx < map.len() {
                    map[idx] = None;
                    revmap[idx] = IrqNumber::INVALID;
                }
            }
            DomainStorage::Tree { tree, .. } => {
                tree.delete(hwirq.data());
            }
        }
    }

    /// Dense-array size for linear/hierarchy domains; `None` for tree
    /// domains, which have no fixed size.
    pub fn size(&self) -> Option<usize> {
        match &*self.storage.lock() {
            DomainStorage::Linear { map, .. } | DomainStorage::Hierarchy { map, .. } => Some(map.len()),
            DomainStorage::Tree { .. } => None,
        }
    }

    /// Raw `(map[hwirq].is_some(), revmap[hwirq])` pair for a linear or
    /// hierarchy domain, bypassing `find_mapping`'s single-field view —
    /// used by integrity checks that need to compare both sides of
    /// invariant 2 rather than only `revmap`. `None` for tree domains or
    /// an out-of-range `hwirq`.
    pub(crate) fn raw_map_slot(&self, hwirq: HardwareIrqNumber) -> Option<(bool, IrqNumber)> {
        let idx = hwirq.data() as usize;
        match &*self.storage.lock() {
            DomainStorage::Linear { map, revmap } | DomainStorage::Hierarchy { map, revmap, .. } => {
                if idx >= map.len() {
                    return None;
                }
                Some((map[idx].is_some(), revmap[idx]))
            }
            DomainStorage::Tree { .. } => None,
        }
    }
}

fn new_domain(name: String, ops: Arc<dyn DomainOps>, chip: Arc<dyn IrqChip>, chip_data: Option<Arc<dyn IrqChipData>>, storage: DomainStorage) -> Arc<Domain> {
    let domain = Arc::new(Domain {
        id: registry::next_domain_id(),
        name,
        ops,
        chip,
        chip_data,
        storage: Mutex::new(storage),
    });
    registry::register_domain(domain.clone());
    domain
}

pub fn create_linear(
    name: String,
    size: usize,
    ops: Arc<dyn DomainOps>,
    chip: Arc<dyn IrqChip>,
    chip_data: Option<Arc<dyn IrqChipData>>,
) -> Result<Arc<Domain>, SystemError> {
    if size == 0 || size > LINEAR_MAX_SIZE {
        return Err(SystemError::EINVAL);
    }
    let mut revmap = Vec::with_capacity(size);
    revmap.resize(size, IrqNumber::INVALID);
    let mut map = Vec::with_capacity(size);
    map.resize_with(size, || None);
    Ok(new_domain(
        name,
        ops,
        chip,
        chip_data,
        DomainStorage::Linear { map, revmap },
    ))
}

pub fn create_tree(
    name: String,
    ops: Arc<dyn DomainOps>,
    chip: Arc<dyn IrqChip>,
    chip_data: Option<Arc<dyn IrqChipData>>,
    max_hwirq: Option<u32>,
) -> Result<Arc<Domain>, SystemError> {
    Ok(new_domain(
        name,
        ops,
        chip,
        chip_data,
        DomainStorage::Tree {
            tree: RadixTree::new(),
            max_hwirq: max_hwirq.unwrap_or(TREE_DEFAULT_MAX_HWIRQ),
        },
    ))
}

pub fn create_hierarchy(
    parent: Arc<Domain>,
    name: String,
    size: usize,
    ops: Arc<dyn DomainOps>,
    chip: Arc<dyn IrqChip>,
    chip_data: Option<Arc<dyn IrqChipData>>,
) -> Result<Arc<Domain>, SystemError> {
    if size == 0 || size > LINEAR_MAX_SIZE {
        return Err(SystemError::EINVAL);
    }
    let mut revmap = Vec::with_capacity(size);
    revmap.resize(size, IrqNumber::INVALID);
    let mut map = Vec::with_capacity(size);
    map.resize_with(size, || None);
    Ok(new_domain(
        name,
        ops,
        chip,
        chip_data,
        DomainStorage::Hierarchy { parent, map, revmap },
    ))
}

/// Idempotent: a second call with the same `hwirq` returns the virq
/// created by the first.
pub fn create_mapping(domain: &Arc<Domain>, hwirq: HardwareIrqNumber) -> IrqNumber {
    if let Some(existing) = domain.find_mapping(hwirq) {
        return existing;
    }

    let virq = registry::virq_alloc();
    if virq == IrqNumber::INVALID {
        return IrqNumber::INVALID;
    }
    let Some(desc) = registry::desc_alloc(virq) else {
        registry::virq_free(virq);
        return IrqNumber::INVALID;
    };

    if let Err(_) = domain.install_mapping(hwirq, desc.clone()) {
        registry::virq_free(virq);
        registry::desc_free(virq);
        return IrqNumber::INVALID;
    }

    desc.set_hwirq(hwirq);
    desc.set_domain(domain);
    desc.set_chip(domain.chip.clone(), domain.chip_data.clone());

    if domain.is_hierarchy() {
        let parent = domain.parent().expect("hierarchy domain without parent");
        let parent_hwirq = domain.ops.child_to_parent_hwirq(hwirq);
        let parent_virq = create_mapping(&parent, parent_hwirq);
        if parent_virq == IrqNumber::INVALID {
            domain.clear_mapping(hwirq);
            registry::virq_free(virq);
            registry::desc_free(virq);
            return IrqNumber::INVALID;
        }
        let parent_desc = registry::to_desc(parent_virq);
        desc.set_parent_desc(parent_desc);
    }

    if let Err(_) = domain.ops.map(domain, virq, hwirq) {
        dispose_mapping(virq);
        return IrqNumber::INVALID;
    }

    virq
}

pub fn find_mapping(domain: &Arc<Domain>, hwirq: HardwareIrqNumber) -> IrqNumber {
    domain.find_mapping(hwirq).unwrap_or(IrqNumber::INVALID)
}

/// For hierarchy descriptors, disposes the parent mapping first.
pub fn dispose_mapping(virq: IrqNumber) {
    let Some(desc) = registry::to_desc(virq) else {
        return;
    };
    if let Some(parent_desc) = desc.parent_desc() {
        dispose_mapping(parent_desc.irq());
    }
    if let Some(domain) = desc.domain() {
        domain.ops.unmap(&domain, virq);
        domain.clear_mapping(desc.hwirq());
    }
    registry::virq_free(virq);
    if !desc.has_handlers() {
        registry::desc_free(virq);
    }
}

fn activate_irq_inner(desc: &Arc<IrqDesc>, early: bool) -> Result<(), SystemError> {
    if let Some(parent) = desc.parent_desc() {
        activate_irq_inner(&parent, early)?;
    }
    let Some(domain) = desc.domain() else {
        return Ok(());
    };
    match domain.ops.activate(&domain, desc, early) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(parent) = desc.parent_desc() {
                deactivate_irq_inner(&parent);
            }
            Err(e)
        }
    }
}

fn deactivate_irq_inner(desc: &Arc<IrqDesc>) {
    if let Some(domain) = desc.domain() {
        domain.ops.deactivate(&domain, desc);
    }
    if let Some(parent) = desc.parent_desc() {
        deactivate_irq_inner(&parent);
    }
}

pub fn activate_irq(virq: IrqNumber, early: bool) -> Result<(), SystemError> {
    let desc = registry::to_desc(virq).ok_or(SystemError::EINVAL)?;
    activate_irq_inner(&desc, early)
}

pub fn deactivate_irq(virq: IrqNumber) {
    if let Some(desc) = registry::to_desc(virq) {
        deactivate_irq_inner(&desc);
    }
}

/// Reserves a contiguous virq range, calls `ops.alloc` once for the whole
/// range, then binds a descriptor to `domain`/`chip` at each virq.
pub fn alloc_irqs(domain: &Arc<Domain>, n: usize, arg: Option<&dyn Any>) -> IrqNumber {
    if n == 0 {
        return IrqNumber::INVALID;
    }
    let base = registry::virq_alloc_range(n);
    if base == IrqNumber::INVALID {
        return IrqNumber::INVALID;
    }
    if domain.ops.alloc(domain, base, n, arg).is_err() {
        registry::virq_free_range(base, n);
        return IrqNumber::INVALID;
    }
    for i in 0..n {
        let virq = base + i as u32;
        match registry::desc_alloc(virq) {
            Some(desc) => {
                desc.set_domain(domain);
                desc.set_chip(domain.chip.clone(), domain.chip_data.clone());
            }
            None => {
                free_irqs(domain, base, i);
                registry::virq_free_range(base + i as u32, n - i);
                domain.ops.free(domain, base, n);
                return IrqNumber::INVALID;
            }
        }
    }
    base
}

pub fn free_irqs(domain: &Arc<Domain>, base: IrqNumber, n: usize) {
    domain.ops.free(domain, base, n);
    for i in 0..n {
        registry::desc_free(base + i as u32);
    }
    registry::virq_free_range(base, n);
}

/// Tree domains only. Scans for the first run of `n` entirely empty
/// `hwirq` slots and marks them `Reserved` so later scans skip them.
pub fn alloc_hwirq_range(domain: &Arc<Domain>, n: usize) -> Option<u32> {
    if n == 0 {
        return None;
    }
    let mut storage = domain.storage.lock();
    let DomainStorage::Tree { tree, max_hwirq } = &mut *storage else {
        return None;
    };
    let max_hwirq = *max_hwirq;

    let mut candidate: u64 = 0;
    loop {
        if candidate + n as u64 > max_hwirq as u64 + 1 {
            return None;
        }
        match tree.next_tagged(candidate as u32, TAG_ALLOCATED) {
            None => break,
            Some((k, _)) => {
                if k as u64 >= candidate + n as u64 {
                    break;
                }
                candidate = k as u64 + 1;
            }
        }
    }
    let base = candidate as u32;
    for i in 0..n {
        let hwirq = base + i as u32;
        tree.replace(hwirq, TreeSlot::Reserved);
        tree.tag_set(hwirq, TAG_ALLOCATED);
        tree.tag_set(hwirq, TAG_MSI);
    }
    Some(base)
}

/// Removes only reserved markers in `[base, base+n)`; real mappings are
/// left untouched.
pub fn free_hwirq_range(domain: &Arc<Domain>, base: u32, n: usize) {
    let mut storage = domain.storage.lock();
    if let DomainStorage::Tree { tree, .. } = &mut *storage {
        for i in 0..n {
            let hwirq = base + i as u32;
            if matches!(tree.lookup(hwirq), Some(TreeSlot::Reserved)) {
                tree.delete(hwirq);
            }
        }
    }
}

/// Disposes every live mapping the domain owns, then unregisters it.
pub fn domain_remove(domain: &Arc<Domain>) {
    let virqs: Vec<IrqNumber> = {
        let storage = domain.storage.lock();
        match &*storage {
            DomainStorage::Linear { revmap, .. } | DomainStorage::Hierarchy { revmap, .. } => {
                revmap.iter().filter(|v| v.is_valid()).copied().collect()
            }
            DomainStorage::Tree { tree, .. } => {
                let mut out = Vec::new();
                let mut cursor: u32 = 0;
                loop {
                    match tree.next_slot(cursor) {
                        Some((hwirq, TreeSlot::Mapped(desc))) => {
                            out.push(desc.irq());
                            match hwirq.checked_add(1) {
                                Some(next) => cursor = next,
                                None => break,
                            }
                        }
                        Some((hwirq, TreeSlot::Reserved)) => match hwirq.checked_add(1) {
                            Some(next) => cursor = next,
                            None => break,
                        },
                        None => break,
                    }
                }
                out
            }
        }
    };
    for virq in virqs {
        dispose_mapping(virq);
    }
    registry::remove_domain(domain);
}

