//! Process-wide singletons: the virq bitmap, descriptor table, domain
//! list, and default-domain pointer. All lazily initialized on first use,
//! per the crate's global-mutable-state design notes — nothing here is
//! re-initializable at runtime.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use lazy_static::lazy_static;
use spin::Mutex;

use virq_alloc::VirqAllocator;

use crate::irqdesc::{IrqDesc, IrqDescTable};
use crate::irqdomain::Domain;
use crate::numbers::IrqNumber;

lazy_static! {
    static ref VIRQS: VirqAllocator = VirqAllocator::new();
    static ref DESCS: IrqDescTable = IrqDescTable::new();
    static ref DOMAINS: Mutex<Vec<Arc<Domain>>> = Mutex::new(Vec::new());
    static ref DEFAULT_DOMAIN: Mutex<Option<Arc<Domain>>> = Mutex::new(None);
}

static NEXT_DOMAIN_ID: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_domain_id() -> u32 {
    NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn register_domain(domain: Arc<Domain>) {
    let mut default = DEFAULT_DOMAIN.lock();
    if default.is_none() {
        *default = Some(domain.clone());
    }
    DOMAINS.lock().push(domain);
}

pub(crate) fn remove_domain(domain: &Arc<Domain>) {
    DOMAINS.lock().retain(|d| d.id() != domain.id());
    let mut default = DEFAULT_DOMAIN.lock();
    if let Some(current) = default.as_ref() {
        if current.id() == domain.id() {
            *default = DOMAINS.lock().first().cloned();
        }
    }
}

pub fn set_default_domain(domain: Arc<Domain>) {
    *DEFAULT_DOMAIN.lock() = Some(domain);
}

pub fn default_domain() -> Option<Arc<Domain>> {
    DEFAULT_DOMAIN.lock().clone()
}

pub fn find_host(name: &str) -> Option<Arc<Domain>> {
    DOMAINS.lock().iter().find(|d| d.name() == name).cloned()
}

pub fn domains() -> Vec<Arc<Domain>> {
    DOMAINS.lock().clone()
}

pub(crate) fn virq_alloc() -> IrqNumber {
    IrqNumber::new(VIRQS.alloc())
}

pub(crate) fn virq_alloc_range(n: usize) -> IrqNumber {
    IrqNumber::new(VIRQS.alloc_range(n))
}

pub(crate) fn virq_free(virq: IrqNumber) {
    VIRQS.free(virq.data());
}

pub(crate) fn virq_free_range(base: IrqNumber, n: usize) {
    VIRQS.free_range(base.data(), n);
}

pub fn is_virq_allocated(virq: IrqNumber) -> bool {
    VIRQS.is_allocated(virq.data())
}

pub fn allocated_virq_count() -> usize {
    VIRQS.allocated_count()
}

pub fn max_allocated_virq() -> usize {
    VIRQS.max_allocated()
}

pub(crate) fn desc_alloc(virq: IrqNumber) -> Option<Arc<IrqDesc>> {
    DESCS.desc_alloc(virq)
}

pub(crate) fn desc_free(virq: IrqNumber) {
    DESCS.desc_free(virq)
}

pub fn to_desc(virq: IrqNumber) -> Option<Arc<IrqDesc>> {
    DESCS.to_desc(virq)
}
