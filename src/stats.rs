//! Cross-cutting glue: aggregate counters, runtime integrity checks, and
//! tracing output. Nothing here is on the hot dispatch path; it exists
//! so a driver (or a debug console) can sanity-check the subsystem's
//! global state without reaching into `registry` internals directly.

use alloc::vec::Vec;

use log::{info, warn};

use crate::irqdata::IrqStatus;
use crate::irqdomain::Domain;
use crate::numbers::IrqNumber;
use crate::registry;

/// Snapshot of the process-wide counters a driver or console might want
/// to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrqStats {
    pub allocated_virqs: usize,
    pub max_allocated_virq: usize,
    pub domain_count: usize,
}

pub fn snapshot() -> IrqStats {
    IrqStats {
        allocated_virqs: registry::allocated_virq_count(),
        max_allocated_virq: registry::max_allocated_virq(),
        domain_count: registry::domains().len(),
    }
}

/// Logs a one-line summary of every live virq through the `log` crate.
/// The core functions without a sink configured — this is purely a
/// convenience, never required for correctness.
pub fn print_all_descriptors() {
    let stats = snapshot();
    info!(
        "irq_core: {} virqs allocated (high watermark {}) across {} domains",
        stats.allocated_virqs, stats.max_allocated_virq, stats.domain_count
    );
    for virq in 1..crate::MAX_IRQ_DESC as u32 {
        let virq = IrqNumber::new(virq);
        if let Some(desc) = registry::to_desc(virq) {
            info!(
                "  virq={:?} hwirq={:?} status={:?} depth={} count={} spurious={} actions={}",
                virq,
                desc.hwirq(),
                desc.status(),
                desc.depth(),
                desc.count(),
                desc.spurious_count(),
                desc.action_count(),
            );
        }
    }
}

/// One violated invariant, named after the crate's design-notes
/// numbering (§3 Invariants) for easy cross-reference.
#[derive(Debug, Clone)]
pub enum IntegrityViolation {
    /// Invariant 5: a descriptor with an empty action chain must have
    /// `DISABLED` set and `depth >= 1`.
    EmptyChainNotDisabled(IrqNumber),
    /// Invariant 4: `depth == 0` must imply `DISABLED` is clear, and
    /// vice versa.
    DepthStatusMismatch(IrqNumber),
    /// Invariant 2: a domain's `map`/`revmap` slots disagree about which
    /// virq (if any) owns a given hwirq.
    DomainRevmapMismatch { domain_id: u32, hwirq: u32 },
}

/// Walks every live descriptor and checks the invariants that are cheap
/// to verify without touching domain-internal locking order (so this
/// never takes `domain.lock` while holding `desc.lock`, matching the
/// crate's documented lock ordering).
pub fn check_descriptor_invariants() -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    for virq in 1..crate::MAX_IRQ_DESC as u32 {
        let virq_n = IrqNumber::new(virq);
        let Some(desc) = registry::to_desc(virq_n) else {
            continue;
        };
        let status = desc.status();
        let depth = desc.depth();
        let has_handlers = desc.has_handlers();

        if !has_handlers && !status.contains(IrqStatus::DISABLED) {
            violations.push(IntegrityViolation::EmptyChainNotDisabled(virq_n));
        }
        if (depth == 0) == status.contains(IrqStatus::DISABLED) {
            violations.push(IntegrityViolation::DepthStatusMismatch(virq_n));
        }
    }
    if !violations.is_empty() {
        warn!("irq_core: {} descriptor invariant violation(s) detected", violations.len());
    }
    violations
}

/// Checks invariant 2 (`map[h] == Some(desc) <=> revmap[h] == desc.virq`)
/// for one linear or hierarchy domain by reading both arrays directly
/// (rather than through `find_mapping`, which only ever consults
/// `revmap` and so cannot observe the two sides disagreeing). No-op
/// (returns empty) for tree domains, which carry no parallel revmap to
/// go out of sync.
pub fn check_domain_revmap(domain: &Domain) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    let Some(size) = domain.size() else {
        return violations;
    };
    for hwirq in 0..size as u32 {
        let hwirq_n = crate::HardwareIrqNumber::new(hwirq);
        let Some((has_desc, revmap_virq)) = domain.raw_map_slot(hwirq_n) else {
            continue;
        };
        if has_desc != revmap_virq.is_valid() {
            violations.push(IntegrityViolation::DomainRevmapMismatch {
                domain_id: domain.id(),
                hwirq,
            });
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irqdomain::{self, DomainOps};
    use crate::numbers::HardwareIrqNumber;
    use alloc::string::String;
    use alloc::sync::Arc;

    struct NoopOps;
    impl DomainOps for NoopOps {}

    #[derive(Debug)]
    struct PlainChip;
    impl crate::IrqChip for PlainChip {
        fn name(&self) -> &'static str {
            "stats-plain"
        }
    }

    #[test]
    fn fresh_mapping_has_no_invariant_violations() {
        let domain = irqdomain::create_linear(
            String::from("stats-test"),
            8,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(2));
        assert!(virq.is_valid());

        let violations = check_descriptor_invariants();
        assert!(
            violations.iter().all(|v| !matches!(v, IntegrityViolation::EmptyChainNotDisabled(x) if *x == virq)),
        );
    }

    #[test]
    fn snapshot_reflects_allocated_virqs() {
        let before = snapshot();
        let domain = irqdomain::create_linear(
            String::from("stats-snapshot"),
            8,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();
        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(0));
        assert!(virq.is_valid());
        let after = snapshot();
        assert!(after.allocated_virqs > before.allocated_virqs);
    }

    /// `check_domain_revmap` must read `map` and `revmap` directly rather
    /// than through `find_mapping` (which only ever consults `revmap`),
    /// so a fresh mapping and a disposed one must both come back clean —
    /// exercising both sides of the comparison, not a single one.
    #[test]
    fn revmap_check_is_clean_across_create_and_dispose() {
        let domain = irqdomain::create_linear(
            String::from("stats-revmap"),
            8,
            Arc::new(NoopOps),
            Arc::new(PlainChip),
            None,
        )
        .unwrap();

        assert!(check_domain_revmap(&domain).is_empty());

        let virq = irqdomain::create_mapping(&domain, HardwareIrqNumber::new(3));
        assert!(virq.is_valid());
        let (has_desc, revmap_virq) = domain.raw_map_slot(HardwareIrqNumber::new(3)).unwrap();
        assert!(has_desc);
        assert_eq!(revmap_virq, virq);
        assert!(check_domain_revmap(&domain).is_empty());

        irqdomain::dispose_mapping(virq);
        let (has_desc, revmap_virq) = domain.raw_map_slot(HardwareIrqNumber::new(3)).unwrap();
        assert!(!has_desc);
        assert!(!revmap_virq.is_valid());
        assert!(check_domain_revmap(&domain).is_empty());
    }
}
