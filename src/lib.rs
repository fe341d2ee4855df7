//! Generic interrupt routing and dispatch subsystem.
//!
//! This crate is the layer between raw controller hardware (GIC, PLIC,
//! APLIC, MSI-X chips — concrete drivers for all of these are out of
//! scope) and driver-facing handler registration. It owns:
//!
//! - the virq allocator ([`virq_alloc`], re-exported through [`registry`]),
//! - the `virq -> descriptor` table ([`irqdesc`]),
//! - the three domain flavors — linear, tree, hierarchy ([`irqdomain`]),
//!   tree domains backed by the `radix_tree` crate's sparse radix tree,
//! - the dispatch entry point [`dispatch::generic_handle_irq`],
//! - and the MSI descriptor layer ([`msi`]).
//!
//! SMP affinity is stored but never consulted; power management beyond a
//! `SUSPENDED` status bit is absent; domains are never re-parented once
//! created. See each module for its slice of the contract.
#![no_std]

extern crate alloc;

#[macro_use]
mod int_like;

pub mod dispatch;
pub mod dummychip;
pub mod irqchip;
pub mod irqdata;
pub mod irqdesc;
pub mod irqdomain;
pub mod manage;
pub mod msi;
pub mod numbers;
pub mod registry;
pub mod stats;

pub use dispatch::{generic_handle_irq, irq_domain_handle_irq};
pub use irqchip::{IrqChip, IrqChipData};
pub use irqdata::{IrqHandleFlags, IrqStatus, TriggerType};
pub use irqdesc::{set_hwirq_and_chip, DevData, IrqAction, IrqDesc, IrqHandler};
pub use irqdomain::{
    create_hierarchy, create_linear, create_tree, Domain, DomainOps, LINEAR_MAX_SIZE,
    TREE_DEFAULT_MAX_HWIRQ,
};
pub use manage::{
    disable_irq, disable_irq_nosync, enable_irq, free_irq, request_irq, shutdown_irq, startup_irq,
};
pub use numbers::{HardwareIrqNumber, IrqNumber};

/// Sentinel virq meaning "no interrupt" / "invalid handle". Re-exported
/// at the crate root since every caller-facing signature returns it on
/// failure, per the crate's error-handling policy (§7): invalid
/// arguments and resource exhaustion return this sentinel, they never
/// panic.
pub const IRQ_INVALID: u32 = virq_alloc::IRQ_INVALID;
/// One past the highest virq the core will ever hand out.
pub const MAX_VIRQ: usize = virq_alloc::MAX_VIRQ;
/// One past the highest virq the descriptor table indexes.
pub const MAX_IRQ_DESC: usize = irqdesc::MAX_IRQ_DESC;
