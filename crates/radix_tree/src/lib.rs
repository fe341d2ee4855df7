#![no_std]
//! Sparse `u32 -> T` map used as the storage engine for tree interrupt
//! domains and for MSI hwirq range reservation.
//!
//! Keys are split into 6-bit chunks (fan-out 64) from the most significant
//! chunk down; height grows lazily as keys are inserted and shrinks again
//! on delete. Two tag bitmaps (`ALLOCATED`, `MSI`) propagate up the tree:
//! a parent's tag bit at a child slot is set iff some descendant under
//! that slot carries the tag.

extern crate alloc;

mod node;

use alloc::vec::Vec;
use node::{Duplicate, Node, MAX_HEIGHT, SHIFT};
use spin::Mutex;
use system_error::SystemError;

pub use node::{FANOUT as RADIX_FAN_OUT, MAX_HEIGHT as RADIX_MAX_HEIGHT, NUM_TAGS as RADIX_NUM_TAGS};

/// Tag indices understood by the interrupt core.
pub const TAG_ALLOCATED: usize = 0;
pub const TAG_MSI: usize = 1;

struct Inner<T> {
    root: Option<alloc::boxed::Box<Node<T>>>,
    height: u8,
}

pub struct RadixTree<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for RadixTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RadixTree<T> {
    pub const fn new() -> Self {
        RadixTree {
            inner: Mutex::new(Inner {
                root: None,
                height: 0,
            }),
        }
    }

    pub fn empty(&self) -> bool {
        self.inner.lock().root.is_none()
    }

    fn required_height(key: u64) -> u8 {
        let mut h: u8 = 1;
        while h < MAX_HEIGHT && (key >> (h as u32 * SHIFT)) != 0 {
            h += 1;
        }
        h
    }

    fn ensure_height(inner: &mut Inner<T>, needed: u8) {
        if inner.root.is_none() {
            inner.root = Some(Node::new(needed));
            inner.height = needed;
            return;
        }
        while inner.height < needed {
            let old = inner.root.take().unwrap();
            let old_tags = [old.tags_summary(0), old.tags_summary(1)];
            let mut new_root = Node::new(inner.height + 1);
            new_root.adopt_as_child0(old, old_tags);
            inner.root = Some(new_root);
            inner.height += 1;
        }
    }

    fn shrink(inner: &mut Inner<T>) {
        loop {
            let root_empty = inner.root.as_ref().map_or(true, |r| r.count() == 0);
            if root_empty {
                inner.root = None;
                inner.height = 0;
                return;
            }
            if inner.height <= 1 {
                return;
            }
            match inner.root.as_mut().unwrap().sole_child_at_zero() {
                Some(child) => {
                    inner.root = Some(child);
                    inner.height -= 1;
                }
                None => return,
            }
        }
    }

    /// Fails with `EEXIST` if the slot already holds a value.
    pub fn insert(&self, key: u32, value: T) -> Result<(), SystemError> {
        let key = key as u64;
        let mut inner = self.inner.lock();
        Self::ensure_height(&mut inner, Self::required_height(key));
        match inner.root.as_mut().unwrap().insert(key, value) {
            Ok(()) => Ok(()),
            Err(Duplicate) => Err(SystemError::EEXIST),
        }
    }

    /// Unconditional insert; returns the prior value, if any.
    pub fn replace(&self, key: u32, value: T) -> Option<T> {
        let key = key as u64;
        let mut inner = self.inner.lock();
        Self::ensure_height(&mut inner, Self::required_height(key));
        inner.root.as_mut().unwrap().replace(key, value)
    }

    pub fn delete(&self, key: u32) -> Option<T> {
        let key = key as u64;
        let mut inner = self.inner.lock();
        let removed = inner.root.as_mut()?.delete(key);
        if removed.is_some() {
            Self::shrink(&mut inner);
        }
        removed
    }

    pub fn tag_set(&self, key: u32, tag: usize) {
        let key = key as u64;
        let mut inner = self.inner.lock();
        if let Some(root) = inner.root.as_mut() {
            root.tag_set(key, tag);
        }
    }

    pub fn tag_clear(&self, key: u32, tag: usize) {
        let key = key as u64;
        let mut inner = self.inner.lock();
        if let Some(root) = inner.root.as_mut() {
            root.tag_clear(key, tag);
        }
    }

    pub fn tag_get(&self, key: u32, tag: usize) -> bool {
        let inner = self.inner.lock();
        match &inner.root {
            Some(root) => root.tag_get(key as u64, tag),
            None => false,
        }
    }
}

impl<T: Clone> RadixTree<T> {
    pub fn lookup(&self, key: u32) -> Option<T> {
        let inner = self.inner.lock();
        inner.root.as_ref()?.lookup(key as u64).cloned()
    }

    /// Next key >= `start` that holds a value, or `None` once the scan
    /// would wrap past `u32::MAX`.
    pub fn next_slot(&self, start: u32) -> Option<(u32, T)> {
        let inner = self.inner.lock();
        let (k, v) = inner.root.as_ref()?.next_from(start as u64, 0)?;
        Some((k as u32, v.clone()))
    }

    pub fn next_tagged(&self, start: u32, tag: usize) -> Option<(u32, T)> {
        let inner = self.inner.lock();
        let (k, v) = inner.root.as_ref()?.next_tagged_from(start as u64, 0, tag)?;
        Some((k as u32, v.clone()))
    }

    /// Collects up to `max` non-null entries at key >= `first_key`, in key order.
    pub fn gang_lookup(&self, first_key: u32, max: usize) -> Vec<(u32, T)> {
        let mut out = Vec::new();
        if max == 0 {
            return out;
        }
        let inner = self.inner.lock();
        let Some(root) = inner.root.as_ref() else {
            return out;
        };
        let mut next = first_key as u64;
        while out.len() < max {
            match root.next_from(next, 0) {
                Some((k, v)) => {
                    out.push((k as u32, v.clone()));
                    match k.checked_add(1) {
                        Some(n) => next = n,
                        None => break,
                    }
                }
                None => break,
            }
        }
        out
    }
}
