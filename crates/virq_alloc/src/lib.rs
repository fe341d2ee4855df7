#![no_std]
//! Allocates virqs: stable, system-wide `u32` interrupt numbers handed out
//! to callers of `request_irq` and friends. virq 0 is reserved as the
//! "no interrupt" sentinel and is never handed out.

extern crate alloc;

use bitmap::traits::BitMapOps;
use bitmap::AllocBitmap;
use spin::Mutex;

/// Highest virq this allocator will ever hand out, plus one.
pub const MAX_VIRQ: usize = 1024;
/// Sentinel meaning "not a valid virq".
pub const IRQ_INVALID: u32 = 0;

struct Inner {
    bitmap: AllocBitmap,
    next_hint: usize,
    high_watermark: usize,
}

pub struct VirqAllocator {
    inner: Mutex<Inner>,
}

impl Default for VirqAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VirqAllocator {
    pub fn new() -> Self {
        let mut bitmap = AllocBitmap::new(MAX_VIRQ);
        bitmap.set(IRQ_INVALID as usize, true);
        VirqAllocator {
            inner: Mutex::new(Inner {
                bitmap,
                next_hint: 1,
                high_watermark: 0,
            }),
        }
    }

    /// Allocates the lowest-numbered free virq at or after the last
    /// allocation point, wrapping once back to 1. Returns `IRQ_INVALID`
    /// when the space is exhausted.
    pub fn alloc(&self) -> u32 {
        let mut inner = self.inner.lock();
        let found = first_free_from(&inner.bitmap, inner.next_hint)
            .or_else(|| first_free_from(&inner.bitmap, 1));
        let Some(idx) = found else {
            return IRQ_INVALID;
        };
        inner.bitmap.set(idx, true);
        inner.next_hint = idx + 1;
        if idx + 1 > inner.high_watermark {
            inner.high_watermark = idx + 1;
        }
        idx as u32
    }

    /// Allocates `count` consecutive virqs, returning the base of the run,
    /// or `IRQ_INVALID` if no run of that length is free.
    pub fn alloc_range(&self, count: usize) -> u32 {
        if count == 0 || count > MAX_VIRQ {
            return IRQ_INVALID;
        }
        let mut inner = self.inner.lock();
        let Some(base) = find_free_run(&inner.bitmap, count) else {
            return IRQ_INVALID;
        };
        for idx in base..base + count {
            inner.bitmap.set(idx, true);
        }
        inner.next_hint = base + count;
        if base + count > inner.high_watermark {
            inner.high_watermark = base + count;
        }
        base as u32
    }

    /// Releases a virq. Freeing an unallocated or out-of-range virq (other
    /// than `IRQ_INVALID`, which is never allocated) is a no-op.
    pub fn free(&self, virq: u32) {
        if virq == IRQ_INVALID {
            return;
        }
        let idx = virq as usize;
        let mut inner = self.inner.lock();
        if idx >= inner.bitmap.len() {
            return;
        }
        inner.bitmap.set(idx, false);
    }

    pub fn free_range(&self, base: u32, count: usize) {
        for i in 0..count {
            self.free(base + i as u32);
        }
    }

    pub fn is_allocated(&self, virq: u32) -> bool {
        let idx = virq as usize;
        let inner = self.inner.lock();
        if idx >= inner.bitmap.len() {
            return false;
        }
        inner.bitmap.get(idx).unwrap_or(false)
    }

    pub fn capacity(&self) -> usize {
        MAX_VIRQ
    }

    pub fn allocated_count(&self) -> usize {
        let inner = self.inner.lock();
        (0..inner.bitmap.len())
            .filter(|&i| inner.bitmap.get(i) == Some(true))
            .count()
    }

    /// One past the highest virq ever handed out by `alloc`/`alloc_range`.
    /// Never decreases, even after the virqs below it are freed.
    pub fn max_allocated(&self) -> usize {
        self.inner.lock().high_watermark
    }
}

fn first_free_from(bitmap: &AllocBitmap, start: usize) -> Option<usize> {
    if start >= bitmap.len() {
        return None;
    }
    if bitmap.get(start) == Some(false) {
        return Some(start);
    }
    bitmap.next_false_index(start)
}

fn find_free_run(bitmap: &AllocBitmap, count: usize) -> Option<usize> {
    let len = bitmap.len();
    let mut idx = 1;
    while idx + count <= len {
        match first_free_from(bitmap, idx) {
            None => return None,
            Some(start) => {
                let mut run_end = start;
                while run_end < start + count && bitmap.get(run_end) == Some(false) {
                    run_end += 1;
                }
                if run_end - start >= count {
                    return Some(start);
                }
                idx = run_end + 1;
            }
        }
    }
    None
}
