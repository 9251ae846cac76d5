// Address predictors for the prefetch path. A predictor sees the last real
// access to a first-level cache and names one address to warm into it.

use crate::commons::{Dir, PrefetchPolicy};

pub trait Prefetcher {
    fn predict(&mut self, pc: u32, addr: u32, dir: Dir) -> u32;
}

/// fetch the block right after the one just touched
pub struct NextLine {
    block_size: u32,
}

impl NextLine {
    pub fn new(block_size: u32) -> Self {
        NextLine { block_size }
    }
}

impl Prefetcher for NextLine {
    fn predict(&mut self, _pc: u32, addr: u32, _dir: Dir) -> u32 {
        addr.wrapping_add(self.block_size)
    }
}

const STRIDE_ENTRIES: usize = 64;
const CONF_MAX: u8 = 3;
const CONF_PREDICT: u8 = 2;

#[derive(Clone, Copy, Default)]
struct StrideEntry {
    valid: bool,
    pc: u32,
    last_addr: u32,
    stride: i64,
    conf: u8,
}

/// Per-pc stride detector. Falls back to next-line until a stride has been
/// seen often enough.
pub struct Stride {
    table: [StrideEntry; STRIDE_ENTRIES],
    fallback: NextLine,
}

impl Stride {
    pub fn new(block_size: u32) -> Self {
        Stride {
            table: [StrideEntry::default(); STRIDE_ENTRIES],
            fallback: NextLine::new(block_size),
        }
    }
}

impl Prefetcher for Stride {
    fn predict(&mut self, pc: u32, addr: u32, dir: Dir) -> u32 {
        // pcs are at least 2-byte aligned
        let entry = &mut self.table[(pc >> 1) as usize % STRIDE_ENTRIES];
        if !entry.valid || entry.pc != pc {
            *entry = StrideEntry { valid: true, pc, last_addr: addr, stride: 0, conf: 0 };
            return self.fallback.predict(pc, addr, dir);
        }

        let stride = addr as i64 - entry.last_addr as i64;
        if stride == entry.stride {
            entry.conf = (entry.conf + 1).min(CONF_MAX);
        } else if entry.conf > 0 {
            entry.conf -= 1;
        } else {
            entry.stride = stride;
        }
        entry.last_addr = addr;

        if entry.conf >= CONF_PREDICT && entry.stride != 0 {
            (addr as i64 + entry.stride) as u32
        } else {
            self.fallback.predict(pc, addr, dir)
        }
    }
}

pub fn build(policy: PrefetchPolicy, block_size: u32) -> Box<dyn Prefetcher> {
    match policy {
        PrefetchPolicy::NextLine => Box::new(NextLine::new(block_size)),
        PrefetchPolicy::Stride => Box::new(Stride::new(block_size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_line_adds_one_block() {
        let mut pf = NextLine::new(32);
        assert_eq!(pf.predict(0x400, 0x1000, Dir::Read), 0x1020);
        assert_eq!(pf.predict(0x400, 0x1013, Dir::Write), 0x1033);
    }

    #[test]
    fn next_line_wraps_at_top_of_address_space() {
        let mut pf = NextLine::new(64);
        assert_eq!(pf.predict(0, 0xffff_ffe0, Dir::Read), 0x20);
    }

    #[test]
    fn stride_cold_start_falls_back_to_next_line() {
        let mut pf = Stride::new(16);
        assert_eq!(pf.predict(0x400, 0x2000, Dir::Read), 0x2010);
        assert_eq!(pf.predict(0x400, 0x2100, Dir::Read), 0x2110);
    }

    #[test]
    fn stride_predicts_once_confident() {
        let mut pf = Stride::new(16);
        let mut last = 0;
        for i in 0..6u32 {
            last = pf.predict(0x400, 0x8000 + i * 0x100, Dir::Read);
        }
        assert_eq!(last, 0x8000 + 6 * 0x100);
    }

    #[test]
    fn stride_handles_negative_strides() {
        let mut pf = Stride::new(16);
        let mut last = 0;
        for i in 0..6u32 {
            last = pf.predict(0x500, 0x9000 - i * 0x40, Dir::Write);
        }
        assert_eq!(last, 0x9000 - 6 * 0x40);
    }

    #[test]
    fn stride_entries_are_per_pc() {
        let mut pf = Stride::new(16);
        for i in 0..6u32 {
            pf.predict(0x400, 0x8000 + i * 0x100, Dir::Read);
        }
        // same table slot, different pc: entry is reset
        let other = 0x400 + (STRIDE_ENTRIES as u32) * 2;
        assert_eq!(pf.predict(other, 0x100, Dir::Read), 0x110);
    }
}
