// This module defines a single cache level and the LRU sets it is made of,
// plus the interface every level uses to reach whatever sits below it.

use log::trace;

use crate::commons::{Addr, Geometry, LevelId};
use crate::stats::Statistics;

// sets

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissKind {
    Compulsory, // the set held nothing yet
    Other,      // conflict or capacity
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    Hit,
    Miss(MissKind),
}

#[derive(Clone, Copy, Debug)]
struct Line {
    tag: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

/// One set, kept as a doubly linked list over a slot arena.
///
/// `head` is the most recently used line, `tail` the least recently used one.
/// Slots are never freed while the set lives; an eviction reuses the tail
/// slot for the incoming tag.
#[derive(Clone, Debug, Default)]
pub struct CacheSet {
    lines: Vec<Line>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl CacheSet {
    pub fn new(assoc: usize) -> Self {
        CacheSet {
            lines: Vec::with_capacity(assoc),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// resident tags, most recently used first
    pub fn tags(&self) -> Tags<'_> {
        Tags { set: self, cur: self.head }
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.find(tag).is_some()
    }

    fn find(&self, tag: u32) -> Option<usize> {
        let mut cur = self.head;
        while let Some(i) = cur {
            if self.lines[i].tag == tag {
                return Some(i);
            }
            cur = self.lines[i].next;
        }
        None
    }

    fn unlink(&mut self, i: usize) {
        let Line { prev, next, .. } = self.lines[i];
        match prev {
            Some(p) => self.lines[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.lines[n].prev = prev,
            None => self.tail = prev,
        }
        self.lines[i].prev = None;
        self.lines[i].next = None;
    }

    fn push_front(&mut self, i: usize) {
        self.lines[i].prev = None;
        self.lines[i].next = self.head;
        if let Some(h) = self.head {
            self.lines[h].prev = Some(i);
        }
        self.head = Some(i);
        if self.tail.is_none() {
            self.tail = Some(i);
        }
    }

    /// Looks `tag` up and updates recency.
    ///
    /// A hit moves the line to the MRU position. A miss is classified against
    /// the state of the set before anything changes; callers replaying a
    /// prefetch simply ignore the classification. With `fill` set, a miss
    /// inserts `tag` at the MRU position, first evicting the LRU line when
    /// the set already holds `assoc` lines.
    pub fn probe(&mut self, tag: u32, assoc: usize, fill: bool) -> Probe {
        if let Some(i) = self.find(tag) {
            if self.head != Some(i) {
                self.unlink(i);
                self.push_front(i);
            }
            return Probe::Hit;
        }

        let kind = if self.is_empty() { MissKind::Compulsory } else { MissKind::Other };
        if !fill {
            return Probe::Miss(kind);
        }

        let slot = match self.tail {
            Some(lru) if self.lines.len() >= assoc => {
                trace!("evicting tag {:#x} for {:#x}", self.lines[lru].tag, tag);
                self.unlink(lru);
                self.lines[lru].tag = tag;
                lru
            }
            _ => {
                self.lines.push(Line { tag, prev: None, next: None });
                self.lines.len() - 1
            }
        };
        self.push_front(slot);
        Probe::Miss(kind)
    }
}

pub struct Tags<'a> {
    set: &'a CacheSet,
    cur: Option<usize>,
}

impl Iterator for Tags<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let i = self.cur?;
        let line = &self.set.lines[i];
        self.cur = line.next;
        Some(line.tag)
    }
}

// the next stage below a cache level

pub trait Backing {
    /// serve a real access, returning the cycles it took
    fn access(&mut self, addr: u32, stats: &mut Statistics) -> u32;
}

/// flat-latency main memory, the bottom of every pipeline
pub struct MainMemory {
    pub latency: u32,
}

impl Backing for MainMemory {
    fn access(&mut self, _addr: u32, _stats: &mut Statistics) -> u32 {
        self.latency
    }
}

/// a cache level together with everything below it
pub struct Chain<'a> {
    pub level: &'a mut CacheLevel,
    pub next: &'a mut dyn Backing,
}

impl Backing for Chain<'_> {
    fn access(&mut self, addr: u32, stats: &mut Statistics) -> u32 {
        self.level.access(addr, stats, &mut *self.next)
    }
}

// cache level

pub struct CacheLevel {
    id: LevelId,
    geom: Geometry,
    sets: Vec<CacheSet>,
}

impl CacheLevel {
    pub fn new(id: LevelId, geom: Geometry) -> Self {
        let sets = (0..geom.sets)
            .map(|_| CacheSet::new(geom.assoc as usize))
            .collect();
        CacheLevel { id, geom, sets }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geom
    }

    pub fn is_enabled(&self) -> bool {
        self.geom.enabled()
    }

    pub fn set(&self, index: usize) -> Option<&CacheSet> {
        self.sets.get(index)
    }

    /// whether the block holding `addr` is resident, without touching recency
    pub fn contains(&self, addr: u32) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let (index, tag) = Addr(addr).pos(&self.geom);
        self.sets[index].contains(tag)
    }

    fn probe(&mut self, addr: u32, fill: bool) -> Probe {
        let (index, tag) = Addr(addr).pos(&self.geom);
        self.sets[index].probe(tag, self.geom.assoc as usize, fill)
    }

    /// Perform a real access. A disabled level is invisible and hands the
    /// request straight to `next`.
    pub fn access(&mut self, addr: u32, stats: &mut Statistics, next: &mut dyn Backing) -> u32 {
        if !self.is_enabled() {
            return next.access(addr, stats);
        }
        stats.level_mut(self.id).refs += 1;
        match self.probe(addr, true) {
            Probe::Hit => {
                trace!("{} hit {:#010x}", self.id, addr);
                self.geom.hit_time
            }
            Probe::Miss(kind) => {
                trace!("{} {:?} miss {:#010x}", self.id, kind, addr);
                match kind {
                    MissKind::Compulsory => stats.compulsory_miss += 1,
                    MissKind::Other => stats.other_miss += 1,
                }
                stats.level_mut(self.id).misses += 1;
                let below = next.access(addr, stats);
                stats.level_mut(self.id).penalties += below as u64;
                self.geom.hit_time + below
            }
        }
    }

    /// Warm the block holding `addr` into this level only. Counts nothing and
    /// never reaches the next level, but may still evict.
    pub fn prefetch_insert(&mut self, addr: u32) {
        if !self.is_enabled() {
            return;
        }
        if let Probe::Miss(_) = self.probe(addr, true) {
            trace!("{} prefetched {:#010x}", self.id, addr);
        }
    }
}
