use log::{debug, warn};

use crate::cache::{CacheLevel, Chain, MainMemory};
use crate::commons::{Dir, Geometry, HierarchySpec, LevelId};
use crate::errors::SimResult;
use crate::prefetch::{self, Prefetcher};
use crate::stats::Statistics;

/// I$ and D$ in front of a shared L2, in front of flat main memory.
///
/// The hierarchy owns every set and all counters. Dropping it (or calling
/// [`MemoryHierarchy::teardown`]) releases the storage.
pub struct MemoryHierarchy {
    icache: CacheLevel,
    dcache: CacheLevel,
    l2cache: CacheLevel,
    memory: MainMemory,
    prefetch: bool,
    icache_pf: Box<dyn Prefetcher>,
    dcache_pf: Box<dyn Prefetcher>,
    stats: Statistics,
}

impl MemoryHierarchy {
    /// Validate `spec`, allocate empty sets and zero the statistics.
    pub fn new(spec: &HierarchySpec) -> SimResult<Self> {
        let [icache, dcache, l2cache] = spec.validate()?;

        for (id, geom) in [(LevelId::ICache, &icache), (LevelId::DCache, &dcache), (LevelId::L2, &l2cache)] {
            if geom.enabled() {
                debug!(
                    "{}: {} sets x {} ways, {}B blocks, index bits {}, offset bits {}",
                    id, geom.sets, geom.assoc, geom.block_size, geom.index_bits, geom.offset_bits
                );
            } else {
                debug!("{}: disabled", id);
            }
        }
        if spec.inclusive {
            warn!("inclusive L2 requested, no inclusion policy is modelled");
        }

        Ok(MemoryHierarchy {
            icache: CacheLevel::new(LevelId::ICache, icache),
            dcache: CacheLevel::new(LevelId::DCache, dcache),
            l2cache: CacheLevel::new(LevelId::L2, l2cache),
            memory: MainMemory { latency: spec.memspeed },
            prefetch: spec.prefetch,
            icache_pf: prefetch::build(spec.prefetch_policy, icache.block_size),
            dcache_pf: prefetch::build(spec.prefetch_policy, dcache.block_size),
            stats: Statistics::default(),
        })
    }

    /// swap in a custom predictor for one of the first-level caches
    pub fn set_prefetcher(&mut self, id: LevelId, pf: Box<dyn Prefetcher>) {
        match id {
            LevelId::ICache => self.icache_pf = pf,
            LevelId::DCache => self.dcache_pf = pf,
            LevelId::L2 => warn!("L2 is never prefetched into, ignoring predictor"),
        }
    }

    pub fn access_instruction(&mut self, addr: u32) -> u32 {
        let mut below = Chain { level: &mut self.l2cache, next: &mut self.memory };
        self.icache.access(addr, &mut self.stats, &mut below)
    }

    pub fn access_data(&mut self, addr: u32) -> u32 {
        let mut below = Chain { level: &mut self.l2cache, next: &mut self.memory };
        self.dcache.access(addr, &mut self.stats, &mut below)
    }

    pub fn prefetch_instruction(&mut self, addr: u32) {
        self.icache.prefetch_insert(addr);
    }

    pub fn prefetch_data(&mut self, addr: u32) {
        self.dcache.prefetch_insert(addr);
    }

    pub fn predict_next_instruction_address(&mut self, pc: u32, addr: u32, dir: Dir) -> u32 {
        self.icache_pf.predict(pc, addr, dir)
    }

    pub fn predict_next_data_address(&mut self, pc: u32, addr: u32, dir: Dir) -> u32 {
        self.dcache_pf.predict(pc, addr, dir)
    }

    /// whether the driver should issue prefetches into `id`
    pub fn prefetches_into(&self, id: LevelId) -> bool {
        self.prefetch && self.level(id).is_enabled()
    }

    pub fn level(&self, id: LevelId) -> &CacheLevel {
        match id {
            LevelId::ICache => &self.icache,
            LevelId::DCache => &self.dcache,
            LevelId::L2 => &self.l2cache,
        }
    }

    pub fn geometry(&self) -> [(LevelId, Geometry); 3] {
        [
            (LevelId::ICache, *self.icache.geometry()),
            (LevelId::DCache, *self.dcache.geometry()),
            (LevelId::L2, *self.l2cache.geometry()),
        ]
    }

    pub fn memspeed(&self) -> u32 {
        self.memory.latency
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// drop all sets and hand back the final counters
    pub fn teardown(self) -> Statistics {
        debug!(
            "tearing down, {} compulsory and {} other misses",
            self.stats.compulsory_miss, self.stats.other_miss
        );
        self.stats
    }
}
