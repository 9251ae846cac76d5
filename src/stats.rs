use crate::commons::{Geometry, LevelId};

/// counters of a single cache level
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct LevelStats {
    pub refs: u64,
    pub misses: u64,
    pub penalties: u64, // cycles spent below this level on misses
}

impl LevelStats {
    pub fn hits(&self) -> u64 {
        self.refs - self.misses
    }

    pub fn miss_rate(&self) -> f64 {
        if self.refs == 0 {
            0.0
        } else {
            self.misses as f64 / self.refs as f64
        }
    }

    /// hit time plus the average penalty paid per reference
    pub fn avg_access_time(&self, hit_time: u32) -> f64 {
        if self.refs == 0 {
            0.0
        } else {
            hit_time as f64 + self.penalties as f64 / self.refs as f64
        }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub icache: LevelStats,
    pub dcache: LevelStats,
    pub l2cache: LevelStats,
    pub compulsory_miss: u64,
    pub other_miss: u64,
}

impl Statistics {
    pub fn level(&self, id: LevelId) -> &LevelStats {
        match id {
            LevelId::ICache => &self.icache,
            LevelId::DCache => &self.dcache,
            LevelId::L2 => &self.l2cache,
        }
    }

    pub fn level_mut(&mut self, id: LevelId) -> &mut LevelStats {
        match id {
            LevelId::ICache => &mut self.icache,
            LevelId::DCache => &mut self.dcache,
            LevelId::L2 => &mut self.l2cache,
        }
    }

    pub fn total_misses(&self) -> u64 {
        self.icache.misses + self.dcache.misses + self.l2cache.misses
    }
}

/// what the driver hands to the reporting layer once the trace is exhausted
#[derive(Clone, Copy, Debug)]
pub struct Report {
    pub events: u64,
    pub cycles: u64,
    pub geometry: [(LevelId, Geometry); 3],
    pub memspeed: u32,
    pub stats: Statistics,
}

impl Report {
    pub fn print(&self) {
        println!("\n-----------------------------");
        println!("Trace Events:         {}", self.events);
        println!("Total Cycles:         {}", self.cycles);
        let cpe = if self.events > 0 {
            self.cycles as f64 / self.events as f64
        } else {
            0.0
        };
        println!("Cycles / Event:       {:.4}", cpe);
        println!("Memory Latency:       {}", self.memspeed);

        for (id, geom) in &self.geometry {
            if !geom.enabled() {
                println!("{:<22}disabled", format!("{}:", id));
                continue;
            }
            let s = self.stats.level(*id);
            println!(
                "{:<22}{} sets, {}-way, {}B blocks, {} cycle hit",
                format!("{}:", id),
                geom.sets,
                geom.assoc,
                geom.block_size,
                geom.hit_time
            );
            println!("  refs:               {}", s.refs);
            println!("  misses:             {}", s.misses);
            println!("  miss rate:          {:.2}%", s.miss_rate() * 100.0);
            println!("  penalties:          {}", s.penalties);
            println!("  avg access time:    {:.2}", s.avg_access_time(geom.hit_time));
        }

        println!("Compulsory Misses:    {}", self.stats.compulsory_miss);
        println!("Other Misses:         {}", self.stats.other_miss);
        println!("-----------------------------");
    }
}
