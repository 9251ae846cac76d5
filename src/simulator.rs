use log::{debug, info};

use crate::commons::{Access, Dir, HierarchySpec, LevelId};
use crate::errors::SimResult;
use crate::hierarchy::MemoryHierarchy;
use crate::stats::Report;

/// Replays `trace` through a fresh hierarchy built from `specs`.
///
/// Every event fetches its instruction through the I$ and then touches its
/// data through the D$. With prefetching on, each first-level cache is then
/// warmed with the address its predictor names.
pub fn simulate(specs: &HierarchySpec, trace: &[Access], max_events: Option<usize>) -> SimResult<Report> {
    let mut hier = MemoryHierarchy::new(specs)?;
    let mut cycles = 0u64;
    let mut events = 0u64;

    for (i, ev) in trace.iter().enumerate() {
        if max_events.is_some_and(|m| i >= m) {
            info!("stopping after {} events", i);
            break;
        }
        cycles += step(&mut hier, ev) as u64;
        events += 1;
    }

    debug!("replayed {} events in {} cycles", events, cycles);
    let geometry = hier.geometry();
    let memspeed = hier.memspeed();
    let stats = hier.teardown();
    Ok(Report { events, cycles, geometry, memspeed, stats })
}

/// one trace event, returns the cycles it cost
pub fn step(hier: &mut MemoryHierarchy, ev: &Access) -> u32 {
    let mut t = hier.access_instruction(ev.pc);
    t += hier.access_data(ev.addr);

    if hier.prefetches_into(LevelId::ICache) {
        let next = hier.predict_next_instruction_address(ev.pc, ev.pc, Dir::Read);
        hier.prefetch_instruction(next);
    }
    if hier.prefetches_into(LevelId::DCache) {
        let next = hier.predict_next_data_address(ev.pc, ev.addr, ev.dir);
        hier.prefetch_data(next);
    }
    t
}
