use std::path::PathBuf;
use std::process;
use std::time::Instant;

use argh::FromArgs;
use env_logger::Env;
use log::{error, info};

use cachesim_hier::simulator::simulate;
use cachesim_hier::{utils, CacheSpec, HierarchySpec, PrefetchPolicy, SimResult};

/// Trace-driven timing simulator for an I$/D$ + L2 cache hierarchy.
#[derive(FromArgs, Debug)]
struct Opts {
    /// geometry of the I$ as sets:assoc:blocksize:hittime, 0 sets disables it
    #[argh(option, default = "HierarchySpec::default().icache")]
    icache: CacheSpec,

    /// geometry of the D$ as sets:assoc:blocksize:hittime, 0 sets disables it
    #[argh(option, default = "HierarchySpec::default().dcache")]
    dcache: CacheSpec,

    /// geometry of the L2$ as sets:assoc:blocksize:hittime, 0 sets disables it
    #[argh(option, default = "HierarchySpec::default().l2cache")]
    l2cache: CacheSpec,

    /// mark the L2$ as inclusive (no effect on the simulation)
    #[argh(switch)]
    inclusive: bool,

    /// prefetch into the I$ and D$ after every access
    #[argh(switch)]
    prefetch: bool,

    /// prefetch predictor, next-line or stride
    #[argh(option, default = "PrefetchPolicy::NextLine")]
    prefetch_policy: PrefetchPolicy,

    /// main memory latency in cycles
    #[argh(option, default = "100")]
    memspeed: u32,

    /// stop after this many trace events
    #[argh(option)]
    max_events: Option<usize>,

    /// trace file, read from stdin when absent
    #[argh(positional)]
    trace: Option<PathBuf>,
}

impl Opts {
    fn specs(&self) -> HierarchySpec {
        HierarchySpec {
            icache: self.icache,
            dcache: self.dcache,
            l2cache: self.l2cache,
            inclusive: self.inclusive,
            prefetch: self.prefetch,
            prefetch_policy: self.prefetch_policy,
            memspeed: self.memspeed,
        }
    }
}

fn run(opts: Opts) -> SimResult<()> {
    let specs = opts.specs();
    info!(
        "I$ {:?}, D$ {:?}, L2$ {:?}, memspeed {}, prefetch {} ({})",
        specs.icache, specs.dcache, specs.l2cache, specs.memspeed, specs.prefetch, specs.prefetch_policy
    );

    let trace = utils::read_trace(opts.trace.as_deref())?;

    let t0 = Instant::now();
    let report = simulate(&specs, &trace, opts.max_events)?;
    let t1 = Instant::now();
    info!("execution time {:?}", t1 - t0);

    report.print();
    Ok(())
}

fn main() {
    // logging
    let env = Env::default()
        .filter_or("CACHESIM_LOG", "info")
        .write_style_or("CACHESIM_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    let opts: Opts = argh::from_env();
    if let Err(e) = run(opts) {
        error!("{}", e);
        process::exit(1);
    }
}
