use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

// system specs

/// geometry of one cache as given on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSpec {     // unit         reasonable defaults (L1 / L2)
    pub sets: u32,         // sets         16 / 128, 0 disables the cache
    pub assoc: u32,        // blocks       4 / 8
    pub block_size: u32,   // bytes        32 / 64
    pub hit_time: u32,     // cpu cycles   1 / 10
}

impl CacheSpec {
    pub const DISABLED: CacheSpec = CacheSpec { sets: 0, assoc: 0, block_size: 0, hit_time: 0 };

    pub fn enabled(&self) -> bool {
        self.sets != 0
    }
}

impl FromStr for CacheSpec {
    type Err = ConfigError;

    /// parses `sets:assoc:blocksize:hittime`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedGeometry(s.to_string());
        let fields = s
            .split(':')
            .map(|f| f.trim().parse::<u32>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        match fields.as_slice() {
            &[sets, assoc, block_size, hit_time] => Ok(CacheSpec { sets, assoc, block_size, hit_time }),
            _ => Err(malformed()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrefetchPolicy {
    #[default]
    NextLine,
    Stride,
}

impl FromStr for PrefetchPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "next-line" | "nextline" => Ok(PrefetchPolicy::NextLine),
            "stride" => Ok(PrefetchPolicy::Stride),
            _ => Err(ConfigError::UnknownPrefetchPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for PrefetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefetchPolicy::NextLine => write!(f, "next-line"),
            PrefetchPolicy::Stride => write!(f, "stride"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HierarchySpec {
    pub icache: CacheSpec,
    pub dcache: CacheSpec,
    pub l2cache: CacheSpec,
    pub inclusive: bool,     // accepted, no inclusion policy is modelled
    pub prefetch: bool,
    pub prefetch_policy: PrefetchPolicy,
    pub memspeed: u32,       // cpu cycles
}

impl Default for HierarchySpec {
    fn default() -> Self {
        HierarchySpec {
            icache: CacheSpec { sets: 16, assoc: 4, block_size: 32, hit_time: 1 },
            dcache: CacheSpec { sets: 16, assoc: 4, block_size: 32, hit_time: 1 },
            l2cache: CacheSpec { sets: 128, assoc: 8, block_size: 64, hit_time: 10 },
            inclusive: false,
            prefetch: false,
            prefetch_policy: PrefetchPolicy::NextLine,
            memspeed: 100,
        }
    }
}

impl HierarchySpec {
    /// Check every level and hand back the I$, D$ and L2$ geometries.
    ///
    /// Besides the per-level shape, the slowest event (an I$ and a D$ access
    /// that both go all the way to memory) must fit in a `u32` cycle count.
    pub fn validate(&self) -> Result<[Geometry; 3], ConfigError> {
        let icache = Geometry::new(LevelId::ICache, &self.icache)?;
        let dcache = Geometry::new(LevelId::DCache, &self.dcache)?;
        let l2cache = Geometry::new(LevelId::L2, &self.l2cache)?;
        if self.memspeed == 0 {
            return Err(ConfigError::ZeroMemspeed);
        }

        let below_l1 = l2cache.worst_hit_time() + self.memspeed as u64;
        let worst = icache.worst_hit_time() + dcache.worst_hit_time() + 2 * below_l1;
        if worst > u32::MAX as u64 {
            return Err(ConfigError::LatencyOverflow(worst));
        }
        Ok([icache, dcache, l2cache])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelId {
    ICache,
    DCache,
    L2,
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelId::ICache => write!(f, "I$"),
            LevelId::DCache => write!(f, "D$"),
            LevelId::L2 => write!(f, "L2$"),
        }
    }
}

// geometry

/// index of the most significant set bit, i.e. log2 for powers of two
pub fn msb_index(n: u32) -> u32 {
    31 - n.max(1).leading_zeros()
}

/// a validated cache geometry together with the derived decoding parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub sets: u32,
    pub assoc: u32,
    pub block_size: u32,
    pub hit_time: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
    pub index_mask: u32,
}

impl Geometry {
    pub fn new(level: LevelId, spec: &CacheSpec) -> Result<Self, ConfigError> {
        if !spec.enabled() {
            return Ok(Geometry {
                sets: 0,
                assoc: spec.assoc,
                block_size: spec.block_size,
                hit_time: spec.hit_time,
                index_bits: 0,
                offset_bits: 0,
                index_mask: 0,
            });
        }
        if !spec.sets.is_power_of_two() {
            return Err(ConfigError::SetsNotPowerOfTwo { level, sets: spec.sets });
        }
        if !spec.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo { level, block_size: spec.block_size });
        }
        if spec.assoc == 0 {
            return Err(ConfigError::ZeroAssociativity { level });
        }
        if spec.hit_time == 0 {
            return Err(ConfigError::ZeroHitTime { level });
        }
        let index_bits = msb_index(spec.sets);
        let offset_bits = msb_index(spec.block_size);
        if index_bits + offset_bits > 32 {
            return Err(ConfigError::AddressTooNarrow { level, bits: index_bits + offset_bits });
        }
        Ok(Geometry {
            sets: spec.sets,
            assoc: spec.assoc,
            block_size: spec.block_size,
            hit_time: spec.hit_time,
            index_bits,
            offset_bits,
            index_mask: spec.sets - 1,
        })
    }

    pub fn enabled(&self) -> bool {
        self.sets != 0
    }

    /// hit time charged by this level on the way down, 0 when bypassed
    fn worst_hit_time(&self) -> u64 {
        if self.enabled() {
            self.hit_time as u64
        } else {
            0
        }
    }
}

// addresses

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Addr(pub u32);

impl Addr {
    /// get set index and tag of this address under the given geometry
    pub fn pos(&self, geom: &Geometry) -> (usize, u32) {
        decode(self.0, geom.offset_bits, geom.index_bits, geom.index_mask)
    }
}

pub fn decode(addr: u32, offset_bits: u32, index_bits: u32, index_mask: u32) -> (usize, u32) {
    let index = addr.checked_shr(offset_bits).unwrap_or(0) & index_mask;
    let tag = addr.checked_shr(offset_bits + index_bits).unwrap_or(0);
    (index as usize, tag)
}

// trace events

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dir {
    Read,
    Write,
}

/// one line of the trace: an instruction at `pc` touching data at `addr`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Access {
    pub pc: u32,
    pub addr: u32,
    pub dir: Dir,
}

pub type Trace = Vec<Access>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_index_is_log2_for_powers_of_two() {
        assert_eq!(msb_index(1), 0);
        assert_eq!(msb_index(2), 1);
        assert_eq!(msb_index(16), 4);
        assert_eq!(msb_index(1 << 31), 31);
    }

    #[test]
    fn decode_splits_offset_index_and_tag() {
        let spec = CacheSpec { sets: 4, assoc: 1, block_size: 16, hit_time: 1 };
        let geom = Geometry::new(LevelId::ICache, &spec).unwrap();
        assert_eq!((geom.offset_bits, geom.index_bits, geom.index_mask), (4, 2, 3));
        assert_eq!(Addr(0).pos(&geom), (0, 0));
        assert_eq!(Addr(0x1f).pos(&geom), (1, 0));
        assert_eq!(Addr(64).pos(&geom), (0, 1));
        assert_eq!(Addr(0xffff_ffff).pos(&geom), (3, 0x03ff_ffff));
    }

    #[test]
    fn full_width_geometry_leaves_empty_tag() {
        let spec = CacheSpec { sets: 1 << 16, assoc: 1, block_size: 1 << 16, hit_time: 1 };
        let geom = Geometry::new(LevelId::L2, &spec).unwrap();
        assert_eq!(Addr(0xabcd_1234).pos(&geom), (0xabcd, 0));
    }

    #[test]
    fn geometry_rejects_bad_shapes() {
        let ok = CacheSpec { sets: 8, assoc: 2, block_size: 32, hit_time: 1 };
        assert_eq!(
            Geometry::new(LevelId::DCache, &CacheSpec { sets: 6, ..ok }),
            Err(ConfigError::SetsNotPowerOfTwo { level: LevelId::DCache, sets: 6 })
        );
        assert_eq!(
            Geometry::new(LevelId::DCache, &CacheSpec { block_size: 24, ..ok }),
            Err(ConfigError::BlockSizeNotPowerOfTwo { level: LevelId::DCache, block_size: 24 })
        );
        assert_eq!(
            Geometry::new(LevelId::L2, &CacheSpec { assoc: 0, ..ok }),
            Err(ConfigError::ZeroAssociativity { level: LevelId::L2 })
        );
        assert_eq!(
            Geometry::new(LevelId::ICache, &CacheSpec { hit_time: 0, ..ok }),
            Err(ConfigError::ZeroHitTime { level: LevelId::ICache })
        );
        assert_eq!(
            Geometry::new(LevelId::ICache, &CacheSpec { sets: 1 << 20, block_size: 1 << 20, ..ok }),
            Err(ConfigError::AddressTooNarrow { level: LevelId::ICache, bits: 40 })
        );
    }

    #[test]
    fn disabled_geometry_skips_validation() {
        let geom = Geometry::new(LevelId::L2, &CacheSpec { sets: 0, assoc: 0, block_size: 3, hit_time: 0 }).unwrap();
        assert!(!geom.enabled());
    }

    #[test]
    fn cache_spec_from_str() {
        assert_eq!(
            "64:2:16:3".parse::<CacheSpec>(),
            Ok(CacheSpec { sets: 64, assoc: 2, block_size: 16, hit_time: 3 })
        );
        assert!("64:2:16".parse::<CacheSpec>().is_err());
        assert!("64:2:x:1".parse::<CacheSpec>().is_err());
        assert!("".parse::<CacheSpec>().is_err());
    }

    #[test]
    fn prefetch_policy_from_str() {
        assert_eq!("stride".parse::<PrefetchPolicy>(), Ok(PrefetchPolicy::Stride));
        assert_eq!("Next-Line".parse::<PrefetchPolicy>(), Ok(PrefetchPolicy::NextLine));
        assert!("markov".parse::<PrefetchPolicy>().is_err());
    }

    #[test]
    fn zero_memspeed_is_rejected() {
        let spec = HierarchySpec { memspeed: 0, ..Default::default() };
        assert_eq!(spec.validate(), Err(ConfigError::ZeroMemspeed));
    }

    #[test]
    fn latencies_that_overflow_an_event_are_rejected() {
        let spec = HierarchySpec { memspeed: 3_000_000_000, ..Default::default() };
        // 1 + 1 + 2 * (10 + 3e9)
        assert_eq!(spec.validate(), Err(ConfigError::LatencyOverflow(6_000_000_022)));

        let mut spec = HierarchySpec::default();
        spec.icache.hit_time = u32::MAX;
        assert!(matches!(spec.validate(), Err(ConfigError::LatencyOverflow(_))));
    }

    #[test]
    fn largest_event_latency_still_validates() {
        let spec = HierarchySpec { memspeed: 2_147_483_636, ..Default::default() };
        let [icache, dcache, l2cache] = spec.validate().unwrap();
        assert_eq!((icache.hit_time, dcache.hit_time, l2cache.hit_time), (1, 1, 10));
        assert!(HierarchySpec { memspeed: 2_147_483_637, ..spec }.validate().is_err());
    }

    #[test]
    fn bypassed_levels_do_not_count_toward_latency() {
        let spec = HierarchySpec {
            icache: CacheSpec::DISABLED,
            dcache: CacheSpec::DISABLED,
            l2cache: CacheSpec { hit_time: u32::MAX, ..CacheSpec::DISABLED },
            memspeed: u32::MAX / 2,
            ..Default::default()
        };
        assert!(spec.validate().is_ok());
    }
}
