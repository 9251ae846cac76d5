use thiserror::Error;

use crate::commons::LevelId;

pub type SimResult<T> = Result<T, SimError>;

/// problems with the hierarchy configuration, caught before any set is allocated
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{level}: number of sets must be 0 or a power of two, got {sets}")]
    SetsNotPowerOfTwo { level: LevelId, sets: u32 },
    #[error("{level}: block size must be a power of two, got {block_size}")]
    BlockSizeNotPowerOfTwo { level: LevelId, block_size: u32 },
    #[error("{level}: associativity must be at least 1")]
    ZeroAssociativity { level: LevelId },
    #[error("{level}: hit time must be at least 1 cycle")]
    ZeroHitTime { level: LevelId },
    #[error("{level}: index and offset need {bits} bits, addresses only have 32")]
    AddressTooNarrow { level: LevelId, bits: u32 },
    #[error("slowest trace event takes {0} cycles, more than a u32 can count")]
    LatencyOverflow(u64),
    #[error("memory latency must be at least 1 cycle")]
    ZeroMemspeed,
    #[error("malformed geometry `{0}`, expected sets:assoc:blocksize:hittime")]
    MalformedGeometry(String),
    #[error("unknown prefetch policy `{0}`, expected next-line or stride")]
    UnknownPrefetchPolicy(String),
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("trace line {line}: {reason} in `{text}`")]
    Trace {
        line: usize,
        text: String,
        reason: &'static str,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
