use std::io;
use thiserror::Error;

/// Everything that can stop a CHIP-8 program. None of these are recoverable;
/// a host is expected to halt and keep the last state around for inspection.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("memory access out of bounds at 0x{addr:04x}")]
    OutOfBounds { addr: usize },

    #[error("return with an empty call stack")]
    StackUnderflow,

    #[error("call stack exceeded {depth} entries")]
    StackOverflow { depth: usize },

    #[error("program is {len} bytes but only {max} fit in memory")]
    ProgramTooLarge { len: usize, max: usize },

    #[error("i/o error ({0})")]
    Io(#[from] io::Error),
}

/// A host setting that can't be used.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("rate must be a positive, finite number of times per second, got {0}")]
    BadRate(f64),
}
