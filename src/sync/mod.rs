//! The spread and compile engines.
//!
//! [`spread`] walks a source tree and mirrors it into a tree of bitmap
//! containers, rewriting only what changed since the previous run.
//! [`compile`] walks a container tree and reconstructs the original source,
//! verifying every file against its recorded digest.

mod compile;
mod fsutil;
mod spread;

pub use compile::compile;
pub use spread::spread;
