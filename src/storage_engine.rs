//! The storage engine: on-disk layout, the hash index's slot state
//! machine, and the reader–writer coordination that lets lock-free reads
//! coexist with a single writer and background storage swaps.

mod constants;
pub use constants::*;

pub mod digest;

mod simd_copy;

mod byte_buffer;
pub use byte_buffer::ByteBuffer;

mod blob_region;
pub use blob_region::{BlobRegion, OutOfSpace};

mod meta;
pub use meta::Meta;

mod index;
pub use index::{Index, Slot, WriteOutcome};

mod engine;
pub use engine::{Engine, EngineConfig, EngineStats};
