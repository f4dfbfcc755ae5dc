mod compute_hash;
pub use compute_hash::compute_hash;
