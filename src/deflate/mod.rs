pub mod fast;
pub mod tables;
pub mod tokens;
pub mod writer;

pub use fast::MatchFinder;
pub use tokens::Token;
pub use writer::BlockWriter;

/// Largest payload of a stored block (LEN is a 16-bit field), and the
/// block granularity of the match-finder.
pub const MAX_STORE_BLOCK_SIZE: usize = 65535;
