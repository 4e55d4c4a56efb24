pub mod encoder;

pub use encoder::{Hcode, HuffmanEncoder};
pub use encoder::{FIXED_LITERAL_ENCODING, FIXED_OFFSET_ENCODING};
