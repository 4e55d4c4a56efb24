pub mod bits;
pub mod deflate;
pub mod error;
pub mod huffman;

pub use bits::BitWriter;
pub use deflate::fast::MatchFinder;
pub use deflate::tokens::Token;
pub use deflate::writer::BlockWriter;
pub use error::{Error, Result};
