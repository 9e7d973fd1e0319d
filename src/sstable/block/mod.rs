pub mod builder;
pub mod reader;

pub use builder::BlockBuilder;
pub use reader::{Block, BlockIterator};

/// Size of the trailing entry count.
pub const BLOCK_TRAILER_SIZE: usize = 4;
