// ID3v2 tag, frame and chapter decoding
pub mod chapters;
pub mod frames;
pub mod v2;

pub use chapters::{Chapter, ChapterToc};
pub use v2::{Id3Frame, Id3v2Tag, Version};
