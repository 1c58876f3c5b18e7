//! Chaptag - ID3v2 chapter and table-of-contents reader
//!
//! Decodes the CHAP and CTOC frames of ID3v2.2/2.3/2.4 tags, including the
//! sub-frames (titles, links, artwork) nested inside them.
//!
//! ```no_run
//! let audio = chaptag::AudioFile::open("episode.mp3")?;
//! for chapter in audio.chapters() {
//!     println!("{} {}ms {}", chapter.element_id, chapter.start_time, chapter.title());
//! }
//! # Ok::<(), chaptag::Id3Error>(())
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub mod error;
pub mod id3;
pub mod utils;

pub use error::{EmbeddedError, Field, Id3Error, Result};
pub use id3::chapters::{
    read_chap_frame, read_ctoc_frame, read_embedded_frames, Chapter, ChapterToc, EmbeddedFrames, TocFlags,
};
pub use id3::frames::{FrameData, Picture, PictureType};
pub use id3::v2::{Id3Frame, Id3v2Header, Id3v2Tag, Version};

/// Audio file and its ID3v2 tag, if it has one
#[derive(Debug)]
pub struct AudioFile {
    pub path: PathBuf,
    pub tag: Option<Id3v2Tag>,
}

impl AudioFile {
    /// Open a file and read the ID3v2 tag at its start
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let tag = Id3v2Tag::read(&mut reader)?;
        Ok(AudioFile { path, tag })
    }

    /// Tag version, `None` without a tag
    pub fn version(&self) -> Option<Version> {
        self.tag.as_ref().map(|t| t.version)
    }

    /// Chapters ordered by start time; ties keep tag order
    pub fn chapters(&self) -> Vec<&Chapter> {
        let mut chapters: Vec<&Chapter> = self.tag.iter().flat_map(|t| t.chapters()).collect();
        chapters.sort_by_key(|c| c.start_time);
        chapters
    }

    /// Tables of contents in tag order
    pub fn tables_of_contents(&self) -> Vec<&ChapterToc> {
        self.tag.iter().flat_map(|t| t.tables_of_contents()).collect()
    }
}
