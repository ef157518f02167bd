//! Readable archive sources
//!
//! Lifecycles and buildpacks are distributed as tar archives, optionally
//! gzip-compressed, or as plain directories. A [`Blob`] hides the difference
//! and always yields an uncompressed tar stream.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::{BuilderError, BuilderResult};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A source of a tar stream that can be opened any number of times
pub trait Blob {
    /// Open a fresh reader positioned at the start of the tar stream
    fn open(&self) -> BuilderResult<Box<dyn Read + '_>>;
}

/// Blob backed by a path on disk: a `.tar`, a `.tgz`, or a directory
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive a directory in memory, with entry names relative to its root
    fn archive_dir(&self) -> BuilderResult<Vec<u8>> {
        let mut tw = tar::Builder::new(Vec::new());
        tw.follow_symlinks(false);
        tw.append_dir_all(".", &self.path).map_err(|e| {
            BuilderError::io(format!("archiving directory {}", self.path.display()), e)
        })?;
        tw.into_inner().map_err(|e| {
            BuilderError::io(format!("archiving directory {}", self.path.display()), e)
        })
    }
}

impl Blob for FileBlob {
    fn open(&self) -> BuilderResult<Box<dyn Read + '_>> {
        if self.path.is_dir() {
            return Ok(Box::new(Cursor::new(self.archive_dir()?)));
        }

        let file = File::open(&self.path)
            .map_err(|e| BuilderError::io(format!("opening blob {}", self.path.display()), e))?;
        maybe_gunzip(BufReader::new(file))
            .map_err(|e| BuilderError::io(format!("reading blob {}", self.path.display()), e))
    }
}

/// Blob held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBlob {
    data: Vec<u8>,
}

impl MemoryBlob {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Blob for MemoryBlob {
    fn open(&self) -> BuilderResult<Box<dyn Read + '_>> {
        maybe_gunzip(self.data.as_slice()).map_err(|e| BuilderError::io("reading memory blob", e))
    }
}

/// Wrap the reader in a gzip decoder when the stream starts with the gzip magic
fn maybe_gunzip<'a, R: BufRead + 'a>(mut reader: R) -> std::io::Result<Box<dyn Read + 'a>> {
    let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if compressed {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
