use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{trace, warn};

use super::matcher::Matcher;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::FileResult;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Helper function to decode bytes into a String according to encoding mode
fn decode_bytes(bytes: &[u8], path: &Path, encoding_mode: EncodingMode) -> SearchResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => match std::str::from_utf8(bytes) {
            Ok(valid_str) => Ok(valid_str.to_owned()),
            Err(e) => Err(SearchError::encoding_error(path, e.to_string())),
        },
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(cow.into_owned())
        }
    }
}

/// Reads files as text and runs the matcher over them
#[derive(Clone, Copy)]
pub struct FileProcessor<'a> {
    matcher: &'a dyn Matcher,
    encoding_mode: EncodingMode,
}

impl<'a> FileProcessor<'a> {
    /// Creates a new FileProcessor with the given matcher
    pub fn new(matcher: &'a dyn Matcher, encoding_mode: EncodingMode) -> Self {
        Self {
            matcher,
            encoding_mode,
        }
    }

    /// Read a small file in one call
    fn read_small_file(&self, path: &Path) -> SearchResult<String> {
        trace!("Using simple file reading for: {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| SearchError::from_io(path, e))?;
        decode_bytes(&bytes, path, self.encoding_mode)
    }

    /// Read a file using buffered reading
    fn read_file_buffered(&self, path: &Path) -> SearchResult<String> {
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SearchError::from_io(path, e))?;

        decode_bytes(&bytes, path, self.encoding_mode)
    }

    /// Read a file using memory mapping
    fn read_mmap_file(&self, path: &Path) -> SearchResult<String> {
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        // The mapping lives only for the decode below; files are never written during a run
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::from_io(path, e))?;

        decode_bytes(&mmap, path, self.encoding_mode)
    }

    /// Reads the whole file as text, choosing a strategy by size
    pub fn read_text(&self, path: &Path) -> SearchResult<String> {
        match path.metadata() {
            Ok(metadata) if metadata.is_dir() => Err(SearchError::read_failed(
                path,
                "is a directory, not a file",
            )),
            Ok(metadata) => {
                let size = metadata.len();
                if size < SMALL_FILE_THRESHOLD {
                    self.read_small_file(path)
                } else if size >= LARGE_FILE_THRESHOLD {
                    self.read_mmap_file(path)
                } else {
                    self.read_file_buffered(path)
                }
            }
            Err(e) => {
                trace!("Failed to get metadata for {}: {}", path.display(), e);
                self.read_file_buffered(path)
            }
        }
    }

    /// Processes a file and returns the keywords found in it
    pub fn process_file(&self, path: &Path) -> SearchResult<FileResult> {
        trace!("Processing file: {}", path.display());

        let contents = self.read_text(path)?;
        let keywords = self
            .matcher
            .matching_keywords(&contents)
            .into_iter()
            .map(str::to_string)
            .collect();

        Ok(FileResult {
            path: path.to_path_buf(),
            bytes: contents.len(),
            keywords,
        })
    }
}
