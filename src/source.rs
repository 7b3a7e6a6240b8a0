//! Loading XML source documents from disk.

use crate::error::{ConvertError, Result};
use content_inspector::{ContentType, inspect};
use log::debug;
use memmap2::MmapOptions;
use roxmltree::{Document, ParsingOptions};
use std::fs::File;
use std::path::Path;

const UTF8_BOM: &str = "\u{feff}";

/// Reads a UTF-8 document into memory.
///
/// Files are memory-mapped and sniffed before decoding; binary and
/// UTF-16/UTF-32 files are rejected as [`ConvertError::NotText`].
pub fn read_document(path: &Path) -> Result<String> {
    let io_error = |source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error)?;
    if file.metadata().map_err(io_error)?.len() == 0 {
        debug!("{} is empty", path.display());
        return Ok(String::new());
    }

    // SAFETY: the mapping is read-only and dropped before this function
    // returns; corpora are not expected to change while being converted.
    let mmap = unsafe { MmapOptions::new().map(&file).map_err(io_error)? };

    let sample_size = std::cmp::min(8192, mmap.len());
    match inspect(&mmap[..sample_size]) {
        ContentType::UTF_8 | ContentType::UTF_8_BOM => {}
        other => {
            debug!("{} sniffed as {:?}", path.display(), other);
            return Err(ConvertError::NotText {
                path: path.to_path_buf(),
            });
        }
    }

    let text = std::str::from_utf8(&mmap).map_err(|_| ConvertError::NotText {
        path: path.to_path_buf(),
    })?;

    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
}

/// Parses an XML document, allowing a DOCTYPE declaration.
pub fn parse_xml(text: &str) -> Result<Document<'_>> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Ok(Document::parse_with_options(text, options)?)
}
