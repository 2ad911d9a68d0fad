//! Output artifacts: per-clip GIFs and the documentation files.

pub mod document;
pub mod gif;

pub use document::{
    format_timestamp, DocumentExporter, ExportError, ExportMetadata, ExportedFiles, JSON_FILE_NAME,
    MARKDOWN_FILE_NAME,
};
pub use gif::{gif_relative_path, EncodeError, GifEncoder, GifRequest, GifskiEncoder};
