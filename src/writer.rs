use crate::converter::SimpleText;
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Pretty-printer indenting by four spaces and separating keys from values
/// with a bare `:`, the layout CLTK corpora are published in.
pub struct CorpusFormatter {
    inner: PrettyFormatter<'static>,
}

impl Default for CorpusFormatter {
    fn default() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl Formatter for CorpusFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b":")
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }
}

/// Serializes `value` with [`CorpusFormatter`]. Non-ASCII text is kept as is.
pub fn to_corpus_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, CorpusFormatter::default());
    value
        .serialize(&mut serializer)
        .context("Failed to serialize JSON document")?;
    Ok(buffer)
}

/// Writes converted documents into an output directory.
pub struct JsonWriter {
    output_dir: PathBuf,
}

impl JsonWriter {
    /// Creates the output directory if needed.
    pub async fn create(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir).await.with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `document` as `{output_dir}/{filename}` and returns that path.
    pub async fn write_document(&self, filename: &str, document: &SimpleText) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        let json = to_corpus_json(document)?;

        debug!("Writing {} bytes to {}", json.len(), path.display());

        let file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer
            .flush()
            .await
            .with_context(|| format!("Failed to flush {}", path.display()))?;

        Ok(path)
    }
}
