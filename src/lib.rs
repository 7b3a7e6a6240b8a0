//! # cts2json Library
//!
//! Converts repositories following the CapiTainS guidelines (TEI texts
//! described by CTS `__cts__.xml` inventories) into the simplified JSON
//! corpora used by CLTK, where passages are addressed by position rather than
//! by citation label.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cts2json::{Config, run_conversion};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::new("canonical-latinLit");
//!     config.exclude_nodes = vec!["tei:note".to_string()];
//!
//!     let summary = run_conversion(config).await?;
//!     println!("{} files written", summary.written.len());
//!     Ok(())
//! }
//! ```
//!
//! The building blocks are public as well: [`parse_directory`] yields every
//! text of a repository with its metadata, [`make_json`] turns one of them
//! into a [`SimpleText`] document and [`to_number`] re-keys passages by
//! position.

pub mod citation;
pub mod cli;
pub mod converter;
pub mod error;
pub mod filewalker;
#[cfg(feature = "git")]
pub mod git;
pub mod inventory;
pub mod source;
pub mod text;
pub mod urn;
pub mod writer;
pub mod xpath;

pub use cli::Config;
pub use converter::{ConversionOptions, SimpleText, make_json, to_number};
pub use error::ConvertError;
pub use filewalker::{ParsedText, parse_directory};
pub use writer::JsonWriter;

use anyhow::{Context, Result};
use log::{error, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use xpath::QName;

/// Outcome of a conversion run.
#[derive(Debug, Default)]
pub struct ConversionSummary {
    /// Files written, in conversion order.
    pub written: Vec<PathBuf>,
    /// Editions whose conversion failed.
    pub failed: Vec<String>,
}

/// Converts a whole repository, cloning it first when `config.git_url` is set.
pub async fn run_conversion(config: Config) -> Result<ConversionSummary> {
    let exclude = config
        .exclude_nodes
        .iter()
        .map(|name| QName::parse(name).with_context(|| format!("Invalid node to exclude: {name}")))
        .collect::<Result<Vec<_>>>()?;

    let writer = JsonWriter::create(&config.output_dir).await?;

    let mut options = ConversionOptions {
        exclude,
        credit: config.credit.clone().unwrap_or_default(),
        commit: None,
    };
    clone_if_requested(&config, &mut options).await?;

    let texts = parse_directory(&config.directory)?;

    let mut summary = ConversionSummary::default();
    let mut filenames = HashSet::new();
    for parsed in texts {
        let edition_path = parsed
            .edition
            .path
            .as_deref()
            .unwrap_or(parsed.text.path.as_path())
            .display()
            .to_string();

        let converted = make_json(
            &parsed.text,
            &parsed.textgroup,
            &parsed.work,
            &parsed.edition,
            &options,
        )
        .map_err(anyhow::Error::from);

        let written = match converted {
            Ok((document, filename)) => {
                if !filenames.insert(filename.clone()) {
                    warn!("{} overwrites an earlier edition's {}", edition_path, filename);
                }
                writer.write_document(&filename, &document).await
            }
            Err(err) => Err(err),
        };

        match written {
            Ok(path) => {
                info!("Writing {}", path.display());
                summary.written.push(path);
            }
            Err(err) => {
                error!("{} issued an error\n {:#}", edition_path, err);
                summary.failed.push(parsed.edition.urn.to_string());
            }
        }
    }

    info!(
        "Converted {} texts into {} ({} failed)",
        summary.written.len(),
        writer.output_dir().display(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Clones `config.git_url` into the conversion directory and records the
/// credit line and commit the documents are stamped with.
#[cfg(feature = "git")]
async fn clone_if_requested(config: &Config, options: &mut ConversionOptions) -> Result<()> {
    let Some(url) = config.git_url.clone() else {
        return Ok(());
    };

    if config.credit.is_none() {
        options.credit = format!("Downloaded from {url}");
    }

    let dest = config.directory.clone();
    let branch = config.git_branch.clone();
    let cloned = tokio::task::spawn_blocking(move || {
        git::clone_repository(&url, &dest, branch.as_deref())
    })
    .await
    .context("Clone task panicked")??;

    options.commit = Some(cloned.head_commit);
    Ok(())
}

#[cfg(not(feature = "git"))]
async fn clone_if_requested(_config: &Config, _options: &mut ConversionOptions) -> Result<()> {
    Ok(())
}
