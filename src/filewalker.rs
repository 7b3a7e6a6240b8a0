use crate::error::ConvertError;
use crate::inventory::{Edition, TextGroup, Work};
use crate::source::read_document;
use crate::text::TeiText;
use crate::urn::Urn;
use anyhow::{Result, bail};
use ignore::WalkBuilder;
use log::{debug, error, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const METADATA_FILE: &str = "__cts__.xml";

/// A text found in a repository, with the metadata it was declared under.
#[derive(Debug, Clone)]
pub struct ParsedText {
    pub text: TeiText,
    pub textgroup: Arc<TextGroup>,
    pub work: Arc<Work>,
    /// The declaring edition, with its file path and citation scheme filled in.
    pub edition: Edition,
}

/// Streams every text of a CapiTainS repository.
///
/// Text groups are read from `{directory}/data/*/__cts__.xml`, their works
/// from `{textgroup}/*/__cts__.xml`, and each declared edition from
/// `{work}/{textgroup}.{work}.{version}.xml`. Editions without a file are
/// skipped; metadata or texts that fail to parse are logged and skipped.
///
/// Only the missing `data` directory is reported up front. Everything else is
/// read while iterating, one text at a time.
pub fn parse_directory(directory: &Path) -> Result<impl Iterator<Item = ParsedText> + use<>> {
    let data = directory.join("data");
    if !data.is_dir() {
        bail!("No data directory found in {}", directory.display());
    }

    Ok(metadata_files(&data).into_iter().flat_map(textgroup_texts))
}

fn textgroup_texts(file: PathBuf) -> impl Iterator<Item = ParsedText> {
    let textgroup = match read_document(&file).and_then(|xml| TextGroup::from_xml(&xml)) {
        Ok(textgroup) => {
            debug!("Reading textgroup {}", textgroup.urn);
            Some(Arc::new(textgroup))
        }
        Err(err) => {
            error!("Error parsing {}: {err}", file.display());
            None
        }
    };
    let group_dir = file.parent().map(Path::to_path_buf);

    textgroup
        .zip(group_dir)
        .into_iter()
        .flat_map(|(textgroup, group_dir)| {
            metadata_files(&group_dir)
                .into_iter()
                .filter_map(load_work)
                .flat_map(move |(work, work_dir)| {
                    work_texts(Arc::clone(&textgroup), work, work_dir)
                })
        })
}

fn load_work(file: PathBuf) -> Option<(Arc<Work>, PathBuf)> {
    let work = match read_document(&file).and_then(|xml| Work::from_xml(&xml)) {
        Ok(work) => Arc::new(work),
        Err(err) => {
            error!("Error parsing {}: {err}", file.display());
            return None;
        }
    };
    let work_dir = file.parent()?.to_path_buf();
    Some((work, work_dir))
}

fn work_texts(
    textgroup: Arc<TextGroup>,
    work: Arc<Work>,
    work_dir: PathBuf,
) -> impl Iterator<Item = ParsedText> {
    (0..work.editions.len()).filter_map(move |index| {
        let edition = &work.editions[index];
        let Some(path) = edition_path(&work_dir, &edition.urn) else {
            warn!("{} does not name a version, skipping", edition.urn);
            return None;
        };
        if !path.is_file() {
            debug!("{} has no file at {}", edition.urn, path.display());
            return None;
        }

        match load_text(&path, edition) {
            Ok((text, edition)) => Some(ParsedText {
                text,
                textgroup: Arc::clone(&textgroup),
                work: Arc::clone(&work),
                edition,
            }),
            Err(err) => {
                error!(
                    "{} does not accept parsing at some level (most probably citation)",
                    path.display()
                );
                debug!("Exact error message: {err}");
                None
            }
        }
    })
}

fn load_text(path: &Path, edition: &Edition) -> Result<(TeiText, Edition), ConvertError> {
    let text = TeiText::from_file(path, edition.urn.clone())?;

    let mut edition = edition.clone();
    edition.path = Some(path.to_path_buf());
    edition.citation = Some(text.citation.restitch());

    Ok((text, edition))
}

/// `{work_dir}/{textgroup}.{work}.{version}.xml`
fn edition_path(work_dir: &Path, urn: &Urn) -> Option<PathBuf> {
    Some(work_dir.join(format!(
        "{}.{}.{}.xml",
        urn.textgroup(),
        urn.work()?,
        urn.version()?
    )))
}

/// Lists `{dir}/*/__cts__.xml` in file name order.
fn metadata_files(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(2))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for result in walker {
        match result {
            Ok(entry) => {
                if entry.depth() == 2
                    && entry.file_name() == METADATA_FILE
                    && entry.file_type().is_some_and(|t| t.is_file())
                {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                warn!("Error walking path: {err}");
            }
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn fixture_repo() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/repo")
    }

    fn collect_texts(directory: &Path) -> Vec<ParsedText> {
        parse_directory(directory).unwrap().collect()
    }

    fn copy_dir(from: &Path, to: &Path) {
        fs::create_dir_all(to).unwrap();
        for entry in fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            let target = to.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                fs::copy(entry.path(), target).unwrap();
            }
        }
    }

    #[test]
    fn test_parse_directory_finds_texts() {
        let parsed = collect_texts(&fixture_repo());
        let urns: Vec<_> = parsed.iter().map(|p| p.text.urn.to_string()).collect();
        assert_eq!(
            urns,
            vec![
                "urn:cts:latinLit:groupe_de_texte.oeuvre.version-lat1",
                "urn:cts:latinLit:textgroup.work.version-lat1",
            ]
        );
    }

    #[test]
    fn test_parse_directory_attaches_metadata() {
        let parsed = collect_texts(&fixture_repo());
        let text = &parsed[1];

        assert_eq!(text.textgroup.urn.as_str(), "urn:cts:latinLit:textgroup");
        assert_eq!(text.work.urn.as_str(), "urn:cts:latinLit:textgroup.work");
        assert_eq!(
            text.edition.path.as_deref(),
            Some(
                fixture_repo()
                    .join("data/textgroup/work/textgroup.work.version-lat1.xml")
                    .as_path()
            )
        );

        let citation = text.edition.citation.as_ref().unwrap();
        assert_eq!(citation.meta(), "book-poem-line");
        assert_eq!(citation.levels()[0].xpath, "/tei:div[@n=\"$1\"]");
        assert_eq!(text.text.citation.levels()[0].xpath, "/tei:div[@n='$1']");
    }

    #[test]
    fn test_parse_directory_requires_data_dir() {
        let dir = tempdir().unwrap();
        assert!(parse_directory(dir.path()).is_err());

        fs::create_dir(dir.path().join("data")).unwrap();
        assert!(collect_texts(dir.path()).is_empty());
    }

    #[test]
    fn test_texts_are_read_while_iterating() {
        let dir = tempdir().unwrap();
        copy_dir(&fixture_repo(), dir.path());

        let mut texts = parse_directory(dir.path()).unwrap();
        fs::remove_file(dir.path().join("data/textgroup/work/textgroup.work.version-lat1.xml"))
            .unwrap();

        let first = texts.next().unwrap();
        assert_eq!(
            first.text.urn.as_str(),
            "urn:cts:latinLit:groupe_de_texte.oeuvre.version-lat1"
        );
        assert!(texts.next().is_none());
    }

    #[test]
    fn test_broken_work_only_skips_that_work() {
        let dir = tempdir().unwrap();
        copy_dir(&fixture_repo(), dir.path());
        let sibling = dir.path().join("data/textgroup/aaa");
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join(METADATA_FILE), "<ti:work").unwrap();

        let urns: Vec<_> = collect_texts(dir.path())
            .iter()
            .map(|p| p.text.urn.to_string())
            .collect();
        assert_eq!(
            urns,
            vec![
                "urn:cts:latinLit:groupe_de_texte.oeuvre.version-lat1",
                "urn:cts:latinLit:textgroup.work.version-lat1",
            ]
        );
    }

    #[test]
    fn test_broken_textgroup_is_skipped() {
        let dir = tempdir().unwrap();
        let group = dir.path().join("data/broken");
        fs::create_dir_all(&group).unwrap();
        fs::write(group.join(METADATA_FILE), "<ti:textgroup").unwrap();

        assert!(collect_texts(dir.path()).is_empty());
    }

    #[test]
    fn test_edition_path() {
        let urn: Urn = "urn:cts:latinLit:phi1294.phi002.perseus-lat2".parse().unwrap();
        assert_eq!(
            edition_path(Path::new("data/phi1294/phi002"), &urn),
            Some(PathBuf::from(
                "data/phi1294/phi002/phi1294.phi002.perseus-lat2.xml"
            ))
        );

        let urn: Urn = "urn:cts:latinLit:phi1294.phi002".parse().unwrap();
        assert_eq!(edition_path(Path::new("data"), &urn), None);
    }
}
