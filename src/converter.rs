//! Conversion of parsed texts into the simplified CLTK JSON layout.
//!
//! ```json
//! {
//!     "original-urn":"urn:cts:latinLit:phi1294.phi002.perseus-lat2",
//!     "urn":"urn:cts:latinLit:phi1294.phi002.perseus-lat2-simple",
//!     "credit":"",
//!     "meta":"book-poem-line",
//!     "author":"martial",
//!     "work":"epigrammata",
//!     "edition":"Martial. Epigrams.",
//!     "text":{
//!         "0":{ "0":{ "0":"Spero me secutum..." } }
//!     }
//! }
//! ```

use crate::error::{ConvertError, Result};
use crate::inventory::{Edition, LocalizedText, TextGroup, Work};
use crate::text::{PassageTree, Passages, TeiText};
use crate::xpath::QName;
use serde::ser::{Serialize, SerializeMap, Serializer};

const METADATA_LANG: &str = "eng";

/// A passage addressed by position instead of citation label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberedPassage {
    Text(String),
    Nested(NumberedPassages),
}

/// Passages in document order; the index of each entry is its key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberedPassages(pub Vec<NumberedPassage>);

impl NumberedPassages {
    pub fn get(&self, index: usize) -> Option<&NumberedPassage> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NumberedPassages {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (index, passage) in self.0.iter().enumerate() {
            map.serialize_entry(&index, passage)?;
        }
        map.end()
    }
}

impl Serialize for NumberedPassage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NumberedPassage::Text(text) => serializer.serialize_str(text),
            NumberedPassage::Nested(nested) => nested.serialize(serializer),
        }
    }
}

/// Re-keys a labelled passage mapping by position, recursively.
pub fn to_number(passages: &Passages) -> NumberedPassages {
    NumberedPassages(
        passages
            .values()
            .map(|passage| match passage {
                PassageTree::Text(text) => NumberedPassage::Text(text.clone()),
                PassageTree::Nested(nested) => NumberedPassage::Nested(to_number(nested)),
            })
            .collect(),
    )
}

/// The JSON document written for each edition.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimpleText {
    #[serde(rename = "original-urn")]
    pub original_urn: String,
    pub urn: String,
    pub credit: String,
    pub meta: String,
    pub author: String,
    pub work: String,
    pub edition: String,
    pub text: NumberedPassages,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// Elements left out of passage text, e.g. `tei:note`.
    pub exclude: Vec<QName>,
    pub credit: String,
    pub commit: Option<String>,
}

fn metadata(text: &LocalizedText, field: &'static str, urn: &str) -> Result<String> {
    text.preferred(METADATA_LANG)
        .map(str::to_string)
        .ok_or_else(|| ConvertError::MissingMetadata {
            field,
            urn: urn.to_string(),
        })
}

/// Builds the JSON document of `text` and the file name it is stored under,
/// `{author}__{work}__{lang}.json`.
pub fn make_json(
    text: &TeiText,
    textgroup: &TextGroup,
    work: &Work,
    edition: &Edition,
    options: &ConversionOptions,
) -> Result<(SimpleText, String)> {
    let author = metadata(&textgroup.groupnames, "groupname", textgroup.urn.as_str())?.to_lowercase();
    let title = metadata(&work.titles, "title", work.urn.as_str())?.to_lowercase();
    let description = metadata(&edition.descriptions, "description", edition.urn.as_str())?;
    let lang = edition.lang.as_deref().unwrap_or("unk").to_lowercase();

    let filename = format!("{author}__{title}__{lang}.json").replace(' ', "_");

    let document = SimpleText {
        original_urn: text.urn.to_string(),
        urn: format!("{}-simple", text.urn),
        credit: options.credit.clone(),
        meta: text.citation.meta(),
        author,
        work: title,
        edition: description,
        text: to_number(&text.nested_passages(&options.exclude)?),
        commit: options.commit.clone(),
    };

    Ok((document, filename))
}
