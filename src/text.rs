//! TEI texts and their citation-labelled passages.

use crate::citation::CitationScheme;
use crate::error::{ConvertError, Result};
use crate::source::{parse_xml, read_document};
use crate::urn::Urn;
use crate::xpath::{QName, XPath};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use std::path::{Path, PathBuf};

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\n]+").expect("whitespace pattern is valid"));

/// Passages keyed by their citation label (`"1"`, `"pr"`, ...).
pub type Passages = IndexMap<String, PassageTree>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassageTree {
    Text(String),
    Nested(Passages),
}

/// A TEI document following the CapiTainS guidelines.
#[derive(Debug, Clone)]
pub struct TeiText {
    pub urn: Urn,
    pub citation: CitationScheme,
    pub path: PathBuf,
    source: String,
}

impl TeiText {
    /// Loads a TEI file and reads its citation scheme.
    pub fn from_file(path: &Path, urn: Urn) -> Result<Self> {
        let source = read_document(path)?;
        let mut text = Self::from_source(source, urn)?;
        text.path = path.to_path_buf();
        Ok(text)
    }

    pub fn from_source(source: String, urn: Urn) -> Result<Self> {
        let citation = {
            let doc = parse_xml(&source)?;
            CitationScheme::from_refs_decl(&doc)?
        };

        Ok(Self {
            urn,
            citation,
            path: PathBuf::new(),
            source,
        })
    }

    /// Builds the nested passage mapping, one nesting level per citation
    /// level. Subtrees of elements named in `exclude` are left out of the
    /// passage text.
    pub fn nested_passages(&self, exclude: &[QName]) -> Result<Passages> {
        let doc = parse_xml(&self.source)?;

        let mut levels = Vec::with_capacity(self.citation.depth());
        for (depth, level) in self.citation.levels().iter().enumerate() {
            levels.push(if depth == 0 {
                XPath::parse(&level.full_path())?
            } else {
                XPath::parse(&level.xpath)?.into_relative()
            });
        }

        if levels.is_empty() {
            return Err(ConvertError::MissingCitation);
        }

        Ok(collect_level(doc.root(), &levels, exclude))
    }
}

fn collect_level(context: Node, levels: &[XPath], exclude: &[QName]) -> Passages {
    let (level, deeper) = match levels.split_first() {
        Some(split) => split,
        None => return Passages::new(),
    };
    let label_attribute = level.label_attribute();

    let mut passages = Passages::new();
    for (position, node) in level.select(context).into_iter().enumerate() {
        let label = label_attribute
            .and_then(|attr| attr.attribute(node))
            .map(str::to_string)
            .unwrap_or_else(|| (position + 1).to_string());

        let passage = if deeper.is_empty() {
            PassageTree::Text(passage_text(node, exclude))
        } else {
            PassageTree::Nested(collect_level(node, deeper, exclude))
        };
        passages.insert(label, passage);
    }
    passages
}

/// Plain text of a passage with XML whitespace runs collapsed to one space.
fn passage_text(node: Node, exclude: &[QName]) -> String {
    let mut raw = String::new();
    push_text(node, exclude, &mut raw);
    WHITESPACE.replace_all(&raw, " ").into_owned()
}

fn push_text(node: Node, exclude: &[QName], out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
        } else if child.is_element() && !exclude.iter().any(|name| name.matches(child)) {
            push_text(child, exclude, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><encodingDesc><refsDecl n="CTS">
    <cRefPattern n="line" replacementPattern="#xpath(/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1']/tei:l[@n='$2'])"/>
    <cRefPattern n="poem" replacementPattern="#xpath(/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1'])"/>
  </refsDecl></encodingDesc></teiHeader>
  <text><body><div type="edition">
    <div type="textpart" n="pr">
      <l n="1">Lector,   <note>a note</note>salve</l>
      <l n="2">Ave <orig>atque</orig> vale </l>
    </div>
    <div type="textpart" n="1">
      <l n="1">Hic est quem legis
        ille, quem requiris</l>
      <l n="1">duplicate label</l>
    </div>
  </div></body></text>
</TEI>"##;

    fn urn() -> Urn {
        "urn:cts:latinLit:phi1294.phi002.test-lat1".parse().unwrap()
    }

    fn leaf<'a>(passages: &'a Passages, path: &[&str]) -> &'a str {
        let (last, parents) = path.split_last().unwrap();
        let mut current = passages;
        for label in parents {
            match &current[*label] {
                PassageTree::Nested(nested) => current = nested,
                PassageTree::Text(_) => panic!("{label} is not nested"),
            }
        }
        match &current[*last] {
            PassageTree::Text(text) => text,
            PassageTree::Nested(_) => panic!("{last} is not a leaf"),
        }
    }

    #[test]
    fn test_nested_passages_follow_citation_scheme() {
        let text = TeiText::from_source(TEXT.to_string(), urn()).unwrap();
        assert_eq!(text.citation.meta(), "poem-line");

        let passages = text.nested_passages(&[]).unwrap();
        assert_eq!(passages.keys().collect::<Vec<_>>(), vec!["pr", "1"]);
        assert_eq!(leaf(&passages, &["pr", "1"]), "Lector, a notesalve");
        assert_eq!(leaf(&passages, &["pr", "2"]), "Ave atque vale ");
        assert_eq!(leaf(&passages, &["1", "1"]), "duplicate label");

        match &passages["1"] {
            PassageTree::Nested(lines) => assert_eq!(lines.len(), 1),
            PassageTree::Text(_) => panic!("poem should be nested"),
        }
    }

    #[test]
    fn test_nested_passages_exclude_nodes() {
        let text = TeiText::from_source(TEXT.to_string(), urn()).unwrap();
        let exclude = vec![
            QName::parse("tei:note").unwrap(),
            QName::parse("tei:orig").unwrap(),
        ];
        let passages = text.nested_passages(&exclude).unwrap();

        assert_eq!(leaf(&passages, &["pr", "1"]), "Lector, salve");
        assert_eq!(leaf(&passages, &["pr", "2"]), "Ave vale ");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let doc = parse_xml("<l>Hic est quem legis\n        ille,\tquem</l>").unwrap();
        assert_eq!(
            passage_text(doc.root_element(), &[]),
            "Hic est quem legis ille, quem"
        );
    }

    #[test]
    fn test_no_break_spaces_are_kept() {
        let doc = parse_xml("<l>M.\u{a0}Tullius  \r\n Cicero</l>").unwrap();
        assert_eq!(
            passage_text(doc.root_element(), &[]),
            "M.\u{a0}Tullius Cicero"
        );
    }

    #[test]
    fn test_text_without_citation_is_rejected() {
        let result = TeiText::from_source(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text/></TEI>"#.to_string(),
            urn(),
        );
        assert!(matches!(result, Err(ConvertError::MissingCitation)));
    }
}
