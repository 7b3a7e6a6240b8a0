//! CTS inventory metadata: text groups, works and their editions.
//!
//! CapiTainS repositories describe their content with one `__cts__.xml` file
//! per text group and per work:
//!
//! ```xml
//! <ti:work xmlns:ti="http://chs.harvard.edu/xmlns/cts" groupUrn="urn:cts:latinLit:phi1294"
//!          urn="urn:cts:latinLit:phi1294.phi002" xml:lang="lat">
//!   <ti:title xml:lang="eng">Epigrammata</ti:title>
//!   <ti:edition workUrn="urn:cts:latinLit:phi1294.phi002" urn="urn:cts:latinLit:phi1294.phi002.perseus-lat2">
//!     <ti:label xml:lang="eng">Epigrammata</ti:label>
//!     <ti:description xml:lang="eng">Martial. Epigrams. Walter C. A. Ker. 1919.</ti:description>
//!   </ti:edition>
//! </ti:work>
//! ```
//!
//! The same elements nested under a `ti:TextInventory` root form a full
//! inventory, see [`TextInventory`].

use crate::citation::CitationScheme;
use crate::error::{ConvertError, Result};
use crate::source::parse_xml;
use crate::urn::Urn;
use crate::xpath::{CTS_NS, XML_NS};
use indexmap::IndexMap;
use roxmltree::Node;
use std::path::PathBuf;

fn is_cts(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(CTS_NS)
}

fn xml_lang<'a>(node: &Node<'a, '_>) -> Option<&'a str> {
    node.attribute((XML_NS, "lang"))
}

fn required_urn(node: &Node, element: &'static str) -> Result<Urn> {
    node.attribute("urn")
        .ok_or(ConvertError::MissingAttribute {
            element,
            attribute: "urn",
        })?
        .parse()
}

fn expect_root<'a, 'i>(
    doc: &'a roxmltree::Document<'i>,
    expected: &'static str,
) -> Result<Node<'a, 'i>> {
    let root = doc.root_element();
    if is_cts(&root, expected) {
        Ok(root)
    } else {
        Err(ConvertError::UnexpectedRoot {
            expected,
            found: root.tag_name().name().to_string(),
        })
    }
}

/// Strings keyed by language code, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedText(IndexMap<String, String>);

impl LocalizedText {
    fn from_children(node: &Node, name: &str) -> Self {
        let mut text = Self::default();
        for child in node.children().filter(|c| is_cts(c, name)) {
            let value: String = child
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            text.insert(xml_lang(&child).unwrap_or("unk"), value.trim());
        }
        text
    }

    pub fn insert(&mut self, lang: &str, value: &str) {
        self.0.insert(lang.to_string(), value.to_string());
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.get(lang).map(String::as_str)
    }

    /// The value in `lang`, else the first declared one.
    pub fn preferred(&self, lang: &str) -> Option<&str> {
        self.get(lang)
            .or_else(|| self.0.values().next().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGroup {
    pub urn: Urn,
    pub groupnames: LocalizedText,
}

impl TextGroup {
    /// Parses a text group `__cts__.xml` document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = parse_xml(xml)?;
        Self::from_node(&expect_root(&doc, "textgroup")?)
    }

    fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            urn: required_urn(node, "textgroup")?,
            groupnames: LocalizedText::from_children(node, "groupname"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditionKind {
    Edition,
    Translation,
}

impl EditionKind {
    fn from_element(node: &Node) -> Option<Self> {
        if !node.is_element() || node.tag_name().namespace() != Some(CTS_NS) {
            return None;
        }
        match node.tag_name().name() {
            "edition" => Some(Self::Edition),
            "translation" => Some(Self::Translation),
            _ => None,
        }
    }
}

/// An edition or translation of a work. Commentaries are not converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    pub urn: Urn,
    pub kind: EditionKind,
    /// Language of the text; editions inherit the language of their work.
    pub lang: Option<String>,
    pub labels: LocalizedText,
    pub descriptions: LocalizedText,
    /// Location of the TEI file, once resolved against a repository.
    pub path: Option<PathBuf>,
    /// Citation scheme read from the TEI file.
    pub citation: Option<CitationScheme>,
}

impl Edition {
    fn from_node(node: &Node, kind: EditionKind, work_lang: Option<&str>) -> Result<Self> {
        Ok(Self {
            urn: required_urn(node, "edition")?,
            kind,
            lang: xml_lang(node).or(work_lang).map(str::to_string),
            labels: LocalizedText::from_children(node, "label"),
            descriptions: LocalizedText::from_children(node, "description"),
            path: None,
            citation: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub urn: Urn,
    pub lang: Option<String>,
    pub titles: LocalizedText,
    pub editions: Vec<Edition>,
}

impl Work {
    /// Parses a work `__cts__.xml` document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = parse_xml(xml)?;
        Self::from_node(&expect_root(&doc, "work")?)
    }

    fn from_node(node: &Node) -> Result<Self> {
        let lang = xml_lang(node);
        let editions = node
            .children()
            .filter_map(|child| EditionKind::from_element(&child).map(|kind| (child, kind)))
            .map(|(child, kind)| Edition::from_node(&child, kind, lang))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            urn: required_urn(node, "work")?,
            lang: lang.map(str::to_string),
            titles: LocalizedText::from_children(node, "title"),
            editions,
        })
    }
}

/// A full CTS inventory.
#[derive(Debug, Clone, Default)]
pub struct TextInventory {
    textgroups: Vec<TextGroup>,
    works: Vec<Work>,
}

impl TextInventory {
    /// Parses a `ti:TextInventory` document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let doc = parse_xml(xml)?;
        let root = expect_root(&doc, "TextInventory")?;

        let mut inventory = Self::default();
        for group in root.children().filter(|c| is_cts(c, "textgroup")) {
            inventory.add_textgroup(TextGroup::from_node(&group)?);
            for work in group.children().filter(|c| is_cts(c, "work")) {
                inventory.add_work(Work::from_node(&work)?);
            }
        }
        Ok(inventory)
    }

    pub fn add_textgroup(&mut self, textgroup: TextGroup) {
        self.textgroups.push(textgroup);
    }

    pub fn add_work(&mut self, work: Work) {
        self.works.push(work);
    }

    pub fn textgroups(&self) -> &[TextGroup] {
        &self.textgroups
    }

    pub fn works(&self) -> &[Work] {
        &self.works
    }

    pub fn textgroup(&self, urn: &str) -> Option<&TextGroup> {
        self.textgroups.iter().find(|tg| tg.urn.as_str() == urn)
    }

    pub fn work(&self, urn: &str) -> Option<&Work> {
        self.works.iter().find(|w| w.urn.as_str() == urn)
    }

    pub fn edition(&self, urn: &str) -> Option<&Edition> {
        self.works
            .iter()
            .flat_map(|w| w.editions.iter())
            .find(|e| e.urn.as_str() == urn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXTGROUP: &str = r#"<ti:textgroup xmlns:ti="http://chs.harvard.edu/xmlns/cts" urn="urn:cts:latinLit:phi1294">
  <ti:groupname xml:lang="lat">Martialis</ti:groupname>
  <ti:groupname xml:lang="eng">Martial</ti:groupname>
</ti:textgroup>"#;

    const WORK: &str = r#"<ti:work xmlns:ti="http://chs.harvard.edu/xmlns/cts" groupUrn="urn:cts:latinLit:phi1294"
    urn="urn:cts:latinLit:phi1294.phi002" xml:lang="lat">
  <ti:title xml:lang="eng">Epigrammata</ti:title>
  <ti:edition workUrn="urn:cts:latinLit:phi1294.phi002" urn="urn:cts:latinLit:phi1294.phi002.perseus-lat2">
    <ti:label xml:lang="eng">Epigrammata</ti:label>
    <ti:description xml:lang="eng">
      Martial. Epigrams.
    </ti:description>
  </ti:edition>
  <ti:translation workUrn="urn:cts:latinLit:phi1294.phi002" urn="urn:cts:latinLit:phi1294.phi002.perseus-eng2" xml:lang="eng">
    <ti:label xml:lang="eng">Epigrams</ti:label>
    <ti:description xml:lang="fre">Martial traduit</ti:description>
  </ti:translation>
</ti:work>"#;

    #[test]
    fn test_textgroup_from_xml() {
        let textgroup = TextGroup::from_xml(TEXTGROUP).unwrap();
        assert_eq!(textgroup.urn.as_str(), "urn:cts:latinLit:phi1294");
        assert_eq!(textgroup.groupnames.get("eng"), Some("Martial"));
        assert_eq!(textgroup.groupnames.preferred("ger"), Some("Martialis"));
    }

    #[test]
    fn test_work_from_xml() {
        let work = Work::from_xml(WORK).unwrap();
        assert_eq!(work.urn.as_str(), "urn:cts:latinLit:phi1294.phi002");
        assert_eq!(work.lang.as_deref(), Some("lat"));
        assert_eq!(work.titles.get("eng"), Some("Epigrammata"));
        assert_eq!(work.editions.len(), 2);

        let edition = &work.editions[0];
        assert_eq!(edition.kind, EditionKind::Edition);
        assert_eq!(edition.lang.as_deref(), Some("lat"));
        assert_eq!(edition.descriptions.get("eng"), Some("Martial. Epigrams."));
        assert!(edition.path.is_none() && edition.citation.is_none());

        let translation = &work.editions[1];
        assert_eq!(translation.kind, EditionKind::Translation);
        assert_eq!(translation.lang.as_deref(), Some("eng"));
        assert_eq!(translation.descriptions.get("eng"), None);
        assert_eq!(translation.descriptions.preferred("eng"), Some("Martial traduit"));
    }

    #[test]
    fn test_commentaries_are_not_editions() {
        let xml = WORK.replace(
            "</ti:work>",
            r#"<ti:commentary workUrn="urn:cts:latinLit:phi1294.phi002" urn="urn:cts:latinLit:phi1294.phi002.comm-lat1">
    <ti:label xml:lang="eng">Commentary</ti:label>
  </ti:commentary>
</ti:work>"#,
        );
        let work = Work::from_xml(&xml).unwrap();

        assert_eq!(work.editions.len(), 2);
        assert!(
            work.editions
                .iter()
                .all(|e| !e.urn.as_str().ends_with("comm-lat1"))
        );
    }

    #[test]
    fn test_wrong_root_and_missing_urn() {
        assert!(matches!(
            TextGroup::from_xml(WORK),
            Err(ConvertError::UnexpectedRoot { expected: "textgroup", .. })
        ));
        assert!(matches!(
            TextGroup::from_xml(
                r#"<ti:textgroup xmlns:ti="http://chs.harvard.edu/xmlns/cts"/>"#
            ),
            Err(ConvertError::MissingAttribute { attribute: "urn", .. })
        ));
        assert!(matches!(
            Work::from_xml(r#"<ti:work xmlns:ti="http://chs.harvard.edu/xmlns/cts" urn="phi002"/>"#),
            Err(ConvertError::Urn(_))
        ));
    }

    #[test]
    fn test_full_inventory_lookups() {
        let xml = format!(
            r#"<ti:TextInventory xmlns:ti="http://chs.harvard.edu/xmlns/cts" tiid="test">
  <ti:textgroup urn="urn:cts:latinLit:phi1294">
    <ti:groupname xml:lang="eng">Martial</ti:groupname>
    {}
  </ti:textgroup>
</ti:TextInventory>"#,
            WORK.replace(r#"xmlns:ti="http://chs.harvard.edu/xmlns/cts" "#, "")
        );
        let inventory = TextInventory::from_xml(&xml).unwrap();

        assert_eq!(inventory.textgroups().len(), 1);
        assert_eq!(inventory.works().len(), 1);
        assert_eq!(
            inventory
                .textgroup("urn:cts:latinLit:phi1294")
                .and_then(|tg| tg.groupnames.get("eng")),
            Some("Martial")
        );
        assert!(inventory.work("urn:cts:latinLit:phi1294.phi002").is_some());
        assert_eq!(
            inventory
                .edition("urn:cts:latinLit:phi1294.phi002.perseus-eng2")
                .map(|e| e.kind),
            Some(EditionKind::Translation)
        );
        assert!(inventory.edition("urn:cts:latinLit:phi1294.phi002.missing").is_none());
    }
}
