//! Citation schemes declared by TEI `refsDecl` elements.
//!
//! A scheme is read from the `cRefPattern` children of the CTS `refsDecl`:
//!
//! ```xml
//! <refsDecl n="CTS">
//!   <cRefPattern n="line" replacementPattern="#xpath(/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1']/tei:l[@n='$2'])"/>
//!   <cRefPattern n="book" replacementPattern="#xpath(/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1'])"/>
//! </refsDecl>
//! ```
//!
//! Each level's path is split into a `scope` (the part shared with the
//! enclosing level) and an `xpath` (the steps the level adds).

use crate::error::{ConvertError, Result};
use crate::xpath::{TEI_NS, XPath, split_steps};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node};

static XPATH_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#xpath\((.+)\)$").expect("scheme pattern is valid"));

static PLACEHOLDERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\d+").expect("placeholder pattern is valid"));

/// One level of a citation scheme, e.g. `book` or `line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub name: Option<String>,
    pub xpath: String,
    pub scope: String,
}

impl Citation {
    pub fn full_path(&self) -> String {
        format!("{}{}", self.scope, self.xpath)
    }

    fn with_double_quotes(&self) -> Self {
        Self {
            name: self.name.clone(),
            xpath: self.xpath.replace('\'', "\""),
            scope: self.scope.replace('\'', "\""),
        }
    }
}

/// Citation levels ordered from the outermost to the innermost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationScheme {
    levels: Vec<Citation>,
}

fn is_tei(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(TEI_NS)
}

impl CitationScheme {
    pub fn levels(&self) -> &[Citation] {
        &self.levels
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Reads the scheme of a TEI document, preferring `refsDecl[@n='CTS']`.
    pub fn from_refs_decl(doc: &Document) -> Result<Self> {
        let refs_decls: Vec<Node> = doc
            .descendants()
            .filter(|n| is_tei(n, "refsDecl"))
            .collect();

        let refs_decl = refs_decls
            .iter()
            .find(|n| n.attribute("n") == Some("CTS"))
            .or_else(|| {
                refs_decls
                    .iter()
                    .find(|n| n.children().any(|c| is_tei(&c, "cRefPattern")))
            })
            .ok_or(ConvertError::MissingCitation)?;

        let patterns = refs_decl
            .children()
            .filter(|c| is_tei(c, "cRefPattern"))
            .map(|pattern| {
                let replacement = pattern.attribute("replacementPattern").ok_or(
                    ConvertError::MissingAttribute {
                        element: "cRefPattern",
                        attribute: "replacementPattern",
                    },
                )?;
                Ok((pattern.attribute("n"), replacement))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_patterns(patterns)
    }

    /// Builds a scheme from `(name, replacementPattern)` pairs in any order.
    pub fn from_patterns<'a>(
        patterns: impl IntoIterator<Item = (Option<&'a str>, &'a str)>,
    ) -> Result<Self> {
        let mut paths = patterns
            .into_iter()
            .map(|(name, replacement)| {
                let path = XPATH_SCHEME
                    .captures(replacement.trim())
                    .map(|caps| caps[1].trim().to_string())
                    .ok_or_else(|| ConvertError::InvalidCitation(replacement.to_string()))?;
                Ok((PLACEHOLDERS.find_iter(&path).count(), name, path))
            })
            .collect::<Result<Vec<_>>>()?;

        if paths.is_empty() {
            return Err(ConvertError::MissingCitation);
        }
        paths.sort_by_key(|(placeholders, _, _)| *placeholders);

        let mut levels = Vec::with_capacity(paths.len());
        let mut enclosing_steps: Option<usize> = None;
        for (_, name, path) in &paths {
            XPath::parse(path)?;
            let steps = split_steps(path)?;

            let split_at = enclosing_steps.unwrap_or(steps.len() - 1);
            if split_at >= steps.len() {
                return Err(ConvertError::InvalidCitation(path.clone()));
            }

            levels.push(Citation {
                name: name.map(str::to_string),
                scope: steps[..split_at].concat(),
                xpath: steps[split_at..].concat(),
            });
            enclosing_steps = Some(steps.len());
        }

        Ok(Self { levels })
    }

    /// Rebuilds the scheme level by level with every quoted literal in
    /// double quotes, the form inventories expect.
    pub fn restitch(&self) -> Self {
        Self {
            levels: self.levels.iter().map(Citation::with_double_quotes).collect(),
        }
    }

    /// Level names joined with `-`, e.g. `book-poem-line`.
    pub fn meta(&self) -> String {
        self.levels
            .iter()
            .map(|level| {
                level
                    .name
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("unknown")
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}
