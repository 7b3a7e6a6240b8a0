//! A restricted XPath evaluator over `roxmltree` documents.
//!
//! CapiTainS citation patterns only ever use location paths made of child and
//! descendant steps with attribute predicates, e.g.
//! `/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1']/tei:l[@n='$2']`.
//! That subset is what this module understands. `$N` placeholders match any
//! value of their attribute, which is how every reference of a level is
//! enumerated.

use crate::error::{ConvertError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Node, NodeId};
use std::collections::HashSet;

pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";
pub const CTS_NS: &str = "http://chs.harvard.edu/xmlns/cts";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][\w.-]*$").expect("name pattern is valid"));

static CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@([\w.-]+(?::[\w.-]+)?)(?:\s*=\s*(?:'([^']*)'|"([^"]*)"))?$"#)
        .expect("condition pattern is valid")
});

static CONJUNCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+and\s+").expect("conjunction pattern is valid"));

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(\d+)$").expect("placeholder pattern is valid"));

fn resolve_prefix(prefix: &str) -> Result<&'static str> {
    match prefix {
        "tei" => Ok(TEI_NS),
        "ti" | "cts" => Ok(CTS_NS),
        "xml" => Ok(XML_NS),
        other => Err(ConvertError::UnknownPrefix(other.to_string())),
    }
}

fn unsupported(expr: &str, reason: &'static str) -> ConvertError {
    ConvertError::XPath {
        expr: expr.to_string(),
        reason,
    }
}

/// A possibly prefixed XML name such as `tei:note` or `n`.
///
/// Unprefixed element names match regardless of namespace; unprefixed
/// attribute names only match attributes without a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    namespace: Option<&'static str>,
    local: String,
}

impl QName {
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let (namespace, local) = match name.split_once(':') {
            Some((prefix, local)) => (Some(resolve_prefix(prefix)?), local),
            None => (None, name),
        };

        if !NAME.is_match(local) {
            return Err(unsupported(name, "invalid name"));
        }

        Ok(Self {
            namespace,
            local: local.to_string(),
        })
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn namespace(&self) -> Option<&'static str> {
        self.namespace
    }

    /// Whether `node` is an element with this name.
    pub fn matches(&self, node: Node) -> bool {
        node.is_element()
            && node.tag_name().name() == self.local
            && self
                .namespace
                .is_none_or(|ns| node.tag_name().namespace() == Some(ns))
    }

    /// Reads the attribute with this name from `node`.
    pub fn attribute<'a>(&self, node: Node<'a, '_>) -> Option<&'a str> {
        match self.namespace {
            Some(ns) => node.attribute((ns, self.local.as_str())),
            None => node.attribute(self.local.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone)]
enum NameTest {
    Any,
    Named(QName),
}

#[derive(Debug, Clone)]
enum Predicate {
    Exists(QName),
    Equals(QName, String),
    Placeholder(QName, usize),
}

impl Predicate {
    fn holds(&self, node: Node) -> bool {
        match self {
            Predicate::Exists(attr) | Predicate::Placeholder(attr, _) => {
                attr.attribute(node).is_some()
            }
            Predicate::Equals(attr, value) => attr.attribute(node) == Some(value.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn parse(raw: &str, expr: &str) -> Result<Self> {
        let (axis, rest) = if let Some(rest) = raw.strip_prefix("//") {
            (Axis::Descendant, rest)
        } else if let Some(rest) = raw.strip_prefix('/') {
            (Axis::Child, rest)
        } else {
            (Axis::Child, raw)
        };

        let (name, mut remaining) = match rest.find('[') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        let test = match name.trim() {
            "*" => NameTest::Any,
            name => NameTest::Named(QName::parse(name)?),
        };

        let mut predicates = Vec::new();
        while !remaining.is_empty() {
            if !remaining.starts_with('[') {
                return Err(unsupported(expr, "unexpected text after predicate"));
            }
            let end = closing_bracket(remaining)
                .ok_or_else(|| unsupported(expr, "nested or unterminated predicate"))?;
            for condition in CONJUNCTION.split(remaining[1..end].trim()) {
                predicates.push(parse_condition(condition, expr)?);
            }
            remaining = &remaining[end + 1..];
        }

        Ok(Self {
            axis,
            test,
            predicates,
        })
    }

    fn matches(&self, node: Node) -> bool {
        if !node.is_element() {
            return false;
        }
        let name_ok = match &self.test {
            NameTest::Any => true,
            NameTest::Named(name) => name.matches(node),
        };
        name_ok && self.predicates.iter().all(|p| p.holds(node))
    }
}

fn parse_condition(condition: &str, expr: &str) -> Result<Predicate> {
    let caps = CONDITION
        .captures(condition.trim())
        .ok_or_else(|| unsupported(expr, "only attribute predicates are supported"))?;

    let attr = QName::parse(&caps[1])?;
    let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());

    Ok(match value {
        None => Predicate::Exists(attr),
        Some(value) => match PLACEHOLDER.captures(value) {
            Some(p) => {
                let index = p[1]
                    .parse()
                    .map_err(|_| unsupported(expr, "placeholder index out of range"))?;
                Predicate::Placeholder(attr, index)
            }
            None => Predicate::Equals(attr, value.to_string()),
        },
    })
}

/// Index of the `]` closing the predicate that opens `s`.
fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                ']' => return Some(i),
                '[' => return None,
                _ => {}
            },
        }
    }
    None
}

/// Splits a location path into its steps, each keeping its leading `/` or
/// `//`. Separators inside predicates or quoted literals are ignored.
pub fn split_steps(expr: &str) -> Result<Vec<&str>> {
    let mut steps = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut prev_slash = false;

    for (i, c) in expr.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            prev_slash = false;
            continue;
        }
        match c {
            '\'' | '"' if depth > 0 => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(expr, "unbalanced brackets"))?
            }
            '/' if depth == 0 && !prev_slash => {
                if i > start {
                    steps.push(&expr[start..i]);
                }
                start = i;
            }
            _ => {}
        }
        prev_slash = c == '/' && depth == 0;
    }

    if depth != 0 || quote.is_some() {
        return Err(unsupported(expr, "unbalanced brackets or quotes"));
    }
    if start < expr.len() {
        steps.push(&expr[start..]);
    }
    if steps.is_empty() || steps.iter().any(|s| s.trim_start_matches('/').is_empty()) {
        return Err(unsupported(expr, "empty location step"));
    }

    Ok(steps)
}

/// A compiled location path.
#[derive(Debug, Clone)]
pub struct XPath {
    expr: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl XPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let steps = split_steps(expr)?
            .into_iter()
            .map(|raw| Step::parse(raw, expr))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            expr: expr.to_string(),
            absolute: expr.starts_with('/'),
            steps,
        })
    }

    /// Evaluates the path from the context node even if it starts with `/`.
    pub fn into_relative(mut self) -> Self {
        self.absolute = false;
        self
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Attribute holding the reference label of the nodes this path selects:
    /// the attribute bound to the highest placeholder of the last step.
    pub fn label_attribute(&self) -> Option<&QName> {
        self.steps
            .last()?
            .predicates
            .iter()
            .filter_map(|p| match p {
                Predicate::Placeholder(attr, index) => Some((attr, *index)),
                _ => None,
            })
            .max_by_key(|(_, index)| *index)
            .map(|(attr, _)| attr)
    }

    /// Selects matching elements in document order, without duplicates.
    pub fn select<'a, 'i>(&self, context: Node<'a, 'i>) -> Vec<Node<'a, 'i>> {
        let start = if self.absolute {
            context.document().root()
        } else {
            context
        };

        let mut current = vec![start];
        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                match step.axis {
                    Axis::Child => extend_matching(step, node.children(), &mut seen, &mut next),
                    Axis::Descendant => {
                        extend_matching(step, node.descendants().skip(1), &mut seen, &mut next)
                    }
                }
            }
            current = next;
        }
        current
    }
}

fn extend_matching<'a, 'i>(
    step: &Step,
    candidates: impl Iterator<Item = Node<'a, 'i>>,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<Node<'a, 'i>>,
) {
    for candidate in candidates {
        if step.matches(candidate) && seen.insert(candidate.id()) {
            out.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const DOC: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text><body><div type="edition">
    <div type="textpart" n="1"><l n="1">a</l><l n="2">b</l></div>
    <div type="textpart" n="2"><l n="1">c</l><l>no number</l></div>
    <div type="commentary" n="3"><l n="1">d</l></div>
  </div></body></text>
</TEI>"#;

    fn texts(nodes: &[Node]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_split_steps_keeps_predicates_together() {
        let steps =
            split_steps("/tei:TEI/tei:text//tei:div[@n='$1' and @type=\"a/b\"]/tei:l[@n='$2']")
                .unwrap();
        assert_eq!(
            steps,
            vec![
                "/tei:TEI",
                "/tei:text",
                "//tei:div[@n='$1' and @type=\"a/b\"]",
                "/tei:l[@n='$2']",
            ]
        );
        assert_eq!(split_steps("tei:div/tei:l").unwrap(), vec!["tei:div", "/tei:l"]);
    }

    #[test]
    fn test_split_steps_rejects_broken_paths() {
        assert!(split_steps("").is_err());
        assert!(split_steps("/tei:div[@n='1'").is_err());
        assert!(split_steps("/tei:div/").is_err());
    }

    #[test]
    fn test_select_with_placeholders() {
        let doc = Document::parse(DOC).unwrap();
        let path = XPath::parse(
            "/tei:TEI/tei:text/tei:body/tei:div/tei:div[@n='$1']/tei:l[@n='$2']",
        )
        .unwrap();

        let lines = path.select(doc.root());
        assert_eq!(texts(&lines), vec!["a", "b", "c", "d"]);
        assert_eq!(path.label_attribute().map(QName::local), Some("n"));
    }

    #[test]
    fn test_select_with_literal_predicates_and_descendants() {
        let doc = Document::parse(DOC).unwrap();
        let path = XPath::parse("//tei:div[@type='textpart' and @n]/tei:l").unwrap();
        assert_eq!(texts(&path.select(doc.root())), vec!["a", "b", "c", "no number"]);

        let path = XPath::parse("//tei:div[@type=\"commentary\"]//*").unwrap();
        assert_eq!(texts(&path.select(doc.root())), vec!["d"]);
        assert!(path.label_attribute().is_none());
    }

    #[test]
    fn test_relative_selection() {
        let doc = Document::parse(DOC).unwrap();
        let books = XPath::parse("//tei:div[@n='$1']").unwrap().select(doc.root());
        assert_eq!(books.len(), 3);

        let lines = XPath::parse("/tei:l[@n='$2']").unwrap().into_relative();
        assert_eq!(texts(&lines.select(books[1])), vec!["c"]);
    }

    #[test]
    fn test_unsupported_expressions() {
        assert!(matches!(
            XPath::parse("/foo:TEI"),
            Err(ConvertError::UnknownPrefix(prefix)) if prefix == "foo"
        ));
        assert!(XPath::parse("/tei:div[1]").is_err());
        assert!(XPath::parse("/tei:div[contains(@n, '1')]").is_err());
        assert!(XPath::parse("/tei:div/text()").is_err());
    }

    #[test]
    fn test_qname_matching() {
        let doc = Document::parse(
            r#"<root xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:note xml:id="x"/><note/></root>"#,
        )
        .unwrap();
        let notes: Vec<_> = doc.root_element().children().collect();

        let tei_note = QName::parse("tei:note").unwrap();
        assert!(tei_note.matches(notes[0]));
        assert!(!tei_note.matches(notes[1]));

        let any_note = QName::parse("note").unwrap();
        assert!(any_note.matches(notes[0]) && any_note.matches(notes[1]));

        let id = QName::parse("xml:id").unwrap();
        assert_eq!(id.attribute(notes[0]), Some("x"));
    }
}
