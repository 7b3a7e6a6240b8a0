//! CTS URNs (`urn:cts:latinLit:phi1294.phi002.perseus-lat2:1.1`).

use crate::error::{ConvertError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    raw: String,
    namespace: String,
    textgroup: String,
    work: Option<String>,
    version: Option<String>,
    passage: Option<String>,
}

impl Urn {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn textgroup(&self) -> &str {
        &self.textgroup
    }

    pub fn work(&self) -> Option<&str> {
        self.work.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn passage(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    /// `urn:cts:{namespace}:{textgroup}`
    pub fn upto_textgroup(&self) -> String {
        format!("urn:cts:{}:{}", self.namespace, self.textgroup)
    }

    /// `urn:cts:{namespace}:{textgroup}.{work}`, or the textgroup URN when
    /// no work is part of this URN.
    pub fn upto_work(&self) -> String {
        match &self.work {
            Some(work) => format!("{}.{}", self.upto_textgroup(), work),
            None => self.upto_textgroup(),
        }
    }
}

impl FromStr for Urn {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ConvertError::Urn(s.to_string());
        let raw = s.trim();

        let parts: Vec<&str> = raw.splitn(5, ':').collect();
        if parts.len() < 4
            || !parts[0].eq_ignore_ascii_case("urn")
            || !parts[1].eq_ignore_ascii_case("cts")
            || parts[2].is_empty()
        {
            return Err(invalid());
        }

        let mut work_parts = parts[3].splitn(3, '.');
        let textgroup = work_parts
            .next()
            .filter(|tg| !tg.is_empty())
            .ok_or_else(invalid)?;
        let work = work_parts.next().map(str::to_string);
        let version = work_parts.next().map(str::to_string);

        if work.as_deref() == Some("") || version.as_deref() == Some("") {
            return Err(invalid());
        }

        Ok(Self {
            raw: raw.to_string(),
            namespace: parts[2].to_string(),
            textgroup: textgroup.to_string(),
            work,
            version,
            passage: parts
                .get(4)
                .filter(|p| !p.is_empty())
                .map(|p| p.to_string()),
        })
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
