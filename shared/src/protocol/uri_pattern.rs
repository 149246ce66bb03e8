use std::fmt;

use tweak_serde::{BitReader, BitWrite, Serde, SerdeErr};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Clause {
    Any,
    Prefix(String),
    Exact(String),
}

impl Clause {
    fn matches(&self, uri: &str) -> bool {
        match self {
            Clause::Any => true,
            Clause::Prefix(prefix) => uri.starts_with(prefix.as_str()),
            Clause::Exact(exact) => uri == exact,
        }
    }
}

/// Selects items by uri for `list` requests.
///
/// A pattern is one or more `;`-separated clauses, each either `*` (any
/// uri), `prefix*` or an exact uri. An empty pattern matches nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UriPattern {
    source: String,
    clauses: Vec<Clause>,
}

impl UriPattern {
    pub fn parse(source: &str) -> Self {
        let clauses = source
            .split(';')
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(|clause| match clause.strip_suffix('*') {
                Some("") => Clause::Any,
                Some(prefix) => Clause::Prefix(prefix.to_string()),
                None => Clause::Exact(clause.to_string()),
            })
            .collect();
        Self {
            source: source.to_string(),
            clauses,
        }
    }

    pub fn any() -> Self {
        Self::parse("*")
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.clauses.iter().any(|clause| clause.matches(uri))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for UriPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serde for UriPattern {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.source.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self::parse(&String::de(reader)?))
    }
}
