//! Block titles: the `market.library.name` identity of a block.
//!
//! Titles compare case-insensitively. A dependency entry may carry an exact
//! version in parentheses, as in `math.adder(v1.2.0)`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::version::{Arity, VersionId};

/// Directory name standing in for an absent market in the cache layout.
pub const NO_MARKET: &str = "_";

/// Identity of a block.
#[derive(Debug, Clone)]
pub struct Title {
    market: Option<String>,
    library: String,
    name: String,
}

/// Lowercased `(market, library, name)` used for map keys. An absent market is `""`.
pub type TitleKey = (String, String, String);

impl Title {
    pub fn new(market: Option<&str>, library: &str, name: &str) -> Self {
        Self {
            market: market.filter(|m| !m.is_empty()).map(str::to_string),
            library: library.replace('-', "_"),
            name: name.replace('-', "_"),
        }
    }

    /// Parse `[market.]library.name`, reading components right to left.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidTitle {
            text: text.to_string(),
            reason: reason.to_string(),
        };

        let mut parts: Vec<&str> = text.trim().rsplitn(3, '.').collect();
        parts.reverse();
        let (market, library, name) = match parts.as_slice() {
            [library, name] => (None, *library, *name),
            [market, library, name] => (Some(*market), *library, *name),
            _ => return Err(invalid("expected library.name")),
        };
        if market.is_some_and(|m| m.contains('.')) {
            return Err(invalid("too many components"));
        }
        for part in [Some(library), Some(name), market].into_iter().flatten() {
            if part.is_empty() {
                return Err(invalid("empty component"));
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(invalid("only letters, digits, '_' and '-' are allowed"));
            }
        }

        Ok(Self::new(market, library, name))
    }

    pub fn market(&self) -> Option<&str> {
        self.market.as_deref()
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same title with a different market.
    pub fn with_market(&self, market: Option<&str>) -> Self {
        Self::new(market, &self.library, &self.name)
    }

    /// Directory name of the market in the cache layout.
    pub fn market_dir(&self) -> &str {
        self.market.as_deref().unwrap_or(NO_MARKET)
    }

    pub fn key(&self) -> TitleKey {
        (
            self.market.as_deref().unwrap_or("").to_lowercase(),
            self.library.to_lowercase(),
            self.name.to_lowercase(),
        )
    }

    /// Whether library and name match, ignoring the market.
    pub fn same_block(&self, other: &Title) -> bool {
        self.library.eq_ignore_ascii_case(&other.library)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl PartialEq for Title {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Title {}

impl Hash for Title {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Title {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Title {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.market {
            Some(market) => write!(f, "{market}.{}.{}", self.library, self.name),
            None => write!(f, "{}.{}", self.library, self.name),
        }
    }
}

impl FromStr for Title {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One entry of a block's `derives` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub title: Title,
    /// Exact release wanted; `None` means the latest release.
    pub version: Option<VersionId>,
}

impl Requirement {
    pub fn latest(title: Title) -> Self {
        Self {
            title,
            version: None,
        }
    }

    /// Parse `[market.]library.name[(vX.Y.Z)]`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let Some(open) = text.find('(') else {
            return Ok(Self::latest(Title::parse(text)?));
        };

        let inner = text[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| Error::InvalidTitle {
                text: text.to_string(),
                reason: "unclosed version".to_string(),
            })?;
        if !inner.starts_with('v') || !VersionId::validate(inner, &[Arity::Full]) {
            return Err(Error::InvalidVersion {
                text: inner.to_string(),
            });
        }

        Ok(Self {
            title: Title::parse(&text[..open])?,
            version: Some(VersionId::parse(inner)),
        })
    }

    /// Key used to track resolution: the title plus the requested version.
    pub fn tracking_key(&self) -> String {
        let (market, library, name) = self.title.key();
        match &self.version {
            Some(v) => format!("{market}.{library}.{name}({v})"),
            None => format!("{market}.{library}.{name}"),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}({v})", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}
