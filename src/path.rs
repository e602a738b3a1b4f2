//! Paths into the applicant document.
//!
//! A path is stored without the JsonPath `$.` prefix and always in lowercase,
//! e.g. `applicant.household_members[2].name`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const JSON_PATH_START_TOKEN: &str = "$";
const JSON_PATH_START: &str = "$.";
const DIVIDER: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub const ARRAY_SUFFIX: &'static str = "[]";

    pub fn empty() -> Self {
        Self::default()
    }

    /// Root of everything the applicant has answered.
    pub fn applicant() -> Self {
        Self::parse("applicant")
    }

    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        let path = path.strip_prefix(JSON_PATH_START).unwrap_or(path);
        if path.is_empty() || path == JSON_PATH_START_TOKEN {
            return Self::empty();
        }
        Self {
            segments: path.split(DIVIDER).map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path in JsonPath predicate form, which must start with `$.`.
    pub fn predicate_format(&self) -> String {
        format!("{}{}", JSON_PATH_START, self)
    }

    pub fn parent_path(&self) -> Path {
        let mut segments = self.segments.clone();
        segments.pop();
        Path { segments }
    }

    /// Appends a dotted path (or a single segment) to this one.
    pub fn join(&self, other: &str) -> Path {
        self.join_path(&Path::parse(other))
    }

    pub fn join_path(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// The last segment, e.g. `color` for `applicant.favorites.color`.
    pub fn key_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// True for paths like `applicant.children[3]` or `applicant.children[]`.
    pub fn is_array_element(&self) -> bool {
        split_array_suffix(self.key_name()).is_some()
    }

    pub fn as_array_element(&self) -> Path {
        if self.is_array_element() {
            return self.clone();
        }
        self.replacing_last_segment(format!("{}{}", self.key_name(), Self::ARRAY_SUFFIX))
    }

    /// Strips a trailing array reference: `applicant.children[2]` becomes `applicant.children`.
    /// Paths without one are returned unchanged.
    pub fn without_array_reference(&self) -> Path {
        match split_array_suffix(self.key_name()) {
            Some((name, _)) => self.replacing_last_segment(name.to_string()),
            None => self.clone(),
        }
    }

    /// Index of the trailing array element, if the path ends with a concrete one.
    pub fn array_index(&self) -> Option<usize> {
        split_array_suffix(self.key_name()).and_then(|(_, index)| index)
    }

    /// Points the trailing array reference at `index`. Returns `None` when the path
    /// does not end in an array element.
    pub fn at_index(&self, index: usize) -> Option<Path> {
        let (name, _) = split_array_suffix(self.key_name())?;
        Some(self.replacing_last_segment(format!("{}[{}]", name, index)))
    }

    /// True if this path starts with `other`, ignoring array suffixes.
    pub fn starts_with(&self, other: &Path) -> bool {
        if other.segments.len() > self.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| strip_array_suffix(a) == strip_array_suffix(b))
    }

    fn replacing_last_segment(&self, segment: String) -> Path {
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => *last = segment,
            None => segments.push(segment),
        }
        Path { segments }
    }
}

/// Splits `name[3]` into `("name", Some(3))` and `name[]` into `("name", None)`.
pub(crate) fn split_array_suffix(segment: &str) -> Option<(&str, Option<usize>)> {
    let inner = segment.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let digits = &inner[open + 1..];
    if digits.is_empty() {
        return Some((&inner[..open], None));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (&inner[..open], Some(index)))
}

fn strip_array_suffix(segment: &str) -> &str {
    split_array_suffix(segment).map(|(name, _)| name).unwrap_or(segment)
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str(JSON_PATH_START_TOKEN)
        } else {
            f.write_str(&self.segments.join("."))
        }
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<String> for Path {
    fn from(value: String) -> Self {
        Path::parse(&value)
    }
}

impl From<Path> for String {
    fn from(value: Path) -> Self {
        value.to_string()
    }
}
