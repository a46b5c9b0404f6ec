//! Depth-bounded hierarchical folder paths.
//!
//! [`FolderPath`] is an immutable value type over at most
//! [`defaults::MAX_HIERARCHY_DEPTH`] validated segments. Every "mutation"
//! (child, rename) produces a new instance. Equality, ordering, and hashing
//! follow the canonical string form (`/` + segments joined by `/`).
//!
//! Two special roots exist: `/Unsorted` (human-review fallback) and
//! `/Provisional/<name>` (machine-proposed folders awaiting confirmation).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::defaults;
use crate::error::{Error, Result};

/// Characters that may not appear in a path segment.
const INVALID_SEGMENT_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '/', '\\'];

/// Reserved device names (case-insensitive) rejected as segments.
static RESERVED_DEVICE_NAMES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])$").unwrap());

/// Immutable hierarchical folder path, at most 4 segments deep.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath {
    segments: Vec<String>,
}

impl FolderPath {
    /// The implicit root, canonical form `/`, depth 0.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// The `/Unsorted` fallback root.
    pub fn unsorted() -> Self {
        Self {
            segments: vec![defaults::UNSORTED_ROOT.to_string()],
        }
    }

    /// A `/Provisional/<name>` folder. The name is validated as a segment.
    pub fn provisional(name: &str) -> Result<Self> {
        Self::from_segments([defaults::PROVISIONAL_ROOT, name])
    }

    /// Parse a canonical path string. Requires a leading `/`; `/` alone is
    /// the root. Empty segments fail validation.
    pub fn from_string(s: &str) -> Result<Self> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(Error::validation("path must start with '/'").with_context("path", s));
        };
        // Normalize a single trailing separator so "/a/b/" round-trips as "/a/b".
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Ok(Self::root());
        }
        Self::from_segments(rest.split('/'))
    }

    /// Build a path from individual segments, validating each and the
    /// overall depth.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.len() > defaults::MAX_HIERARCHY_DEPTH {
            return Err(Error::validation(format!(
                "path depth {} exceeds maximum {}",
                segments.len(),
                defaults::MAX_HIERARCHY_DEPTH
            ))
            .with_context("max_depth", defaults::MAX_HIERARCHY_DEPTH)
            .with_context("depth", segments.len()));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Number of segments. The root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True only for the implicit root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the first segment is the Unsorted root literal.
    pub fn is_unsorted(&self) -> bool {
        self.segments.first().map(String::as_str) == Some(defaults::UNSORTED_ROOT)
    }

    /// True when the first segment is the Provisional root literal.
    pub fn is_provisional(&self) -> bool {
        self.segments.first().map(String::as_str) == Some(defaults::PROVISIONAL_ROOT)
    }

    /// The final segment, if any.
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The parent path, or None at the root.
    pub fn parent(&self) -> Option<FolderPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Strict ancestors ordered shallow to deep, excluding the implicit
    /// root and the path itself.
    pub fn ancestors(&self) -> Vec<FolderPath> {
        (1..self.segments.len())
            .map(|depth| Self {
                segments: self.segments[..depth].to_vec(),
            })
            .collect()
    }

    /// Append a child segment, failing when the result would exceed the
    /// maximum depth or the segment is invalid.
    pub fn child(&self, name: &str) -> Result<FolderPath> {
        if self.segments.len() >= defaults::MAX_HIERARCHY_DEPTH {
            return Err(Error::validation(format!(
                "cannot add child at depth {}: maximum depth is {}",
                self.segments.len(),
                defaults::MAX_HIERARCHY_DEPTH
            ))
            .with_context("max_depth", defaults::MAX_HIERARCHY_DEPTH)
            .with_context("path", self));
        }
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    /// Strict (irreflexive, transitive) ancestor test.
    pub fn is_ancestor_of(&self, other: &FolderPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Strict (irreflexive, transitive) descendant test.
    pub fn is_descendant_of(&self, other: &FolderPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// True when both paths share the same parent at the same non-zero
    /// depth. A path is never its own sibling.
    pub fn is_sibling_of(&self, other: &FolderPath) -> bool {
        !self.segments.is_empty()
            && self.depth() == other.depth()
            && self != other
            && self.parent() == other.parent()
    }

    /// The path from self down to `target`, or None unless self is a
    /// strict ancestor of `target`.
    pub fn relative_path(&self, target: &FolderPath) -> Option<String> {
        if !self.is_ancestor_of(target) {
            return None;
        }
        Some(target.segments[self.segments.len()..].join("/"))
    }

    /// The validated segments, shallow to deep.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::validation("path segment must not be empty"));
    }
    if segment.chars().count() > defaults::MAX_SEGMENT_LENGTH {
        return Err(Error::validation(format!(
            "path segment exceeds {} characters",
            defaults::MAX_SEGMENT_LENGTH
        ))
        .with_context("segment", segment)
        .with_context("max_len", defaults::MAX_SEGMENT_LENGTH));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| INVALID_SEGMENT_CHARS.contains(c) || c.is_control())
    {
        return Err(Error::validation(format!(
            "path segment contains invalid character {bad:?}"
        ))
        .with_context("segment", segment));
    }
    if RESERVED_DEVICE_NAMES.is_match(segment) {
        return Err(
            Error::validation("path segment is a reserved device name")
                .with_context("segment", segment),
        );
    }
    Ok(())
}

impl std::fmt::Display for FolderPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl PartialOrd for FolderPath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FolderPath {
    /// Ordering follows the canonical string form, not segment-wise
    /// comparison (the two diverge when a segment is a prefix of another).
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl Serialize for FolderPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FolderPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FolderPath::from_string(&s).map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for FolderPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}
