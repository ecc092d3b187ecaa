//! Resource name normalization
//!
//! Dictionary entries reference resources with whatever separator the
//! dictionary author's platform used. Every lookup key goes through
//! [`normalize`] so that `img\cat.png` and `img/cat.png` name the same
//! resource on every platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator used inside normalized resource names and inside archives.
pub const SEPARATOR: char = '/';

/// A resource name in canonical form.
///
/// Rules:
/// - `/` and `\` are both separators; output uses `/` only
/// - no leading or trailing separator, no empty or `.` segments
/// - `..` removes the previous segment and never climbs above the root
/// - case is preserved and significant
///
/// Serialized transparently as a plain string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath(String);

/// Normalize a raw resource name. Pure string transform, no filesystem access.
pub fn normalize(raw: &str) -> NormalizedPath {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    NormalizedPath(segments.join("/"))
}

impl NormalizedPath {
    /// Wrap a string already known to be in canonical form.
    ///
    /// Returns `None` when `s` would change under [`normalize`].
    pub fn from_normalized(s: &str) -> Option<Self> {
        let normalized = normalize(s);
        (normalized.as_str() == s).then_some(normalized)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Join onto a filesystem root using platform-native separators.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for segment in self.segments() {
            out.push(segment);
        }
        out
    }

    /// Build from a path relative to a scanned root.
    ///
    /// `None` if any component is not valid UTF-8; such a file has no name
    /// a caller could ask for.
    pub fn from_relative(rel: &Path) -> Option<Self> {
        let segments = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(normalize(&segments.join("/")))
    }
}

impl From<&str> for NormalizedPath {
    fn from(value: &str) -> Self {
        normalize(value)
    }
}

impl From<String> for NormalizedPath {
    fn from(value: String) -> Self {
        normalize(&value)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.0
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
