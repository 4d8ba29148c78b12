//! Filesystem-safe name normalization.

use std::fmt;

use serde::Serialize;

/// Separator used in place of non-alphanumeric runs.
pub const SLUG_SEPARATOR: char = '_';

/// Name used when normalization leaves nothing behind.
const EMPTY_SLUG: &str = "unnamed";

/// A filesystem-safe directory name derived from a display name.
///
/// The name is lower-cased and every run of characters that are not ASCII
/// letters or digits becomes a single `_`; separators at either end are
/// dropped. Normalization is lossy: `"My Model #1"` and `"my model #1"`
/// both become `my_model_1`, so distinct names can share a directory.
///
/// ```
/// use assetpack_core::Slug;
///
/// assert_eq!(Slug::new("My Model #1").as_str(), "my_model_1");
/// assert_eq!(Slug::new("my model #1"), Slug::new("My Model #1"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(name: &str) -> Self {
        let mut out = String::with_capacity(name.len());
        let mut pending_separator = false;

        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_separator && !out.is_empty() {
                    out.push(SLUG_SEPARATOR);
                }
                pending_separator = false;
                out.push(ch.to_ascii_lowercase());
            } else {
                pending_separator = true;
            }
        }

        if out.is_empty() {
            out.push_str(EMPTY_SLUG);
        }

        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<std::path::Path> for Slug {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}
