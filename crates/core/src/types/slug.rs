//! URL slugs for categories and products.

use core::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Errors that can occur when building a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing slug-worthy was left after normalization.
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Convert a display name into a URL slug.
///
/// The name is NFKD-decomposed so accented letters fall back to their base
/// letter, whatever is still non-ASCII is dropped, letters are lowercased, anything
/// that is not a letter, digit, underscore, hyphen or whitespace is removed,
/// runs of whitespace and hyphens collapse to a single `-`, and leading or
/// trailing `-`/`_` are stripped.
///
/// A name with no usable characters yields an empty string; callers must
/// treat that as a validation failure rather than store it.
///
/// ```
/// use bazaar_core::slugify;
///
/// assert_eq!(slugify("Hello, World!"), "hello-world");
/// assert_eq!(slugify("  Tea -- & Coffee "), "tea-coffee");
/// assert_eq!(slugify("Café Crème"), "cafe-creme");
/// assert_eq!(slugify("!!!"), "");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.nfkd().filter(char::is_ascii) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c.is_ascii_whitespace() {
            pending_dash = true;
        }
    }

    out.trim_matches(|c| c == '-' || c == '_').to_owned()
}

/// A validated, non-empty URL slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Matches the `VARCHAR(200)` columns.
    pub const MAX_LENGTH: usize = 200;

    /// Validate an explicit slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is empty, too long, or contains characters
    /// outside `[a-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a display name.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when the name has no slug-worthy
    /// characters.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut slug = slugify(name);
        slug.truncate(Self::MAX_LENGTH);
        Self::parse(slug.trim_end_matches(['-', '_']))
    }

    /// Use `explicit` when present and non-blank, otherwise derive from `name`.
    ///
    /// # Errors
    ///
    /// Same as [`Slug::parse`] / [`Slug::from_name`].
    pub fn explicit_or_derived(explicit: Option<&str>, name: &str) -> Result<Self, SlugError> {
        match explicit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => Self::parse(slug),
            None => Self::from_name(name),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic_names() {
        assert_eq!(slugify("Running Shoes"), "running-shoes");
        assert_eq!(slugify("USB-C  Cable (2m)"), "usb-c-cable-2m");
        assert_eq!(slugify("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn test_slugify_strips_edges() {
        assert_eq!(slugify("--Sale--"), "sale");
        assert_eq!(slugify("_private_"), "private");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Ñandú"), "nandu");
        assert_eq!(slugify("Crème Brûlée Set"), "creme-brulee-set");
        assert_eq!(slugify("ﬁne ½ price"), "fine-12-price");
    }

    #[test]
    fn test_slugify_drops_what_has_no_ascii_form() {
        assert_eq!(slugify("日本語"), "");
        assert_eq!(slugify("Tee 日本 Set"), "tee-set");
        assert_eq!(Slug::from_name("日本語"), Err(SlugError::Empty));
    }

    #[test]
    fn test_empty_derived_slug_is_rejected() {
        assert_eq!(Slug::from_name(""), Err(SlugError::Empty));
        assert_eq!(Slug::from_name("???"), Err(SlugError::Empty));
        assert_eq!(Slug::from_name("   "), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse_rejects_uppercase_and_spaces() {
        assert_eq!(Slug::parse("Shoes"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("red shoes"), Err(SlugError::InvalidCharacter));
        assert!(Slug::parse("red-shoes_2").is_ok());
    }

    #[test]
    fn test_explicit_slug_wins_over_name() {
        let slug = Slug::explicit_or_derived(Some("custom"), "Ignored Name").unwrap();
        assert_eq!(slug.as_str(), "custom");

        let derived = Slug::explicit_or_derived(Some("  "), "Garden Tools").unwrap();
        assert_eq!(derived.as_str(), "garden-tools");
    }

    #[test]
    fn test_from_name_truncates_long_names() {
        let name = "a".repeat(300);
        assert_eq!(Slug::from_name(&name).unwrap().as_str().len(), Slug::MAX_LENGTH);
    }
}
