//! Shareable resource addresses.
//!
//! An address is the link a user shares for a drive or a document, e.g.
//! `https://pad.example/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx/`.
//! Two links pointing at the same channel compare equal regardless of path
//! decoration or trailing slashes, which is what the session cache keys on.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use regex::Regex;

/// `<origin><path>#/<version>/<app>/<edit|view>/<key>/...`
static SHARE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<origin>[a-z][a-z0-9+.-]*://[^/#]+)?[^#]*#/(?P<version>[0-9]+)/(?P<app>[^/]+)/(?P<mode>edit|view)/(?P<key>[^/]+)",
    )
    .expect("share link pattern is valid")
});

/// An opaque, shareable resource address with its canonical identity.
#[derive(Clone, Debug)]
pub struct Address {
    /// Address as given (after origin resolution)
    url: String,
    /// Origin + channel identity used for equality and caching
    canonical: String,
}

impl Address {
    /// Parse an address string.
    ///
    /// Never fails: strings that are not share links canonicalize to
    /// themselves (trimmed).
    pub fn parse(raw: &str) -> Self {
        let url = raw.trim().to_string();
        let canonical = canonicalize(&url);
        Self { url, canonical }
    }

    /// Resolve an `href` found in drive metadata against the server origin.
    ///
    /// Absolute URLs are kept as-is; relative ones (`/drive/#/...`) are
    /// appended to `origin`.
    pub fn resolve(href: &str, origin: &str) -> Self {
        let href = href.trim();
        if href.contains("://") || origin.is_empty() {
            return Self::parse(href);
        }
        let joined = format!(
            "{}/{}",
            origin.trim_end_matches('/'),
            href.trim_start_matches('/')
        );
        Self::parse(&joined)
    }

    /// The address as a displayable URL.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Canonical identity (origin + channel).
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

fn canonicalize(url: &str) -> String {
    let Some(caps) = SHARE_LINK.captures(url) else {
        return url.to_string();
    };
    let origin = caps
        .name("origin")
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    let key = &caps["key"];
    format!("{}#{}", origin, channel_identity(key))
}

/// Hex form of a base64 share key (`-` stands in for `/`).
///
/// Falls back to the key itself when it is not valid base64.
pub fn channel_identity(key: &str) -> String {
    let b64 = key.replace('-', "/");
    match STANDARD_NO_PAD.decode(b64.trim_end_matches('=')) {
        Ok(bytes) => hex::encode(bytes),
        Err(_) => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVE: &str = "http://localhost:3000/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx/";

    #[test]
    fn test_share_link_canonical() {
        let a = Address::parse(DRIVE);
        let b = Address::parse("http://LOCALHOST:3000/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx");
        assert_eq!(a, b);
        assert!(a.canonical().starts_with("http://localhost:3000#"));
        assert_eq!(a.as_str(), DRIVE);
    }

    #[test]
    fn test_different_keys_differ() {
        let a = Address::parse("http://h/pad/#/2/pad/edit/AAAAAAAAAAAAAAAAAAAAAAAA/");
        let b = Address::parse("http://h/pad/#/2/pad/edit/BBBBBBBBBBBBBBBBBBBBBBBB/");
        assert_ne!(a, b);
    }

    #[test]
    fn test_opaque_address() {
        let a = Address::parse("  doc123 ");
        assert_eq!(a.canonical(), "doc123");
        assert_eq!(a.as_str(), "doc123");
    }

    #[test]
    fn test_resolve_relative() {
        let a = Address::resolve("/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx/", "http://localhost:3000/");
        assert_eq!(a, Address::parse(DRIVE));
        assert_eq!(
            a.as_str(),
            "http://localhost:3000/drive/#/2/drive/edit/4SH+XD5NqierGNeW5S3vHqbx/"
        );

        let abs = Address::resolve("https://other/x", "http://localhost:3000");
        assert_eq!(abs.as_str(), "https://other/x");
    }

    #[test]
    fn test_channel_identity() {
        assert_eq!(channel_identity("AAAA"), "000000");
        assert_eq!(channel_identity("a-b/"), channel_identity("a/b/"));
        assert_eq!(channel_identity("not base64!"), "not base64!");
    }
}
