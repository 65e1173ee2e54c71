// weldx_core/src/asdf/tags.rs

//! Tag URIs of the form `asdf://weldx.bam.de/weldx/tags/{name}-{version}`.

use serde_yaml::value::Tag;

pub const WELDX_TAG_BASE: &str = "asdf://weldx.bam.de/weldx/tags/";
/// Prefix used by files written before the `asdf://` URI scheme.
pub const LEGACY_TAG_BASE: &str = "tag:weldx.bam.de:weldx/";

pub fn format_tag(name: &str, version: &str) -> String {
    format!("{WELDX_TAG_BASE}{name}-{version}")
}

pub fn legacy_tag(name: &str, version: &str) -> String {
    format!("{LEGACY_TAG_BASE}{name}-{version}")
}

/// The plain tag string, without the `!` YAML marker.
pub fn tag_str(tag: &Tag) -> String {
    tag.to_string().trim_start_matches('!').to_string()
}

/// A weldx tag split into its name and version parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeldxTag {
    pub name: String,
    pub version: String,
}

impl WeldxTag {
    /// Parses new style and legacy tags; `None` for foreign tags.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim_start_matches('!');
        let rest = tag
            .strip_prefix(WELDX_TAG_BASE)
            .or_else(|| tag.strip_prefix(LEGACY_TAG_BASE))?;
        let (name, version) = rest.rsplit_once('-')?;
        if name.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Same name and a compatible version: the same major (`1.*` matches
    /// `1.0.0` and `1.2.0`), or the same `0.<minor>` while the major is zero.
    pub fn matches(&self, name: &str, version: &str) -> bool {
        self.name == name && compatibility(&self.version) == compatibility(version)
    }
}

/// The version prefix that must agree: `1` for `1.2.0`, `0.1` for `0.1.3`.
fn compatibility(version: &str) -> (&str, Option<&str>) {
    let mut parts = version.split('.');
    match parts.next() {
        Some("0") => ("0", parts.next()),
        Some(major) => (major, None),
        None => (version, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_legacy_tags_parse_alike() {
        let new = WeldxTag::parse(&format_tag("core/time_series", "0.1.0")).unwrap();
        let old = WeldxTag::parse(&legacy_tag("core/time_series", "0.1.0")).unwrap();
        assert_eq!(new, old);
        assert_eq!(new.name, "core/time_series");
    }

    #[test]
    fn test_major_version_matching() {
        let t = WeldxTag::parse("asdf://weldx.bam.de/weldx/tags/time/timedelta-1.2.0").unwrap();
        assert!(t.matches("time/timedelta", "1.0.0"));
        assert!(!t.matches("time/timedelta", "2.0.0"));
        assert!(!t.matches("time/timestamp", "1.0.0"));
    }

    #[test]
    fn test_zero_major_compares_minor() {
        let t = WeldxTag::parse(&format_tag("core/time_series", "0.1.0")).unwrap();
        assert!(t.matches("core/time_series", "0.1.5"));
        assert!(!t.matches("core/time_series", "0.2.0"));
        assert!(!t.matches("core/time_series", "1.1.0"));
    }

    #[test]
    fn test_foreign_tags_are_ignored() {
        assert!(WeldxTag::parse("tag:stsci.edu:asdf/core/ndarray-1.0.0").is_none());
        assert!(WeldxTag::parse("asdf://weldx.bam.de/weldx/tags/no_version").is_none());
    }

    #[test]
    fn test_tag_str_strips_marker() {
        let tag = Tag::new("!asdf://weldx.bam.de/weldx/tags/time/timestamp-1.0.0");
        assert_eq!(tag_str(&tag), "asdf://weldx.bam.de/weldx/tags/time/timestamp-1.0.0");
    }
}
