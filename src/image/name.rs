// file: src/image/name.rs
// version: 1.0.0
// guid: 7bfeebc4-f3a5-41d2-a293-41e61b8fd34c

//! Image names of the form `<vendor>/<name>`

use crate::error::ZnxError;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

fn segment_regex() -> &'static Regex {
    static SEGMENT: OnceLock<Regex> = OnceLock::new();
    SEGMENT.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment pattern is valid"))
}

/// A validated `<vendor>/<name>` identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageName {
    vendor: String,
    name: String,
}

impl ImageName {
    /// Build a name from its two segments, validating both
    pub fn new(vendor: &str, name: &str) -> Result<Self, ZnxError> {
        for segment in [vendor, name] {
            if !segment_regex().is_match(segment) {
                return Err(ZnxError::usage(format!(
                    "invalid image name {}/{}: segments may only contain letters, digits, '_' and '-'",
                    vendor, name
                )));
            }
        }

        Ok(Self {
            vendor: vendor.to_string(),
            name: name.to_string(),
        })
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slot directory relative to the repository root
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.vendor).join(&self.name)
    }
}

impl FromStr for ImageName {
    type Err = ZnxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((vendor, name)) => Self::new(vendor, name),
            None => Err(ZnxError::usage(format!(
                "invalid image name {}: expected <vendor>/<name>",
                s
            ))),
        }
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        let name: ImageName = "nitrux/nx-desktop_2".parse().unwrap();
        assert_eq!(name.vendor(), "nitrux");
        assert_eq!(name.name(), "nx-desktop_2");
        assert_eq!(name.to_string(), "nitrux/nx-desktop_2");
        assert_eq!(name.relative_path(), PathBuf::from("nitrux/nx-desktop_2"));
    }

    #[test]
    fn test_invalid_names() {
        for bad in [
            "",
            "vendor",
            "vendor/",
            "/name",
            "a/b/c",
            "vendor/na me",
            "ven.dor/name",
            "../etc",
            "vendor/..",
            "vendor/näme",
        ] {
            assert!(bad.parse::<ImageName>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_invalid_name_is_usage_error() {
        assert!(matches!(
            "x/y z".parse::<ImageName>(),
            Err(ZnxError::Usage(_))
        ));
    }
}
