//! liblsl version numbers and where to read them from

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Oldest liblsl accepted by `locate`.
pub const MIN_VERSION: LibVersion = LibVersion::new(1, 15, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LibVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl LibVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Decode liblsl's integer form, `major * 100 + minor` (115 is 1.15).
    pub fn from_encoded(encoded: u32) -> Self {
        Self::new(encoded / 100, encoded % 100, 0)
    }

    /// Inverse of [`from_encoded`](Self::from_encoded); `None` when the
    /// version does not fit the integer form.
    pub fn encoded(&self) -> Option<u32> {
        self.major.checked_mul(100)?.checked_add(self.minor)
    }

    /// Parse `major.minor[.patch]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    /// Version embedded in a library file name, e.g. `liblsl.so.1.16.2`,
    /// `liblsl.1.16.2.dylib` or `lsl-1.16.2.dll`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r"lsl(?:\.so)?[.\-_](\d+)\.(\d+)(?:\.(\d+))?").expect("static regex")
        });
        let caps = re.captures(name)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = caps
            .get(3)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(0))?;
        Some(Self::new(major, minor, patch))
    }

    /// Version from the text of an installed `LSLConfigVersion.cmake`.
    pub fn from_cmake_config(text: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| {
            Regex::new(r#"set\s*\(\s*PACKAGE_VERSION\s+"([0-9.]+)"\s*\)"#).expect("static regex")
        });
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| Self::parse(m.as_str()))
    }

    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= (MIN_VERSION.major, MIN_VERSION.minor)
    }

    /// `major.minor`, the form used in compatibility messages.
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for LibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_versions_from_platform_file_names() {
        assert_eq!(
            LibVersion::from_file_name("liblsl.so.1.16.2"),
            Some(LibVersion::new(1, 16, 2))
        );
        assert_eq!(
            LibVersion::from_file_name("liblsl.1.14.0.dylib"),
            Some(LibVersion::new(1, 14, 0))
        );
        assert_eq!(
            LibVersion::from_file_name("lsl-1.16.dll"),
            Some(LibVersion::new(1, 16, 0))
        );
        assert_eq!(LibVersion::from_file_name("liblsl.so"), None);
        assert_eq!(LibVersion::from_file_name("lsl.dll"), None);
    }

    #[test]
    fn reads_cmake_package_version() {
        let text = r#"
set(PACKAGE_VERSION "1.16.2")
if(PACKAGE_VERSION VERSION_LESS PACKAGE_FIND_VERSION)
"#;
        assert_eq!(
            LibVersion::from_cmake_config(text),
            Some(LibVersion::new(1, 16, 2))
        );
        assert_eq!(LibVersion::from_cmake_config("project(liblsl)"), None);
    }

    #[test]
    fn minimum_is_inclusive() {
        assert!(LibVersion::new(1, 15, 0).is_supported());
        assert!(LibVersion::new(2, 0, 0).is_supported());
        assert!(!LibVersion::new(1, 14, 9).is_supported());
        assert_eq!(MIN_VERSION.encoded(), Some(115));
    }

    #[test]
    fn huge_versions_have_no_encoded_form() {
        let v = LibVersion::parse("50000000.0").expect("parse");
        assert_eq!(v.encoded(), None);
        assert_eq!(LibVersion::new(u32::MAX / 100, u32::MAX, 0).encoded(), None);
        assert!(v.is_supported());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(LibVersion::parse("1.16.2"), Some(LibVersion::new(1, 16, 2)));
        assert_eq!(LibVersion::parse("1"), None);
        assert_eq!(LibVersion::parse("1.x"), None);
        assert_eq!(LibVersion::parse("1.2.3.4"), None);
    }
}
