//! API version handling.
//!
//! Representations are versioned by `major.minor` numbers. Every serialized
//! field declares the version it first appeared in, and the serializer drops
//! fields newer than the active version (see `serializer`).

use std::fmt;

/// API version identifier, e.g. `1.0` or `2.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const V1_0: ApiVersion = ApiVersion::new(1, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        ApiVersion { major, minor }
    }

    /// Parse version from string (e.g., "1.0", "v2.1", "2").
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().trim_start_matches(['v', 'V']);
        let mut parts = normalized.splitn(2, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(ApiVersion { major, minor })
    }

    /// True when a field introduced in `since` is visible in this version.
    pub fn includes(&self, since: ApiVersion) -> bool {
        since <= *self
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Hands out the active API version.
#[derive(Clone, Debug)]
pub struct VersioningService {
    current: ApiVersion,
}

impl VersioningService {
    pub fn new(current: ApiVersion) -> Self {
        VersioningService { current }
    }

    /// Build from the configured version string, falling back to 1.0.
    pub fn from_config(raw: &str) -> Self {
        let current = ApiVersion::parse(raw).unwrap_or_else(|| {
            warn!("Unparseable API version {:?}, using {}", raw, ApiVersion::V1_0);
            ApiVersion::V1_0
        });
        VersioningService { current }
    }

    pub fn get_version(&self) -> ApiVersion {
        self.current
    }
}

impl Default for VersioningService {
    fn default() -> Self {
        Self::new(ApiVersion::V1_0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(ApiVersion::parse("1.0"), Some(ApiVersion::new(1, 0)));
        assert_eq!(ApiVersion::parse("v2.1"), Some(ApiVersion::new(2, 1)));
        assert_eq!(ApiVersion::parse("3"), Some(ApiVersion::new(3, 0)));
        assert_eq!(ApiVersion::parse("one"), None);
        assert_eq!(ApiVersion::parse("1.x"), None);
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(ApiVersion::new(1, 10) > ApiVersion::new(1, 9));
        assert!(ApiVersion::new(2, 0) > ApiVersion::new(1, 99));
    }

    #[test]
    fn test_includes() {
        let v = ApiVersion::new(1, 5);
        assert!(v.includes(ApiVersion::new(1, 0)));
        assert!(v.includes(ApiVersion::new(1, 5)));
        assert!(!v.includes(ApiVersion::new(2, 0)));
    }

    #[test]
    fn test_service_falls_back_on_garbage() {
        assert_eq!(
            VersioningService::from_config("nope").get_version(),
            ApiVersion::V1_0
        );
        assert_eq!(
            VersioningService::from_config("2.0").get_version().to_string(),
            "2.0"
        );
    }
}
