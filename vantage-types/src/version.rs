//! Mirror format versioning.

use core::fmt;

use crate::MIRROR_FORMAT_VERSION;

/// Format of a serialized mirror, written by the regenerator.
///
/// Readers accept any minor revision of their own major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The format this crate writes.
    pub const fn current() -> Self {
        Self::new(MIRROR_FORMAT_VERSION, 0)
    }

    pub fn is_compatible(&self) -> bool {
        self.major == MIRROR_FORMAT_VERSION
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_revisions_are_compatible() {
        assert!(FormatVersion::current().is_compatible());
        assert!(FormatVersion::new(MIRROR_FORMAT_VERSION, 7).is_compatible());
        assert!(!FormatVersion::new(MIRROR_FORMAT_VERSION + 1, 0).is_compatible());
    }

    #[test]
    fn test_display() {
        assert_eq!(FormatVersion::new(2, 3).to_string(), "2.3");
    }
}
