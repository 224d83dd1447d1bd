//! Revision identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a point in the watched source history.
///
/// Always a full-length commit id; equality is exact full-string equality.
/// The shortened form exists for display only and is never compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full-length identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 7-character prefix for human-readable output.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(7);
        &self.0[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Revision {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Metadata of the commit a successful update landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    /// First line of the commit message.
    pub summary: String,
    /// Author name.
    pub author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_is_a_prefix_only() {
        let rev = Revision::new("abc1234def5678abc1234def5678abc1234def56");
        assert_eq!(rev.short(), "abc1234");
        assert_ne!(
            Revision::new("abc1234"),
            rev,
            "prefix must not compare equal to the full id"
        );
    }

    #[test]
    fn short_handles_truncated_ids() {
        assert_eq!(Revision::new("ab").short(), "ab");
    }
}
