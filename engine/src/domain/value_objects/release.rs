//! EngineRelease value object

use std::fmt;

/// A discovered remote engine version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineRelease {
    pub tag: String,
    pub commit: String,
}

impl EngineRelease {
    pub fn new(tag: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            commit: commit.into(),
        }
    }
}

impl fmt::Display for EngineRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.commit)
    }
}
