//! SyncScope value object
//! Which entries a refresh touches and whether policy flags apply

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncScope {
    /// Timer-driven: honours the per-namespace `updater.*` flag
    #[default]
    Scheduled,

    /// Bypasses the policy flag, refreshes every entry with a sync URL
    Forced,

    /// Bypasses the policy flag, refreshes only the named entries
    Only(Vec<String>),
}

impl SyncScope {
    pub fn from_force(force: bool) -> Self {
        if force {
            SyncScope::Forced
        } else {
            SyncScope::Scheduled
        }
    }

    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SyncScope::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn bypasses_policy(&self) -> bool {
        !matches!(self, SyncScope::Scheduled)
    }

    pub fn includes(&self, name: &str) -> bool {
        match self {
            SyncScope::Only(names) => names.iter().any(|n| n == name),
            _ => true,
        }
    }
}
