//! Registry entry value objects
//! On-disk shapes of profile, file-backed and hook-script records

use serde::{Deserialize, Serialize};

fn is_false(v: &bool) -> bool {
    !*v
}

/// An ordered, toggle-able fragment of engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub sync_url: String,
    #[serde(default)]
    pub content: String,
}

impl ProfileEntry {
    pub fn new(name: impl Into<String>, active: bool, sync_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active,
            sync_url: sync_url.into(),
            content: String::new(),
        }
    }

    pub fn sync_url(&self) -> Option<&str> {
        Some(self.sync_url.as_str()).filter(|u| !u.is_empty())
    }

    /// Content collapsed onto one line with runs of whitespace reduced to a single space
    pub fn single_line_content(&self) -> String {
        self.content.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Metadata of a List, Lua or Blob entry; the content lives in a materialized file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(default, skip_serializing_if = "is_false")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_url: Option<String>,
}

impl FileEntry {
    pub fn new(active: bool, sync_url: impl Into<String>) -> Self {
        let url = sync_url.into();
        Self {
            active,
            sync_url: Some(url).filter(|u| !u.is_empty()),
        }
    }

    /// A list entry: never toggled, only referenced through `{name}`
    pub fn list(sync_url: impl Into<String>) -> Self {
        Self::new(false, sync_url)
    }

    pub fn sync_url(&self) -> Option<&str> {
        self.sync_url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Shell fragments run around the engine process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StartupScripts {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
}
