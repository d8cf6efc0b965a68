//! Namespace value object
//! Each namespace persists to its own store file

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Lists,
    Lua,
    Blobs,
    Settings,
}

impl Namespace {
    /// Namespaces whose entries own a materialized file
    pub const FILE_BACKED: [Namespace; 3] = [Namespace::Lists, Namespace::Lua, Namespace::Blobs];

    /// Store file name and materialized-files directory name
    pub fn id(&self) -> &'static str {
        match self {
            Namespace::Lists => "lists",
            Namespace::Lua => "lua",
            Namespace::Blobs => "blobs",
            Namespace::Settings => "settings",
        }
    }

    pub fn is_file_backed(&self) -> bool {
        !matches!(self, Namespace::Settings)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
