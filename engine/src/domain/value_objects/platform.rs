//! TargetPlatform value object
//! Platform/architecture pair used to pick binaries out of a release archive

use crate::constants::engine::{BINARY_UNIX, BINARY_WINDOWS};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlatform {
    pub os: String,
    pub arch: String,
}

impl TargetPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for, named the way release archives name it
    pub fn current() -> Self {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_rust(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Platform family with a graphical subsystem (console window suppression applies)
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Directory component inside a release archive, e.g. `linux-x86_64`
    pub fn binaries_dir(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    pub fn engine_binary_name(&self) -> &'static str {
        if self.is_windows() {
            BINARY_WINDOWS
        } else {
            BINARY_UNIX
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.binaries_dir())
    }
}
