//! Engine command-line assembly
//!
//! Pure functions turning registry state into the engine's argument vector:
//! `{name}` token substitution, shell-like splitting and the fixed argument order.

use crate::domain::ProfileEntry;
use std::path::PathBuf;

/// An entry name paired with the absolute path of its materialized file
pub type NamedPath = (String, PathBuf);

/// Separator placed between consecutive active profiles
pub const PROFILE_SEPARATOR: &str = "--new";

/// Replace every `{name}` with the path of the list called `name`
pub fn substitute_tokens(input: &str, lists: &[NamedPath]) -> String {
    let mut out = input.to_string();
    for (name, path) in lists {
        let token = format!("{{{name}}}");
        if out.contains(&token) {
            out = out.replace(&token, &path.to_string_lossy());
        }
    }
    out
}

/// Split a command line into arguments.
/// Whitespace separates arguments; single and double quotes group, and are removed.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_arg = true;
            }
            None if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            None => {
                current.push(c);
                in_arg = true;
            }
        }
    }
    if in_arg {
        args.push(current);
    }
    args
}

/// Everything the engine command line is built from
#[derive(Debug, Default)]
pub struct EngineArgsInput<'a> {
    pub debug: bool,
    /// Active Lua entries
    pub lua: &'a [NamedPath],
    /// Active Blob entries
    pub blobs: &'a [NamedPath],
    pub startup_args: &'a str,
    /// All profiles in user order; inactive ones are skipped here
    pub profiles: &'a [ProfileEntry],
    /// All list entries, for token substitution
    pub lists: &'a [NamedPath],
}

/// Build the argument vector, in order: debug flag, `--lua-init`, `--blob`,
/// startup arguments, then active profiles joined by `--new`
pub fn build_engine_args(input: &EngineArgsInput<'_>) -> Vec<String> {
    let mut args = Vec::new();

    if input.debug {
        args.push("--debug".to_string());
    }

    args.extend(
        input
            .lua
            .iter()
            .map(|(_, path)| format!("--lua-init=@{}", path.display())),
    );

    args.extend(
        input
            .blobs
            .iter()
            .map(|(name, path)| format!("--blob={name}:@{}", path.display())),
    );

    args.extend(split_args(&substitute_tokens(
        input.startup_args,
        input.lists,
    )));

    let profiles = input
        .profiles
        .iter()
        .filter(|p| p.active)
        .map(ProfileEntry::single_line_content)
        .collect::<Vec<_>>()
        .join(&format!(" {PROFILE_SEPARATOR} "));

    args.extend(split_args(&substitute_tokens(&profiles, input.lists)));

    args
}
