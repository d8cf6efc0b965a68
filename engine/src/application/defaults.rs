//! Default appdata
//! Resources and settings a fresh installation starts with

use crate::constants::{app, keys, sync};
use crate::domain::{DomainError, FileEntry, Namespace, ProfileEntry, SyncScope, TargetPlatform};
use crate::infrastructure::ResourceRegistry;
use tracing::info;

const BUNUNBAN: &str = "https://raw.githubusercontent.com/Greezor/bununban/refs/heads/master/resources";
const ZAPRET2: &str = "https://raw.githubusercontent.com/bol-van/zapret2/refs/heads/master";
const ANKDDEV: &str =
    "https://raw.githubusercontent.com/ankddev/zapret-discord-youtube/refs/heads/main/lists";

const WINDOWS_STARTUP_ARGS: &str = "--wf-tcp-out=80,443-65535 --wf-udp-out=80,443-65535";

#[derive(Debug, Clone, Default)]
pub struct DefaultResources {
    pub profiles: Vec<ProfileEntry>,
    /// `(name, sync URL)`
    pub lists: Vec<(String, String)>,
    /// `(name, sync URL)`, seeded active
    pub lua: Vec<(String, String)>,
    /// `(name, sync URL)`, seeded active
    pub blobs: Vec<(String, String)>,
    /// Local bind and WinDivert filter defaults
    pub windows: bool,
}

fn pairs(items: &[(&str, String)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(name, url)| (name.to_string(), url.clone()))
        .collect()
}

impl DefaultResources {
    /// The stock profile, list, lua and blob set
    pub fn builtin(platform: &TargetPlatform) -> Self {
        let profiles = ["quic", "discord", "stun", "wireguard", "unknown-udp", "google", "tls"]
            .into_iter()
            .map(|name| ProfileEntry::new(name, true, format!("{BUNUNBAN}/profiles/{name}.sh")))
            .collect();

        let mut lists = vec![(
            "rulist",
            "https://raw.githubusercontent.com/bol-van/rulist/refs/heads/main/reestr_hostname.txt"
                .to_string(),
        )];
        for name in [
            "apple", "cloudflare", "discord", "instagram", "meta", "rutor", "rutracker",
            "speedtest", "telegram", "tor", "twitter", "viber",
        ] {
            lists.push((name, format!("{ANKDDEV}/list-{name}.txt")));
        }
        for name in ["riotgames", "roblox", "vrchat", "whatsapp", "google", "custom"] {
            lists.push((name, format!("{BUNUNBAN}/lists/{name}.txt")));
        }

        let mut lua: Vec<(&str, String)> = ["zapret-lib", "zapret-antidpi", "zapret-auto"]
            .into_iter()
            .map(|name| (name, format!("{ZAPRET2}/lua/{name}.lua")))
            .collect();
        lua.push(("bununban-lib", format!("{BUNUNBAN}/lua/bununban-lib.lua")));

        let blobs: Vec<(&str, String)> =
            ["quic_initial_www_google_com", "tls_clienthello_www_google_com"]
                .into_iter()
                .map(|name| (name, format!("{ZAPRET2}/files/fake/{name}.bin")))
                .collect();

        Self {
            profiles,
            lists: pairs(&lists),
            lua: pairs(&lua),
            blobs: pairs(&blobs),
            windows: platform.is_windows(),
        }
    }

    /// Write every default into the registry, then fetch their content
    pub async fn seed(&self, registry: &ResourceRegistry) -> Result<(), DomainError> {
        info!(
            profiles = self.profiles.len(),
            lists = self.lists.len(),
            lua = self.lua.len(),
            blobs = self.blobs.len(),
            "Seeding default appdata"
        );

        registry.set_profiles(&self.profiles).await?;

        let file_backed = [
            (Namespace::Lists, &self.lists, false),
            (Namespace::Lua, &self.lua, true),
            (Namespace::Blobs, &self.blobs, true),
        ];
        for (namespace, entries, active) in file_backed {
            let store = registry.store(namespace);
            for (name, url) in entries {
                store.set(name, FileEntry::new(active, url.as_str())).await?;
            }
        }

        let settings = registry.settings();
        settings.set(keys::HOSTNAME, app::DEFAULT_HOSTNAME).await?;
        settings.set(keys::PORT, app::DEFAULT_PORT).await?;
        for flag in [
            keys::UPDATE_SELF,
            keys::UPDATE_ENGINE,
            keys::UPDATE_PROFILES,
            keys::UPDATE_LISTS,
            keys::UPDATE_LUA,
            keys::UPDATE_BLOBS,
        ] {
            settings.set(flag, true).await?;
        }
        settings.set(keys::UPDATE_INTERVAL, sync::DEFAULT_INTERVAL_MS).await?;
        settings.set(keys::ENGINE_DEBUG, false).await?;

        if self.windows {
            settings.set(keys::HOSTNAME, "localhost").await?;
            settings.set(keys::STARTUP_ARGS, WINDOWS_STARTUP_ARGS).await?;
        }

        registry.sync_profiles(&SyncScope::Forced).await?;
        for namespace in Namespace::FILE_BACKED {
            registry.sync_files(namespace, &SyncScope::Forced).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::AppPaths;
    use crate::testing::CannedFetcher;
    use std::sync::Arc;

    #[test]
    fn test_builtin_set() {
        let defaults = DefaultResources::builtin(&TargetPlatform::new("linux", "x86_64"));
        assert_eq!(defaults.profiles.len(), 7);
        assert_eq!(defaults.lists.len(), 19);
        assert_eq!(defaults.lua.len(), 4);
        assert_eq!(defaults.blobs.len(), 2);
        assert!(!defaults.windows);
        assert_eq!(
            defaults.lists[1].1,
            "https://raw.githubusercontent.com/ankddev/zapret-discord-youtube/refs/heads/main/lists/list-apple.txt"
        );
        assert!(defaults.profiles.iter().all(|p| p.active && p.content.is_empty()));
    }

    #[tokio::test]
    async fn test_seed_writes_entries_and_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CannedFetcher::default());
        fetcher.serve("https://r/p.sh", "--filter-tcp=443");
        fetcher.serve("https://r/l.txt", "example.com");
        fetcher.serve("https://r/s.lua", "-- lua");
        let registry = ResourceRegistry::new(AppPaths::new(dir.path()), fetcher.clone());

        let defaults = DefaultResources {
            profiles: vec![ProfileEntry::new("p", true, "https://r/p.sh")],
            lists: vec![("l".into(), "https://r/l.txt".into())],
            lua: vec![("s".into(), "https://r/s.lua".into())],
            blobs: vec![("b".into(), "https://r/missing.bin".into())],
            windows: true,
        };
        defaults.seed(&registry).await.unwrap();

        assert_eq!(registry.profiles().await.unwrap()[0].content, "--filter-tcp=443");
        assert!(dir.path().join("files/lists/l").exists());
        assert!(dir.path().join("files/lua/s").exists());
        assert!(!dir.path().join("files/blobs/b").exists());

        let lua = registry.entry(Namespace::Lua, "s").await.unwrap().unwrap();
        assert!(lua.active);
        let list = registry.entry(Namespace::Lists, "l").await.unwrap().unwrap();
        assert!(!list.active);

        let settings = registry.settings();
        assert!(settings.get_flag(keys::UPDATE_ENGINE).await.unwrap());
        assert!(!settings.get_flag(keys::ENGINE_DEBUG).await.unwrap());
        assert_eq!(
            settings.get_as::<String>(keys::HOSTNAME).await.unwrap().as_deref(),
            Some("localhost")
        );
        assert_eq!(
            settings.get_as::<String>(keys::STARTUP_ARGS).await.unwrap().as_deref(),
            Some(WINDOWS_STARTUP_ARGS)
        );
        assert_eq!(
            settings.get_as::<u64>(keys::UPDATE_INTERVAL).await.unwrap(),
            Some(sync::DEFAULT_INTERVAL_MS)
        );
    }
}
