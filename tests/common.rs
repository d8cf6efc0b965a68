//! Shared harness for end-to-end tests
//!
//! Every test gets its own appdata directory and its own mock release host.
//! The application is wired with the production adapters (reqwest fetcher,
//! tag-page release discovery); only the host they talk to is fake.
//!
//! ## Usage Pattern
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn my_test() {
//!     let h = Harness::start().await;
//!     h.publish_releases(&[("v1", COMMIT)]).await;
//!     h.publish_tarball("v1").await;
//!     // drive h.app / h.engine() / h.orchestrator()
//! }
//! ```
//!
//! The engine binary inside published archives is a shell script that prints
//! its arguments one per line into the log and then sleeps, so process tests
//! only run on unix.

use flate2::write::GzEncoder;
use flate2::Compression;
use shaper_engine::application::{
    AppOptions, DefaultResources, EngineInstaller, EngineProcessController, SyncOrchestrator,
};
use shaper_engine::domain::{ProfileEntry, TargetPlatform};
use shaper_engine::infrastructure::ResourceRegistry;
use shaper_engine::{App, AppContext};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REPO: &str = "bol-van/zapret2";

/// Prints one argument per line, then `ready`, then sleeps until terminated
pub const FAKE_ENGINE: &str =
    "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\"; done\necho ready\nexec sleep 60\n";

pub struct Harness {
    pub server: MockServer,
    pub home: tempfile::TempDir,
    pub app: App,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Build with adjusted options; the release host is always the mock server
    pub async fn start_with<F>(adjust: F) -> Self
    where
        F: FnOnce(&mut AppOptions),
    {
        let server = MockServer::start().await;
        let home = tempfile::tempdir().expect("tempdir");

        let mut options = AppOptions::new(home.path());
        options.distribution.github_base = server.uri();
        options.distribution.raw_base = format!("{}/raw", server.uri());
        options.self_update = None;
        options.defaults = defaults(&server.uri());
        options.fetch_attempts = 2;
        options.fetch_backoff = Duration::from_millis(10);
        options.restart_pause = Duration::ZERO;
        options.activation_settle = Duration::from_millis(50);
        adjust(&mut options);

        let ctx = AppContext::new(options).expect("wire application");
        Self {
            server,
            home,
            app: App::new(ctx),
        }
    }

    pub fn registry(&self) -> Arc<ResourceRegistry> {
        self.app.context().registry()
    }

    pub fn engine(&self) -> Arc<EngineProcessController> {
        self.app.context().engine()
    }

    pub fn installer(&self) -> Arc<EngineInstaller> {
        self.app.context().installer()
    }

    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        self.app.context().orchestrator()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Tags page listing `releases` (tag, commit) followed by an empty page
    pub async fn publish_releases(&self, releases: &[(&str, &str)]) {
        let body: String = releases
            .iter()
            .map(|(tag, commit)| tag_block(tag, commit))
            .collect();

        if let Some((last, _)) = releases.last() {
            Mock::given(method("GET"))
                .and(path(format!("/{REPO}/tags")))
                .and(query_param("after", *last))
                .respond_with(ResponseTemplate::new(200).set_body_string("<div>no more tags</div>"))
                .with_priority(1)
                .mount(&self.server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path(format!("/{REPO}/tags")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Release archive for `tag` with the fake engine for the host platform
    pub fn tarball_mock(&self, tag: &str) -> Mock {
        Mock::given(method("GET"))
            .and(path(format!("/{REPO}/releases/download/{tag}/zapret2-{tag}.tar.gz")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(release_tarball(tag, &TargetPlatform::current())),
            )
    }

    pub async fn publish_tarball(&self, tag: &str) {
        self.tarball_mock(tag).mount(&self.server).await;
    }

    /// Raw Lua scripts of any commit plus every default resource
    pub async fn serve_resources(&self) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/raw/.+/lua/.+\.lua$"))
            .respond_with(ResponseTemplate::new(200).set_body_string("-- engine lua"))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/res/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_string("resource body\n"))
            .mount(&self.server)
            .await;
    }

    /// Argument vector the running engine printed into its log
    pub async fn engine_args(&self) -> Vec<String> {
        let engine = self.engine();
        for _ in 0..100 {
            let log = engine.read_log().await.expect("read log");
            if log.ends_with("ready\n") {
                let mut lines: Vec<String> = log.lines().map(str::to_string).collect();
                lines.pop();
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("engine never printed its arguments");
    }
}

/// Default resources served from `<base>/res/...`
pub fn defaults(base: &str) -> DefaultResources {
    let res = |kind: &str, name: &str| format!("{base}/res/{kind}/{name}");
    DefaultResources {
        profiles: ["quic", "tls"]
            .into_iter()
            .map(|name| ProfileEntry::new(name, true, res("profiles", name)))
            .collect(),
        lists: ["rulist", "discord"]
            .into_iter()
            .map(|name| (name.to_string(), res("lists", name)))
            .collect(),
        lua: ["zapret-lib", "zapret-antidpi", "zapret-auto", "bununban-lib"]
            .into_iter()
            .map(|name| (name.to_string(), res("lua", name)))
            .collect(),
        blobs: vec![(
            "tls_clienthello_www_google_com".to_string(),
            res("blobs", "tls_clienthello_www_google_com"),
        )],
        windows: false,
    }
}

pub fn tag_block(tag: &str, commit: &str) -> String {
    format!(
        r#"<div class="Box-row">
  <h2 class="f4 d-inline"><a href="/{REPO}/releases/tag/{tag}" class="Link--primary">{tag}</a></h2>
  <a class="Link--muted" href="/{REPO}/commit/{commit}">{tag} commit</a>
</div>
"#
    )
}

/// Archive laid out like a published release
pub fn release_tarball(tag: &str, platform: &TargetPlatform) -> Vec<u8> {
    let dir = format!("zapret2-{tag}/binaries/{}", platform.binaries_dir());
    let entries = [
        (format!("{dir}/{}", platform.engine_binary_name()), FAKE_ENGINE.as_bytes()),
        (format!("{dir}/ip2net"), b"helper".as_slice()),
        (format!("zapret2-{tag}/lua/zapret-lib.lua"), b"-- bundled".as_slice()),
    ];

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, data).expect("append");
    }
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .expect("finish tarball")
}
