//! Router icons.
//!
//! Icons are looked up by names derived from a router's service, name and
//! hosts, downloaded once from the dashboard-icons repository and cached on
//! disk. Routers with no match get a generated placeholder.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use dashmap::DashMap;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config,
    core::DashboardResult,
    traefik::{rule::extract_hosts, DisplayRouter},
};

/// URL prefix the dashboard serves cached icons under.
pub const ICONS_ROUTE: &str = "/icons/";

pub const PLACEHOLDER_NAME: &str = "placeholder.svg";

/// Repository folders and extensions, in lookup order.
const ICON_SOURCES: &[(&str, &str)] = &[("svg", "svg"), ("png", "png"), ("webp", "webp")];

const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="96" height="96" viewBox="0 0 96 96" role="img" aria-label="No icon"><rect x="8" y="8" width="80" height="80" rx="16" fill="#d1d5db"/><circle cx="48" cy="48" r="18" fill="none" stroke="#6b7280" stroke-width="6" stroke-opacity="0.5"/></svg>"##;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").expect("valid pattern"));
static INVALID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid pattern"));
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid pattern"));

pub struct IconResolver {
    dir: PathBuf,
    repository: String,
    http: reqwest::Client,
    // slug -> cached file name, or None when nothing exists upstream
    resolved: DashMap<String, Option<String>>,
}

impl IconResolver {
    pub fn new(cfg: &config::Icons) -> DashboardResult<Self> {
        let http = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            dir: cfg.dir.clone(),
            repository: cfg.repository.trim_end_matches('/').to_string(),
            http,
            resolved: DashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// URL path of the icon for `router`, downloading it if needed.
    ///
    /// Falls back to the placeholder; `None` only if even that cannot be written.
    /// Once the repository fails to answer, the remaining candidates are only
    /// looked up on disk and nothing is remembered, so a later call retries.
    pub async fn icon_path(&self, router: &DisplayRouter) -> Option<String> {
        let mut reachable = true;
        for candidate in candidate_names(&router.name, &router.service, &router.rule) {
            let found = if reachable {
                match self.resolve(&candidate).await {
                    Ok(found) => found,
                    Err(e) => {
                        debug!("Icon lookup for {candidate} failed: {e}");
                        reachable = false;
                        None
                    }
                }
            } else {
                self.cached_file(&candidate).await
            };

            if let Some(file) = found {
                return Some(format!("{ICONS_ROUTE}{file}"));
            }
        }

        match self.ensure_placeholder().await {
            Ok(file) => Some(format!("{ICONS_ROUTE}{file}")),
            Err(e) => {
                warn!("Failed to write placeholder icon: {e}");
                None
            }
        }
    }

    // Only a definite answer is memoized: a cached file, a download, or every
    // source reporting the icon missing.
    async fn resolve(&self, slug: &str) -> DashboardResult<Option<String>> {
        if let Some(known) = self.resolved.get(slug) {
            return Ok(known.value().clone());
        }

        let found = match self.cached_file(slug).await {
            Some(file) => Some(file),
            None => self.download(slug).await?,
        };
        self.resolved.insert(slug.to_string(), found.clone());
        Ok(found)
    }

    async fn cached_file(&self, slug: &str) -> Option<String> {
        for (_, ext) in ICON_SOURCES {
            let file = format!("{slug}.{ext}");
            if tokio::fs::try_exists(self.dir.join(&file))
                .await
                .unwrap_or(false)
            {
                return Some(file);
            }
        }
        None
    }

    async fn download(&self, slug: &str) -> DashboardResult<Option<String>> {
        for (folder, ext) in ICON_SOURCES {
            let url = format!("{}/{folder}/{slug}.{ext}", self.repository);
            let Some(body) = self.fetch(&url).await? else {
                continue;
            };

            let file = format!("{slug}.{ext}");
            self.write(&file, &body).await?;
            info!("Cached icon {file}");
            return Ok(Some(file));
        }
        Ok(None)
    }

    async fn fetch(&self, url: &str) -> DashboardResult<Option<Vec<u8>>> {
        let response = self.http.get(url).send().await?;
        if response.status() != http::StatusCode::OK {
            return Ok(None);
        }
        let body = response.bytes().await?;
        Ok((!body.is_empty()).then(|| body.to_vec()))
    }

    async fn write(&self, file: &str, body: &[u8]) -> DashboardResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(file), body).await?;
        Ok(())
    }

    async fn ensure_placeholder(&self) -> DashboardResult<String> {
        let path = self.dir.join(PLACEHOLDER_NAME);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.write(PLACEHOLDER_NAME, PLACEHOLDER_SVG.as_bytes())
                .await?;
        }
        Ok(PLACEHOLDER_NAME.to_string())
    }

    /// Reads a cached icon for serving. Returns the bytes and content type.
    pub async fn read_icon(&self, file: &str) -> Option<(Vec<u8>, &'static str)> {
        let content_type = icon_content_type(file)?;
        match tokio::fs::read(self.dir.join(file)).await {
            Ok(bytes) => Some((bytes, content_type)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read icon {file}: {e}");
                None
            }
        }
    }
}

/// Content type for a servable icon file name, `None` for anything that is
/// not a plain `<slug>.<ext>` name.
pub fn icon_content_type(file: &str) -> Option<&'static str> {
    let (stem, ext) = file.rsplit_once('.')?;
    let plain = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !plain {
        return None;
    }
    match ext {
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Lowercase, hyphenated name suitable for icon lookup.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let without_provider = strip_provider(&lowered);
    let hyphenated = SEPARATORS.replace_all(without_provider, "-");
    let cleaned = INVALID.replace_all(&hyphenated, "");
    let collapsed = HYPHENS.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

// `whoami@docker` -> `whoami`
fn strip_provider(name: &str) -> &str {
    name.split('@').next().unwrap_or_default()
}

fn first_chunk(name: &str) -> &str {
    name.split('-').next().unwrap_or_default()
}

/// Names to try, most specific first, slugified and de-duplicated.
pub fn candidate_names(name: &str, service: &str, rule: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    let service = service.trim();
    if !service.is_empty() {
        let base = strip_provider(service);
        candidates.push(base.to_string());
        candidates.push(first_chunk(base).to_string());
    }

    let name = name.trim();
    if !name.is_empty() {
        candidates.push(name.to_string());
        candidates.push(first_chunk(name).to_string());
    }

    for host in extract_hosts(rule) {
        let labels: Vec<&str> = host.split('.').collect();
        let left = labels[0];
        candidates.push(host.clone());
        if !left.is_empty() && left != host {
            candidates.push(left.to_string());
        }
        if left == "www" && labels.len() > 1 {
            candidates.push(labels[1].to_string());
        }
    }

    let mut slugs: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let slug = slugify(&candidate);
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{init_log, unreachable_base_url, FakeTraefik};

    fn resolver(dir: &Path, repository: &str) -> IconResolver {
        resolver_with_timeout(dir, repository, 2)
    }

    fn resolver_with_timeout(dir: &Path, repository: &str, timeout: u64) -> IconResolver {
        let cfg = config::Icons {
            enabled: true,
            dir: dir.to_path_buf(),
            repository: repository.to_string(),
            timeout,
        };
        IconResolver::new(&cfg).unwrap()
    }

    fn router(name: &str, service: &str, rule: &str) -> DisplayRouter {
        DisplayRouter {
            name: name.to_string(),
            rule: rule.to_string(),
            service: service.to_string(),
            status: "enabled".to_string(),
            entry_points: vec![],
            tls: false,
            url: "#".to_string(),
            icon: None,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Home Assistant@docker"), "home-assistant");
        assert_eq!(slugify("my_app__v2"), "my-app-v2");
        assert_eq!(slugify("  Grafana  "), "grafana");
        assert_eq!(slugify("a--b"), "a-b");
        assert_eq!(slugify("---"), "");
        assert_eq!(slugify("nextcloud.example.com"), "nextcloudexamplecom");
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(
            candidate_names(
                "whoami@docker",
                "whoami-svc@docker",
                "Host(`www.example.com`)"
            ),
            vec!["whoami-svc", "whoami", "wwwexamplecom", "www", "example"]
        );
    }

    #[test]
    fn test_candidate_names_multiple_hosts() {
        assert_eq!(
            candidate_names("", "", "Host(`grafana.lan`, `metrics.lan`)"),
            vec!["grafanalan", "grafana", "metricslan", "metrics"]
        );
        assert!(candidate_names("", "", "").is_empty());
    }

    #[test]
    fn test_icon_content_type() {
        assert_eq!(icon_content_type("grafana.svg"), Some("image/svg+xml"));
        assert_eq!(icon_content_type("home-assistant.png"), Some("image/png"));
        assert_eq!(icon_content_type("x.webp"), Some("image/webp"));
        assert_eq!(icon_content_type("../secret.svg"), None);
        assert_eq!(icon_content_type("a/b.svg"), None);
        assert_eq!(icon_content_type(".svg"), None);
        assert_eq!(icon_content_type("grafana.html"), None);
        assert_eq!(icon_content_type("grafana"), None);
    }

    #[tokio::test]
    async fn test_downloads_first_candidate() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        let repo = FakeTraefik::start(200, "<svg/>").await;
        let icons = resolver(dir.path(), &repo.base_url());

        let path = icons
            .icon_path(&router("grafana@docker", "grafana@docker", ""))
            .await;
        assert_eq!(path.as_deref(), Some("/icons/grafana.svg"));
        assert!(dir.path().join("grafana.svg").exists());

        let (bytes, content_type) = icons.read_icon("grafana.svg").await.unwrap();
        assert_eq!(bytes, b"<svg/>");
        assert_eq!(content_type, "image/svg+xml");
    }

    #[tokio::test]
    async fn test_missing_icon_uses_placeholder_and_is_memoized() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        let repo = FakeTraefik::start(404, "").await;
        let icons = resolver(dir.path(), &repo.base_url());
        let unknown = router("unknown", "unknown", "");

        let path = icons.icon_path(&unknown).await;
        assert_eq!(path.as_deref(), Some("/icons/placeholder.svg"));
        assert!(dir.path().join(PLACEHOLDER_NAME).exists());

        // svg, png and webp were tried for the single slug
        let hits = repo.hits();
        assert_eq!(hits, 3);

        icons.icon_path(&unknown).await;
        assert_eq!(repo.hits(), hits);
    }

    #[tokio::test]
    async fn test_uses_local_cache_first() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jellyfin.png"), b"png").unwrap();
        let icons = resolver(dir.path(), &unreachable_base_url());

        let path = icons
            .icon_path(&router("media", "jellyfin@docker", ""))
            .await;
        assert_eq!(path.as_deref(), Some("/icons/jellyfin.png"));
    }

    #[tokio::test]
    async fn test_unreachable_repository_is_retried() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        let repo = FakeTraefik::start(200, "<svg/>").await;
        repo.hang(true);
        let icons = resolver_with_timeout(dir.path(), &repo.base_url(), 1);
        let grafana = router("grafana", "grafana@docker", "Host(`grafana.lan`)");

        let path = icons.icon_path(&grafana).await;
        assert_eq!(path.as_deref(), Some("/icons/placeholder.svg"));
        // the first timeout stops further downloads for this lookup
        assert_eq!(repo.hits(), 1);

        repo.hang(false);
        let path = icons.icon_path(&grafana).await;
        assert_eq!(path.as_deref(), Some("/icons/grafana.svg"));
        assert!(dir.path().join("grafana.svg").exists());
    }

    #[tokio::test]
    async fn test_unreachable_repository_still_uses_cache() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("media.svg"), b"<svg/>").unwrap();
        let icons = resolver(dir.path(), &unreachable_base_url());

        // `jellyfin` fails to download, `media` is found on disk
        let path = icons
            .icon_path(&router("media", "jellyfin@docker", ""))
            .await;
        assert_eq!(path.as_deref(), Some("/icons/media.svg"));
    }

    #[tokio::test]
    async fn test_read_icon_rejects_unknown_files() {
        init_log();
        let dir = tempfile::tempdir().unwrap();
        let icons = resolver(dir.path(), &unreachable_base_url());

        assert!(icons.read_icon("missing.svg").await.is_none());
        assert!(icons.read_icon("../Cargo.toml").await.is_none());
    }
}
