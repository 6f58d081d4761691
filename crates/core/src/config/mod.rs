//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the install step populates the static store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecachePolicy {
    /// Fetch every manifest entry first; write nothing if any fails.
    #[default]
    AllOrNothing,
    /// Store whatever succeeded and report the rest.
    BestEffort,
}

/// Regex sources for the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePatterns {
    /// Matched against the URL path.
    #[serde(default = "default_api_pattern")]
    pub api: String,

    /// Matched against the URL path.
    #[serde(default = "default_static_pattern")]
    pub static_assets: String,

    /// Matched against the URL path. The root path `/` always matches.
    #[serde(default = "default_html_pattern")]
    pub html: String,

    /// Matched against the full URL.
    #[serde(default = "default_external_pattern")]
    pub external: String,
}

fn default_api_pattern() -> String {
    r"(?i)/api/".into()
}

fn default_static_pattern() -> String {
    r"(?i)\.(png|jpg|jpeg|gif|webp|svg|ico|woff2|woff|ttf|eot)$".into()
}

fn default_html_pattern() -> String {
    r"(?i)\.html$".into()
}

fn default_external_pattern() -> String {
    r"(?i)https://(fonts\.googleapis\.com|cdnjs\.cloudflare\.com)".into()
}

impl Default for RoutePatterns {
    fn default() -> Self {
        Self {
            api: default_api_pattern(),
            static_assets: default_static_pattern(),
            html: default_html_pattern(),
            external: default_external_pattern(),
        }
    }
}

/// One action button on the push notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationActionTemplate {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Fixed template for push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub title: String,
    /// Used when the push carries no payload.
    pub default_body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationActionTemplate>,
    /// Page opened by the `explore` action.
    pub explore_url: String,
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self {
            title: "Dharma Putra Maritime".into(),
            default_body: "New notification from Dharma Putra Maritime".into(),
            icon: "/assets/images/favicon.svg".into(),
            badge: "/assets/images/badge-icon.png".into(),
            vibrate: vec![100, 50, 100],
            actions: vec![
                NotificationActionTemplate {
                    action: "explore".into(),
                    title: "Explore".into(),
                    icon: "/assets/images/explore-icon.png".into(),
                },
                NotificationActionTemplate {
                    action: "close".into(),
                    title: "Close".into(),
                    icon: "/assets/images/close-icon.png".into(),
                },
            ],
            explore_url: "/".into(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite database holding the cache stores.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Site origin that root-relative paths resolve against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Base name shared by both cache stores.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Deployment version; bumping it orphans the previous stores.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Paths fetched into the static store at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    #[serde(default)]
    pub precache_policy: PrecachePolicy,

    /// Path prefixes that are never intercepted.
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,

    /// URL schemes that are never intercepted.
    #[serde(default = "default_bypass_schemes")]
    pub bypass_schemes: Vec<String>,

    #[serde(default)]
    pub patterns: RoutePatterns,

    /// Fallback page served to HTML navigations while offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Background sync tag that flushes pending submissions.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Endpoint pending submissions are POSTed to.
    #[serde(default = "default_sync_endpoint")]
    pub sync_endpoint: String,

    #[serde(default)]
    pub notification: NotificationTemplate,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:4321".into()
}

fn default_cache_name() -> String {
    "dharma-putra-maritime".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_precache() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/favicon.svg",
        "/manifest.json",
        "/assets/main.css",
        "/src/index.js",
        "/assets/images/favicon.svg",
        "/assets/images/logo.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excluded_paths() -> Vec<String> {
    ["/api/", "/admin/", "/config.json", "/.env", "/sw.js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_bypass_schemes() -> Vec<String> {
    ["chrome-extension", "moz-extension", "safari-web-extension"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_sync_tag() -> String {
    "contact-form-sync".into()
}

fn default_sync_endpoint() -> String {
    "/api/contact".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_name: default_cache_name(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            precache: default_precache(),
            precache_policy: PrecachePolicy::default(),
            excluded_paths: default_excluded_paths(),
            bypass_schemes: default_bypass_schemes(),
            patterns: RoutePatterns::default(),
            offline_page: default_offline_page(),
            sync_tag: default_sync_tag(),
            sync_endpoint: default_sync_endpoint(),
            notification: NotificationTemplate::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the version-tagged static store.
    pub fn static_cache_name(&self) -> String {
        format!("{}-{}", self.cache_name, self.cache_version)
    }

    /// Name of the version-tagged runtime store.
    pub fn runtime_cache_name(&self) -> String {
        format!("{}-runtime-{}", self.cache_name, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack, before extraction.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }

    /// Extract and validate a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
