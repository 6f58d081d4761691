//! URL classification rules.
//!
//! Maps an intercepted URL to a caching strategy and the store it reads and
//! writes. Rules are checked in a fixed order and the first match wins:
//!
//! | rule     | matched against | strategy               | store   |
//! |----------|-----------------|------------------------|---------|
//! | api      | path            | network-first          | runtime |
//! | static   | path            | cache-first            | static  |
//! | html     | path (or `/`)   | stale-while-revalidate | runtime |
//! | external | full URL        | cache-first            | runtime |
//! | default  |                 | network-first          | runtime |

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::RoutePatterns;

/// Caching strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Which of the two versioned stores a route uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Static,
    Runtime,
}

/// Name of the rule that produced a [`Route`], for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteRule {
    Api,
    StaticAsset,
    Html,
    External,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Route {
    pub rule: RouteRule,
    pub strategy: Strategy,
    pub store: StoreKind,
}

impl Route {
    const fn new(rule: RouteRule, strategy: Strategy, store: StoreKind) -> Self {
        Self { rule, strategy, store }
    }
}

/// Compiled classification table.
#[derive(Debug, Clone)]
pub struct Router {
    api: Regex,
    static_assets: Regex,
    html: Regex,
    external: Regex,
}

impl Router {
    /// Compile the configured patterns.
    pub fn new(patterns: &RoutePatterns) -> Result<Self, regex::Error> {
        Ok(Self {
            api: Regex::new(&patterns.api)?,
            static_assets: Regex::new(&patterns.static_assets)?,
            html: Regex::new(&patterns.html)?,
            external: Regex::new(&patterns.external)?,
        })
    }

    /// Classify a URL. Never fails: unmatched URLs take the default route.
    pub fn classify(&self, url: &Url) -> Route {
        let path = url.path();

        if self.api.is_match(path) {
            return Route::new(RouteRule::Api, Strategy::NetworkFirst, StoreKind::Runtime);
        }
        if self.static_assets.is_match(path) {
            return Route::new(RouteRule::StaticAsset, Strategy::CacheFirst, StoreKind::Static);
        }
        if path == "/" || self.html.is_match(path) {
            return Route::new(RouteRule::Html, Strategy::StaleWhileRevalidate, StoreKind::Runtime);
        }
        if self.external.is_match(url.as_str()) {
            return Route::new(RouteRule::External, Strategy::CacheFirst, StoreKind::Runtime);
        }

        Route::new(RouteRule::Default, Strategy::NetworkFirst, StoreKind::Runtime)
    }
}
