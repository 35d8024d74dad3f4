// ABOUTME: Site profiles and the ordered registry that resolves a URL to its profile.
// ABOUTME: The builtin table is embedded JSON; a custom table can be loaded from a file.

//! Site-specific extraction profiles.
//!
//! Each supported news site is described by a [`SiteProfile`]: the domain
//! substring that identifies it, the CSS selector of its article body and a
//! couple of layout/transport flags. Profiles live in a [`SiteRegistry`],
//! which keeps them in insertion order and resolves URLs by
//! "first substring match wins".

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Embedded JSON containing the builtin site table.
const BUILTIN_SITES_JSON: &str = include_str!("../data/sites.json");

/// Extraction settings for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Domain substring identifying the site, e.g. "vnexpress.net".
    pub id: String,
    /// CSS selector of the element holding the article body.
    pub body_selector: String,
    /// Forum layouts separate paragraphs with `<br>` instead of `<p>`.
    #[serde(default)]
    pub breaks_as_paragraphs: bool,
    /// The site only serves content with certificate verification disabled.
    #[serde(default)]
    pub insecure_tls: bool,
}

impl SiteProfile {
    /// Creates a profile with both flags off.
    pub fn new(id: impl Into<String>, body_selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body_selector: body_selector.into(),
            breaks_as_paragraphs: false,
            insecure_tls: false,
        }
    }
}

/// Output file prefix for a site id ("vnexpress.net" -> "VNEXPRESS").
pub fn site_file_prefix(id: &str) -> String {
    id.split('.').next().unwrap_or(id).to_uppercase()
}

/// Ordered registry of site profiles.
#[derive(Debug, Default, Clone)]
pub struct SiteRegistry {
    sites: Vec<SiteProfile>,
}

impl SiteRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a registry from a JSON array of profiles, keeping array order.
    pub fn from_json_str(json: &str) -> Result<Self, ExtractError> {
        let sites: Vec<SiteProfile> = serde_json::from_str(json).map_err(|e| {
            ExtractError::config("LoadSites", Some(anyhow::anyhow!("invalid site table: {}", e)))
        })?;

        let mut registry = Self::new();
        for site in sites {
            registry.register(site);
        }
        Ok(registry)
    }

    /// Loads a registry from a JSON file with the same schema as the builtin table.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let json = fs::read_to_string(path).map_err(|e| {
            ExtractError::config(
                "LoadSites",
                Some(anyhow::anyhow!("failed to read {}: {}", path.display(), e)),
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Registers a profile. A profile with an existing id replaces it in place.
    pub fn register(&mut self, site: SiteProfile) {
        match self.sites.iter_mut().find(|s| s.id == site.id) {
            Some(existing) => *existing = site,
            None => self.sites.push(site),
        }
    }

    /// Returns the first profile whose id is contained in `url`.
    pub fn resolve(&self, url: &str) -> Result<&SiteProfile, ExtractError> {
        self.sites
            .iter()
            .find(|s| url.contains(s.id.as_str()))
            .ok_or_else(|| ExtractError::unknown_site(url, "Resolve"))
    }

    /// Looks up a profile by id.
    pub fn get(&self, id: &str) -> Option<&SiteProfile> {
        self.sites.iter().find(|s| s.id == id)
    }

    /// Returns true if a profile with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Iterates profiles in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &SiteProfile> {
        self.sites.iter()
    }

    /// Returns pairs of ids where the first is a substring of the second.
    ///
    /// For such a pair, resolution depends on table order; a curated table has none.
    pub fn overlapping_ids(&self) -> Vec<(&str, &str)> {
        let mut overlaps = Vec::new();
        for a in &self.sites {
            for b in &self.sites {
                if a.id != b.id && b.id.contains(a.id.as_str()) {
                    overlaps.push((a.id.as_str(), b.id.as_str()));
                }
            }
        }
        overlaps
    }

    /// Returns the number of registered sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true if no sites are registered.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Loads the builtin site table.
pub fn load_builtin_registry() -> Result<SiteRegistry, ExtractError> {
    SiteRegistry::from_json_str(BUILTIN_SITES_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_registry_loads_in_order() {
        let registry = load_builtin_registry().unwrap();
        assert_eq!(registry.len(), 17);
        let first = registry.iter().next().unwrap();
        assert_eq!(first.id, "vnexpress.net");
        assert_eq!(first.body_selector, "article.fck_detail");
    }

    #[test]
    fn builtin_registry_has_no_overlapping_ids() {
        let registry = load_builtin_registry().unwrap();
        assert!(
            registry.overlapping_ids().is_empty(),
            "overlapping ids: {:?}",
            registry.overlapping_ids()
        );
    }

    #[test]
    fn resolve_known_sites() {
        let registry = load_builtin_registry().unwrap();
        let cases = [
            ("https://vnexpress.net/duong-day-4913042.html", "vnexpress.net"),
            ("https://tuoitre.vn/thu-tuong-2025071318184971.htm", "tuoitre.vn"),
            ("https://baochinhphu.vn/no-luc-102250712113541294.htm", "chinhphu.vn"),
            ("https://dantri.com.vn/xa-hoi/don-doc-20250713180551692.htm", "dantri.com.vn"),
            ("https://www.24h.com.vn/bong-da/abc-c48a1.html", "24h.com.vn"),
        ];
        for (url, id) in cases {
            assert_eq!(registry.resolve(url).unwrap().id, id, "url: {}", url);
        }
    }

    #[test]
    fn resolve_is_deterministic() {
        let registry = load_builtin_registry().unwrap();
        let url = "https://kenh14.vn/khach-viet-215250713195229459.chn";
        let first = registry.resolve(url).unwrap().id.clone();
        for _ in 0..5 {
            assert_eq!(registry.resolve(url).unwrap().id, first);
        }
    }

    #[test]
    fn resolve_unknown_site_fails() {
        let registry = load_builtin_registry().unwrap();
        let err = registry.resolve("https://example.com/news/1").unwrap_err();
        assert!(err.is_unknown_site());
        assert_eq!(err.url, "https://example.com/news/1");
    }

    #[test]
    fn theanh28_uses_breaks_and_insecure_tls() {
        let registry = load_builtin_registry().unwrap();
        let site = registry.get("theanh28.vn").unwrap();
        assert!(site.breaks_as_paragraphs);
        assert!(site.insecure_tls);

        let other = registry.get("vnexpress.net").unwrap();
        assert!(!other.breaks_as_paragraphs);
        assert!(!other.insecure_tls);
    }

    #[test]
    fn first_match_wins_on_overlap() {
        let mut registry = SiteRegistry::new();
        registry.register(SiteProfile::new("news.vn", "div.a"));
        registry.register(SiteProfile::new("hotnews.vn", "div.b"));
        assert_eq!(registry.overlapping_ids(), vec![("news.vn", "hotnews.vn")]);
        assert_eq!(registry.resolve("https://hotnews.vn/x").unwrap().id, "news.vn");
    }

    #[test]
    fn register_replaces_in_place() {
        let mut registry = SiteRegistry::new();
        registry.register(SiteProfile::new("a.vn", "div.a"));
        registry.register(SiteProfile::new("b.vn", "div.b"));
        registry.register(SiteProfile::new("a.vn", "div.new"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().next().unwrap().body_selector, "div.new");
    }

    #[test]
    fn from_json_str_rejects_malformed_table() {
        let err = SiteRegistry::from_json_str("{not json").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Config);
    }

    #[test]
    fn file_prefix_uses_first_label() {
        assert_eq!(site_file_prefix("vnexpress.net"), "VNEXPRESS");
        assert_eq!(site_file_prefix("24h.com.vn"), "24H");
        assert_eq!(site_file_prefix("127.0.0.1"), "127");
    }
}
