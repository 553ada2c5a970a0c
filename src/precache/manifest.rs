//! Precache manifest
//!
//! Entries are unique by cache key. A `null` revision means the URL itself is
//! fingerprinted (hashed filename) and the whole URL, query included, is the
//! key. A revisioned entry's content can change behind the same URL, so its
//! key drops the query and the revision tells versions apart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::EngineError;

/// Query parameters ignored when matching requests against the manifest.
const IGNORED_PARAM_PREFIXES: [&str; 1] = ["utm_"];
const IGNORED_PARAMS: [&str; 1] = ["fbclid"];
const DIRECTORY_INDEX: &str = "index.html";

// == Manifest Entry ==
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
    #[serde(default)]
    pub revision: Option<String>,
}

impl ManifestEntry {
    pub fn new(url: impl Into<String>, revision: Option<&str>) -> Self {
        Self {
            url: url.into(),
            revision: revision.map(str::to_string),
        }
    }

    /// Key the entry is stored under in the precache.
    pub fn cache_key(&self) -> String {
        let without_fragment = strip_fragment(&self.url);
        match self.revision {
            Some(_) => strip_query(without_fragment).to_string(),
            None => without_fragment.to_string(),
        }
    }
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

// == Precache Manifest ==
/// Ordered, de-duplicated list of manifest entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<ManifestEntry>")]
pub struct PrecacheManifest {
    entries: Vec<ManifestEntry>,
    keys: HashMap<String, usize>,
}

impl PrecacheManifest {
    /// Builds a manifest, collapsing exact duplicates.
    ///
    /// Two entries that map to the same key with different revisions are
    /// rejected.
    pub fn new(entries: Vec<ManifestEntry>) -> Result<Self, EngineError> {
        let mut manifest = Self::default();
        for entry in entries {
            let key = entry.cache_key();
            match manifest.keys.get(&key) {
                Some(&index) if manifest.entries[index] == entry => continue,
                Some(&index) => {
                    return Err(EngineError::InvalidConfig(format!(
                        "conflicting manifest entries for {}: {:?} and {:?}",
                        key, manifest.entries[index].revision, entry.revision
                    )));
                }
                None => {
                    manifest.keys.insert(key, manifest.entries.len());
                    manifest.entries.push(entry);
                }
            }
        }
        Ok(manifest)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn entry_for_key(&self, key: &str) -> Option<&ManifestEntry> {
        self.keys.get(key).map(|&index| &self.entries[index])
    }

    // == Lookup ==
    /// Finds the cache key a request URL should be served from.
    ///
    /// Tries, in order: the URL without fragment, the URL without tracking
    /// parameters, and the directory index for URLs ending in `/`. Dropping
    /// the rest of the query only matches revisioned entries; an unrevisioned
    /// URL is its own fingerprint.
    pub fn lookup(&self, url: &str) -> Option<String> {
        self.candidates(url)
            .into_iter()
            .find(|(candidate, revisioned_only)| match self.entry_for_key(candidate) {
                Some(entry) => !revisioned_only || entry.revision.is_some(),
                None => false,
            })
            .map(|(candidate, _)| candidate)
    }

    fn candidates(&self, url: &str) -> Vec<(String, bool)> {
        let exact = strip_fragment(url).to_string();
        let mut candidates = vec![(exact.clone(), false)];

        let cleaned = without_tracking_params(&exact);
        if cleaned != exact {
            candidates.push((cleaned.clone(), false));
        }
        if let Some(index) = directory_index(&cleaned) {
            candidates.push((index, false));
        }

        let bare = strip_query(&cleaned).to_string();
        if bare != cleaned {
            candidates.push((bare.clone(), true));
            if let Some(index) = directory_index(&bare) {
                candidates.push((index, true));
            }
        }
        candidates
    }
}

impl TryFrom<Vec<ManifestEntry>> for PrecacheManifest {
    type Error = EngineError;

    fn try_from(entries: Vec<ManifestEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

fn is_ignored_param(name: &str) -> bool {
    IGNORED_PARAMS.contains(&name)
        || IGNORED_PARAM_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Drops tracking parameters, leaving the rest of the query byte-for-byte.
fn without_tracking_params(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let name = form_urlencoded::parse(pair.as_bytes())
                .next()
                .map(|(name, _)| name.into_owned())
                .unwrap_or_default();
            !pair.is_empty() && !is_ignored_param(&name)
        })
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

/// `index.html` under a directory URL, e.g. `https://app.test/docs/`.
fn directory_index(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if !parsed.path().ends_with('/') {
                return None;
            }
            let path = format!("{}{}", parsed.path(), DIRECTORY_INDEX);
            parsed.set_path(&path);
            Some(parsed.to_string())
        }
        Err(_) if url.ends_with('/') => Some(format!("{url}{DIRECTORY_INDEX}")),
        Err(_) => None,
    }
}
