//! The dedup gate: every resource is fetched at most once per run

use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

/// Set of resource identifiers already scheduled in this run
///
/// Membership check and insertion happen under one lock, so two tasks
/// racing on the same URL get exactly one `true` between them.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` visited, returning `true` if the caller should fetch it
    ///
    /// The URL is normalized first, so `page#top` and `page/` collide with
    /// `page`.
    pub fn try_visit(&self, url: &str) -> bool {
        let key = UrlNormalizer::normalize(url);
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn contains(&self, url: &str) -> bool {
        let key = UrlNormalizer::normalize(url);
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Utility for normalizing URLs for deduplication
pub struct UrlNormalizer;

impl UrlNormalizer {
    /// Normalize a URL for deduplication
    ///
    /// Drops the fragment and a trailing path slash. The root path keeps its
    /// slash (`https://host/`).
    pub fn normalize(url: &str) -> String {
        let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
        let (path, query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        // scheme "//" plus the slash after the host
        let is_root = path.matches('/').count() <= 3;
        let path = if path.ends_with('/') && !is_root {
            &path[..path.len() - 1]
        } else {
            path
        };

        match query {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        }
    }
}
