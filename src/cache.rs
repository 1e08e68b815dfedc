//! In-memory artifact cache for compiled documents.
//!
//! Entries are keyed by document id plus the source revision hash, so
//! concurrent compilations of different documents never collide and
//! concurrent compilations of the same document converge on the same
//! entry. Writes are last-writer-wins; there is no transactional
//! requirement.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::hydrate::HydrationHint;

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub revision: String,
    pub html: String,
    pub hydration_hints: Vec<HydrationHint>,
    pub rendered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CachedRouterBundle {
    pub revision: String,
    pub bundle: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DocumentEntry {
    pages: HashMap<String, CachedPage>,
    router: Option<CachedRouterBundle>,
}

#[derive(Debug, Default)]
pub struct ArtifactCache {
    documents: RwLock<HashMap<String, DocumentEntry>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision hash of document source text.
    pub fn compute_revision(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Cached page markup, only when its revision still matches.
    pub fn get_page(&self, document_id: &str, page_id: &str, revision: &str) -> Option<CachedPage> {
        let documents = self.documents.read().ok()?;
        let page = documents.get(document_id)?.pages.get(page_id)?;
        if page.revision == revision {
            Some(page.clone())
        } else {
            None
        }
    }

    pub fn put_page(
        &self,
        document_id: &str,
        page_id: &str,
        revision: &str,
        html: String,
        hydration_hints: Vec<HydrationHint>,
    ) {
        let Ok(mut documents) = self.documents.write() else {
            return;
        };
        documents
            .entry(document_id.to_string())
            .or_default()
            .pages
            .insert(
                page_id.to_string(),
                CachedPage {
                    revision: revision.to_string(),
                    html,
                    hydration_hints,
                    rendered_at: Utc::now(),
                },
            );
    }

    pub fn get_router_bundle(&self, document_id: &str, revision: &str) -> Option<CachedRouterBundle> {
        let documents = self.documents.read().ok()?;
        let bundle = documents.get(document_id)?.router.as_ref()?;
        if bundle.revision == revision {
            Some(bundle.clone())
        } else {
            None
        }
    }

    pub fn put_router_bundle(&self, document_id: &str, revision: &str, bundle: String) {
        let Ok(mut documents) = self.documents.write() else {
            return;
        };
        documents.entry(document_id.to_string()).or_default().router = Some(CachedRouterBundle {
            revision: revision.to_string(),
            bundle,
            generated_at: Utc::now(),
        });
    }

    /// Drop every artifact of one document.
    pub fn invalidate_document(&self, document_id: &str) {
        if let Ok(mut documents) = self.documents.write() {
            documents.remove(document_id);
        }
    }

    /// Drop one page's artifact, leaving the rest of the document intact.
    pub fn invalidate_page(&self, document_id: &str, page_id: &str) {
        if let Ok(mut documents) = self.documents.write() {
            if let Some(entry) = documents.get_mut(document_id) {
                entry.pages.remove(page_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_mismatch_misses() {
        let cache = ArtifactCache::new();
        let rev1 = ArtifactCache::compute_revision("v1");
        let rev2 = ArtifactCache::compute_revision("v2");
        assert_ne!(rev1, rev2);

        cache.put_page("doc", "home", &rev1, "<div></div>".into(), vec![]);
        assert!(cache.get_page("doc", "home", &rev1).is_some());
        assert!(cache.get_page("doc", "home", &rev2).is_none());
    }

    #[test]
    fn documents_do_not_collide() {
        let cache = ArtifactCache::new();
        let rev = ArtifactCache::compute_revision("src");
        cache.put_page("a", "home", &rev, "<p>a</p>".into(), vec![]);
        cache.put_page("b", "home", &rev, "<p>b</p>".into(), vec![]);

        assert_eq!(cache.get_page("a", "home", &rev).unwrap().html, "<p>a</p>");
        assert_eq!(cache.get_page("b", "home", &rev).unwrap().html, "<p>b</p>");
    }

    #[test]
    fn last_writer_wins() {
        let cache = ArtifactCache::new();
        let rev = ArtifactCache::compute_revision("src");
        cache.put_page("doc", "home", &rev, "first".into(), vec![]);
        cache.put_page("doc", "home", &rev, "second".into(), vec![]);
        assert_eq!(cache.get_page("doc", "home", &rev).unwrap().html, "second");
    }

    #[test]
    fn invalidation_scopes() {
        let cache = ArtifactCache::new();
        let rev = ArtifactCache::compute_revision("src");
        cache.put_page("doc", "home", &rev, "h".into(), vec![]);
        cache.put_page("doc", "about", &rev, "a".into(), vec![]);
        cache.put_router_bundle("doc", &rev, "bundle".into());

        cache.invalidate_page("doc", "home");
        assert!(cache.get_page("doc", "home", &rev).is_none());
        assert!(cache.get_page("doc", "about", &rev).is_some());
        assert!(cache.get_router_bundle("doc", &rev).is_some());

        cache.invalidate_document("doc");
        assert!(cache.get_page("doc", "about", &rev).is_none());
        assert!(cache.get_router_bundle("doc", &rev).is_none());
    }
}
