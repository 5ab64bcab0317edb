use std::{sync::Arc, time::Duration};

use scc::hash_map::Entry;
use tokio::time::Instant;

use crate::{
    models::site::Site,
    store::{SiteStore, StoreResult},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedSite {
    site: Arc<Site>,
    expires_at: Instant,
}

/// API key to site lookups, shared by every request. Misses are never
/// remembered, so unknown or inactive keys always reach storage.
pub struct TenantCache {
    entries: scc::HashMap<String, CachedSite>,
    ttl: Duration,
}

impl TenantCache {
    pub fn new(ttl: Duration) -> Self {
        TenantCache {
            entries: scc::HashMap::new(),
            ttl,
        }
    }

    pub async fn resolve<S>(&self, store: &S, api_key: &str) -> StoreResult<Option<Arc<Site>>>
    where
        S: SiteStore + ?Sized,
    {
        let now = Instant::now();

        if let Some(cached) = self.entries.read_async(api_key, |_, v| v.clone()).await {
            if cached.expires_at > now {
                return Ok(Some(cached.site));
            }

            // a concurrent request may have refreshed it already
            self.entries
                .remove_if_async(api_key, |v| v.expires_at <= now)
                .await;
        }

        let Some(site) = store.find_active_site_by_api_key(api_key).await? else {
            return Ok(None);
        };

        let site = Arc::new(site);
        let fresh = CachedSite {
            site: site.clone(),
            expires_at: Instant::now() + self.ttl,
        };

        match self.entries.entry_async(api_key.to_owned()).await {
            Entry::Occupied(mut entry) => *entry.get_mut() = fresh,
            Entry::Vacant(entry) => {
                entry.insert_entry(fresh);
            }
        }

        Ok(Some(site))
    }

    /// Drops the cached copy so the next request reads the site from storage.
    pub async fn forget(&self, api_key: &str) {
        self.entries.remove_async(api_key).await;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for TenantCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
