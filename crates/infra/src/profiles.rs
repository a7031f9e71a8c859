//! Per-tenant extraction profiles.
//!
//! A profile names the extraction project and model profile a tenant's
//! documents of one type are submitted with.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docflow_core::{DocumentType, TenantId};

use crate::error::InfraError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionProfile {
    pub project_id: String,
    pub profile_id: String,
}

pub trait ProfileStore: Send + Sync {
    fn profile(
        &self,
        tenant_id: &TenantId,
        document_type: DocumentType,
    ) -> Result<Option<ExtractionProfile>, InfraError>;
}

impl<S> ProfileStore for Arc<S>
where
    S: ProfileStore + ?Sized,
{
    fn profile(
        &self,
        tenant_id: &TenantId,
        document_type: DocumentType,
    ) -> Result<Option<ExtractionProfile>, InfraError> {
        (**self).profile(tenant_id, document_type)
    }
}

/// In-memory profile table for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<(TenantId, DocumentType), ExtractionProfile>>,
    fallback: Option<ExtractionProfile>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: TenantId, document_type: DocumentType, profile: ExtractionProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert((tenant_id, document_type), profile);
        }
    }

    pub fn with(self, tenant_id: TenantId, document_type: DocumentType, profile: ExtractionProfile) -> Self {
        self.insert(tenant_id, document_type, profile);
        self
    }

    /// Profile used for any tenant and type without an explicit entry.
    pub fn with_fallback(mut self, profile: ExtractionProfile) -> Self {
        self.fallback = Some(profile);
        self
    }
}

impl ProfileStore for InMemoryProfiles {
    fn profile(
        &self,
        tenant_id: &TenantId,
        document_type: DocumentType,
    ) -> Result<Option<ExtractionProfile>, InfraError> {
        let profiles = self
            .profiles
            .read()
            .map_err(InfraError::poisoned("profiles"))?;
        Ok(profiles
            .get(&(tenant_id.clone(), document_type))
            .or(self.fallback.as_ref())
            .cloned())
    }
}

type ProfileKey = (TenantId, DocumentType);

/// Caches profile hits in a bounded LRU. Misses are not cached.
pub struct CachedProfiles<S> {
    inner: S,
    cache: Mutex<LruCache<ProfileKey, ExtractionProfile>>,
}

impl<S> CachedProfiles<S> {
    pub const DEFAULT_CAPACITY: usize = 100;

    /// A capacity of zero is treated as one.
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_default_capacity(inner: S) -> Self {
        Self::new(inner, Self::DEFAULT_CAPACITY)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl<S: ProfileStore> ProfileStore for CachedProfiles<S> {
    fn profile(
        &self,
        tenant_id: &TenantId,
        document_type: DocumentType,
    ) -> Result<Option<ExtractionProfile>, InfraError> {
        let key = (tenant_id.clone(), document_type);
        {
            let mut cache = self.cache.lock().map_err(InfraError::poisoned("profile cache"))?;
            if let Some(hit) = cache.get(&key) {
                return Ok(Some(hit.clone()));
            }
        }

        let found = self.inner.profile(tenant_id, document_type)?;
        if let Some(profile) = &found {
            debug!(tenant_id = %tenant_id, document_type = %document_type, "caching extraction profile");
            self.cache
                .lock()
                .map_err(InfraError::poisoned("profile cache"))?
                .put(key, profile.clone());
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProfiles {
        inner: InMemoryProfiles,
        lookups: AtomicUsize,
    }

    impl ProfileStore for CountingProfiles {
        fn profile(
            &self,
            tenant_id: &TenantId,
            document_type: DocumentType,
        ) -> Result<Option<ExtractionProfile>, InfraError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.profile(tenant_id, document_type)
        }
    }

    fn profile(id: &str) -> ExtractionProfile {
        ExtractionProfile {
            project_id: format!("project-{id}"),
            profile_id: format!("profile-{id}"),
        }
    }

    #[test]
    fn hits_are_served_from_cache() {
        let tenant = TenantId::parse("tenant-a").unwrap();
        let counting = Arc::new(CountingProfiles {
            inner: InMemoryProfiles::new().with(tenant.clone(), DocumentType::Invoice, profile("1")),
            lookups: AtomicUsize::new(0),
        });
        let cached = CachedProfiles::with_default_capacity(counting.clone());

        for _ in 0..3 {
            assert_eq!(
                cached.profile(&tenant, DocumentType::Invoice).unwrap(),
                Some(profile("1"))
            );
        }
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn misses_are_not_cached() {
        let tenant = TenantId::parse("tenant-a").unwrap();
        let counting = Arc::new(CountingProfiles {
            inner: InMemoryProfiles::new(),
            lookups: AtomicUsize::new(0),
        });
        let cached = CachedProfiles::with_default_capacity(counting.clone());

        assert_eq!(cached.profile(&tenant, DocumentType::GoodsReceivedNote).unwrap(), None);
        counting
            .inner
            .insert(tenant.clone(), DocumentType::GoodsReceivedNote, profile("2"));
        assert_eq!(
            cached.profile(&tenant, DocumentType::GoodsReceivedNote).unwrap(),
            Some(profile("2"))
        );
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let a = TenantId::parse("tenant-a").unwrap();
        let b = TenantId::parse("tenant-b").unwrap();
        let c = TenantId::parse("tenant-c").unwrap();
        let counting = Arc::new(CountingProfiles {
            inner: InMemoryProfiles::new().with_fallback(profile("default")),
            lookups: AtomicUsize::new(0),
        });
        let cached = CachedProfiles::new(counting.clone(), 2);

        cached.profile(&a, DocumentType::Invoice).unwrap();
        cached.profile(&b, DocumentType::Invoice).unwrap();
        cached.profile(&a, DocumentType::Invoice).unwrap();
        cached.profile(&c, DocumentType::Invoice).unwrap();
        assert_eq!(cached.cached_len(), 2);
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 3);

        // `a` was used more recently than `b`, so `b` was evicted.
        cached.profile(&a, DocumentType::Invoice).unwrap();
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 3);
        cached.profile(&b, DocumentType::Invoice).unwrap();
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        /// Property: the cache never holds more than its capacity.
        #[test]
        fn cache_is_bounded(
            capacity in 1usize..8,
            tenants in prop::collection::vec(0u8..32, 0..100),
        ) {
            let cached = CachedProfiles::new(
                InMemoryProfiles::new().with_fallback(profile("default")),
                capacity,
            );
            for t in tenants {
                let tenant = TenantId::parse(format!("tenant-{t}")).unwrap();
                cached.profile(&tenant, DocumentType::GoodsReceivedNote).unwrap();
                prop_assert!(cached.cached_len() <= capacity);
            }
        }
    }

    #[test]
    fn fallback_covers_unlisted_tenants() {
        let listed = TenantId::parse("tenant-a").unwrap();
        let other = TenantId::parse("tenant-b").unwrap();
        let profiles = InMemoryProfiles::new()
            .with(listed.clone(), DocumentType::Invoice, profile("own"))
            .with_fallback(profile("default"));

        assert_eq!(
            profiles.profile(&listed, DocumentType::Invoice).unwrap(),
            Some(profile("own"))
        );
        assert_eq!(
            profiles.profile(&other, DocumentType::PurchaseOrder).unwrap(),
            Some(profile("default"))
        );
    }
}
