use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::labelstring::LabelString;
use crate::root;

struct AuthorityCacheEntry {
    nameservers: Vec<LabelString>,
    ttl: u32,
    inserted_at: Instant,
}

impl AuthorityCacheEntry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at).as_secs() >= u64::from(self.ttl)
    }
}

enum Lookup {
    Hit(Vec<LabelString>),
    Expired,
    Miss,
}

/// Zone name to nameserver-name set, TTL bounded. The non-synchronized
/// layer; entry methods take an explicit `now` so expiry is testable.
#[derive(Default)]
pub struct ExclusiveAuthorityCache {
    entries: HashMap<LabelString, AuthorityCacheEntry>,
}

impl ExclusiveAuthorityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, zone: &LabelString, now: Instant) -> Lookup {
        match self.entries.get(zone) {
            None => Lookup::Miss,
            Some(entry) if entry.expired(now) => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.nameservers.clone()),
        }
    }

    pub fn get_at(&mut self, zone: &LabelString, now: Instant) -> Option<Vec<LabelString>> {
        match self.lookup(zone, now) {
            Lookup::Hit(nameservers) => Some(nameservers),
            Lookup::Expired => {
                self.entries.remove(zone);
                None
            }
            Lookup::Miss => None,
        }
    }

    pub fn put_at(
        &mut self,
        zone: LabelString,
        nameservers: Vec<LabelString>,
        ttl: u32,
        now: Instant,
    ) {
        // a delegation without nameservers is useless, never store one
        if nameservers.is_empty() {
            return;
        }
        self.entries.insert(
            zone,
            AuthorityCacheEntry {
                nameservers,
                ttl,
                inserted_at: now,
            },
        );
    }
}

/// Shared layer: reads take the shared lock, the exclusive lock is only
/// taken to insert or to evict an expired entry.
#[derive(Default)]
pub struct SharedAuthorityCache {
    inner: RwLock<ExclusiveAuthorityCache>,
}

impl SharedAuthorityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, zone: &LabelString) -> Option<Vec<LabelString>> {
        let now = Instant::now();
        match self.inner.read().await.lookup(zone, now) {
            Lookup::Hit(nameservers) => Some(nameservers),
            Lookup::Miss => None,
            Lookup::Expired => self.inner.write().await.get_at(zone, now),
        }
    }

    pub async fn put(&self, zone: LabelString, nameservers: Vec<LabelString>, ttl: u32) {
        self.inner
            .write()
            .await
            .put_at(zone, nameservers, ttl, Instant::now());
    }

    /// Search path for `name`: the root nameservers first, then the cached
    /// delegations for each suffix from least to most specific. Used as a
    /// stack, so popping yields the most specific zone first.
    pub async fn find_best(&self, name: &LabelString) -> Vec<LabelString> {
        let mut nameservers = root::root_nameserver_names();

        let labels = name.as_slice();
        for i in (0..labels.len()).rev() {
            let zone: LabelString = labels[i..].into();
            if let Some(mut zone_nameservers) = self.get(&zone).await {
                nameservers.append(&mut zone_nameservers);
            }
        }

        nameservers
    }
}

#[cfg(test)]
mod tests {

    use std::time::Duration;

    use super::*;

    #[test]
    fn test_get_put() {
        let mut cache = ExclusiveAuthorityCache::new();
        let now = Instant::now();

        let zone = LabelString::from("example.com");
        let nameservers = vec![
            LabelString::from("ns1.example.com"),
            LabelString::from("ns2.example.com"),
        ];
        cache.put_at(zone.clone(), nameservers.clone(), 60, now);

        assert_eq!(cache.get_at(&zone, now), Some(nameservers));
        assert_eq!(cache.get_at(&LabelString::from("other.com"), now), None);
    }

    #[test]
    fn test_expiry() {
        let mut cache = ExclusiveAuthorityCache::new();
        let now = Instant::now();

        let zone = LabelString::from("example.com");
        cache.put_at(zone.clone(), vec![LabelString::from("ns1.example.com")], 60, now);

        assert!(cache
            .get_at(&zone, now + Duration::from_secs(59))
            .is_some());
        assert!(cache.get_at(&zone, now + Duration::from_secs(60)).is_none());
        // the expired entry is gone, not just hidden
        assert!(cache.get_at(&zone, now).is_none());
    }

    #[test]
    fn test_zero_ttl_is_a_miss() {
        let mut cache = ExclusiveAuthorityCache::new();
        let now = Instant::now();

        let zone = LabelString::from("example.com");
        cache.put_at(zone.clone(), vec![LabelString::from("ns1.example.com")], 0, now);
        assert!(cache.get_at(&zone, now).is_none());
    }

    #[test]
    fn test_empty_nameservers_not_stored() {
        let mut cache = ExclusiveAuthorityCache::new();
        let now = Instant::now();

        let zone = LabelString::from("example.com");
        cache.put_at(zone.clone(), vec![], 60, now);
        assert!(cache.get_at(&zone, now).is_none());
    }

    #[tokio::test]
    async fn test_find_best_without_entries() {
        let cache = SharedAuthorityCache::new();
        let path = cache.find_best(&LabelString::from("x.y.z")).await;
        assert_eq!(path, root::root_nameserver_names());
    }

    #[tokio::test]
    async fn test_find_best_orders_specific_last() {
        let cache = SharedAuthorityCache::new();
        cache
            .put(
                LabelString::from("com"),
                vec![LabelString::from("tld.nameserver.net")],
                3600,
            )
            .await;
        cache
            .put(
                LabelString::from("example.com"),
                vec![LabelString::from("ns1.example.com")],
                3600,
            )
            .await;
        // an unrelated zone must not show up in the path
        cache
            .put(
                LabelString::from("example.org"),
                vec![LabelString::from("ns1.example.org")],
                3600,
            )
            .await;

        let path = cache.find_best(&LabelString::from("www.example.com")).await;

        let roots = root::root_nameserver_names();
        assert_eq!(&path[..roots.len()], roots.as_slice());
        assert_eq!(
            &path[roots.len()..],
            &[
                LabelString::from("tld.nameserver.net"),
                LabelString::from("ns1.example.com"),
            ]
        );
    }
}
