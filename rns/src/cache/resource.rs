use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::labelstring::LabelString;
use crate::structs::{Type, RR};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResourceCacheKey {
    name: LabelString,
    rtype: Type,
}

struct ResourceCacheEntry {
    records: Vec<RR>,
    ttl: u32,
    inserted_at: Instant,
}

/// Resource records keyed by (owner name, type). An entry lives for the
/// minimum TTL of its record set so no record is ever served beyond its
/// own TTL; reads hand back clones with the elapsed seconds subtracted.
#[derive(Default)]
pub struct ExclusiveResourceCache {
    entries: HashMap<ResourceCacheKey, ResourceCacheEntry>,
}

impl ExclusiveResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_at(&mut self, name: &LabelString, rtype: Type, now: Instant) -> Option<Vec<RR>> {
        let key = ResourceCacheKey {
            name: name.clone(),
            rtype,
        };

        let entry = self.entries.get(&key)?;
        let elapsed = now.duration_since(entry.inserted_at).as_secs();
        if elapsed >= u64::from(entry.ttl) {
            self.entries.remove(&key);
            return None;
        }

        let mut records = entry.records.clone();
        for record in &mut records {
            record.ttl -= elapsed as u32;
        }
        Some(records)
    }

    pub fn put_at(&mut self, name: LabelString, rtype: Type, records: Vec<RR>, now: Instant) {
        if records.is_empty() {
            return;
        }

        let ttl = records.iter().fold(u32::MAX, |ttl, record| ttl.min(record.ttl));
        self.entries.insert(
            ResourceCacheKey { name, rtype },
            ResourceCacheEntry {
                records,
                ttl,
                inserted_at: now,
            },
        );
    }
}

#[derive(Default)]
pub struct SharedResourceCache {
    inner: Mutex<ExclusiveResourceCache>,
}

impl SharedResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &LabelString, rtype: Type) -> Option<Vec<RR>> {
        self.inner.lock().await.get_at(name, rtype, Instant::now())
    }

    pub async fn put(&self, name: LabelString, rtype: Type, records: Vec<RR>) {
        self.inner
            .lock()
            .await
            .put_at(name, rtype, records, Instant::now());
    }
}

#[cfg(test)]
mod tests {

    use std::time::Duration;

    use super::*;
    use crate::structs::{Class, RData, RRClass, RRType};

    fn a_record(name: &str, ttl: u32) -> RR {
        RR {
            name: LabelString::from(name),
            rtype: Type::Type(RRType::A),
            class: Class::Class(RRClass::IN),
            ttl,
            rdata: RData::A(std::net::Ipv4Addr::new(192, 0, 2, 1)),
        }
    }

    #[test]
    fn test_ttl_decrements_on_read() {
        let mut cache = ExclusiveResourceCache::new();
        let now = Instant::now();
        let name = LabelString::from("example.com");
        let rtype = Type::Type(RRType::A);

        cache.put_at(
            name.clone(),
            rtype,
            vec![a_record("example.com", 60), a_record("example.com", 120)],
            now,
        );

        let records = cache.get_at(&name, rtype, now).unwrap();
        assert_eq!(records[0].ttl, 60);
        assert_eq!(records[1].ttl, 120);

        let records = cache
            .get_at(&name, rtype, now + Duration::from_secs(30))
            .unwrap();
        assert_eq!(records[0].ttl, 30);
        assert_eq!(records[1].ttl, 90);
    }

    #[test]
    fn test_expires_at_min_ttl() {
        let mut cache = ExclusiveResourceCache::new();
        let now = Instant::now();
        let name = LabelString::from("example.com");
        let rtype = Type::Type(RRType::A);

        cache.put_at(
            name.clone(),
            rtype,
            vec![a_record("example.com", 60), a_record("example.com", 120)],
            now,
        );

        // the 120 second record must not outlive the 60 second one
        assert!(cache
            .get_at(&name, rtype, now + Duration::from_secs(60))
            .is_none());
        assert!(cache.get_at(&name, rtype, now).is_none());
    }

    #[test]
    fn test_zero_ttl_is_a_miss() {
        let mut cache = ExclusiveResourceCache::new();
        let now = Instant::now();
        let name = LabelString::from("example.com");
        let rtype = Type::Type(RRType::A);

        cache.put_at(name.clone(), rtype, vec![a_record("example.com", 0)], now);
        assert!(cache.get_at(&name, rtype, now).is_none());
    }

    #[test]
    fn test_empty_records_not_stored() {
        let mut cache = ExclusiveResourceCache::new();
        let now = Instant::now();
        let name = LabelString::from("example.com");
        let rtype = Type::Type(RRType::A);

        cache.put_at(name.clone(), rtype, vec![], now);
        assert!(cache.get_at(&name, rtype, now).is_none());
    }

    #[test]
    fn test_keyed_by_name_and_type() {
        let mut cache = ExclusiveResourceCache::new();
        let now = Instant::now();
        let name = LabelString::from("example.com");

        cache.put_at(
            name.clone(),
            Type::Type(RRType::A),
            vec![a_record("example.com", 60)],
            now,
        );

        assert!(cache.get_at(&name, Type::Type(RRType::AAAA), now).is_none());
        assert!(cache
            .get_at(&LabelString::from("EXAMPLE.com"), Type::Type(RRType::A), now)
            .is_some());
    }
}
