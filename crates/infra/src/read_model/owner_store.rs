use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use std::sync::Arc;
use stockledger_core::OwnerId;

/// Owner-isolated key/value store abstraction for disposable read models.
pub trait OwnerStore<K, V>: Send + Sync {
    fn get(&self, owner_id: OwnerId, key: &K) -> Option<V>;
    fn upsert(&self, owner_id: OwnerId, key: K, value: V);
    fn list(&self, owner_id: OwnerId) -> Vec<V>;
    /// Clear all read-model records for an owner (rebuild support).
    fn clear_owner(&self, owner_id: OwnerId);
}

impl<K, V, S> OwnerStore<K, V> for Arc<S>
where
    S: OwnerStore<K, V> + ?Sized,
{
    fn get(&self, owner_id: OwnerId, key: &K) -> Option<V> {
        (**self).get(owner_id, key)
    }

    fn upsert(&self, owner_id: OwnerId, key: K, value: V) {
        (**self).upsert(owner_id, key, value)
    }

    fn list(&self, owner_id: OwnerId) -> Vec<V> {
        (**self).list(owner_id)
    }

    fn clear_owner(&self, owner_id: OwnerId) {
        (**self).clear_owner(owner_id)
    }
}

/// In-memory owner-isolated store for tests/dev.
#[derive(Debug)]
pub struct InMemoryOwnerStore<K, V> {
    inner: RwLock<HashMap<(OwnerId, K), V>>,
}

impl<K, V> InMemoryOwnerStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryOwnerStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OwnerStore<K, V> for InMemoryOwnerStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, owner_id: OwnerId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(owner_id, key.clone())).cloned()
    }

    fn upsert(&self, owner_id: OwnerId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((owner_id, key), value);
        }
    }

    fn list(&self, owner_id: OwnerId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((o, _k), v)| if *o == owner_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_owner(&self, owner_id: OwnerId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(o, _k), _v| *o != owner_id);
        }
    }
}
