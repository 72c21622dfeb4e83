use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::debug;

use stormcache_common::{Clock, Expiry, SystemClock};

use crate::entry::Entry;

/// Estado compartilhado entre todas as conexões.
///
/// Todo acesso ao mapa passa por um único `RwLock`: leituras compartilham o
/// lock, escritas são exclusivas. Cada operação pública é uma única seção
/// crítica.
struct SharedState {
    items: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

/// Handle para o store in-memory com expiração preguiçosa.
///
/// Itens expirados não são removidos em background: leituras os tratam como
/// ausentes, e eles só saem do mapa quando sobrescritos ou deletados.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Db {
            shared: Arc::new(SharedState {
                items: RwLock::new(HashMap::new()),
                clock,
            }),
        }
    }

    /// Relógio usado para validar expirações.
    pub fn clock(&self) -> &dyn Clock {
        self.shared.clock.as_ref()
    }

    /// Insere só se não houver entrada para a chave.
    ///
    /// Uma entrada expirada que ainda não foi sobrescrita conta como presente
    /// e bloqueia o add.
    pub fn add(&self, key: String, value: Bytes, expires_at: Expiry) -> bool {
        let mut items = self.write();
        match items.entry(key) {
            MapEntry::Occupied(e) => {
                debug!("add ignorado, chave existente: {}", e.key());
                false
            }
            MapEntry::Vacant(e) => {
                e.insert(Entry::new(value, expires_at));
                true
            }
        }
    }

    pub fn set(&self, key: String, value: Bytes, expires_at: Expiry) {
        let mut items = self.write();
        items.insert(key, Entry::new(value, expires_at));
    }

    /// Sobrescreve só se houver entrada para a chave, expirada ou não.
    pub fn replace(&self, key: String, value: Bytes, expires_at: Expiry) -> bool {
        let mut items = self.write();
        match items.get_mut(&key) {
            Some(entry) => {
                *entry = Entry::new(value, expires_at);
                true
            }
            None => {
                debug!("replace ignorado, chave ausente: {key}");
                false
            }
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Retorna o valor se a entrada existe e ainda é válida. Nunca remove.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = self.shared.clock.now();
        let items = self.read();
        let entry = items.get(key)?;
        if !entry.is_valid_at(now) {
            debug!("chave expirada: {key}");
            return None;
        }
        Some(entry.value.clone())
    }

    /// Número de entradas no mapa, incluindo as expiradas.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Nenhuma seção crítica deixa o mapa inconsistente, então um lock
    // envenenado pode ser reaproveitado.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.shared.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.shared.items.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use stormcache_common::ManualClock;

    fn manual_db() -> (Db, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(UNIX_EPOCH + Duration::from_secs(1_000)));
        (Db::with_clock(clock.clone()), clock)
    }

    fn in_secs(clock: &ManualClock, secs: u64) -> Expiry {
        Expiry::At(clock.now() + Duration::from_secs(secs))
    }

    #[test]
    fn get_nonexistent() {
        let db = Db::new();
        assert_eq!(db.get("missing"), None);
    }

    #[test]
    fn set_get_never_expires() {
        let (db, clock) = manual_db();
        db.set("greeting".into(), Bytes::from("hey leslie"), Expiry::Never);
        assert_eq!(db.get("greeting"), Some(Bytes::from("hey leslie")));

        clock.advance(Duration::from_secs(10 * 365 * 24 * 60 * 60));
        assert_eq!(db.get("greeting"), Some(Bytes::from("hey leslie")));
    }

    #[test]
    fn set_with_expiry() {
        let (db, clock) = manual_db();
        db.set("greeting".into(), Bytes::from("hi rob"), in_secs(&clock, 10));

        clock.advance(Duration::from_secs(9));
        assert_eq!(db.get("greeting"), Some(Bytes::from("hi rob")));

        // Válido só estritamente antes do instante de expiração.
        clock.advance(Duration::from_secs(1));
        assert_eq!(db.get("greeting"), None);
    }

    #[test]
    fn set_with_expiry_system_clock() {
        let db = Db::new();
        let expires_at = Expiry::At(SystemTime::now() + Duration::from_millis(20));
        db.set("key".into(), Bytes::from("value"), expires_at);
        assert_eq!(db.get("key"), Some(Bytes::from("value")));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(db.get("key"), None);
    }

    #[test]
    fn set_overwrites() {
        let db = Db::new();
        db.set("greeting".into(), Bytes::from("hi clara"), Expiry::Never);
        db.set("greeting".into(), Bytes::from("hi bradley"), Expiry::Never);
        assert_eq!(db.get("greeting"), Some(Bytes::from("hi bradley")));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn get_does_not_purge_expired() {
        let (db, clock) = manual_db();
        db.set("k".into(), Bytes::from("v"), in_secs(&clock, 1));
        clock.advance(Duration::from_secs(5));

        assert_eq!(db.get("k"), None);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn add_key_not_exists() {
        let db = Db::new();
        assert!(db.add("key".into(), Bytes::from("v1"), Expiry::Never));
        assert_eq!(db.get("key"), Some(Bytes::from("v1")));
    }

    #[test]
    fn add_key_exists() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("v1"), Expiry::Never);
        assert!(!db.add("key".into(), Bytes::from("v2"), Expiry::Never));
        assert_eq!(db.get("key"), Some(Bytes::from("v1")));
    }

    #[test]
    fn add_blocked_by_expired_entry() {
        // Expiração preguiçosa: a entrada expirada ainda existe no mapa.
        let (db, clock) = manual_db();
        db.set("key".into(), Bytes::from("stale"), in_secs(&clock, 1));
        clock.advance(Duration::from_secs(2));
        assert_eq!(db.get("key"), None);

        assert!(!db.add("key".into(), Bytes::from("fresh"), Expiry::Never));
        assert_eq!(db.get("key"), None);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn replace_key_not_exists() {
        let db = Db::new();
        assert!(!db.replace("key".into(), Bytes::from("v1"), Expiry::Never));
        assert_eq!(db.get("key"), None);
        assert!(db.is_empty());
    }

    #[test]
    fn replace_key_exists() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("v1"), Expiry::Never);
        assert!(db.replace("key".into(), Bytes::from("v2"), Expiry::Never));
        assert_eq!(db.get("key"), Some(Bytes::from("v2")));
    }

    #[test]
    fn replace_revives_expired_entry() {
        let (db, clock) = manual_db();
        db.set("key".into(), Bytes::from("stale"), in_secs(&clock, 1));
        clock.advance(Duration::from_secs(2));

        assert!(db.replace("key".into(), Bytes::from("fresh"), Expiry::Never));
        assert_eq!(db.get("key"), Some(Bytes::from("fresh")));
    }

    #[test]
    fn delete_once_per_insert() {
        let db = Db::new();
        db.set("key".into(), Bytes::from("v"), Expiry::Never);
        assert!(db.delete("key"));
        assert!(!db.delete("key"));
        assert_eq!(db.get("key"), None);

        db.set("key".into(), Bytes::from("v"), Expiry::Never);
        assert!(db.delete("key"));
    }

    #[test]
    fn delete_removes_expired_entry() {
        let (db, clock) = manual_db();
        db.set("key".into(), Bytes::from("v"), in_secs(&clock, 1));
        clock.advance(Duration::from_secs(2));

        assert!(db.delete("key"));
        assert!(db.is_empty());
        assert!(db.add("key".into(), Bytes::from("again"), Expiry::Never));
    }

    #[test]
    fn concurrent_add_single_winner() {
        const THREADS: usize = 16;
        let db = Db::new();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let db = db.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let value = Bytes::from(format!("writer-{i}"));
                    barrier.wait();
                    db.add("race".into(), value.clone(), Expiry::Never)
                        .then_some(value)
                })
            })
            .collect();

        let winners: Vec<Bytes> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(winners.len(), 1);
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("race"), Some(winners[0].clone()));
    }

    #[test]
    fn concurrent_set_distinct_keys() {
        let db = Db::new();
        thread::scope(|s| {
            for t in 0..4 {
                let db = &db;
                s.spawn(move || {
                    for i in 0..250 {
                        db.set(format!("key:{t}:{i}"), Bytes::from("v"), Expiry::Never);
                    }
                });
            }
        });
        assert_eq!(db.len(), 1_000);
    }
}
