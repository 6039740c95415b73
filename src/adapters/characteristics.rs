use crate::domain::model::{Characteristic, UserSummary};
use crate::domain::ports::CharacteristicsRepository;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEFAULT_NAMESPACE: &str = "default";

type Namespaces = HashMap<String, HashMap<String, Characteristic>>;

/// In-memory characteristics, one map of players per API key.
#[derive(Default)]
pub struct InMemoryCharacteristicsStore {
    namespaces: RwLock<Namespaces>,
}

impl InMemoryCharacteristicsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Namespaces> {
        self.namespaces.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Namespaces> {
        self.namespaces.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn namespace_key(namespace: &str) -> &str {
    let namespace = namespace.trim();
    if namespace.is_empty() {
        DEFAULT_NAMESPACE
    } else {
        namespace
    }
}

impl CharacteristicsRepository for InMemoryCharacteristicsStore {
    fn save(&self, namespace: &str, mut characteristic: Characteristic) {
        characteristic.updated_at = Utc::now();
        self.write()
            .entry(namespace_key(namespace).to_string())
            .or_default()
            .insert(characteristic.player_id.clone(), characteristic);
    }

    fn find_by_player_id(&self, namespace: &str, player_id: &str) -> Option<Characteristic> {
        self.read()
            .get(namespace_key(namespace))
            .and_then(|players| players.get(player_id))
            .cloned()
    }

    /// 依名稱排序，方便 userscript 直接顯示
    fn find_all_users(&self, namespace: &str) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = self
            .read()
            .get(namespace_key(namespace))
            .map(|players| players.values().map(UserSummary::from).collect())
            .unwrap_or_default();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.player_id.cmp(&b.player_id)));
        users
    }
}
