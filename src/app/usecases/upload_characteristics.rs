use crate::domain::model::{Characteristic, UserSummary};
use crate::domain::ports::CharacteristicsRepository;
use crate::utils::error::{KrabotError, Result};
use std::sync::Arc;

/// Stores and lists the characteristics players share through the userscript.
pub struct UploadCharacteristics {
    repository: Arc<dyn CharacteristicsRepository>,
}

impl UploadCharacteristics {
    pub fn new(repository: Arc<dyn CharacteristicsRepository>) -> Self {
        Self { repository }
    }

    pub fn upload(&self, namespace: &str, player_id: &str, name: &str, pp: i64) -> Result<()> {
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(validation("playerId is required"));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(validation("name is required"));
        }
        if pp < 0 {
            return Err(validation("pp must be >= 0"));
        }
        let pp = u32::try_from(pp).map_err(|_| validation("pp is too large"))?;

        self.repository
            .save(namespace, Characteristic::new(player_id, name, pp));
        tracing::debug!("📥 Characteristics stored for player {} ({} PP)", player_id, pp);
        Ok(())
    }

    pub fn users(&self, namespace: &str) -> Vec<UserSummary> {
        self.repository.find_all_users(namespace)
    }

    pub fn user_pp(&self, namespace: &str, player_id: &str) -> Option<u32> {
        self.repository
            .find_by_player_id(namespace, player_id)
            .map(|characteristic| characteristic.pp)
    }
}

fn validation(message: &str) -> KrabotError {
    KrabotError::ValidationError {
        message: message.to_string(),
    }
}
