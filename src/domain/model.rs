use crate::utils::error::{KrabotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 遊戲帳號憑證，啟動時建立一次
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    username: String,
    password: String,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(KrabotError::ValidationError {
                message: "Username cannot be blank".to_string(),
            });
        }
        if password.trim().is_empty() {
            return Err(KrabotError::ValidationError {
                message: "Password cannot be blank".to_string(),
            });
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// 不輸出密碼
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(KrabotError::ValidationError {
                message: "Message id cannot be blank".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = KrabotError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一封未讀的站內信 (kramail)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub title: String,
    pub sender: String,
    pub recipient: String,
    pub section: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingResult {
    pub messages: Vec<Message>,
    pub has_notification: bool,
}

impl ScrapingResult {
    pub fn new(messages: Vec<Message>, has_notification: bool) -> Self {
        Self {
            messages,
            has_notification,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseVersion {
    tag: String,
}

impl ReleaseVersion {
    pub const UNKNOWN_TAG: &'static str = "Unknown";

    pub fn new(tag: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(KrabotError::ValidationError {
                message: "Release tag cannot be blank".to_string(),
            });
        }
        Ok(Self { tag })
    }

    pub fn unknown() -> Self {
        Self {
            tag: Self::UNKNOWN_TAG.to_string(),
        }
    }

    /// 建立執行中版本，例如 `0.1.0` -> `v0.1.0`
    pub fn from_build(version: &str) -> Self {
        if version.trim().is_empty() {
            return Self::unknown();
        }
        Self {
            tag: format!("v{}", version.trim()),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_unknown(&self) -> bool {
        self.tag == Self::UNKNOWN_TAG
    }

    /// String inequality, not a semantic version ordering: any different tag
    /// counts as newer, including a rollback.
    pub fn is_newer_than(&self, other: &ReleaseVersion) -> bool {
        self.tag != other.tag
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

/// 狀態快照，供 REST 與版本檢查讀取
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationState {
    pub message_count: usize,
    pub has_notification: bool,
    pub current_version: ReleaseVersion,
    pub latest_version: ReleaseVersion,
}

impl NotificationState {
    pub fn initial(current_version: ReleaseVersion) -> Self {
        Self {
            message_count: 0,
            has_notification: false,
            current_version,
            latest_version: ReleaseVersion::unknown(),
        }
    }

    pub fn has_new_release(&self) -> bool {
        !self.latest_version.is_unknown() && self.latest_version.is_newer_than(&self.current_version)
    }
}

/// 玩家透過 userscript 上傳的角色資料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    pub player_id: String,
    pub name: String,
    pub pp: u32,
    pub updated_at: DateTime<Utc>,
}

impl Characteristic {
    pub fn new(player_id: impl Into<String>, name: impl Into<String>, pp: u32) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
            pp,
            updated_at: Utc::now(),
        }
    }
}

/// One row of the shared characteristics listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub player_id: String,
    pub name: String,
    pub pp: u32,
}

impl From<&Characteristic> for UserSummary {
    fn from(characteristic: &Characteristic) -> Self {
        Self {
            player_id: characteristic.player_id.clone(),
            name: characteristic.name.clone(),
            pp: characteristic.pp,
        }
    }
}
