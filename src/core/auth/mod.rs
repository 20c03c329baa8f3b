// ─── Offline Account ───
// Player identity fed into the `auth_*` launch placeholders.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchAccountProfile {
    pub username: String,
    pub uuid: Uuid,
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

impl Default for LaunchAccountProfile {
    fn default() -> Self {
        Self::offline(DEFAULT_PLAYER_NAME)
    }
}

impl LaunchAccountProfile {
    /// Offline profile: nil UUID and dummy tokens. A blank name becomes
    /// `Player`.
    pub fn offline(username: &str) -> Self {
        let username = username.trim();
        Self {
            username: if username.is_empty() {
                DEFAULT_PLAYER_NAME.into()
            } else {
                username.to_string()
            },
            uuid: Uuid::nil(),
            access_token: "0".into(),
            xuid: "0".into(),
            user_type: "mojang".into(),
            client_id: "0".into(),
        }
    }

    /// Token/value pairs for the launch placeholder table.
    pub fn placeholders(&self) -> Vec<(&'static str, String)> {
        vec![
            ("auth_player_name", self.username.clone()),
            ("auth_uuid", self.uuid.hyphenated().to_string()),
            ("auth_access_token", self.access_token.clone()),
            ("auth_xuid", self.xuid.clone()),
            ("user_type", self.user_type.clone()),
            ("clientid", self.client_id.clone()),
        ]
    }
}
