use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side record of an issued refresh token.
///
/// The token string itself is the lookup key. Records are written once at
/// login and read back on refresh; they are never updated in place.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
