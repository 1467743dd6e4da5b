use crate::db::{Database, StoreError};
use crate::models::token::RefreshToken;
use bincode::{Decode, Encode};
use tracing::info;

const REFRESH_TOKENS_TREE: &str = "refresh_tokens";

#[derive(Debug, Encode, Decode)]
struct StoredRefreshToken {
    token: String,
    user_id: String,
    expires_at: i64,
}

impl From<RefreshToken> for StoredRefreshToken {
    fn from(record: RefreshToken) -> Self {
        StoredRefreshToken {
            token: record.token,
            user_id: record.user_id,
            expires_at: record.expires_at.timestamp(),
        }
    }
}

impl From<StoredRefreshToken> for RefreshToken {
    fn from(stored: StoredRefreshToken) -> Self {
        RefreshToken {
            token: stored.token,
            user_id: stored.user_id,
            expires_at: chrono::DateTime::from_timestamp(stored.expires_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// Refresh-token records keyed by the token string itself. Every successful
/// login inserts a fresh row; rows are never updated, so concurrent logins
/// for one user simply accumulate independent sessions.
#[derive(Clone)]
pub struct RefreshTokenRepository {
    db: Database,
}

impl RefreshTokenRepository {
    pub fn new(db: Database) -> Self {
        RefreshTokenRepository { db }
    }

    pub async fn create(&self, record: RefreshToken) -> Result<RefreshToken, StoreError> {
        let tree = self.db.db.open_tree(REFRESH_TOKENS_TREE)?;

        let stored = StoredRefreshToken::from(record.clone());
        let encoded = bincode::encode_to_vec(&stored, bincode::config::standard())?;

        tree.insert(record.token.as_bytes(), encoded.as_slice())?;

        info!(user_id = %record.user_id, "Refresh token persisted");

        Ok(record)
    }

    pub async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        let tree = self.db.db.open_tree(REFRESH_TOKENS_TREE)?;

        match tree.get(token.as_bytes())? {
            Some(data) => {
                let (stored, _): (StoredRefreshToken, usize) =
                    bincode::decode_from_slice(&data, bincode::config::standard())?;
                Ok(Some(RefreshToken::from(stored)))
            }
            None => Ok(None),
        }
    }

    /// Number of stored records owned by a user.
    pub async fn count_for_user(&self, user_id: &str) -> Result<usize, StoreError> {
        let tree = self.db.db.open_tree(REFRESH_TOKENS_TREE)?;

        let mut count = 0;
        for item in tree.iter() {
            let (_, data) = item?;
            let (stored, _): (StoredRefreshToken, usize) =
                bincode::decode_from_slice(&data, bincode::config::standard())?;
            if stored.user_id == user_id {
                count += 1;
            }
        }
        Ok(count)
    }
}
