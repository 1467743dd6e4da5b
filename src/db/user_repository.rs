use crate::db::{Database, StoreError};
use crate::models::user::{Role, User};
use bincode::{Decode, Encode};
use std::str;
use tracing::info;

const USERS_TREE: &str = "users";
const EMAIL_INDEX_TREE: &str = "email_index";
const USERNAME_INDEX_TREE: &str = "username_index";

#[derive(Debug, Encode, Decode)]
struct StoredUser {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    created_at: i64, // Store as timestamp
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        StoredUser {
            id: user.id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: user.created_at.timestamp(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: stored.id,
            username: stored.username,
            email: stored.email,
            password_hash: stored.password_hash,
            role: stored.role,
            created_at: chrono::DateTime::from_timestamp(stored.created_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

/// User records keyed by id, with secondary index trees enforcing the
/// email and username uniqueness invariants.
#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    pub async fn create(&self, user: User) -> Result<User, StoreError> {
        let users_tree = self.db.db.open_tree(USERS_TREE)?;
        let email_index = self.db.db.open_tree(EMAIL_INDEX_TREE)?;
        let username_index = self.db.db.open_tree(USERNAME_INDEX_TREE)?;

        let stored_user = StoredUser::from(user.clone());
        let encoded = bincode::encode_to_vec(&stored_user, bincode::config::standard())?;

        // Claim both index slots atomically so concurrent signups cannot
        // repoint an existing identity; losing the race is a conflict.
        if email_index
            .compare_and_swap(
                user.email.as_bytes(),
                None::<&[u8]>,
                Some(user.id.as_bytes()),
            )?
            .is_err()
        {
            return Err(StoreError::Duplicate("Email"));
        }
        if username_index
            .compare_and_swap(
                user.username.as_bytes(),
                None::<&[u8]>,
                Some(user.id.as_bytes()),
            )?
            .is_err()
        {
            // Release the email slot claimed above.
            email_index.remove(user.email.as_bytes())?;
            return Err(StoreError::Duplicate("Username"));
        }

        users_tree.insert(user.id.as_bytes(), encoded.as_slice())?;

        info!(user_id = %user.id, email = %user.email, "User created in database");

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users_tree = self.db.db.open_tree(USERS_TREE)?;

        match users_tree.get(id.as_bytes())? {
            Some(data) => {
                let (stored_user, _): (StoredUser, usize) =
                    bincode::decode_from_slice(&data, bincode::config::standard())?;
                Ok(Some(User::from(stored_user)))
            }
            None => Ok(None),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email_index = self.db.db.open_tree(EMAIL_INDEX_TREE)?;

        match email_index.get(email.as_bytes())? {
            Some(user_id) => {
                let id = str::from_utf8(&user_id)
                    .map_err(|e| StoreError::Corrupt(format!("invalid user id: {}", e)))?;
                self.get_by_id(id).await
            }
            None => Ok(None),
        }
    }

    /// Single existence query logically OR-ing both identity fields, used
    /// by signup to detect duplicates before creating a user.
    pub async fn exists_with_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, StoreError> {
        let email_index = self.db.db.open_tree(EMAIL_INDEX_TREE)?;
        let username_index = self.db.db.open_tree(USERNAME_INDEX_TREE)?;

        Ok(email_index.contains_key(email.as_bytes())?
            || username_index.contains_key(username.as_bytes())?)
    }
}
