use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role assigned to a user account; EMPLOYEE is the signup default.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Encode, Decode, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// JWT payload shared by access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub role: Role,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued at
}

/// Safe projection of a user, attached to requests by the auth gate and
/// embedded in lead responses. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Principal {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}
