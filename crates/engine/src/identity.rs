//! The identity record built at the end of onboarding.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Reputation every new account starts with.
pub const INITIAL_REPUTATION: f32 = 4.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Owner,
    Worker,
    Group,
    Buyer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Worker => "WORKER",
            Self::Group => "GROUP",
            Self::Buyer => "BUYER",
        }
    }
}

impl TryFrom<&str> for UserRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "WORKER" => Ok(Self::Worker),
            "GROUP" => Ok(Self::Group),
            "BUYER" => Ok(Self::Buyer),
            other => Err(EngineError::validation(
                "role",
                format!("unknown role: {other}"),
            )),
        }
    }
}

/// The persisted user profile.
///
/// `id` is fixed at creation; the other profile fields may be edited while
/// the session is authenticated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub location: String,
    pub role: UserRole,
    pub reputation_score: f32,
}

impl Identity {
    pub fn new(name: String, phone: String, location: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            phone,
            location,
            role,
            reputation_score: INITIAL_REPUTATION,
        }
    }

    pub fn to_json(&self) -> ResultEngine<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> ResultEngine<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
