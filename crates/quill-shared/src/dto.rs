//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Body of `POST /posts` and `PUT/PATCH /posts/{id}`.
///
/// Every field is optional at this layer so that missing fields surface as
/// validation messages rather than decoding failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "bool_like")]
    pub is_draft: Option<bool>,
    /// `None`: absent. `Some(None)`: explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<Option<String>>,
}

/// Accepts `true`/`false` as well as `0`/`1`, as form-encoded clients send them.
fn bool_like<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Int(u8),
    }

    match Option::<BoolLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolLike::Bool(b)) => Ok(Some(b)),
        Some(BoolLike::Int(0)) => Ok(Some(false)),
        Some(BoolLike::Int(1)) => Ok(Some(true)),
        Some(BoolLike::Int(other)) => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {other}"
        ))),
    }
}

/// Distinguishes a present-but-null field from an absent one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A post as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_draft: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// The author, present in listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

/// A post together with a confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    pub message: String,
    pub post: PostResponse,
}

/// A bare message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Length-aware paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub current_page: u64,
    pub data: Vec<T>,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    /// 1-based position of the first item on this page, if any.
    pub from: Option<u64>,
    /// 1-based position of the last item on this page, if any.
    pub to: Option<u64>,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, current_page: u64, per_page: u64, total: u64) -> Self {
        let last_page = total.div_ceil(per_page.max(1)).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = (current_page - 1).saturating_mul(per_page).saturating_add(1);
            (Some(from), Some(from.saturating_add(data.len() as u64 - 1)))
        };

        Self {
            current_page,
            data,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

/// Query string of paginated listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested page; anything missing or unparsable reads as the first page.
    pub fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}
