//! Record value objects for users, topics, subscriptions and notifications.
//!
//! Every record is a flat set of named fields that maps one-to-one onto a
//! table row. Fields the database has not filled yet (a generated id, a
//! token that was never issued) hold their zero value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// A registered user.
///
/// `password` holds the bcrypt hash of the composed password material, never
/// the raw secret. `token` holds the revocable access token that signed
/// session tokens point at. Neither is ever serialized into a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UserProfile {
    /// Primary key, generated by the service as `user/<letters>`.
    #[serde(default)]
    pub id: String,
    /// Login identity; unique across users.
    #[serde(default)]
    pub email: String,
    /// Stored credential hash.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub password: String,
    /// Current access token, empty when none has been issued.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    pub token: String,
    /// Display handle.
    #[serde(default)]
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Contact phone number.
    #[serde(default)]
    pub phone_number: String,
}

impl UserProfile {
    /// Names of the profile columns a client may change that are non-empty
    /// on this record.
    ///
    /// Used as the update allow-list so that fields absent from a request
    /// body never overwrite stored values with empty strings. Credentials,
    /// the email (part of the password material) and the primary key are
    /// never included.
    pub fn filled_columns(&self) -> Vec<&'static str> {
        [
            ("username", &self.username),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone_number", &self.phone_number),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A topic owned by one user that others can subscribe to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Topic {
    /// Database-generated primary key.
    #[serde(default)]
    pub id: i64,
    /// Owner of the topic.
    #[serde(default)]
    pub user_id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Free-form description.
    #[serde(default, alias = "desc")]
    pub description: String,
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// A user's subscription to a topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Subscriber {
    /// Database-generated primary key.
    #[serde(default)]
    pub id: i64,
    /// Subscribed topic.
    #[serde(default)]
    pub topic_id: i64,
    /// Subscribing user.
    #[serde(default)]
    pub user_id: String,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A message delivered to one user through one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Database-generated primary key.
    #[serde(default)]
    pub id: i64,
    /// Recipient.
    #[serde(default)]
    pub user_id: String,
    /// Topic the message was published on.
    #[serde(default)]
    pub topic_id: i64,
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Whether the recipient has marked it read.
    #[serde(default)]
    pub is_read: bool,
}

impl Notification {
    /// Build an unread notification for `user_id` on `topic_id`.
    pub fn unread(user_id: &str, topic_id: i64, message: &str) -> Self {
        Self {
            id: 0,
            user_id: user_id.to_owned(),
            topic_id,
            message: message.to_owned(),
            is_read: false,
        }
    }
}
