//! In-app notifications delivered to users.

use serde::{Deserialize, Serialize};

use crate::{EssayId, SubdisceptoName};

/// Identifier of a stored notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(i32);

impl NotificationId {
    /// Wraps a persisted notification id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Kind of event that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone replied to the user's essay.
    Reply,
    /// Someone upvoted the user's essay.
    Upvote,
}

impl NotificationKind {
    /// Returns the value stored in `notifications.notif_type`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Upvote => "upvote",
        }
    }

    /// Parses a stored kind.
    #[must_use]
    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "reply" => Some(Self::Reply),
            "upvote" => Some(Self::Upvote),
            _ => None,
        }
    }
}

/// Notification payload before delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Event kind.
    pub kind: NotificationKind,
    /// Short headline, usually the acting user's name.
    pub title: String,
    /// Body text.
    pub text: String,
    /// Site-relative link to the subject.
    pub action_url: String,
}

impl Notification {
    /// Notification sent to an essay author when someone replies.
    #[must_use]
    pub fn essay_reply(replier_name: &str, subdiscepto: &SubdisceptoName, reply: EssayId) -> Self {
        Self {
            kind: NotificationKind::Reply,
            title: replier_name.to_owned(),
            text: "replied to your essay".to_owned(),
            action_url: essay_path(subdiscepto, reply),
        }
    }

    /// Notification sent to an essay author on an upvote.
    #[must_use]
    pub fn essay_upvote(voter_name: &str, subdiscepto: &SubdisceptoName, essay: EssayId) -> Self {
        Self {
            kind: NotificationKind::Upvote,
            title: voter_name.to_owned(),
            text: "upvoted your essay".to_owned(),
            action_url: essay_path(subdiscepto, essay),
        }
    }
}

fn essay_path(subdiscepto: &SubdisceptoName, essay: EssayId) -> String {
    format!("/s/{subdiscepto}/{essay}")
}

/// Stored notification as listed to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    /// Notification id.
    pub id: NotificationId,
    /// Payload.
    #[serde(flatten)]
    pub notification: Notification,
}
