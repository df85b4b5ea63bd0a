//! Staff decisions on submitted applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{MemberId, SurfaceId};
use crate::timespec::TimeSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Approve,
    Reject,
}

impl DecisionKind {
    /// Text used when staff give no message of their own.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Approve => "Welcome to the guild!",
            Self::Reject => "No reason provided.",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}

/// A staff command as received from the platform, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInvocation {
    pub actor: MemberId,
    pub surface: SurfaceId,
    pub kind: DecisionKind,
    pub message: Option<String>,
    /// Raw `delete_time` argument; parsed before anything is posted.
    pub delete_time: Option<String>,
}

/// The decision as posted into the review surface. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: DecisionKind,
    pub message: String,
    pub actor: MemberId,
    pub decided_at: DateTime<Utc>,
    pub delete_after: Option<TimeSpec>,
}

impl Decision {
    /// Message posted into the review surface.
    pub fn render(&self) -> String {
        let (icon, label) = match self.kind {
            DecisionKind::Approve => ("✅", "Welcome message"),
            DecisionKind::Reject => ("❌", "Reason"),
        };
        let mut out = format!(
            "{} **Application {}** by <@{}> at {}\n**{}:** {}",
            icon,
            self.kind.past_tense(),
            self.actor,
            self.decided_at.format("%Y-%m-%d %H:%M UTC"),
            label,
            self.message
        );
        if let Some(delay) = self.delete_after {
            out.push_str(&format!("\n🗑️ This channel will be deleted in {}.", delay));
        }
        out
    }

    /// Direct message sent to the applicant.
    pub fn applicant_notice(&self, server_name: &str) -> String {
        match self.kind {
            DecisionKind::Approve => format!(
                "🎉 Your application to **{}** has been approved!\n{}",
                server_name, self.message
            ),
            DecisionKind::Reject => format!(
                "Your application to **{}** has been rejected.\nReason: {}",
                server_name, self.message
            ),
        }
    }
}
