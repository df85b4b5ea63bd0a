//! Session state and transition outcomes.

use crate::review::ReviewRecord;
use crate::sanitizer::MAX_ANSWER_LENGTH;

/// Reply that aborts the application at any point.
pub const CANCEL_KEYWORD: &str = "cancel";
/// Reply that accepts truncation of a buffered long answer.
pub const PROCEED_KEYWORD: &str = "proceed";

/// Where an application currently stands.
///
/// `Completed` and `Cancelled` are terminal; the registry evicts a session as
/// soon as it enters either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the answer to question `index`.
    AwaitingAnswer { index: usize },
    /// Question `index` got an over-long answer; waiting for `proceed`,
    /// `cancel`, or a shorter retry.
    AwaitingTruncateConfirm { index: usize, buffered: String },
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Index of the question being answered, if any.
    pub fn question_index(&self) -> Option<usize> {
        match self {
            Self::AwaitingAnswer { index } | Self::AwaitingTruncateConfirm { index, .. } => {
                Some(*index)
            }
            Self::Completed | Self::Cancelled => None,
        }
    }
}

/// Why an answer was refused without advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Spam,
    Empty,
}

/// Result of feeding one applicant message into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The answer was stored; `prompt` is the next question to send.
    NextQuestion { index: usize, prompt: String },
    /// The answer was buffered pending a truncate decision.
    TooLong { length: usize },
    /// The answer was refused; the same question stays open.
    Rejected(RejectReason),
    /// The last answer was stored.
    Completed(ReviewRecord),
    Cancelled,
    /// The session had already finished.
    Ignored,
}

impl SessionOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Cancelled)
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NextQuestion { .. } => "next_question",
            Self::TooLong { .. } => "too_long",
            Self::Rejected(RejectReason::Spam) => "rejected_spam",
            Self::Rejected(RejectReason::Empty) => "rejected_empty",
            Self::Completed(_) => "completed",
            Self::Cancelled => "cancelled",
            Self::Ignored => "ignored",
        }
    }

    /// Direct message for the applicant, when the outcome calls for one.
    ///
    /// Completion has no fixed text: it depends on whether provisioning the
    /// review surface succeeds.
    pub fn applicant_notice(&self) -> Option<String> {
        match self {
            Self::NextQuestion { prompt, .. } => Some(prompt.clone()),
            Self::TooLong { length } => Some(format!(
                "⚠️ Your answer is {} characters long, which is over the {} character limit.\n\
                 Reply `{}` to submit a truncated version, `{}` to stop your application, \
                 or send a shorter answer.",
                length, MAX_ANSWER_LENGTH, PROCEED_KEYWORD, CANCEL_KEYWORD
            )),
            Self::Rejected(RejectReason::Spam) => Some(
                "❌ That answer looks like spam (repeated characters or stickers). \
                 Please answer the question with text."
                    .to_string(),
            ),
            Self::Rejected(RejectReason::Empty) => {
                Some("❌ Your answer was empty. Please answer the question.".to_string())
            }
            Self::Cancelled => Some(
                "Your application has been cancelled. You can start again at any time.".to_string(),
            ),
            Self::Completed(_) | Self::Ignored => None,
        }
    }
}
