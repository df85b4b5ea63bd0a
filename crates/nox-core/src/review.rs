//! Review records handed from a finished application to the review surface.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::{Applicant, MemberId, ServerId};

/// Default prefix for review surface names.
pub const DEFAULT_SURFACE_PREFIX: &str = "application";

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub question: String,
    pub answer: String,
}

/// Immutable output of a completed application.
///
/// `applicant.id` is the durable identity reference used at decision time to
/// find the applicant again; it is carried as data rather than recovered from
/// the rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub applicant: Applicant,
    pub server_id: ServerId,
    pub entries: Vec<ReviewEntry>,
    pub submitted_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(
        applicant: Applicant,
        server_id: ServerId,
        questions: impl IntoIterator<Item = impl Into<String>>,
        answers: impl IntoIterator<Item = String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let entries = questions
            .into_iter()
            .zip(answers)
            .map(|(question, answer)| ReviewEntry {
                question: question.into(),
                answer,
            })
            .collect();

        Self {
            applicant,
            server_id,
            entries,
            submitted_at,
        }
    }

    pub fn applicant_ref(&self) -> &MemberId {
        &self.applicant.id
    }

    pub fn surface_name(&self, prefix: &str) -> String {
        surface_name(prefix, &self.applicant)
    }

    /// Text posted into the review surface for staff.
    pub fn render(&self) -> String {
        let mut out = format!(
            "📋 **New application from {}**\nApplicant ID: {}\nSubmitted: {}\n",
            self.applicant.handle,
            self.applicant.id,
            self.submitted_at.format("%Y-%m-%d %H:%M UTC"),
        );
        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!(
                "\n**{}. {}**\n{}\n",
                i + 1,
                entry.question,
                entry.answer
            ));
        }
        out.push_str("\nUse `/approve` or `/reject` in this channel to decide.");
        out
    }
}

/// Deterministic review surface name for an applicant.
pub fn surface_name(prefix: &str, applicant: &Applicant) -> String {
    format!("{}-{}", prefix, applicant_slug(&applicant.id, &applicant.handle))
}

/// Slug identifying a member in a surface name.
///
/// Handles with nothing channel-safe in them (emoji or symbols only) fall
/// back to the member id, so the slug is never empty and two such members
/// never share a surface.
pub fn applicant_slug(id: &MemberId, handle: &str) -> String {
    let slug = slugify(handle);
    if slug.is_empty() {
        slugify(id.as_str())
    } else {
        slug
    }
}

/// Lowercases, turns whitespace into `-` and drops anything that is not
/// alphanumeric, `-` or `_`, mirroring what chat platforms accept in a
/// channel name.
pub fn slugify(handle: &str) -> String {
    handle
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Returns the handle slug if `name` is a review surface for `prefix`.
pub fn handle_slug<'a>(prefix: &str, name: &'a str) -> Option<&'a str> {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|slug| !slug.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ReviewRecord {
        ReviewRecord::new(
            Applicant::new("1001", "Night Owl"),
            ServerId::new("guild-1"),
            ["Q1?", "Q2?"],
            vec!["A1".to_string(), "A2".to_string()],
            Utc::now(),
        )
    }

    #[test]
    fn test_surface_name_is_deterministic() {
        let owl = Applicant::new("1001", "Night Owl");
        assert_eq!(surface_name("application", &owl), "application-night-owl");
        assert_eq!(surface_name("app", &Applicant::new("5", "Zed!#")), "app-zed");
        assert_eq!(record().surface_name("application"), "application-night-owl");
    }

    #[test]
    fn test_symbol_only_handle_uses_member_id() {
        let moon = Applicant::new("2002", "🌙🌙");
        let star = Applicant::new("3003", "★★");
        assert_eq!(surface_name("application", &moon), "application-2002");
        assert_eq!(surface_name("application", &star), "application-3003");
        assert_eq!(
            handle_slug("application", &surface_name("application", &moon)),
            Some("2002")
        );
        assert_eq!(applicant_slug(&MemberId::new("7"), "Night Owl"), "night-owl");
    }

    #[test]
    fn test_handle_slug() {
        assert_eq!(handle_slug("application", "application-night-owl"), Some("night-owl"));
        assert_eq!(handle_slug("application", "general"), None);
        assert_eq!(handle_slug("application", "application-"), None);
        assert_eq!(handle_slug("application", "applicationx-bob"), None);
    }

    #[test]
    fn test_render_keeps_question_order() {
        let rendered = record().render();
        let q1 = rendered.find("**1. Q1?**").unwrap();
        let q2 = rendered.find("**2. Q2?**").unwrap();
        assert!(q1 < q2);
        assert!(rendered.contains("Applicant ID: 1001"));
    }
}
