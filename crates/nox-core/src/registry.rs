//! Process-wide registry of active application sessions.
//!
//! The registry is constructed explicitly by the hosting process and shared
//! by `Arc`; there is no ambient global. Every read-modify-write sequence runs
//! under one mutex, which is what guarantees at most one session per
//! applicant.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::application::{ApplicationSession, SessionOutcome};
use crate::error::{NoxError, Result};
use crate::identity::{Applicant, MemberId, ServerId};
use crate::questionnaire::Questionnaire;
use crate::review::ReviewRecord;

/// Mapping from applicant to their in-progress session.
///
/// Sessions are keyed by applicant only, so an applicant active in two
/// servers running this workflow collides with themselves.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<MemberId, ApplicationSession>>,
    questionnaire: Questionnaire,
}

impl SessionRegistry {
    /// Creates an empty registry that runs `questionnaire` for every applicant.
    pub fn new(questionnaire: Questionnaire) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            questionnaire,
        }
    }

    pub fn questionnaire(&self) -> Questionnaire {
        self.questionnaire
    }

    /// Starts a session for `applicant` and returns the first prompt.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyActive` if the applicant already has a session.
    pub async fn begin(
        &self,
        applicant: Applicant,
        server_id: ServerId,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&applicant.id) {
            return Err(NoxError::already_active(applicant.id.as_str()));
        }

        let session = ApplicationSession::new(applicant, server_id, self.questionnaire, now);
        let prompt = session
            .current_prompt()
            .ok_or_else(|| NoxError::config("questionnaire has no questions"))?;

        tracing::info!(
            "[SessionRegistry] Session started for applicant {} ({} active)",
            session.applicant().id,
            sessions.len() + 1
        );
        sessions.insert(session.applicant().id.clone(), session);
        Ok(prompt)
    }

    /// Routes one message to the applicant's session.
    ///
    /// Returns `None` when the applicant has no session, so the caller can let
    /// the message fall through to ordinary processing. A terminal outcome
    /// evicts the session before the lock is released.
    pub async fn dispatch(
        &self,
        applicant_id: &MemberId,
        input: &str,
        now: DateTime<Utc>,
    ) -> Option<SessionOutcome> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(applicant_id)?;
        let outcome = session.handle_input(input, now);

        tracing::debug!(
            "[SessionRegistry] dispatch applicant={} question={} outcome={}",
            applicant_id,
            session.current_question(),
            outcome.label()
        );

        if session.is_terminal() {
            sessions.remove(applicant_id);
            tracing::info!(
                "[SessionRegistry] Session for {} ended ({})",
                applicant_id,
                outcome.label()
            );
        }
        Some(outcome)
    }

    /// Validates a complete form submission for an applicant with no session.
    ///
    /// The session never becomes visible in the registry: it is created,
    /// completed and dropped under the same lock.
    pub async fn submit_form(
        &self,
        applicant: Applicant,
        server_id: ServerId,
        answers: &[String],
        now: DateTime<Utc>,
    ) -> Result<ReviewRecord> {
        let sessions = self.sessions.lock().await;
        if sessions.contains_key(&applicant.id) {
            return Err(NoxError::already_active(applicant.id.as_str()));
        }
        let mut session = ApplicationSession::new(applicant, server_id, self.questionnaire, now);
        session.submit_all(answers, now)
    }

    /// Removes the applicant's session. Safe to call when none exists.
    pub async fn end(&self, applicant_id: &MemberId) -> bool {
        let removed = self.sessions.lock().await.remove(applicant_id).is_some();
        if removed {
            tracing::info!("[SessionRegistry] Session for {} removed", applicant_id);
        }
        removed
    }

    /// Evicts every session idle for at least `max_idle`, returning their applicants.
    pub async fn evict_idle(&self, now: DateTime<Utc>, max_idle: Duration) -> Vec<Applicant> {
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<MemberId> = sessions
            .iter()
            .filter(|(_, session)| session.idle_for(now) >= max_idle)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| sessions.remove(id))
            .map(|session| {
                tracing::info!(
                    "[SessionRegistry] Session for {} expired after {} idle minutes",
                    session.applicant().id,
                    session.idle_for(now).num_minutes()
                );
                session.applicant().clone()
            })
            .collect()
    }

    pub async fn contains(&self, applicant_id: &MemberId) -> bool {
        self.sessions.lock().await.contains_key(applicant_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Copy of the applicant's session, for observation only.
    pub async fn snapshot(&self, applicant_id: &MemberId) -> Option<ApplicationSession> {
        self.sessions.lock().await.get(applicant_id).cloned()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Questionnaire::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::SessionState;
    use std::sync::Arc;

    fn applicant() -> Applicant {
        Applicant::new("1001", "Night Owl")
    }

    fn server() -> ServerId {
        ServerId::new("guild-1")
    }

    #[tokio::test]
    async fn test_begin_twice_is_already_active() {
        let registry = SessionRegistry::default();
        let prompt = registry.begin(applicant(), server(), Utc::now()).await.unwrap();
        assert!(prompt.starts_with("**Question 1/7:**"));

        let err = registry.begin(applicant(), server(), Utc::now()).await.unwrap_err();
        assert_eq!(err, NoxError::already_active("1001"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_end_is_idempotent() {
        let registry = SessionRegistry::default();
        registry.begin(applicant(), server(), Utc::now()).await.unwrap();
        assert!(registry.end(&applicant().id).await);
        assert!(!registry.end(&applicant().id).await);
        assert!(registry.begin(applicant(), server(), Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_without_session_falls_through() {
        let registry = SessionRegistry::default();
        assert!(registry.dispatch(&MemberId::new("nobody"), "hi", Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_completion_evicts() {
        let registry = SessionRegistry::default();
        let id = applicant().id;
        registry.begin(applicant(), server(), Utc::now()).await.unwrap();

        let mut last = None;
        for i in 0..7 {
            last = registry
                .dispatch(&id, &format!("My answer for question {}", i), Utc::now())
                .await;
        }
        let Some(SessionOutcome::Completed(record)) = last else {
            panic!("expected completion");
        };
        assert_eq!(record.entries.len(), 7);
        assert!(!registry.contains(&id).await);
    }

    #[tokio::test]
    async fn test_cancel_evicts_and_keeps_answers_count() {
        let registry = SessionRegistry::default();
        let id = applicant().id;
        registry.begin(applicant(), server(), Utc::now()).await.unwrap();
        registry.dispatch(&id, "First real answer", Utc::now()).await;
        registry.dispatch(&id, "Second real answer", Utc::now()).await;

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert_eq!(snapshot.answers().len(), 2);

        let outcome = registry.dispatch(&id, "cancel", Utc::now()).await;
        assert_eq!(outcome, Some(SessionOutcome::Cancelled));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_truncate_confirm_keeps_session() {
        let registry = SessionRegistry::default();
        let id = applicant().id;
        registry.begin(applicant(), server(), Utc::now()).await.unwrap();
        registry.dispatch(&id, &"long ".repeat(170), Utc::now()).await;

        let snapshot = registry.snapshot(&id).await.unwrap();
        assert!(matches!(
            snapshot.state(),
            SessionState::AwaitingTruncateConfirm { index: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let registry = SessionRegistry::default();
        let start = Utc::now();
        registry.begin(applicant(), server(), start).await.unwrap();
        registry
            .begin(Applicant::new("2002", "Early Bird"), server(), start + Duration::minutes(50))
            .await
            .unwrap();

        let evicted = registry
            .evict_idle(start + Duration::minutes(60), Duration::minutes(30))
            .await;
        assert_eq!(evicted, vec![applicant()]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_submit_form_conflicts_with_active_session() {
        let registry = SessionRegistry::default();
        registry.begin(applicant(), server(), Utc::now()).await.unwrap();
        let answers: Vec<String> = (0..7).map(|i| format!("Form answer {}", i)).collect();
        let err = registry
            .submit_form(applicant(), server(), &answers, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_session_conflict());

        let other = Applicant::new("3003", "Form Filler");
        let record = registry
            .submit_form(other.clone(), server(), &answers, Utc::now())
            .await
            .unwrap();
        assert_eq!(record.applicant, other);
        assert!(!registry.contains(&other.id).await);
    }

    #[tokio::test]
    async fn test_concurrent_begin_admits_one() {
        let registry = Arc::new(SessionRegistry::default());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.begin(applicant(), server(), Utc::now()).await.is_ok()
            }));
        }
        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}
