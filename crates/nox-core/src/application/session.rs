use chrono::{DateTime, Duration, Utc};

use super::state::{CANCEL_KEYWORD, PROCEED_KEYWORD, RejectReason, SessionOutcome, SessionState};
use crate::error::{NoxError, Result};
use crate::identity::{Applicant, ServerId};
use crate::questionnaire::Questionnaire;
use crate::review::ReviewRecord;
use crate::sanitizer::{self, AnswerVerdict};

/// One applicant's in-progress questionnaire.
///
/// Answers are append-only and, outside of a pending truncate decision,
/// `answers().len() == current_question()` always holds.
#[derive(Debug, Clone)]
pub struct ApplicationSession {
    applicant: Applicant,
    server_id: ServerId,
    questionnaire: Questionnaire,
    answers: Vec<String>,
    state: SessionState,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ApplicationSession {
    pub fn new(
        applicant: Applicant,
        server_id: ServerId,
        questionnaire: Questionnaire,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            applicant,
            server_id,
            questionnaire,
            answers: Vec::with_capacity(questionnaire.len()),
            state: SessionState::AwaitingAnswer { index: 0 },
            started_at: now,
            last_activity: now,
        }
    }

    pub fn applicant(&self) -> &Applicant {
        &self.applicant
    }

    pub fn server_id(&self) -> &ServerId {
        &self.server_id
    }

    pub fn questionnaire(&self) -> Questionnaire {
        self.questionnaire
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Index of the question currently being answered; equals the number of
    /// questions once completed.
    pub fn current_question(&self) -> usize {
        self.state.question_index().unwrap_or(self.answers.len())
    }

    /// The buffered over-long answer awaiting `proceed`, if any.
    pub fn pending_long_answer(&self) -> Option<&str> {
        match &self.state {
            SessionState::AwaitingTruncateConfirm { buffered, .. } => Some(buffered),
            _ => None,
        }
    }

    /// Prompt for the open question.
    pub fn current_prompt(&self) -> Option<String> {
        self.state
            .question_index()
            .and_then(|index| self.questionnaire.prompt(index))
    }

    /// Advances the state machine with one applicant message.
    pub fn handle_input(&mut self, input: &str, now: DateTime<Utc>) -> SessionOutcome {
        if self.state.is_terminal() {
            return SessionOutcome::Ignored;
        }
        self.last_activity = now;

        match std::mem::replace(&mut self.state, SessionState::Cancelled) {
            SessionState::AwaitingAnswer { index } => self.answer(index, input, now),
            SessionState::AwaitingTruncateConfirm { index, buffered } => {
                match keyword(input).as_str() {
                    CANCEL_KEYWORD => self.cancel(),
                    PROCEED_KEYWORD => self.accept(index, sanitizer::truncate(&buffered), now),
                    // Anything else is a fresh attempt; the stale buffer is dropped.
                    _ => self.answer(index, input, now),
                }
            }
            terminal => {
                self.state = terminal;
                SessionOutcome::Ignored
            }
        }
    }

    /// Moves the session to `Cancelled`, discarding any buffered answer.
    pub fn cancel(&mut self) -> SessionOutcome {
        self.state = SessionState::Cancelled;
        SessionOutcome::Cancelled
    }

    /// Validates a whole questionnaire submitted at once (form entry).
    ///
    /// A form cannot be asked to confirm truncation, so over-long answers are
    /// truncated directly. Empty or spam answers reject the submission and
    /// leave the session untouched.
    pub fn submit_all(&mut self, answers: &[String], now: DateTime<Utc>) -> Result<ReviewRecord> {
        if self.state != (SessionState::AwaitingAnswer { index: 0 }) {
            return Err(NoxError::internal(
                "form submission is only accepted before any answer",
            ));
        }

        let expected = self.questionnaire.len();
        if answers.len() != expected {
            return Err(NoxError::InvalidSubmission {
                question: answers.len().min(expected),
                reason: format!("expected {} answers, got {}", expected, answers.len()),
            });
        }

        let mut accepted = Vec::with_capacity(expected);
        for (question, raw) in answers.iter().enumerate() {
            let answer = match sanitizer::validate(raw) {
                AnswerVerdict::Accepted(text) => text,
                AnswerVerdict::TooLong(text) => sanitizer::truncate(&text),
                AnswerVerdict::Spam => {
                    return Err(NoxError::InvalidSubmission {
                        question,
                        reason: "answer looks like spam".to_string(),
                    });
                }
                AnswerVerdict::Empty => {
                    return Err(NoxError::InvalidSubmission {
                        question,
                        reason: "answer is empty".to_string(),
                    });
                }
            };
            accepted.push(answer);
        }

        self.answers = accepted;
        self.state = SessionState::Completed;
        self.last_activity = now;
        Ok(self.review_record(now))
    }

    fn answer(&mut self, index: usize, input: &str, now: DateTime<Utc>) -> SessionOutcome {
        if keyword(input) == CANCEL_KEYWORD {
            return self.cancel();
        }

        match sanitizer::validate(input) {
            AnswerVerdict::Accepted(text) => self.accept(index, text, now),
            AnswerVerdict::TooLong(buffered) => {
                let length = sanitizer::char_len(&buffered);
                self.state = SessionState::AwaitingTruncateConfirm { index, buffered };
                SessionOutcome::TooLong { length }
            }
            AnswerVerdict::Spam => {
                self.state = SessionState::AwaitingAnswer { index };
                SessionOutcome::Rejected(RejectReason::Spam)
            }
            AnswerVerdict::Empty => {
                self.state = SessionState::AwaitingAnswer { index };
                SessionOutcome::Rejected(RejectReason::Empty)
            }
        }
    }

    fn accept(&mut self, index: usize, answer: String, now: DateTime<Utc>) -> SessionOutcome {
        debug_assert_eq!(self.answers.len(), index);
        self.answers.push(answer);

        let next = index + 1;
        match self.questionnaire.prompt(next) {
            Some(prompt) => {
                self.state = SessionState::AwaitingAnswer { index: next };
                SessionOutcome::NextQuestion {
                    index: next,
                    prompt,
                }
            }
            None => {
                self.state = SessionState::Completed;
                SessionOutcome::Completed(self.review_record(now))
            }
        }
    }

    fn review_record(&self, now: DateTime<Utc>) -> ReviewRecord {
        ReviewRecord::new(
            self.applicant.clone(),
            self.server_id.clone(),
            self.questionnaire.iter(),
            self.answers.iter().cloned(),
            now,
        )
    }
}

fn keyword(input: &str) -> String {
    input.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::QUESTIONS;

    fn session() -> ApplicationSession {
        ApplicationSession::new(
            Applicant::new("1001", "Night Owl"),
            ServerId::new("guild-1"),
            Questionnaire::default(),
            Utc::now(),
        )
    }

    fn answer(n: usize) -> String {
        format!("Answer number {} with some detail", n)
    }

    fn assert_invariant(s: &ApplicationSession) {
        if s.pending_long_answer().is_none() {
            assert_eq!(s.answers().len(), s.current_question());
        }
    }

    #[test]
    fn test_initial_state() {
        let s = session();
        assert_eq!(s.state(), &SessionState::AwaitingAnswer { index: 0 });
        assert_eq!(s.current_question(), 0);
        assert!(s.current_prompt().unwrap().contains(QUESTIONS[0]));
    }

    #[test]
    fn test_full_walk_completes_with_ordered_record() {
        let mut s = session();
        for i in 0..QUESTIONS.len() - 1 {
            let outcome = s.handle_input(&answer(i), Utc::now());
            assert!(matches!(outcome, SessionOutcome::NextQuestion { index, .. } if index == i + 1));
            assert_invariant(&s);
        }

        let outcome = s.handle_input(&answer(6), Utc::now());
        let SessionOutcome::Completed(record) = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        assert_eq!(record.entries.len(), 7);
        for (i, entry) in record.entries.iter().enumerate() {
            assert_eq!(entry.question, QUESTIONS[i]);
            assert_eq!(entry.answer, answer(i));
        }
        assert_eq!(s.state(), &SessionState::Completed);
        assert_eq!(s.current_question(), 7);
        assert_invariant(&s);
    }

    #[test]
    fn test_cancel_as_third_answer() {
        let mut s = session();
        s.handle_input(&answer(0), Utc::now());
        s.handle_input(&answer(1), Utc::now());
        assert_eq!(s.handle_input("  CANCEL ", Utc::now()), SessionOutcome::Cancelled);
        assert_eq!(s.state(), &SessionState::Cancelled);
        assert_eq!(s.answers().len(), 2);
        assert_eq!(s.handle_input("more", Utc::now()), SessionOutcome::Ignored);
    }

    #[test]
    fn test_spam_does_not_advance() {
        let mut s = session();
        let outcome = s.handle_input(&"🎉".repeat(40), Utc::now());
        assert_eq!(outcome, SessionOutcome::Rejected(RejectReason::Spam));
        assert_eq!(s.current_question(), 0);
        assert!(s.answers().is_empty());
        assert_eq!(
            s.handle_input("   ", Utc::now()),
            SessionOutcome::Rejected(RejectReason::Empty)
        );
    }

    #[test]
    fn test_long_answer_then_proceed_truncates_and_advances() {
        let mut s = session();
        let long = "lorem ipsum ".repeat(71); // 852 chars before normalization
        let outcome = s.handle_input(&long, Utc::now());
        assert!(matches!(outcome, SessionOutcome::TooLong { length } if length > 800));
        assert_eq!(s.current_question(), 0);
        assert!(s.pending_long_answer().is_some());
        assert!(s.answers().is_empty());

        let outcome = s.handle_input("Proceed", Utc::now());
        assert!(matches!(outcome, SessionOutcome::NextQuestion { index: 1, .. }));
        assert_eq!(s.current_question(), 1);
        let stored = &s.answers()[0];
        assert!(stored.chars().count() <= 800);
        assert!(stored.ends_with("characters total]"));
        assert!(s.pending_long_answer().is_none());
    }

    #[test]
    fn test_retry_after_long_answer_discards_buffer() {
        let mut s = session();
        s.handle_input(&"word ".repeat(200), Utc::now());
        let outcome = s.handle_input("A short retry", Utc::now());
        assert!(matches!(outcome, SessionOutcome::NextQuestion { index: 1, .. }));
        assert_eq!(s.answers(), ["A short retry".to_string()]);
    }

    #[test]
    fn test_cancel_while_confirming_truncation() {
        let mut s = session();
        s.handle_input(&"word ".repeat(200), Utc::now());
        assert_eq!(s.handle_input("cancel", Utc::now()), SessionOutcome::Cancelled);
        assert!(s.answers().is_empty());
        assert!(s.pending_long_answer().is_none());
    }

    #[test]
    fn test_retry_while_confirming_can_be_long_again() {
        let mut s = session();
        s.handle_input(&"word ".repeat(200), Utc::now());
        let outcome = s.handle_input(&"other ".repeat(200), Utc::now());
        assert!(matches!(outcome, SessionOutcome::TooLong { .. }));
        assert!(s.pending_long_answer().unwrap().starts_with("other"));
    }

    #[test]
    fn test_submit_all_completes() {
        let mut s = session();
        let mut answers: Vec<String> = (0..7).map(answer).collect();
        answers[3] = "x y ".repeat(300);
        let record = s.submit_all(&answers, Utc::now()).unwrap();
        assert_eq!(record.entries.len(), 7);
        assert!(record.entries[3].answer.chars().count() <= 800);
        assert_eq!(s.state(), &SessionState::Completed);
    }

    #[test]
    fn test_submit_all_rejects_spam_without_mutation() {
        let mut s = session();
        let mut answers: Vec<String> = (0..7).map(answer).collect();
        answers[2] = ".".repeat(50);
        let err = s.submit_all(&answers, Utc::now()).unwrap_err();
        assert!(matches!(err, NoxError::InvalidSubmission { question: 2, .. }));
        assert!(s.answers().is_empty());
        assert_eq!(s.state(), &SessionState::AwaitingAnswer { index: 0 });
    }

    #[test]
    fn test_submit_all_rejects_wrong_count_and_started_sessions() {
        let mut s = session();
        let err = s.submit_all(&[answer(0)], Utc::now()).unwrap_err();
        assert!(matches!(err, NoxError::InvalidSubmission { question: 1, .. }));

        s.handle_input(&answer(0), Utc::now());
        let answers: Vec<String> = (0..7).map(answer).collect();
        assert!(s.submit_all(&answers, Utc::now()).is_err());
    }

    #[test]
    fn test_last_activity_tracks_input() {
        let start = Utc::now();
        let mut s = ApplicationSession::new(
            Applicant::new("1", "a"),
            ServerId::new("g"),
            Questionnaire::default(),
            start,
        );
        let later = start + Duration::minutes(5);
        s.handle_input(&answer(0), later);
        assert_eq!(s.last_activity(), later);
        assert_eq!(s.idle_for(later + Duration::minutes(1)), Duration::minutes(1));
    }
}
