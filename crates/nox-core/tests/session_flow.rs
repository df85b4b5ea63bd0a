use chrono::Utc;
use nox_core::application::{SessionOutcome, SessionState};
use nox_core::sanitizer::{self, MAX_ANSWER_LENGTH};
use nox_core::timespec;
use nox_core::{Applicant, MemberId, NoxError, ServerId, SessionRegistry};

fn applicant() -> Applicant {
    Applicant::new("42", "Night Owl")
}

fn id() -> MemberId {
    MemberId::new("42")
}

fn answer(i: usize) -> String {
    format!("Answer number {} with enough words to look real.", i + 1)
}

#[tokio::test]
async fn test_seven_answers_complete_in_order() {
    let registry = SessionRegistry::default();
    registry
        .begin(applicant(), ServerId::new("g"), Utc::now())
        .await
        .unwrap();

    let mut last = None;
    for i in 0..7 {
        let session = registry.snapshot(&id()).await.unwrap();
        assert_eq!(session.answers().len(), session.current_question());
        last = registry.dispatch(&id(), &answer(i), Utc::now()).await;
    }

    let Some(SessionOutcome::Completed(record)) = last else {
        panic!("expected completion, got {:?}", last);
    };
    assert_eq!(record.entries.len(), 7);
    for (i, entry) in record.entries.iter().enumerate() {
        assert_eq!(entry.answer, answer(i));
    }
    assert_eq!(record.surface_name("application"), "application-night-owl");
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_cancel_as_third_answer() {
    let registry = SessionRegistry::default();
    registry
        .begin(applicant(), ServerId::new("g"), Utc::now())
        .await
        .unwrap();
    registry.dispatch(&id(), &answer(0), Utc::now()).await;
    registry.dispatch(&id(), &answer(1), Utc::now()).await;

    let before = registry.snapshot(&id()).await.unwrap();
    assert_eq!(before.answers().len(), 2);

    let outcome = registry.dispatch(&id(), "cancel", Utc::now()).await;
    assert_eq!(outcome, Some(SessionOutcome::Cancelled));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_long_answer_needs_confirmation() {
    let registry = SessionRegistry::default();
    registry
        .begin(applicant(), ServerId::new("g"), Utc::now())
        .await
        .unwrap();

    let long = "I enjoy raiding with friends on weekends. ".repeat(21);
    let outcome = registry.dispatch(&id(), &long, Utc::now()).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::TooLong { length: 881 }));

    let session = registry.snapshot(&id()).await.unwrap();
    assert!(matches!(
        session.state(),
        SessionState::AwaitingTruncateConfirm { index: 0, .. }
    ));

    let outcome = registry.dispatch(&id(), "Proceed", Utc::now()).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::NextQuestion { index: 1, .. }));
    let snapshot = registry.snapshot(&id()).await.unwrap();
    let stored = &snapshot.answers()[0];
    assert!(stored.chars().count() <= MAX_ANSWER_LENGTH);
    assert!(stored.ends_with("881 characters total]"));
}

#[tokio::test]
async fn test_begin_twice() {
    let registry = SessionRegistry::default();
    registry
        .begin(applicant(), ServerId::new("g"), Utc::now())
        .await
        .unwrap();
    let err = registry
        .begin(applicant(), ServerId::new("other"), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, NoxError::AlreadyActive { .. }));
}

#[test]
fn test_timespec_table() {
    assert_eq!(timespec::parse("10m"), Some(600));
    assert_eq!(timespec::parse("1h"), Some(3600));
    assert_eq!(timespec::parse("24"), Some(86_400));
    assert_eq!(timespec::parse("0m"), None);
    assert_eq!(timespec::parse("169h"), None);
    assert_eq!(timespec::parse("abc"), None);

    assert_eq!(timespec::format(90), "1 minute");
    assert_eq!(timespec::format(120), "2 minutes");
    assert_eq!(timespec::format(3600), "1 hour");
    assert_eq!(timespec::format(7200), "2 hours");
}

#[test]
fn test_sanitizer_bounds() {
    assert!(!sanitizer::is_spam("aaaaaaaaa"));
    assert!(sanitizer::is_spam("aaaaaaaaaa"));

    let short = "  already   fine  ";
    assert_eq!(sanitizer::truncate(short), sanitizer::normalize(short));

    let emoji = "🎉 ".repeat(900);
    assert!(sanitizer::truncate(&emoji).chars().count() <= MAX_ANSWER_LENGTH);
}
