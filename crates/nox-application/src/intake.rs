//! Application intake use case.
//!
//! Coordinates the session registry with the platform: starts sessions,
//! routes applicant messages, and provisions a review surface once the
//! questionnaire is complete.

use std::sync::Arc;

use chrono::Utc;
use nox_core::application::{CANCEL_KEYWORD, SessionOutcome};
use nox_core::config::AppConfig;
use nox_core::platform::{Directory, Messenger, SurfaceAccess};
use nox_core::review::{ReviewRecord, surface_name};
use nox_core::{Applicant, MemberId, NoxError, Result, ServerId, SessionRegistry, SurfaceId};

/// What happened to a completed application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Provisioned(SurfaceId),
    /// The review surface could not be created or populated; the applicant
    /// was told to contact staff directly.
    Failed(NoxError),
}

/// Use case for walking applicants through the questionnaire.
///
/// # Responsibilities
///
/// - Rejecting duplicate applications (active session or existing review surface)
/// - Relaying prompts and validation notices by direct message
/// - Provisioning the review surface on completion
///
/// A session is never left behind: completion and cancellation evict it in
/// the registry, and a failed first message removes it again.
pub struct ApplicationService {
    registry: Arc<SessionRegistry>,
    messenger: Arc<dyn Messenger>,
    directory: Arc<dyn Directory>,
    config: Arc<AppConfig>,
}

impl ApplicationService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        messenger: Arc<dyn Messenger>,
        directory: Arc<dyn Directory>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            registry,
            messenger,
            directory,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Starts a direct-message application for `applicant`.
    ///
    /// # Errors
    ///
    /// - `AlreadyActive`: the applicant is already answering questions
    /// - `AlreadyHasReviewSurface`: a review surface already exists for them
    /// - `Unreachable`: the first question could not be delivered; no session is kept
    pub async fn start(&self, applicant: Applicant, server_id: ServerId) -> Result<()> {
        self.ensure_no_conflict(&applicant).await?;

        let applicant_id = applicant.id.clone();
        let first_prompt = self
            .registry
            .begin(applicant, server_id, Utc::now())
            .await
            .inspect_err(|e| tracing::warn!("[ApplicationService] start rejected: {}", e))?;

        let intro = format!(
            "👋 Thanks for applying! I'll ask you {} questions, one at a time.\n\
             Reply to each question in this chat. Type `{}` at any time to stop.\n\n{}",
            self.registry.questionnaire().len(),
            CANCEL_KEYWORD,
            first_prompt
        );

        if let Err(e) = self.messenger.send_direct(&applicant_id, &intro).await {
            self.registry.end(&applicant_id).await;
            tracing::warn!(
                "[ApplicationService] Could not DM applicant {}, session aborted: {}",
                applicant_id,
                e
            );
            return Err(e);
        }

        Ok(())
    }

    /// Routes a direct message from `applicant_id`.
    ///
    /// Returns `false` when the member has no application in progress, in
    /// which case the message should be handled as an ordinary message.
    pub async fn handle_message(&self, applicant_id: &MemberId, text: &str) -> bool {
        let Some(outcome) = self.registry.dispatch(applicant_id, text, Utc::now()).await else {
            return false;
        };

        match outcome {
            SessionOutcome::Completed(record) => {
                self.complete(record).await;
            }
            other => {
                if let Some(notice) = other.applicant_notice() {
                    self.notify(applicant_id, &notice).await;
                }
            }
        }
        true
    }

    /// Accepts a complete questionnaire in one submission (form entry).
    ///
    /// # Errors
    ///
    /// Conflicts as for [`ApplicationService::start`], and `InvalidSubmission`
    /// when an answer is empty or spam. Provisioning failures are not errors:
    /// they are reported through [`ProvisionOutcome::Failed`].
    pub async fn submit_form(
        &self,
        applicant: Applicant,
        server_id: ServerId,
        answers: &[String],
    ) -> Result<ProvisionOutcome> {
        self.ensure_no_conflict(&applicant).await?;
        let record = self
            .registry
            .submit_form(applicant, server_id, answers, Utc::now())
            .await?;
        Ok(self.complete(record).await)
    }

    async fn ensure_no_conflict(&self, applicant: &Applicant) -> Result<()> {
        if self.registry.contains(&applicant.id).await {
            tracing::warn!(
                "[ApplicationService] Applicant {} already has an active session",
                applicant.id
            );
            return Err(NoxError::already_active(applicant.id.as_str()));
        }

        let name = surface_name(&self.config.channel_prefix, applicant);
        if self.directory.find_review_surface(&name).await?.is_some() {
            tracing::warn!(
                "[ApplicationService] Review surface {} already exists for {}",
                name,
                applicant.id
            );
            return Err(NoxError::already_has_review_surface(name));
        }
        Ok(())
    }

    /// Hands a finished record to the platform and tells the applicant how it went.
    async fn complete(&self, record: ReviewRecord) -> ProvisionOutcome {
        let applicant_id = record.applicant_ref().clone();
        match self.provision(&record).await {
            Ok(surface) => {
                tracing::info!(
                    "[ApplicationService] Application from {} posted to {}",
                    applicant_id,
                    surface
                );
                self.notify(
                    &applicant_id,
                    "✅ Your application has been submitted! Our officers will review it soon.",
                )
                .await;
                ProvisionOutcome::Provisioned(surface)
            }
            Err(e) => {
                tracing::error!(
                    "[ApplicationService] Failed to provision review surface for {}: {:?}",
                    applicant_id,
                    e
                );
                let reason = if matches!(e, NoxError::Forbidden(_)) {
                    "I don't have permission to create your application channel."
                } else {
                    "Something went wrong while creating your application channel."
                };
                self.notify(
                    &applicant_id,
                    &format!("❌ {} Please contact a staff member directly.", reason),
                )
                .await;
                ProvisionOutcome::Failed(e)
            }
        }
    }

    /// Creates the review surface for `record` and posts the answers into it.
    ///
    /// If the answers cannot be posted the surface is deleted again, so a
    /// failed provision leaves nothing behind.
    pub async fn provision(&self, record: &ReviewRecord) -> Result<SurfaceId> {
        let name = record.surface_name(&self.config.channel_prefix);
        let access = SurfaceAccess {
            applicant: Some(record.applicant_ref().clone()),
            staff_roles: self.config.staff_roles(),
        };

        let surface = self
            .directory
            .create_review_surface(&name, self.config.category_id, &access)
            .await?;

        if let Err(e) = self.directory.post_record(&surface, record).await {
            // An empty surface would block the applicant from reapplying.
            if let Err(cleanup) = self.directory.delete_surface(&surface).await {
                tracing::error!(
                    "[ApplicationService] Could not remove empty review surface {}: {}",
                    surface,
                    cleanup
                );
            }
            return Err(e);
        }
        Ok(surface)
    }

    async fn notify(&self, member: &MemberId, text: &str) {
        if let Err(e) = self.messenger.send_direct(member, text).await {
            tracing::warn!(
                "[ApplicationService] Could not deliver message to {}: {}",
                member,
                e
            );
        }
    }
}
