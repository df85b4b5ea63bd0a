//! Staff approve/reject commands issued inside a review surface.

use std::sync::Arc;

use chrono::Utc;
use nox_core::config::AppConfig;
use nox_core::decision::{Decision, DecisionInvocation};
use nox_core::platform::{Directory, Messenger};
use nox_core::review::handle_slug;
use nox_core::timespec::TimeSpec;
use nox_core::{MemberId, NoxError, Result};

use crate::scheduler::{DeletionScheduler, PendingDeletion};

/// Result of a decision that was posted.
///
/// Notification problems are reported here rather than as errors: once the
/// decision is posted it stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionReport {
    pub decision: Decision,
    pub applicant: Option<MemberId>,
    pub notified: bool,
    pub notify_error: Option<String>,
    pub deletion: Option<PendingDeletion>,
}

impl DecisionReport {
    /// Ephemeral confirmation shown to the staff member.
    pub fn summary(&self) -> String {
        let mut out = format!("Application {}.", self.decision.kind.past_tense());
        match (&self.applicant, self.notified) {
            (_, true) => out.push_str(" The applicant was notified."),
            (None, false) => out.push_str(" ⚠️ Could not find the applicant to notify them."),
            (Some(_), false) => {
                out.push_str(" ⚠️ Could not notify the applicant (DMs may be closed).")
            }
        }
        if let Some(deletion) = &self.deletion {
            out.push_str(&format!(
                " Channel deletion scheduled for {}.",
                deletion.due_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        out
    }
}

pub struct DecisionService {
    directory: Arc<dyn Directory>,
    messenger: Arc<dyn Messenger>,
    scheduler: Arc<DeletionScheduler>,
    config: Arc<AppConfig>,
    server_name: String,
}

impl DecisionService {
    pub fn new(
        directory: Arc<dyn Directory>,
        messenger: Arc<dyn Messenger>,
        scheduler: Arc<DeletionScheduler>,
        config: Arc<AppConfig>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            messenger,
            scheduler,
            config,
            server_name: server_name.into(),
        }
    }

    /// Validates and applies an approve or reject command.
    ///
    /// Authorization, surface context and the deletion delay are all checked
    /// before anything is posted, so a rejected command has no side effects.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: the actor is neither an administrator nor staff
    /// - `WrongContext`: the surface is not a review surface
    /// - `InvalidTimeSpec`: `delete_time` does not parse
    /// - Posting the decision failed
    pub async fn decide(&self, invocation: DecisionInvocation) -> Result<DecisionReport> {
        self.authorize(&invocation.actor).await?;
        let slug = self.review_context(&invocation).await?;
        let delete_after = invocation
            .delete_time
            .as_deref()
            .map(str::parse::<TimeSpec>)
            .transpose()?;

        let message = invocation
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| invocation.kind.default_message().to_string());

        let decision = Decision {
            kind: invocation.kind,
            message,
            actor: invocation.actor.clone(),
            decided_at: Utc::now(),
            delete_after,
        };

        self.directory
            .post_message(&invocation.surface, &decision.render())
            .await?;
        tracing::info!(
            "[DecisionService] {} {} application in {}",
            invocation.actor,
            decision.kind.past_tense(),
            invocation.surface
        );

        let applicant = self.locate_applicant(&invocation, &slug).await;
        let (notified, notify_error) = match &applicant {
            Some(member) => {
                let notice = decision.applicant_notice(&self.server_name);
                match self.messenger.send_direct(member, &notice).await {
                    Ok(()) => (true, None),
                    Err(e) => {
                        tracing::warn!(
                            "[DecisionService] Could not notify applicant {}: {}",
                            member,
                            e
                        );
                        (false, Some(e.to_string()))
                    }
                }
            }
            None => {
                tracing::warn!(
                    "[DecisionService] No applicant found for surface {}",
                    invocation.surface
                );
                (false, Some(format!("no applicant found for '{}'", slug)))
            }
        };

        let deletion = match delete_after {
            Some(delay) => Some(
                self.scheduler
                    .schedule(invocation.surface.clone(), delay.as_duration())
                    .await,
            ),
            None => None,
        };

        Ok(DecisionReport {
            decision,
            applicant,
            notified,
            notify_error,
            deletion,
        })
    }

    async fn authorize(&self, actor: &MemberId) -> Result<()> {
        let permissions = self.directory.member_permissions(actor).await.map_err(|e| {
            tracing::warn!("[DecisionService] Permission lookup for {} failed: {}", actor, e);
            NoxError::Unauthorized(format!("could not verify permissions of {}", actor))
        })?;

        let staff_roles = self.config.staff_roles();
        let is_staff = permissions.roles.iter().any(|r| staff_roles.contains(r));
        if permissions.administrator || is_staff {
            Ok(())
        } else {
            Err(NoxError::Unauthorized(
                "You don't have permission to use this command.".to_string(),
            ))
        }
    }

    /// Returns the handle slug encoded in the review surface name.
    async fn review_context(&self, invocation: &DecisionInvocation) -> Result<String> {
        let wrong_context = || {
            NoxError::WrongContext("This command can only be used in application channels.".into())
        };
        let name = self
            .directory
            .surface_name(&invocation.surface)
            .await?
            .ok_or_else(wrong_context)?;
        handle_slug(&self.config.channel_prefix, &name)
            .map(str::to_string)
            .ok_or_else(wrong_context)
    }

    /// Stored applicant reference first, handle lookup as a fallback.
    async fn locate_applicant(
        &self,
        invocation: &DecisionInvocation,
        slug: &str,
    ) -> Option<MemberId> {
        match self.directory.review_applicant(&invocation.surface).await {
            Ok(Some(member)) => return Some(member),
            Ok(None) => {}
            Err(e) => tracing::warn!(
                "[DecisionService] Could not read applicant reference of {}: {}",
                invocation.surface,
                e
            ),
        }
        self.directory
            .find_member_by_handle(slug)
            .await
            .inspect_err(|e| {
                tracing::warn!("[DecisionService] Handle lookup for '{}' failed: {}", slug, e)
            })
            .ok()
            .flatten()
    }
}
