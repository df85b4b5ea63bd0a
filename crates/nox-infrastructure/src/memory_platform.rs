//! In-memory chat platform.
//!
//! Implements [`Messenger`] and [`Directory`] against process memory. The
//! console driver runs the whole workflow on it, and tests use it to observe
//! what the workflow sent where.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use nox_core::identity::{CategoryId, MemberId, RoleId, SurfaceId};
use nox_core::platform::{Directory, MemberPermissions, Messenger, SurfaceAccess};
use nox_core::review::{ReviewRecord, applicant_slug};
use nox_core::{NoxError, Result};

#[derive(Debug, Clone)]
struct Member {
    handle: String,
    permissions: MemberPermissions,
    accepts_direct_messages: bool,
}

/// Observable copy of a review surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub id: SurfaceId,
    pub name: String,
    pub category: CategoryId,
    pub access: SurfaceAccess,
    pub messages: Vec<String>,
    pub applicant: Option<MemberId>,
}

#[derive(Debug, Default)]
struct PlatformState {
    members: HashMap<MemberId, Member>,
    surfaces: HashMap<SurfaceId, SurfaceSnapshot>,
    inboxes: HashMap<MemberId, Vec<String>>,
    next_surface: u64,
    deny_surface_creation: bool,
    fail_posts: bool,
}

/// A single-server platform held entirely in memory.
#[derive(Debug)]
pub struct InMemoryPlatform {
    server_name: String,
    state: Mutex<PlatformState>,
}

impl InMemoryPlatform {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            state: Mutex::new(PlatformState::default()),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn state(&self) -> MutexGuard<'_, PlatformState> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ============================================================================
    // Setup helpers
    // ============================================================================

    pub fn add_member(&self, id: impl Into<MemberId>, handle: impl Into<String>) {
        self.state().members.insert(
            id.into(),
            Member {
                handle: handle.into(),
                permissions: MemberPermissions::default(),
                accepts_direct_messages: true,
            },
        );
    }

    pub fn grant_role(&self, id: &MemberId, role: RoleId) {
        if let Some(member) = self.state().members.get_mut(id) {
            member.permissions.roles.push(role);
        }
    }

    pub fn set_administrator(&self, id: &MemberId, administrator: bool) {
        if let Some(member) = self.state().members.get_mut(id) {
            member.permissions.administrator = administrator;
        }
    }

    pub fn set_direct_messages(&self, id: &MemberId, open: bool) {
        if let Some(member) = self.state().members.get_mut(id) {
            member.accepts_direct_messages = open;
        }
    }

    /// Makes surface creation fail with `Forbidden`.
    pub fn deny_surface_creation(&self, deny: bool) {
        self.state().deny_surface_creation = deny;
    }

    /// Makes every post into a surface fail.
    pub fn fail_posts(&self, fail: bool) {
        self.state().fail_posts = fail;
    }

    /// Creates a plain surface, as staff would for a non-application channel.
    pub fn create_plain_surface(&self, name: impl Into<String>) -> SurfaceId {
        let mut state = self.state();
        let id = Self::allocate_surface(&mut state);
        state.surfaces.insert(
            id.clone(),
            SurfaceSnapshot {
                id: id.clone(),
                name: name.into(),
                category: 0,
                access: SurfaceAccess::default(),
                messages: Vec::new(),
                applicant: None,
            },
        );
        id
    }

    fn allocate_surface(state: &mut PlatformState) -> SurfaceId {
        state.next_surface += 1;
        SurfaceId::new(format!("surface-{}", state.next_surface))
    }

    // ============================================================================
    // Observation helpers
    // ============================================================================

    pub fn member_handle(&self, id: &MemberId) -> Option<String> {
        self.state().members.get(id).map(|m| m.handle.clone())
    }

    /// Direct messages delivered to `id`, oldest first.
    pub fn inbox(&self, id: &MemberId) -> Vec<String> {
        self.state().inboxes.get(id).cloned().unwrap_or_default()
    }

    /// Removes and returns the direct messages delivered to `id`.
    pub fn drain_inbox(&self, id: &MemberId) -> Vec<String> {
        self.state().inboxes.remove(id).unwrap_or_default()
    }

    pub fn surface(&self, id: &SurfaceId) -> Option<SurfaceSnapshot> {
        self.state().surfaces.get(id).cloned()
    }

    pub fn surface_by_name(&self, name: &str) -> Option<SurfaceSnapshot> {
        self.state()
            .surfaces
            .values()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn surfaces(&self) -> Vec<SurfaceSnapshot> {
        let mut surfaces: Vec<_> = self.state().surfaces.values().cloned().collect();
        surfaces.sort_by(|a, b| a.name.cmp(&b.name));
        surfaces
    }
}

#[async_trait]
impl Messenger for InMemoryPlatform {
    async fn send_direct(&self, member: &MemberId, text: &str) -> Result<()> {
        let mut state = self.state();
        let open = state
            .members
            .get(member)
            .map(|m| m.accepts_direct_messages)
            .unwrap_or(false);
        if !open {
            return Err(NoxError::unreachable(member.as_str()));
        }
        state
            .inboxes
            .entry(member.clone())
            .or_default()
            .push(text.to_string());
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryPlatform {
    async fn find_review_surface(&self, name: &str) -> Result<Option<SurfaceId>> {
        Ok(self
            .state()
            .surfaces
            .values()
            .find(|s| s.name == name)
            .map(|s| s.id.clone()))
    }

    async fn create_review_surface(
        &self,
        name: &str,
        category: CategoryId,
        access: &SurfaceAccess,
    ) -> Result<SurfaceId> {
        let mut state = self.state();
        if state.deny_surface_creation {
            return Err(NoxError::Forbidden(format!(
                "missing permission to create channel '{}'",
                name
            )));
        }
        let id = Self::allocate_surface(&mut state);
        state.surfaces.insert(
            id.clone(),
            SurfaceSnapshot {
                id: id.clone(),
                name: name.to_string(),
                category,
                access: access.clone(),
                messages: Vec::new(),
                applicant: None,
            },
        );
        Ok(id)
    }

    async fn post_record(&self, surface: &SurfaceId, record: &ReviewRecord) -> Result<()> {
        let mut state = self.state();
        if state.fail_posts {
            return Err(NoxError::Provision("message post rejected".to_string()));
        }
        let entry = state
            .surfaces
            .get_mut(surface)
            .ok_or_else(|| NoxError::not_found("Surface", surface.as_str()))?;
        entry.messages.push(record.render());
        entry.applicant = Some(record.applicant_ref().clone());
        Ok(())
    }

    async fn post_message(&self, surface: &SurfaceId, text: &str) -> Result<()> {
        let mut state = self.state();
        if state.fail_posts {
            return Err(NoxError::Provision("message post rejected".to_string()));
        }
        let entry = state
            .surfaces
            .get_mut(surface)
            .ok_or_else(|| NoxError::not_found("Surface", surface.as_str()))?;
        entry.messages.push(text.to_string());
        Ok(())
    }

    async fn review_applicant(&self, surface: &SurfaceId) -> Result<Option<MemberId>> {
        Ok(self
            .state()
            .surfaces
            .get(surface)
            .and_then(|s| s.applicant.clone()))
    }

    async fn surface_name(&self, surface: &SurfaceId) -> Result<Option<String>> {
        Ok(self.state().surfaces.get(surface).map(|s| s.name.clone()))
    }

    async fn delete_surface(&self, surface: &SurfaceId) -> Result<()> {
        if self.state().surfaces.remove(surface).is_none() {
            tracing::debug!("[InMemoryPlatform] Surface {} already gone", surface);
        }
        Ok(())
    }

    async fn find_member_by_handle(&self, slug: &str) -> Result<Option<MemberId>> {
        Ok(self
            .state()
            .members
            .iter()
            .find(|(id, m)| applicant_slug(id, &m.handle) == slug)
            .map(|(id, _)| id.clone()))
    }

    async fn member_permissions(&self, member: &MemberId) -> Result<MemberPermissions> {
        self.state()
            .members
            .get(member)
            .map(|m| m.permissions.clone())
            .ok_or_else(|| NoxError::not_found("Member", member.as_str()))
    }
}
