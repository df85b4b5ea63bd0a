//! Collaborator interfaces for the chat platform.
//!
//! These traits decouple the workflow from a specific chat client. The
//! workflow only ever talks to the platform through the narrow verbs below.

use async_trait::async_trait;

use crate::error::Result;
use crate::identity::{CategoryId, MemberId, RoleId, SurfaceId};
use crate::review::ReviewRecord;

/// Who may see a newly created review surface besides the platform bot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SurfaceAccess {
    pub applicant: Option<MemberId>,
    pub staff_roles: Vec<RoleId>,
}

/// Permissions relevant to staff commands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberPermissions {
    pub administrator: bool,
    pub roles: Vec<RoleId>,
}

/// Direct message delivery.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a direct message.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Message delivered
    /// - `Err(NoxError::Unreachable)`: The member does not accept direct messages
    async fn send_direct(&self, member: &MemberId, text: &str) -> Result<()>;
}

/// Channel directory and permission service.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Finds a review surface by exact name.
    async fn find_review_surface(&self, name: &str) -> Result<Option<SurfaceId>>;

    /// Creates an access-restricted review surface.
    ///
    /// # Returns
    ///
    /// - `Ok(SurfaceId)`: Surface created
    /// - `Err(NoxError::Forbidden)`: The bot lacks permission
    /// - `Err(NoxError::Provision)`: Any other platform failure
    async fn create_review_surface(
        &self,
        name: &str,
        category: CategoryId,
        access: &SurfaceAccess,
    ) -> Result<SurfaceId>;

    /// Posts a review record; the platform keeps the record's applicant
    /// reference so [`Directory::review_applicant`] can return it later.
    async fn post_record(&self, surface: &SurfaceId, record: &ReviewRecord) -> Result<()>;

    /// Posts a plain message into a surface.
    async fn post_message(&self, surface: &SurfaceId, text: &str) -> Result<()>;

    /// Applicant reference stored with the review record posted to `surface`.
    async fn review_applicant(&self, surface: &SurfaceId) -> Result<Option<MemberId>>;

    /// Current name of a surface, or `None` if it no longer exists.
    async fn surface_name(&self, surface: &SurfaceId) -> Result<Option<String>>;

    /// Deletes a surface. Deleting a surface that is already gone succeeds.
    async fn delete_surface(&self, surface: &SurfaceId) -> Result<()>;

    /// Live lookup of the member whose [`applicant_slug`](crate::review::applicant_slug)
    /// matches `slug`.
    async fn find_member_by_handle(&self, slug: &str) -> Result<Option<MemberId>>;

    async fn member_permissions(&self, member: &MemberId) -> Result<MemberPermissions>;
}
