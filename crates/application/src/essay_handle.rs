use std::sync::Arc;

use tracing::info;

use discepto_core::{AppError, AppResult};
use discepto_domain::{Essay, EssayId, Permission, PermissionSet, UserId, VoteType};

use crate::{Cancellation, EssayRepository, UserHandle};

/// Per-essay capability bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EssayCapabilities {
    /// May read the essay.
    pub read: bool,
    /// May delete the essay.
    pub delete: bool,
    /// May change the essay's ranking.
    pub change_ranking: bool,
}

impl EssayCapabilities {
    /// Derives capabilities from community permissions. Authors always read
    /// and delete their own essays.
    #[must_use]
    pub fn derive(permissions: &PermissionSet, user_id: Option<UserId>, essay: &Essay) -> Self {
        let owner = user_id == Some(essay.attributed_to);
        Self {
            read: owner || permissions.has(Permission::ReadSubdiscepto),
            delete: owner || permissions.has(Permission::DeleteEssay),
            change_ranking: permissions.has(Permission::ChangeRanking),
        }
    }
}

/// Capability handle over one essay.
#[derive(Clone)]
pub struct EssayHandle {
    essay: Essay,
    capabilities: EssayCapabilities,
    essays: Arc<dyn EssayRepository>,
    cancellation: Cancellation,
}

impl EssayHandle {
    pub(crate) fn new(
        essay: Essay,
        capabilities: EssayCapabilities,
        essays: Arc<dyn EssayRepository>,
        cancellation: Cancellation,
    ) -> Self {
        Self {
            essay,
            capabilities,
            essays,
            cancellation,
        }
    }

    /// Returns the essay id.
    #[must_use]
    pub fn id(&self) -> EssayId {
        self.essay.id
    }

    /// Returns the loaded essay without a capability check.
    #[must_use]
    pub fn essay(&self) -> &Essay {
        &self.essay
    }

    /// Returns the handle's capabilities.
    #[must_use]
    pub fn capabilities(&self) -> EssayCapabilities {
        self.capabilities
    }

    /// Reads the essay.
    pub fn read_view(&self) -> AppResult<&Essay> {
        self.require_read()?;
        Ok(&self.essay)
    }

    /// Deletes the essay.
    pub async fn delete(&self) -> AppResult<()> {
        self.cancellation
            .run(async {
                if !self.capabilities.delete {
                    return Err(AppError::permission_denied([Permission::DeleteEssay.as_str()]));
                }

                self.essays.delete_essay(self.essay.id).await?;
                info!(
                    essay_id = %self.essay.id,
                    subdiscepto = %self.essay.posted_in,
                    "essay deleted"
                );
                Ok(())
            })
            .await
    }

    /// Returns the vote `voter` currently holds on the essay.
    pub async fn user_vote(&self, voter: &UserHandle) -> AppResult<Option<VoteType>> {
        self.cancellation
            .run(async {
                self.require_read()?;
                voter.require_acting()?;
                self.essays.find_vote(voter.id(), self.essay.id).await
            })
            .await
    }

    pub(crate) fn require_read(&self) -> AppResult<()> {
        if self.capabilities.read {
            return Ok(());
        }

        Err(AppError::permission_denied([Permission::ReadSubdiscepto.as_str()]))
    }
}
