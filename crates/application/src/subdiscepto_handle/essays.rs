use tracing::{info, warn};

use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Essay, EssayDraft, EssayId, Notification, Permission, ReplyLink, ReplyType, UserId,
    VoteType,
};

use crate::{EssayCapabilities, EssayHandle, NewEssay, UserHandle};

use super::SubdisceptoHandle;

impl SubdisceptoHandle {
    /// Posts an essay on behalf of `author`.
    pub async fn create_essay(
        &self,
        author: &UserHandle,
        draft: EssayDraft,
    ) -> AppResult<EssayHandle> {
        self.cancellation
            .run(self.insert_essay(author, draft, None))
            .await
    }

    /// Posts a reply to `parent` and notifies the parent's author.
    pub async fn create_essay_reply(
        &self,
        author: &UserHandle,
        draft: EssayDraft,
        parent: &EssayHandle,
        reply_type: ReplyType,
    ) -> AppResult<EssayHandle> {
        self.cancellation
            .run(async {
                self.require_local(parent)?;
                parent.require_read()?;

                let link = ReplyLink {
                    parent: parent.id(),
                    reply_type,
                };
                let reply = self.insert_essay(author, draft, Some(link)).await?;

                let parent_author = parent.essay().attributed_to;
                if parent_author != author.id() {
                    self.notify(
                        Notification::essay_reply(
                            &author.user().name,
                            &self.subdiscepto.name,
                            reply.id(),
                        ),
                        parent_author,
                    )
                    .await;
                }

                Ok(reply)
            })
            .await
    }

    /// Resolves the handle of an essay posted in this community.
    pub async fn essay_handle(&self, essay_id: EssayId) -> AppResult<EssayHandle> {
        self.cancellation
            .run(async {
                let essay = self
                    .ports
                    .essays
                    .find_essay(&self.subdiscepto.name, essay_id)
                    .await?;
                let handle = self.bind_essay(essay);
                handle.require_read()?;
                Ok(handle)
            })
            .await
    }

    /// Lists the essays of this community.
    pub async fn list_essays(&self) -> AppResult<Vec<Essay>> {
        self.cancellation
            .run(async {
                self.permissions.require(&[Permission::ReadSubdiscepto])?;
                self.ports.essays.list_essays(&self.subdiscepto.name).await
            })
            .await
    }

    /// Lists replies to an essay, optionally of one reply type.
    pub async fn list_replies(
        &self,
        parent: &EssayHandle,
        reply_type: Option<ReplyType>,
    ) -> AppResult<Vec<Essay>> {
        self.cancellation
            .run(async {
                self.require_local(parent)?;
                parent.require_read()?;
                self.ports
                    .essays
                    .list_replies(parent.id(), reply_type)
                    .await
            })
            .await
    }

    /// Casts or replaces a vote. Requires the global `create_vote` grant.
    pub async fn create_vote(
        &self,
        essay: &EssayHandle,
        voter: &UserHandle,
        vote: VoteType,
    ) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.global_permissions.require(&[Permission::CreateVote])?;
                voter.require_acting()?;
                self.require_local(essay)?;
                essay.require_read()?;

                self.ports
                    .essays
                    .upsert_vote(voter.id(), essay.id(), vote)
                    .await?;

                let author = essay.essay().attributed_to;
                if vote == VoteType::Upvote && author != voter.id() {
                    self.notify(
                        Notification::essay_upvote(
                            &voter.user().name,
                            &self.subdiscepto.name,
                            essay.id(),
                        ),
                        author,
                    )
                    .await;
                }
                Ok(())
            })
            .await
    }

    /// Withdraws a vote. Requires the global `delete_vote` grant.
    pub async fn delete_vote(&self, essay: &EssayHandle, voter: &UserHandle) -> AppResult<()> {
        self.cancellation
            .run(async {
                self.global_permissions.require(&[Permission::DeleteVote])?;
                voter.require_acting()?;
                self.require_local(essay)?;
                self.ports.essays.delete_vote(voter.id(), essay.id()).await
            })
            .await
    }

    async fn insert_essay(
        &self,
        author: &UserHandle,
        draft: EssayDraft,
        reply_to: Option<ReplyLink>,
    ) -> AppResult<EssayHandle> {
        self.permissions.require(&[Permission::CreateEssay])?;
        author.require_acting()?;
        let essay = draft.validate(self.subdiscepto.min_length)?;

        let created = self
            .ports
            .essays
            .create_essay(NewEssay {
                author: author.id(),
                posted_in: self.subdiscepto.name.clone(),
                essay,
                reply_to,
            })
            .await?;
        info!(
            subdiscepto = %self.subdiscepto.name,
            essay_id = %created.id,
            author = %author.id(),
            "essay created"
        );

        Ok(self.bind_essay(created))
    }

    // Delivery failures are logged; the essay or vote is already committed.
    async fn notify(&self, notification: Notification, to_user: UserId) {
        if let Err(error) = self.ports.notifications.send(notification, to_user).await {
            warn!(%to_user, %error, "failed to deliver notification");
        }
    }

    fn bind_essay(&self, essay: Essay) -> EssayHandle {
        let capabilities =
            EssayCapabilities::derive(&self.permissions, self.acting_user_id(), &essay);
        EssayHandle::new(
            essay,
            capabilities,
            self.ports.essays.clone(),
            self.cancellation.clone(),
        )
    }

    pub(super) fn require_local(&self, essay: &EssayHandle) -> AppResult<()> {
        if essay.essay().posted_in == self.subdiscepto.name {
            return Ok(());
        }

        Err(AppError::NotFound(format!(
            "essay {} in subdiscepto '{}'",
            essay.id(),
            self.subdiscepto.name
        )))
    }
}
