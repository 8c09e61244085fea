use async_trait::async_trait;

use discepto_core::AppResult;
use discepto_domain::{
    Essay, EssayId, EssaySearch, FlagType, ReplyLink, ReplyType, Report, ReportId,
    SubdisceptoName, UserId, ValidatedEssay, VoteType,
};

/// Input for essay creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEssay {
    /// Author.
    pub author: UserId,
    /// Owning community.
    pub posted_in: SubdisceptoName,
    /// Validated content.
    pub essay: ValidatedEssay,
    /// Parent link for replies.
    pub reply_to: Option<ReplyLink>,
}

/// Input for report creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    /// Reason.
    pub flag: FlagType,
    /// Free text.
    pub description: String,
    /// Reported essay.
    pub essay_id: EssayId,
    /// Reporter.
    pub from_user_id: UserId,
}

/// Repository port for essays, votes and reports.
#[async_trait]
pub trait EssayRepository: Send + Sync {
    /// Inserts an essay with its tags and reply link in one transaction.
    async fn create_essay(&self, essay: NewEssay) -> AppResult<Essay>;

    /// Loads an essay of a community. Fails with `NotFound` when absent.
    async fn find_essay(&self, subdiscepto: &SubdisceptoName, essay_id: EssayId)
    -> AppResult<Essay>;

    /// Lists the essays of a community, newest first.
    async fn list_essays(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Essay>>;

    /// Lists replies to an essay, optionally filtered by reply type.
    async fn list_replies(
        &self,
        parent: EssayId,
        reply_type: Option<ReplyType>,
    ) -> AppResult<Vec<Essay>>;

    /// Lists the essays posted in any of the communities, newest first.
    async fn list_recent_essays(&self, subdisceptos: &[SubdisceptoName]) -> AppResult<Vec<Essay>>;

    /// Lists the essays written by a user across every community, newest first.
    async fn list_user_essays(&self, author: UserId) -> AppResult<Vec<Essay>>;

    /// Searches essays posted in public communities, newest first.
    async fn search_public_essays(&self, search: &EssaySearch) -> AppResult<Vec<Essay>>;

    /// Deletes an essay.
    async fn delete_essay(&self, essay_id: EssayId) -> AppResult<()>;

    /// Returns the user's current vote on an essay, if any.
    async fn find_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<Option<VoteType>>;

    /// Records or replaces a user's vote on an essay.
    async fn upsert_vote(&self, user_id: UserId, essay_id: EssayId, vote: VoteType)
    -> AppResult<()>;

    /// Removes a user's vote on an essay.
    async fn delete_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<()>;

    /// Files a report.
    async fn create_report(&self, report: NewReport) -> AppResult<Report>;

    /// Lists reports on essays of a community.
    async fn list_reports(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Report>>;

    /// Deletes a report of a community. Fails with `NotFound` when absent.
    async fn delete_report(&self, subdiscepto: &SubdisceptoName, report_id: ReportId)
    -> AppResult<()>;
}
