use chrono::Utc;

use discepto_application::{EssayRepository, NewEssay, NewReport, NotificationService};
use discepto_domain::{EssaySearch, NotificationView, ReplyType};

use super::*;

impl StoreState {
    pub(super) fn delete_essay(&mut self, essay_id: EssayId) {
        self.essays.remove(&essay_id);
        for essay in self.essays.values_mut() {
            if essay
                .reply_to
                .is_some_and(|link| link.parent == essay_id)
            {
                essay.reply_to = None;
            }
        }
        self.votes.retain(|(_, voted), _| *voted != essay_id);
        self.reports.retain(|_, report| report.essay_id != essay_id);
    }

    fn scored(&self, essay: &Essay) -> Essay {
        let score = self
            .votes
            .iter()
            .filter(|((_, voted), _)| *voted == essay.id)
            .map(|(_, vote)| i64::from(vote.value()))
            .sum();

        Essay {
            score,
            ..essay.clone()
        }
    }

    // Ids grow with publication time, so reverse id order is newest first.
    fn newest_where(&self, keep: impl Fn(&Essay) -> bool) -> Vec<Essay> {
        self.essays
            .values()
            .rev()
            .filter(|essay| keep(essay))
            .map(|essay| self.scored(essay))
            .collect()
    }

    fn is_public(&self, subdiscepto: &SubdisceptoName) -> bool {
        self.subdisceptos
            .get(subdiscepto)
            .is_some_and(|subdiscepto| subdiscepto.public)
    }

    fn essay_in(&self, subdiscepto: &SubdisceptoName, essay_id: EssayId) -> Option<&Essay> {
        self.essays
            .get(&essay_id)
            .filter(|essay| essay.posted_in == *subdiscepto)
    }
}

#[async_trait]
impl EssayRepository for InMemoryDisceptoStore {
    async fn create_essay(&self, essay: NewEssay) -> AppResult<Essay> {
        self.write(|state| {
            if !state.subdisceptos.contains_key(&essay.posted_in) {
                return Err(AppError::NotFound(format!(
                    "subdiscepto '{}'",
                    essay.posted_in
                )));
            }
            if let Some(link) = essay.reply_to
                && !state.essays.contains_key(&link.parent)
            {
                return Err(AppError::NotFound(format!("essay {}", link.parent)));
            }

            let mut tags = essay.essay.tags;
            tags.sort();
            let created = Essay {
                id: EssayId::new(state.next_id()),
                thesis: essay.essay.thesis.as_str().to_owned(),
                content: essay.essay.content,
                attributed_to: essay.author,
                posted_in: essay.posted_in,
                published: Utc::now(),
                tags,
                reply_to: essay.reply_to,
                score: 0,
            };
            state.essays.insert(created.id, created.clone());
            Ok(created)
        })
        .await
    }

    async fn find_essay(
        &self,
        subdiscepto: &SubdisceptoName,
        essay_id: EssayId,
    ) -> AppResult<Essay> {
        self.read(|state| {
            state
                .essay_in(subdiscepto, essay_id)
                .map(|essay| state.scored(essay))
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "essay {essay_id} in subdiscepto '{subdiscepto}'"
                    ))
                })
        })
        .await
    }

    async fn list_essays(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Essay>> {
        self.read(|state| Ok(state.newest_where(|essay| essay.posted_in == *subdiscepto)))
            .await
    }

    async fn list_recent_essays(&self, subdisceptos: &[SubdisceptoName]) -> AppResult<Vec<Essay>> {
        self.read(|state| Ok(state.newest_where(|essay| subdisceptos.contains(&essay.posted_in))))
            .await
    }

    async fn list_user_essays(&self, author: UserId) -> AppResult<Vec<Essay>> {
        self.read(|state| Ok(state.newest_where(|essay| essay.attributed_to == author)))
            .await
    }

    async fn search_public_essays(&self, search: &EssaySearch) -> AppResult<Vec<Essay>> {
        self.read(|state| {
            Ok(state.newest_where(|essay| {
                state.is_public(&essay.posted_in) && search.matches(essay)
            }))
        })
        .await
    }

    async fn list_replies(
        &self,
        parent: EssayId,
        reply_type: Option<ReplyType>,
    ) -> AppResult<Vec<Essay>> {
        self.read(|state| {
            Ok(state
                .essays
                .values()
                .filter(|essay| {
                    essay.reply_to.is_some_and(|link| {
                        link.parent == parent
                            && reply_type.is_none_or(|wanted| wanted == link.reply_type)
                    })
                })
                .map(|essay| state.scored(essay))
                .collect())
        })
        .await
    }

    async fn delete_essay(&self, essay_id: EssayId) -> AppResult<()> {
        self.write(|state| {
            if !state.essays.contains_key(&essay_id) {
                return Err(AppError::NotFound(format!("essay {essay_id}")));
            }

            state.delete_essay(essay_id);
            Ok(())
        })
        .await
    }

    async fn upsert_vote(
        &self,
        user_id: UserId,
        essay_id: EssayId,
        vote: VoteType,
    ) -> AppResult<()> {
        self.write(|state| {
            if !state.essays.contains_key(&essay_id) {
                return Err(AppError::NotFound(format!("essay {essay_id}")));
            }

            state.votes.insert((user_id, essay_id), vote);
            Ok(())
        })
        .await
    }

    async fn find_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<Option<VoteType>> {
        self.read(|state| Ok(state.votes.get(&(user_id, essay_id)).copied()))
            .await
    }

    async fn delete_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<()> {
        self.write(|state| {
            state.votes.remove(&(user_id, essay_id));
            Ok(())
        })
        .await
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        self.write(|state| {
            if !state.essays.contains_key(&report.essay_id) {
                return Err(AppError::NotFound(format!("essay {}", report.essay_id)));
            }

            let created = Report {
                id: ReportId::new(state.next_id()),
                flag: report.flag,
                description: report.description,
                essay_id: report.essay_id,
                from_user_id: report.from_user_id,
            };
            state.reports.insert(created.id, created.clone());
            Ok(created)
        })
        .await
    }

    async fn list_reports(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Report>> {
        self.read(|state| {
            Ok(state
                .reports
                .values()
                .filter(|report| state.essay_in(subdiscepto, report.essay_id).is_some())
                .cloned()
                .collect())
        })
        .await
    }

    async fn delete_report(
        &self,
        subdiscepto: &SubdisceptoName,
        report_id: ReportId,
    ) -> AppResult<()> {
        self.write(|state| {
            let owned = state
                .reports
                .get(&report_id)
                .is_some_and(|report| state.essay_in(subdiscepto, report.essay_id).is_some());
            if !owned {
                return Err(AppError::NotFound(format!(
                    "report {report_id} in subdiscepto '{subdiscepto}'"
                )));
            }

            state.reports.remove(&report_id);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl NotificationService for InMemoryDisceptoStore {
    async fn send(&self, notification: Notification, to_user: UserId) -> AppResult<()> {
        self.write(|state| {
            if !state.users.contains_key(&to_user) {
                return Err(AppError::NotFound(format!("user {to_user}")));
            }

            let id = NotificationId::new(state.next_id());
            state.notifications.insert(id, (to_user, notification));
            Ok(())
        })
        .await
    }

    async fn list(&self, user_id: UserId) -> AppResult<Vec<NotificationView>> {
        self.read(|state| {
            Ok(state
                .notifications
                .iter()
                .rev()
                .filter(|(_, (recipient, _))| *recipient == user_id)
                .map(|(id, (_, notification))| NotificationView {
                    id: *id,
                    notification: notification.clone(),
                })
                .collect())
        })
        .await
    }

    async fn delete(&self, user_id: UserId, notification_id: NotificationId) -> AppResult<()> {
        self.write(|state| {
            let owned = state
                .notifications
                .get(&notification_id)
                .is_some_and(|(recipient, _)| *recipient == user_id);
            if !owned {
                return Err(AppError::NotFound(format!(
                    "notification {notification_id}"
                )));
            }

            state.notifications.remove(&notification_id);
            Ok(())
        })
        .await
    }
}
