//! PostgreSQL-backed essay, vote and report repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use sqlx::{FromRow, PgPool};

use discepto_application::{EssayRepository, NewEssay, NewReport};
use discepto_core::{AppError, AppResult};
use discepto_domain::{
    Essay, EssayId, EssaySearch, FlagType, ReplyLink, ReplyType, Report, ReportId,
    SubdisceptoName, UserId, VoteType,
};

use crate::transaction::{Executor, exec_tx};

const ESSAY_COLUMNS: &str = r#"
    SELECT
        essays.id,
        essays.thesis,
        essays.content,
        essays.attributed_to_id,
        essays.posted_in,
        essays.published,
        COALESCE(
            (SELECT ARRAY_AGG(tag ORDER BY tag) FROM essay_tags WHERE essay_id = essays.id),
            ARRAY[]::TEXT[]
        ) AS tags,
        essay_replies.to_id AS reply_to_id,
        essay_replies.reply_type,
        COALESCE((SELECT SUM(vote_type) FROM votes WHERE essay_id = essays.id), 0)::BIGINT AS score
    FROM essays
    LEFT JOIN essay_replies ON essay_replies.from_id = essays.id
"#;

const NEWEST_FIRST: &str = "ORDER BY essays.published DESC, essays.id DESC";

/// PostgreSQL implementation of the essay repository port.
#[derive(Clone)]
pub struct PostgresEssayRepository {
    pool: PgPool,
}

impl PostgresEssayRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EssayRow {
    id: i32,
    thesis: String,
    content: String,
    attributed_to_id: i32,
    posted_in: String,
    published: DateTime<Utc>,
    tags: Vec<String>,
    reply_to_id: Option<i32>,
    reply_type: Option<String>,
    score: i64,
}

impl TryFrom<EssayRow> for Essay {
    type Error = AppError;

    fn try_from(row: EssayRow) -> Result<Self, Self::Error> {
        let reply_to = match (row.reply_to_id, row.reply_type) {
            (Some(parent), Some(reply_type)) => Some(ReplyLink {
                parent: EssayId::new(parent),
                reply_type: reply_type.parse::<ReplyType>().map_err(|error| {
                    AppError::Internal(format!("corrupted reply type: {error}"))
                })?,
            }),
            _ => None,
        };

        Ok(Self {
            id: EssayId::new(row.id),
            thesis: row.thesis,
            content: row.content,
            attributed_to: UserId::new(row.attributed_to_id),
            posted_in: SubdisceptoName::new(row.posted_in).map_err(|error| {
                AppError::Internal(format!("corrupted subdiscepto name: {error}"))
            })?,
            published: row.published,
            tags: row.tags,
            reply_to,
            score: row.score,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: i32,
    flag: String,
    description: String,
    essay_id: i32,
    from_user_id: i32,
}

impl TryFrom<ReportRow> for Report {
    type Error = AppError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReportId::new(row.id),
            flag: row
                .flag
                .parse::<FlagType>()
                .map_err(|error| AppError::Internal(format!("corrupted report flag: {error}")))?,
            description: row.description,
            essay_id: EssayId::new(row.essay_id),
            from_user_id: UserId::new(row.from_user_id),
        })
    }
}

fn essays_from_rows(rows: Vec<EssayRow>) -> AppResult<Vec<Essay>> {
    rows.into_iter().map(Essay::try_from).collect()
}

/// Escapes `LIKE` wildcards so the pattern matches the text literally.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for character in text.chars() {
        if matches!(character, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl EssayRepository for PostgresEssayRepository {
    async fn create_essay(&self, essay: NewEssay) -> AppResult<Essay> {
        exec_tx(Executor::Pool(&self.pool), move |connection| {
            async move {
                let NewEssay {
                    author,
                    posted_in,
                    essay,
                    reply_to,
                } = essay;

                let (id, published) = sqlx::query_as::<_, (i32, DateTime<Utc>)>(
                    r#"
                    INSERT INTO essays (thesis, content, attributed_to_id, posted_in)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, published
                    "#,
                )
                .bind(essay.thesis.as_str())
                .bind(&essay.content)
                .bind(author.as_i32())
                .bind(posted_in.as_str())
                .fetch_one(&mut *connection)
                .await
                .map_err(|error| AppError::Internal(format!("failed to create essay: {error}")))?;

                sqlx::query(
                    r#"
                    INSERT INTO essay_tags (essay_id, tag)
                    SELECT $1, tag
                    FROM UNNEST($2::TEXT[]) AS tag
                    "#,
                )
                .bind(id)
                .bind(&essay.tags)
                .execute(&mut *connection)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to tag essay {id}: {error}"))
                })?;

                if let Some(link) = reply_to {
                    sqlx::query(
                        r#"
                        INSERT INTO essay_replies (from_id, to_id, reply_type)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(id)
                    .bind(link.parent.as_i32())
                    .bind(link.reply_type.as_str())
                    .execute(&mut *connection)
                    .await
                    .map_err(|error| {
                        AppError::Internal(format!(
                            "failed to link essay {id} to {}: {error}",
                            link.parent
                        ))
                    })?;
                }

                let mut tags = essay.tags;
                tags.sort();
                Ok(Essay {
                    id: EssayId::new(id),
                    thesis: essay.thesis.as_str().to_owned(),
                    content: essay.content,
                    attributed_to: author,
                    posted_in,
                    published,
                    tags,
                    reply_to,
                    score: 0,
                })
            }
            .boxed()
        })
        .await
    }

    async fn find_essay(
        &self,
        subdiscepto: &SubdisceptoName,
        essay_id: EssayId,
    ) -> AppResult<Essay> {
        let query = format!("{ESSAY_COLUMNS} WHERE essays.id = $1 AND essays.posted_in = $2");
        let row = sqlx::query_as::<_, EssayRow>(&query)
            .bind(essay_id.as_i32())
            .bind(subdiscepto.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to find essay {essay_id}: {error}"))
            })?
            .ok_or_else(|| {
                AppError::NotFound(format!("essay {essay_id} in subdiscepto '{subdiscepto}'"))
            })?;

        Essay::try_from(row)
    }

    async fn list_essays(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Essay>> {
        let query = format!("{ESSAY_COLUMNS} WHERE essays.posted_in = $1 {NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, EssayRow>(&query)
            .bind(subdiscepto.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to list essays of '{subdiscepto}': {error}"
                ))
            })?;

        essays_from_rows(rows)
    }

    async fn list_recent_essays(&self, subdisceptos: &[SubdisceptoName]) -> AppResult<Vec<Essay>> {
        let names: Vec<&str> = subdisceptos.iter().map(SubdisceptoName::as_str).collect();
        let query = format!("{ESSAY_COLUMNS} WHERE essays.posted_in = ANY($1) {NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, EssayRow>(&query)
            .bind(&names)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list recent essays: {error}")))?;

        essays_from_rows(rows)
    }

    async fn list_user_essays(&self, author: UserId) -> AppResult<Vec<Essay>> {
        let query = format!("{ESSAY_COLUMNS} WHERE essays.attributed_to_id = $1 {NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, EssayRow>(&query)
            .bind(author.as_i32())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list essays of user {author}: {error}"))
            })?;

        essays_from_rows(rows)
    }

    async fn search_public_essays(&self, search: &EssaySearch) -> AppResult<Vec<Essay>> {
        let public = "essays.posted_in IN (SELECT name FROM subdisceptos WHERE public)";
        let rows = match search {
            EssaySearch::Tags(tags) => {
                let query = format!(
                    "{ESSAY_COLUMNS} WHERE {public} \
                     AND EXISTS (SELECT 1 FROM essay_tags \
                         WHERE essay_tags.essay_id = essays.id AND essay_tags.tag = ANY($1)) \
                     {NEWEST_FIRST}"
                );
                sqlx::query_as::<_, EssayRow>(&query)
                    .bind(tags)
                    .fetch_all(&self.pool)
                    .await
            }
            EssaySearch::Thesis(text) => {
                let query = format!(
                    "{ESSAY_COLUMNS} WHERE {public} AND essays.thesis ILIKE $1 ESCAPE '\\' \
                     {NEWEST_FIRST}"
                );
                sqlx::query_as::<_, EssayRow>(&query)
                    .bind(like_pattern(text.as_str()))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|error| AppError::Internal(format!("failed to search essays: {error}")))?;

        essays_from_rows(rows)
    }

    async fn list_replies(
        &self,
        parent: EssayId,
        reply_type: Option<ReplyType>,
    ) -> AppResult<Vec<Essay>> {
        let query = format!(
            "{ESSAY_COLUMNS} WHERE essay_replies.to_id = $1 \
             AND ($2::TEXT IS NULL OR essay_replies.reply_type = $2) \
             ORDER BY essays.published, essays.id"
        );
        let rows = sqlx::query_as::<_, EssayRow>(&query)
            .bind(parent.as_i32())
            .bind(reply_type.map(|reply_type| reply_type.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list replies to {parent}: {error}"))
            })?;

        essays_from_rows(rows)
    }

    async fn delete_essay(&self, essay_id: EssayId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM essays WHERE id = $1")
            .bind(essay_id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete essay {essay_id}: {error}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("essay {essay_id}")));
        }

        Ok(())
    }

    async fn upsert_vote(
        &self,
        user_id: UserId,
        essay_id: EssayId,
        vote: VoteType,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO votes (user_id, essay_id, vote_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, essay_id)
            DO UPDATE SET vote_type = EXCLUDED.vote_type
            "#,
        )
        .bind(user_id.as_i32())
        .bind(essay_id.as_i32())
        .bind(vote.value())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record vote of user {user_id} on essay {essay_id}: {error}"
            ))
        })?;

        Ok(())
    }

    async fn find_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<Option<VoteType>> {
        sqlx::query_scalar::<_, i16>(
            "SELECT vote_type FROM votes WHERE user_id = $1 AND essay_id = $2",
        )
        .bind(user_id.as_i32())
        .bind(essay_id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find vote of user {user_id} on essay {essay_id}: {error}"
            ))
        })?
        .map(VoteType::from_value)
        .transpose()
    }

    async fn delete_vote(&self, user_id: UserId, essay_id: EssayId) -> AppResult<()> {
        sqlx::query("DELETE FROM votes WHERE user_id = $1 AND essay_id = $2")
            .bind(user_id.as_i32())
            .bind(essay_id.as_i32())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to delete vote of user {user_id} on essay {essay_id}: {error}"
                ))
            })?;

        Ok(())
    }

    async fn create_report(&self, report: NewReport) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            INSERT INTO reports (flag, description, essay_id, from_user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, flag, description, essay_id, from_user_id
            "#,
        )
        .bind(report.flag.as_str())
        .bind(&report.description)
        .bind(report.essay_id.as_i32())
        .bind(report.from_user_id.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create report: {error}")))?;

        Report::try_from(row)
    }

    async fn list_reports(&self, subdiscepto: &SubdisceptoName) -> AppResult<Vec<Report>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT
                reports.id,
                reports.flag,
                reports.description,
                reports.essay_id,
                reports.from_user_id
            FROM reports
            INNER JOIN essays ON essays.id = reports.essay_id
            WHERE essays.posted_in = $1
            ORDER BY reports.id
            "#,
        )
        .bind(subdiscepto.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list reports of '{subdiscepto}': {error}"
            ))
        })?;

        rows.into_iter().map(Report::try_from).collect()
    }

    async fn delete_report(
        &self,
        subdiscepto: &SubdisceptoName,
        report_id: ReportId,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM reports
            USING essays
            WHERE reports.id = $2
              AND essays.id = reports.essay_id
              AND essays.posted_in = $1
            "#,
        )
        .bind(subdiscepto.as_str())
        .bind(report_id.as_i32())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete report {report_id}: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "report {report_id} in subdiscepto '{subdiscepto}'"
            )));
        }

        Ok(())
    }
}
