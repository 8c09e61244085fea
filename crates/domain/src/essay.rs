//! Essays, replies, votes and reports.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use discepto_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{SubdisceptoName, UserId};

/// Maximum essay content length in characters.
pub const LIMIT_MAX_CONTENT_LEN: usize = 5000;

/// Maximum number of distinct tags on an essay.
pub const LIMIT_MAX_TAGS: usize = 10;

/// Identifier of an essay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EssayId(i32);

impl EssayId {
    /// Wraps a persisted essay id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for EssayId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Relation of a reply to its parent essay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyType {
    /// Plain reply.
    General,
    /// Reply in support of the parent thesis.
    Supports,
    /// Reply arguing against the parent thesis.
    Refutes,
    /// Reply correcting facts in the parent.
    Corrects,
}

impl ReplyType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Supports => "supports",
            Self::Refutes => "refutes",
            Self::Corrects => "corrects",
        }
    }
}

impl FromStr for ReplyType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "general" => Ok(Self::General),
            "supports" => Ok(Self::Supports),
            "refutes" => Ok(Self::Refutes),
            "corrects" => Ok(Self::Corrects),
            _ => Err(AppError::InvalidFormat(format!(
                "unknown reply type '{value}'"
            ))),
        }
    }
}

/// Essay submission as typed by the author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayDraft {
    /// One-line thesis.
    pub thesis: String,
    /// Body text.
    pub content: String,
    /// Free tags; duplicates are dropped.
    pub tags: Vec<String>,
}

/// Essay submission checked against the community's limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEssay {
    /// One-line thesis.
    pub thesis: NonEmptyString,
    /// Body text.
    pub content: String,
    /// Distinct tags in submission order.
    pub tags: Vec<String>,
}

impl EssayDraft {
    /// Checks thesis, content length against `[min_length, LIMIT_MAX_CONTENT_LEN]`
    /// and the tag limit.
    pub fn validate(self, min_length: i32) -> AppResult<ValidatedEssay> {
        let thesis = NonEmptyString::new(self.thesis.trim())?;

        let min = usize::try_from(min_length).unwrap_or(0);
        let length = self.content.chars().count();
        if length < min || length > LIMIT_MAX_CONTENT_LEN {
            return Err(AppError::BadContentLength {
                length,
                min,
                max: LIMIT_MAX_CONTENT_LEN,
            });
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim().to_owned();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.len() > LIMIT_MAX_TAGS {
            return Err(AppError::TooManyTags {
                count: tags.len(),
                max: LIMIT_MAX_TAGS,
            });
        }

        Ok(ValidatedEssay {
            thesis,
            content: self.content,
            tags,
        })
    }
}

/// Essay search over public communities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EssaySearch {
    /// Essays carrying at least one of the tags.
    Tags(Vec<String>),
    /// Essays whose thesis contains the text, ignoring case.
    Thesis(NonEmptyString),
}

impl EssaySearch {
    /// Builds a tag search. Tags are trimmed and de-duplicated; at least one
    /// and at most [`LIMIT_MAX_TAGS`] must remain.
    pub fn by_tags<I, S>(tags: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !distinct.iter().any(|seen| seen == tag) {
                distinct.push(tag.to_owned());
            }
        }

        if distinct.is_empty() {
            return Err(AppError::InvalidFormat(
                "search needs at least one tag".to_owned(),
            ));
        }
        if distinct.len() > LIMIT_MAX_TAGS {
            return Err(AppError::TooManyTags {
                count: distinct.len(),
                max: LIMIT_MAX_TAGS,
            });
        }

        Ok(Self::Tags(distinct))
    }

    /// Builds a thesis search over the trimmed text.
    pub fn by_thesis(text: &str) -> AppResult<Self> {
        Ok(Self::Thesis(NonEmptyString::new(text.trim())?))
    }

    /// Whether an essay matches, applying the same rules as the stores.
    #[must_use]
    pub fn matches(&self, essay: &Essay) -> bool {
        match self {
            Self::Tags(tags) => essay.tags.iter().any(|tag| tags.contains(tag)),
            Self::Thesis(text) => essay
                .thesis
                .to_lowercase()
                .contains(&text.as_str().to_lowercase()),
        }
    }
}

/// Parent link of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyLink {
    /// Parent essay.
    pub parent: EssayId,
    /// Relation to the parent.
    pub reply_type: ReplyType,
}

/// Persisted essay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Essay {
    /// Essay id.
    pub id: EssayId,
    /// One-line thesis.
    pub thesis: String,
    /// Body text.
    pub content: String,
    /// Author.
    pub attributed_to: UserId,
    /// Owning community.
    pub posted_in: SubdisceptoName,
    /// Publication time.
    pub published: DateTime<Utc>,
    /// Distinct tags.
    pub tags: Vec<String>,
    /// Parent link for replies.
    pub reply_to: Option<ReplyLink>,
    /// Sum of vote values.
    pub score: i64,
}

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteType {
    /// Counts +1.
    Upvote,
    /// Counts -1.
    Downvote,
}

impl VoteType {
    /// Returns the persisted vote value.
    #[must_use]
    pub fn value(&self) -> i16 {
        match self {
            Self::Upvote => 1,
            Self::Downvote => -1,
        }
    }

    /// Parses a persisted vote value.
    pub fn from_value(value: i16) -> AppResult<Self> {
        match value {
            1 => Ok(Self::Upvote),
            -1 => Ok(Self::Downvote),
            _ => Err(AppError::InvalidFormat(format!(
                "unknown vote value {value}"
            ))),
        }
    }
}

/// Identifier of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportId(i32);

impl ReportId {
    /// Wraps a persisted report id.
    #[must_use]
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Reason given for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// Offensive language.
    Offensive,
    /// Fabricated content.
    Fake,
    /// Spam.
    Spam,
    /// Factually inaccurate.
    Inaccurate,
}

impl FlagType {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offensive => "offensive",
            Self::Fake => "fake",
            Self::Spam => "spam",
            Self::Inaccurate => "inaccurate",
        }
    }
}

impl FromStr for FlagType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "offensive" => Ok(Self::Offensive),
            "fake" => Ok(Self::Fake),
            "spam" => Ok(Self::Spam),
            "inaccurate" => Ok(Self::Inaccurate),
            _ => Err(AppError::InvalidFormat(format!(
                "unknown report flag '{value}'"
            ))),
        }
    }
}

/// Persisted essay report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Report id.
    pub id: ReportId,
    /// Reason.
    pub flag: FlagType,
    /// Free text.
    pub description: String,
    /// Reported essay.
    pub essay_id: EssayId,
    /// Reporter.
    pub from_user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(content_len: usize, tags: &[&str]) -> EssayDraft {
        EssayDraft {
            thesis: "Cats are liquid".to_owned(),
            content: "x".repeat(content_len),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        }
    }

    #[test]
    fn content_length_is_bounded_by_community_and_global_limit() {
        assert!(draft(10, &[]).validate(10).is_ok());
        assert!(matches!(
            draft(9, &[]).validate(10),
            Err(AppError::BadContentLength { length: 9, min: 10, .. })
        ));
        assert!(matches!(
            draft(LIMIT_MAX_CONTENT_LEN + 1, &[]).validate(0),
            Err(AppError::BadContentLength { .. })
        ));
    }

    #[test]
    fn duplicate_tags_do_not_count_twice() {
        let tags = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "a", "b"];
        let validated = draft(10, &tags).validate(0);
        assert_eq!(validated.map(|essay| essay.tags.len()).ok(), Some(10));
    }

    #[test]
    fn eleven_distinct_tags_are_rejected() {
        let tags = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"];
        assert!(matches!(
            draft(10, &tags).validate(0),
            Err(AppError::TooManyTags { count: 11, max: 10 })
        ));
    }

    #[test]
    fn tag_search_needs_a_non_blank_tag() {
        assert!(matches!(
            EssaySearch::by_tags(["  ", ""]),
            Err(AppError::InvalidFormat(_))
        ));
        assert_eq!(
            EssaySearch::by_tags([" cats", "cats", "dogs "]).ok(),
            Some(EssaySearch::Tags(vec!["cats".to_owned(), "dogs".to_owned()]))
        );
    }

    #[test]
    fn thesis_search_ignores_case() {
        let Ok(search) = EssaySearch::by_thesis(" LIQUID ") else {
            panic!("thesis search should be valid");
        };
        let essay = Essay {
            id: EssayId::new(1),
            thesis: "Cats are liquid".to_owned(),
            content: String::new(),
            attributed_to: UserId::new(1),
            posted_in: match SubdisceptoName::new("cats") {
                Ok(name) => name,
                Err(error) => panic!("static name should be valid: {error}"),
            },
            published: Utc::now(),
            tags: vec!["physics".to_owned()],
            reply_to: None,
            score: 0,
        };

        assert!(search.matches(&essay));
        assert!(!EssaySearch::Tags(vec!["cats".to_owned()]).matches(&essay));
    }

    #[test]
    fn vote_values_roundtrip() {
        assert_eq!(VoteType::from_value(VoteType::Downvote.value()).ok(), Some(VoteType::Downvote));
        assert!(VoteType::from_value(0).is_err());
    }
}
