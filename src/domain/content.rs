use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_TITLE_LEN: usize = 80;
pub const MAX_BODY_LEN: usize = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Proposal,
    Debate,
    Comment,
}

impl ContentKind {
    /// Parse the plural segment used in routes (`/content/proposals`).
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "proposals" => Some(Self::Proposal),
            "debates" => Some(Self::Debate),
            "comments" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Proposal => "proposals",
            Self::Debate => "debates",
            Self::Comment => "comments",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "proposal" => Some(Self::Proposal),
            "debate" => Some(Self::Debate),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::Debate => "debate",
            Self::Comment => "comment",
        }
    }

    pub fn has_title(&self) -> bool {
        !matches!(self, Self::Comment)
    }
}

/// The proposal or debate a comment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commentable {
    pub kind: ContentKind,
    pub id: Uuid,
}

/// A flaggable piece of user content with its moderation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub kind: ContentKind,
    pub author_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentable: Option<Commentable>,
    pub flags_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub hidden_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ignored_flag_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub confirmed_hide_at: Option<OffsetDateTime>,
}

impl Content {
    /// Fresh, unmoderated content authored by `author_id`.
    pub fn new(kind: ContentKind, author_id: Uuid, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            author_id,
            title: None,
            summary: None,
            body: body.into(),
            commentable: None,
            flags_count: 0,
            created_at: OffsetDateTime::now_utc(),
            hidden_at: None,
            ignored_flag_at: None,
            confirmed_hide_at: None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_at.is_some()
    }

    pub fn has_ignored_flag(&self) -> bool {
        self.ignored_flag_at.is_some()
    }

    pub fn is_flagged(&self) -> bool {
        self.flags_count > 0
    }
}

/// Validation failures for submitted content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("title is required")]
    TitleRequired,
    #[error("title must be at most 80 characters")]
    TitleTooLong,
    #[error("comments do not have a title")]
    UnexpectedTitle,
    #[error("body is required")]
    BodyRequired,
    #[error("body must be at most 6000 characters")]
    BodyTooLong,
    #[error("comments must reference a proposal or debate")]
    CommentableRequired,
    #[error("only comments reference a commentable")]
    UnexpectedCommentable,
    #[error("commentable not found")]
    CommentableNotFound,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: String,
    pub commentable: Option<Commentable>,
}

impl NewContent {
    pub fn validate(&self, kind: ContentKind) -> Result<(), ContentError> {
        if kind.has_title() {
            let title = self.title.as_deref().map(str::trim).unwrap_or_default();
            if title.is_empty() {
                return Err(ContentError::TitleRequired);
            }
            if title.chars().count() > MAX_TITLE_LEN {
                return Err(ContentError::TitleTooLong);
            }
        } else if self.title.is_some() {
            return Err(ContentError::UnexpectedTitle);
        }

        if self.body.trim().is_empty() {
            return Err(ContentError::BodyRequired);
        }
        if self.body.chars().count() > MAX_BODY_LEN {
            return Err(ContentError::BodyTooLong);
        }

        match (kind, self.commentable) {
            (ContentKind::Comment, None) => Err(ContentError::CommentableRequired),
            (ContentKind::Comment, Some(target)) if target.kind == ContentKind::Comment => {
                Err(ContentError::CommentableRequired)
            }
            (ContentKind::Comment, Some(_)) => Ok(()),
            (_, Some(_)) => Err(ContentError::UnexpectedCommentable),
            (_, None) => Ok(()),
        }
    }

    pub fn into_content(self, kind: ContentKind, author_id: Uuid) -> Content {
        let mut content = Content::new(kind, author_id, self.body.trim());
        content.title = self.title.map(|title| title.trim().to_string());
        content.summary = if kind == ContentKind::Proposal {
            self.summary
        } else {
            None
        };
        content.commentable = self.commentable;
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(title: Option<&str>) -> NewContent {
        NewContent {
            title: title.map(str::to_string),
            summary: None,
            body: "Plant more trees along the river".to_string(),
            commentable: None,
        }
    }

    #[test]
    fn kinds_round_trip_through_paths_and_columns() {
        for kind in [ContentKind::Proposal, ContentKind::Debate, ContentKind::Comment] {
            assert_eq!(ContentKind::from_path(kind.as_path()), Some(kind));
            assert_eq!(ContentKind::from_db(kind.as_db()), Some(kind));
        }
        assert_eq!(ContentKind::from_path("users"), None);
    }

    #[test]
    fn proposals_need_a_title() {
        assert_eq!(proposal(None).validate(ContentKind::Proposal), Err(ContentError::TitleRequired));
        assert_eq!(proposal(Some("  ")).validate(ContentKind::Proposal), Err(ContentError::TitleRequired));
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            proposal(Some(&long)).validate(ContentKind::Debate),
            Err(ContentError::TitleTooLong)
        );
        assert!(proposal(Some("Trees")).validate(ContentKind::Proposal).is_ok());
    }

    #[test]
    fn comments_must_point_at_a_proposal_or_debate() {
        let mut comment = proposal(None);
        assert_eq!(comment.validate(ContentKind::Comment), Err(ContentError::CommentableRequired));

        comment.commentable = Some(Commentable { kind: ContentKind::Comment, id: Uuid::new_v4() });
        assert_eq!(comment.validate(ContentKind::Comment), Err(ContentError::CommentableRequired));

        comment.commentable = Some(Commentable { kind: ContentKind::Debate, id: Uuid::new_v4() });
        assert!(comment.validate(ContentKind::Comment).is_ok());
        assert_eq!(
            comment.validate(ContentKind::Debate),
            Err(ContentError::TitleRequired)
        );
    }

    #[test]
    fn summary_is_kept_for_proposals_only() {
        let mut new = proposal(Some("Trees"));
        new.summary = Some("Shade for everyone".to_string());
        let author = Uuid::new_v4();

        let content = new.clone().into_content(ContentKind::Proposal, author);
        assert_eq!(content.summary.as_deref(), Some("Shade for everyone"));
        assert_eq!(content.flags_count, 0);
        assert!(!content.is_hidden());

        let debate = new.into_content(ContentKind::Debate, author);
        assert_eq!(debate.summary, None);
    }
}
