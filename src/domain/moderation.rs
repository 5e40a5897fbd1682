use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::content::Content;

/// Which slice of the moderation queue a moderator is looking at.
///
/// Hidden content never appears under any filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationFilter {
    #[default]
    PendingFlagReview,
    All,
    WithIgnoredFlag,
}

impl ModerationFilter {
    /// Menu order; the first entry is the default.
    pub const MENU: [Self; 3] = [Self::PendingFlagReview, Self::All, Self::WithIgnoredFlag];

    /// Unknown or missing values fall back to the default filter.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("pending_flag_review") => Self::PendingFlagReview,
            Some("all") => Self::All,
            Some("with_ignored_flag") => Self::WithIgnoredFlag,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingFlagReview => "pending_flag_review",
            Self::All => "all",
            Self::WithIgnoredFlag => "with_ignored_flag",
        }
    }

    pub fn matches(&self, content: &Content) -> bool {
        if content.is_hidden() {
            return false;
        }
        match self {
            Self::All => true,
            Self::PendingFlagReview => content.is_flagged() && !content.has_ignored_flag(),
            Self::WithIgnoredFlag => content.has_ignored_flag(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationOrder {
    #[default]
    Flags,
    CreatedAt,
}

impl ModerationOrder {
    pub const MENU: [Self; 2] = [Self::Flags, Self::CreatedAt];

    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("flags") => Self::Flags,
            Some("created_at") => Self::CreatedAt,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flags => "flags",
            Self::CreatedAt => "created_at",
        }
    }

    /// Descending comparison; ties fall through to newer first, then id.
    pub fn compare(&self, a: &Content, b: &Content) -> Ordering {
        let newest_first = b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id));
        match self {
            Self::Flags => b.flags_count.cmp(&a.flags_count).then(newest_first),
            Self::CreatedAt => newest_first,
        }
    }
}

/// Filter, order and page of the moderation listing. These travel through
/// every URL the listing hands out so a moderator lands back where they were.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingParams {
    pub filter: ModerationFilter,
    pub order: ModerationOrder,
    pub page: u32,
}

impl ListingParams {
    pub fn from_query(filter: Option<&str>, order: Option<&str>, page: Option<&str>) -> Self {
        Self {
            filter: ModerationFilter::parse(filter),
            order: ModerationOrder::parse(order),
            page: parse_page(page),
        }
    }

    pub fn offset(&self, per_page: i64) -> i64 {
        i64::from(self.page.max(1) - 1) * per_page
    }

    /// Switching filter starts over at the first page.
    pub fn with_filter(self, filter: ModerationFilter) -> Self {
        Self { filter, page: 1, ..self }
    }

    pub fn with_order(self, order: ModerationOrder) -> Self {
        Self { order, page: 1, ..self }
    }

    pub fn with_page(self, page: u32) -> Self {
        Self { page: page.max(1), ..self }
    }

    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("filter", self.filter.as_str())
            .append_pair("order", self.order.as_str())
            .append_pair("page", &self.page.max(1).to_string())
            .finish()
    }
}

/// Pages are 1-based; anything unparsable or zero means the first page.
pub fn parse_page(value: Option<&str>) -> u32 {
    value
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Hide,
    BlockAuthors,
    /// "Mark as viewed".
    IgnoreFlag,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::BlockAuthors => "block_authors",
            Self::IgnoreFlag => "ignore_flag",
        }
    }

    pub fn hides_content(&self) -> bool {
        matches!(self, Self::Hide | Self::BlockAuthors)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub affected: u64,
    pub blocked_authors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlagOutcome {
    Flagged { flags_count: i32 },
    AlreadyFlagged { flags_count: i32 },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ModerationPage {
    pub items: Vec<Content>,
    pub total: i64,
}
