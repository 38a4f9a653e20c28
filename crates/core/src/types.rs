use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::section::Section;

/// Kind of catalog entity a section or reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Course,
    Content,
    Job,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Content => "content",
            Self::Job => "job",
        }
    }
}

/// Reference from a curation override to exactly one catalog entity.
///
/// The tagged representation makes the "exactly one reference set"
/// invariant structural; the storage layer maps it onto the legacy
/// three-nullable-column shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Course(String),
    Content(String),
    Job(String),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Course(_) => EntityKind::Course,
            Self::Content(_) => EntityKind::Content,
            Self::Job(_) => EntityKind::Job,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Self::Course(id) | Self::Content(id) | Self::Job(id) => id,
        }
    }
}

/// Admin-curated pinning of an entity into a section slot.
///
/// `display_order` ties are legal and resolved by insertion order; gaps are
/// legal too. Inactive items are skipped during resolution but kept for the
/// admin listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedItem {
    pub id: String,
    pub section: Section,
    pub entity: EntityRef,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course as displayed in home-page cards and the admin picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub instructor_name: String,
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub price: i64,
    pub rating: f64,
    pub review_count: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Editorial content card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub author_name: String,
    pub category: String,
    pub thumbnail_url: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub published_at: DateTime<Utc>,
}

/// Job posting card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub company_name: String,
    pub title: String,
    pub job_type: String,
    pub location: Option<String>,
    pub deadline: DateTime<Utc>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Home-page hero banner, shown above the featured sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroBanner {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
}

/// A resolved entity in a section's output, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeaturedEntity {
    Course(Course),
    Content(Content),
    Job(JobPosting),
}

impl FeaturedEntity {
    pub fn entity_id(&self) -> &str {
        match self {
            Self::Course(course) => &course.id,
            Self::Content(content) => &content.id,
            Self::Job(job) => &job.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Course(_) => EntityKind::Course,
            Self::Content(_) => EntityKind::Content,
            Self::Job(_) => EntityKind::Job,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Course(course) => &course.title,
            Self::Content(content) => &content.title,
            Self::Job(job) => &job.title,
        }
    }
}
