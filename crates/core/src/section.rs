use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::EntityKind;

/// Fixed home-page slots that the resolver fills.
///
/// The set is closed: per-section fallback behavior is compiled in via
/// [`Section::policy`] and is not admin editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    PopularCourses,
    RecommendedContents,
    UrgentJobs,
}

/// Per-section fallback query configuration.
///
/// `flag_filter` names a boolean column that must be set for a row to be
/// eligible (e.g. only active job postings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPolicy {
    pub table: &'static str,
    pub sort_column: &'static str,
    pub ascending: bool,
    pub flag_filter: Option<&'static str>,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::PopularCourses,
        Section::RecommendedContents,
        Section::UrgentJobs,
    ];

    /// Canonical name as stored in the database and used in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PopularCourses => "popular_courses",
            Self::RecommendedContents => "recommended_contents",
            Self::UrgentJobs => "urgent_jobs",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownSection> {
        match value {
            "popular_courses" => Ok(Self::PopularCourses),
            "recommended_contents" => Ok(Self::RecommendedContents),
            "urgent_jobs" => Ok(Self::UrgentJobs),
            other => Err(UnknownSection(other.to_string())),
        }
    }

    /// Kind of catalog entity this section displays.
    pub fn entity_kind(self) -> EntityKind {
        match self {
            Self::PopularCourses => EntityKind::Course,
            Self::RecommendedContents => EntityKind::Content,
            Self::UrgentJobs => EntityKind::Job,
        }
    }

    /// Number of items the home page renders for this section.
    pub fn home_limit(self) -> usize {
        match self {
            Self::PopularCourses => 6,
            Self::RecommendedContents => 6,
            Self::UrgentJobs => 5,
        }
    }

    /// Fallback ranking used when curation is absent or insufficient.
    pub fn policy(self) -> SectionPolicy {
        match self {
            Self::PopularCourses => SectionPolicy {
                table: "courses",
                sort_column: "rating",
                ascending: false,
                flag_filter: None,
            },
            Self::RecommendedContents => SectionPolicy {
                table: "contents",
                sort_column: "view_count",
                ascending: false,
                flag_filter: None,
            },
            Self::UrgentJobs => SectionPolicy {
                table: "job_postings",
                sort_column: "deadline",
                ascending: true,
                flag_filter: Some("is_active"),
            },
        }
    }
}

/// Error returned when a section name outside the fixed set is requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown section: {0}")]
pub struct UnknownSection(pub String);
