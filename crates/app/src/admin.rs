use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use jobdeck_core::types::{EntityKind, EntityRef, FeaturedItem};
use jobdeck_core::Section;
use jobdeck_storage::{CatalogError, CatalogSummary, FeaturedError, FeaturedItemUpsert};

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Full management view for the admin featured-items screen: every
/// override per section (inactive and orphaned included) plus the catalog
/// pickers used to add new ones.
#[derive(Debug, Serialize)]
pub struct FeaturedOverview {
    pub sections: Vec<SectionOverview>,
    pub pickers: Pickers,
}

#[derive(Debug, Serialize)]
pub struct SectionOverview {
    pub section: Section,
    pub items: Vec<AdminFeaturedItem>,
}

#[derive(Debug, Serialize)]
pub struct AdminFeaturedItem {
    pub id: String,
    pub entity: EntityRef,
    pub display_order: i64,
    pub is_active: bool,
    /// `None` when the referenced catalog entity has been deleted; the
    /// admin screen shows such rows as "(deleted)" instead of hiding them.
    pub title: Option<String>,
    pub orphaned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Pickers {
    pub courses: Vec<PickerEntry>,
    pub contents: Vec<PickerEntry>,
    pub jobs: Vec<PickerEntry>,
}

#[derive(Debug, Serialize)]
pub struct PickerEntry {
    pub id: String,
    pub title: String,
}

pub async fn list_featured(
    State(state): State<AppState>,
) -> Result<Json<FeaturedOverview>, ProblemResponse> {
    let featured = state.storage().featured();
    let catalog = state.storage().catalog();

    let (items, courses, contents, jobs) = tokio::join!(
        featured.list_all(),
        catalog.course_summaries(),
        catalog.content_summaries(),
        catalog.job_summaries(),
    );
    let items = items.map_err(featured_problem)?;
    let courses = courses.map_err(catalog_problem)?;
    let contents = contents.map_err(catalog_problem)?;
    let jobs = jobs.map_err(catalog_problem)?;

    let mut titles: HashMap<(EntityKind, &str), &str> = HashMap::new();
    for (kind, summaries) in [
        (EntityKind::Course, &courses),
        (EntityKind::Content, &contents),
        (EntityKind::Job, &jobs),
    ] {
        for summary in summaries {
            titles.insert((kind, summary.id.as_str()), summary.title.as_str());
        }
    }

    let sections = Section::ALL
        .iter()
        .map(|&section| SectionOverview {
            section,
            items: items
                .iter()
                .filter(|item| item.section == section)
                .map(|item| {
                    let title = titles
                        .get(&(item.entity.kind(), item.entity.entity_id()))
                        .map(|title| title.to_string());
                    AdminFeaturedItem {
                        id: item.id.clone(),
                        entity: item.entity.clone(),
                        display_order: item.display_order,
                        is_active: item.is_active,
                        orphaned: title.is_none(),
                        title,
                        created_at: item.created_at,
                        updated_at: item.updated_at,
                    }
                })
                .collect(),
        })
        .collect();

    Ok(Json(FeaturedOverview {
        sections,
        pickers: Pickers {
            courses: picker_entries(courses),
            contents: picker_entries(contents),
            jobs: picker_entries(jobs),
        },
    }))
}

fn picker_entries(summaries: Vec<CatalogSummary>) -> Vec<PickerEntry> {
    summaries
        .into_iter()
        .map(|summary| PickerEntry {
            id: summary.id,
            title: summary.title,
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct UpsertFeaturedRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub section: Section,
    pub entity: EntityRef,
    pub display_order: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn upsert_featured(
    State(state): State<AppState>,
    Json(request): Json<UpsertFeaturedRequest>,
) -> Result<(StatusCode, Json<FeaturedItem>), ProblemResponse> {
    let creating = request.id.is_none();
    let item = state
        .storage()
        .featured()
        .upsert(
            FeaturedItemUpsert {
                id: request.id,
                section: request.section,
                entity: request.entity,
                display_order: request.display_order,
                is_active: request.is_active,
            },
            state.now(),
        )
        .await
        .map_err(featured_problem)?;

    counter!("featured_admin_mutations_total", "op" => "upsert").increment(1);
    let status = if creating {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(item)))
}

pub async fn delete_featured(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ProblemResponse> {
    state
        .storage()
        .featured()
        .delete(&id)
        .await
        .map_err(featured_problem)?;

    counter!("featured_admin_mutations_total", "op" => "delete").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

fn featured_problem(err: FeaturedError) -> ProblemResponse {
    match err {
        FeaturedError::NotFound => {
            ProblemResponse::not_found("featured_item_not_found", "featured item not found")
        }
        err @ (FeaturedError::SectionMismatch { .. } | FeaturedError::InvalidDisplayOrder(_)) => {
            ProblemResponse::unprocessable("invalid_featured_item", err.to_string())
        }
        err => {
            tracing::error!(error = %err, "featured item storage failure");
            ProblemResponse::internal("featured item storage failure")
        }
    }
}

fn catalog_problem(err: CatalogError) -> ProblemResponse {
    tracing::error!(error = %err, "catalog summary lookup failed");
    ProblemResponse::internal("catalog summary lookup failed")
}
