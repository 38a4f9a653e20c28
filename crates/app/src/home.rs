use axum::{
    extract::{Path, Query, State},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};

use jobdeck_core::types::{FeaturedEntity, HeroBanner};
use jobdeck_core::Section;
use jobdeck_storage::{BannerError, StorageError};

use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Banner slots above the featured sections.
pub const HERO_BANNER_LIMIT: usize = 5;

/// Upper bound for the `limit` query parameter on section requests.
pub const MAX_SECTION_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub banners: Vec<HeroBanner>,
    pub popular_courses: Vec<FeaturedEntity>,
    pub recommended_contents: Vec<FeaturedEntity>,
    pub urgent_jobs: Vec<FeaturedEntity>,
}

/// Builds the full home feed: hero banners plus the three featured
/// sections, resolved concurrently with their fixed home limits.
pub async fn home_feed(
    State(state): State<AppState>,
) -> Result<Json<HomeResponse>, ProblemResponse> {
    let resolver = state.resolver();
    let banner_repo = state.storage().banners();

    let (banners, courses, contents, jobs) = tokio::join!(
        banner_repo.list_active(HERO_BANNER_LIMIT),
        resolver.resolve(
            Section::PopularCourses,
            Section::PopularCourses.home_limit()
        ),
        resolver.resolve(
            Section::RecommendedContents,
            Section::RecommendedContents.home_limit()
        ),
        resolver.resolve(Section::UrgentJobs, Section::UrgentJobs.home_limit()),
    );

    let response = assemble_home(banners, courses, contents, jobs);
    let result = if response.is_ok() { "ok" } else { "error" };
    counter!("home_requests_total", "result" => result).increment(1);
    response.map(Json)
}

fn assemble_home(
    banners: Result<Vec<HeroBanner>, BannerError>,
    courses: Result<Vec<FeaturedEntity>, StorageError>,
    contents: Result<Vec<FeaturedEntity>, StorageError>,
    jobs: Result<Vec<FeaturedEntity>, StorageError>,
) -> Result<HomeResponse, ProblemResponse> {
    Ok(HomeResponse {
        banners: banners.map_err(banner_problem)?,
        popular_courses: courses.map_err(resolve_problem)?,
        recommended_contents: contents.map_err(resolve_problem)?,
        urgent_jobs: jobs.map_err(resolve_problem)?,
    })
}

#[derive(Debug, Deserialize)]
pub struct SectionQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub section: Section,
    pub items: Vec<FeaturedEntity>,
}

/// Resolves a single section; `limit` defaults to the section's home limit.
pub async fn section_feed(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(query): Query<SectionQuery>,
) -> Result<Json<SectionResponse>, ProblemResponse> {
    let section = Section::parse(&section)
        .map_err(|err| ProblemResponse::not_found("unknown_section", err.to_string()))?;
    let limit = query
        .limit
        .unwrap_or_else(|| section.home_limit())
        .min(MAX_SECTION_LIMIT);

    let items = state
        .resolver()
        .resolve(section, limit)
        .await
        .map_err(resolve_problem)?;

    counter!("section_resolve_total", "section" => section.as_str()).increment(1);
    Ok(Json(SectionResponse { section, items }))
}

fn resolve_problem(err: StorageError) -> ProblemResponse {
    tracing::error!(error = %err, "section resolution failed");
    ProblemResponse::internal("section resolution failed")
}

fn banner_problem(err: BannerError) -> ProblemResponse {
    tracing::error!(error = %err, "hero banner lookup failed");
    ProblemResponse::internal("hero banner lookup failed")
}
