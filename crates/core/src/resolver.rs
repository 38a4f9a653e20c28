use std::collections::HashMap;

use crate::section::Section;
use crate::types::{FeaturedEntity, FeaturedItem};

/// Data-access surface the resolver needs.
///
/// Production wires this to the SQLite queries in `jobdeck-storage`; tests
/// drive the resolver with an in-memory fake. Errors are the store's own
/// and pass through the resolver untouched.
pub trait SectionStore {
    type Error;

    /// Active overrides for a section, ordered by `display_order` ascending
    /// with ties in insertion order.
    fn active_overrides(
        &self,
        section: Section,
    ) -> impl std::future::Future<Output = Result<Vec<FeaturedItem>, Self::Error>>;

    /// Bulk-fetches catalog entities by id from the section's source table.
    /// Ids with no matching row are simply absent from the result.
    fn entities_by_ids(
        &self,
        section: Section,
        ids: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<FeaturedEntity>, Self::Error>>;

    /// Fallback ranking query per the section policy, excluding the given
    /// ids. An empty exclusion list means no exclusion.
    fn ranked_entities(
        &self,
        section: Section,
        exclude: &[String],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<FeaturedEntity>, Self::Error>>;
}

/// Produces the ordered, deduplicated, length-bounded item list for a
/// home-page section, preferring curated overrides and back-filling with
/// the section's ranking query.
#[derive(Debug, Clone)]
pub struct FeaturedResolver<S> {
    store: S,
}

impl<S: SectionStore> FeaturedResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolves a section to at most `limit` entities.
    ///
    /// Curated entities come first in `display_order`; orphaned references
    /// are dropped and their slots back-filled from the fallback tier. A
    /// zero limit short-circuits without touching the store.
    pub async fn resolve(
        &self,
        section: Section,
        limit: usize,
    ) -> Result<Vec<FeaturedEntity>, S::Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let overrides = self.store.active_overrides(section).await?;
        if overrides.is_empty() {
            return self.store.ranked_entities(section, &[], limit).await;
        }

        // An entity referenced twice keeps its first position and is fetched
        // once, so the output can never repeat it.
        let mut position: HashMap<&str, usize> = HashMap::with_capacity(overrides.len());
        let mut ids: Vec<String> = Vec::with_capacity(overrides.len());
        for item in &overrides {
            let id = item.entity.entity_id();
            position.entry(id).or_insert_with(|| {
                ids.push(id.to_string());
                ids.len() - 1
            });
        }

        // The bulk fetch does not preserve input order; restore the curated
        // order via the override positions. Unknown ids sort last.
        let mut curated = self.store.entities_by_ids(section, &ids).await?;
        curated.sort_by_key(|entity| {
            position
                .get(entity.entity_id())
                .copied()
                .unwrap_or(usize::MAX)
        });
        curated.truncate(limit);

        if curated.len() < limit {
            let exclude: Vec<String> = curated
                .iter()
                .map(|entity| entity.entity_id().to_string())
                .collect();
            let fill = self
                .store
                .ranked_entities(section, &exclude, limit - curated.len())
                .await?;
            curated.extend(fill);
        }

        Ok(curated)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::convert::Infallible;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{Content, Course, EntityRef, JobPosting};

    /// In-memory store recording how often each query ran.
    #[derive(Default)]
    struct FakeStore {
        overrides: RefCell<Vec<FeaturedItem>>,
        entities: RefCell<HashMap<String, FeaturedEntity>>,
        ranked: RefCell<Vec<FeaturedEntity>>,
        override_calls: Cell<usize>,
        by_id_calls: Cell<usize>,
        ranked_calls: Cell<usize>,
    }

    impl SectionStore for &FakeStore {
        type Error = Infallible;

        async fn active_overrides(
            &self,
            section: Section,
        ) -> Result<Vec<FeaturedItem>, Infallible> {
            self.override_calls.set(self.override_calls.get() + 1);
            Ok(self
                .overrides
                .borrow()
                .iter()
                .filter(|item| item.section == section && item.is_active)
                .cloned()
                .collect())
        }

        async fn entities_by_ids(
            &self,
            _section: Section,
            ids: &[String],
        ) -> Result<Vec<FeaturedEntity>, Infallible> {
            self.by_id_calls.set(self.by_id_calls.get() + 1);
            let entities = self.entities.borrow();
            // Return in arbitrary (reversed) order to exercise re-sorting.
            Ok(ids
                .iter()
                .rev()
                .filter_map(|id| entities.get(id).cloned())
                .collect())
        }

        async fn ranked_entities(
            &self,
            _section: Section,
            exclude: &[String],
            limit: usize,
        ) -> Result<Vec<FeaturedEntity>, Infallible> {
            self.ranked_calls.set(self.ranked_calls.get() + 1);
            Ok(self
                .ranked
                .borrow()
                .iter()
                .filter(|entity| !exclude.iter().any(|id| id == entity.entity_id()))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn course(id: &str) -> FeaturedEntity {
        FeaturedEntity::Course(Course {
            id: id.to_string(),
            title: format!("Course {id}"),
            instructor_name: "Instructor".to_string(),
            category: "dev".to_string(),
            thumbnail_url: None,
            price: 0,
            rating: 4.5,
            review_count: 10,
            status: "recruiting".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    fn content(id: &str, view_count: i64) -> FeaturedEntity {
        FeaturedEntity::Content(Content {
            id: id.to_string(),
            title: format!("Content {id}"),
            summary: String::new(),
            author_name: "Author".to_string(),
            category: "career".to_string(),
            thumbnail_url: None,
            view_count,
            like_count: 0,
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    fn job(id: &str) -> FeaturedEntity {
        FeaturedEntity::Job(JobPosting {
            id: id.to_string(),
            company_name: "Acme".to_string(),
            title: format!("Role {id}"),
            job_type: "newgrad".to_string(),
            location: None,
            deadline: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            url: None,
            thumbnail_url: None,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    fn override_item(section: Section, entity: EntityRef, order: i64) -> FeaturedItem {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FeaturedItem {
            id: format!("f-{}", entity.entity_id()),
            section,
            entity,
            display_order: order,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn store_with_courses(ids: &[&str]) -> FakeStore {
        let store = FakeStore::default();
        for id in ids {
            store
                .entities
                .borrow_mut()
                .insert(id.to_string(), course(id));
        }
        store
    }

    fn resolved_ids(entities: &[FeaturedEntity]) -> Vec<&str> {
        entities.iter().map(FeaturedEntity::entity_id).collect()
    }

    #[tokio::test]
    async fn zero_limit_returns_empty_without_store_calls() {
        let store = FakeStore::default();
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 0)
            .await
            .expect("resolve");

        assert!(result.is_empty());
        assert_eq!(store.override_calls.get(), 0);
        assert_eq!(store.by_id_calls.get(), 0);
        assert_eq!(store.ranked_calls.get(), 0);
    }

    #[tokio::test]
    async fn empty_curation_falls_back_to_ranked_query() {
        let store = FakeStore::default();
        store
            .ranked
            .borrow_mut()
            .extend(["j-1", "j-2", "j-3"].iter().map(|id| job(id)));
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::UrgentJobs, 5)
            .await
            .expect("resolve");

        assert_eq!(resolved_ids(&result), vec!["j-1", "j-2", "j-3"]);
        assert_eq!(store.by_id_calls.get(), 0);
        assert_eq!(store.ranked_calls.get(), 1);
    }

    #[tokio::test]
    async fn full_curation_needs_no_fallback() {
        let store = store_with_courses(&["c-1", "c-2", "c-3", "c-4", "c-5", "c-6"]);
        // Inserted in reverse rank order to prove display_order wins.
        for (index, id) in ["c-6", "c-5", "c-4", "c-3", "c-2", "c-1"].iter().enumerate() {
            store.overrides.borrow_mut().push(override_item(
                Section::PopularCourses,
                EntityRef::Course(id.to_string()),
                (6 - index) as i64,
            ));
        }
        store
            .overrides
            .borrow_mut()
            .sort_by_key(|item| item.display_order);
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 6)
            .await
            .expect("resolve");

        assert_eq!(
            resolved_ids(&result),
            vec!["c-1", "c-2", "c-3", "c-4", "c-5", "c-6"]
        );
        assert_eq!(store.ranked_calls.get(), 0);
    }

    #[tokio::test]
    async fn orphaned_reference_is_skipped_and_backfilled() {
        let store = FakeStore::default();
        store
            .entities
            .borrow_mut()
            .insert("n-1".to_string(), content("n-1", 500));
        store.overrides.borrow_mut().extend([
            override_item(
                Section::RecommendedContents,
                EntityRef::Content("n-1".to_string()),
                1,
            ),
            // Referenced content was deleted from the catalog.
            override_item(
                Section::RecommendedContents,
                EntityRef::Content("n-gone".to_string()),
                2,
            ),
        ]);
        store.ranked.borrow_mut().extend([
            content("n-1", 500),
            content("n-2", 400),
            content("n-3", 300),
            content("n-4", 200),
            content("n-5", 100),
            content("n-6", 50),
            content("n-7", 25),
        ]);
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::RecommendedContents, 6)
            .await
            .expect("resolve");

        assert_eq!(
            resolved_ids(&result),
            vec!["n-1", "n-2", "n-3", "n-4", "n-5", "n-6"]
        );
    }

    #[tokio::test]
    async fn curated_entities_precede_fallback_and_never_repeat() {
        let store = store_with_courses(&["c-9"]);
        store.overrides.borrow_mut().push(override_item(
            Section::PopularCourses,
            EntityRef::Course("c-9".to_string()),
            1,
        ));
        // The curated course also ranks first in the fallback ordering.
        store
            .ranked
            .borrow_mut()
            .extend([course("c-9"), course("c-1"), course("c-2")]);
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 3)
            .await
            .expect("resolve");

        assert_eq!(resolved_ids(&result), vec!["c-9", "c-1", "c-2"]);
    }

    #[tokio::test]
    async fn equal_display_order_keeps_fetch_order() {
        let store = store_with_courses(&["c-a", "c-b", "c-c"]);
        for id in ["c-a", "c-b", "c-c"] {
            store.overrides.borrow_mut().push(override_item(
                Section::PopularCourses,
                EntityRef::Course(id.to_string()),
                3,
            ));
        }
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 6)
            .await
            .expect("resolve");

        assert_eq!(resolved_ids(&result)[..3], ["c-a", "c-b", "c-c"]);
    }

    #[tokio::test]
    async fn output_is_truncated_to_limit() {
        let store = store_with_courses(&["c-1", "c-2", "c-3", "c-4"]);
        for (index, id) in ["c-1", "c-2", "c-3", "c-4"].iter().enumerate() {
            store.overrides.borrow_mut().push(override_item(
                Section::PopularCourses,
                EntityRef::Course(id.to_string()),
                index as i64 + 1,
            ));
        }
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 2)
            .await
            .expect("resolve");

        assert_eq!(resolved_ids(&result), vec!["c-1", "c-2"]);
        assert_eq!(store.ranked_calls.get(), 0);
    }

    #[tokio::test]
    async fn duplicate_reference_collapses_to_first_position() {
        let store = store_with_courses(&["c-1", "c-2"]);
        store.overrides.borrow_mut().extend([
            override_item(
                Section::PopularCourses,
                EntityRef::Course("c-1".to_string()),
                1,
            ),
            override_item(
                Section::PopularCourses,
                EntityRef::Course("c-2".to_string()),
                2,
            ),
            override_item(
                Section::PopularCourses,
                EntityRef::Course("c-1".to_string()),
                3,
            ),
        ]);
        let resolver = FeaturedResolver::new(&store);

        let result = resolver
            .resolve(Section::PopularCourses, 6)
            .await
            .expect("resolve");

        assert_eq!(resolved_ids(&result)[..2], ["c-1", "c-2"]);
        let repeats = result
            .iter()
            .filter(|entity| entity.entity_id() == "c-1")
            .count();
        assert_eq!(repeats, 1);
    }
}
