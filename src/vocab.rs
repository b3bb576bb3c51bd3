use crate::error::QueryError;
use crate::model::{Drg, DrgFilter, GeoLevel, Geography};
use crate::store::RecordStore;

/// Page size for the DRG list when no search text is given.
pub const DEFAULT_DRG_LIMIT: usize = 50;
/// Cap for searched DRG lists and for geography lists.
pub const SEARCH_LIMIT: usize = 200;

/// Cascading filter vocabularies: level → geography → DRG.
#[derive(Clone)]
pub struct FilterVocabulary {
    store: RecordStore,
}

impl FilterVocabulary {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub async fn geo_levels(&self) -> Result<Vec<GeoLevel>, QueryError> {
        let levels = self.store.distinct_levels().await?;
        Ok(levels.into_iter().map(|level| GeoLevel { level }).collect())
    }

    pub async fn geographies(
        &self,
        level: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Geography>, QueryError> {
        let Some(level) = non_blank(level) else {
            return Err(QueryError::invalid("Missing required query param: level"));
        };
        let search = non_blank(search);

        let names = self
            .store
            .distinct_geographies(level, search, SEARCH_LIMIT)
            .await?;
        Ok(names
            .into_iter()
            .map(|description| Geography { description })
            .collect())
    }

    pub async fn drgs(&self, search: Option<&str>) -> Result<Vec<Drg>, QueryError> {
        let filter = DrgFilter::from_search(search);
        let limit = match filter {
            DrgFilter::All => DEFAULT_DRG_LIMIT,
            DrgFilter::ExactCode(_) | DrgFilter::TextContains(_) => SEARCH_LIMIT,
        };
        Ok(self.store.distinct_drgs(&filter, limit).await?)
    }
}

/// Trims a request parameter, treating blank text as absent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{obs, seeded_store};

    #[tokio::test]
    async fn levels_are_distinct_and_sorted() {
        let vocab = FilterVocabulary::new(seeded_store().await);
        let levels = vocab.geo_levels().await.unwrap();
        assert_eq!(
            levels,
            vec![
                GeoLevel {
                    level: "National".to_string()
                },
                GeoLevel {
                    level: "State".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn geographies_require_a_level() {
        let vocab = FilterVocabulary::new(seeded_store().await);
        for level in [None, Some(""), Some("   ")] {
            let err = vocab.geographies(level, None).await.unwrap_err();
            assert!(err.is_client_error());
        }

        let national = vocab.geographies(Some("National"), None).await.unwrap();
        assert_eq!(
            national,
            vec![Geography {
                description: "National".to_string()
            }]
        );

        let searched = vocab
            .geographies(Some(" State "), Some("io"))
            .await
            .unwrap();
        let names: Vec<_> = searched.into_iter().map(|g| g.description).collect();
        assert_eq!(names, vec!["Iowa", "Ohio"]);
    }

    #[tokio::test]
    async fn geographies_are_capped() {
        let rows: Vec<_> = (0..250)
            .map(|i| obs("County", &format!("County {i:03}"), 1, "A", 1.0))
            .collect();
        let store = RecordStore::open_in_memory();
        store.replace_all(&rows, 1000, |_| {}).await.unwrap();
        let vocab = FilterVocabulary::new(store);

        let geos = vocab.geographies(Some("County"), None).await.unwrap();
        assert_eq!(geos.len(), SEARCH_LIMIT);
        assert_eq!(geos[0].description, "County 000");
    }

    #[tokio::test]
    async fn drg_search_numeric_is_exact() {
        let vocab = FilterVocabulary::new(seeded_store().await);
        let drgs = vocab.drgs(Some("470")).await.unwrap();
        assert_eq!(
            drgs,
            vec![Drg {
                code: 470,
                description: "MAJOR HIP AND KNEE JOINT REPLACEMENT".to_string()
            }]
        );
        assert!(vocab.drgs(Some("47")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drg_search_text_is_case_insensitive_substring() {
        let vocab = FilterVocabulary::new(seeded_store().await);
        let drgs = vocab.drgs(Some("hip")).await.unwrap();
        let codes: Vec<i64> = drgs.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![470, 480]);
        assert!(
            drgs.iter()
                .all(|d| d.description.to_lowercase().contains("hip"))
        );
    }

    #[tokio::test]
    async fn default_drg_page_is_the_fifty_lowest_codes() {
        let rows: Vec<_> = (1..=60)
            .rev()
            .map(|code| obs("National", "National", code, &format!("DRG {code}"), 1.0))
            .collect();
        let store = RecordStore::open_in_memory();
        store.replace_all(&rows, 1000, |_| {}).await.unwrap();
        let vocab = FilterVocabulary::new(store);

        let drgs = vocab.drgs(None).await.unwrap();
        let codes: Vec<i64> = drgs.iter().map(|d| d.code).collect();
        assert_eq!(codes, (1..=50).collect::<Vec<i64>>());
        assert_eq!(vocab.drgs(Some("  ")).await.unwrap().len(), 50);

        let searched = vocab.drgs(Some("DRG")).await.unwrap();
        assert_eq!(searched.len(), 60);
    }

    #[tokio::test]
    async fn searched_drgs_are_capped_in_code_order() {
        let rows: Vec<_> = (1..=260)
            .rev()
            .map(|code| obs("National", "National", code, &format!("drg {code}"), 1.0))
            .collect();
        let store = RecordStore::open_in_memory();
        store.replace_all(&rows, 1000, |_| {}).await.unwrap();
        let vocab = FilterVocabulary::new(store);

        let drgs = vocab.drgs(Some("DRG")).await.unwrap();
        assert_eq!(drgs.len(), SEARCH_LIMIT);
        let codes: Vec<i64> = drgs.iter().map(|d| d.code).collect();
        assert_eq!(codes, (1..=SEARCH_LIMIT as i64).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn duplicate_pairs_collapse() {
        let vocab = FilterVocabulary::new(seeded_store().await);
        let drgs = vocab.drgs(None).await.unwrap();
        let ones = drgs.iter().filter(|d| d.code == 1).count();
        assert_eq!(ones, 1);
    }
}
