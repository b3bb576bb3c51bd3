use crate::error::QueryError;
use crate::model::{Observation, RecordFilter};
use crate::store::RecordStore;
use crate::vocab::non_blank;

/// Hard cap on rows returned by a record query. There is no cursor.
pub const RECORD_LIMIT: usize = 500;

/// Raw list-records parameters as received at the boundary.
#[derive(Debug, Clone, Default)]
pub struct RecordParams<'a> {
    pub level: Option<&'a str>,
    pub geo: Option<&'a str>,
    pub drg_code: Option<&'a str>,
}

impl RecordParams<'_> {
    /// Validates required parameters without touching the store.
    pub fn validate(&self) -> Result<RecordFilter, QueryError> {
        let (Some(level), Some(geo)) = (non_blank(self.level), non_blank(self.geo)) else {
            return Err(QueryError::invalid("Missing query params: level, geo"));
        };

        let drg_code = match non_blank(self.drg_code) {
            Some(raw) => Some(parse_number(raw)?),
            None => None,
        };

        Ok(RecordFilter {
            geo_level: level.to_string(),
            geo_description: geo.to_string(),
            drg_code,
        })
    }
}

fn parse_number(raw: &str) -> Result<f64, QueryError> {
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| QueryError::invalid("drg_cd must be a number"))
}

#[derive(Clone)]
pub struct RecordQuery {
    store: RecordStore,
}

impl RecordQuery {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Matching observations, highest average submitted charge first, at most [`RECORD_LIMIT`].
    pub async fn list(&self, params: &RecordParams<'_>) -> Result<Vec<Observation>, QueryError> {
        let filter = params.validate()?;
        Ok(self.store.records(&filter, RECORD_LIMIT).await?)
    }
}
