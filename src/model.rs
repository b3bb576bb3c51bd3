use serde::{Deserialize, Serialize};

/// One (geography, DRG) row of the record store, serialized with the source column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    #[serde(rename = "rndrng_prvdr_geo_lvl")]
    pub geo_level: String,
    #[serde(rename = "rndrng_prvdr_geo_cd")]
    pub geo_code: Option<String>,
    #[serde(rename = "rndrng_prvdr_geo_desc")]
    pub geo_description: String,
    #[serde(rename = "drg_cd")]
    pub drg_code: i64,
    #[serde(rename = "drg_desc")]
    pub drg_description: String,
    #[serde(rename = "tot_dschrgs")]
    pub total_discharges: i64,
    #[serde(rename = "avg_submtd_cvrd_chrg")]
    pub avg_submitted_charge: f64,
    #[serde(rename = "avg_tot_pymt_amt")]
    pub avg_total_payment: f64,
    #[serde(rename = "avg_mdcr_pymt_amt")]
    pub avg_medicare_payment: f64,
}

/// A transformed source row waiting for its surrogate id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub geo_level: String,
    pub geo_code: Option<String>,
    pub geo_description: String,
    pub drg_code: i64,
    pub drg_description: String,
    pub total_discharges: i64,
    pub avg_submitted_charge: f64,
    pub avg_total_payment: f64,
    pub avg_medicare_payment: f64,
}

/// Source CSV row as published by CMS. Numeric columns stay textual until transformed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Rndrng_Prvdr_Geo_Lvl")]
    pub geo_level: String,
    #[serde(rename = "Rndrng_Prvdr_Geo_Cd", default)]
    pub geo_code: Option<String>,
    #[serde(rename = "Rndrng_Prvdr_Geo_Desc")]
    pub geo_description: String,
    #[serde(rename = "DRG_Cd")]
    pub drg_code: String,
    #[serde(rename = "DRG_Desc")]
    pub drg_description: String,
    #[serde(rename = "Tot_Dschrgs")]
    pub total_discharges: String,
    #[serde(rename = "Avg_Submtd_Cvrd_Chrg")]
    pub avg_submitted_charge: String,
    #[serde(rename = "Avg_Tot_Pymt_Amt")]
    pub avg_total_payment: String,
    #[serde(rename = "Avg_Mdcr_Pymt_Amt")]
    pub avg_medicare_payment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLevel {
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geography {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drg {
    pub code: i64,
    pub description: String,
}

/// DRG vocabulary filter, decided once from the raw search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrgFilter {
    All,
    ExactCode(i64),
    TextContains(String),
}

impl DrgFilter {
    /// All-digit text selects an exact code; anything else is a description substring.
    pub fn from_search(search: Option<&str>) -> Self {
        let s = search.map(str::trim).unwrap_or("");
        if s.is_empty() {
            return Self::All;
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(code) = s.parse::<i64>() {
                return Self::ExactCode(code);
            }
        }
        Self::TextContains(s.to_string())
    }
}

/// Validated list-records selection.
///
/// `drg_code` is any finite number; a non-integral value matches no row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub geo_level: String,
    pub geo_description: String,
    pub drg_code: Option<f64>,
}
