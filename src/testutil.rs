use crate::model::NewObservation;
use crate::store::RecordStore;

pub const CSV_HEADER: &str = "Rndrng_Prvdr_Geo_Lvl,Rndrng_Prvdr_Geo_Cd,Rndrng_Prvdr_Geo_Desc,DRG_Cd,DRG_Desc,Tot_Dschrgs,Avg_Submtd_Cvrd_Chrg,Avg_Tot_Pymt_Amt,Avg_Mdcr_Pymt_Amt";

pub fn obs(level: &str, geo: &str, drg: i64, drg_desc: &str, submitted: f64) -> NewObservation {
    NewObservation {
        geo_level: level.to_string(),
        geo_code: None,
        geo_description: geo.to_string(),
        drg_code: drg,
        drg_description: drg_desc.to_string(),
        total_discharges: 10,
        avg_submitted_charge: submitted,
        avg_total_payment: submitted / 4.0,
        avg_medicare_payment: submitted / 5.0,
    }
}

/// National plus three states, with overlapping DRGs.
pub async fn seeded_store() -> RecordStore {
    let rows = vec![
        obs("National", "National", 1, "HEART TRANSPLANT", 500_000.0),
        obs("National", "National", 470, "MAJOR HIP AND KNEE JOINT REPLACEMENT", 70_000.0),
        obs("State", "Ohio", 470, "MAJOR HIP AND KNEE JOINT REPLACEMENT", 65_000.0),
        obs("State", "Ohio", 1, "HEART TRANSPLANT", 450_000.0),
        obs("State", "Ohio", 291, "HEART FAILURE AND SHOCK", 40_000.0),
        obs("State", "Iowa", 470, "MAJOR HIP AND KNEE JOINT REPLACEMENT", 55_000.0),
        obs("State", "Iowa", 480, "HIP AND FEMUR PROCEDURES EXCEPT MAJOR JOINT", 80_000.0),
        obs("State", "Texas", 871, "SEPTICEMIA OR SEVERE SEPSIS", 90_000.0),
    ];
    let store = RecordStore::open_in_memory();
    store
        .replace_all(&rows, 1000, |_| {})
        .await
        .expect("seed store");
    store
}

/// CSV source text with the CMS header and the given data lines.
pub fn csv_source(lines: &[&str]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
