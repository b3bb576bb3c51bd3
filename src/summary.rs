use serde::Serialize;

use crate::model::Observation;

/// Length of each chart series.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub count: usize,
    pub avg_submitted: Option<f64>,
    pub avg_total_payment: Option<f64>,
    pub avg_medicare_payment: Option<f64>,
    pub avg_gap_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargePoint {
    pub drg: String,
    pub submitted: i64,
    pub total_payment: i64,
    pub medicare_payment: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapPoint {
    pub drg: String,
    pub gap_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub kpis: Kpis,
    pub top_by_charges: Vec<ChargePoint>,
    pub largest_gaps: Vec<GapPoint>,
}

pub fn summarize(records: &[Observation]) -> Summary {
    Summary {
        kpis: kpis(records),
        top_by_charges: top_by_charges(records),
        largest_gaps: largest_gaps(records),
    }
}

fn kpis(records: &[Observation]) -> Kpis {
    let gap_pcts: Vec<f64> = records
        .iter()
        .filter(|r| r.avg_submitted_charge > 0.0)
        .map(|r| (1.0 - r.avg_total_payment / r.avg_submitted_charge) * 100.0)
        .collect();

    Kpis {
        count: records.len(),
        avg_submitted: mean(records.iter().map(|r| r.avg_submitted_charge)),
        avg_total_payment: mean(records.iter().map(|r| r.avg_total_payment)),
        avg_medicare_payment: mean(records.iter().map(|r| r.avg_medicare_payment)),
        avg_gap_pct: mean(gap_pcts.into_iter()),
    }
}

fn top_by_charges(records: &[Observation]) -> Vec<ChargePoint> {
    let mut sorted: Vec<&Observation> = records.iter().collect();
    sorted.sort_by(|a, b| b.avg_submitted_charge.total_cmp(&a.avg_submitted_charge));
    sorted
        .into_iter()
        .take(TOP_N)
        .map(|r| ChargePoint {
            drg: r.drg_code.to_string(),
            submitted: r.avg_submitted_charge.round() as i64,
            total_payment: r.avg_total_payment.round() as i64,
            medicare_payment: r.avg_medicare_payment.round() as i64,
        })
        .collect()
}

/// Rows with the widest billed-minus-paid spread; the percentage is clamped to 0..=100.
fn largest_gaps(records: &[Observation]) -> Vec<GapPoint> {
    let mut billed: Vec<&Observation> = records
        .iter()
        .filter(|r| r.avg_submitted_charge > 0.0)
        .collect();
    billed.sort_by(|a, b| spread(b).total_cmp(&spread(a)));
    billed
        .into_iter()
        .take(TOP_N)
        .map(|r| {
            let gap = 1.0 - r.avg_total_payment / r.avg_submitted_charge;
            GapPoint {
                drg: r.drg_code.to_string(),
                gap_pct: gap.clamp(0.0, 1.0) * 100.0,
            }
        })
        .collect()
}

fn spread(r: &Observation) -> f64 {
    r.avg_submitted_charge - r.avg_total_payment
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
