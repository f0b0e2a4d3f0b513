use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Subtotals = BTreeMap<String, f64>;

/// Reads a metric, treating an absent key as zero.
pub fn metric(subtotals: &Subtotals, key: &str) -> f64 {
    subtotals.get(key).copied().unwrap_or(0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    #[serde(default)]
    pub totals: Subtotals,
    #[serde(default)]
    pub intervals: Vec<StatsInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsInterval {
    #[serde(default)]
    pub interval: String,
    pub date_start: String,
    #[serde(default)]
    pub date_end: String,
    #[serde(default)]
    pub subtotals: IntervalSubtotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalSubtotals {
    #[serde(flatten)]
    pub values: Subtotals,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: i64,
    #[serde(default)]
    pub segment_label: Option<String>,
    #[serde(default)]
    pub subtotals: Subtotals,
}

/// A series as handed over by the data layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchResult {
    pub data: ReportStats,
    pub is_requesting: bool,
    pub is_error: bool,
}

impl FetchResult {
    pub fn loaded(data: ReportStats) -> Self {
        Self {
            data,
            is_requesting: false,
            is_error: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            data: ReportStats::default(),
            is_requesting: false,
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_json_keeps_metrics_and_segments_apart() {
        let interval: StatsInterval = serde_json::from_value(serde_json::json!({
            "interval": "2019-01-01",
            "date_start": "2019-01-01 00:00:00",
            "date_end": "2019-01-01 23:59:59",
            "subtotals": {
                "orders_count": 4,
                "net_revenue": 12.5,
                "segments": [
                    { "segment_id": 7, "segment_label": "Hoodie", "subtotals": { "orders_count": 2 } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(metric(&interval.subtotals.values, "orders_count"), 4.0);
        assert_eq!(metric(&interval.subtotals.values, "items_sold"), 0.0);
        assert_eq!(interval.subtotals.segments.len(), 1);
        assert!(!interval.subtotals.values.contains_key("segments"));
    }
}
