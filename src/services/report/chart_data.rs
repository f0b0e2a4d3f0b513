use chrono::NaiveDate;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::query::ReportQuery;
use super::series::{metric, ReportStats};
use crate::error::ReportError;
use crate::services::dates::{
    self, current_dates, date_params, interval_for_query, Compare, CurrentDates, Interval,
    CHART_DATE_FORMAT, REPORT_DATETIME_FORMAT,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ChartValue {
    Segment {
        value: f64,
    },
    Period {
        #[serde(rename = "labelDate")]
        label_date: String,
        value: f64,
    },
}

impl ChartValue {
    pub fn value(&self) -> f64 {
        match self {
            ChartValue::Segment { value } | ChartValue::Period { value, .. } => *value,
        }
    }
}

/// One point on the chart's x axis, serialized as `{"date": ..., "<slot>": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRecord {
    pub date: String,
    pub slots: Vec<(String, ChartValue)>,
}

impl ChartRecord {
    pub fn slot(&self, key: &str) -> Option<&ChartValue> {
        self.slots
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl Serialize for ChartRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (key, value) in &self.slots {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn chart_date(date_start: &str) -> Result<String, ReportError> {
    dates::parse_report_datetime(date_start)
        .map(|at| at.format(CHART_DATE_FORMAT).to_string())
        .ok_or_else(|| ReportError::InvalidIntervalDate(date_start.to_string()))
}

/// One record per interval with a slot per labelled segment.
pub fn item_comparison_data(
    series: &ReportStats,
    metric_key: &str,
) -> Result<Vec<ChartRecord>, ReportError> {
    series
        .intervals
        .iter()
        .map(|interval| {
            let slots = interval
                .subtotals
                .segments
                .iter()
                .filter_map(|segment| {
                    let label = segment.segment_label.as_deref().filter(|l| !l.is_empty())?;
                    let value = metric(&segment.subtotals, metric_key);
                    Some((label.to_string(), ChartValue::Segment { value }))
                })
                .collect();

            Ok(ChartRecord {
                date: chart_date(&interval.date_start)?,
                slots,
            })
        })
        .collect()
}

/// Pairs the primary and secondary series for the windows described by `query`.
pub fn time_comparison_data(
    primary: &ReportStats,
    secondary: &ReportStats,
    query: &ReportQuery,
    today: NaiveDate,
    metric_key: &str,
) -> Result<Vec<ChartRecord>, ReportError> {
    let windows = current_dates(query, today);
    let compare = date_params(query).compare;
    let interval = interval_for_query(query, today);

    time_comparison_records(primary, secondary, &windows, compare, interval, metric_key)
}

/// Secondary intervals are matched by position; a missing one reads as zero.
pub fn time_comparison_records(
    primary: &ReportStats,
    secondary: &ReportStats,
    windows: &CurrentDates,
    compare: Compare,
    interval: Interval,
    metric_key: &str,
) -> Result<Vec<ChartRecord>, ReportError> {
    let primary_key = windows.primary.key();
    let secondary_key = windows.secondary.key();

    primary
        .intervals
        .iter()
        .enumerate()
        .map(|(index, current)| {
            let start = dates::parse_report_datetime(&current.date_start)
                .ok_or_else(|| ReportError::InvalidIntervalDate(current.date_start.clone()))?;

            let secondary_date = dates::previous_date(
                start,
                windows.primary.after,
                windows.secondary.after,
                compare,
                interval,
            );
            let secondary_value = secondary
                .intervals
                .get(index)
                .map(|previous| metric(&previous.subtotals.values, metric_key))
                .unwrap_or(0.0);

            Ok(ChartRecord {
                date: start.format(CHART_DATE_FORMAT).to_string(),
                slots: vec![
                    (
                        primary_key.clone(),
                        ChartValue::Period {
                            label_date: current.date_start.clone(),
                            value: metric(&current.subtotals.values, metric_key),
                        },
                    ),
                    (
                        secondary_key.clone(),
                        ChartValue::Period {
                            label_date: secondary_date.format(REPORT_DATETIME_FORMAT).to_string(),
                            value: secondary_value,
                        },
                    ),
                ],
            })
        })
        .collect()
}
