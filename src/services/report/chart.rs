//! Assembles a report chart: resolves the mode, loads the series it needs
//! through a [`ReportSource`], reshapes them and attaches display metadata.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::chart_data::{item_comparison_data, time_comparison_data, ChartRecord};
use super::filters::{resolve_chart_mode, ChartMode, FilterConfig};
use super::products::{self, CompareObject};
use super::query::ReportQuery;
use super::series::{FetchResult, ReportStats};
use super::{selected_chart, ChartDefinition, ReportEndpoint, ValueType};
use crate::error::ReportError;
use crate::services::dates::{
    allowed_intervals, chart_type_for_query, current_dates, date_formats_for_interval,
    end_of_day, interval_for_query, start_of_day, ChartType, Interval, CHART_DATE_FORMAT,
};

/// Largest page the chart asks for; one page holds every interval.
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentBy {
    Product,
    Variation,
}

impl SegmentBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "product" => Some(SegmentBy::Product),
            "variation" => Some(SegmentBy::Variation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentBy::Product => "product",
            SegmentBy::Variation => "variation",
        }
    }
}

impl From<CompareObject> for SegmentBy {
    fn from(object: CompareObject) -> Self {
        match object {
            CompareObject::Products => SegmentBy::Product,
            CompareObject::Variations => SegmentBy::Variation,
        }
    }
}

/// Parameters of one stats request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRequest {
    pub after: NaiveDateTime,
    pub before: NaiveDateTime,
    pub interval: Interval,
    pub order: &'static str,
    pub per_page: u32,
    pub segmentby: Option<SegmentBy>,
    pub products: Vec<i64>,
    pub variations: Vec<i64>,
}

pub fn stats_request(query: &ReportQuery, slot: Slot, today: NaiveDate) -> StatsRequest {
    let windows = current_dates(query, today);
    let window = match slot {
        Slot::Primary => windows.primary,
        Slot::Secondary => windows.secondary,
    };

    StatsRequest {
        after: start_of_day(window.after),
        before: end_of_day(window.before),
        interval: interval_for_query(query, today),
        order: "asc",
        per_page: MAX_PER_PAGE,
        segmentby: query.text("segmentby").and_then(SegmentBy::parse),
        products: query.ids("products"),
        variations: query.ids("variations"),
    }
}

/// The data layer the charts read from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_stats(
        &self,
        endpoint: ReportEndpoint,
        request: &StatsRequest,
    ) -> Result<ReportStats, ReportError>;

    async fn is_variable_product(&self, product_id: i64) -> Result<bool, ReportError>;
}

/// Loads one series; failures are logged and reported through `is_error`.
pub async fn fetch_chart_data(
    source: &dyn ReportSource,
    endpoint: ReportEndpoint,
    slot: Slot,
    query: &ReportQuery,
    today: NaiveDate,
) -> FetchResult {
    let request = stats_request(query, slot, today);
    match source.fetch_stats(endpoint, &request).await {
        Ok(data) => FetchResult::loaded(data),
        Err(e) => {
            log::error!(
                "Failed to load {:?} {} stats: {}",
                slot,
                endpoint.as_str(),
                e
            );
            FetchResult::failed()
        }
    }
}

/// Everything needed to draw one report chart.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub endpoint: ReportEndpoint,
    pub query: ReportQuery,
    /// Forces a mode instead of resolving it from `filters`.
    pub mode: Option<ChartMode>,
    pub filters: Vec<FilterConfig>,
    pub selected_chart: ChartDefinition,
    pub items_label: Option<String>,
    /// Segmentation used when the chart compares items.
    pub segment_by: SegmentBy,
}

impl ChartRequest {
    pub fn chart_mode(&self) -> ChartMode {
        self.mode
            .or_else(|| resolve_chart_mode(&self.filters, &self.query))
            .unwrap_or(ChartMode::TimeComparison)
    }
}

/// Builds the chart request of a report endpoint from the raw query.
pub async fn prepare_chart_request(
    source: &dyn ReportSource,
    endpoint: ReportEndpoint,
    mut query: ReportQuery,
) -> Result<ChartRequest, ReportError> {
    let chart = selected_chart(query.text("chart"), endpoint.charts())
        .cloned()
        .ok_or_else(|| ReportError::InvalidQuery("report has no charts".to_string()))?;

    let request = match endpoint {
        ReportEndpoint::Products => {
            let mut single_variable = false;
            if products::is_single_product_view(&query) {
                if let Some(&product_id) = query.ids("products").first() {
                    single_variable = source.is_variable_product(product_id).await?;
                    query.insert("is-variable", single_variable.to_string());
                }
            }

            let meta = products::chart_meta(&query, single_variable);
            let segment_by = SegmentBy::from(meta.compare_object);
            if meta.mode == ChartMode::ItemComparison {
                query.insert("segmentby", segment_by.as_str());
            }

            ChartRequest {
                endpoint,
                mode: Some(meta.mode),
                filters: endpoint.filters(),
                selected_chart: chart,
                items_label: Some(meta.items_label.to_string()),
                segment_by,
                query,
            }
        }
        ReportEndpoint::Orders => ChartRequest {
            endpoint,
            mode: None,
            filters: endpoint.filters(),
            selected_chart: chart,
            items_label: None,
            segment_by: SegmentBy::Product,
            query,
        },
    };

    Ok(request)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub mode: ChartMode,
    pub data: Vec<ChartRecord>,
    pub allowed_intervals: Vec<Interval>,
    pub interval: Interval,
    pub date_parser: &'static str,
    pub is_requesting: bool,
    pub items_label: Option<String>,
    pub title: &'static str,
    pub tooltip_label_format: &'static str,
    pub tooltip_title: Option<&'static str>,
    pub tooltip_value_format: &'static str,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub value_type: ValueType,
    pub x_format: &'static str,
    #[serde(rename = "x2Format")]
    pub x2_format: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    /// A series failed to load; nothing should be drawn.
    Error,
    /// The series loaded but produced no records.
    Empty,
    Ready(Box<ChartView>),
}

pub async fn load_report_chart(
    source: &dyn ReportSource,
    request: &ChartRequest,
    today: NaiveDate,
) -> Result<ChartOutcome, ReportError> {
    let mode = request.chart_mode();
    let query = &request.query;
    let metric_key = request.selected_chart.key;
    let interval = interval_for_query(query, today);

    let (data, is_requesting, ticks) = match mode {
        ChartMode::ItemComparison => {
            let mut segment_query = query.clone();
            segment_query.insert("segmentby", request.segment_by.as_str());

            let segments = fetch_chart_data(
                source,
                request.endpoint,
                Slot::Primary,
                &segment_query,
                today,
            )
            .await;
            if segments.is_error {
                return Ok(ChartOutcome::Error);
            }

            let data = item_comparison_data(&segments.data, metric_key)?;
            (data, segments.is_requesting, segments.data.intervals.len())
        }
        ChartMode::TimeComparison => {
            let (primary, secondary) = futures::join!(
                fetch_chart_data(source, request.endpoint, Slot::Primary, query, today),
                fetch_chart_data(source, request.endpoint, Slot::Secondary, query, today)
            );
            if primary.is_error || secondary.is_error {
                return Ok(ChartOutcome::Error);
            }

            let data =
                time_comparison_data(&primary.data, &secondary.data, query, today, metric_key)?;
            (
                data,
                primary.is_requesting || secondary.is_requesting,
                primary.data.intervals.len(),
            )
        }
    };

    if data.is_empty() {
        return Ok(ChartOutcome::Empty);
    }

    let formats = date_formats_for_interval(interval, ticks);
    let chart = &request.selected_chart;

    Ok(ChartOutcome::Ready(Box::new(ChartView {
        mode,
        data,
        allowed_intervals: allowed_intervals(query, today),
        interval,
        date_parser: CHART_DATE_FORMAT,
        is_requesting,
        items_label: request.items_label.clone(),
        title: chart.label,
        tooltip_label_format: formats.tooltip_label_format,
        tooltip_title: (mode == ChartMode::TimeComparison).then_some(chart.label),
        tooltip_value_format: chart.value_type.tooltip_value_format(),
        chart_type: chart_type_for_query(query),
        value_type: chart.value_type,
        x_format: formats.x_format,
        x2_format: formats.x2_format,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::report::series::{IntervalSubtotals, Segment, StatsInterval, Subtotals};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        variable: bool,
        fail_secondary: bool,
        empty: bool,
        requests: Mutex<Vec<StatsRequest>>,
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(date: NaiveDateTime, orders: f64, segments: Vec<Segment>) -> StatsInterval {
        StatsInterval {
            interval: date.format("%Y-%m-%d").to_string(),
            date_start: date.format("%Y-%m-%d %H:%M:%S").to_string(),
            date_end: String::new(),
            subtotals: IntervalSubtotals {
                values: Subtotals::from([("orders_count".to_string(), orders)]),
                segments,
            },
        }
    }

    #[async_trait]
    impl ReportSource for FakeSource {
        async fn fetch_stats(
            &self,
            _endpoint: ReportEndpoint,
            request: &StatsRequest,
        ) -> Result<ReportStats, ReportError> {
            self.requests.lock().unwrap().push(request.clone());

            let is_secondary = request.after.date() < ymd(2019, 1, 1);
            if self.fail_secondary && is_secondary {
                return Err(ReportError::InvalidQuery("secondary down".to_string()));
            }
            if self.empty {
                return Ok(ReportStats::default());
            }

            let segments = match request.segmentby {
                Some(_) => vec![Segment {
                    segment_id: 5,
                    segment_label: Some("Cap".to_string()),
                    subtotals: Subtotals::from([("orders_count".to_string(), 2.0)]),
                }],
                None => Vec::new(),
            };
            let orders = if is_secondary { 1.0 } else { 4.0 };

            Ok(ReportStats {
                totals: Subtotals::new(),
                intervals: vec![
                    day(request.after, orders, segments.clone()),
                    day(request.after + chrono::Duration::days(1), orders, segments),
                ],
            })
        }

        async fn is_variable_product(&self, _product_id: i64) -> Result<bool, ReportError> {
            Ok(self.variable)
        }
    }

    fn last_month_query() -> ReportQuery {
        ReportQuery::new()
            .with("period", "last_month")
            .with("compare", "previous_period")
            .with("chart", "orders_count")
    }

    fn today() -> NaiveDate {
        ymd(2019, 2, 10)
    }

    #[tokio::test]
    async fn time_comparison_loads_both_windows() {
        let source = FakeSource::default();
        let request = prepare_chart_request(&source, ReportEndpoint::Orders, last_month_query())
            .await
            .unwrap();

        let outcome = load_report_chart(&source, &request, today()).await.unwrap();
        let view = match outcome {
            ChartOutcome::Ready(view) => view,
            other => panic!("expected a chart, got {:?}", other),
        };

        assert_eq!(view.mode, ChartMode::TimeComparison);
        assert_eq!(view.data.len(), 2);
        assert_eq!(view.tooltip_title, Some("Orders"));
        assert_eq!(view.allowed_intervals, vec![Interval::Day, Interval::Week]);
        assert_eq!(view.x_format, "%d");

        let json = serde_json::to_value(&view.data[0]).unwrap();
        assert_eq!(json["Last Month (Jan 1 - 31, 2019)"]["value"], 4.0);
        assert_eq!(json["Previous Period (Dec 1 - 31, 2018)"]["value"], 1.0);

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.order == "asc" && r.segmentby.is_none()));
    }

    #[tokio::test]
    async fn failed_secondary_skips_the_chart() {
        let source = FakeSource {
            fail_secondary: true,
            ..Default::default()
        };
        let request = prepare_chart_request(&source, ReportEndpoint::Orders, last_month_query())
            .await
            .unwrap();

        let outcome = load_report_chart(&source, &request, today()).await.unwrap();
        assert_eq!(outcome, ChartOutcome::Error);
    }

    #[tokio::test]
    async fn empty_series_means_no_chart() {
        let source = FakeSource {
            empty: true,
            ..Default::default()
        };
        let request = prepare_chart_request(&source, ReportEndpoint::Orders, last_month_query())
            .await
            .unwrap();

        let outcome = load_report_chart(&source, &request, today()).await.unwrap();
        assert_eq!(outcome, ChartOutcome::Empty);
    }

    #[tokio::test]
    async fn product_comparison_segments_by_product() {
        let source = FakeSource::default();
        let query = last_month_query()
            .with("filter", "compare-products")
            .with("products", "5,6");
        let request = prepare_chart_request(&source, ReportEndpoint::Products, query)
            .await
            .unwrap();

        let outcome = load_report_chart(&source, &request, today()).await.unwrap();
        let view = match outcome {
            ChartOutcome::Ready(view) => view,
            other => panic!("expected a chart, got {:?}", other),
        };

        assert_eq!(view.mode, ChartMode::ItemComparison);
        assert_eq!(view.items_label.as_deref(), Some("%s products"));
        assert_eq!(view.tooltip_title, None);
        assert_eq!(
            serde_json::to_value(&view.data[0]).unwrap(),
            serde_json::json!({ "date": "2019-01-01T00:00:00", "Cap": { "value": 2.0 } })
        );

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].segmentby, Some(SegmentBy::Product));
        assert_eq!(requests[0].products, vec![5, 6]);
    }

    #[tokio::test]
    async fn single_variable_product_segments_by_variation() {
        let source = FakeSource {
            variable: true,
            ..Default::default()
        };
        let query = last_month_query()
            .with("filter", "single_product")
            .with("products", "5");
        let request = prepare_chart_request(&source, ReportEndpoint::Products, query)
            .await
            .unwrap();

        assert_eq!(request.segment_by, SegmentBy::Variation);
        assert_eq!(request.query.text("is-variable"), Some("true"));
        assert_eq!(request.items_label.as_deref(), Some("%s variations"));

        load_report_chart(&source, &request, today()).await.unwrap();
        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].segmentby, Some(SegmentBy::Variation));
    }

    #[test]
    fn orders_mode_defaults_to_time_comparison() {
        let request = ChartRequest {
            endpoint: ReportEndpoint::Orders,
            query: ReportQuery::new(),
            mode: None,
            filters: ReportEndpoint::Orders.filters(),
            selected_chart: ReportEndpoint::Orders.charts()[0].clone(),
            items_label: None,
            segment_by: SegmentBy::Product,
        };
        assert_eq!(request.chart_mode(), ChartMode::TimeComparison);
    }

    #[test]
    fn stats_request_spans_whole_days() {
        let request = stats_request(&last_month_query(), Slot::Secondary, today());
        assert_eq!(request.after, start_of_day(ymd(2018, 12, 1)));
        assert_eq!(request.before, end_of_day(ymd(2018, 12, 31)));
        assert_eq!(request.interval, Interval::Day);
        assert_eq!(request.per_page, MAX_PER_PAGE);
    }
}
