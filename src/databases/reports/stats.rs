use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::ReportError;
use crate::services::dates::{bucket_index, interval_buckets, Interval, REPORT_DATETIME_FORMAT};
use crate::services::report::chart::{ReportSource, SegmentBy, StatsRequest};
use crate::services::report::series::{
    IntervalSubtotals, ReportStats, Segment, StatsInterval, Subtotals,
};
use crate::services::report::ReportEndpoint;

#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub bucket: NaiveDateTime,
    pub segment_id: Option<i64>,
    pub orders_count: i64,
    pub items_sold: i64,
    pub net_revenue: f64,
}

const ORDERS_STATS_SQL: &str = r#"
    SELECT
        date_trunc($1, os.date_created) AS bucket,
        NULL::BIGINT AS segment_id,
        COUNT(*)::BIGINT AS orders_count,
        COALESCE(SUM(os.num_items_sold), 0)::BIGINT AS items_sold,
        COALESCE(SUM(os.net_total), 0)::FLOAT8 AS net_revenue
    FROM order_stats os
    WHERE os.date_created BETWEEN $2 AND $3
      AND (cardinality($4::BIGINT[]) = 0 OR EXISTS (
            SELECT 1 FROM order_product_lookup opl
            WHERE opl.order_id = os.order_id AND opl.product_id = ANY($4)))
      AND (cardinality($5::BIGINT[]) = 0 OR EXISTS (
            SELECT 1 FROM order_product_lookup opl
            WHERE opl.order_id = os.order_id AND opl.variation_id = ANY($5)))
    GROUP BY 1
    ORDER BY 1
"#;

fn products_stats_sql(segmentby: Option<SegmentBy>) -> String {
    let segment_column = match segmentby {
        Some(SegmentBy::Product) => "opl.product_id",
        Some(SegmentBy::Variation) => "opl.variation_id",
        None => "NULL::BIGINT",
    };

    format!(
        r#"
        SELECT
            date_trunc($1, opl.date_created) AS bucket,
            {segment_column} AS segment_id,
            COUNT(DISTINCT opl.order_id)::BIGINT AS orders_count,
            COALESCE(SUM(opl.product_qty), 0)::BIGINT AS items_sold,
            COALESCE(SUM(opl.product_net_revenue), 0)::FLOAT8 AS net_revenue
        FROM order_product_lookup opl
        WHERE opl.date_created BETWEEN $2 AND $3
          AND (cardinality($4::BIGINT[]) = 0 OR opl.product_id = ANY($4))
          AND (cardinality($5::BIGINT[]) = 0 OR opl.variation_id = ANY($5))
        GROUP BY 1, 2
        ORDER BY 1
        "#
    )
}

#[derive(Debug, Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn segment_labels(&self, ids: &[i64]) -> Result<HashMap<i64, String>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                p.id,
                CASE WHEN p.parent_id IS NULL THEN p.name
                     ELSE concat_ws(' - ', parent.name, p.attribute_summary)
                END AS name
            FROM products p
            LEFT JOIN products parent ON parent.id = p.parent_id
            WHERE p.id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, name)| name.map(|name| (id, name)))
            .collect())
    }
}

#[async_trait]
impl ReportSource for PgReportStore {
    async fn fetch_stats(
        &self,
        endpoint: ReportEndpoint,
        request: &StatsRequest,
    ) -> Result<ReportStats, ReportError> {
        // rows come back per hour or per day and are folded into the requested buckets
        let trunc = match request.interval {
            Interval::Hour => "hour",
            _ => "day",
        };

        let sql = match endpoint {
            ReportEndpoint::Orders => ORDERS_STATS_SQL.to_string(),
            ReportEndpoint::Products => products_stats_sql(request.segmentby),
        };

        let rows = sqlx::query_as::<_, StatsRow>(&sql)
            .bind(trunc)
            .bind(request.after)
            .bind(request.before)
            .bind(&request.products)
            .bind(&request.variations)
            .fetch_all(&self.pool)
            .await?;

        let segment_ids = match endpoint {
            ReportEndpoint::Products => segment_ids(request, &rows),
            ReportEndpoint::Orders => Vec::new(),
        };
        let labels = self.segment_labels(&segment_ids).await?;

        log::debug!(
            "{} stats by {}: {} rows, {} segments",
            endpoint.as_str(),
            request.interval.as_str(),
            rows.len(),
            segment_ids.len()
        );

        Ok(assemble_stats(endpoint, request, &rows, &segment_ids, &labels))
    }

    async fn is_variable_product(&self, product_id: i64) -> Result<bool, ReportError> {
        let product_type: Option<(String,)> =
            sqlx::query_as("SELECT product_type FROM products WHERE id = $1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(matches!(product_type, Some((t,)) if t == "variable"))
    }
}

/// Requested ids of the segmented kind plus every id present in the rows, ascending.
fn segment_ids(request: &StatsRequest, rows: &[StatsRow]) -> Vec<i64> {
    let requested: &[i64] = match request.segmentby {
        Some(SegmentBy::Product) => &request.products,
        Some(SegmentBy::Variation) => &request.variations,
        None => return Vec::new(),
    };

    requested
        .iter()
        .copied()
        .chain(rows.iter().filter_map(|row| row.segment_id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    orders_count: i64,
    items_sold: i64,
    net_revenue: f64,
}

impl Totals {
    fn add(&mut self, row: &StatsRow) {
        self.orders_count += row.orders_count;
        self.items_sold += row.items_sold;
        self.net_revenue += row.net_revenue;
    }

    fn subtotals(&self, endpoint: ReportEndpoint) -> Subtotals {
        let orders = self.orders_count as f64;
        let items = self.items_sold as f64;

        let mut subtotals = Subtotals::new();
        subtotals.insert("orders_count".to_string(), orders);
        subtotals.insert("net_revenue".to_string(), self.net_revenue);

        match endpoint {
            ReportEndpoint::Products => {
                subtotals.insert("items_sold".to_string(), items);
            }
            ReportEndpoint::Orders => {
                let per_order = |value: f64| if orders > 0.0 { value / orders } else { 0.0 };
                subtotals.insert("num_items_sold".to_string(), items);
                subtotals.insert("avg_order_value".to_string(), per_order(self.net_revenue));
                subtotals.insert("avg_items_per_order".to_string(), per_order(items));
            }
        }
        subtotals
    }
}

/// Folds grouped rows into one interval per bucket; buckets without rows read as zero.
pub fn assemble_stats(
    endpoint: ReportEndpoint,
    request: &StatsRequest,
    rows: &[StatsRow],
    segment_ids: &[i64],
    labels: &HashMap<i64, String>,
) -> ReportStats {
    let buckets = interval_buckets(request.after, request.before, request.interval);
    let mut bucket_totals = vec![Totals::default(); buckets.len()];
    let mut bucket_segments: Vec<BTreeMap<i64, Totals>> = vec![BTreeMap::new(); buckets.len()];
    let mut totals = Totals::default();

    for row in rows {
        let Some(index) = bucket_index(&buckets, row.bucket) else {
            continue;
        };
        totals.add(row);
        bucket_totals[index].add(row);
        if let Some(segment_id) = row.segment_id {
            bucket_segments[index].entry(segment_id).or_default().add(row);
        }
    }

    let intervals = buckets
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            let segments = segment_ids
                .iter()
                .map(|id| Segment {
                    segment_id: *id,
                    segment_label: labels.get(id).cloned(),
                    subtotals: bucket_segments[index]
                        .get(id)
                        .copied()
                        .unwrap_or_default()
                        .subtotals(ReportEndpoint::Products),
                })
                .collect();

            StatsInterval {
                interval: bucket.key.clone(),
                date_start: bucket.start.format(REPORT_DATETIME_FORMAT).to_string(),
                date_end: bucket.end.format(REPORT_DATETIME_FORMAT).to_string(),
                subtotals: IntervalSubtotals {
                    values: bucket_totals[index].subtotals(endpoint),
                    segments,
                },
            }
        })
        .collect();

    ReportStats {
        totals: totals.subtotals(endpoint),
        intervals,
    }
}
