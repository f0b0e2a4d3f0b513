use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use sqlx::postgres::PgArguments;
use sqlx::{query_as_with, query_scalar_with, Arguments, FromRow, PgPool};

use crate::error::ReportError;
use crate::services::dates::parse_report_datetime;
use crate::services::report::query::ReportQuery;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrdersOrderBy {
    Date,
    NumItemsSold,
    NetTotal,
}

impl OrdersOrderBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "date" => Some(OrdersOrderBy::Date),
            "num_items_sold" => Some(OrdersOrderBy::NumItemsSold),
            "net_total" => Some(OrdersOrderBy::NetTotal),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            OrdersOrderBy::Date => "os.date_created",
            OrdersOrderBy::NumItemsSold => "os.num_items_sold",
            OrdersOrderBy::NetTotal => "os.net_total",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerType {
    New,
    Returning,
}

impl CustomerType {
    fn as_str(&self) -> &'static str {
        match self {
            CustomerType::New => "new",
            CustomerType::Returning => "returning",
        }
    }
}

/// Arguments of the orders report listing.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdersReportArgs {
    pub before: Option<NaiveDateTime>,
    pub after: Option<NaiveDateTime>,
    pub page: i64,
    pub per_page: i64,
    pub orderby: OrdersOrderBy,
    pub order: SortOrder,
    pub product_includes: Vec<i64>,
    pub product_excludes: Vec<i64>,
    pub coupon_includes: Vec<i64>,
    pub coupon_excludes: Vec<i64>,
    pub status_is: Vec<String>,
    pub status_is_not: Vec<String>,
    pub customer_type: Option<CustomerType>,
    pub extended_info: bool,
}

fn invalid(key: &str, value: &str) -> ReportError {
    ReportError::InvalidQuery(format!("invalid {} '{}'", key, value))
}

/// Report timestamps, or RFC 3339 timestamps with an offset converted to UTC.
fn parse_datetime(query: &ReportQuery, key: &str) -> Result<Option<NaiveDateTime>, ReportError> {
    query
        .text(key)
        .map(|value| {
            parse_report_datetime(value)
                .or_else(|| {
                    DateTime::parse_from_rfc3339(value.trim())
                        .ok()
                        .map(|at| at.naive_utc())
                })
                .ok_or_else(|| invalid(key, value))
        })
        .transpose()
}

fn parse_count(query: &ReportQuery, key: &str, default: i64) -> Result<i64, ReportError> {
    match query.text(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| invalid(key, value)),
    }
}

impl OrdersReportArgs {
    pub fn from_query(query: &ReportQuery) -> Result<Self, ReportError> {
        let orderby = match query.text("orderby") {
            None => OrdersOrderBy::Date,
            Some(value) => OrdersOrderBy::parse(value).ok_or_else(|| invalid("orderby", value))?,
        };

        let order = match query.text("order") {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(invalid("order", other)),
        };

        let customer_type = match query.text("customer_type") {
            None => None,
            Some("new") => Some(CustomerType::New),
            Some("returning") => Some(CustomerType::Returning),
            Some(other) => return Err(invalid("customer_type", other)),
        };

        let page = parse_count(query, "page", 1)?;
        let per_page = parse_count(query, "per_page", DEFAULT_PER_PAGE)?.min(MAX_PER_PAGE);
        if (page - 1).checked_mul(per_page).is_none() {
            return Err(ReportError::InvalidQuery(format!("page {} is out of range", page)));
        }

        Ok(Self {
            before: parse_datetime(query, "before")?,
            after: parse_datetime(query, "after")?,
            page,
            per_page,
            orderby,
            order,
            product_includes: query.ids("product_includes"),
            product_excludes: query.ids("product_excludes"),
            coupon_includes: query.ids("coupon_includes"),
            coupon_excludes: query.ids("coupon_excludes"),
            status_is: query.values("status_is"),
            status_is_not: query.values("status_is_not"),
            customer_type,
            extended_info: query.is_truthy("extended_info"),
        })
    }

    /// `WHERE` clause over `order_stats os`, binding its values into `args`.
    pub fn where_clause(&self, args: &mut PgArguments) -> String {
        let mut sql = String::from(" WHERE 1=1");
        let mut param_index = 1;

        if let Some(after) = self.after {
            sql.push_str(&format!(" AND os.date_created >= ${}", param_index));
            args.add(after);
            param_index += 1;
        }

        if let Some(before) = self.before {
            sql.push_str(&format!(" AND os.date_created <= ${}", param_index));
            args.add(before);
            param_index += 1;
        }

        if !self.status_is.is_empty() {
            sql.push_str(&format!(" AND os.status = ANY(${})", param_index));
            args.add(self.status_is.clone());
            param_index += 1;
        }

        if !self.status_is_not.is_empty() {
            sql.push_str(&format!(" AND os.status <> ALL(${})", param_index));
            args.add(self.status_is_not.clone());
            param_index += 1;
        }

        let lookups = [
            (&self.product_includes, "EXISTS", "order_product_lookup", "product_id"),
            (&self.product_excludes, "NOT EXISTS", "order_product_lookup", "product_id"),
            (&self.coupon_includes, "EXISTS", "order_coupon_lookup", "coupon_id"),
            (&self.coupon_excludes, "NOT EXISTS", "order_coupon_lookup", "coupon_id"),
        ];
        for (ids, exists, table, column) in lookups {
            if ids.is_empty() {
                continue;
            }
            sql.push_str(&format!(
                " AND {} (SELECT 1 FROM {} l WHERE l.order_id = os.order_id AND l.{} = ANY(${}))",
                exists, table, column, param_index
            ));
            args.add(ids.clone());
            param_index += 1;
        }

        if let Some(customer_type) = self.customer_type {
            sql.push_str(&format!(" AND os.customer_type = ${}", param_index));
            args.add(customer_type.as_str());
        }

        sql
    }

    pub fn order_clause(&self) -> String {
        format!(
            " ORDER BY {} {}, os.order_id {}",
            self.orderby.column(),
            self.order.keyword(),
            self.order.keyword()
        )
    }

    /// Rows skipped before the current page; `from_query` keeps this in range.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderReportRow {
    pub order_id: i64,
    pub date_created: NaiveDateTime,
    pub status: String,
    pub customer_id: Option<i64>,
    pub num_items_sold: i32,
    pub net_total: f64,
    pub customer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrdersPage {
    pub data: Vec<OrderReportRow>,
    pub total: i64,
    pub pages: i64,
    pub page_no: i64,
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

pub async fn get_orders_report(
    pool: &PgPool,
    args: &OrdersReportArgs,
) -> Result<OrdersPage, ReportError> {
    let mut count_args = PgArguments::default();
    let count_sql = format!(
        "SELECT COUNT(*) FROM order_stats os{}",
        args.where_clause(&mut count_args)
    );
    let total: i64 = query_scalar_with(&count_sql, count_args)
        .fetch_one(pool)
        .await?;

    let extended = if args.extended_info {
        "os.extended_info"
    } else {
        "NULL::JSONB AS extended_info"
    };

    let mut row_args = PgArguments::default();
    let where_sql = args.where_clause(&mut row_args);
    let sql = format!(
        "SELECT os.order_id, os.date_created, os.status, os.customer_id, os.num_items_sold, \
         os.net_total, os.customer_type, {} FROM order_stats os{}{} LIMIT {} OFFSET {}",
        extended,
        where_sql,
        args.order_clause(),
        args.per_page,
        args.offset()
    );

    let data = query_as_with::<_, OrderReportRow, _>(&sql, row_args)
        .fetch_all(pool)
        .await?;

    Ok(OrdersPage {
        data,
        total,
        pages: total_pages(total, args.per_page),
        page_no: args.page,
    })
}

/// `Link` header entries pointing at the neighbouring pages of `base`.
///
/// `pairs` are the request's query pairs; every one but `page` is carried over.
pub fn page_links(
    base: &str,
    pairs: &[(String, String)],
    page: i64,
    max_pages: i64,
) -> Result<Vec<String>, ReportError> {
    let link = |page_no: i64, rel: &str| -> Result<String, ReportError> {
        let page_no = page_no.to_string();
        let params: Vec<(&str, &str)> = pairs
            .iter()
            .filter(|(key, _)| key != "page")
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .chain([("page", page_no.as_str())])
            .collect();
        let encoded = serde_urlencoded::to_string(&params)
            .map_err(|e| ReportError::InvalidQuery(e.to_string()))?;
        Ok(format!("<{}?{}>; rel=\"{}\"", base, encoded, rel))
    };

    let mut links = Vec::new();
    if page > 1 {
        links.push(link((page - 1).min(max_pages), "prev")?);
    }
    if max_pages > page {
        links.push(link(page + 1, "next")?);
    }
    Ok(links)
}
