use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Local;
use serde::Serialize;
use sqlx::PgPool;

use crate::databases::reports::orders::{get_orders_report, page_links, OrderReportRow, OrdersReportArgs};
use crate::error::ReportError;
use crate::services::report::chart::{
    load_report_chart, prepare_chart_request, ChartOutcome, ReportSource,
};
use crate::services::report::query::ReportQuery;
use crate::services::report::ReportEndpoint;

#[get("/api/reports/{endpoint}/chart")]
async fn get_report_chart(
    source: web::Data<dyn ReportSource>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, ReportError> {
    let endpoint = ReportEndpoint::parse(&path.into_inner())?;
    let query = ReportQuery::from_pairs(query.into_inner());
    let today = Local::now().date_naive();

    let request = prepare_chart_request(source.get_ref(), endpoint, query).await?;

    match load_report_chart(source.get_ref(), &request, today).await? {
        ChartOutcome::Ready(view) => Ok(HttpResponse::Ok().json(view)),
        ChartOutcome::Empty => Ok(HttpResponse::NoContent().finish()),
        ChartOutcome::Error => Ok(HttpResponse::BadGateway().json(serde_json::json!({
            "status": "error",
            "message": "Failed to load report data",
        }))),
    }
}

#[derive(Serialize)]
struct Href {
    href: String,
}

#[derive(Serialize)]
struct OrderLinks {
    order: Href,
}

#[derive(Serialize)]
struct OrderReportItem {
    #[serde(flatten)]
    row: OrderReportRow,
    #[serde(rename = "_links")]
    links: OrderLinks,
}

#[get("/api/reports/orders")]
async fn get_orders(
    pool: web::Data<PgPool>,
    req: HttpRequest,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, ReportError> {
    let pairs = query.into_inner();
    let query = ReportQuery::from_pairs(pairs.iter().cloned());
    let args = OrdersReportArgs::from_query(&query)?;
    let page = get_orders_report(pool.get_ref(), &args).await?;

    let mut response = HttpResponse::Ok();
    response
        .insert_header(("X-WP-Total", page.total.to_string()))
        .insert_header(("X-WP-TotalPages", page.pages.to_string()));

    let links = page_links(req.path(), &pairs, page.page_no, page.pages)?;
    if !links.is_empty() {
        response.insert_header(("Link", links.join(", ")));
    }

    let items: Vec<OrderReportItem> = page
        .data
        .into_iter()
        .map(|row| OrderReportItem {
            links: OrderLinks {
                order: Href {
                    href: format!("/api/orders/{}", row.order_id),
                },
            },
            row,
        })
        .collect();

    Ok(response.json(items))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(get_orders);
    cfg.service(get_report_chart);
}
