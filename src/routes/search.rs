use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::ReportError;
use crate::services::search::{
    remove_result, search, select_result, tag_labels, SearchType, SelectedItem,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    search: Option<String>,
    per_page: Option<i64>,
}

#[get("/api/search/{search_type}")]
async fn search_entities(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ReportError> {
    let search_type = SearchType::parse(&path.into_inner())?;
    let term = query.search.as_deref().unwrap_or("");

    let results = search(pool.get_ref(), search_type, term, query.per_page).await?;
    log::debug!("{} search '{}': {} results", search_type.as_str(), term, results.len());

    Ok(HttpResponse::Ok().json(results))
}

/// A change to the items picked in a search box.
#[derive(Deserialize)]
pub struct SelectionChange {
    #[serde(default)]
    selected: Vec<SelectedItem>,
    add: Option<SelectedItem>,
    remove: Option<String>,
}

#[derive(Serialize)]
struct SelectionView {
    selected: Vec<SelectedItem>,
    tags: Vec<String>,
}

#[post("/api/search/selection")]
async fn update_selection(change: web::Json<SelectionChange>) -> impl Responder {
    let change = change.into_inner();
    let mut selected = change.selected;

    if let Some(id) = change.remove.as_deref() {
        selected = remove_result(&selected, id);
    }
    if let Some(item) = change.add {
        if let Some(next) = select_result(&selected, item) {
            selected = next;
        }
    }

    let tags = tag_labels(&selected);
    HttpResponse::Ok().json(SelectionView { selected, tags })
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(update_selection);
    cfg.service(search_entities);
}
