use actix_web::{get, web, HttpResponse, Responder};

pub mod reports;
pub mod search;

#[get("/api/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
    reports::init(cfg);
    search::init(cfg);
}
