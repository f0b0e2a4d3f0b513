use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::{json, Value};

use pasal_analytics::routes;

async fn post_selection(body: Value) -> Value {
    let app = test::init_service(App::new().configure(routes::init)).await;
    let req = test::TestRequest::post()
        .uri("/api/search/selection")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    test::read_body_json(resp).await
}

#[actix_web::test]
async fn adding_a_new_item_appends_it_and_labels_tags() {
    let body = post_selection(json!({
        "selected": [{ "id": "1", "label": "Cap" }],
        "add": { "id": "2", "label": "Hoodie" },
    }))
    .await;

    assert_eq!(body["selected"].as_array().unwrap().len(), 2);
    assert_eq!(body["tags"], json!(["Cap (1 of 2)", "Hoodie (2 of 2)"]));
}

#[actix_web::test]
async fn adding_a_selected_id_changes_nothing() {
    let body = post_selection(json!({
        "selected": [{ "id": "1", "label": "Cap" }],
        "add": { "id": "1", "label": "Other" },
    }))
    .await;

    assert_eq!(body["selected"], json!([{ "id": "1", "label": "Cap" }]));
}

#[actix_web::test]
async fn removing_drops_the_id() {
    let body = post_selection(json!({
        "selected": [{ "id": "1", "label": "Cap" }, { "id": "2" }],
        "remove": "1",
    }))
    .await;

    assert_eq!(body["selected"], json!([{ "id": "2", "label": null }]));
    assert_eq!(body["tags"], json!([]));
}
