//! HTTP surface exercised through the router without a socket.

mod support;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use menu_cache::infra::http::build_router;
use serde_json::{Value, json};
use tower::ServiceExt;

use support::Harness;

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn seeded_router(h: &Harness) -> Router {
    let router = build_router(h.api_state());
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/menus",
        Some(json!({"id": "m1", "title": "My menu 1", "description": "Main"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/menus/m1/submenus",
        Some(json!({"id": "s1", "title": "Soups", "description": "Hot"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/menus/m1/submenus/s1/dishes",
        Some(json!({"id": "d1", "title": "Borscht", "description": "Red", "price": "15.50343"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    router
}

#[tokio::test]
async fn create_and_read_back_the_hierarchy() {
    let h = Harness::new();
    let router = seeded_router(&h).await;

    let (status, menu) = send(&router, Method::GET, "/api/v1/menus/m1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(menu["id"], "m1");
    assert_eq!(menu["title"], "My menu 1");
    assert_eq!(menu["submenus_count"], 1);
    assert_eq!(menu["dishes_count"], 1);

    let (status, dish) = send(
        &router,
        Method::GET,
        "/api/v1/menus/m1/submenus/s1/dishes/d1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dish["price"], "15.50");

    let (status, submenus) = send(&router, Method::GET, "/api/v1/menus/m1/submenus", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submenus[0]["dishes_count"], 1);
}

#[tokio::test]
async fn missing_levels_are_named_in_the_detail() {
    let h = Harness::new();
    let router = seeded_router(&h).await;

    let (status, body) = send(&router, Method::GET, "/api/v1/menus/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "menu not found");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/menus/m1/submenus/nope/dishes",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "submenu not found");

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/v1/menus/m1/submenus/s1/dishes/nope",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "dish not found");
}

#[tokio::test]
async fn patch_then_delete_menu() {
    let h = Harness::new();
    let router = seeded_router(&h).await;
    send(&router, Method::GET, "/api/v1/menus/m1", None).await;

    let (status, updated) = send(
        &router,
        Method::PATCH,
        "/api/v1/menus/m1",
        Some(json!({"title": "Updated"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Updated");
    assert_eq!(updated["description"], "Main");

    let (_, fetched) = send(&router, Method::GET, "/api/v1/menus/m1", None).await;
    assert_eq!(fetched["title"], "Updated");

    let (status, deleted) = send(&router, Method::DELETE, "/api/v1/menus/m1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        deleted,
        json!({"status": true, "message": "The menu has been deleted"})
    );

    let (status, _) = send(&router, Method::GET, "/api/v1/menus/m1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, list) = send(&router, Method::GET, "/api/v1/menus", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn whole_tree_includes_discounted_prices() {
    let h = Harness::new();
    let router = seeded_router(&h).await;

    let (status, dish) = send(
        &router,
        Method::PUT,
        "/api/v1/menus/m1/submenus/s1/dishes/d1/discount",
        Some(json!({"discount": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dish["price"], "13.95");

    let (status, tree) = send(&router, Method::GET, "/api/v1/menus_whole", None).await;
    assert_eq!(status, StatusCode::OK);
    let menus = tree["menus"].as_array().expect("menus");
    assert_eq!(menus.len(), 1);
    assert_eq!(menus[0]["submenus"][0]["id"], "s1");
    assert_eq!(menus[0]["submenus"][0]["dishes"][0]["price"], "13.95");

    let (status, dish) = send(
        &router,
        Method::DELETE,
        "/api/v1/menus/m1/submenus/s1/dishes/d1/discount",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dish["price"], "15.50");
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let h = Harness::new();
    let router = seeded_router(&h).await;

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/v1/menus/m1/submenus/s1/dishes/d1/discount",
        Some(json!({"discount": "150"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/menus",
        Some(json!({"id": "m1", "title": "Duplicate"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/menus",
        Some(json!({"id": "a/b", "title": "Slash"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_outage_maps_to_service_unavailable() {
    let h = Harness::new();
    let router = seeded_router(&h).await;

    let (status, _) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    h.catalog.set_down(true);
    let (status, _) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&router, Method::GET, "/api/v1/menus", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "store_unavailable");
}
