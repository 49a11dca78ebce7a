use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;
use trip_hub::api;
use trip_hub_core::{DocumentStore, TripService};

fn app(dir: &tempfile::TempDir) -> Router {
    let store = Arc::new(DocumentStore::open(dir.path()).unwrap());
    api::router(TripService::new(store))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(&app(&dir), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn unseen_chat_gets_default_document() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let (status, body) = send(&app, "GET", "/api/data?chat_id=-5046151729", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["name"], "New Trip");
    assert_eq!(body["emergency"][0]["number"], "112");
    assert!(dir.path().join("trip__5046151729.json").is_file());

    let (_, default_doc) = send(&app, "GET", "/api/data", None).await;
    assert_eq!(default_doc, body);
    assert!(dir.path().join("data.json").is_file());
}

#[tokio::test]
async fn save_requires_trip_and_days() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let doc = json!({
        "trip": {"name": "Morocco", "dates": "4–8 Mar 2026"},
        "days": [{"id": "wed", "label": "Wed 4 Mar", "title": "Arrivée à Marrakech", "emoji": "🕌", "stops": []}]
    });
    let (status, body) = send(&app, "PUT", "/api/data?chat_id=g1", Some(doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = send(&app, "POST", "/api/data?chat_id=g1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");

    let (_, stored) = send(&app, "GET", "/api/data?chat_id=g1", None).await;
    assert_eq!(stored["days"][0]["title"], "Arrivée à Marrakech");
}

#[tokio::test]
async fn admin_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let (_, body) = send(&app, "GET", "/api/is_admin?user_id=8&chat_id=g1", None).await;
    assert_eq!(body, json!({"is_admin": true}));

    let add = json!({"requester_id": 7, "user_id": 7, "chat_id": "g1"});
    let (status, _) = send(&app, "POST", "/api/addadmin", Some(add)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/is_admin?user_id=8&chat_id=g1", None).await;
    assert_eq!(body, json!({"is_admin": false}));

    let hijack = json!({"requester_id": 8, "user_id": 8, "chat_id": "g1"});
    let (status, body) = send(&app, "POST", "/api/addadmin", Some(hijack)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "not admin"}));
}

#[tokio::test]
async fn numeric_and_string_chat_ids_share_a_tenant() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let add = json!({"requester_id": 1, "user_id": 1, "chat_id": -42});
    send(&app, "POST", "/api/addadmin", Some(add)).await;

    let (_, body) = send(&app, "GET", "/api/is_admin?user_id=2&chat_id=-42", None).await;
    assert_eq!(body, json!({"is_admin": false}));
}

#[tokio::test]
async fn item_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);
    let entry = json!({"name": "Hotel X", "url": "http://x"});

    let append = json!({"chat_id": "g1", "user_id": 1, "collection": "accoms", "item": entry});
    let (status, doc) = send(&app, "POST", "/api/items", Some(append)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["accoms"].as_array().unwrap().len(), 1);

    let out_of_range = json!({"chat_id": "g1", "user_id": 1, "collection": "accoms", "index": 5});
    let (status, body) = send(&app, "DELETE", "/api/items", Some(out_of_range)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");

    let remove = json!({"chat_id": "g1", "user_id": 1, "collection": "accoms", "index": 0});
    let (status, body) = send(&app, "DELETE", "/api/items", Some(remove)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], entry);

    let (_, doc) = send(&app, "GET", "/api/data?chat_id=g1", None).await;
    assert_eq!(doc["accoms"], json!([]));
}

#[tokio::test]
async fn trip_fields_and_progress() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let update = json!({"chat_id": "g1", "user_id": 1, "dates": "26 Feb – 1 Mar 2026"});
    let (status, doc) = send(&app, "PUT", "/api/trip", Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["trip"], json!({"name": "New Trip", "dates": "26 Feb – 1 Mar 2026"}));

    let tick = json!({"chat_id": "g1", "user_id": 1, "key": "hiking-0", "checked": true});
    let (status, doc) = send(&app, "PUT", "/api/progress", Some(tick)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["groupProgress"], json!({"hiking-0": true}));
}

#[tokio::test]
async fn unknown_collection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let append = json!({"user_id": 1, "collection": "admins", "item": 5});
    let (status, _) = send(&app(&dir), "POST", "/api/items", Some(append)).await;
    assert!(status.is_client_error());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_appends_for_one_chat_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let append = json!({
                "chat_id": "g1",
                "user_id": 1,
                "collection": "accoms",
                "item": {"name": format!("Hotel {i}"), "url": "http://x"}
            });
            send(&app, "POST", "/api/items", Some(append)).await.0
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, doc) = send(&app, "GET", "/api/data?chat_id=g1", None).await;
    assert_eq!(doc["accoms"].as_array().unwrap().len(), 16);
}
