use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clir_core::persist::{save_index, IndexPaths};
use clir_core::{Document, Index, SearchConfig};
use clir_server::{router, AppState, Languages};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let index = Index::build(vec![
        Document::new(1, "Cats and Dogs", "Cats are great pets"),
        Document::new(2, "Weather Report", "Rain expected cats"),
        Document::new(3, "Space News", "Rocket launch successful"),
    ])
    .unwrap();
    save_index(&IndexPaths::new(dir), &index).unwrap();
}

fn app(dir: &std::path::Path) -> Router {
    let config = SearchConfig::default();
    let languages = Languages::offline(&config);
    let state = AppState::load(&dir.to_string_lossy(), config, languages, Some("secret".into())).unwrap();
    router(state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());

    let (status, json) = get(app(dir.path()), "/search?q=cats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["detected_language"], "en");
    assert_eq!(json["translated"], "cats");
    let arr = json["results"].as_array().unwrap();
    let ids: Vec<u64> = arr.iter().map(|r| r["doc_id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(arr[0]["snippet"], "Cats are great pets");
}

#[tokio::test]
async fn k_limits_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let (_, json) = get(app(dir.path()), "/search?q=cats&k=1").await;
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn empty_and_unmatched_queries_are_not_errors() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let (status, json) = get(app(dir.path()), "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "empty_query");

    let (status, json) = get(app(dir.path()), "/search?q=unicorn").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "no_results");
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn doc_lookup() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let (status, json) = get(app(dir.path()), "/doc/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Space News");

    let (status, _) = get(app(dir.path()), "/doc/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_requires_admin_token() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let req = Request::post("/index/upload").body(Body::from("title,content\nA,B\n")).unwrap();
    let (status, _) = send(app(dir.path()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn upload_rebuilds_served_index() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = app(dir.path());

    let csv = "title,content\nOcean Life,Whales migrate south\nMountains,Snow on the peaks\n";
    let req = Request::post("/index/upload")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::from(csv))
        .unwrap();
    let (status, body) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_docs"], 2);

    let (_, json) = get(app.clone(), "/search?q=whales").await;
    assert_eq!(json["results"][0]["title"], "Ocean Life");
    let (_, json) = get(app.clone(), "/search?q=cats").await;
    assert_eq!(json["status"], "no_results");

    // the rebuilt snapshot was persisted too
    let reloaded = clir_core::persist::load_index(&IndexPaths::new(dir.path())).unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[tokio::test]
async fn bad_upload_keeps_old_index() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = app(dir.path());

    let req = Request::post("/index/upload")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::from("name,body\nA,B\n"))
        .unwrap();
    let (status, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = get(app, "/search?q=cats").await;
    assert_eq!(json["results"].as_array().unwrap().len(), 2);
}

fn upload(csv: &'static str) -> Request<Body> {
    Request::post("/index/upload")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::from(csv))
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_uploads_serve_what_was_persisted() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let app = app(dir.path());

    let ocean = "title,content\nOcean Life,Whales migrate south\nReefs,Coral and fish\n";
    let alpine = "title,content\nMountains,Snow on the peaks\nGlaciers,Ice moves slowly\nValleys,Rivers carve rock\n";
    for _ in 0..20 {
        let (a, b) = tokio::join!(send(app.clone(), upload(ocean)), send(app.clone(), upload(alpine)));
        assert_eq!(a.0, StatusCode::OK);
        assert_eq!(b.0, StatusCode::OK);

        let persisted = clir_core::persist::load_index(&IndexPaths::new(dir.path())).unwrap();
        let (_, whales) = get(app.clone(), "/search?q=whales").await;
        let (_, snow) = get(app.clone(), "/search?q=snow").await;
        match persisted.len() {
            2 => {
                assert_eq!(whales["total_hits"], 1);
                assert_eq!(snow["status"], "no_results");
            }
            3 => {
                assert_eq!(snow["total_hits"], 1);
                assert_eq!(whales["status"], "no_results");
            }
            n => panic!("unexpected persisted size {n}"),
        }
    }
    // old snapshots are pruned after each rebuild
    assert_eq!(std::fs::read_dir(dir.path().join("snapshots")).unwrap().count(), 1);
}
