use anyhow::Result;
use serde_json::{Value, json};
use std::path::PathBuf;

use sarfetch::catalog::StacCatalog;
use sarfetch::data_models::{Band, DownloadStatus, SearchRequest};
use sarfetch::errors::FetchError;
use sarfetch::finder::SceneFinder;

mod test_helpers {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    static TEST_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    pub fn unique_save_dir() -> PathBuf {
        let count = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        std::env::temp_dir().join(format!("sarfetch_test_{}_{}", timestamp, count))
    }

    pub fn cleanup_save_dir(dir: &PathBuf) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[derive(Clone)]
    struct MockState {
        items: Arc<Value>,
        search_hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    /// In-process stand-in for the STAC catalog and the asset host.
    /// `POST /v1/search` returns the canned item collection; `GET /assets/X`
    /// serves `bytes-for-X`, except names starting with "broken" which 500.
    pub struct MockCatalog {
        pub base_url: String,
        search_hits: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    impl MockCatalog {
        /// `items_for` receives the asset base URL so canned items can point
        /// their hrefs back at this same server.
        pub async fn spawn(items_for: impl FnOnce(&str) -> Vec<Value>) -> Result<MockCatalog> {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
            let addr = listener.local_addr()?;
            let items = items_for(&format!("http://{addr}/assets"));

            let state = MockState {
                items: Arc::new(json!({ "type": "FeatureCollection", "features": items })),
                search_hits: Arc::new(AtomicUsize::new(0)),
                last_body: Arc::new(Mutex::new(None)),
            };
            let search_hits = state.search_hits.clone();
            let last_body = state.last_body.clone();

            let router = Router::new()
                .route("/v1/search", post(search_handler))
                .route("/assets/:name", get(asset_handler))
                .with_state(state);

            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            Ok(MockCatalog {
                base_url: format!("http://{addr}/v1"),
                search_hits,
                last_body,
            })
        }

        pub fn search_hits(&self) -> usize {
            self.search_hits.load(Ordering::SeqCst)
        }

        pub fn last_search_body(&self) -> Option<Value> {
            self.last_body.lock().unwrap().clone()
        }

        pub fn finder(&self, save_dir: &PathBuf) -> SceneFinder {
            SceneFinder::new(StacCatalog::new(self.base_url.clone()), save_dir.clone())
        }
    }

    async fn search_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
        state.search_hits.fetch_add(1, Ordering::SeqCst);
        *state.last_body.lock().unwrap() = Some(body);
        Json((*state.items).clone())
    }

    async fn asset_handler(Path(name): Path<String>) -> axum::response::Response {
        if name.starts_with("broken") {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        } else {
            format!("bytes-for-{name}").into_response()
        }
    }

    pub fn scene(id: &str, datetime: &str, assets: Value) -> Value {
        json!({
            "id": id,
            "properties": { "datetime": datetime },
            "assets": assets
        })
    }

    pub fn request(date: &str) -> SearchRequest {
        SearchRequest::new(35.18, 129.08, date.parse().unwrap())
    }
}

use test_helpers::*;

#[tokio::test]
async fn downloads_both_bands_of_the_nearest_scene() -> Result<()> {
    // 2023-05-29 is 3 days from the requested date, 2023-06-03 only 2.
    let mock = MockCatalog::spawn(|assets| {
        vec![
            scene(
                "S1A_FAR",
                "2023-05-29T00:00:00Z",
                json!({
                    "vv": { "href": format!("{assets}/far-vv") },
                    "vh": { "href": format!("{assets}/far-vh") }
                }),
            ),
            scene(
                "S1A_NEAR",
                "2023-06-03T00:00:00Z",
                json!({
                    "vv": { "href": format!("{assets}/near-vv") },
                    "vh": { "href": format!("{assets}/near-vh") }
                }),
            ),
        ]
    })
    .await?;

    let save_dir = unique_save_dir();
    let result = mock
        .finder(&save_dir)
        .find_and_download(&request("2023-06-01"))
        .await?;

    assert_eq!(result.scene_id, "S1A_NEAR");
    assert_eq!(result.status, DownloadStatus::Success);
    assert_eq!(result.files.len(), 2);
    assert!(result.issues.is_empty());

    let vv = result.files.iter().find(|f| f.band == Band::VV).unwrap();
    assert_eq!(vv.path, save_dir.join("S1A_NEAR_vv.tif"));
    assert_eq!(std::fs::read_to_string(&vv.path)?, "bytes-for-near-vv");
    let vh = result.files.iter().find(|f| f.band == Band::VH).unwrap();
    assert_eq!(std::fs::read_to_string(&vh.path)?, "bytes-for-near-vh");

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn failed_vh_download_yields_partial_with_only_vv() -> Result<()> {
    let mock = MockCatalog::spawn(|assets| {
        vec![scene(
            "S1A_X",
            "2023-06-02T09:00:00Z",
            json!({
                "vv": { "href": format!("{assets}/good-vv") },
                "vh": { "href": format!("{assets}/broken-vh") }
            }),
        )]
    })
    .await?;

    let save_dir = unique_save_dir();
    let result = mock
        .finder(&save_dir)
        .find_and_download(&request("2023-06-01"))
        .await?;

    assert_eq!(result.status, DownloadStatus::Partial);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].band, Band::VV);
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].contains("VH"));

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn missing_vh_asset_yields_partial_not_failure() -> Result<()> {
    let mock = MockCatalog::spawn(|assets| {
        vec![scene(
            "S1A_SINGLEPOL",
            "2023-06-02T09:00:00Z",
            json!({ "vv": { "href": format!("{assets}/only-vv") } }),
        )]
    })
    .await?;

    let save_dir = unique_save_dir();
    let result = mock
        .finder(&save_dir)
        .find_and_download(&request("2023-06-01"))
        .await?;

    assert_eq!(result.status, DownloadStatus::Partial);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].band, Band::VV);
    assert!(result.issues[0].contains("no VH asset"));

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn no_saved_band_yields_failure_status_not_an_error() -> Result<()> {
    let mock = MockCatalog::spawn(|assets| {
        vec![scene(
            "S1A_ALLBROKEN",
            "2023-06-02T09:00:00Z",
            json!({
                "vv": { "href": format!("{assets}/broken-vv") },
                "vh": { "href": format!("{assets}/broken-vh") }
            }),
        )]
    })
    .await?;

    let save_dir = unique_save_dir();
    let result = mock
        .finder(&save_dir)
        .find_and_download(&request("2023-06-01"))
        .await?;

    assert_eq!(result.status, DownloadStatus::Failure);
    assert!(result.files.is_empty());
    assert_eq!(result.issues.len(), 2);

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn zero_catalog_matches_is_no_scenes_found() -> Result<()> {
    let mock = MockCatalog::spawn(|_| vec![]).await?;
    let save_dir = unique_save_dir();

    let err = mock
        .finder(&save_dir)
        .find_and_download(&request("2023-06-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NoScenesFound { day_window: 10, .. }));

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn invalid_latitude_fails_before_any_network_call() -> Result<()> {
    let mock = MockCatalog::spawn(|_| vec![]).await?;
    let save_dir = unique_save_dir();

    let mut req = request("2023-06-01");
    req.lat = 200.0;
    let err = mock
        .finder(&save_dir)
        .find_and_download(&req)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::InvalidParameters(_)));
    assert_eq!(mock.search_hits(), 0);

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn zero_windows_send_a_degenerate_filter() -> Result<()> {
    let mock = MockCatalog::spawn(|assets| {
        vec![scene(
            "S1A_SAMEDAY",
            "2023-06-01T12:00:00Z",
            json!({
                "vv": { "href": format!("{assets}/d-vv") },
                "vh": { "href": format!("{assets}/d-vh") }
            }),
        )]
    })
    .await?;

    let save_dir = unique_save_dir();
    let mut req = request("2023-06-01");
    req.day_window = 0;
    req.deg_window = 0.0;

    let result = mock.finder(&save_dir).find_and_download(&req).await?;
    assert_eq!(result.status, DownloadStatus::Success);

    let body = mock.last_search_body().unwrap();
    assert_eq!(
        body["datetime"],
        json!("2023-06-01T00:00:00Z/2023-06-01T23:59:59Z")
    );
    assert_eq!(body["bbox"], json!([129.08, 35.18, 129.08, 35.18]));
    assert_eq!(body["collections"], json!(["sentinel-1-grd"]));

    cleanup_save_dir(&save_dir);
    Ok(())
}

#[tokio::test]
async fn unreachable_catalog_is_search_failed() -> Result<()> {
    // Port 1 is never listening.
    let finder = SceneFinder::new(StacCatalog::new("http://127.0.0.1:1/v1"), unique_save_dir());
    let err = finder
        .find_and_download(&request("2023-06-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::SearchFailed(_)));
    Ok(())
}
