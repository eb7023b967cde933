use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use warp::filters::BoxedFilter;
use warp::http::header::{HeaderValue, CONTENT_TYPE, ETAG};
use warp::http::{Response, StatusCode};
use warp::reply::Response as WarpResponse;
use warp::{Filter, Rejection, Reply};
use xxhash_rust::xxh3::xxh3_64;

use super::AppState;
use crate::models::{MediaDescriptor, RowModel};
use crate::scanner::ListingError;

const LOAD_FAILED: &str = "Failed to load images";

#[derive(Debug, Default, Deserialize)]
pub struct CollectionQuery {
    pub collection: Option<String>,
    /// Older clients name the collection `gallery`.
    pub gallery: Option<String>,
}

impl CollectionQuery {
    fn name<'a>(&'a self, default: &'a str) -> &'a str {
        self.collection
            .as_deref()
            .or(self.gallery.as_deref())
            .unwrap_or(default)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct GalleryBody {
    rows: Vec<RowModel>,
}

/// Every route the site serves.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let images = warp::path!("api" / "images")
        .or(warp::path!("images"))
        .unify()
        .and(warp::get())
        .and(warp::query::<CollectionQuery>())
        .and(warp::header::optional::<String>("if-none-match"))
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_images);

    let tabs = warp::path!("api" / "tabs")
        .and(warp::get())
        .and(with_state(Arc::clone(&state)))
        .map(|state: Arc<AppState>| warp::reply::json(&state.config.tabs));

    let gallery = warp::path!("api" / "gallery")
        .and(warp::get())
        .and(warp::query::<CollectionQuery>())
        .and(with_state(Arc::clone(&state)))
        .and_then(handle_gallery);

    let media = url_prefix(&state.config.url_prefix)
        .and(warp::fs::dir(state.config.media_root.clone()));

    images
        .or(tabs)
        .or(gallery)
        .or(media)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

/// Matches the configured URL prefix one segment at a time.
fn url_prefix(prefix: &str) -> BoxedFilter<()> {
    prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment.to_string())).boxed()
        })
}

async fn handle_images(
    query: CollectionQuery,
    if_none_match: Option<String>,
    state: Arc<AppState>,
) -> Result<WarpResponse, Rejection> {
    let collection = query.name(&state.config.default_collection);
    let items = match state.lister.list_async(collection).await {
        Ok(items) => items,
        Err(e) => return Ok(listing_error(collection, e)),
    };

    let body = match serde_json::to_vec(&items) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to serialize listing for {}: {}", collection, e);
            return Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILED));
        }
    };

    let etag = listing_etag(&body);
    if if_none_match.is_some_and(|header| etag_matches(&header, &etag)) {
        debug!("Listing for {} not modified", collection);
        return Ok(warp::reply::with_status(warp::reply(), StatusCode::NOT_MODIFIED).into_response());
    }

    let mut response: WarpResponse = Response::new(body.into());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(ETAG, value);
    }
    Ok(response)
}

async fn handle_gallery(
    query: CollectionQuery,
    state: Arc<AppState>,
) -> Result<WarpResponse, Rejection> {
    let collection = query.name(&state.config.default_collection);
    let items: Vec<MediaDescriptor> = match state.lister.list_async(collection).await {
        Ok(items) => items,
        Err(e) => return Ok(listing_error(collection, e)),
    };

    let rows = state.arrange_rows(items);
    debug!("Arranged {} rows for {}", rows.len(), collection);
    Ok(warp::reply::json(&GalleryBody { rows }).into_response())
}

fn listing_error(collection: &str, e: ListingError) -> WarpResponse {
    match e {
        ListingError::InvalidCollection(_) => {
            warn!("Rejected listing request: {}", e);
            error_reply(StatusCode::BAD_REQUEST, "Invalid collection")
        }
        e => {
            error!("Error reading gallery {}: {}", collection, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, LOAD_FAILED)
        }
    }
}

fn error_reply(status: StatusCode, message: &str) -> WarpResponse {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message }), status)
        .into_response()
}

/// Quoted xxh3 of the serialized listing.
pub fn listing_etag(body: &[u8]) -> String {
    format!("\"{:016x}\"", xxh3_64(body))
}

/// Weak comparison of an `If-None-Match` value against `etag`: `*`, or any
/// listed tag with an optional `W/` prefix.
fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|tag| {
        tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag
    })
}

async fn handle_rejection(err: Rejection) -> Result<WarpResponse, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not found"));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }
    if err.find::<warp::reject::InvalidQuery>().is_some() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid query"));
    }
    error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, Arc<AppState>) {
        let root = tempdir().unwrap();
        let config = Config {
            media_root: root.path().to_path_buf(),
            shuffle_seed: Some(5),
            ..Config::default()
        };
        (root, Arc::new(AppState::new(config)))
    }

    fn add_image(root: &Path, collection: &str, name: &str, width: u32, height: u32) {
        let dir = root.join(collection);
        fs::create_dir_all(&dir).unwrap();
        image::RgbImage::new(width, height).save(dir.join(name)).unwrap();
    }

    #[tokio::test]
    async fn test_listing_missing_collection_is_empty_and_created() {
        let (root, state) = setup();
        let res = warp::test::request()
            .path("/api/images?gallery=outfit2")
            .reply(&routes(state))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(&res.body()[..], b"[]");
        assert!(root.path().join("outfit2").is_dir());
    }

    #[tokio::test]
    async fn test_listing_json_and_etag() {
        let (root, state) = setup();
        add_image(root.path(), "outfit1", "tall-look.png", 30, 60);
        add_image(root.path(), "outfit1", "wide-look.png", 90, 30);
        let routes = routes(state);

        let res = warp::test::request()
            .path("/images?collection=outfit1")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let etag = res.headers()[ETAG].to_str().unwrap().to_string();
        assert_eq!(etag, listing_etag(res.body()));

        let items: Vec<MediaDescriptor> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].src, "/gallery-images/outfit1/wide-look.png");
        assert_eq!(items[0].scaled_width, 1200);
        assert_eq!(items[1].scaled_width, 200);

        let res = warp::test::request()
            .path("/api/images")
            .header("if-none-match", etag)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_listing_not_modified_for_weak_and_listed_tags() {
        let (root, state) = setup();
        add_image(root.path(), "outfit1", "look.png", 40, 40);
        let routes = routes(state);

        let res = warp::test::request().path("/api/images").reply(&routes).await;
        let etag = res.headers()[ETAG].to_str().unwrap().to_string();

        for header in [
            format!("W/{}", etag),
            format!("\"0000000000000000\", {}", etag),
            "*".to_string(),
        ] {
            let res = warp::test::request()
                .path("/api/images")
                .header("if-none-match", header.as_str())
                .reply(&routes)
                .await;
            assert_eq!(res.status(), StatusCode::NOT_MODIFIED, "{}", header);
        }

        let res = warp::test::request()
            .path("/api/images")
            .header("if-none-match", "\"0000000000000000\"")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn test_etag_matches() {
        let etag = "\"00ff\"";
        assert!(etag_matches("\"00ff\"", etag));
        assert!(etag_matches("W/\"00ff\"", etag));
        assert!(etag_matches("\"aa\",  W/\"00ff\" ", etag));
        assert!(etag_matches("*", etag));
        assert!(!etag_matches("\"00fe\"", etag));
        assert!(!etag_matches("00ff", etag));
    }

    #[tokio::test]
    async fn test_listing_rejects_bad_collection() {
        let (_root, state) = setup();
        let res = warp::test::request()
            .path("/api/images?gallery=..%2Fsecrets")
            .reply(&routes(state))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_tabs() {
        let (_root, state) = setup();
        let res = warp::test::request().path("/api/tabs").reply(&routes(state)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let tabs: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(tabs[0]["id"], "outfit1");
        assert_eq!(tabs[3]["label"], "OTHER STYLES");
    }

    #[tokio::test]
    async fn test_gallery_rows_cover_listing() {
        let (root, state) = setup();
        for (i, (w, h)) in [(40, 40), (80, 40), (30, 40), (60, 40), (50, 40)].iter().enumerate() {
            add_image(root.path(), "other", &format!("{}.png", i), *w, *h);
        }

        let res = warp::test::request()
            .path("/api/gallery?collection=other")
            .reply(&routes(state))
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        let rows = body["rows"].as_array().unwrap();
        let count: usize = rows.iter().map(|r| r["items"].as_array().unwrap().len()).sum();
        assert_eq!(count, 5);
        for row in rows {
            assert!(row["width"].as_u64().unwrap() <= 2000);
        }
    }

    #[tokio::test]
    async fn test_serves_media_files() {
        let (root, state) = setup();
        add_image(root.path(), "outfit3", "shot.png", 4, 4);

        let res = warp::test::request()
            .path("/gallery-images/outfit3/shot.png")
            .reply(&routes(state))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.body().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (_root, state) = setup();
        let res = warp::test::request().path("/nope").reply(&routes(state)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_collection_query_precedence() {
        let query = CollectionQuery {
            collection: Some("a".into()),
            gallery: Some("b".into()),
        };
        assert_eq!(query.name("d"), "a");
        assert_eq!(CollectionQuery::default().name("d"), "d");
    }
}
