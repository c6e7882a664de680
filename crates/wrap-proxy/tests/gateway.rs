//! End-to-end tests: router + HTTP addon client against wiremock upstreams.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wrap_proxy::proxy::http::HttpAddonClient;
use wrap_proxy::userdata::{UpstreamConfig, UserData};
use wrap_proxy::{router, AppState, ProxyConfig};

fn app(config: ProxyConfig) -> Router {
    let client = HttpAddonClient::with_client(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap(),
    );
    router(AppState::new(config, Arc::new(client)))
}

fn user_data(upstreams: &[&MockServer]) -> String {
    UserData::new(
        upstreams
            .iter()
            .map(|server| UpstreamConfig::new(format!("{}/manifest.json", server.uri())).unwrap())
            .collect(),
    )
    .unwrap()
    .encode()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_catalog_routed_to_second_upstream() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/movie/trending.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"metas":[{"id":"tt1","type":"movie","name":"One"}]}"#),
        )
        .expect(1)
        .mount(&b)
        .await;

    let ud = user_data(&[&a, &b]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/catalog/movie/1::trending.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert_eq!(
        body_string(resp).await,
        r#"{"metas":[{"id":"tt1","type":"movie","name":"One"}]}"#
    );
}

#[tokio::test]
async fn test_single_upstream_ids_are_not_split() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/movie/1::trending/skip=100.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&a)
        .await;

    let ud = user_data(&[&a]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!(
            "/stremio/wrap/{ud}/catalog/movie/1::trending/skip=100.json"
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_client_ip_forwarded() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/addon_catalog/all/community.json"))
        .and(header("x-forwarded-for", "203.0.113.9"))
        .and(header("x-real-ip", "203.0.113.9"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"addons":[]}"#))
        .expect(1)
        .mount(&a)
        .await;

    let mut config = ProxyConfig::default();
    config.server.trust_forwarded_for = true;

    let ud = user_data(&[&a, &b]);
    let resp = send(
        app(config),
        Request::get(format!("/stremio/wrap/{ud}/addon_catalog/all/0::community.json"))
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_id_makes_no_upstream_call() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    for server in [&a, &b] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let ud = user_data(&[&a, &b]);
    for id in ["abc::x", "novalue", "2::x"] {
        let resp = send(
            app(ProxyConfig::default()),
            Request::get(format!("/stremio/wrap/{ud}/catalog/movie/{id}.json"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{id}");
        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_upstream_error_response_relayed() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&b)
        .await;

    let ud = user_data(&[&a, &b]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/stream/movie/1::tt1.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_string(resp).await, "slow down");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let a = MockServer::start().await;
    let ud = UserData::new(vec![
        UpstreamConfig::new(a.uri()).unwrap(),
        UpstreamConfig::new("http://127.0.0.1:1").unwrap(),
    ])
    .unwrap()
    .encode();

    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/meta/movie/1::tt1.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_string(resp).await,
        r#"{"error":"upstream request failed"}"#
    );
}

#[tokio::test]
async fn test_manifest_merges_upstreams() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "a", "version": "1.0.0", "name": "A",
            "types": ["movie"], "resources": ["catalog"],
            "catalogs": [{"type": "movie", "id": "trending", "name": "Trending"}]
        })))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "b", "version": "2.0.0", "name": "B",
            "types": ["series"], "resources": ["catalog", "meta"],
            "catalogs": [{"type": "series", "id": "trending", "name": "Trending"}]
        })))
        .mount(&b)
        .await;

    let ud = user_data(&[&a, &b]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/manifest.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let manifest: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(manifest["id"], "wrap.addon");
    assert_eq!(manifest["catalogs"][0]["id"], "0::trending");
    assert_eq!(manifest["catalogs"][1]["id"], "1::trending");
    assert_eq!(manifest["catalogs"][1]["name"], "Trending");
    assert_eq!(manifest["types"], serde_json::json!(["movie", "series"]));
    assert_eq!(manifest["resources"], serde_json::json!(["catalog", "meta"]));
}

#[tokio::test]
async fn test_manifest_upstream_failure_is_bad_gateway() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&a)
        .await;

    let ud = user_data(&[&a]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/manifest.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_extra_forwarded_with_escapes_intact() {
    let a = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/movie/top/search=Rock%20%26%20Roll&skip=20.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"metas":[]}"#))
        .expect(1)
        .mount(&a)
        .await;

    let ud = user_data(&[&a]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!(
            "/stremio/wrap/{ud}/catalog/movie/top/search=Rock%20%26%20Roll&skip=20.json"
        ))
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ids_built_from_advertised_prefixes_are_routed() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "a", "version": "1.0.0", "name": "A",
            "types": ["movie"], "resources": ["meta"], "idPrefixes": ["tt"]
        })))
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/meta/movie/tt0111161.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"meta":{}}"#))
        .expect(1)
        .mount(&a)
        .await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "b", "version": "1.0.0", "name": "B",
            "types": ["series"], "resources": ["meta"], "idPrefixes": ["kitsu:"]
        })))
        .mount(&b)
        .await;

    let ud = user_data(&[&a, &b]);
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/manifest.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let manifest: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(manifest["idPrefixes"], serde_json::json!(["0::tt", "1::kitsu:"]));

    let prefix = manifest["idPrefixes"][0].as_str().unwrap();
    let resp = send(
        app(ProxyConfig::default()),
        Request::get(format!("/stremio/wrap/{ud}/meta/movie/{prefix}0111161.json"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}
