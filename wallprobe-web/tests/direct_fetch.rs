use std::time::Duration;

use wallprobe_common::{Classifier, Outcome};
use wallprobe_http::HttpClient;
use wallprobe_web::{DirectFetcher, PageFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fetcher() -> DirectFetcher {
    DirectFetcher::new(HttpClient::new().unwrap(), Classifier::default())
}

async fn serve(status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn large_ok_page_is_a_success() {
    let body = format!("<title>  Hot questions </title>{}", "a".repeat(10_000 - 31));
    assert_eq!(body.len(), 10_000);
    let server = serve(200, body).await;

    let result = fetcher()
        .fetch(&format!("{}/page", server.uri()), TIMEOUT)
        .await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.content_length, 10_000);
    assert_eq!(result.title.as_deref(), Some("Hot questions"));
    assert!(result.error.is_none());
    assert_eq!(result.preview.as_ref().map(|p| p.chars().count()), Some(150));
}

#[tokio::test]
async fn small_ok_page_is_partial() {
    let server = serve(200, "tiny".to_string()).await;
    let result = fetcher()
        .fetch(&format!("{}/page", server.uri()), TIMEOUT)
        .await;
    assert_eq!(result.outcome, Outcome::PartialSuccess);
    assert_eq!(result.content_length, 4);
    assert!(result.preview.is_none());
}

#[tokio::test]
async fn forbidden_is_blocked_regardless_of_body() {
    let server = serve(403, "x".repeat(20_000)).await;
    let result = fetcher()
        .fetch(&format!("{}/page", server.uri()), TIMEOUT)
        .await;
    assert_eq!(result.outcome, Outcome::Blocked);
    assert_eq!(result.status_code, Some(403));
}

#[tokio::test]
async fn redirect_is_reported_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://www.zhihu.com/signin"),
        )
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri(), TIMEOUT).await;
    assert_eq!(result.outcome, Outcome::Redirected);
    assert_eq!(result.location.as_deref(), Some("https://www.zhihu.com/signin"));
}

#[tokio::test]
async fn empty_encoded_redirect_keeps_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("content-encoding", "gzip")
                .insert_header("location", "https://www.zhihu.com/signin"),
        )
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri(), TIMEOUT).await;
    assert_eq!(result.outcome, Outcome::Redirected, "{:?}", result.error);
    assert_eq!(result.status_code, Some(302));
    assert_eq!(result.location.as_deref(), Some("https://www.zhihu.com/signin"));
}

#[tokio::test]
async fn empty_brotli_forbidden_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).insert_header("content-encoding", "br"))
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri(), TIMEOUT).await;
    assert_eq!(result.outcome, Outcome::Blocked, "{:?}", result.error);
    assert_eq!(result.content_length, 0);
}

#[tokio::test]
async fn server_errors_fail() {
    let server = serve(500, "oops".to_string()).await;
    let result = fetcher()
        .fetch(&format!("{}/page", server.uri()), TIMEOUT)
        .await;
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.status_code, Some(500));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&server.uri(), Duration::from_millis(100))
        .await;
    assert_eq!(result.outcome, Outcome::TimedOut);
    assert_eq!(result.status_code, None);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn malformed_url_fails_without_status() {
    let result = fetcher().fetch("zhihu dot com", TIMEOUT).await;
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.status_code, None);
    assert!(result.error.unwrap().contains("invalid URL"));
}

#[tokio::test]
async fn refused_connection_fails() {
    // Bind then drop a listener to get a port nobody is serving.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = fetcher()
        .fetch(&format!("http://127.0.0.1:{port}/"), TIMEOUT)
        .await;
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.error.unwrap().contains("network error"));
}
