//! Integration tests for `EshopReviewsClient` using wiremock HTTP mocks.

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::Rc;

use heureka_reviews::{EshopReview, EshopReviewsClient, FeedError};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<reviews>
  <review>
    <rating_id>101</rating_id>
    <name>Jana</name>
    <unix_timestamp>1600000000</unix_timestamp>
    <total_rating>4.5</total_rating>
    <delivery_time>5</delivery_time>
    <pros>fast delivery</pros>
    <cons/>
    <summary>happy overall</summary>
    <order_id>A-1</order_id>
  </review>
  <review>
    <rating_id>102</rating_id>
    <name></name>
    <unix_timestamp>1600100000</unix_timestamp>
    <pros/>
    <cons>slow support</cons>
    <summary>meh</summary>
    <order_id>A-2</order_id>
  </review>
</reviews>"#;

async fn serve(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn collecting_client(address: &str) -> (EshopReviewsClient, Rc<RefCell<Vec<EshopReview>>>) {
    let mut client = EshopReviewsClient::new(address);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    client.set_callback(move |review| {
        sink.borrow_mut().push(review.clone());
        ControlFlow::Continue(())
    });
    (client, seen)
}

#[tokio::test]
async fn run_produces_records_in_feed_order() {
    let server = serve(FEED).await;
    let (mut client, seen) = collecting_client(&server.uri());

    let count = client.run().await.expect("run should succeed");
    assert_eq!(count, 2);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].index, 0);
    assert_eq!(seen[0].author, "Jana");
    assert_eq!(seen[0].rating_total, Some(4.5));
    assert_eq!(seen[0].rating_delivery, Some(5.0));
    assert_eq!(seen[1].index, 1);
    assert_eq!(seen[1].author, "");
    assert_eq!(seen[1].order_id, "A-2");
}

#[tokio::test]
async fn absent_ratings_come_through_as_none() {
    let server = serve(FEED).await;
    let (mut client, seen) = collecting_client(&server.uri());
    client.run().await.expect("run should succeed");

    let seen = seen.borrow();
    // First review rated only two of the five dimensions.
    assert_eq!(seen[0].rating_transport_quality, None);
    assert_eq!(seen[0].rating_web_usability, None);
    assert_eq!(seen[0].rating_communication, None);
    // Second review carries no ratings at all.
    assert_eq!(seen[1].rating_total, None);
    assert_eq!(seen[1].rating_delivery, None);
}

#[tokio::test]
async fn malformed_entry_is_skipped_without_consuming_an_index() {
    let feed = "<reviews>\
                <review><name>ok1</name><unix_timestamp>1</unix_timestamp></review>\
                <review><name>broken</review>\
                <review><name>ok2</name><unix_timestamp>2</unix_timestamp></review>\
                </reviews>";
    let server = serve(feed).await;
    let (mut client, seen) = collecting_client(&server.uri());

    let count = client.run().await.expect("run should succeed");
    assert_eq!(count, 2);

    let seen = seen.borrow();
    assert_eq!(
        seen.iter()
            .map(|r| (r.index, r.author.clone()))
            .collect::<Vec<_>>(),
        vec![(0, "ok1".to_owned()), (1, "ok2".to_owned())]
    );
}

#[tokio::test]
async fn callback_break_stops_the_pass_early() {
    let server = serve(FEED).await;
    let mut client = EshopReviewsClient::new(&server.uri());
    client.set_callback(|_| ControlFlow::Break(()));

    let count = client.run().await.expect("run should succeed");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn download_through_temp_file_removes_it_after_the_run() {
    let server = serve(FEED).await;
    let path = std::env::temp_dir().join(format!("eshop-feed-{}.xml", std::process::id()));

    let (mut client, seen) = collecting_client(&server.uri());
    client.set_temp_file(&path, true);

    let count = client.run().await.expect("run should succeed");
    assert_eq!(count, 2);
    assert_eq!(seen.borrow().len(), 2);
    assert!(!path.exists(), "temp file should be removed after the run");
}

#[tokio::test]
async fn use_file_processes_without_touching_the_network() {
    let path = std::env::temp_dir().join(format!("eshop-local-{}.xml", std::process::id()));
    std::fs::write(&path, FEED).expect("fixture should be writable");

    let mut client = EshopReviewsClient::unconfigured();
    client.use_file(&path).expect("fixture should be readable");
    let count = client.run().await.expect("run should succeed");

    assert_eq!(count, 2);
    assert!(path.exists(), "adopted files are never deleted");
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn use_content_processes_an_in_memory_feed() {
    let mut client = EshopReviewsClient::unconfigured();
    client.use_content(FEED);
    assert_eq!(client.run().await.expect("run should succeed"), 2);
}

#[tokio::test]
async fn download_then_run_fetches_only_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = EshopReviewsClient::new(&server.uri());
    client.download().await.expect("download should succeed");
    assert_eq!(client.run().await.expect("run should succeed"), 2);
}

#[tokio::test]
async fn server_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut client = EshopReviewsClient::new(&server.uri());
    let result = client.run().await;
    assert!(matches!(
        result,
        Err(FeedError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn run_without_source_is_fatal() {
    let mut client = EshopReviewsClient::unconfigured();
    assert!(matches!(client.run().await, Err(FeedError::MissingSource)));
}
