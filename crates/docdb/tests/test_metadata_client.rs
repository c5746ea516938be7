use docdb::{DocDbError, Filter, MetadataDbClient, Projection, RecordStore};
use mockito::{Matcher, Server};
use serde_json::{json, Map};

#[tokio::test]
async fn test_retrieve_sends_filter_projection_and_limit() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/v1/metadata_index/data_assets/find")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "filter".into(),
                r#"{"data_description.project_name":"Thalamus in the Middle"}"#.into(),
            ),
            Matcher::UrlEncoded("projection".into(), r#"{"_id":1,"name":1}"#.into()),
            Matcher::UrlEncoded("limit".into(), "100".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"_id": "a", "name": "one"}, {"_id": "b", "name": "two"}]"#)
        .create_async()
        .await;

    let client =
        MetadataDbClient::with_base_url(format!("{}/v1/metadata_index/data_assets", server.url()))
            .unwrap();
    let filter = Filter::new(json!({"data_description.project_name": "Thalamus in the Middle"}))
        .unwrap();
    let projection = Projection::new(json!({"_id": 1, "name": 1})).unwrap();

    let records = client
        .retrieve(&filter, Some(&projection), Some(100))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id(), Some("b"));
}

#[tokio::test]
async fn test_count_accepts_bare_and_wrapped_numbers() {
    let mut server = Server::new_async().await;
    let client = MetadataDbClient::with_base_url(server.url()).unwrap();

    let bare = server
        .mock("GET", "/count_documents")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("42")
        .create_async()
        .await;
    assert_eq!(client.count(&Filter::all()).await.unwrap(), 42);
    bare.assert_async().await;
    bare.remove_async().await;

    server
        .mock("GET", "/count_documents")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"count": 7}"#)
        .create_async()
        .await;
    assert_eq!(client.count(&Filter::all()).await.unwrap(), 7);
}

#[tokio::test]
async fn test_replace_sections_posts_set_update() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/update_one")
        .match_body(Matcher::Json(json!({
            "filter": {"_id": "abc"},
            "update": {"$set": {"acquisition": {"experimenter_full_name": ["Jane Doe"]}}},
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = MetadataDbClient::with_base_url(server.url()).unwrap();
    let mut sections = Map::new();
    sections.insert(
        "acquisition".to_string(),
        json!({"experimenter_full_name": ["Jane Doe"]}),
    );
    client.replace_sections("abc", &sections).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unexpected_status_carries_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/find")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let client = MetadataDbClient::with_base_url(server.url()).unwrap();
    let err = client.retrieve(&Filter::all(), None, None).await.unwrap_err();
    match err {
        DocDbError::Upstream(upstream) => {
            assert_eq!(upstream.status, 503);
            assert_eq!(upstream.body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_filter_never_reaches_the_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = MetadataDbClient::with_base_url(server.url()).unwrap();
    // built without Filter::new, so validation happens in the client
    let filter: Filter = serde_json::from_value(json!({"name": {"$where": "true"}})).unwrap();
    assert!(matches!(
        client.retrieve(&filter, None, None).await,
        Err(DocDbError::InvalidFilter(_))
    ));
    mock.assert_async().await;
}
