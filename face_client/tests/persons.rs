use face_client::{FaceClientError, FaceServiceClient, FaceServiceConfig};
use mocks::httptest::{matchers::*, responders::*, Expectation};
use mocks::{face_api_server, person_json};
use serde_json::json;

fn client_for(server: &mocks::httptest::Server) -> FaceServiceClient {
    FaceServiceClient::new(FaceServiceConfig::new(mocks::endpoint(server), mocks::API_KEY)).unwrap()
}

#[tokio::test]
async fn test_create_person_checks_names_in_group() {
    let server = face_api_server();
    mocks::expect_list_persons(&server, "g1", vec![person_json("p1", "Ada", &[])], 1);
    mocks::expect_create_person(&server, "g1", "Grace", "p2");

    let client = client_for(&server);
    let id = client.create_person("g1", "Grace", false).await.unwrap();
    assert_eq!(id, "p2");
}

#[tokio::test]
async fn test_create_person_rejects_duplicate_name() {
    let server = face_api_server();
    mocks::expect_list_persons(&server, "g1", vec![person_json("p1", "Ada", &[])], 1);

    let client = client_for(&server);
    let err = client.create_person("g1", "Ada", false).await.unwrap_err();
    assert!(matches!(err, FaceClientError::NameConflict { kind: "person", .. }));
}

#[tokio::test]
async fn test_create_person_override_skips_listing() {
    let server = face_api_server();
    mocks::expect_create_person(&server, "g1", "Ada", "p9");

    let client = client_for(&server);
    assert_eq!(client.create_person("g1", "Ada", true).await.unwrap(), "p9");
}

#[tokio::test]
async fn test_list_and_get_person() {
    let server = face_api_server();
    mocks::expect_list_persons(
        &server,
        "g1",
        vec![person_json("p1", "Ada", &["f1", "f2"]), person_json("p2", "Grace", &[])],
        1,
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/face/v1.0/persongroups/g1/persons/p1"))
            .respond_with(json_encoded(person_json("p1", "Ada", &["f1", "f2"]))),
    );

    let client = client_for(&server);
    let persons = client.list_persons("g1").await.unwrap();
    assert_eq!(persons.len(), 2);
    assert!(persons[1].persisted_face_ids.is_empty());

    let person = client.get_person("g1", "p1").await.unwrap();
    assert_eq!(person.persisted_face_ids, vec!["f1".to_string(), "f2".to_string()]);
}

#[tokio::test]
async fn test_find_person_by_name() {
    let server = face_api_server();
    mocks::expect_list_persons(
        &server,
        "g1",
        vec![
            person_json("p1", "Ada", &[]),
            person_json("p2", "Alan", &[]),
            person_json("p3", "Alan", &[]),
        ],
        3,
    );

    let client = client_for(&server);
    let ada = client.find_person_by_name("g1", "Ada").await.unwrap().unwrap();
    assert_eq!(ada.person_id, "p1");
    assert!(client.find_person_by_name("g1", "ada").await.unwrap().is_none());
    let err = client.find_person_by_name("g1", "Alan").await.unwrap_err();
    assert!(matches!(err, FaceClientError::AmbiguousName { kind: "person", count: 2, .. }));
}

#[tokio::test]
async fn test_add_face_from_url_records_source() {
    let server = face_api_server();
    let url = "https://img.example.com/ada.jpg";
    mocks::expect_add_face_url(&server, "g1", "p1", url, "pf1");

    let client = client_for(&server);
    let face = client.add_person_face_from_url("g1", "p1", url).await.unwrap();
    assert_eq!(face.persisted_face_id, "pf1");
    assert_eq!(face.user_data.as_deref(), Some(url));
}

#[tokio::test]
async fn test_add_face_from_stream() {
    let server = face_api_server();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/face/v1.0/persongroups/g1/persons/p1/persistedFaces"),
            request::headers(contains(("content-type", "application/octet-stream"))),
            request::query(url_decoded(contains(("userData", "webcam")))),
        ])
        .respond_with(json_encoded(json!({"persistedFaceId": "pf2"}))),
    );

    let client = client_for(&server);
    let face = client
        .add_person_face_from_stream("g1", "p1", vec![1u8, 2, 3], Some("webcam"))
        .await
        .unwrap();
    assert_eq!(face.persisted_face_id, "pf2");
    assert_eq!(face.user_data.as_deref(), Some("webcam"));
}

#[tokio::test]
async fn test_get_person_face() {
    let server = face_api_server();
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/face/v1.0/persongroups/g1/persons/p1/persistedFaces/pf1",
        ))
        .respond_with(json_encoded(json!({
            "persistedFaceId": "pf1",
            "userData": "https://img.example.com/ada.jpg"
        }))),
    );

    let client = client_for(&server);
    let face = client.get_person_face("g1", "p1", "pf1").await.unwrap();
    assert_eq!(face.user_data.as_deref(), Some("https://img.example.com/ada.jpg"));
}

#[tokio::test]
async fn test_delete_person() {
    let server = face_api_server();
    server.expect(
        Expectation::matching(request::method_path("DELETE", "/face/v1.0/persongroups/g1/persons/p1"))
            .respond_with(status_code(200)),
    );

    let client = client_for(&server);
    client.delete_person("g1", "p1").await.unwrap();
}
