use face_client::{FaceAttribute, FaceClientError, FaceServiceClient, FaceServiceConfig};
use mocks::{detected_face_json, face_api_server};

fn client_for(server: &mocks::httptest::Server) -> FaceServiceClient {
    FaceServiceClient::new(FaceServiceConfig::new(mocks::endpoint(server), mocks::API_KEY)).unwrap()
}

const ALL_ATTRIBUTES: &str =
    "accessories,age,blur,emotion,exposure,facialHair,gender,glasses,hair,headPose,makeup,noise,occlusion,smile";

#[tokio::test]
async fn test_detect_from_url_requests_every_attribute_by_default() {
    let server = face_api_server();
    mocks::expect_detect_url(
        &server,
        "https://img.example.com/group.jpg",
        Some(ALL_ATTRIBUTES),
        vec![
            detected_face_json("face-1", 10),
            detected_face_json("face-2", 120),
            detected_face_json("face-3", 240),
        ],
    );

    let client = client_for(&server);
    let faces = client
        .detect_faces_from_url("https://img.example.com/group.jpg", None)
        .await
        .unwrap();
    assert_eq!(faces.len(), 3);
    assert_eq!(faces[1].face_id.as_deref(), Some("face-2"));
    assert_eq!(faces[2].face_rectangle.left, 240);
    let attrs = faces[0].face_attributes.as_ref().unwrap();
    assert_eq!(attrs.glasses.as_deref(), Some("ReadingGlasses"));
    assert!(attrs.emotion.is_none());
}

#[tokio::test]
async fn test_detect_from_url_with_no_faces() {
    let server = face_api_server();
    mocks::expect_detect_url(&server, "https://img.example.com/empty.jpg", Some(ALL_ATTRIBUTES), vec![]);

    let client = client_for(&server);
    let faces = client
        .detect_faces_from_url("https://img.example.com/empty.jpg", None)
        .await
        .unwrap();
    assert!(faces.is_empty());
}

#[tokio::test]
async fn test_detect_from_stream_honors_selected_attributes() {
    let server = face_api_server();
    mocks::expect_detect_stream(&server, "age,smile", vec![detected_face_json("face-1", 0)]);

    let client = client_for(&server);
    let image: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    let faces = client
        .detect_faces_from_stream(image, Some(&[FaceAttribute::Age, FaceAttribute::Smile]))
        .await
        .unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].face_attributes.as_ref().unwrap().age, Some(34.0));
}

#[tokio::test]
async fn test_detect_failure_carries_reason_and_body() {
    let server = face_api_server();
    let body = r#"{"error":{"code":"InvalidImageSize","message":"Image size is too small."}}"#;
    mocks::expect_detect_failure(&server, 400, body);

    let client = client_for(&server);
    let err = client
        .detect_faces_from_url("https://img.example.com/tiny.jpg", None)
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Bad Request"), "missing reason phrase: {}", msg);
    assert!(msg.contains(body), "missing body: {}", msg);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.api_error_code().as_deref(), Some("InvalidImageSize"));
    assert!(matches!(err, FaceClientError::Api { .. }));
}

#[tokio::test]
async fn test_detect_with_unreachable_endpoint_is_request_error() {
    // Port 9 (discard) is not served by anything in the test environment.
    let client = FaceServiceClient::new(FaceServiceConfig::new("http://127.0.0.1:9", "key")).unwrap();
    let err = client
        .detect_faces_from_url("https://img.example.com/a.jpg", None)
        .await
        .unwrap_err();
    assert!(matches!(err, FaceClientError::Request(_)));
}
