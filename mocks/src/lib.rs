use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::{json, Value};

pub use httptest;

/// Subscription key the mock server expects on every request.
pub const API_KEY: &str = "test-key";

const PREFIX: &str = "/face/v1.0";

/// Start an empty mock server for Face API endpoints.
pub fn face_api_server() -> Server {
    Server::run()
}

/// Base URL of `server`, suitable as a client endpoint.
pub fn endpoint(server: &Server) -> String {
    server.url_str("")
}

pub fn group_json(id: &str, name: &str) -> Value {
    json!({
        "personGroupId": id,
        "name": name,
        "userData": null,
        "recognitionModel": "recognition_04"
    })
}

pub fn person_json(id: &str, name: &str, persisted_face_ids: &[&str]) -> Value {
    json!({
        "personId": id,
        "name": name,
        "userData": null,
        "persistedFaceIds": persisted_face_ids
    })
}

/// A detected face with a handful of attributes filled in.
pub fn detected_face_json(face_id: &str, left: i32) -> Value {
    json!({
        "faceId": face_id,
        "recognitionModel": "recognition_04",
        "faceRectangle": {"top": 40, "left": left, "width": 80, "height": 80},
        "faceAttributes": {
            "age": 34.0,
            "smile": 0.2,
            "glasses": "ReadingGlasses",
            "headPose": {"roll": 1.5, "yaw": -3.0, "pitch": 0.0}
        }
    })
}

pub fn identify_result_json(face_id: &str, candidates: &[(&str, f64)]) -> Value {
    let candidates: Vec<Value> = candidates
        .iter()
        .map(|(person_id, confidence)| json!({"personId": person_id, "confidence": confidence}))
        .collect();
    json!({"faceId": face_id, "candidates": candidates})
}

fn path(p: &str) -> String {
    format!("{}{}", PREFIX, p)
}

/// Expect `times` GETs of the group listing, each answered with `groups`.
pub fn expect_list_groups(server: &Server, groups: Vec<Value>, times: usize) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path("/persongroups")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::query(url_decoded(contains(("top", "1000")))),
        ])
        .times(times)
        .respond_with(json_encoded(Value::Array(groups))),
    );
}

/// Expect a paged group listing: the first request carries no `start`, each
/// later one must resume after the last id of the page before it.
pub fn expect_list_groups_pages(server: &Server, pages: Vec<Vec<Value>>) {
    let mut cursor: Option<String> = None;
    for page in pages {
        let next = page
            .last()
            .and_then(|g| g["personGroupId"].as_str())
            .map(str::to_string);
        let expectation = match cursor {
            None => Expectation::matching(all_of![
                request::method_path("GET", path("/persongroups")),
                request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
                request::query(url_decoded(contains(("top", "1000")))),
                request::query(url_decoded(not(contains(key("start"))))),
            ]),
            Some(start) => Expectation::matching(all_of![
                request::method_path("GET", path("/persongroups")),
                request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
                request::query(url_decoded(contains(("top", "1000")))),
                request::query(url_decoded(contains(("start", start)))),
            ]),
        };
        server.expect(expectation.respond_with(json_encoded(Value::Array(page))));
        cursor = next;
    }
}

/// Expect one group listing per entry of `pages`, answered in order
/// regardless of query parameters.
pub fn expect_list_groups_sequence(server: &Server, pages: Vec<Vec<Value>>) {
    let count = pages.len();
    let responders: Vec<Box<dyn Responder>> = pages
        .into_iter()
        .map(|page| Box::new(json_encoded(Value::Array(page))) as Box<dyn Responder>)
        .collect();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path("/persongroups")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
        ])
        .times(count)
        .respond_with(httptest::responders::cycle(responders)),
    );
}

pub fn expect_list_persons(server: &Server, group_id: &str, persons: Vec<Value>, times: usize) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path(&format!("/persongroups/{}/persons", group_id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::query(url_decoded(contains(("top", "1000")))),
        ])
        .times(times)
        .respond_with(json_encoded(Value::Array(persons))),
    );
}

/// Expect `times` group creations under generated ids with the given name.
pub fn expect_create_group(server: &Server, name: &str, times: usize) {
    server.expect(
        Expectation::matching(all_of![
            request::method("PUT"),
            request::path(matches(
                r"^/face/v1\.0/persongroups/[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$"
            )),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::body(json_decoded(eq(json!({
                "name": name,
                "recognitionModel": "recognition_04"
            })))),
        ])
        .times(times)
        .respond_with(status_code(200)),
    );
}

pub fn expect_get_group(server: &Server, group: Value) {
    let id = group["personGroupId"].as_str().unwrap_or_default().to_string();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path(&format!("/persongroups/{}", id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
        ])
        .respond_with(json_encoded(group)),
    );
}

pub fn expect_delete_group(server: &Server, group_id: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("DELETE", path(&format!("/persongroups/{}", group_id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
        ])
        .respond_with(status_code(200)),
    );
}

pub fn expect_train(server: &Server, group_id: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", path(&format!("/persongroups/{}/train", group_id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
        ])
        .respond_with(status_code(202)),
    );
}

pub fn expect_training_status(server: &Server, group_id: &str, status: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", path(&format!("/persongroups/{}/training", group_id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
        ])
        .respond_with(json_encoded(json!({
            "status": status,
            "createdDateTime": "2024-03-01T10:00:00Z",
            "lastActionDateTime": "2024-03-01T10:00:05Z",
            "message": null
        }))),
    );
}

/// Expect a person creation in `group_id`, answered with `person_id`.
pub fn expect_create_person(server: &Server, group_id: &str, name: &str, person_id: &str) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", path(&format!("/persongroups/{}/persons", group_id))),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::body(json_decoded(eq(json!({"name": name})))),
        ])
        .respond_with(json_encoded(json!({"personId": person_id}))),
    );
}

/// Expect a URL-based detect call asking for exactly `attributes`
/// (comma-joined wire names, or `None` for no attributes), answered with `faces`.
pub fn expect_detect_url(server: &Server, image_url: &str, attributes: Option<&str>, faces: Vec<Value>) {
    let expectation = match attributes {
        Some(list) => Expectation::matching(all_of![
            request::method_path("POST", path("/detect")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::query(url_decoded(contains(("returnFaceId", "true")))),
            request::query(url_decoded(contains(("recognitionModel", "recognition_04")))),
            request::query(url_decoded(contains(("returnFaceAttributes", list.to_string())))),
            request::body(json_decoded(eq(json!({"url": image_url})))),
        ]),
        None => Expectation::matching(all_of![
            request::method_path("POST", path("/detect")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::query(url_decoded(contains(("returnFaceId", "true")))),
            request::query(url_decoded(not(contains(key("returnFaceAttributes"))))),
            request::body(json_decoded(eq(json!({"url": image_url})))),
        ]),
    };
    server.expect(expectation.respond_with(json_encoded(Value::Array(faces))));
}

/// Expect a binary detect call, answered with `faces`.
pub fn expect_detect_stream(server: &Server, attributes: &str, faces: Vec<Value>) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", path("/detect")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::headers(contains(("content-type", "application/octet-stream"))),
            request::query(url_decoded(contains(("returnFaceAttributes", attributes.to_string())))),
        ])
        .respond_with(json_encoded(Value::Array(faces))),
    );
}

/// Expect a detect call that fails with `status` and a raw `body`.
pub fn expect_detect_failure(server: &Server, status: u16, body: &str) {
    server.expect(
        Expectation::matching(request::method_path("POST", path("/detect")))
            .respond_with(status_code(status).body(body.to_string())),
    );
}

pub fn expect_add_face_url(
    server: &Server,
    group_id: &str,
    person_id: &str,
    image_url: &str,
    persisted_face_id: &str,
) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path(
                "POST",
                path(&format!("/persongroups/{}/persons/{}/persistedFaces", group_id, person_id))
            ),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::query(url_decoded(contains(("userData", image_url.to_string())))),
            request::body(json_decoded(eq(json!({"url": image_url})))),
        ])
        .respond_with(json_encoded(json!({"persistedFaceId": persisted_face_id}))),
    );
}

/// Expect one identify call against `group_id` for exactly `face_ids`.
pub fn expect_identify(server: &Server, group_id: &str, face_ids: &[&str], results: Vec<Value>) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", path("/identify")),
            request::headers(contains(("ocp-apim-subscription-key", API_KEY))),
            request::body(json_decoded(eq(json!({
                "personGroupId": group_id,
                "faceIds": face_ids,
                "maxNumOfCandidatesReturned": 1
            })))),
        ])
        .respond_with(json_encoded(Value::Array(results))),
    );
}
