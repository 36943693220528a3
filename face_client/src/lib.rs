//! Client for the cloud Face detection and recognition API.
//!
//! [`FaceServiceClient`] maps each remote operation (detect, person groups,
//! persons, persisted faces, training, identify) to one async method. All
//! recognition work happens on the service; the client keeps no state beyond
//! its configuration and the injected HTTP client.

mod config;
mod error;
mod models;

pub use config::FaceServiceConfig;
pub use error::FaceClientError;
pub use models::{
    Accessory, Blur, DetectedFace, Emotion, Exposure, FaceAttribute, FaceAttributes, FaceRectangle,
    FacialHair, Hair, HairColor, HeadPose, IdentifyCandidate, IdentifyResult, Makeup, Noise,
    Occlusion, PersistedFace, Person, PersonGroup, TrainingStatus,
};

use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Recognition model used for every group and detection.
pub const RECOGNITION_MODEL: &str = "recognition_04";
/// Detection model used for detect and add-face calls.
pub const DETECTION_MODEL: &str = "detection_01";
/// Upper bound on face ids per identify request.
pub const MAX_IDENTIFY_FACE_IDS: usize = 10;

const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";
const API_PREFIX: [&str; 2] = ["face", "v1.0"];
const PAGE_SIZE: usize = 1000;

/// Remote resources that can be listed page by page and looked up by name.
trait NamedResource {
    const KIND: &'static str;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl NamedResource for PersonGroup {
    const KIND: &'static str = "person group";
    fn id(&self) -> &str {
        &self.person_group_id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl NamedResource for Person {
    const KIND: &'static str = "person";
    fn id(&self) -> &str {
        &self.person_id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Serialize)]
struct UrlBody<'a> {
    url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePersonGroupRequest<'a> {
    name: &'a str,
    recognition_model: &'a str,
}

#[derive(Serialize)]
struct CreatePersonRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePersonResponse {
    person_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddFaceResponse {
    persisted_face_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyRequest<'a> {
    person_group_id: &'a str,
    face_ids: &'a [String],
    max_num_of_candidates_returned: u32,
}

#[derive(Clone)]
pub struct FaceServiceClient {
    client: reqwest::Client,
    api_key: String,
    base_url: Url,
}

impl FaceServiceClient {
    pub fn new(config: FaceServiceConfig) -> Result<Self, FaceClientError> {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Create a client that sends its requests through `client`.
    pub fn with_http_client(
        config: FaceServiceConfig,
        client: reqwest::Client,
    ) -> Result<Self, FaceClientError> {
        let base_url = config
            .validate()
            .and_then(|endpoint| {
                Url::parse(&endpoint).map_err(|e| FaceClientError::InvalidConfig(e.to_string()))
            })
            .map_err(|e| {
                tracing::error!(error = %e, "Rejected Face API configuration");
                e
            })?;
        Ok(FaceServiceClient {
            client,
            api_key: config.api_key,
            base_url,
        })
    }

    /// Build an API URL from path segments, percent-encoding each one so a
    /// caller-supplied id always stays a single segment.
    fn url(&self, segments: &[&str]) -> Result<Url, FaceClientError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            let err = FaceClientError::InvalidId(bad.to_string());
            tracing::error!(error = %err, "Refusing to build Face API path");
            return Err(err);
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FaceClientError::InvalidConfig("endpoint cannot carry a path".into()))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    /// Authenticate and send a request, turning non-success statuses into errors.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, FaceClientError> {
        let request = builder
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .build()
            .map_err(|e| {
                let err = FaceClientError::Request(e.to_string());
                tracing::error!(error = %err, "Failed to build Face API request");
                err
            })?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!(%method, %path, "Sending Face API request");

        let response = self.client.execute(request).await.map_err(|e| {
            let err = FaceClientError::Request(e.to_string());
            tracing::error!(%method, %path, error = %err, "Face API request failed");
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let err = FaceClientError::Api {
                status: status.as_u16(),
                reason,
                body,
            };
            tracing::error!(%method, %path, status = status.as_u16(), error = %err, "Face API returned an error");
            return Err(err);
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FaceClientError> {
        let path = response.url().path().to_string();
        let bytes = response.bytes().await.map_err(|e| {
            let err = FaceClientError::Request(e.to_string());
            tracing::error!(%path, error = %err, "Failed to read Face API response");
            err
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            let err = FaceClientError::Decode(e.to_string());
            tracing::error!(%path, error = %err, "Unexpected Face API response body");
            err
        })
    }

    /// Fetch every item of a listing endpoint, following `start` cursors.
    async fn list_all<T>(&self, segments: &[&str]) -> Result<Vec<T>, FaceClientError>
    where
        T: DeserializeOwned + NamedResource,
    {
        let mut items = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let mut query = vec![("top", PAGE_SIZE.to_string())];
            if let Some(cursor) = &start {
                query.push(("start", cursor.clone()));
            }
            let response = self.send(self.client.get(self.url(segments)?).query(&query)).await?;
            let page: Vec<T> = Self::decode(response).await?;
            let page_len = page.len();
            start = page.last().map(|item| item.id().to_string());
            items.extend(page);
            if page_len < PAGE_SIZE {
                break;
            }
        }
        Ok(items)
    }

    // Detection

    /// Detect faces in the image at `image_url`.
    ///
    /// `attributes` of `None` requests every [`FaceAttribute`]; an explicit
    /// list is sent as given, and an empty one requests no attributes.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn detect_faces_from_url(
        &self,
        image_url: &str,
        attributes: Option<&[FaceAttribute]>,
    ) -> Result<Vec<DetectedFace>, FaceClientError> {
        let request = self
            .client
            .post(self.url(&["detect"])?)
            .query(&detect_query(attributes))
            .json(&UrlBody { url: image_url });
        let faces: Vec<DetectedFace> = Self::decode(self.send(request).await?).await?;
        tracing::debug!(count = faces.len(), "Detected faces");
        Ok(faces)
    }

    /// Detect faces in raw image bytes (JPEG, PNG, GIF or BMP).
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, image)))]
    pub async fn detect_faces_from_stream(
        &self,
        image: impl Into<reqwest::Body>,
        attributes: Option<&[FaceAttribute]>,
    ) -> Result<Vec<DetectedFace>, FaceClientError> {
        let request = self
            .client
            .post(self.url(&["detect"])?)
            .query(&detect_query(attributes))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image);
        let faces: Vec<DetectedFace> = Self::decode(self.send(request).await?).await?;
        tracing::debug!(count = faces.len(), "Detected faces");
        Ok(faces)
    }

    // Person groups

    /// Create a person group and return its generated id.
    ///
    /// Fails with [`FaceClientError::NameConflict`] when a group with the same
    /// name exists, unless `allow_duplicate_name` is set.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn create_person_group(
        &self,
        name: &str,
        allow_duplicate_name: bool,
    ) -> Result<String, FaceClientError> {
        if !allow_duplicate_name {
            let groups = self.list_person_groups().await?;
            ensure_name_free(&groups, name)?;
        }

        let person_group_id = Uuid::new_v4().to_string();
        let body = CreatePersonGroupRequest {
            name,
            recognition_model: RECOGNITION_MODEL,
        };
        let request = self
            .client
            .put(self.url(&["persongroups", person_group_id.as_str()])?)
            .json(&body);
        self.send(request).await?;
        tracing::info!(%person_group_id, name, "Created person group");
        Ok(person_group_id)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn get_person_group(&self, person_group_id: &str) -> Result<PersonGroup, FaceClientError> {
        let request = self
            .client
            .get(self.url(&["persongroups", person_group_id])?)
            .query(&[("returnRecognitionModel", "true")]);
        Self::decode(self.send(request).await?).await
    }

    /// Look a group up by exact name.
    ///
    /// Returns [`FaceClientError::AmbiguousName`] rather than picking one when
    /// several groups share the name.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn find_person_group_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PersonGroup>, FaceClientError> {
        let groups = self.list_person_groups().await?;
        single_by_name(groups, name)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn list_person_groups(&self) -> Result<Vec<PersonGroup>, FaceClientError> {
        self.list_all(&["persongroups"]).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn delete_person_group(&self, person_group_id: &str) -> Result<(), FaceClientError> {
        let request = self
            .client
            .delete(self.url(&["persongroups", person_group_id])?);
        self.send(request).await?;
        tracing::info!(person_group_id, "Deleted person group");
        Ok(())
    }

    /// Delete every group named `name` and return how many were removed.
    ///
    /// Deletions run one after another; a failure stops the sweep and leaves
    /// earlier deletions in place.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn delete_person_groups_by_name(&self, name: &str) -> Result<usize, FaceClientError> {
        let groups = self.list_person_groups().await?;
        let mut deleted = 0;
        for group in groups.iter().filter(|g| g.name == name) {
            self.delete_person_group(&group.person_group_id).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Queue a training run. The service trains asynchronously; see
    /// [`Self::get_training_status`].
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn train_person_group(&self, person_group_id: &str) -> Result<(), FaceClientError> {
        let request = self
            .client
            .post(self.url(&["persongroups", person_group_id, "train"])?);
        self.send(request).await?;
        tracing::info!(person_group_id, "Requested person group training");
        Ok(())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn get_training_status(
        &self,
        person_group_id: &str,
    ) -> Result<TrainingStatus, FaceClientError> {
        let request = self
            .client
            .get(self.url(&["persongroups", person_group_id, "training"])?);
        Self::decode(self.send(request).await?).await
    }

    // Persons

    /// Create a person in a group and return the service-assigned id.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn create_person(
        &self,
        person_group_id: &str,
        name: &str,
        allow_duplicate_name: bool,
    ) -> Result<String, FaceClientError> {
        if !allow_duplicate_name {
            let persons = self.list_persons(person_group_id).await?;
            ensure_name_free(&persons, name)?;
        }

        let request = self
            .client
            .post(self.url(&["persongroups", person_group_id, "persons"])?)
            .json(&CreatePersonRequest { name });
        let created: CreatePersonResponse = Self::decode(self.send(request).await?).await?;
        tracing::info!(person_group_id, person_id = %created.person_id, name, "Created person");
        Ok(created.person_id)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn list_persons(&self, person_group_id: &str) -> Result<Vec<Person>, FaceClientError> {
        self.list_all(&["persongroups", person_group_id, "persons"])
            .await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn get_person(
        &self,
        person_group_id: &str,
        person_id: &str,
    ) -> Result<Person, FaceClientError> {
        let request = self
            .client
            .get(self.url(&["persongroups", person_group_id, "persons", person_id])?);
        Self::decode(self.send(request).await?).await
    }

    /// Look a person up by exact name within a group. Same policy as
    /// [`Self::find_person_group_by_name`].
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn find_person_by_name(
        &self,
        person_group_id: &str,
        name: &str,
    ) -> Result<Option<Person>, FaceClientError> {
        let persons = self.list_persons(person_group_id).await?;
        single_by_name(persons, name)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn delete_person(
        &self,
        person_group_id: &str,
        person_id: &str,
    ) -> Result<(), FaceClientError> {
        let request = self
            .client
            .delete(self.url(&["persongroups", person_group_id, "persons", person_id])?);
        self.send(request).await?;
        tracing::info!(person_group_id, person_id, "Deleted person");
        Ok(())
    }

    // Persisted faces

    /// Register the face at `image_url` for a person. The URL is stored as
    /// the face's user data.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn add_person_face_from_url(
        &self,
        person_group_id: &str,
        person_id: &str,
        image_url: &str,
    ) -> Result<PersistedFace, FaceClientError> {
        let request = self
            .client
            .post(self.url(&["persongroups", person_group_id, "persons", person_id, "persistedFaces"])?)
            .query(&[("userData", image_url), ("detectionModel", DETECTION_MODEL)])
            .json(&UrlBody { url: image_url });
        let added: AddFaceResponse = Self::decode(self.send(request).await?).await?;
        tracing::info!(person_group_id, person_id, persisted_face_id = %added.persisted_face_id, "Added person face");
        Ok(PersistedFace {
            persisted_face_id: added.persisted_face_id,
            user_data: Some(image_url.to_string()),
        })
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, image)))]
    pub async fn add_person_face_from_stream(
        &self,
        person_group_id: &str,
        person_id: &str,
        image: impl Into<reqwest::Body>,
        user_data: Option<&str>,
    ) -> Result<PersistedFace, FaceClientError> {
        let mut query = vec![("detectionModel", DETECTION_MODEL)];
        if let Some(data) = user_data {
            query.push(("userData", data));
        }
        let request = self
            .client
            .post(self.url(&["persongroups", person_group_id, "persons", person_id, "persistedFaces"])?)
            .query(&query)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image);
        let added: AddFaceResponse = Self::decode(self.send(request).await?).await?;
        tracing::info!(person_group_id, person_id, persisted_face_id = %added.persisted_face_id, "Added person face");
        Ok(PersistedFace {
            persisted_face_id: added.persisted_face_id,
            user_data: user_data.map(str::to_string),
        })
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn get_person_face(
        &self,
        person_group_id: &str,
        person_id: &str,
        persisted_face_id: &str,
    ) -> Result<PersistedFace, FaceClientError> {
        let request = self.client.get(self.url(&[
            "persongroups",
            person_group_id,
            "persons",
            person_id,
            "persistedFaces",
            persisted_face_id,
        ])?);
        Self::decode(self.send(request).await?).await
    }

    // Identification

    /// Match detected face ids against the persons of a trained group.
    ///
    /// Ids are sent in chunks of [`MAX_IDENTIFY_FACE_IDS`]; results keep the
    /// order of `face_ids`.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn identify(
        &self,
        person_group_id: &str,
        face_ids: &[String],
        max_candidates: u32,
    ) -> Result<Vec<IdentifyResult>, FaceClientError> {
        let mut results = Vec::with_capacity(face_ids.len());
        for chunk in face_ids.chunks(MAX_IDENTIFY_FACE_IDS) {
            let body = IdentifyRequest {
                person_group_id,
                face_ids: chunk,
                max_num_of_candidates_returned: max_candidates,
            };
            let request = self.client.post(self.url(&["identify"])?).json(&body);
            let chunk_results: Vec<IdentifyResult> = Self::decode(self.send(request).await?).await?;
            results.extend(chunk_results);
        }
        Ok(results)
    }

    /// Detect the faces in an image and identify all of them against a group.
    ///
    /// An image without faces yields an empty list without calling identify.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn identify_persons_in_image(
        &self,
        person_group_id: &str,
        image_url: &str,
        max_candidates: u32,
    ) -> Result<Vec<IdentifyResult>, FaceClientError> {
        let faces = self.detect_faces_from_url(image_url, Some(&[])).await?;
        let face_ids: Vec<String> = faces.into_iter().filter_map(|f| f.face_id).collect();
        if face_ids.is_empty() {
            tracing::debug!(image_url, "No faces to identify");
            return Ok(Vec::new());
        }
        self.identify(person_group_id, &face_ids, max_candidates).await
    }
}

/// Query string shared by both detect variants.
fn detect_query(attributes: Option<&[FaceAttribute]>) -> Vec<(&'static str, String)> {
    let attributes = attributes.unwrap_or(&FaceAttribute::ALL);
    let mut query = vec![
        ("returnFaceId", "true".to_string()),
        ("returnFaceLandmarks", "false".to_string()),
        ("recognitionModel", RECOGNITION_MODEL.to_string()),
        ("returnRecognitionModel", "true".to_string()),
        ("detectionModel", DETECTION_MODEL.to_string()),
    ];
    if !attributes.is_empty() {
        let joined = attributes
            .iter()
            .map(FaceAttribute::as_str)
            .collect::<Vec<_>>()
            .join(",");
        query.push(("returnFaceAttributes", joined));
    }
    query
}

fn ensure_name_free<T: NamedResource>(existing: &[T], name: &str) -> Result<(), FaceClientError> {
    if existing.iter().any(|item| item.name() == name) {
        let err = FaceClientError::NameConflict {
            kind: T::KIND,
            name: name.to_string(),
        };
        tracing::error!(error = %err, "Refusing to create duplicate");
        return Err(err);
    }
    Ok(())
}

fn single_by_name<T: NamedResource>(items: Vec<T>, name: &str) -> Result<Option<T>, FaceClientError> {
    let mut matches: Vec<T> = items.into_iter().filter(|item| item.name() == name).collect();
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => {
            let err = FaceClientError::AmbiguousName {
                kind: T::KIND,
                name: name.to_string(),
                count,
            };
            tracing::error!(error = %err, "Name lookup matched several resources");
            Err(err)
        }
    }
}
