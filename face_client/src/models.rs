//! Wire types of the Face API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonGroup {
    pub person_group_id: String,
    pub name: String,
    pub user_data: Option<String>,
    pub recognition_model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub person_id: String,
    pub name: String,
    pub user_data: Option<String>,
    #[serde(default)]
    pub persisted_face_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFace {
    pub persisted_face_id: String,
    pub user_data: Option<String>,
}

/// A face found by a detect call. Not stored by the service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub face_id: Option<String>,
    pub recognition_model: Option<String>,
    pub face_rectangle: FaceRectangle,
    pub face_attributes: Option<FaceAttributes>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct FaceRectangle {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceAttributes {
    pub accessories: Option<Vec<Accessory>>,
    pub age: Option<f64>,
    pub blur: Option<Blur>,
    pub emotion: Option<Emotion>,
    pub exposure: Option<Exposure>,
    pub facial_hair: Option<FacialHair>,
    pub gender: Option<String>,
    pub glasses: Option<String>,
    pub hair: Option<Hair>,
    pub head_pose: Option<HeadPose>,
    pub makeup: Option<Makeup>,
    pub noise: Option<Noise>,
    pub occlusion: Option<Occlusion>,
    pub smile: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Accessory {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blur {
    pub blur_level: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Emotion {
    pub anger: f64,
    pub contempt: f64,
    pub disgust: f64,
    pub fear: f64,
    pub happiness: f64,
    pub neutral: f64,
    pub sadness: f64,
    pub surprise: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    pub exposure_level: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FacialHair {
    pub moustache: f64,
    pub beard: f64,
    pub sideburns: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hair {
    pub bald: f64,
    pub invisible: bool,
    #[serde(default)]
    pub hair_color: Vec<HairColor>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HairColor {
    pub color: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct HeadPose {
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Makeup {
    pub eye_makeup: bool,
    pub lip_makeup: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Noise {
    pub noise_level: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Occlusion {
    pub forehead_occluded: bool,
    pub eye_occluded: bool,
    pub mouth_occluded: bool,
}

/// Attribute kinds a detect call can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceAttribute {
    Accessories,
    Age,
    Blur,
    Emotion,
    Exposure,
    FacialHair,
    Gender,
    Glasses,
    Hair,
    HeadPose,
    Makeup,
    Noise,
    Occlusion,
    Smile,
}

impl FaceAttribute {
    /// Every attribute, requested when the caller does not narrow the set.
    pub const ALL: [FaceAttribute; 14] = [
        FaceAttribute::Accessories,
        FaceAttribute::Age,
        FaceAttribute::Blur,
        FaceAttribute::Emotion,
        FaceAttribute::Exposure,
        FaceAttribute::FacialHair,
        FaceAttribute::Gender,
        FaceAttribute::Glasses,
        FaceAttribute::Hair,
        FaceAttribute::HeadPose,
        FaceAttribute::Makeup,
        FaceAttribute::Noise,
        FaceAttribute::Occlusion,
        FaceAttribute::Smile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceAttribute::Accessories => "accessories",
            FaceAttribute::Age => "age",
            FaceAttribute::Blur => "blur",
            FaceAttribute::Emotion => "emotion",
            FaceAttribute::Exposure => "exposure",
            FaceAttribute::FacialHair => "facialHair",
            FaceAttribute::Gender => "gender",
            FaceAttribute::Glasses => "glasses",
            FaceAttribute::Hair => "hair",
            FaceAttribute::HeadPose => "headPose",
            FaceAttribute::Makeup => "makeup",
            FaceAttribute::Noise => "noise",
            FaceAttribute::Occlusion => "occlusion",
            FaceAttribute::Smile => "smile",
        }
    }
}

impl fmt::Display for FaceAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResult {
    pub face_id: String,
    #[serde(default)]
    pub candidates: Vec<IdentifyCandidate>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyCandidate {
    pub person_id: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStatus {
    /// One of `notstarted`, `running`, `succeeded`, `failed`.
    pub status: String,
    pub created_date_time: String,
    pub last_action_date_time: Option<String>,
    pub message: Option<String>,
}

impl TrainingStatus {
    pub fn is_finished(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded") || self.status.eq_ignore_ascii_case("failed")
    }

    /// Creation time, if the service sent an RFC 3339 timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_date_time)
    }

    pub fn last_action_at(&self) -> Option<DateTime<Utc>> {
        self.last_action_date_time.as_deref().and_then(parse_timestamp)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
