use crate::error::AppError;
use crate::metadata::PhotoRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedLabel {
    pub name: String,
    pub confidence: f32,
}

/// Image label detection, treated as an opaque service.
#[async_trait]
pub trait LabelDetector: Send + Sync {
    async fn detect_labels(
        &self,
        photo: &PhotoRef,
        max_labels: usize,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest<'a> {
    image: Image<'a>,
    max_labels: usize,
    min_confidence: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Image<'a> {
    s3_object: S3Object<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3Object<'a> {
    bucket: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsResponse {
    #[serde(default)]
    labels: Vec<DetectedLabel>,
}

pub struct HttpLabelDetector {
    client: reqwest::Client,
    url: Url,
}

impl HttpLabelDetector {
    pub fn new(url: &str) -> Result<Self, AppError> {
        log::debug!("Creating label detection client for URL: {}", url);
        Ok(Self {
            client: reqwest::Client::new(),
            url: Url::parse(url)?,
        })
    }
}

#[async_trait]
impl LabelDetector for HttpLabelDetector {
    async fn detect_labels(
        &self,
        photo: &PhotoRef,
        max_labels: usize,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>, AppError> {
        let request = DetectLabelsRequest {
            image: Image {
                s3_object: S3Object {
                    bucket: &photo.container,
                    name: &photo.object_key,
                },
            },
            max_labels,
            min_confidence,
        };

        let response = self.client.post(self.url.clone()).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream {
                service: "label detection",
                status: status.as_u16(),
            });
        }

        let body: DetectLabelsResponse = response.json().await?;
        log::trace!("Label detection returned {:?} for {}", body.labels, photo);
        Ok(body.labels)
    }
}
