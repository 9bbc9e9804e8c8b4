//! Screening of uploaded images through an external NSFW classifier.
//!
//! The classifier receives the raw image and answers with nsfwjs-style
//! predictions. A failed or missing classifier never blocks an upload.

use actix_multipart::Multipart;
use actix_web::HttpResponse;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::send_and_text;
use crate::error::{DriveError, Result};
use crate::misskey::FileUpload;
use crate::multipart::read_form;
use crate::state::{AppData, missing};
use crate::unwrap_return;

const NSFW_CLASSES: [&str; 3] = ["Porn", "Sexy", "Hentai"];

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    pub probability: f64,
}

/// Summed probability of the explicit classes.
pub fn nsfw_score(predictions: &[Prediction]) -> f64 {
    NSFW_CLASSES
        .iter()
        .filter_map(|class| {
            predictions
                .iter()
                .find(|prediction| prediction.class_name == *class)
        })
        .map(|prediction| prediction.probability)
        .sum()
}

#[derive(Debug)]
pub struct NsfwScanner {
    client: Client,
    endpoint: Option<String>,
    threshold: f64,
}

impl NsfwScanner {
    pub fn new(endpoint: Option<String>, threshold: f64) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            threshold,
        }
    }

    pub fn is_nsfw(&self, score: f64) -> bool {
        score > self.threshold
    }

    pub async fn classify(&self, image: FileUpload) -> Result<Vec<Prediction>> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| DriveError::Internal("NSFW classifier is not configured".to_owned()))?;
        debug!("Classifying {} ({} bytes)", image.name, image.bytes.len());

        let mut request = self.client.post(endpoint).body(image.bytes);
        if let Some(content_type) = image.content_type {
            request = request.header("Content-Type", content_type);
        }
        send_and_text(request).await?.into_json("classify image")
    }
}

fn is_image(file: &FileUpload) -> bool {
    file.content_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("image/"))
}

#[actix_web::post("/check-nsfw")]
pub async fn check_nsfw(data: AppData, payload: Multipart) -> HttpResponse {
    let mut form = unwrap_return!(read_form(payload, data.max_upload_bytes()).await);
    let Some(file) = form.take_files("file").into_iter().next() else {
        return missing("No file provided");
    };

    if !is_image(&file) {
        return HttpResponse::Ok().json(json!({
            "success": true,
            "isNSFW": false,
            "message": "Not an image, skipping NSFW check",
        }));
    }

    let scanner = data.as_nsfw();
    match scanner.classify(file).await {
        Ok(predictions) => {
            debug!("NSFW predictions: {predictions:?}");
            let score = nsfw_score(&predictions);
            let is_nsfw = scanner.is_nsfw(score);
            HttpResponse::Ok().json(json!({
                "success": true,
                "isNSFW": is_nsfw,
                "score": score,
                "predictions": predictions,
                "message": if is_nsfw { "Content detected as NSFW" } else { "Content is safe" },
            }))
        }
        Err(err) => {
            error!("Error during NSFW detection: {err}");
            HttpResponse::Ok().json(json!({
                "success": false,
                "error": err.to_string(),
                "isNSFW": false,
                "message": "NSFW detection failed, allowing upload",
            }))
        }
    }
}
