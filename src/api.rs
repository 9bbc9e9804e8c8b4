use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DriveError, Result};

const ERROR_EXCERPT_LEN: usize = 100;

/// Status and raw body of an upstream answer.
#[derive(Debug)]
pub struct Reply {
    status: u16,
    text: String,
}

impl Reply {
    pub const fn new(status: u16, text: String) -> Self {
        Self { status, text }
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Deserialises a successful reply, or turns a failed one into a [`DriveError::Api`].
    pub fn into_json<T: DeserializeOwned>(self, action: &str) -> Result<T> {
        if !self.is_success() {
            return Err(self.into_error(action));
        }
        serde_json::from_str(&self.text).map_err(|err| {
            DriveError::InvalidResponse(format!(
                "Invalid response from server when trying to {action}: {err}\nData:\n{}",
                excerpt(&self.text, ERROR_EXCERPT_LEN)
            ))
        })
    }

    /// Discards the body of a successful reply.
    pub fn into_unit(self, action: &str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.into_error(action))
        }
    }

    pub fn into_error(self, action: &str) -> DriveError {
        let message = upstream_message(&self.text).unwrap_or_else(|| {
            let prefix = format!("Failed to {action} with status {}", self.status);
            if self.text.trim().is_empty() {
                prefix
            } else {
                format!("{prefix}: {}", excerpt(&self.text, ERROR_EXCERPT_LEN))
            }
        });
        DriveError::Api {
            status: self.status,
            message,
        }
    }
}

pub async fn send_and_text(req: RequestBuilder) -> Result<Reply> {
    let response = req.send().await?;
    let status = response.status().as_u16();
    Ok(Reply::new(status, response.text().await?))
}

/// Reads `error.message` from a Misskey error body.
pub fn upstream_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_owned)
}

/// Returns at most `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(idx, _)| &text[..idx])
}

/// Deserialises a JSON array into `T`s; anything that is not an array counts as empty.
pub fn parse_list<T: DeserializeOwned>(value: Value, action: &str) -> Result<Vec<T>> {
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(|err| {
            DriveError::InvalidResponse(format!(
                "Invalid response from server when trying to {action}: {err}"
            ))
        }),
        _ => Ok(Vec::new()),
    }
}
