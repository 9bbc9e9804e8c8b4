use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::StreamExt as _;

use crate::error::{DriveError, Result};
use crate::misskey::FileUpload;

const UNNAMED_FILE: &str = "unnamed";

/// Buffered `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct Form {
    texts: HashMap<String, String>,
    files: Vec<(String, FileUpload)>,
}

impl Form {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.texts
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Takes every file sent under `field`, in order.
    pub fn take_files(&mut self, field: &str) -> Vec<FileUpload> {
        let (taken, kept) = core::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(name, _)| name == field);
        self.files = kept;
        taken.into_iter().map(|(_, file)| file).collect()
    }
}

/// Reads the whole body, failing once it grows past `limit` bytes.
pub async fn read_form(mut payload: Multipart, limit: usize) -> Result<Form> {
    let mut form = Form::default();
    let mut total = 0usize;

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|err| DriveError::BadRequest(format!("Error parsing request: {err}")))?;
        let name = field.name().map(str::to_owned).unwrap_or_default();
        let file_name = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .map(str::to_owned);
        let content_type = field.content_type().map(|mime| mime.essence_str().to_owned());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|err| DriveError::BadRequest(format!("Error parsing request: {err}")))?;
            total += chunk.len();
            if total > limit {
                return Err(DriveError::PayloadTooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) => form.files.push((
                name,
                FileUpload {
                    name: if file_name.is_empty() { UNNAMED_FILE.to_owned() } else { file_name },
                    content_type,
                    bytes,
                },
            )),
            None => {
                form.texts
                    .insert(name, String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    Ok(form)
}

/// A `(field, Some((file name, content type)), content)` part of a test form.
#[cfg(test)]
pub type TestPart<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a str);

/// Encodes `parts` as `multipart/form-data`, returning the content type and the body.
#[cfg(test)]
pub fn encode_form(parts: &[TestPart<'_>]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "drive-manager-test-boundary";
    let mut body = Vec::new();
    for (field, file, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((file_name, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> FileUpload {
        FileUpload {
            name: name.to_owned(),
            content_type: None,
            bytes: Vec::new(),
        }
    }

    #[test]
    fn take_files_keeps_other_fields() {
        let mut form = Form::default();
        form.files.push(("files".to_owned(), upload("a")));
        form.files.push(("avatar".to_owned(), upload("b")));
        form.files.push(("files".to_owned(), upload("c")));
        form.texts.insert("path".to_owned(), String::new());

        let names: Vec<String> = form.take_files("files").into_iter().map(|file| file.name).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(form.take_files("avatar").len(), 1);
        assert_eq!(form.text("path"), None);
    }
}
