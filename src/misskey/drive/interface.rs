//! Client for the Misskey drive endpoints.
//!
//! Every call is a `POST {api_url}/api/<endpoint>` whose JSON body carries the
//! token as `i`. Upload is the only multipart request.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, multipart};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::api::{Reply, excerpt, parse_list, send_and_text};
use crate::error::{DriveError, Result};
use crate::misskey::MisskeyCredentials;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl DriveFile {
    pub fn has_mime_prefix(&self, prefix: &str) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with(prefix))
    }
}

macro_rules! make_item_kind {
    ($($pascal:ident $str:literal,)*) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum ItemKind {
            $($pascal,)*
        }

        impl ItemKind {
            pub fn from_str(value: &str) -> Option<Self> {
                match value {
                    $($str => Some(Self::$pascal),)*
                    _ => None
                }
            }

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$pascal => $str,)*
                }
            }
        }
    };
}

make_item_kind!(
    File "file",
    Folder "folder",
);

impl ItemKind {
    fn endpoint(self, action: &str) -> String {
        match self {
            Self::File => format!("drive/files/{action}"),
            Self::Folder => format!("drive/folders/{action}"),
        }
    }

    const fn id_field(self) -> &'static str {
        match self {
            Self::File => "fileId",
            Self::Folder => "folderId",
        }
    }

    /// Files live in a `folderId`, folders under a `parentId`.
    const fn container_field(self) -> &'static str {
        match self {
            Self::File => "folderId",
            Self::Folder => "parentId",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct FolderQuery {
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Clone)]
pub struct FileQuery {
    pub folder_id: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub sort: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Remote drive operations used by the file manager.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Folders called `name` directly under `parent_id` (`None` is the drive root).
    async fn find_folders(&self, name: &str, parent_id: Option<&str>) -> Result<Vec<DriveFolder>>;

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFolder>;

    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<DriveFolder>>;

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>>;

    /// Raw `show` object of a file or folder.
    async fn show(&self, kind: ItemKind, id: &str) -> Result<Value>;

    async fn update(&self, kind: ItemKind, id: &str, update: &ItemUpdate) -> Result<()>;

    async fn delete(&self, kind: ItemKind, id: &str) -> Result<()>;

    /// Uploads a file and returns its new id.
    async fn upload(&self, folder_id: &str, file: FileUpload) -> Result<String>;

    /// Probe of the instance metadata, status included.
    async fn meta(&self) -> Result<Reply>;
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn insert_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_owned(), value);
    }
}

#[derive(Debug)]
pub struct MisskeyDrive {
    client: Client,
    credentials: MisskeyCredentials,
}

impl MisskeyDrive {
    pub fn new(credentials: MisskeyCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }

    async fn call(&self, endpoint: &str, params: Map<String, Value>) -> Result<Reply> {
        debug!("POST /api/{endpoint}");
        send_and_text(
            self.client
                .post(self.credentials.endpoint(endpoint))
                .json(&self.credentials.as_body(params)),
        )
        .await
    }
}

#[async_trait]
impl DriveApi for MisskeyDrive {
    async fn find_folders(&self, name: &str, parent_id: Option<&str>) -> Result<Vec<DriveFolder>> {
        let value = self
            .call(
                "drive/folders/find",
                params(json!({ "name": name, "parentId": parent_id })),
            )
            .await?
            .into_json::<Value>(&format!("find folder {name}"))?;
        parse_list(value, &format!("find folder {name}"))
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFolder> {
        self.call(
            "drive/folders/create",
            params(json!({ "name": name, "parentId": parent_id })),
        )
        .await?
        .into_json(&format!("create folder {name}"))
    }

    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<DriveFolder>> {
        let mut body = Map::new();
        if let Some(parent_id) = &query.parent_id {
            // Some instances read `folderId`, others `parentId`.
            body.insert("folderId".to_owned(), json!(parent_id));
            body.insert("parentId".to_owned(), json!(parent_id));
        }
        insert_some(&mut body, "name", query.name.as_ref().map(|name| json!(name)));
        insert_some(&mut body, "limit", query.limit.map(|limit| json!(limit)));

        let value = self
            .call("drive/folders", body)
            .await?
            .into_json::<Value>("fetch folders")?;
        parse_list(value, "fetch folders")
    }

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        let mut body = Map::new();
        insert_some(&mut body, "folderId", query.folder_id.as_ref().map(|id| json!(id)));
        insert_some(&mut body, "query", query.query.as_ref().map(|text| json!(text)));
        insert_some(&mut body, "limit", query.limit.map(|limit| json!(limit)));
        insert_some(&mut body, "sort", query.sort.map(|sort| json!(sort)));

        let value = self
            .call("drive/files", body)
            .await?
            .into_json::<Value>("fetch files")?;
        parse_list(value, "fetch files")
    }

    async fn show(&self, kind: ItemKind, id: &str) -> Result<Value> {
        self.call(&kind.endpoint("show"), params(json!({ kind.id_field(): id })))
            .await?
            .into_json(&format!("get {} details", kind.as_str()))
    }

    async fn update(&self, kind: ItemKind, id: &str, update: &ItemUpdate) -> Result<()> {
        let mut body = params(json!({ kind.id_field(): id }));
        insert_some(&mut body, "name", update.name.as_ref().map(|name| json!(name)));
        insert_some(
            &mut body,
            kind.container_field(),
            update.parent_id.as_ref().map(|id| json!(id)),
        );
        self.call(&kind.endpoint("update"), body)
            .await?
            .into_unit(&format!("update {}", kind.as_str()))
    }

    async fn delete(&self, kind: ItemKind, id: &str) -> Result<()> {
        self.call(&kind.endpoint("delete"), params(json!({ kind.id_field(): id })))
            .await?
            .into_unit(&format!("delete {}", kind.as_str()))
    }

    async fn upload(&self, folder_id: &str, file: FileUpload) -> Result<String> {
        let FileUpload {
            name,
            content_type,
            bytes,
        } = file;
        debug!("Uploading {name} ({} bytes) to folder {folder_id}", bytes.len());

        let mut part = multipart::Part::bytes(bytes).file_name(name.clone());
        if let Some(content_type) = &content_type {
            part = part
                .mime_str(content_type)
                .map_err(|err| DriveError::BadRequest(format!("Invalid content type: {err}")))?;
        }
        let form = multipart::Form::new()
            .text("i", self.credentials.as_api_key().to_owned())
            .text("folderId", folder_id.to_owned())
            .part("file", part);

        let reply = send_and_text(
            self.client
                .post(self.credentials.endpoint("drive/files/create"))
                .multipart(form),
        )
        .await?;
        if !reply.is_success() {
            return Err(reply.into_error("upload file"));
        }
        Ok(uploaded_id(&name, reply.as_text()))
    }

    async fn meta(&self) -> Result<Reply> {
        self.call("meta", Map::new()).await
    }
}

/// Id of an uploaded file, with a placeholder when the upstream body is not usable.
fn uploaded_id(name: &str, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| {
                warn!("Upload response for {name} has no id");
                "unknown".to_owned()
            }),
        Err(err) => {
            warn!(
                "Upload response for {name} is not JSON ({err}): {}",
                excerpt(body, 100)
            );
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_millis());
            format!("unknown-{millis}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_parses_known_types() {
        assert_eq!(ItemKind::from_str("file"), Some(ItemKind::File));
        assert_eq!(ItemKind::from_str("folder"), Some(ItemKind::Folder));
        assert_eq!(ItemKind::from_str("Folder"), None);
        assert_eq!(ItemKind::Folder.endpoint("update"), "drive/folders/update");
        assert_eq!(ItemKind::File.container_field(), "folderId");
        assert_eq!(ItemKind::Folder.container_field(), "parentId");
    }

    #[test]
    fn drive_file_reads_misskey_shape() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id":"f1","name":"cat.png","createdAt":"2024-01-01T00:00:00.000Z",
                "size":1234,"type":"image/png","thumbnailUrl":null,
                "url":"https://misskey.example/files/f1","folderId":"d1","isSensitive":false}"#,
        )
        .unwrap();
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
        assert_eq!(file.size, Some(1234));
        assert!(file.has_mime_prefix("image/"));
        assert!(!file.has_mime_prefix("video/"));
    }

    #[test]
    fn uploaded_id_prefers_response_id() {
        assert_eq!(uploaded_id("a.txt", r#"{"id":"9abc"}"#), "9abc");
        assert_eq!(uploaded_id("a.txt", r#"{"name":"a.txt"}"#), "unknown");
        assert!(uploaded_id("a.txt", "<html>ok</html>").starts_with("unknown-"));
    }
}
