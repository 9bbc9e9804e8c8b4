use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::interface::{
    DriveApi, DriveFile, DriveFolder, FileQuery, FileUpload, FolderQuery, ItemKind, ItemUpdate,
};
use super::path::{DrivePath, FolderChain, ensure, resolve};
use crate::error::{DriveError, Result};
use crate::misskey::MisskeyCredentials;

const SEARCH_LIMIT: u32 = 100;
const SCAN_PAGE_LIMIT: u32 = 100;
const NEWEST_FIRST: &str = "-createdAt";

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub thumbnail_url: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListedItem {
    Folder(FolderEntry),
    File(FileEntry),
}

impl From<DriveFolder> for ListedItem {
    fn from(folder: DriveFolder) -> Self {
        Self::Folder(FolderEntry {
            id: folder.id,
            name: folder.name,
            created_at: folder.created_at,
        })
    }
}

impl From<DriveFile> for ListedItem {
    fn from(file: DriveFile) -> Self {
        Self::File(FileEntry {
            id: file.id,
            name: file.name,
            created_at: file.created_at,
            size: file.size,
            mime_type: file.mime_type,
            thumbnail_url: file.thumbnail_url,
            folder_id: file.folder_id,
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub created_at: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
    pub is_image: bool,
    pub is_video: bool,
    pub folder_id: Option<String>,
}

impl MediaFile {
    fn from_file(file: DriveFile) -> Option<Self> {
        let is_image = file.has_mime_prefix("image/");
        let is_video = file.has_mime_prefix("video/");
        (is_image || is_video).then(|| Self {
            id: file.id,
            name: file.name,
            kind: "file",
            created_at: file.created_at,
            size: file.size,
            mime_type: file.mime_type,
            thumbnail_url: file.thumbnail_url,
            url: file.url,
            is_image,
            is_video,
            folder_id: file.folder_id,
        })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename(deserialize = "type", serialize = "mimeType"), default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub is_sensitive: Option<bool>,
    #[serde(default)]
    pub blurhash: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub folders_count: Option<u64>,
    #[serde(default)]
    pub files_count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemDetails {
    File(FileDetails),
    Folder(FolderDetails),
}

#[derive(Deserialize, Debug, Clone)]
pub struct MoveItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub success: bool,
    pub all_success: bool,
    pub success_count: usize,
    pub total_count: usize,
    pub results: Vec<MoveResult>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub success: bool,
    pub message: String,
    pub results: Vec<UploadResult>,
}

/// File-manager operations on top of a [`DriveApi`].
pub struct DriveManager {
    api: Arc<dyn DriveApi>,
    credentials: MisskeyCredentials,
    ensure_lock: async_lock::Mutex<()>,
}

impl core::fmt::Debug for DriveManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriveManager")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl DriveManager {
    pub fn new(api: Arc<dyn DriveApi>, credentials: MisskeyCredentials) -> Self {
        Self {
            api,
            credentials,
            ensure_lock: async_lock::Mutex::new(()),
        }
    }

    pub fn api(&self) -> &dyn DriveApi {
        self.api.as_ref()
    }

    pub const fn as_credentials(&self) -> &MisskeyCredentials {
        &self.credentials
    }

    pub async fn resolve(&self, path: &DrivePath) -> Result<Option<FolderChain>> {
        resolve(self.api(), path).await
    }

    /// Ensure walks are serialised so parallel requests don't create twins.
    pub async fn ensure(&self, path: &DrivePath) -> Result<FolderChain> {
        let _guard = self.ensure_lock.lock().await;
        ensure(self.api(), path).await
    }

    /// Creates `drive/<user>/data` if needed.
    pub async fn validate_user(&self, user_id: &str) -> Result<FolderChain> {
        info!("Creating directory structure for user {user_id}");
        let chain = self.ensure(&DrivePath::user_data(user_id)).await?;
        for link in chain.links() {
            debug!("Directory {}: {}", link.name, link.id);
        }
        Ok(chain)
    }

    /// Folders first, then files.
    pub async fn list_items(&self, folder_id: &str) -> Result<Vec<ListedItem>> {
        debug!("Listing items in folder {folder_id}");
        let folders = self
            .api
            .list_folders(&FolderQuery {
                parent_id: Some(folder_id.to_owned()),
                ..FolderQuery::default()
            })
            .await?;
        let files = self
            .api
            .list_files(&FileQuery {
                folder_id: Some(folder_id.to_owned()),
                ..FileQuery::default()
            })
            .await?;
        debug!("Found {} folders and {} files", folders.len(), files.len());

        Ok(folders
            .into_iter()
            .map(ListedItem::from)
            .chain(files.into_iter().map(ListedItem::from))
            .collect())
    }

    pub async fn collections(&self, user_id: &str) -> Result<Vec<Collection>> {
        let Some(chain) = self.resolve(&DrivePath::user_data(user_id)).await? else {
            return Ok(Vec::new());
        };
        let Some(data_id) = chain.leaf() else {
            return Ok(Vec::new());
        };
        Ok(self
            .api
            .list_folders(&FolderQuery {
                parent_id: Some(data_id.to_owned()),
                ..FolderQuery::default()
            })
            .await?
            .into_iter()
            .map(|folder| Collection {
                id: folder.id,
                name: folder.name,
            })
            .collect())
    }

    /// Creates `name` inside the existing folder at `parent`.
    pub async fn create_folder(&self, parent: &DrivePath, name: &str) -> Result<DriveFolder> {
        let parent_id = self
            .resolve(parent)
            .await?
            .and_then(|chain| chain.leaf().map(str::to_owned))
            .ok_or_else(|| DriveError::NotFound("Parent directory not found".to_owned()))?;
        info!("Creating folder {name} in parent {parent_id}");
        self.api.create_folder(name, Some(&parent_id)).await
    }

    /// Uploads `files` one by one into `path`, creating it first.
    pub async fn upload_files(&self, path: &DrivePath, files: Vec<FileUpload>) -> Result<UploadReport> {
        if path.is_root() {
            return Err(DriveError::Internal("Failed to find or create directory".to_owned()));
        }
        let chain = self.ensure(path).await?;
        let folder_id = chain
            .leaf()
            .ok_or_else(|| DriveError::Internal("Failed to find or create directory".to_owned()))?;
        info!("Uploading {} files to {path} ({folder_id})", files.len());

        let total = files.len();
        let mut results = Vec::with_capacity(total);
        for file in files {
            let file_name = file.name.clone();
            results.push(match self.api.upload(folder_id, file).await {
                Ok(file_id) => {
                    info!("Uploaded {file_name} as {file_id}");
                    UploadResult {
                        success: true,
                        file_name,
                        file_id: Some(file_id),
                        message: Some("File uploaded successfully".to_owned()),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!("Failed to upload {file_name}: {err}");
                    UploadResult {
                        success: false,
                        file_name,
                        file_id: None,
                        message: None,
                        error: Some(err.to_string()),
                    }
                }
            });
        }

        let uploaded = results.iter().filter(|result| result.success).count();
        Ok(UploadReport {
            success: uploaded > 0,
            message: format!("{uploaded} of {total} files uploaded successfully"),
            results,
        })
    }

    pub async fn rename(&self, kind: ItemKind, id: &str, new_name: &str) -> Result<()> {
        info!("Renaming {} {id} to {new_name}", kind.as_str());
        self.api
            .update(
                kind,
                id,
                &ItemUpdate {
                    name: Some(new_name.to_owned()),
                    parent_id: None,
                },
            )
            .await
    }

    /// Moves every item concurrently; each one succeeds or fails on its own.
    pub async fn move_items(&self, items: &[MoveItem], target_folder_id: &str) -> MoveReport {
        let update = ItemUpdate {
            name: None,
            parent_id: Some(target_folder_id.to_owned()),
        };
        let results = join_all(items.iter().map(|item| {
            let update = &update;
            async move {
                let kind = item.item_type.as_deref().and_then(ItemKind::from_str);
                let outcome = match (item.id.as_deref(), kind) {
                    (None | Some(""), _) => {
                        Err(DriveError::BadRequest("Missing item ID".to_owned()))
                    }
                    (Some(id), Some(kind)) => self.api.update(kind, id, update).await,
                    (Some(_), None) => Err(DriveError::BadRequest("Invalid item type".to_owned())),
                };
                match outcome {
                    Ok(()) => MoveResult {
                        id: item.id.clone(),
                        success: true,
                        error: None,
                    },
                    Err(err) => {
                        warn!(
                            "Failed to move {} {}: {err}",
                            item.item_type.as_deref().unwrap_or("item"),
                            item.id.as_deref().unwrap_or("without id")
                        );
                        MoveResult {
                            id: item.id.clone(),
                            success: false,
                            error: Some(err.to_string()),
                        }
                    }
                }
            }
        }))
        .await;

        let success_count = results.iter().filter(|result| result.success).count();
        MoveReport {
            success: success_count > 0,
            all_success: success_count == results.len(),
            success_count,
            total_count: items.len(),
            results,
        }
    }

    pub async fn delete(&self, kind: ItemKind, id: &str) -> Result<()> {
        info!("Deleting {} {id}", kind.as_str());
        self.api.delete(kind, id).await
    }

    pub async fn item_details(&self, kind: ItemKind, id: &str) -> Result<ItemDetails> {
        let value = self.api.show(kind, id).await?;
        let invalid = |err: serde_json::Error| {
            DriveError::InvalidResponse(format!("Invalid {} details: {err}", kind.as_str()))
        };
        Ok(match kind {
            ItemKind::File => ItemDetails::File(serde_json::from_value(value).map_err(invalid)?),
            ItemKind::Folder => {
                ItemDetails::Folder(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    /// Raw upstream object of a file.
    pub async fn preview(&self, file_id: &str) -> Result<Value> {
        self.api.show(ItemKind::File, file_id).await
    }

    /// Files matching `query` and folders named like it, folders first.
    pub async fn search(&self, query: &str) -> Result<Vec<ListedItem>> {
        let files = self
            .api
            .list_files(&FileQuery {
                query: Some(query.to_owned()),
                limit: Some(SEARCH_LIMIT),
                ..FileQuery::default()
            })
            .await?;
        let folders = self
            .api
            .list_folders(&FolderQuery {
                name: Some(query.to_owned()),
                limit: Some(SEARCH_LIMIT),
                ..FolderQuery::default()
            })
            .await?;
        Ok(folders
            .into_iter()
            .map(ListedItem::from)
            .chain(files.into_iter().map(ListedItem::from))
            .collect())
    }

    pub async fn recent_files(&self, limit: u32) -> Result<Vec<ListedItem>> {
        Ok(self
            .api
            .list_files(&FileQuery {
                limit: Some(limit),
                sort: Some(NEWEST_FIRST),
                ..FileQuery::default()
            })
            .await?
            .into_iter()
            .map(ListedItem::from)
            .collect())
    }

    /// Images and videos anywhere under `drive/<user>`, depth first.
    pub async fn scan_media(&self, user_id: &str) -> Result<Vec<MediaFile>> {
        info!("Scanning media files for user {user_id}");
        let Some(root) = self
            .resolve(&DrivePath::user_root(user_id))
            .await?
            .and_then(|chain| chain.leaf().map(str::to_owned))
        else {
            return Ok(Vec::new());
        };

        let mut media = Vec::new();
        let mut pending = vec![root];
        while let Some(folder_id) = pending.pop() {
            let files = match self
                .api
                .list_files(&FileQuery {
                    folder_id: Some(folder_id.clone()),
                    limit: Some(SCAN_PAGE_LIMIT),
                    ..FileQuery::default()
                })
                .await
            {
                Ok(files) => files,
                Err(err) => {
                    warn!("Skipping folder {folder_id}, files unavailable: {err}");
                    continue;
                }
            };
            media.extend(files.into_iter().filter_map(MediaFile::from_file));

            match self
                .api
                .list_folders(&FolderQuery {
                    parent_id: Some(folder_id.clone()),
                    ..FolderQuery::default()
                })
                .await
            {
                Ok(subfolders) => {
                    pending.extend(subfolders.into_iter().rev().map(|folder| folder.id));
                }
                Err(err) => warn!("Not descending into {folder_id}: {err}"),
            }
        }
        info!("Found {} media files", media.len());
        Ok(media)
    }
}
