//! In-memory drive used by the tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::interface::{
    DriveApi, DriveFile, DriveFolder, FileQuery, FileUpload, FolderQuery, ItemKind, ItemUpdate,
};
use crate::api::Reply;
use crate::error::{DriveError, Result};
use crate::misskey::{DriveManager, MisskeyCredentials};
use crate::nsfw::NsfwScanner;
use crate::state::{AppData, AppState};

/// Upload limit of the test state.
pub const TEST_UPLOAD_LIMIT: usize = 1024;

/// App state over `drive`, or without drive configuration when `None`.
pub fn app_state(drive: Option<Arc<FakeDrive>>) -> AppData {
    let credentials = MisskeyCredentials::new("https://misskey.test/", "token".to_owned());
    AppState::with_drive(
        "test",
        drive.map(|drive| DriveManager::new(drive, credentials)),
        NsfwScanner::new(None, 0.5),
        TEST_UPLOAD_LIMIT,
    )
}

#[derive(Debug, Default)]
struct Tree {
    folders: Vec<DriveFolder>,
    files: Vec<DriveFile>,
    next_id: u32,
    created: Vec<String>,
    finds: u32,
}

#[derive(Debug, Default)]
pub struct FakeDrive {
    tree: Mutex<Tree>,
    /// Names whose find, create, upload or listing fails.
    failing: Mutex<HashSet<String>>,
    /// Hands control back to the runtime before each folder lookup or creation.
    yielding: AtomicBool,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_owned());
    }

    pub fn yield_between_calls(&self) {
        self.yielding.store(true, Ordering::Relaxed);
    }

    async fn maybe_yield(&self) {
        if self.yielding.load(Ordering::Relaxed) {
            actix_web::rt::task::yield_now().await;
        }
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(name) {
            Err(DriveError::Api {
                status: 500,
                message: format!("Internal error on {name}"),
            })
        } else {
            Ok(())
        }
    }

    pub fn add_folder(&self, name: &str, parent_id: Option<&str>) -> String {
        let mut tree = self.tree.lock().unwrap();
        tree.next_id += 1;
        let id = format!("d{}", tree.next_id);
        tree.folders.push(DriveFolder {
            id: id.clone(),
            name: name.to_owned(),
            created_at: Some("2024-01-01T00:00:00.000Z".to_owned()),
            parent_id: parent_id.map(str::to_owned),
        });
        id
    }

    pub fn add_file(&self, name: &str, mime_type: &str, folder_id: Option<&str>) -> String {
        let mut tree = self.tree.lock().unwrap();
        tree.next_id += 1;
        let id = format!("f{}", tree.next_id);
        let secs = tree.next_id % 60;
        tree.files.push(DriveFile {
            id: id.clone(),
            name: name.to_owned(),
            created_at: Some(format!("2024-01-01T00:00:{secs:02}.000Z")),
            size: Some(42),
            mime_type: Some(mime_type.to_owned()),
            thumbnail_url: None,
            url: Some(format!("https://misskey.example/files/{id}")),
            folder_id: folder_id.map(str::to_owned),
        });
        id
    }

    /// Names of the folders created through [`DriveApi::create_folder`], in order.
    pub fn created(&self) -> Vec<String> {
        self.tree.lock().unwrap().created.clone()
    }

    pub fn finds(&self) -> u32 {
        self.tree.lock().unwrap().finds
    }

    pub fn folder(&self, id: &str) -> Option<DriveFolder> {
        self.tree
            .lock()
            .unwrap()
            .folders
            .iter()
            .find(|folder| folder.id == id)
            .cloned()
    }

    pub fn file(&self, id: &str) -> Option<DriveFile> {
        self.tree
            .lock()
            .unwrap()
            .files
            .iter()
            .find(|file| file.id == id)
            .cloned()
    }

    pub fn files_in(&self, folder_id: &str) -> Vec<DriveFile> {
        self.tree
            .lock()
            .unwrap()
            .files
            .iter()
            .filter(|file| file.folder_id.as_deref() == Some(folder_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    /// Matches case-insensitively, like a lenient server would.
    async fn find_folders(&self, name: &str, parent_id: Option<&str>) -> Result<Vec<DriveFolder>> {
        self.maybe_yield().await;
        self.check(name)?;
        let mut tree = self.tree.lock().unwrap();
        tree.finds += 1;
        Ok(tree
            .folders
            .iter()
            .filter(|folder| {
                folder.name.eq_ignore_ascii_case(name) && folder.parent_id.as_deref() == parent_id
            })
            .cloned()
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFolder> {
        self.maybe_yield().await;
        self.check(&format!("create:{name}"))?;
        let id = self.add_folder(name, parent_id);
        self.tree.lock().unwrap().created.push(name.to_owned());
        self.folder(&id)
            .ok_or_else(|| DriveError::InvalidResponse("lost folder".to_owned()))
    }

    async fn list_folders(&self, query: &FolderQuery) -> Result<Vec<DriveFolder>> {
        if let Some(parent_id) = &query.parent_id {
            self.check(&format!("list:{parent_id}"))?;
        }
        let tree = self.tree.lock().unwrap();
        Ok(tree
            .folders
            .iter()
            .filter(|folder| match (&query.name, &query.parent_id) {
                (Some(name), _) => folder.name.contains(name.as_str()),
                (None, parent_id) => folder.parent_id == *parent_id,
            })
            .cloned()
            .collect())
    }

    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        if let Some(folder_id) = &query.folder_id {
            self.check(&format!("files:{folder_id}"))?;
        }
        let tree = self.tree.lock().unwrap();
        let mut files: Vec<DriveFile> = tree
            .files
            .iter()
            .filter(|file| {
                query.folder_id.is_none() || file.folder_id.as_deref() == query.folder_id.as_deref()
            })
            .filter(|file| {
                query
                    .query
                    .as_deref()
                    .is_none_or(|text| file.name.contains(text))
            })
            .cloned()
            .collect();
        if query.sort == Some("-createdAt") {
            files.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        }
        if let Some(limit) = query.limit {
            files.truncate(limit as usize);
        }
        Ok(files)
    }

    async fn show(&self, kind: ItemKind, id: &str) -> Result<Value> {
        let missing = || DriveError::Api {
            status: 400,
            message: format!("No such {}.", kind.as_str()),
        };
        match kind {
            ItemKind::File => self
                .file(id)
                .map(|file| {
                    let mut value = serde_json::to_value(file).unwrap();
                    value["isSensitive"] = json!(false);
                    value
                })
                .ok_or_else(missing),
            ItemKind::Folder => self
                .folder(id)
                .map(|folder| {
                    let mut value = serde_json::to_value(folder).unwrap();
                    value["foldersCount"] = json!(0);
                    value["filesCount"] = json!(self.files_in(id).len());
                    value
                })
                .ok_or_else(missing),
        }
    }

    async fn update(&self, kind: ItemKind, id: &str, update: &ItemUpdate) -> Result<()> {
        self.check(id)?;
        let mut tree = self.tree.lock().unwrap();
        let missing = DriveError::Api {
            status: 400,
            message: format!("No such {}.", kind.as_str()),
        };
        match kind {
            ItemKind::File => {
                let file = tree.files.iter_mut().find(|file| file.id == id).ok_or(missing)?;
                if let Some(name) = &update.name {
                    file.name.clone_from(name);
                }
                if let Some(parent_id) = &update.parent_id {
                    file.folder_id = Some(parent_id.clone());
                }
            }
            ItemKind::Folder => {
                let folder = tree
                    .folders
                    .iter_mut()
                    .find(|folder| folder.id == id)
                    .ok_or(missing)?;
                if let Some(name) = &update.name {
                    folder.name.clone_from(name);
                }
                if let Some(parent_id) = &update.parent_id {
                    folder.parent_id = Some(parent_id.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, kind: ItemKind, id: &str) -> Result<()> {
        self.check(id)?;
        let mut tree = self.tree.lock().unwrap();
        let before = tree.files.len() + tree.folders.len();
        match kind {
            ItemKind::File => tree.files.retain(|file| file.id != id),
            ItemKind::Folder => tree.folders.retain(|folder| folder.id != id),
        }
        if before == tree.files.len() + tree.folders.len() {
            return Err(DriveError::Api {
                status: 400,
                message: format!("No such {}.", kind.as_str()),
            });
        }
        Ok(())
    }

    async fn upload(&self, folder_id: &str, file: FileUpload) -> Result<String> {
        self.check(&file.name)?;
        Ok(self.add_file(
            &file.name,
            file.content_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
            Some(folder_id),
        ))
    }

    async fn meta(&self) -> Result<Reply> {
        Ok(Reply::new(
            200,
            r#"{"name":"Test Instance","version":"2024.1.0"}"#.to_owned(),
        ))
    }
}
