//! Slash-delimited logical paths and their walk down the remote folder tree.

use core::fmt;

use log::{debug, info};

use super::interface::{DriveApi, DriveFolder};
use crate::error::{DriveError, Result};

const BASE_FOLDER: &str = "drive";
const DATA_FOLDER: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrivePath {
    segments: Vec<String>,
}

impl DrivePath {
    /// Splits on `/`, dropping empty segments.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// `drive/<user>`
    pub fn user_root(user_id: &str) -> Self {
        Self {
            segments: vec![BASE_FOLDER.to_owned(), user_id.to_owned()],
        }
    }

    /// `drive/<user>/data`, the workspace shown to the user.
    pub fn user_data(user_id: &str) -> Self {
        let mut path = Self::user_root(user_id);
        path.segments.push(DATA_FOLDER.to_owned());
        path
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for DrivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLink {
    pub name: String,
    pub id: String,
}

/// Folder ids met along a walk, from the root down.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FolderChain {
    links: Vec<FolderLink>,
}

impl FolderChain {
    fn push(&mut self, folder: DriveFolder) {
        self.links.push(FolderLink {
            name: folder.name,
            id: folder.id,
        });
    }

    /// Id of the last folder; `None` is the drive root.
    pub fn leaf(&self) -> Option<&str> {
        self.links.last().map(|link| link.id.as_str())
    }

    pub fn links(&self) -> &[FolderLink] {
        &self.links
    }
}

async fn find_child(
    api: &dyn DriveApi,
    name: &str,
    parent_id: Option<&str>,
) -> Result<Option<DriveFolder>> {
    Ok(api
        .find_folders(name, parent_id)
        .await?
        .into_iter()
        .find(|folder| folder.name == name))
}

/// Looks up every segment without creating anything.
pub async fn resolve(api: &dyn DriveApi, path: &DrivePath) -> Result<Option<FolderChain>> {
    debug!("Resolving {path}");
    let mut chain = FolderChain::default();
    for segment in path.segments() {
        match find_child(api, segment, chain.leaf()).await? {
            Some(folder) => {
                debug!("Found folder {segment} with id {}", folder.id);
                chain.push(folder);
            }
            None => {
                debug!("Folder {segment} of {path} not found");
                return Ok(None);
            }
        }
    }
    Ok(Some(chain))
}

/// Looks up every segment, creating the missing ones under their parent.
pub async fn ensure(api: &dyn DriveApi, path: &DrivePath) -> Result<FolderChain> {
    debug!("Ensuring {path}");
    let mut chain = FolderChain::default();
    for segment in path.segments() {
        let folder = match find_child(api, segment, chain.leaf())
            .await
            .map_err(|err| DriveError::in_directory(segment, err))?
        {
            Some(folder) => folder,
            None => {
                info!(
                    "Creating directory {segment} (parent: {})",
                    chain.leaf().unwrap_or("root")
                );
                api.create_folder(segment, chain.leaf())
                    .await
                    .map_err(|err| DriveError::in_directory(segment, err))?
            }
        };
        chain.push(folder);
    }
    Ok(chain)
}
