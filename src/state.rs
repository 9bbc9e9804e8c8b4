use std::sync::Arc;

use actix_web::{HttpResponse, ResponseError, web};
use serde::Serialize;

use crate::error::{DriveError, Result};
use crate::misskey::{DriveManager, MisskeyDrive};
use crate::nsfw::NsfwScanner;
use crate::settings::Env;

pub type AppData = web::Data<AppState>;

#[derive(Debug)]
pub struct AppState {
    app_name: &'static str,
    drive: Option<DriveManager>,
    nsfw: NsfwScanner,
    max_upload_bytes: usize,
}

pub fn ok_json<T: Serialize>(value: Result<T>) -> HttpResponse {
    match value {
        Ok(val) => HttpResponse::Ok().json(val),
        Err(err) => err.error_response(),
    }
}

pub fn missing(message: &str) -> HttpResponse {
    DriveError::BadRequest(message.to_owned()).error_response()
}

/// Drive manager of the state, or an early error response when unconfigured.
#[macro_export]
macro_rules! drive {
    ($data:ident) => {
        $crate::unwrap_return!($data.to_drive())
    };
}

#[macro_export]
macro_rules! unwrap_return {
    ($value:expr) => {
        match $value {
            Ok(val) => val,
            Err(err) => return actix_web::ResponseError::error_response(&err),
        }
    };
}

impl AppState {
    pub fn new(app_name: &'static str, env: &Env) -> web::Data<Self> {
        let drive = env.credentials.clone().map(|credentials| {
            DriveManager::new(Arc::new(MisskeyDrive::new(credentials.clone())), credentials)
        });
        Self::with_drive(
            app_name,
            drive,
            NsfwScanner::new(env.nsfw_endpoint.clone(), env.nsfw_threshold),
            env.max_upload_bytes,
        )
    }

    pub fn with_drive(
        app_name: &'static str,
        drive: Option<DriveManager>,
        nsfw: NsfwScanner,
        max_upload_bytes: usize,
    ) -> web::Data<Self> {
        web::Data::new(Self {
            app_name,
            drive,
            nsfw,
            max_upload_bytes,
        })
    }

    pub const fn as_app_name(&self) -> &str {
        self.app_name
    }

    pub fn to_drive(&self) -> Result<&DriveManager> {
        self.drive.as_ref().ok_or(DriveError::MissingConfig)
    }

    pub const fn as_nsfw(&self) -> &NsfwScanner {
        &self.nsfw
    }

    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
