mod credentials;
mod drive;
mod status;

pub use credentials::MisskeyCredentials;
pub use drive::interface::{FileUpload, MisskeyDrive};
pub use drive::manager::DriveManager;

use actix_web::web;

use crate::error::DriveError;

pub fn misskey_config(cfg: &mut web::ServiceConfig) {
    cfg //
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            DriveError::BadRequest(format!("Invalid JSON body: {err}")).into()
        }))
        .configure(status::status_config)
        .configure(drive::drive_config);
}
