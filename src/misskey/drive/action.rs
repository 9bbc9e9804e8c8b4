//! Routes that change the drive.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};

use super::manager::MoveItem;
use super::path::DrivePath;
use super::validate::{check_name, check_user_id, item_kind, required};
use crate::multipart::read_form;
use crate::state::{AppData, missing, ok_json};
use crate::{drive, unwrap_return};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    user_id: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest {
    user_id: Option<String>,
    path: Option<String>,
    folder_name: Option<String>,
}

#[derive(Deserialize)]
struct EnsureRequest {
    path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTokenRequest {
    file_name: Option<String>,
    file_type: Option<String>,
    folder_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest {
    item_id: Option<String>,
    item_type: Option<String>,
    new_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    #[serde(default)]
    items: Option<Vec<MoveItem>>,
    target_folder_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    item_id: Option<String>,
    item_type: Option<String>,
}

#[actix_web::post("/validate-user")]
async fn validate_user(data: AppData, body: web::Json<ValidateRequest>) -> HttpResponse {
    let Some(user_id) = body
        .user_id
        .as_ref()
        .and_then(Value::as_str)
        .filter(|user_id| !user_id.is_empty())
    else {
        return missing("Invalid user ID");
    };
    unwrap_return!(check_user_id(user_id));
    ok_json(
        drive!(data)
            .validate_user(user_id)
            .await
            .map(|_| json!({ "success": true })),
    )
}

#[actix_web::post("/create-folder")]
async fn create_folder(data: AppData, body: web::Json<CreateFolderRequest>) -> HttpResponse {
    let CreateFolderRequest {
        user_id,
        path,
        folder_name,
    } = body.into_inner();
    let (Some(_), Some(path), Some(folder_name)) =
        (required(user_id), required(path), required(folder_name))
    else {
        return missing("Missing required parameters");
    };
    unwrap_return!(check_name(&folder_name, "Invalid folder name"));
    ok_json(
        drive!(data)
            .create_folder(&DrivePath::parse(&path), &folder_name)
            .await
            .map(|_| json!({ "success": true })),
    )
}

#[actix_web::post("/ensure-directory")]
async fn ensure_directory(data: AppData, body: web::Json<EnsureRequest>) -> HttpResponse {
    let Some(path) = required(body.into_inner().path) else {
        return missing("Missing path parameter");
    };
    ok_json(
        drive!(data)
            .ensure(&DrivePath::parse(&path))
            .await
            .map(|chain| json!({ "success": true, "directoryId": chain.leaf() })),
    )
}

#[actix_web::post("/upload-files")]
async fn upload_files(data: AppData, payload: Multipart) -> HttpResponse {
    let mut form = unwrap_return!(read_form(payload, data.max_upload_bytes()).await);
    let files = form.take_files("files");
    let (Some(_), Some(path)) = (form.text("userId"), form.text("path")) else {
        return missing("Missing required parameters");
    };
    if files.is_empty() {
        return missing("Missing required parameters");
    }
    let path = DrivePath::parse(path);
    ok_json(drive!(data).upload_files(&path, files).await)
}

#[actix_web::post("/get-upload-token")]
async fn get_upload_token(data: AppData, body: web::Json<UploadTokenRequest>) -> HttpResponse {
    let UploadTokenRequest {
        file_name,
        file_type,
        folder_id,
    } = body.into_inner();
    let (Some(file_name), Some(_)) = (required(file_name), required(file_type)) else {
        return missing("Missing required parameters");
    };
    let credentials = drive!(data).as_credentials();
    HttpResponse::Ok().json(json!({
        "success": true,
        "uploadUrl": credentials.endpoint("drive/files/create"),
        "apiKey": credentials.as_api_key(),
        "folderId": folder_id,
        "fileName": file_name,
    }))
}

#[actix_web::post("/rename-item")]
async fn rename_item(data: AppData, body: web::Json<RenameRequest>) -> HttpResponse {
    let RenameRequest {
        item_id,
        item_type,
        new_name,
    } = body.into_inner();
    let (Some(item_id), Some(item_type), Some(new_name)) =
        (required(item_id), required(item_type), required(new_name))
    else {
        return missing("Missing required parameters");
    };
    unwrap_return!(check_name(&new_name, "Invalid name"));
    let kind = unwrap_return!(item_kind(&item_type));
    ok_json(
        drive!(data)
            .rename(kind, &item_id, &new_name)
            .await
            .map(|()| json!({ "success": true })),
    )
}

#[actix_web::post("/move-items")]
async fn move_items(data: AppData, body: web::Json<MoveRequest>) -> HttpResponse {
    let MoveRequest {
        items,
        target_folder_id,
    } = body.into_inner();
    let items = items.unwrap_or_default();
    let Some(target_folder_id) = required(target_folder_id).filter(|_| !items.is_empty()) else {
        return missing("Missing required parameters");
    };
    HttpResponse::Ok().json(drive!(data).move_items(&items, &target_folder_id).await)
}

#[actix_web::post("/delete-item")]
async fn delete_item(data: AppData, body: web::Json<DeleteRequest>) -> HttpResponse {
    let DeleteRequest { item_id, item_type } = body.into_inner();
    let (Some(item_id), Some(item_type)) = (required(item_id), required(item_type)) else {
        return missing("Missing required parameters");
    };
    let kind = unwrap_return!(item_kind(&item_type));
    ok_json(
        drive!(data)
            .delete(kind, &item_id)
            .await
            .map(|()| json!({ "success": true })),
    )
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg //
        .service(validate_user)
        .service(create_folder)
        .service(ensure_directory)
        .service(upload_files)
        .service(get_upload_token)
        .service(rename_item)
        .service(move_items)
        .service(delete_item);
}
