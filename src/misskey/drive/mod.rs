mod action;
#[cfg(test)]
pub mod fake;
pub mod interface;
pub mod manager;
mod path;
mod validate;

use actix_web::{HttpResponse, web};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::state::{AppData, missing, ok_json};
use crate::{drive, unwrap_return};
use path::{DrivePath, FolderChain};
use validate::{item_kind, required};

const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathRequest {
    user_id: Option<String>,
    path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRequest {
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRequest {
    item_id: Option<String>,
    item_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRequest {
    file_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    user_id: Option<String>,
    query: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentRequest {
    user_id: Option<String>,
    limit: Option<u32>,
}

#[actix_web::post("/list-items")]
async fn list_items(data: AppData, body: web::Json<PathRequest>) -> HttpResponse {
    let PathRequest { user_id, path } = body.into_inner();
    let (Some(_), Some(path)) = (required(user_id), required(path)) else {
        return missing("Missing required parameters");
    };
    let drive = drive!(data);

    let path = DrivePath::parse(&path);
    let chain = unwrap_return!(drive.resolve(&path).await);
    let Some(folder_id) = chain.as_ref().and_then(FolderChain::leaf) else {
        info!("Directory not found: {path}, returning empty list");
        return HttpResponse::Ok().json(json!({ "items": [] }));
    };
    ok_json(
        drive
            .list_items(folder_id)
            .await
            .map(|items| json!({ "items": items, "folderId": folder_id })),
    )
}

#[actix_web::post("/list-collections")]
async fn list_collections(data: AppData, body: web::Json<UserRequest>) -> HttpResponse {
    let Some(user_id) = required(body.into_inner().user_id) else {
        return missing("Missing user ID");
    };
    ok_json(
        drive!(data)
            .collections(&user_id)
            .await
            .map(|collections| json!({ "collections": collections })),
    )
}

#[actix_web::post("/item-details")]
async fn item_details(data: AppData, body: web::Json<ItemRequest>) -> HttpResponse {
    let ItemRequest { item_id, item_type } = body.into_inner();
    let (Some(item_id), Some(item_type)) = (required(item_id), required(item_type)) else {
        return missing("Missing required parameters");
    };
    let kind = unwrap_return!(item_kind(&item_type));
    ok_json(
        drive!(data)
            .item_details(kind, &item_id)
            .await
            .map(|details| json!({ "success": true, "details": details })),
    )
}

#[actix_web::post("/preview")]
async fn preview(data: AppData, body: web::Json<FileRequest>) -> HttpResponse {
    let Some(file_id) = required(body.into_inner().file_id) else {
        return missing("Missing file ID");
    };
    ok_json(
        drive!(data)
            .preview(&file_id)
            .await
            .map(|file| json!({ "success": true, "file": file })),
    )
}

#[actix_web::post("/search-items")]
async fn search_items(data: AppData, body: web::Json<SearchRequest>) -> HttpResponse {
    let SearchRequest { user_id, query } = body.into_inner();
    let query = query.filter(|query| !query.trim().is_empty());
    let (Some(_), Some(query)) = (required(user_id), query) else {
        return missing("Missing required parameters");
    };
    ok_json(
        drive!(data)
            .search(&query)
            .await
            .map(|results| json!({ "success": true, "results": results })),
    )
}

#[actix_web::post("/recent-files")]
async fn recent_files(data: AppData, body: web::Json<RecentRequest>) -> HttpResponse {
    let RecentRequest { user_id, limit } = body.into_inner();
    if required(user_id).is_none() {
        return missing("Missing user ID");
    }
    ok_json(
        drive!(data)
            .recent_files(limit.unwrap_or(DEFAULT_RECENT_LIMIT))
            .await
            .map(|files| json!({ "files": files })),
    )
}

#[actix_web::post("/scan-media")]
async fn scan_media(data: AppData, body: web::Json<UserRequest>) -> HttpResponse {
    let Some(user_id) = required(body.into_inner().user_id) else {
        return missing("Missing user ID");
    };
    ok_json(
        drive!(data)
            .scan_media(&user_id)
            .await
            .map(|media| json!({ "success": true, "mediaFiles": media })),
    )
}

pub fn drive_config(cfg: &mut web::ServiceConfig) {
    cfg //
        .service(list_items)
        .service(list_collections)
        .service(item_details)
        .service(preview)
        .service(search_items)
        .service(recent_files)
        .service(scan_media)
        .configure(action::config);
}
