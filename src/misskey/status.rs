use actix_web::{HttpResponse, web};
use log::error;
use serde_json::{Value, json};

use crate::api::excerpt;
use crate::state::AppData;

const RAW_EXCERPT_LEN: usize = 500;

#[actix_web::get("/check-env")]
async fn check_env(data: AppData) -> HttpResponse {
    let Ok(drive) = data.to_drive() else {
        return HttpResponse::Ok().json(json!({
            "success": false,
            "message": "MISSKEY API configuration is missing",
        }));
    };

    HttpResponse::Ok().json(match drive.api().meta().await {
        Ok(reply) if reply.is_success() => json!({
            "success": true,
            "message": "MISSKEY API configuration is valid",
        }),
        Ok(reply) => {
            error!("Meta request answered {}", reply.status());
            json!({
                "success": false,
                "message": "MISSKEY API credentials are invalid or the API is not accessible",
            })
        }
        Err(err) => json!({
            "success": false,
            "message": "Failed to connect to MISSKEY API",
            "error": err.to_string(),
        }),
    })
}

#[actix_web::get("/test-connection")]
async fn test_connection(data: AppData) -> HttpResponse {
    let Ok(drive) = data.to_drive() else {
        return HttpResponse::Ok().json(json!({
            "success": false,
            "message": "MISSKEY API configuration is missing",
        }));
    };

    let reply = match drive.api().meta().await {
        Ok(reply) => reply,
        Err(err) => {
            return HttpResponse::Ok().json(json!({
                "success": false,
                "message": "Failed to connect to MISSKEY API",
                "error": err.to_string(),
            }));
        }
    };

    let Ok(meta) = serde_json::from_str::<Value>(reply.as_text()) else {
        return HttpResponse::Ok().json(json!({
            "success": false,
            "message": "Server returned non-JSON response",
            "rawResponse": excerpt(reply.as_text(), RAW_EXCERPT_LEN),
        }));
    };

    if !reply.is_success() {
        return HttpResponse::Ok().json(json!({
            "success": false,
            "message": "API request failed",
            "status": reply.status(),
            "response": meta,
        }));
    }

    let field = |key: &str| {
        meta.get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .unwrap_or("unknown")
            .to_owned()
    };
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Connection successful",
        "apiVersion": field("version"),
        "serverInfo": {
            "name": field("name"),
            "url": drive.as_credentials().as_api_url(),
        },
    }))
}

pub fn status_config(cfg: &mut web::ServiceConfig) {
    cfg.service(check_env).service(test_connection);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};

    use super::super::drive::fake::{FakeDrive, app_state};
    use super::*;

    #[actix_web::test]
    async fn connection_reports_instance_info() {
        let data = app_state(Some(Arc::new(FakeDrive::new())));
        let app = test::init_service(App::new().app_data(data).configure(status_config)).await;

        let req = test::TestRequest::get().uri("/test-connection").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["apiVersion"], "2024.1.0");
        assert_eq!(
            body["serverInfo"],
            json!({ "name": "Test Instance", "url": "https://misskey.test" })
        );

        let req = test::TestRequest::get().uri("/check-env").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "MISSKEY API configuration is valid");
    }

    #[actix_web::test]
    async fn connection_without_configuration() {
        let app = test::init_service(App::new().app_data(app_state(None)).configure(status_config))
            .await;
        let req = test::TestRequest::get().uri("/test-connection").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "MISSKEY API configuration is missing");
    }
}
