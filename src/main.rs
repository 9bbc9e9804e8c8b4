use actix_web::{App, HttpResponse, HttpServer, Responder, middleware, web};
use log::{info, warn};

use state::{AppData, AppState};

mod api;
mod error;
mod misskey;
mod multipart;
mod nsfw;
mod settings;
mod state;

const APP_NAME: &str = "driveManager";

#[actix_web::get("/")]
async fn hello(data: AppData) -> impl Responder {
    HttpResponse::Ok().body(format!("Hello world in {}!", data.as_app_name()))
}

fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(hello).service(
        web::scope("/api")
            .configure(misskey::misskey_config)
            .service(nsfw::check_nsfw),
    );
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let found_env_file = settings::read_env_file();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if !found_env_file {
        warn!("No .env file found, reading the process environment only.");
    }

    let env = settings::load_env();
    let data = AppState::new(APP_NAME, &env);

    info!("Listening on {}:{}", env.addr.0, env.addr.1);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(data.clone())
            .configure(config)
    })
    .bind(env.addr)?
    .run()
    .await
}
