mod db;
mod entities;
mod error;
mod records;
mod routes;
mod state;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::CorsLayer;

use state::AppState;
use storage::FsStore;

/// Request bodies above this are refused outright. Kept well above the 5MB
/// validation cap so oversized uploads get a field error, not a bare 413.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Database path
    #[arg(short, long, env = "DATABASE_PATH", default_value = "gallery.db")]
    db_path: String,

    /// Directory holding the stored image objects
    #[arg(long, env = "OBJECT_STORE_DIR", default_value = "./objects")]
    object_store_dir: String,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Gallery pages (data only; rendering happens client-side)
        .route("/", get(routes::images::list_images))
        .route("/upload", post(routes::upload::submit_upload))
        .route(
            "/images/{id}",
            get(routes::images::get_image).post(routes::upload::delete_intent),
        )
        // REST API
        .route(
            "/api/images",
            get(routes::images::list_images).post(routes::images::create_image),
        )
        .route(
            "/api/images/{id}",
            get(routes::images::get_image).delete(routes::images::delete_image),
        )
        .route("/api/images/file/{filename}", get(routes::files::serve_file))
        // Middleware
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        // State
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Ensure the object directory exists
    tokio::fs::create_dir_all(&args.object_store_dir).await.ok();

    tracing::info!("Initializing database at {}", args.db_path);
    let db = db::init_pool(&args.db_path).await;

    let store = Arc::new(FsStore::new(args.object_store_dir.as_str()));
    let state = AppState::new(db, store);

    let app = app(state);
    let addr = format!("0.0.0.0:{}", args.port);
    tracing::info!("Gallery server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
