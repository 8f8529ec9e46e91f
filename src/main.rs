use whisperline::{app, auth::TokenKeys, chat::Registry, db, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("whisperline=info")),
        )
        .init();

    let db_pool = db::connect(dotenv::var("DATABASE_URL").unwrap().as_str())
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    let keys = TokenKeys::from_secret(dotenv::var("JWT_SECRET").unwrap().as_str());

    let state = AppState {
        db_pool,
        registry: Registry::new(),
        keys,
    };

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("listening on {addr}");
    axum::serve(listener, app(state)).await.unwrap();
}
