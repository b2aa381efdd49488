#[tokio::main]
async fn main() {
    stockledger_observability::init();

    let app = stockledger_api::app::build_app().await;

    let addr =
        std::env::var("STOCKLEDGER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
