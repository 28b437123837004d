use optimistic_store::mock::MockServer;
use optimistic_store::InMemoryRemote;
use serde_json::json;

pub const TOKEN: &str = "session-token";

pub fn backend() -> InMemoryRemote {
    let backend = InMemoryRemote::new();
    backend.seed(
        "listings",
        [
            json!({ "id": 1, "title": "Harbour loft", "active": true }),
            json!({ "id": 2, "title": "Garden studio", "active": false }),
        ],
    );
    backend
}

/// Bind to port 0 and return the actual address.
pub async fn start_server(server: MockServer) -> String {
    let app = server.router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
