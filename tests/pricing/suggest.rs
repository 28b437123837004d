//! Drives `HttpPriceSuggester` against the mock backend and against a stub
//! text-generation endpoint.

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use optimistic_store::dashboard::Listing;
use optimistic_store::mock::MockServer;
use optimistic_store::pricing::{
    HttpPriceSuggester, MarketSignals, PriceSuggester, PricingError, PricingRequest,
    PropertyAttributes,
};
use optimistic_store::{ClientConfig, InMemoryRemote, RemoteError, StaticToken};
use serde_json::{json, Value};

/// Bind to port 0 and return the actual address.
async fn start(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn request() -> PricingRequest {
    let listing: Listing = serde_json::from_value(json!({
        "id": 1,
        "title": "Harbour loft",
        "nightlyRate": 150.0,
        "bedrooms": 2
    }))
    .unwrap();
    PricingRequest {
        property: PropertyAttributes::from(&listing),
        market: MarketSignals {
            average_nightly_rate: Some(200.0),
            occupancy_rate: Some(0.5),
            season: Some("summer".into()),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn mock_backend_suggests_a_price() {
    let base = start(MockServer::new(InMemoryRemote::new()).with_token("t").router()).await;
    let suggester = HttpPriceSuggester::from_config(&ClientConfig::new(base).with_token("t")).unwrap();

    let suggestion = suggester.suggest(&request()).await.unwrap();

    assert_eq!(suggestion.suggested_price, 200.0);
    assert!(suggestion.reasoning.contains("local average"));
}

#[tokio::test]
async fn rotated_session_token_reaches_the_pricing_endpoint() {
    let base = start(MockServer::new(InMemoryRemote::new()).with_token("fresh").router()).await;
    let session = StaticToken::new("stale");
    let suggester = HttpPriceSuggester::from_config(&ClientConfig::new(base))
        .unwrap()
        .with_token_source(Arc::new(session.clone()));

    let err = suggester.suggest(&request()).await.unwrap_err();
    assert!(matches!(err, PricingError::Remote(RemoteError::Rejected { status: 401, .. })));

    session.set("fresh");
    assert!(suggester.suggest(&request()).await.is_ok());
}

#[tokio::test]
async fn generated_text_is_parsed_for_the_suggestion() {
    let app = Router::new().route(
        "/generate",
        post(|Json(body): Json<Value>| async move {
            // The structured request and a prompt both arrive.
            assert_eq!(body["property"]["title"], "Harbour loft");
            assert!(body["prompt"].as_str().unwrap().contains("Season: summer"));
            Json(json!({
                "text": "Based on the data: {\"suggestedPrice\": 189.0, \"reasoning\": \"Peak season.\"}"
            }))
        }),
    );
    let base = start(app).await;
    let suggester = HttpPriceSuggester::new(&format!("{base}/generate")).unwrap();

    let suggestion = suggester.suggest(&request()).await.unwrap();

    assert_eq!(suggestion.suggested_price, 189.0);
    assert_eq!(suggestion.reasoning, "Peak season.");
}

#[tokio::test]
async fn backend_failures_surface_as_remote_errors() {
    let app = Router::new().route(
        "/generate",
        post(|| async {
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "model overloaded" })),
            )
        }),
    );
    let base = start(app).await;
    let suggester = HttpPriceSuggester::new(&format!("{base}/generate")).unwrap();

    let err = suggester.suggest(&request()).await.unwrap_err();

    assert_eq!(
        err,
        PricingError::Remote(RemoteError::Rejected {
            status: 503,
            message: "model overloaded".into()
        })
    );
}

#[tokio::test]
async fn unusable_answers_are_invalid_suggestions() {
    let app = Router::new().route(
        "/generate",
        post(|| async { Json(json!({ "text": "I cannot help with pricing." })) }),
    );
    let base = start(app).await;
    let suggester = HttpPriceSuggester::new(&format!("{base}/generate")).unwrap();

    let err = suggester.suggest(&request()).await.unwrap_err();
    assert!(matches!(err, PricingError::InvalidSuggestion(_)));
}
