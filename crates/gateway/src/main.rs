//! Brandlens API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Dataset lookup by crawling id
//! - Influencer rankings and sentiment reports
//! - Rate limiting
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use brandlens_common::{
    cache::{DatasetStore, RedisStore},
    config::AppConfig,
    metrics::{self, CLASSIFIER_BUCKETS, LATENCY_BUCKETS},
    sentiment, telemetry,
};
use brandlens_influence::{InfluenceEngine, RankingConfig};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::Notify};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Maximum concurrent requests (backpressure control)
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DatasetStore>,
    pub engine: Arc<InfluenceEngine>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    telemetry::init_tracing(&config.observability);

    info!("Starting Brandlens API Gateway v{}", brandlens_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // One classifier for the whole process
    let classifier = sentiment::init_shared(&config.classifier)?;
    let engine = InfluenceEngine::new(
        classifier,
        &config.classifier,
        RankingConfig::from(&config.ranking),
    );

    // Connect to the dataset store
    info!("Connecting to Redis...");
    let store = RedisStore::connect(&config.redis.url, config.redis.key_prefix.clone()).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        store: Arc::new(store),
        engine: Arc::new(engine),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = Arc::new(Notify::new());
    let notified = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { notified.notified().await })
            .await
    });

    shutdown_signal().await;
    shutdown.notify_one();

    // In-flight requests get the shutdown timeout to finish
    match tokio::time::timeout(config.shutdown_timeout(), server).await {
        Ok(joined) => joined??,
        Err(_) => warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Shutdown timed out, dropping open connections"
        ),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder with its own scrape listener
fn install_metrics_exporter(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("ranking_duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("classifier_duration_seconds".to_string()),
            CLASSIFIER_BUCKETS,
        )?
        .install()?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Influencer endpoints
        .route("/influencers/reference", post(handlers::influencers::reference))
        .route("/influencers/bridging", post(handlers::influencers::bridging))
        .route("/influencers/active", post(handlers::influencers::active))
        .route("/influencers_analysis", post(handlers::influencers::analysis))

        // Post endpoints
        .route("/posts/negative", post(handlers::posts::negative))

        // Network-wide reports
        .route("/post_involvement_analysis", post(handlers::reports::post_involvement))
        .route("/sentiment/length", post(handlers::reports::sentiment_by_length))
        .route("/regions", post(handlers::reports::regions))
        .route("/brand_rating", post(handlers::brand::rating))

        // Plot data
        .route("/graph/{kind}", post(handlers::graph::export));

    let limits = &state.config.rate_limit;
    if limits.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(limits.requests_per_second, limits.burst);
        api_routes = api_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .route_layer(from_fn(middleware::metrics::track_requests))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use brandlens_common::cache::MemoryStore;
    use brandlens_common::config::ClassifierConfig;
    use brandlens_common::sentiment::KeywordClassifier;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const CRAWL: &str = r#"{
        "vk": [{
            "membersCount": 100,
            "from": "01/01/2024",
            "to": "03/01/2024",
            "posts": [
                {"id": 1, "from": {"id": 1, "first_name": "Alice", "last_name": "A"},
                 "views": 50, "forwards": 2, "reactions": [{"emoji": "❤", "count": 5}],
                 "replies": [{"sender_id": 2, "sender_name": "Bob", "last_name": "B", "text": "great post", "city": "Kazan"}]},
                {"id": 2, "from": {"id": 2, "first_name": "Bob", "last_name": "B"},
                 "replies": [{"sender_id": 3, "sender_name": "Carol", "last_name": "C", "text": "terrible idea"}]},
                {"id": 3, "from": {"id": 3, "first_name": "Carol", "last_name": "C"},
                 "replies": [{"sender_id": 1, "sender_name": "Alice", "last_name": "A", "text": "ok"}]}
            ]
        }],
        "tg": null
    }"#;

    fn app(rate_limit: bool) -> Router {
        let store = MemoryStore::new();
        store.insert("crawl-1", CRAWL);

        let mut config = AppConfig::default();
        config.rate_limit.enabled = rate_limit;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;

        let engine = InfluenceEngine::new(
            Arc::new(KeywordClassifier::new()),
            &ClassifierConfig::default(),
            RankingConfig::default(),
        );

        create_router(AppState {
            config: Arc::new(config),
            store: Arc::new(store),
            engine: Arc::new(engine),
        })
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(false)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_ready_with_memory_store() {
        let response = app(false)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["dataset_store"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_reference_ranking() {
        let (status, body) = post_json(
            app(false),
            "/v1/influencers/reference",
            json!({"crawlingId": "crawl-1", "topK": 2}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["score"], 0.33333);
    }

    #[tokio::test]
    async fn test_negative_posts() {
        let (status, body) =
            post_json(app(false), "/v1/posts/negative", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Bob B");
        assert_eq!(body[0]["negative"], 100.0);
    }

    #[tokio::test]
    async fn test_combined_analysis_and_reports() {
        let (status, body) =
            post_json(app(false), "/v1/influencers_analysis", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["most_messages"].as_array().unwrap().len(), 3);

        let (status, body) = post_json(
            app(false),
            "/v1/post_involvement_analysis",
            json!({"crawlingId": "crawl-1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["top_emoji"][0]["emoji"], "❤");
        assert_eq!(body["discussion_rate"].as_array().unwrap().len(), 3);
        // one positive, one negative, one neutral reply
        assert_eq!(body["net_promoter_score"], 0.0);
        assert!(body["top_reply_emoji"].as_array().unwrap().is_empty());

        let (_, body) = post_json(app(false), "/v1/regions", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(body[0]["city"], "Unknown");

        let (_, body) =
            post_json(app(false), "/v1/sentiment/length", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_brand_rating() {
        let (status, body) =
            post_json(app(false), "/v1/brand_rating", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weakness"], "brand_responsiveness");
        assert_eq!(body["metrics"]["brand_responsiveness"], 0.0);
        let rating = body["rating"].as_f64().unwrap();
        assert!((rating - (70.833333 + 33.333333) / 3.0).abs() < 1e-3, "{rating}");

        let (status, body) = post_json(
            app(false),
            "/v1/brand_rating",
            json!({"crawlingId": "crawl-1", "weights": [1, 0, 1]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weakness"], "trending_content_sentiment_ratio");

        let (status, body) = post_json(
            app(false),
            "/v1/brand_rating",
            json!({"crawlingId": "crawl-1", "weights": [1, 1]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "weights");
    }

    #[tokio::test]
    async fn test_graph_export() {
        let (status, body) =
            post_json(app(false), "/v1/graph/betweenness", json!({"crawlingId": "crawl-1", "topK": 1})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "betweenness");
        assert_eq!(body["edges"].as_array().unwrap().len(), 3);

        let (status, _) =
            post_json(app(false), "/v1/graph/closeness", json!({"crawlingId": "crawl-1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_responses() {
        let (status, body) =
            post_json(app(false), "/v1/posts/negative", json!({"crawlingId": "missing"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DATASET_NOT_FOUND");

        let (status, _) = post_json(
            app(false),
            "/v1/influencers/bridging",
            json!({"crawlingId": "crawl-1", "network": "tg"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = post_json(
            app(false),
            "/v1/influencers/reference",
            json!({"crawlingId": "crawl-1", "topK": 500}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "top_k");
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let app = app(true);
        let body = json!({"crawlingId": "crawl-1"});
        let (first, _) = post_json(app.clone(), "/v1/posts/negative", body.clone()).await;
        let (second, _) = post_json(app, "/v1/posts/negative", body).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    }
}
