mod api_types;
mod config;
mod http_utils;
mod storage;
mod types;

use api_types::{AppState, EntriesResponse, FireRequest, MessageResponse};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use config::Config;
use http_utils::{ApiError, ApiResult};
use serde_json::Value;
use storage::{SqliteStorage, Storage};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use types::fire::{calculate_fire, FireProjection};
use types::savings_entry::{validate_batch, ValidationError};

fn make_router(state: AppState, cors_allow: &[String]) -> Router<()> {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/ping", get(ping))
                .route("/savings", get(list_savings).post(create_savings))
                .route("/savings/:id", delete(delete_saving))
                .route("/fire", post(fire)),
        )
        .with_state(state)
        .layer(cors_layer(cors_allow))
        .layer(
            trace::TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn cors_layer(cors_allow: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);
    if cors_allow.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins = cors_allow
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}

#[axum_macros::debug_handler]
async fn list_savings(State(state): State<AppState>) -> ApiResult<Json<EntriesResponse>> {
    let entries = state.storage.list_entries().await?;
    Ok(Json(EntriesResponse {
        message: None,
        entries: state.entry_views(entries),
    }))
}

async fn create_savings(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<EntriesResponse>> {
    let Some(Json(body)) = body else {
        return Err(ValidationError::MissingBatch.into());
    };
    // the whole batch is checked before anything is written
    let batch = validate_batch(&body)?;
    tracing::info!("recording {} savings entries", batch.len());
    let entries = state.storage.create_entries(batch).await?;
    Ok(Json(EntriesResponse {
        message: Some("Savings recorded successfully.".to_owned()),
        entries: state.entry_views(entries),
    }))
}

async fn delete_saving(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) =
        id.map_err(|e| ApiError::BadRequest(format!("Invalid entry id: {}", e.body_text())))?;
    state.storage.delete_entry(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "Entry {} deleted successfully.",
        id
    ))))
}

async fn fire(body: Option<Json<Value>>) -> ApiResult<Json<FireProjection>> {
    let body = match body {
        Some(Json(body)) if !is_empty_body(&body) => body,
        _ => return Err(ApiError::BadRequest("No data provided".to_owned())),
    };
    let req = FireRequest::from_json(&body).ok_or_else(|| {
        ApiError::BadRequest("Invalid input. Provide numeric values.".to_owned())
    })?;
    let projection = calculate_fire(req.monthly_income, req.monthly_expenses, req.return_rate)?;
    tracing::debug!(
        "fire projection: {} years, reached {}",
        projection.projections.len(),
        projection.reached
    );
    Ok(Json(projection))
}

fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact();
    tracing_subscriber::fmt()
        .event_format(format)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let storage = SqliteStorage::connect(&config.database_url, config.max_connections).await?;
    let state = AppState::new(storage, config.currency);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        "listening on {} (currency {})",
        listener.local_addr()?,
        config.currency
    );
    let router = make_router(state, &config.cors_allow);
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod api_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use crate::types::currency::Currency;
    use tower::ServiceExt;

    async fn app() -> Router {
        let storage = SqliteStorage::in_memory().await.unwrap();
        make_router(
            AppState::new(storage, Currency::default()),
            &["*".to_owned()],
        )
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn names(body: &Value) -> Vec<String> {
        body["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn ping_pongs() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "pong"}));
    }

    #[tokio::test]
    async fn create_list_delete_round_trip() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/savings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"entries": []}));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/savings",
            Some(json!({"savings": [
                {"name": " PPF ", "amount": 150000},
                {"name": "Gold", "amount": "1234.5"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Savings recorded successfully.");
        assert_eq!(names(&body), vec!["Gold", "PPF"]);
        let gold = &body["entries"][0];
        assert_eq!(gold["amount"], 1234.5);
        assert_eq!(gold["formatted"], "₹1,234.50");
        assert!(gold["created_at"].is_string());
        let gold_id = gold["id"].as_i64().unwrap();

        let (status, body) = send(&app, Method::GET, "/api/savings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body), vec!["Gold", "PPF"]);
        assert_eq!(body["entries"][1]["formatted"], "₹150,000.00");

        let uri = format!("/api/savings/{}", gold_id);
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            format!("Entry {} deleted successfully.", gold_id)
        );

        let (_, body) = send(&app, Method::GET, "/api/savings", None).await;
        assert_eq!(names(&body), vec!["PPF"]);
    }

    #[tokio::test]
    async fn invalid_item_rejects_whole_batch() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/savings",
            Some(json!({"savings": [
                {"name": "fine", "amount": 10},
                {"name": "  ", "amount": 10}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid entry: Missing name.");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/savings",
            Some(json!({"savings": [{"name": "debt", "amount": -5}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid entry: Amount cannot be negative.");

        let (_, body) = send(&app, Method::GET, "/api/savings", None).await;
        assert_eq!(body, json!({"entries": []}));
    }

    #[tokio::test]
    async fn savings_body_shape() {
        let app = app().await;
        for body in [Some(json!({"savings": "nope"})), Some(json!({})), None] {
            let (status, body) = send(&app, Method::POST, "/api/savings", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Missing or invalid 'savings' in request");
        }
    }

    #[tokio::test]
    async fn delete_unknown_entry() {
        let app = app().await;
        send(
            &app,
            Method::POST,
            "/api/savings",
            Some(json!({"savings": [{"name": "keep", "amount": 1}]})),
        )
        .await;

        let (status, body) = send(&app, Method::DELETE, "/api/savings/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Entry not found"}));

        let (status, body) = send(&app, Method::DELETE, "/api/savings/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid entry id:"));

        let (_, body) = send(&app, Method::GET, "/api/savings", None).await;
        assert_eq!(names(&body), vec!["keep"]);
    }

    #[tokio::test]
    async fn fire_projection() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/fire",
            Some(json!({"monthly_income": 5000, "monthly_expenses": 3000})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fire_number"], 900000.0);
        assert_eq!(body["years_to_fire"], 22);
        assert_eq!(body["reached"], true);
        assert_eq!(body["projections"].as_array().unwrap().len(), 22);
        assert_eq!(body["projections"][0], json!({"year": 1, "savings": 24000.0}));
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn fire_without_surplus() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/fire",
            Some(json!({"monthly_income": 2000, "monthly_expenses": 2500, "return_rate": 0.08})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fire_number"], 750000.0);
        assert!(body["years_to_fire"].is_null());
        assert_eq!(body["projections"], json!([]));
        assert_eq!(body["reached"], false);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn fire_rejects_bad_input() {
        let app = app().await;
        for (body, message) in [
            (None, "No data provided"),
            (Some(json!({})), "No data provided"),
            (
                Some(json!({"monthly_income": "a lot", "monthly_expenses": 10})),
                "Invalid input. Provide numeric values.",
            ),
            (
                Some(json!({"monthly_expenses": 10})),
                "Invalid input. Provide numeric values.",
            ),
        ] {
            let (status, body) = send(&app, Method::POST, "/api/fire", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn fire_calculation_error() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/fire",
            Some(json!({"monthly_income": 1e308, "monthly_expenses": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Calculation error:"));
    }

    #[test]
    fn cors_with_explicit_origins() {
        // invalid header values are skipped rather than failing startup
        let _ = cors_layer(&["http://localhost:3000".to_owned(), "bad\norigin".to_owned()]);
    }
}
