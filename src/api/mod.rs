use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::database::{DatabaseError, MealStore};
use crate::food::analysis::{AnalysisReport, FoodAnalyzer, NutritionRecord};
use crate::food::meal::{DailyTotals, MealLogError, MealLogRequest, MealRecord, DATE_FORMAT};
use crate::food::recognition::{RankedResult, SourceResults};
use crate::providers::utils::{ImageError, ImageInput};

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<FoodAnalyzer>,
    meals: MealStore,
}

impl AppState {
    pub fn new(analyzer: Arc<FoodAnalyzer>, meals: MealStore) -> Self {
        Self { analyzer, meals }
    }
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MealLogError> for ApiError {
    fn from(e: MealLogError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        error!("Meal log failure: {}", e);
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ApiResponse {
                status: self.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    providers: usize,
}

#[derive(Deserialize)]
struct ConsolidateRequest {
    results: Vec<SourceResults>,
}

#[derive(Serialize)]
struct MealDayResponse {
    meals: Vec<MealRecord>,
    totals: DailyTotals,
}

/// Create and configure the API router
pub fn create_api(state: AppState, max_concurrent_requests: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/consolidate", post(consolidate))
        .route("/nutrition/:food", get(nutrition))
        .route("/meals", post(log_meal))
        // Second segment is a date for GET and a meal id for DELETE.
        .route(
            "/meals/:user_id/:entry",
            get(meals_for_date).delete(delete_meal),
        )
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        // One semaphore shared by every route, so the cap is server-wide.
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        providers: state.analyzer.pipeline().provider_count(),
    })
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<AnalysisReport> {
    let image = ImageInput::from_bytes(body.to_vec())?;
    info!("Analyzing uploaded {} ({} bytes)", image.mime_type(), image.len());
    Ok(Json(state.analyzer.analyze(&image).await))
}

async fn consolidate(
    State(state): State<AppState>,
    Json(request): Json<ConsolidateRequest>,
) -> Json<Vec<RankedResult>> {
    Json(
        state
            .analyzer
            .pipeline()
            .engine()
            .consolidate(&request.results),
    )
}

async fn nutrition(
    State(state): State<AppState>,
    Path(food): Path<String>,
) -> ApiResult<NutritionRecord> {
    state
        .analyzer
        .nutrition()
        .find(&food)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No nutrition data for {}", food)))
}

async fn log_meal(
    State(state): State<AppState>,
    Json(request): Json<MealLogRequest>,
) -> Result<(StatusCode, Json<MealRecord>), ApiError> {
    let meal = request.into_new_meal()?;
    let record = state.meals.log_meal(meal).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn meals_for_date(
    State(state): State<AppState>,
    Path((user_id, date)): Path<(String, String)>,
) -> ApiResult<MealDayResponse> {
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|_| ApiError::from(MealLogError::InvalidDate(date.clone())))?;
    let meals = state.meals.meals_for_date(&user_id, date).await?;
    let totals = DailyTotals::from_meals(&user_id, date, &meals);
    Ok(Json(MealDayResponse { meals, totals }))
}

async fn delete_meal(
    State(state): State<AppState>,
    Path((user_id, meal_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let meal_id = Uuid::parse_str(&meal_id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid meal id {}", meal_id)))?;
    if state.meals.delete_meal(&user_id, meal_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Meal {} not found", meal_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::analysis::nutrition::tests::StaticLookup;
    use crate::food::analysis::NutritionService;
    use crate::food::recognition::pipeline::tests::MockProvider;
    use crate::food::recognition::{ConsolidationEngine, RecognitionPipeline, Source};
    use crate::providers::utils::tests::PNG_HEADER;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Barrier;
    use tower::ServiceExt;

    async fn app() -> Router {
        app_with(
            vec![
                MockProvider::new(Source::Clarifai, &[("Banana", 0.9), ("Table", 0.8)]),
                MockProvider::new(Source::GoogleVision, &[("bananas", 0.7)]),
            ],
            4,
        )
        .await
    }

    async fn app_with(
        providers: Vec<Arc<dyn crate::providers::traits::RecognitionProvider>>,
        max_concurrent_requests: usize,
    ) -> Router {
        let analyzer = FoodAnalyzer::new(
            RecognitionPipeline::new(providers, ConsolidationEngine::default()),
            NutritionService::new(Arc::new(StaticLookup::with(&[("Banana", 27.0)])), 8),
        );
        let meals = MealStore::open_in_memory().await.unwrap();
        create_api(AppState::new(Arc::new(analyzer), meals), max_concurrent_requests)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["providers"], 2);
    }

    #[tokio::test]
    async fn test_analyze_image() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from(PNG_HEADER.to_vec()))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["candidates"][0]["name"], "Banana");
        assert_eq!(body["candidates"].as_array().unwrap().len(), 1);
        assert_eq!(body["nutrition"]["matched_name"], "Banana");
        assert_eq!(body["needs_retry"], false);
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_image() {
        let app = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .body(Body::from("hello"))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["status"].is_string());
    }

    #[tokio::test]
    async fn test_consolidate() {
        let app = app().await;
        let request = json_request(
            "POST",
            "/consolidate",
            json!({ "results": [
                { "source": "clarifai", "candidates": [{ "name": "Fish", "value": 0.9 }] },
                { "source": "gemini_vision", "candidates": [{ "name": "Fillet", "confidence": 0.8 }] }
            ]}),
        );

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Fish Fillet");
    }

    #[tokio::test]
    async fn test_nutrition_lookup() {
        let app = app().await;
        let (status, body) = send(&app, get_request("/nutrition/banana")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["carbs_g"], 27.0);

        let (status, _) = send(&app, get_request("/nutrition/durian")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_meal_log_round_trip() {
        let app = app().await;
        let (status, logged) = send(
            &app,
            json_request(
                "POST",
                "/meals",
                json!({
                    "userId": "alice",
                    "date": "2024-03-05",
                    "mealType": "breakfast",
                    "foods": [{ "name": "Banana", "calories": 105.0 }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(logged["mealType"], "Breakfast");
        let id = logged["id"].as_str().unwrap().to_string();

        let (status, day) = send(&app, get_request("/meals/alice/2024-03-05")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(day["meals"].as_array().unwrap().len(), 1);
        assert_eq!(day["totals"]["nutrients"]["calories"], 105.0);

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/meals/alice/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let delete_again = Request::builder()
            .method("DELETE")
            .uri(format!("/meals/alice/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete_again).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_meal_log_validation_errors() {
        let app = app().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/meals",
                json!({ "userId": "alice", "date": "2024-03-05", "mealType": "brunch", "foods": [{ "name": "Egg" }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["status"].as_str().unwrap().contains("brunch"));

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/meals",
                json!({ "userId": "alice", "date": "2024-03-05", "mealType": "Lunch", "foods": [] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, get_request("/meals/alice/yesterday")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_concurrency_limit_spans_routes() {
        let gate = Arc::new(Barrier::new(2));
        let app = app_with(
            vec![MockProvider::gated(Source::Clarifai, &[("Banana", 0.9)], gate.clone())],
            1,
        )
        .await;

        let analyze = tokio::spawn(app.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/analyze")
                .body(Body::from(PNG_HEADER.to_vec()))
                .unwrap(),
        ));
        // The analysis now holds the only permit.
        gate.wait().await;

        let blocked =
            tokio::time::timeout(Duration::from_millis(200), app.clone().oneshot(get_request("/health")))
                .await;
        assert!(blocked.is_err(), "/health ran while /analyze held the only permit");

        gate.wait().await;
        let response = analyze.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }
}
