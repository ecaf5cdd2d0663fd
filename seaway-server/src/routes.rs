use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use seaway_core::{Aggregator, Outcome};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

type AppState = Arc<Aggregator>;

#[derive(Debug, Deserialize)]
struct LocationQuery {
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    city: Option<String>,
}

/// Build the router. Every route allows cross-origin GETs from any origin.
pub fn router(aggregator: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home).fallback(method_not_allowed))
        .route("/weather-map", get(weather_map).fallback(method_not_allowed))
        .route("/weather", get(weather).fallback(method_not_allowed))
        .route("/map", get(map).fallback(method_not_allowed))
        .fallback(not_found)
        .layer(cors)
        .with_state(aggregator)
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({ "message": "Seaway API is live" }))
}

async fn weather_map(
    State(aggregator): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Response, Response> {
    let Query(query) = query.map_err(bad_query)?;
    Ok(respond(aggregator.weather_map(query.location.as_deref()).await))
}

async fn weather(
    State(aggregator): State<AppState>,
    query: Result<Query<CityQuery>, QueryRejection>,
) -> Result<Response, Response> {
    let Query(query) = query.map_err(bad_query)?;
    Ok(respond(aggregator.weather(query.city.as_deref()).await))
}

async fn map(
    State(aggregator): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<Response, Response> {
    let Query(query) = query.map_err(bad_query)?;
    Ok(respond(aggregator.coordinates(query.location.as_deref()).await))
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn method_not_allowed() -> Response {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("GET,HEAD"));
    response
}

fn bad_query(rejection: QueryRejection) -> Response {
    tracing::debug!(%rejection, "rejected query string");
    error_response(rejection.status(), &rejection.body_text())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn respond(outcome: Outcome) -> Response {
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if let Outcome::Failed { error } = &outcome {
        tracing::warn!(%status, "{error}");
    }

    (status, Json(outcome)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use seaway_core::{AggregationPolicy, Config};
    use serde_json::Value;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEATHER_PATH: &str = "/data/2.5/weather";
    const SEARCH_PATH: &str = "/search";

    fn config(server: &MockServer, policy: AggregationPolicy) -> Config {
        let mut config = Config::default();
        config.aggregation = policy;
        config.openweather.api_key = Some("test_key".into());
        config.openweather.base_url = server.uri();
        config.nominatim.base_url = server.uri();
        config
    }

    fn app(server: &MockServer, policy: AggregationPolicy) -> Router {
        let aggregator = Aggregator::from_config(&config(server, policy)).unwrap();
        router(Arc::new(aggregator))
    }

    async fn mount_weather_ok(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .and(query_param("q", "Lagos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Lagos",
                "main": { "temp": 29.4, "humidity": 79 },
                "weather": [{ "description": "broken clouds" }]
            })))
            .mount(server)
            .await;
    }

    async fn mount_weather_down(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(server)
            .await;
    }

    async fn mount_geocoder_ok(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("q", "Lagos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "display_name": "Lagos, Nigeria", "lat": "6.4550575", "lon": "3.3941795" }
            ])))
            .mount(server)
            .await;
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn home_reports_liveness() {
        let server = MockServer::start().await;

        let (status, body) = call(app(&server, AggregationPolicy::FailFast), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Seaway API is live" }));
    }

    #[tokio::test]
    async fn empty_location_is_bad_request() {
        let server = MockServer::start().await;

        for uri in ["/weather-map?location=", "/weather-map"] {
            let (status, body) = call(app(&server, AggregationPolicy::FailFast), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "Missing location parameter" }));
        }
    }

    #[tokio::test]
    async fn weather_map_combines_both_providers() {
        let server = MockServer::start().await;
        mount_weather_ok(&server).await;
        mount_geocoder_ok(&server).await;

        let (status, body) =
            call(app(&server, AggregationPolicy::FailFast), "/weather-map?location=Lagos").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "coordinates": {
                    "display_name": "Lagos, Nigeria",
                    "latitude": "6.4550575",
                    "longitude": "3.3941795"
                },
                "weather": {
                    "city": "Lagos",
                    "temperature": 29.4,
                    "humidity": 79,
                    "description": "broken clouds"
                }
            })
        );
    }

    #[tokio::test]
    async fn fail_fast_turns_weather_outage_into_500() {
        let server = MockServer::start().await;
        mount_weather_down(&server).await;
        mount_geocoder_ok(&server).await;

        let (status, body) =
            call(app(&server, AggregationPolicy::FailFast), "/weather-map?location=Lagos").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Weather fetch failed"));
        assert!(error.contains("500"));
        assert!(body.get("coordinates").is_none());
    }

    #[tokio::test]
    async fn best_effort_embeds_weather_outage() {
        let server = MockServer::start().await;
        mount_weather_down(&server).await;
        mount_geocoder_ok(&server).await;

        let (status, body) =
            call(app(&server, AggregationPolicy::BestEffort), "/weather-map?location=Lagos").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["weather"]["error"].as_str().is_some());
        assert_eq!(body["coordinates"]["display_name"], "Lagos, Nigeria");
    }

    #[tokio::test]
    async fn unknown_location_fails_coordinates_stage() {
        let server = MockServer::start().await;
        mount_weather_ok(&server).await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (status, body) =
            call(app(&server, AggregationPolicy::FailFast), "/weather-map?location=Atlantis").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Coordinates fetch failed: Location not found: Atlantis" })
        );
    }

    #[tokio::test]
    async fn repeated_requests_are_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Lagos",
                "main": { "temp": 29.4, "humidity": 79 },
                "weather": [{ "description": "broken clouds" }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "display_name": "Lagos, Nigeria", "lat": "6.45", "lon": "3.39" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let app = app(&server, AggregationPolicy::FailFast);
        for _ in 0..3 {
            let (status, _) = call(app.clone(), "/weather-map?location=Lagos").await;
            assert_eq!(status, StatusCode::OK);
        }
        // `expect(1)` is verified when the mock server drops.
    }

    #[tokio::test]
    async fn weather_and_map_default_to_lagos() {
        let server = MockServer::start().await;
        mount_weather_ok(&server).await;
        mount_geocoder_ok(&server).await;
        let app = app(&server, AggregationPolicy::FailFast);

        let (status, weather) = call(app.clone(), "/weather").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(weather["city"], "Lagos");

        let (status, coords) = call(app, "/map").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(coords["latitude"], "6.4550575");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let server = MockServer::start().await;

        let (status, body) = call(app(&server, AggregationPolicy::FailFast), "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn malformed_query_is_json_400() {
        let server = MockServer::start().await;

        let (status, body) = call(
            app(&server, AggregationPolicy::FailFast),
            "/weather-map?location=a&location=b",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("duplicate field"));
    }

    #[tokio::test]
    async fn wrong_method_is_json_405() {
        let server = MockServer::start().await;

        let response = app(&server, AggregationPolicy::FailFast)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/weather-map?location=Lagos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Method not allowed" }));
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let server = MockServer::start().await;

        let response = app(&server, AggregationPolicy::FailFast)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
