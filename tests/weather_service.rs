//! HTTP-level tests for the weather service
//!
//! Exercises the fetch/cache/fallback engine end to end against a mock
//! server: cache freshness, stale fallback, retry behavior, error
//! classification, the not-found fallback chain and cache-key divergence.

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripcast::cache::WeatherCache;
use tripcast::config::WeatherConfig;
use tripcast::data::{Location, WeatherError, WeatherReport};
use tripcast::retry::RetryPolicy;
use tripcast::service::WeatherService;

const API_KEY: &str = "0123456789abcdef0123456789abcdef";

fn test_config(server_uri: &str, ttl_minutes: i64) -> WeatherConfig {
    WeatherConfig {
        api_key: API_KEY.to_string(),
        api_base: server_uri.to_string(),
        geo_base: server_uri.to_string(),
        units: "metric".to_string(),
        cache_ttl_minutes: ttl_minutes,
    }
}

/// Service against the mock server with fast retries (base delay 10ms).
fn test_service(server: &MockServer, cache_dir: &TempDir, ttl_minutes: i64) -> WeatherService {
    let cache = WeatherCache::open(cache_dir.path());
    WeatherService::with_retry_policy(
        test_config(&server.uri(), ttl_minutes),
        cache,
        RetryPolicy::new(3, 10),
    )
    .expect("Failed to build service")
}

fn current_body() -> serde_json::Value {
    serde_json::json!({
        "weather": [{"description": "clear sky", "icon": "01d"}],
        "main": {"temp": 19.5, "feels_like": 19.0, "humidity": 55},
        "wind": {"speed": 3.2},
        "dt": 1754820000,
        "name": "Paris"
    })
}

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "list": [
            {
                "dt": 1754820000,
                "main": {"temp": 16.0},
                "pop": 0.1,
                "weather": [{"icon": "01d", "description": "clear sky"}],
                "wind": {"speed": 2.0}
            },
            {
                "dt": 1754830800,
                "main": {"temp": 21.0},
                "pop": 0.4,
                "weather": [{"icon": "01d", "description": "clear sky"}],
                "wind": {"speed": 4.0}
            }
        ]
    })
}

fn not_found_body() -> serde_json::Value {
    serde_json::json!({"cod": "404", "message": "city not found"})
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Paris".to_string());

    let first = service.current_weather(&location, true).await.expect("First fetch");
    let second = service.current_weather(&location, true).await.expect("Second fetch");

    assert!((first.temperature - 19.5).abs() < 0.01);
    assert!((second.temperature - 19.5).abs() < 0.01);
    // expect(1) verifies the second call never reached the server.
}

#[tokio::test]
async fn test_expired_cache_refetches() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(2)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 0);
    let location = Location::Named("Paris".to_string());

    service.current_weather(&location, true).await.expect("First fetch");
    service.current_weather(&location, true).await.expect("Second fetch");
}

#[tokio::test]
async fn test_stale_cache_served_on_failure() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    // One success, then the upstream starts failing.
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 0);
    let location = Location::Named("Paris".to_string());

    let first = service.current_weather(&location, true).await.expect("First fetch");
    let second = service
        .current_weather(&location, true)
        .await
        .expect("Stale entry should be served as degraded success");

    assert!((second.temperature - first.temperature).abs() < 0.01);
    assert_eq!(second.place, "Paris");
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failures() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("flaky"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Paris".to_string());

    let conditions = service
        .current_weather(&location, true)
        .await
        .expect("Third attempt should succeed");
    assert_eq!(conditions.place, "Paris");
}

#[tokio::test]
async fn test_retry_exhaustion_keeps_classification() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(serde_json::json!({"message": "try later"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Paris".to_string());

    let err = service
        .current_weather(&location, true)
        .await
        .expect_err("No cache entry, should surface the classified error");

    match err {
        WeatherError::Upstream { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("try later"));
        }
        other => panic!("Expected Upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_and_rate_limit_classification() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Lyon"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Nice"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);

    let err = service
        .current_weather(&Location::Named("Lyon".to_string()), false)
        .await
        .expect_err("401 should classify");
    assert!(matches!(err, WeatherError::Unauthorized));

    let err = service
        .current_weather(&Location::Named("Nice".to_string()), false)
        .await
        .expect_err("429 should classify");
    assert!(matches!(err, WeatherError::RateLimited));
}

#[tokio::test]
async fn test_missing_location_fails_fast() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(0)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);

    let err = service
        .current_weather(&Location::Named("   ".to_string()), true)
        .await
        .expect_err("Blank location is a contract violation");
    assert!(matches!(err, WeatherError::MissingLocation));
}

#[tokio::test]
async fn test_forecast_aggregates_and_caches_raw_payload() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Paris".to_string());

    let days = service.forecast(&location, true).await.expect("Forecast fetch");

    assert_eq!(days.len(), 1, "Both samples fall on one UTC day");
    assert_eq!(days[0].high, 21);
    assert_eq!(days[0].low, 16);
    assert_eq!(days[0].precipitation, 40);
    assert_eq!(days[0].icon, "01d");
    // Mean 3 m/s -> 10.8 km/h -> 11.
    assert_eq!(days[0].wind_kmh, 11);

    // Second call inside the TTL is served from cache (expect(1) above).
    let cached = service.forecast(&location, true).await.expect("Cached forecast");
    assert_eq!(cached, days);
}

#[tokio::test]
async fn test_not_found_fallback_chain() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "Paris", "country": "FR", "state": "Ile-de-France", "lat": 48.85, "lon": 2.35},
            {"name": "Paris", "country": "US", "state": "Texas", "lat": 33.66, "lon": -95.55}
        ])))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Nonexistentville".to_string());

    match service.weather_data(&location).await {
        WeatherReport::NotFound { query, alternatives } => {
            assert_eq!(query, "Nonexistentville");
            assert_eq!(alternatives.len(), 2);
            assert_eq!(alternatives[0].country, "FR");
        }
        other => panic!("Expected NotFound report, got {:?}", other),
    }
}

#[tokio::test]
async fn test_both_failed_without_alternatives_reports_current_error() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Nonexistentville".to_string());

    match service.weather_data(&location).await {
        WeatherReport::Failed(err) => {
            assert!(err.is_not_found());
            assert!(err.to_string().contains("Nonexistentville"));
        }
        other => panic!("Expected Failed report, got {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_failure_passes_through() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("forecast down"))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let location = Location::Named("Paris".to_string());

    match service.weather_data(&location).await {
        WeatherReport::Data(bundle) => {
            assert!(bundle.current.is_ok());
            assert!(bundle.forecast.is_err());
        }
        other => panic!("Expected Data report, got {:?}", other),
    }
}

#[tokio::test]
async fn test_name_and_coordinates_cache_independently() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(2)
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    let by_name = Location::Named("Paris".to_string());
    let by_coords = Location::Coordinates { lat: 48.8534, lon: 2.3488 };

    service.current_weather(&by_name, true).await.expect("Fetch by name");
    service.current_weather(&by_coords, true).await.expect("Fetch by coordinates");

    // Each representation produced its own cache entry: repeating both
    // lookups stays within expect(2).
    service.current_weather(&by_name, true).await.expect("Cached by name");
    service.current_weather(&by_coords, true).await.expect("Cached by coordinates");
}

#[tokio::test]
async fn test_cache_survives_service_restart() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let location = Location::Named("Paris".to_string());

    {
        let service = test_service(&server, &cache_dir, 30);
        service.current_weather(&location, true).await.expect("First fetch");
    }

    // A new service over the same cache directory starts warm.
    let service = test_service(&server, &cache_dir, 30);
    let conditions = service
        .current_weather(&location, true)
        .await
        .expect("Should be served from the reloaded cache");
    assert_eq!(conditions.place, "Paris");
}

#[tokio::test]
async fn test_find_nearby_cities_soft_fails() {
    let server = MockServer::start().await;
    let cache_dir = TempDir::new().expect("Failed to create temp directory");

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = test_service(&server, &cache_dir, 30);
    assert!(service.find_nearby_cities("Paris").await.is_empty());
}
