use axum::http::{Method, StatusCode};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod common;
use common::mock_app::MockApp;

fn current_payload() -> serde_json::Value {
    json!({
        "weather": [{ "id": 501, "main": "Rain", "description": "moderate rain", "icon": "10d" }],
        "main": { "temp": 14.6, "humidity": 81 },
        "wind": { "speed": 4.4 },
        "name": "London"
    })
}

fn forecast_payload() -> serde_json::Value {
    json!({
        "list": [
            {
                "dt_txt": "2024-05-01 09:00:00",
                "main": { "temp": 12.0, "humidity": 70 },
                "weather": [{ "id": 500, "main": "Rain", "icon": "10d" }],
                "pop": 0.8
            },
            {
                "dt_txt": "2024-05-01 12:00:00",
                "main": { "temp": 15.0, "humidity": 65 },
                "weather": [{ "id": 800, "main": "Clear", "icon": "01d" }],
                "pop": 0.1
            },
            {
                "dt_txt": "2024-05-01 15:00:00",
                "main": { "temp": 16.0, "humidity": 60 },
                "weather": [{ "id": 500, "main": "Rain", "icon": "10d" }]
            },
            {
                "dt_txt": "2024-05-02 09:00:00",
                "main": { "temp": 18.4, "humidity": 55 },
                "weather": [{ "id": 801, "main": "Clouds", "icon": "02d" }],
                "pop": 0.0
            }
        ]
    })
}

#[tokio::test]
async fn test_get_weather() {
    let app = MockApp::new().await;
    let auth = app.register("Ada Lovelace", "ada@example.com").await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_payload()))
        .expect(1)
        .mount(&app.weather)
        .await;

    // hourly and daily each load the forecast once
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_payload()))
        .expect(2)
        .mount(&app.weather)
        .await;

    let uri = "/api/weather?latitude=51.5&longitude=-0.12";

    let (status, body) = app.send(Method::GET, uri, auth.bearer_token(), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    assert_eq!(
        body["current"],
        json!({
            "temperature": 15,
            "condition": "Rain",
            "icon": "10d",
            "humidity": 81,
            "windSpeed": 4,
            "isRaining": true,
            "chanceOfRain": 0
        })
    );

    assert_eq!(body["hourly"].as_array().unwrap().len(), 4);
    assert_eq!(body["hourly"][0]["chanceOfRain"], 80);

    assert_eq!(
        body["daily"],
        json!([
            {
                "time": "2024-05-01 09:00:00",
                "temperature": 14,
                "condition": "Rain",
                "icon": "10d",
                "chanceOfRain": 80
            },
            {
                "time": "2024-05-02 09:00:00",
                "temperature": 18,
                "condition": "Clouds",
                "icon": "02d",
                "chanceOfRain": 0
            }
        ])
    );

    // served from cache
    let (status, cached) = app.send(Method::GET, uri, auth.bearer_token(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached, body);
}

#[tokio::test]
async fn test_weather_requires_coordinates() {
    let app = MockApp::new().await;
    let auth = app.register("Ada Lovelace", "ada@example.com").await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/weather?longitude=east",
            auth.bearer_token(),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The latitude field is required.");
    assert_eq!(
        body["errors"]["longitude"][0],
        "The longitude field must be a number."
    );
}

#[tokio::test]
async fn test_weather_requires_token() {
    let app = MockApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/api/weather?latitude=1&longitude=2", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_weather_provider_failure() {
    let app = MockApp::new().await;
    let auth = app.register("Ada Lovelace", "ada@example.com").await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "cod": 401 })))
        .mount(&app.weather)
        .await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/weather?latitude=51.5&longitude=-0.12",
            auth.bearer_token(),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Failed to fetch weather data" }));
}
