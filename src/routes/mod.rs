//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket quiz session at `/ws`
/// - JSON API under `/api/...` (paths kept compatible with the existing frontend)
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/health", get(http::http_health))
        .route("/api/ai-assistant", post(http::http_post_ai_assistant))
        .route("/api/custome-quiz", post(http::http_post_custom_quiz))
        .route("/api/custom-quiz", post(http::http_post_custom_quiz))
        .route("/api/generate-quiz", post(http::http_post_generate_quiz))
        .route("/api/gradio-quiz", post(http::http_post_gradio_quiz))
        .route("/api/recommend-topic", post(http::http_post_recommend_topic))
        .route("/api/trivia-quiz", post(http::http_post_trivia_quiz))
        .with_state(state)
        // Layers run top to bottom: trace first, then CORS.
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::{Query, State},
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    use crate::config::{Prompts, Settings};

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn spawn_upstream(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn app(settings: Settings) -> Router {
        build_router(Arc::new(AppState::new(settings, Prompts::default()).unwrap()))
    }

    async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Generative API stub that always answers with `text` as the first candidate.
    fn gemini_stub(text: &'static str) -> Router {
        Router::new().route(
            "/generate",
            post(move |Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                Json(json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }))
            }),
        )
    }

    fn gemini_settings(base: &str) -> Settings {
        Settings {
            google_api_key: Some("test-key".into()),
            gemini_api_url: Some(format!("{base}/generate")),
            ..Settings::default()
        }
    }

    fn assert_consistent(quiz: &Value) {
        for item in quiz.as_array().unwrap() {
            let answer = &item["correctAnswer"];
            let hits = item["options"].as_array().unwrap().iter().filter(|o| *o == answer).count();
            assert_eq!(hits, 1, "item {item}");
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let res = app(Settings::default()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_api_key_yields_500_with_error() {
        let body = json!({"quizTopic": "Space", "numberOfQuestions": "3", "difficulty": "easy", "language": "English"});
        let (status, v) = post_json(app(Settings::default()), "/api/generate-quiz", body.clone()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["error"], "Environment variables not set: GOOGLE_API_KEY, GEMINI_API_URL");

        let mut with_model = body;
        with_model["model"] = json!("some/model");
        let (status, v) = post_json(app(Settings::default()), "/api/custome-quiz", with_model).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(v["error"].as_str().unwrap().contains("OPENROUTER_API_KEY"));

        let (status, v) = post_json(
            app(Settings::default()),
            "/api/ai-assistant",
            json!({"mode": "initial", "question": "Q", "options": ["a", "b"]}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(v["error"].is_string());
    }

    #[tokio::test]
    async fn missing_parameters_and_bad_bodies_are_400() {
        let (status, v) = post_json(app(Settings::default()), "/api/custome-quiz", json!({"quizTopic": "Space"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "Missing required parameters");

        let (status, v) = post_json(app(Settings::default()), "/api/trivia-quiz", json!({"numQuestions": "many"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "Invalid request body");

        let (status, _) = post_json(app(Settings::default()), "/api/trivia-quiz", json!({"numQuestions": 99})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trivia_count_is_required_and_bounded() {
        let (status, v) = post_json(app(Settings::default()), "/api/trivia-quiz", json!({"category": "9"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "Missing required parameters");

        for n in [0, 51] {
            let (status, v) = post_json(app(Settings::default()), "/api/trivia-quiz", json!({"numQuestions": n})).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "numQuestions = {n}");
            assert_eq!(v["error"], "numQuestions must be between 1 and 50");
        }
    }

    #[tokio::test]
    async fn generative_reply_without_candidates_is_empty() {
        let upstream = Router::new().route("/generate", post(|| async { Json(json!({ "candidates": [] })) }));
        let base = spawn_upstream(upstream).await;
        let body = json!({"quizTopic": "Space", "numberOfQuestions": 1, "difficulty": "easy"});
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/generate-quiz", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["error"], "Failed to generate quiz");
        assert_eq!(v["details"], "No data received from API");
    }

    #[tokio::test]
    async fn openrouter_reply_with_blank_content_is_empty() {
        let upstream = Router::new().route(
            "/chat",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "" } }] })) }),
        );
        let base = spawn_upstream(upstream).await;
        let settings = Settings {
            openrouter_api_key: Some("k".into()),
            openrouter_api_url: Some(format!("{base}/chat")),
            ..Settings::default()
        };
        let body = json!({"quizTopic": "Q", "numberOfQuestions": "1", "difficulty": "easy", "language": "English", "model": "test/model"});
        let (status, v) = post_json(app(settings), "/api/custome-quiz", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["error"], "Failed to generate quiz");
        assert_eq!(v["details"], "No data received from API");
    }

    #[tokio::test]
    async fn fenced_generative_output_is_parsed() {
        let text = "```json\n{\"quiz\":[{\"question\":\"Closest star?\",\"options\":[\"Sun\",\"Sirius\",\"Vega\",\"Altair\"],\"correctAnswer\":\"Sun\"}]}\n```";
        let base = spawn_upstream(gemini_stub(text)).await;
        let body = json!({"quizTopic": "Space", "numberOfQuestions": 1, "difficulty": "easy"});
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/generate-quiz", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["quiz"].as_array().unwrap().len(), 1);
        assert_eq!(v["quiz"][0]["correctAnswer"], "Sun");
        assert_consistent(&v["quiz"]);
    }

    #[tokio::test]
    async fn trailing_commas_are_repaired_and_bad_items_dropped() {
        let text = r#"{"quiz":[
            {"question":"2+2?","options":["3","4",],"correctAnswer":"4",},
            {"question":"Bad","options":["x","y"],"correctAnswer":"z"},
        ]}"#;
        let base = spawn_upstream(gemini_stub(text)).await;
        let body = json!({"quizTopic": "Math", "numberOfQuestions": "2", "difficulty": "easy"});
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/generate-quiz", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["quiz"].as_array().unwrap().len(), 1);
        assert_consistent(&v["quiz"]);
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_with_details() {
        let upstream = Router::new().route(
            "/generate",
            post(|| async { (StatusCode::FORBIDDEN, Json(json!({"error": {"message": "API key not valid"}}))) }),
        );
        let base = spawn_upstream(upstream).await;
        let body = json!({"quizTopic": "Space", "numberOfQuestions": 1, "difficulty": "easy"});
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/generate-quiz", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["error"], "API error: 403");
        assert_eq!(v["details"], "API key not valid");
    }

    #[tokio::test]
    async fn assistant_reply_is_cleaned() {
        let base = spawn_upstream(gemini_stub("- Think about gravity\n- Look at size\n- Compare orbits")).await;
        let body = json!({
            "mode": "followup",
            "question": "Largest planet?",
            "options": ["Mars", "Jupiter"],
            "selectedAnswer": "Mars",
            "messages": [{"role": "user", "content": "Mars or Jupiter?"}]
        });
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/ai-assistant", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["message"], "Think about gravity\nLook at size\nCompare orbits");
    }

    #[tokio::test]
    async fn recommendations_tolerate_fences_and_garbage() {
        let base = spawn_upstream(gemini_stub("```json\n[\"Astronomy\",\"Jazz\"]\n```")).await;
        let body = json!({"age": 30, "interests": ["music", "space"]});
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/recommend-topic", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["topics"], json!(["Astronomy", "Jazz"]));

        let base = spawn_upstream(gemini_stub("I cannot do that")).await;
        let (status, v) = post_json(app(gemini_settings(&base)), "/api/recommend-topic", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["topics"], json!([]));
    }

    #[tokio::test]
    async fn custom_quiz_goes_through_openrouter() {
        let upstream = Router::new().route(
            "/chat",
            post(|Json(req): Json<Value>| async move {
                assert_eq!(req["model"], "test/model");
                assert_eq!(req["response_format"]["type"], "json_object");
                let content = r#"{"quiz":[{"question":"Q","options":["a","b"],"correctAnswer":"b","hint":"not a"}]}"#;
                Json(json!({"choices": [{"message": {"content": content}}], "usage": {"total_tokens": 10}}))
            }),
        );
        let base = spawn_upstream(upstream).await;
        let settings = Settings {
            openrouter_api_key: Some("k".into()),
            openrouter_api_url: Some(format!("{base}/chat")),
            ..Settings::default()
        };
        let body = json!({"quizTopic": "Q", "numberOfQuestions": "1", "difficulty": "easy", "language": "English", "model": "test/model"});
        let (status, v) = post_json(app(settings), "/api/custome-quiz", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["quiz"][0]["hint"], "not a");
    }

    #[tokio::test]
    async fn trivia_end_to_end() {
        let upstream = Router::new().route(
            "/api.php",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("category").map(String::as_str), Some("9"));
                assert_eq!(q.get("difficulty").map(String::as_str), Some("easy"));
                assert_eq!(q.get("type").map(String::as_str), Some("multiple"));
                let n: usize = q["amount"].parse().unwrap();
                let results: Vec<Value> = (0..n)
                    .map(|i| {
                        json!({
                            "question": format!("Question {i}"),
                            "correct_answer": format!("Right {i}"),
                            "incorrect_answers": ["W1", "W2", "W3"]
                        })
                    })
                    .collect();
                Json(json!({"response_code": 0, "results": results}))
            }),
        );
        let base = spawn_upstream(upstream).await;
        let settings = Settings { trivia_api_url: Some(format!("{base}/api.php")), ..Settings::default() };

        let body = json!({"category": "9", "numQuestions": 3, "difficulty": "easy"});
        let (status, v) = post_json(app(settings), "/api/trivia-quiz", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        let quiz = v["quiz"].as_array().unwrap();
        assert_eq!(quiz.len(), 3);
        for item in quiz {
            assert_eq!(item["options"].as_array().unwrap().len(), 4);
        }
        assert_consistent(&v["quiz"]);
    }

    #[tokio::test]
    async fn trivia_without_results_is_400() {
        let upstream = Router::new().route("/api.php", get(|| async { Json(json!({"response_code": 1})) }));
        let base = spawn_upstream(upstream).await;
        let settings = Settings { trivia_api_url: Some(format!("{base}/api.php")), ..Settings::default() };
        let (status, v) = post_json(app(settings), "/api/trivia-quiz", json!({"numQuestions": "5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "No questions found");
    }

    #[tokio::test]
    async fn gradio_falls_through_to_a_working_candidate() {
        #[derive(Clone, Default)]
        struct Hits(Arc<AtomicUsize>);

        let hits = Hits::default();
        let upstream = Router::new()
            .route(
                "/run/predict",
                post(|State(h): State<Hits>| async move {
                    h.0.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "no such route")
                }),
            )
            .route(
                "/api/predict",
                post(|State(h): State<Hits>, Json(req): Json<Value>| async move {
                    h.0.fetch_add(1, Ordering::SeqCst);
                    match req.get("data") {
                        Some(_) => Json(json!({"data": ["not json"]})),
                        None => {
                            assert_eq!(req["quizTopic"], "Space");
                            let quiz = r#"```json
{"quiz":[{"question":"Q","options":["a","b"],"correctAnswer":"a"}]}
```"#;
                            Json(json!({ "data": [quiz] }))
                        }
                    }
                }),
            )
            .with_state(hits.clone());
        let base = spawn_upstream(upstream).await;
        let settings = Settings { gradio_space_url: Some(base), ..Settings::default() };

        let body = json!({"quizTopic": "Space", "numberOfQuestions": 1, "difficulty": "easy"});
        let (status, v) = post_json(app(settings), "/api/gradio-quiz", body).await;
        assert_eq!(status, StatusCode::OK, "{v}");
        assert_eq!(v["quiz"][0]["correctAnswer"], "a");
        // run/predict x2 shapes, then api/predict data shape, then api/predict plain shape.
        assert_eq!(hits.0.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gradio_reports_every_attempt_when_exhausted() {
        let upstream = Router::new();
        let base = spawn_upstream(upstream).await;
        let settings = Settings { gradio_space_url: Some(base), ..Settings::default() };
        let body = json!({"quizTopic": "Space", "numberOfQuestions": 1, "difficulty": "easy"});
        let (status, v) = post_json(app(settings), "/api/gradio-quiz", body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["error"], "Failed to generate quiz");
        assert_eq!(v["details"].as_str().unwrap().matches("HTTP 404").count(), 6);
    }
}
