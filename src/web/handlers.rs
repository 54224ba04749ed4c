use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

use super::AppState;
use super::models::{
    ErrorDetailResponse, ErrorResponse, HealthResponse, TranslateRequest, TranslateResponse,
};
use crate::chat::types::ChatTurnRequest;
use crate::error::MedBridgeError;

/// POST /api/chat: run one chat turn and stream the reply as NDJSON,
/// one event object per line.
pub async fn chat(state: web::Data<AppState>, body: web::Json<ChatTurnRequest>) -> HttpResponse {
    match state.pipeline.process_turn(body.into_inner()).await {
        Ok(rx) => {
            let stream = ReceiverStream::new(rx).map(|event| {
                let mut line = serde_json::to_string(&event)
                    .unwrap_or_else(|_| r#"{"type":"error","error":"event serialization failed"}"#.to_string());
                line.push('\n');
                Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(line))
            });

            HttpResponse::Ok()
                .content_type("application/x-ndjson")
                .streaming(stream)
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/translate: translate a standalone piece of English text to
/// Vietnamese with bilingual medical terminology.
pub async fn translate(
    state: web::Data<AppState>,
    body: web::Json<TranslateRequest>,
) -> HttpResponse {
    let text = match body.into_inner().text {
        Some(text) if !text.trim().is_empty() => text,
        _ => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Text is required".to_string(),
            });
        }
    };

    // The translator is fail-open, so its only remaining failure mode is a
    // panic; run it in its own task and turn that into a 500 with details.
    let translator = state.translator.clone();
    let result = match tokio::spawn(async move { translator.to_vietnamese(&text).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!("Translation task failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorDetailResponse {
                error: "translation failed unexpectedly".to_string(),
                details: e.to_string(),
            });
        }
    };

    HttpResponse::Ok().json(TranslateResponse {
        translated_text: result.text,
        original_length: result.source_chars,
        translated_length: result.translated_chars,
    })
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { status: "ok" })
}

/// Pre-stream failures map to status codes; anything unexpected is logged
/// in full and reduced to a generic message for the caller.
fn error_response(error: MedBridgeError) -> HttpResponse {
    match &error {
        MedBridgeError::InvalidRequest(message) => HttpResponse::BadRequest().json(ErrorResponse {
            error: message.clone(),
        }),
        MedBridgeError::ModelNotFound(message) => HttpResponse::BadRequest().json(ErrorResponse {
            error: message.clone(),
        }),
        MedBridgeError::QuotaExceeded(message) => {
            HttpResponse::TooManyRequests().json(ErrorResponse {
                error: message.clone(),
            })
        }
        _ => {
            error!("Chat request failed: {}", error);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "internal server error".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use tokio::sync::mpsc;

    use super::*;
    use crate::chat::types::{Message, ModelEvent};
    use crate::chat::{MockChatModel, MockTranscriptStore, MockUsageTracker, TurnPipeline};
    use crate::config::{ChatConfig, ModelConfig};
    use crate::translate::{MockTranslationService, TranslationResult};
    use crate::web::routes;

    fn chat_config() -> ChatConfig {
        ChatConfig {
            models: vec![ModelConfig {
                id: "med-llm:8b".to_string(),
                endpoint: "http://localhost:11434".to_string(),
                model: "rainscales-healthcare-ai/med-llm:8b".to_string(),
                api_key: None,
            }],
            default_system_prompt: "You are a helpful medical assistant.".to_string(),
            stream_timeout_secs: 60,
            max_steps: 10,
        }
    }

    fn state_with(
        usage: MockUsageTracker,
        model: MockChatModel,
        translator: MockTranslationService,
        handler_translator: MockTranslationService,
    ) -> AppState {
        let mut store = MockTranscriptStore::new();
        store.expect_append().returning(|_, _, _, _| Ok(()));

        let pipeline = TurnPipeline::new(
            chat_config(),
            Arc::new(usage),
            Arc::new(model),
            Arc::new(store),
            Arc::new(translator),
        );

        AppState {
            pipeline: Arc::new(pipeline),
            translator: Arc::new(handler_translator),
        }
    }

    fn passthrough_translator() -> MockTranslationService {
        let mut translator = MockTranslationService::new();
        translator
            .expect_to_english()
            .returning(|text| TranslationResult::passthrough(text));
        translator
            .expect_to_vietnamese()
            .returning(|text| TranslationResult::passthrough(text));
        translator
    }

    fn chat_body(chat_id: &str) -> serde_json::Value {
        serde_json::json!({
            "messages": [{"role": "user", "content": "hello"}],
            "chatId": chat_id,
            "userId": "u1",
            "model": "med-llm:8b",
            "isAuthenticated": true
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(routes::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_health_reports_ok() {
        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_translate_rejects_missing_text() {
        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/translate")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "Text is required");
    }

    #[actix_web::test]
    async fn test_translate_rejects_blank_text() {
        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/translate")
            .set_json(serde_json::json!({"text": "   "}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_translate_returns_lengths_in_camel_case() {
        let mut translator = MockTranslationService::new();
        translator.expect_to_vietnamese().returning(|text| {
            TranslationResult::translated(text, "Uống thuốc hai lần mỗi ngày.".to_string())
        });

        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            translator,
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/translate")
            .set_json(serde_json::json!({"text": "Take the medication twice daily."}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["translatedText"], "Uống thuốc hai lần mỗi ngày.");
        assert_eq!(json["originalLength"], 32);
        assert!(json["translatedLength"].as_u64().unwrap() > 0);
    }

    #[actix_web::test]
    async fn test_translate_maps_panicked_translation_to_500_with_details() {
        let mut translator = MockTranslationService::new();
        translator
            .expect_to_vietnamese()
            .returning(|_| panic!("glossary index poisoned"));

        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            translator,
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/translate")
            .set_json(serde_json::json!({"text": "Take one tablet daily."}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ErrorDetailResponse = test::read_body_json(resp).await;
        assert_eq!(body.error, "translation failed unexpectedly");
        assert!(body.details.contains("panic"));
    }

    #[actix_web::test]
    async fn test_chat_rejects_invalid_request_with_400() {
        let state = state_with(
            MockUsageTracker::new(),
            MockChatModel::new(),
            MockTranslationService::new(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(chat_body(""))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_chat_maps_quota_denial_to_429() {
        let mut usage = MockUsageTracker::new();
        usage
            .expect_check_and_reserve()
            .returning(|_, _, _| Ok(false));

        let state = state_with(
            usage,
            MockChatModel::new(),
            MockTranslationService::new(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(chat_body("c1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_chat_streams_ndjson_events() {
        let mut usage = MockUsageTracker::new();
        usage.expect_check_and_reserve().returning(|_, _, _| Ok(true));
        usage.expect_increment().returning(|_| Ok(()));

        let mut model = MockChatModel::new();
        model.expect_invoke().returning(|invocation| {
            assert_eq!(invocation.messages, vec![Message::user("hello")]);
            let (tx, rx) = mpsc::channel(8);
            tokio::spawn(async move {
                let _ = tx.send(ModelEvent::Content("Hi ".to_string())).await;
                let _ = tx.send(ModelEvent::Content("there.".to_string())).await;
                let _ = tx.send(ModelEvent::Done).await;
            });
            Ok(rx)
        });

        let state = state_with(
            usage,
            model,
            passthrough_translator(),
            MockTranslationService::new(),
        );
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_json(chat_body("c1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/x-ndjson"
        );

        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"type":"content","text":"Hi "}"#);
        assert_eq!(lines[1], r#"{"type":"content","text":"there."}"#);
        assert_eq!(*lines.last().unwrap(), r#"{"type":"done"}"#);
    }
}
