#[macro_use]
mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use async_trait::async_trait;
use hr_admin::assistant::{AssistantService, GenerationError, TextGenerator};
use hr_admin::store::memory::MemoryStore;
use serde_json::json;

use common::bearer;

struct Canned {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TextGenerator for Canned {
    async fn generate(&self, system_prompt: &str, _message: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(system_prompt, "Answer HR questions only.");
        Ok("Submit the request in the portal.".into())
    }
}

#[actix_web::test]
async fn chat_replies_and_caches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let assistant = AssistantService::new(
        Some(Arc::new(Canned {
            calls: calls.clone(),
        })),
        "Answer HR questions only.",
        Duration::from_secs(60),
    );
    let app = init_app!(common::state_with(MemoryStore::new(), assistant));

    for _ in 0..2 {
        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/assistant/chat")
                .insert_header(bearer("hr-admin"))
                .set_json(json!({ "message": "How do I request leave?" }))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "Submit the request in the portal.");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn empty_message_is_a_validation_error() {
    let app = init_app!(common::state(MemoryStore::new()));

    let (status, body) = send!(
        app,
        TestRequest::post()
            .uri("/api/assistant/chat")
            .insert_header(bearer("hr-admin"))
            .set_json(json!({ "message": "   " }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "message");
}

#[actix_web::test]
async fn unconfigured_assistant_is_unavailable() {
    let app = init_app!(common::state(MemoryStore::new()));

    let (status, _) = send!(
        app,
        TestRequest::post()
            .uri("/api/assistant/chat")
            .insert_header(bearer("hr-admin"))
            .set_json(json!({ "message": "hello" }))
    );
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn health_is_public() {
    let app = init_app!(common::state(MemoryStore::new()));
    let (status, body) = send!(app, TestRequest::get().uri("/health"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
