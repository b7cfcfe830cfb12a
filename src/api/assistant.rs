use actix_web::{HttpResponse, web};
use serde_json::Value;
use tracing::instrument;

use crate::assistant::{ChatReply, ChatRequest, parse_chat};
use crate::auth::Principal;
use crate::error::{AppResult, ErrorBody};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/assistant/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, body = ChatReply),
        (status = 400, body = ErrorBody),
        (status = 429, description = "Rate limited"),
        (status = 502, description = "Upstream model failed", body = ErrorBody),
        (status = 503, description = "Assistant not configured", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Assistant"
)]
#[instrument(name = "assistant_chat", skip_all, fields(user_id = %principal.user_id))]
pub async fn chat(
    principal: Principal,
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let message = parse_chat(&body)?;
    let reply = state.assistant.chat(&message).await?;
    Ok(HttpResponse::Ok().json(reply))
}
