use actix_web::{HttpResponse, web};
use serde_json::Value;

use crate::auth::Principal;
use crate::error::{AppResult, ErrorBody};
use crate::model::task::Task;
use crate::service::project::{parse_new_task, parse_task_patch};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/projects/{id}/tasks",
    params(("id", description = "Project id")),
    responses(
        (status = 200, body = [Task]),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn list_tasks(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let tasks = state.projects.list_tasks(&principal, &path).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/tasks",
    params(("id", description = "Project id")),
    request_body(
        content = Object,
        example = json!({"title": "Export last year's records", "priority": "high", "assigneeId": "8d3c2b9a"})
    ),
    responses(
        (status = 201, body = Task),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn create_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let input = parse_new_task(&body)?;
    let task = state.projects.create_task(&principal, &path, input).await?;
    Ok(HttpResponse::Created().json(task))
}

#[utoipa::path(
    patch,
    path = "/api/projects/{id}/tasks/{task_id}",
    params(
        ("id", description = "Project id"),
        ("task_id", description = "Task id")
    ),
    request_body(content = Object, example = json!({"status": "in-progress"})),
    responses(
        (status = 200, body = Task),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn update_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let (project_id, task_id) = path.into_inner();
    let patch = parse_task_patch(&body)?;
    let task = state
        .projects
        .update_task(&principal, &project_id, &task_id, patch)
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}/tasks/{task_id}",
    params(
        ("id", description = "Project id"),
        ("task_id", description = "Task id")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Task"
)]
pub async fn delete_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (project_id, task_id) = path.into_inner();
    state
        .projects
        .delete_task(&principal, &project_id, &task_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
