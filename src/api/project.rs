use actix_web::{HttpResponse, web};
use serde_json::Value;

use super::{Paginated, ProjectPage};
use crate::auth::Principal;
use crate::error::{AppResult, ErrorBody};
use crate::model::project::{PageQuery, Project};
use crate::service::project::{parse_new_project, parse_project_patch};
use crate::state::AppState;
use crate::utils::pagination::Pagination;

#[utoipa::path(
    get,
    path = "/api/projects",
    params(PageQuery),
    responses(
        (status = 200, description = "Projects the caller manages or belongs to", body = ProjectPage),
        (status = 401, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Project"
)]
pub async fn list_projects(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = Pagination::new(query.page, query.limit);
    let (data, meta) = state.projects.list(&principal, page).await?;
    Ok(Paginated::ok(data, meta))
}

#[utoipa::path(
    post,
    path = "/api/projects",
    request_body(
        content = Object,
        example = json!({
            "name": "Payroll migration",
            "description": "Move payroll to the new portal",
            "status": "active",
            "startDate": "2025-01-06",
            "teamMembers": ["user-2"]
        })
    ),
    responses(
        (status = 201, body = Project),
        (status = 400, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Project"
)]
pub async fn create_project(
    principal: Principal,
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let input = parse_new_project(&body)?;
    let project = state.projects.create(&principal, input).await?;
    Ok(HttpResponse::Created().json(project))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(("id", description = "Project id")),
    responses(
        (status = 200, body = Project),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Project"
)]
pub async fn get_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let project = state.projects.get(&principal, &path).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[utoipa::path(
    patch,
    path = "/api/projects/{id}",
    params(("id", description = "Project id")),
    request_body(content = Object, example = json!({"status": "completed"})),
    responses(
        (status = 200, body = Project),
        (status = 400, body = ErrorBody),
        (status = 403, description = "Caller is not the manager", body = ErrorBody),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Project"
)]
pub async fn update_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let patch = parse_project_patch(&body)?;
    let project = state.projects.update(&principal, &path, patch).await?;
    Ok(HttpResponse::Ok().json(project))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(("id", description = "Project id")),
    responses(
        (status = 204, description = "Deleted with its tasks"),
        (status = 403, body = ErrorBody),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Project"
)]
pub async fn delete_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.projects.delete(&principal, &path).await?;
    Ok(HttpResponse::NoContent().finish())
}
