use actix_web::{HttpResponse, web};
use serde_json::Value;

use super::{Paginated, SalaryPage};
use crate::auth::Principal;
use crate::error::{AppResult, ErrorBody};
use crate::model::salary::{MonthlySummary, SalaryQuery, SalaryRecordView, SummaryQuery};
use crate::service::salary::{parse_new_salary, parse_salary_patch};
use crate::state::AppState;
use crate::utils::pagination::Pagination;

#[utoipa::path(
    get,
    path = "/api/salaries",
    params(SalaryQuery),
    responses(
        (status = 200, body = SalaryPage),
        (status = 400, body = ErrorBody),
        (status = 401, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn list_salaries(
    _principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<SalaryQuery>,
) -> AppResult<HttpResponse> {
    let page = Pagination::new(query.page, query.limit);
    let (data, meta) = state.salaries.list(&query.filter(), page).await?;
    Ok(Paginated::ok(data, meta))
}

#[utoipa::path(
    post,
    path = "/api/salaries",
    request_body(
        content = Object,
        description = "employeeId, month, year, basicSalary, bonus?, deductions?",
        example = json!({"employeeId": "8d3c2b9a", "month": 6, "year": 2025, "basicSalary": 5000, "bonus": 200, "deductions": 100})
    ),
    responses(
        (status = 201, body = SalaryRecordView),
        (status = 400, body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody),
        (status = 409, description = "Period already recorded", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn create_salary(
    _principal: Principal,
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let input = parse_new_salary(&body)?;
    let created = state.salaries.create(input).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/salaries/summary",
    params(SummaryQuery),
    responses(
        (status = 200, body = [MonthlySummary]),
        (status = 400, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn salary_summary(
    _principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> AppResult<HttpResponse> {
    let months = state.salaries.summary(query.year).await?;
    Ok(HttpResponse::Ok().json(months))
}

#[utoipa::path(
    get,
    path = "/api/salaries/{id}",
    params(("id", description = "Salary record id")),
    responses(
        (status = 200, body = SalaryRecordView),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn get_salary(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let record = state.salaries.get(&path).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    patch,
    path = "/api/salaries/{id}",
    params(("id", description = "Salary record id")),
    request_body(
        content = Object,
        description = "Any of employeeId, month, year, basicSalary, bonus, deductions. netSalary is always recomputed.",
        example = json!({"bonus": 500})
    ),
    responses(
        (status = 200, body = SalaryRecordView),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn update_salary(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let patch = parse_salary_patch(&body)?;
    let updated = state.salaries.update(&path, patch).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/salaries/{id}",
    params(("id", description = "Salary record id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn delete_salary(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.salaries.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
