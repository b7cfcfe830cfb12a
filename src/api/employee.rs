use actix_web::{HttpResponse, web};
use serde_json::Value;

use super::{EmployeePage, Paginated};
use crate::auth::Principal;
use crate::error::{AppResult, ErrorBody};
use crate::model::employee::{Employee, EmployeeDetail, EmployeeQuery};
use crate::service::employee::{parse_employee_patch, parse_new_employee};
use crate::state::AppState;
use crate::utils::pagination::Pagination;

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, body = EmployeePage),
        (status = 401, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    _principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    let page = Pagination::new(query.page, query.limit);
    let (data, meta) = state.employees.list(&query.filter(), page).await?;
    Ok(Paginated::ok(data, meta))
}

#[utoipa::path(
    post,
    path = "/api/employees",
    request_body(
        content = Object,
        example = json!({
            "employeeId": "EMP-001",
            "name": "John Doe",
            "email": "john.doe@company.com",
            "position": "Engineer",
            "joiningDate": "2024-01-01",
            "basicSalary": 5000
        })
    ),
    responses(
        (status = 201, body = Employee),
        (status = 400, body = ErrorBody),
        (status = 409, description = "Employee ID taken", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let input = parse_new_employee(&body)?;
    let employee = state.employees.create(input).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", description = "Employee id")),
    responses(
        (status = 200, body = EmployeeDetail),
        (status = 404, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let detail = state.employees.get(&path).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/employees/{id}",
    params(("id", description = "Employee id")),
    request_body(content = Object, example = json!({"position": "Senior Engineer", "isActive": true})),
    responses(
        (status = 200, body = Employee),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let patch = parse_employee_patch(&body)?;
    let employee = state.employees.update(&path, patch).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id", description = "Employee id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, body = ErrorBody),
        (status = 409, description = "Employee has salary records", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    _principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    state.employees.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
