use actix_web::{HttpResponse, get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Principal;
use crate::model::{employee::Employee, project::Project, salary::SalaryRecordView};
use crate::utils::pagination::PageMeta;

pub mod assistant;
pub mod employee;
pub mod project;
pub mod salary;
pub mod task;

/// Envelope of every list endpoint.
#[derive(Serialize, ToSchema)]
#[aliases(
    SalaryPage = Paginated<SalaryRecordView>,
    EmployeePage = Paginated<Employee>,
    ProjectPage = Paginated<Project>
)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn ok(data: Vec<T>, pagination: PageMeta) -> HttpResponse {
        HttpResponse::Ok().json(Paginated { data, pagination })
    }
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, body = Principal),
        (status = 401, body = crate::error::ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Session"
)]
#[get("/me")]
pub async fn me(principal: Principal) -> HttpResponse {
    HttpResponse::Ok().json(principal)
}
