use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::OpenApi as OpenApiDoc;
use utoipa::{Modify, OpenApi};

use crate::api::{EmployeePage, ProjectPage, SalaryPage};
use crate::assistant::{ChatReply, ChatRequest};
use crate::auth::Principal;
use crate::error::{ErrorBody, FieldError};
use crate::model::{
    employee::{Employee, EmployeeDetail, EmployeeSummary},
    project::{Project, ProjectStatus},
    salary::{MonthlySummary, SalaryRecord, SalaryRecordView},
    task::{Task, TaskPriority, TaskStatus},
};
use crate::utils::pagination::PageMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Admin API",
        version = "1.0.0",
        description = r#"
## HR Admin

Back end of an HR admin portal.

### Key Features
- **Salary records**: one record per employee and pay period, with a derived net salary
- **Employees**: profiles with salary history
- **Projects and tasks**: visible to the manager and team members
- **Assistant**: HR-focused chat backed by a hosted model

### Security
Every `/api` endpoint requires a **JWT Bearer** token issued by the identity provider.

### Response Format
- camelCase JSON
- List endpoints return `{ data, pagination: { total, page, limit, totalPages } }`
- Errors return `{ error, details? }`
"#,
    ),
    paths(
        crate::api::me,

        crate::api::salary::list_salaries,
        crate::api::salary::create_salary,
        crate::api::salary::salary_summary,
        crate::api::salary::get_salary,
        crate::api::salary::update_salary,
        crate::api::salary::delete_salary,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::project::list_projects,
        crate::api::project::create_project,
        crate::api::project::get_project,
        crate::api::project::update_project,
        crate::api::project::delete_project,

        crate::api::task::list_tasks,
        crate::api::task::create_task,
        crate::api::task::update_task,
        crate::api::task::delete_task,

        crate::api::assistant::chat
    ),
    components(
        schemas(
            ErrorBody,
            FieldError,
            PageMeta,
            Principal,
            SalaryRecord,
            SalaryRecordView,
            SalaryPage,
            MonthlySummary,
            Employee,
            EmployeeSummary,
            EmployeeDetail,
            EmployeePage,
            Project,
            ProjectStatus,
            ProjectPage,
            Task,
            TaskPriority,
            TaskStatus,
            ChatRequest,
            ChatReply
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Session", description = "Authenticated caller"),
        (name = "Salary", description = "Salary record APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Project", description = "Project management APIs"),
        (name = "Task", description = "Project task APIs"),
        (name = "Assistant", description = "HR assistant chat"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Prefix the route annotations are written against.
const DOCUMENTED_PREFIX: &str = "/api";

/// The generated document with its paths moved under the configured prefix.
pub fn api_doc(api_prefix: &str) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    if api_prefix == DOCUMENTED_PREFIX {
        return doc;
    }

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| match path.strip_prefix(DOCUMENTED_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                (format!("{api_prefix}{rest}"), item)
            }
            _ => (path, item),
        })
        .collect();
    doc
}
