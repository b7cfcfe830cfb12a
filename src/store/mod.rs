//! Datastore seams. Services only see these traits; `mysql` backs production
//! and `memory` backs tests and local runs without a database.

use async_trait::async_trait;
use derive_more::{Display, Error};

use crate::model::{
    employee::{Employee, EmployeeFilter, EmployeeSummary},
    project::Project,
    salary::{MonthlySummary, PeriodKey, SalaryFilter, SalaryRecord},
    task::Task,
};
use crate::utils::pagination::Pagination;

pub mod memory;
pub mod mysql;

#[derive(Debug, Display, Error)]
pub enum StoreError {
    #[display(fmt = "unique constraint violated: {}", _0)]
    UniqueViolation(#[error(not(source))] String),

    #[display(fmt = "foreign key constraint violated: {}", _0)]
    ForeignKeyViolation(#[error(not(source))] String),

    #[display(fmt = "datastore call timed out")]
    Timeout,

    #[display(fmt = "datastore error: {}", _0)]
    Backend(#[error(not(source))] String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SalaryStore: Send + Sync {
    /// Fails with `UniqueViolation` when the period is already taken.
    async fn insert_salary(&self, record: &SalaryRecord) -> StoreResult<()>;

    async fn salary(&self, id: &str) -> StoreResult<Option<SalaryRecord>>;

    async fn salary_for_period(
        &self,
        key: &PeriodKey,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<SalaryRecord>>;

    /// Ordered by year desc, month desc, created_at desc. Returns the page and
    /// the filtered total.
    async fn list_salaries(
        &self,
        filter: &SalaryFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<SalaryRecord>, i64)>;

    async fn count_salaries(&self, filter: &SalaryFilter) -> StoreResult<i64>;

    /// Returns false when no row matched `record.id`.
    async fn update_salary(&self, record: &SalaryRecord) -> StoreResult<bool>;

    async fn delete_salary(&self, id: &str) -> StoreResult<bool>;

    async fn monthly_summary(&self, year: i32) -> StoreResult<Vec<MonthlySummary>>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()>;

    async fn employee(&self, id: &str) -> StoreResult<Option<Employee>>;

    async fn employee_by_code(
        &self,
        code: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<Employee>>;

    async fn employee_summaries(&self, ids: &[String]) -> StoreResult<Vec<EmployeeSummary>>;

    /// Ordered by created_at desc.
    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Employee>, i64)>;

    async fn update_employee(&self, employee: &Employee) -> StoreResult<bool>;

    /// Salary records restrict the delete; assigned tasks are unassigned.
    async fn delete_employee(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, project: &Project) -> StoreResult<()>;

    async fn project(&self, id: &str) -> StoreResult<Option<Project>>;

    /// Projects the user manages or is a member of, created_at desc.
    async fn list_visible_projects(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Project>, i64)>;

    /// Replaces scalar columns and the member set.
    async fn update_project(&self, project: &Project) -> StoreResult<bool>;

    /// Deletes the project together with its tasks and memberships.
    async fn delete_project(&self, id: &str) -> StoreResult<bool>;

    async fn insert_task(&self, task: &Task) -> StoreResult<()>;

    async fn task(&self, project_id: &str, task_id: &str) -> StoreResult<Option<Task>>;

    /// Oldest first.
    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>>;

    async fn update_task(&self, task: &Task) -> StoreResult<bool>;

    async fn delete_task(&self, project_id: &str, task_id: &str) -> StoreResult<bool>;
}

/// Directory of principals the service has seen.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn touch_user(&self, user_id: &str, email: Option<&str>) -> StoreResult<()>;

    /// The subset of `ids` that belong to known users.
    async fn known_users(&self, ids: &[String]) -> StoreResult<Vec<String>>;
}
