use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::model::salary::SalaryRecord;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": "8d3c2b9a-6f0e-4a4e-8b7d-2c1e0f9a7b55",
        "employeeId": "EMP-001",
        "name": "John Doe",
        "email": "john.doe@company.com",
        "position": "Engineer",
        "joiningDate": "2024-01-01",
        "basicSalary": 5000.0,
        "isActive": true,
        "createdAt": "2024-01-01T09:00:00Z",
        "updatedAt": "2024-01-01T09:00:00Z"
    })
)]
pub struct Employee {
    pub id: String,

    /// Business code, unique across employees
    #[serde(rename = "employeeId")]
    pub employee_code: String,

    pub name: String,

    #[schema(nullable = true)]
    pub email: Option<String>,

    #[schema(nullable = true)]
    pub position: Option<String>,

    #[schema(value_type = String, format = "date")]
    pub joining_date: NaiveDate,

    /// Template amount used when drafting salary records
    #[schema(value_type = f64)]
    pub basic_salary: Decimal,

    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// What salary records embed about their employee.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct EmployeeSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "employeeId")]
    pub employee_code: String,
}

impl From<&Employee> for EmployeeSummary {
    fn from(e: &Employee) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            employee_code: e.employee_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub employee_code: String,
    pub name: String,
    pub email: Option<String>,
    pub position: Option<String>,
    pub joining_date: NaiveDate,
    pub basic_salary: Decimal,
    pub is_active: bool,
}

/// `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeePatch {
    pub employee_code: Option<String>,
    pub name: Option<String>,
    pub email: Option<Option<String>>,
    pub position: Option<Option<String>>,
    pub joining_date: Option<NaiveDate>,
    pub basic_salary: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Search by name, employee code or email
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

impl EmployeeQuery {
    pub fn filter(&self) -> EmployeeFilter {
        EmployeeFilter {
            search: self
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub salary_records: Vec<SalaryRecord>,
}
