use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::model::employee::EmployeeSummary;

/// One payroll cycle for one employee. `net_salary` is always derived.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    #[schema(example = "0b6f7c1e-2f43-4b7e-9d0b-5f1f3b8f2a10")]
    pub id: String,

    #[schema(example = "8d3c2b9a-6f0e-4a4e-8b7d-2c1e0f9a7b55")]
    pub employee_id: String,

    #[schema(example = 6)]
    pub month: i32,

    #[schema(example = 2025)]
    pub year: i32,

    #[schema(value_type = f64, example = 5000.0)]
    pub basic_salary: Decimal,

    #[schema(value_type = f64, example = 200.0)]
    pub bonus: Decimal,

    #[schema(value_type = f64, example = 100.0)]
    pub deductions: Decimal,

    #[schema(value_type = f64, example = 5100.0)]
    pub net_salary: Decimal,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl SalaryRecord {
    pub fn period(&self) -> PeriodKey {
        PeriodKey {
            employee_id: self.employee_id.clone(),
            month: self.month,
            year: self.year,
        }
    }
}

/// The (employee, month, year) triple that must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeriodKey {
    pub employee_id: String,
    pub month: i32,
    pub year: i32,
}

/// Validated input for a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSalaryRecord {
    pub employee_id: String,
    pub month: i32,
    pub year: i32,
    pub basic_salary: Decimal,
    pub bonus: Decimal,
    pub deductions: Decimal,
}

/// Validated partial update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryPatch {
    pub employee_id: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub basic_salary: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub deductions: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryFilter {
    pub employee_id: Option<String>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SalaryQuery {
    /// Page number, starting at 1
    #[schema(example = 1)]
    pub page: Option<i64>,

    /// Items per page (1 to 100)
    #[schema(example = 10)]
    pub limit: Option<i64>,

    /// Filter by employee id
    pub employee_id: Option<String>,

    /// Filter by month (1 to 12)
    #[schema(example = 6)]
    pub month: Option<i32>,

    /// Filter by year
    #[schema(example = 2025)]
    pub year: Option<i32>,
}

impl SalaryQuery {
    pub fn filter(&self) -> SalaryFilter {
        SalaryFilter {
            employee_id: self
                .employee_id
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            month: self.month.filter(|m| *m != 0),
            year: self.year.filter(|y| *y != 0),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// Calendar year to summarise
    pub year: i32,
}

/// Record plus the employee it belongs to.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecordView {
    #[serde(flatten)]
    pub record: SalaryRecord,
    pub employee: Option<EmployeeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    #[schema(example = 6)]
    pub month: i32,

    #[schema(example = 12)]
    pub records: i64,

    #[schema(value_type = f64, example = 61200.0)]
    pub total_net: Decimal,

    #[schema(value_type = f64, example = 5100.0)]
    pub average_net: Decimal,
}
