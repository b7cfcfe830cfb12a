use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::net_salary::net_salary;
use super::validation::{AmountRule, Fields};
use crate::error::{AppError, AppResult};
use crate::model::employee::EmployeeSummary;
use crate::model::salary::{
    MonthlySummary, NewSalaryRecord, PeriodKey, SalaryFilter, SalaryPatch, SalaryRecord,
    SalaryRecordView,
};
use crate::store::{EmployeeStore, SalaryStore, StoreError};
use crate::utils::pagination::{PageMeta, Pagination};

pub const MONTHS: std::ops::RangeInclusive<i64> = 1..=12;
pub const YEARS: std::ops::RangeInclusive<i64> = 2000..=2100;

const DUPLICATE_PERIOD: &str = "A salary record already exists for this employee and period";

const PATCH_FIELDS: [&str; 6] = [
    "employeeId",
    "month",
    "year",
    "basicSalary",
    "bonus",
    "deductions",
];

/// Validates a create body. Absent or null bonus/deductions default to 0.
pub fn parse_new_salary(body: &Value) -> AppResult<NewSalaryRecord> {
    let mut f = Fields::new(body)?;

    let employee_id = f.required_str("employeeId");
    let month = f.required_int("month", MONTHS);
    let year = f.required_int("year", YEARS);
    let basic_salary = f.required_amount("basicSalary", AmountRule::NonNegative);
    let bonus = f.amount_or("bonus", AmountRule::NonNegative, Decimal::ZERO);
    let deductions = f.amount_or("deductions", AmountRule::NonNegative, Decimal::ZERO);
    f.finish()?;

    Ok(NewSalaryRecord {
        employee_id,
        month: month as i32,
        year: year as i32,
        basic_salary,
        bonus,
        deductions,
    })
}

/// Validates a patch body: every present field under the create rules, at
/// least one known field. `netSalary` and unknown keys are ignored.
pub fn parse_salary_patch(body: &Value) -> AppResult<SalaryPatch> {
    let mut f = Fields::new(body)?;
    if !f.has_any(&PATCH_FIELDS) {
        f.reject("body", format!("provide at least one of: {}", PATCH_FIELDS.join(", ")));
    }

    let patch = SalaryPatch {
        employee_id: f.optional_str("employeeId"),
        month: f.optional_int("month", MONTHS).map(|m| m as i32),
        year: f.optional_int("year", YEARS).map(|y| y as i32),
        basic_salary: f.optional_amount("basicSalary", AmountRule::NonNegative),
        bonus: f.optional_amount("bonus", AmountRule::NonNegative),
        deductions: f.optional_amount("deductions", AmountRule::NonNegative),
    };
    f.finish()?;

    Ok(patch)
}

/// Salary record operations: validation-free core that the HTTP layer calls
/// with parsed input.
#[derive(Clone)]
pub struct SalaryService {
    salaries: Arc<dyn SalaryStore>,
    employees: Arc<dyn EmployeeStore>,
}

impl SalaryService {
    pub fn new(salaries: Arc<dyn SalaryStore>, employees: Arc<dyn EmployeeStore>) -> Self {
        Self {
            salaries,
            employees,
        }
    }

    pub async fn create(&self, input: NewSalaryRecord) -> AppResult<SalaryRecordView> {
        let employee = self.employee_summary(&input.employee_id).await?;

        let key = PeriodKey {
            employee_id: input.employee_id.clone(),
            month: input.month,
            year: input.year,
        };
        self.ensure_period_free(&key, None).await?;

        let now = Utc::now().trunc_subsecs(3);
        let record = SalaryRecord {
            id: Uuid::new_v4().to_string(),
            employee_id: input.employee_id,
            month: input.month,
            year: input.year,
            basic_salary: input.basic_salary,
            bonus: input.bonus,
            deductions: input.deductions,
            net_salary: net_salary(input.basic_salary, input.bonus, input.deductions),
            created_at: now,
            updated_at: now,
        };

        self.salaries
            .insert_salary(&record)
            .await
            .map_err(period_conflict)?;

        info!(
            record_id = %record.id,
            employee_id = %record.employee_id,
            month = record.month,
            year = record.year,
            "Salary record created"
        );

        Ok(SalaryRecordView {
            record,
            employee: Some(employee),
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<SalaryRecordView> {
        let record = self.find(id).await?;
        let mut views = self.attach_employees(vec![record]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::not_found("Salary record not found"))
    }

    pub async fn list(
        &self,
        filter: &SalaryFilter,
        page: Pagination,
    ) -> AppResult<(Vec<SalaryRecordView>, PageMeta)> {
        let (records, total) = self.salaries.list_salaries(filter, page).await?;
        debug!(total, returned = records.len(), "Listed salary records");

        let views = self.attach_employees(records).await?;
        Ok((views, page.meta(total)))
    }

    pub async fn update(&self, id: &str, patch: SalaryPatch) -> AppResult<SalaryRecordView> {
        let current = self.find(id).await?;
        let mut next = current.clone();

        if let Some(employee_id) = patch.employee_id {
            next.employee_id = employee_id;
        }
        if let Some(month) = patch.month {
            next.month = month;
        }
        if let Some(year) = patch.year {
            next.year = year;
        }
        if let Some(basic_salary) = patch.basic_salary {
            next.basic_salary = basic_salary;
        }
        if let Some(bonus) = patch.bonus {
            next.bonus = bonus;
        }
        if let Some(deductions) = patch.deductions {
            next.deductions = deductions;
        }

        let employee = self.employee_summary(&next.employee_id).await?;
        if next.period() != current.period() {
            self.ensure_period_free(&next.period(), Some(id)).await?;
        }

        next.net_salary = net_salary(next.basic_salary, next.bonus, next.deductions);
        next.updated_at = Utc::now().trunc_subsecs(3);

        let updated = self
            .salaries
            .update_salary(&next)
            .await
            .map_err(period_conflict)?;
        if !updated {
            return Err(AppError::not_found("Salary record not found"));
        }

        info!(record_id = %next.id, net_salary = %next.net_salary, "Salary record updated");

        Ok(SalaryRecordView {
            record: next,
            employee: Some(employee),
        })
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.salaries.delete_salary(id).await? {
            return Err(AppError::not_found("Salary record not found"));
        }
        info!(record_id = %id, "Salary record deleted");
        Ok(())
    }

    pub async fn summary(&self, year: i32) -> AppResult<Vec<MonthlySummary>> {
        if !YEARS.contains(&(year as i64)) {
            return Err(AppError::Validation(vec![crate::error::FieldError::new(
                "year",
                format!("must be between {} and {}", YEARS.start(), YEARS.end()),
            )]));
        }
        Ok(self.salaries.monthly_summary(year).await?)
    }

    async fn find(&self, id: &str) -> AppResult<SalaryRecord> {
        self.salaries
            .salary(id)
            .await?
            .ok_or_else(|| AppError::not_found("Salary record not found"))
    }

    async fn employee_summary(&self, employee_id: &str) -> AppResult<EmployeeSummary> {
        let mut found = self
            .employees
            .employee_summaries(&[employee_id.to_string()])
            .await?;
        found
            .pop()
            .ok_or_else(|| AppError::not_found("Employee not found"))
    }

    /// Application-level half of the uniqueness guard. The store's unique key
    /// catches writers that race past this check.
    async fn ensure_period_free(&self, key: &PeriodKey, exclude_id: Option<&str>) -> AppResult<()> {
        if let Some(existing) = self.salaries.salary_for_period(key, exclude_id).await? {
            warn!(
                existing_id = %existing.id,
                employee_id = %key.employee_id,
                month = key.month,
                year = key.year,
                "Duplicate salary period rejected"
            );
            return Err(AppError::conflict(DUPLICATE_PERIOD));
        }
        Ok(())
    }

    async fn attach_employees(&self, records: Vec<SalaryRecord>) -> AppResult<Vec<SalaryRecordView>> {
        let mut ids: Vec<String> = records.iter().map(|r| r.employee_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let employees: HashMap<String, EmployeeSummary> = self
            .employees
            .employee_summaries(&ids)
            .await?
            .into_iter()
            .map(|e| (e.id.clone(), e))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| SalaryRecordView {
                employee: employees.get(&record.employee_id).cloned(),
                record,
            })
            .collect())
    }
}

fn period_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(_) => AppError::conflict(DUPLICATE_PERIOD),
        StoreError::ForeignKeyViolation(_) => AppError::not_found("Employee not found"),
        other => AppError::Store(other),
    }
}
