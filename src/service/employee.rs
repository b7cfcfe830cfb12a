use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::validation::{AmountRule, Fields, is_valid_email};
use crate::error::{AppError, AppResult};
use crate::model::employee::{Employee, EmployeeDetail, EmployeeFilter, EmployeePatch, NewEmployee};
use crate::model::salary::SalaryFilter;
use crate::store::{EmployeeStore, SalaryStore, StoreError};
use crate::utils::pagination::{MAX_LIMIT, PageMeta, Pagination};

const DUPLICATE_CODE: &str = "An employee with this employee ID already exists";

const PATCH_FIELDS: [&str; 7] = [
    "employeeId",
    "name",
    "email",
    "position",
    "joiningDate",
    "basicSalary",
    "isActive",
];

fn check_email(f: &mut Fields<'_>, email: &Option<String>) {
    if let Some(email) = email {
        if !is_valid_email(email) {
            f.reject("email", "must be a valid email address");
        }
    }
}

pub fn parse_new_employee(body: &Value) -> AppResult<NewEmployee> {
    let mut f = Fields::new(body)?;

    let employee_code = f.required_str("employeeId");
    let name = f.required_str("name");
    let email = f.nullable_str("email").flatten();
    check_email(&mut f, &email);
    let position = f.nullable_str("position").flatten();
    let joining_date = f.required_date("joiningDate");
    let basic_salary = f.required_amount("basicSalary", AmountRule::Positive);
    let is_active = f.optional_bool("isActive").unwrap_or(true);
    f.finish()?;

    Ok(NewEmployee {
        employee_code,
        name,
        email: email.map(|e| e.to_lowercase()),
        position,
        joining_date,
        basic_salary,
        is_active,
    })
}

pub fn parse_employee_patch(body: &Value) -> AppResult<EmployeePatch> {
    let mut f = Fields::new(body)?;
    if !f.has_any(&PATCH_FIELDS) {
        f.reject("body", format!("provide at least one of: {}", PATCH_FIELDS.join(", ")));
    }

    let email = f.nullable_str("email");
    if let Some(inner) = &email {
        check_email(&mut f, inner);
    }

    let patch = EmployeePatch {
        employee_code: f.optional_str("employeeId"),
        name: f.optional_str("name"),
        email: email.map(|e| e.map(|e| e.to_lowercase())),
        position: f.nullable_str("position"),
        joining_date: f.optional_date("joiningDate"),
        basic_salary: f.optional_amount("basicSalary", AmountRule::Positive),
        is_active: f.optional_bool("isActive"),
    };
    f.finish()?;

    Ok(patch)
}

#[derive(Clone)]
pub struct EmployeeService {
    employees: Arc<dyn EmployeeStore>,
    salaries: Arc<dyn SalaryStore>,
}

impl EmployeeService {
    pub fn new(employees: Arc<dyn EmployeeStore>, salaries: Arc<dyn SalaryStore>) -> Self {
        Self {
            employees,
            salaries,
        }
    }

    pub async fn create(&self, input: NewEmployee) -> AppResult<Employee> {
        self.ensure_code_free(&input.employee_code, None).await?;

        let now = Utc::now().trunc_subsecs(3);
        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            employee_code: input.employee_code,
            name: input.name,
            email: input.email,
            position: input.position,
            joining_date: input.joining_date,
            basic_salary: input.basic_salary,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        self.employees
            .insert_employee(&employee)
            .await
            .map_err(code_conflict)?;

        info!(employee_id = %employee.id, code = %employee.employee_code, "Employee created");
        Ok(employee)
    }

    /// The employee with their most recent salary records, newest period first.
    pub async fn get(&self, id: &str) -> AppResult<EmployeeDetail> {
        let employee = self.find(id).await?;
        let filter = SalaryFilter {
            employee_id: Some(employee.id.clone()),
            ..Default::default()
        };
        let page = Pagination::new(Some(1), Some(MAX_LIMIT as i64));
        let (salary_records, _) = self.salaries.list_salaries(&filter, page).await?;

        Ok(EmployeeDetail {
            employee,
            salary_records,
        })
    }

    pub async fn list(
        &self,
        filter: &EmployeeFilter,
        page: Pagination,
    ) -> AppResult<(Vec<Employee>, PageMeta)> {
        let (employees, total) = self.employees.list_employees(filter, page).await?;
        Ok((employees, page.meta(total)))
    }

    pub async fn update(&self, id: &str, patch: EmployeePatch) -> AppResult<Employee> {
        let mut employee = self.find(id).await?;

        if let Some(code) = patch.employee_code {
            if code != employee.employee_code {
                self.ensure_code_free(&code, Some(id)).await?;
            }
            employee.employee_code = code;
        }
        if let Some(name) = patch.name {
            employee.name = name;
        }
        if let Some(email) = patch.email {
            employee.email = email;
        }
        if let Some(position) = patch.position {
            employee.position = position;
        }
        if let Some(joining_date) = patch.joining_date {
            employee.joining_date = joining_date;
        }
        if let Some(basic_salary) = patch.basic_salary {
            employee.basic_salary = basic_salary;
        }
        if let Some(is_active) = patch.is_active {
            employee.is_active = is_active;
        }
        employee.updated_at = Utc::now().trunc_subsecs(3);

        let updated = self
            .employees
            .update_employee(&employee)
            .await
            .map_err(code_conflict)?;
        if !updated {
            return Err(AppError::not_found("Employee not found"));
        }

        info!(employee_id = %employee.id, "Employee updated");
        Ok(employee)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        match self.employees.delete_employee(id).await {
            Ok(true) => {
                info!(employee_id = %id, "Employee deleted");
                Ok(())
            }
            Ok(false) => Err(AppError::not_found("Employee not found")),
            Err(StoreError::ForeignKeyViolation(_)) => {
                warn!(employee_id = %id, "Employee delete blocked by salary records");
                Err(AppError::conflict(
                    "Employee has salary records and cannot be deleted",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find(&self, id: &str) -> AppResult<Employee> {
        self.employees
            .employee(id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee not found"))
    }

    async fn ensure_code_free(&self, code: &str, exclude_id: Option<&str>) -> AppResult<()> {
        if self.employees.employee_by_code(code, exclude_id).await?.is_some() {
            return Err(AppError::conflict(DUPLICATE_CODE));
        }
        Ok(())
    }
}

fn code_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(_) => AppError::conflict(DUPLICATE_CODE),
        other => AppError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::salary::NewSalaryRecord;
    use crate::service::salary::SalaryService;
    use crate::store::memory::MemoryStore;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn service() -> (EmployeeService, SalaryService) {
        let store = Arc::new(MemoryStore::new());
        (
            EmployeeService::new(store.clone(), store.clone()),
            SalaryService::new(store.clone(), store),
        )
    }

    fn body(code: &str) -> Value {
        json!({
            "employeeId": code,
            "name": "John Doe",
            "email": "John.Doe@Company.com",
            "joiningDate": "2024-01-01",
            "basicSalary": 5000
        })
    }

    #[test]
    fn parse_defaults_to_active_and_lowercases_email() {
        let parsed = parse_new_employee(&body("EMP-001")).unwrap();
        assert!(parsed.is_active);
        assert_eq!(parsed.email.as_deref(), Some("john.doe@company.com"));
    }

    #[test]
    fn parse_rejects_bad_email_and_missing_date() {
        let err = parse_new_employee(&json!({
            "employeeId": "EMP-1", "name": "x", "email": "nope", "basicSalary": 1
        }))
        .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "joiningDate"]);
    }

    #[test]
    fn patch_can_clear_position() {
        let patch = parse_employee_patch(&json!({ "position": null })).unwrap();
        assert_eq!(patch.position, Some(None));
    }

    #[actix_web::test]
    async fn duplicate_code_conflicts() {
        let (employees, _) = service();
        employees
            .create(parse_new_employee(&body("EMP-001")).unwrap())
            .await
            .unwrap();

        let err = employees
            .create(parse_new_employee(&body("EMP-001")).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn delete_is_restricted_by_salary_records() {
        let (employees, salaries) = service();
        let employee = employees
            .create(parse_new_employee(&body("EMP-001")).unwrap())
            .await
            .unwrap();
        salaries
            .create(NewSalaryRecord {
                employee_id: employee.id.clone(),
                month: 1,
                year: 2025,
                basic_salary: Decimal::from(5000),
                bonus: Decimal::ZERO,
                deductions: Decimal::ZERO,
            })
            .await
            .unwrap();

        let err = employees.delete(&employee.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let detail = employees.get(&employee.id).await.unwrap();
        assert_eq!(detail.salary_records.len(), 1);
    }

    #[actix_web::test]
    async fn renaming_code_to_own_value_is_allowed() {
        let (employees, _) = service();
        let employee = employees
            .create(parse_new_employee(&body("EMP-001")).unwrap())
            .await
            .unwrap();

        let patch = EmployeePatch {
            employee_code: Some("EMP-001".into()),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = employees.update(&employee.id, patch).await.unwrap();
        assert!(!updated.is_active);
    }
}
