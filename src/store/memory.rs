use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{EmployeeStore, ProjectStore, SalaryStore, StoreError, StoreResult, UserStore};
use crate::model::{
    employee::{Employee, EmployeeFilter, EmployeeSummary},
    project::Project,
    salary::{MonthlySummary, PeriodKey, SalaryFilter, SalaryRecord},
    task::Task,
};
use crate::utils::pagination::Pagination;

#[derive(Default)]
struct Tables {
    salaries: HashMap<String, SalaryRecord>,
    employees: HashMap<String, Employee>,
    projects: HashMap<String, Project>,
    tasks: HashMap<String, Task>,
    users: HashMap<String, Option<String>>,
}

/// Process-local store enforcing the same constraints as the MySQL schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

fn matches_salary(record: &SalaryRecord, filter: &SalaryFilter) -> bool {
    filter
        .employee_id
        .as_ref()
        .is_none_or(|e| &record.employee_id == e)
        && filter.month.is_none_or(|m| record.month == m)
        && filter.year.is_none_or(|y| record.year == y)
}

fn period_taken(tables: &Tables, key: &PeriodKey, exclude_id: Option<&str>) -> Option<SalaryRecord> {
    tables
        .salaries
        .values()
        .find(|r| Some(r.id.as_str()) != exclude_id && r.period() == *key)
        .cloned()
}

fn check_salary_constraints(tables: &Tables, record: &SalaryRecord) -> StoreResult<()> {
    if !tables.employees.contains_key(&record.employee_id) {
        return Err(StoreError::ForeignKeyViolation(format!(
            "salary_records.employee_id references missing employee {}",
            record.employee_id
        )));
    }
    if period_taken(tables, &record.period(), Some(&record.id)).is_some() {
        return Err(StoreError::UniqueViolation(
            "salary_records (employee_id, month, year)".into(),
        ));
    }
    Ok(())
}

fn check_employee_code(tables: &Tables, employee: &Employee) -> StoreResult<()> {
    let taken = tables
        .employees
        .values()
        .any(|e| e.id != employee.id && e.employee_code == employee.employee_code);
    if taken {
        return Err(StoreError::UniqueViolation("employees.employee_code".into()));
    }
    Ok(())
}

#[async_trait]
impl SalaryStore for MemoryStore {
    async fn insert_salary(&self, record: &SalaryRecord) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.salaries.contains_key(&record.id) {
            return Err(StoreError::UniqueViolation("salary_records.id".into()));
        }
        check_salary_constraints(&tables, record)?;
        tables.salaries.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn salary(&self, id: &str) -> StoreResult<Option<SalaryRecord>> {
        Ok(self.read()?.salaries.get(id).cloned())
    }

    async fn salary_for_period(
        &self,
        key: &PeriodKey,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<SalaryRecord>> {
        let tables = self.read()?;
        Ok(period_taken(&tables, key, exclude_id))
    }

    async fn list_salaries(
        &self,
        filter: &SalaryFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<SalaryRecord>, i64)> {
        let tables = self.read()?;
        let mut rows: Vec<&SalaryRecord> = tables
            .salaries
            .values()
            .filter(|r| matches_salary(r, filter))
            .collect();
        rows.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then(b.month.cmp(&a.month))
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });

        let total = rows.len() as i64;
        let data = page.slice(&rows).iter().map(|r| (*r).clone()).collect();
        Ok((data, total))
    }

    async fn count_salaries(&self, filter: &SalaryFilter) -> StoreResult<i64> {
        let tables = self.read()?;
        Ok(tables
            .salaries
            .values()
            .filter(|r| matches_salary(r, filter))
            .count() as i64)
    }

    async fn update_salary(&self, record: &SalaryRecord) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if !tables.salaries.contains_key(&record.id) {
            return Ok(false);
        }
        check_salary_constraints(&tables, record)?;
        tables.salaries.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn delete_salary(&self, id: &str) -> StoreResult<bool> {
        Ok(self.write()?.salaries.remove(id).is_some())
    }

    async fn monthly_summary(&self, year: i32) -> StoreResult<Vec<MonthlySummary>> {
        let tables = self.read()?;
        let mut months: BTreeMap<i32, (i64, Decimal)> = BTreeMap::new();
        for record in tables.salaries.values().filter(|r| r.year == year) {
            let entry = months.entry(record.month).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += record.net_salary;
        }

        Ok(months
            .into_iter()
            .map(|(month, (records, total_net))| MonthlySummary {
                month,
                records,
                total_net,
                average_net: (total_net / Decimal::from(records)).round_dp(2),
            })
            .collect())
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn insert_employee(&self, employee: &Employee) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.employees.contains_key(&employee.id) {
            return Err(StoreError::UniqueViolation("employees.id".into()));
        }
        check_employee_code(&tables, employee)?;
        tables.employees.insert(employee.id.clone(), employee.clone());
        Ok(())
    }

    async fn employee(&self, id: &str) -> StoreResult<Option<Employee>> {
        Ok(self.read()?.employees.get(id).cloned())
    }

    async fn employee_by_code(
        &self,
        code: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<Employee>> {
        Ok(self
            .read()?
            .employees
            .values()
            .find(|e| e.employee_code == code && Some(e.id.as_str()) != exclude_id)
            .cloned())
    }

    async fn employee_summaries(&self, ids: &[String]) -> StoreResult<Vec<EmployeeSummary>> {
        let tables = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.employees.get(id))
            .map(EmployeeSummary::from)
            .collect())
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Employee>, i64)> {
        let tables = self.read()?;
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut rows: Vec<&Employee> = tables
            .employees
            .values()
            .filter(|e| filter.is_active.is_none_or(|a| e.is_active == a))
            .filter(|e| {
                needle.as_ref().is_none_or(|n| {
                    e.name.to_lowercase().contains(n)
                        || e.employee_code.to_lowercase().contains(n)
                        || e.email
                            .as_ref()
                            .is_some_and(|m| m.to_lowercase().contains(n))
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = rows.len() as i64;
        let data = page.slice(&rows).iter().map(|e| (*e).clone()).collect();
        Ok((data, total))
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if !tables.employees.contains_key(&employee.id) {
            return Ok(false);
        }
        check_employee_code(&tables, employee)?;
        tables.employees.insert(employee.id.clone(), employee.clone());
        Ok(true)
    }

    async fn delete_employee(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if !tables.employees.contains_key(id) {
            return Ok(false);
        }
        if tables.salaries.values().any(|r| r.employee_id == id) {
            return Err(StoreError::ForeignKeyViolation(
                "salary_records.employee_id restricts employee delete".into(),
            ));
        }

        tables.employees.remove(id);
        for task in tables.tasks.values_mut() {
            if task.assignee_id.as_deref() == Some(id) {
                task.assignee_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.projects.contains_key(&project.id) {
            return Err(StoreError::UniqueViolation("projects.id".into()));
        }
        tables.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn project(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.read()?.projects.get(id).cloned())
    }

    async fn list_visible_projects(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Project>, i64)> {
        let tables = self.read()?;
        let mut rows: Vec<&Project> = tables
            .projects
            .values()
            .filter(|p| p.is_visible_to(user_id))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = rows.len() as i64;
        let data = page.slice(&rows).iter().map(|p| (*p).clone()).collect();
        Ok((data, total))
    }

    async fn update_project(&self, project: &Project) -> StoreResult<bool> {
        let mut tables = self.write()?;
        match tables.projects.get_mut(&project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if tables.projects.remove(id).is_none() {
            return Ok(false);
        }
        tables.tasks.retain(|_, t| t.project_id != id);
        Ok(true)
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.projects.contains_key(&task.project_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "tasks.project_id references missing project {}",
                task.project_id
            )));
        }
        if let Some(assignee) = &task.assignee_id {
            if !tables.employees.contains_key(assignee) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "tasks.assignee_id references missing employee {}",
                    assignee
                )));
            }
        }
        tables.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn task(&self, project_id: &str, task_id: &str) -> StoreResult<Option<Task>> {
        Ok(self
            .read()?
            .tasks
            .get(task_id)
            .filter(|t| t.project_id == project_id)
            .cloned())
    }

    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        let tables = self.read()?;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<bool> {
        let mut tables = self.write()?;
        if let Some(assignee) = &task.assignee_id {
            if !tables.employees.contains_key(assignee) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "tasks.assignee_id references missing employee {}",
                    assignee
                )));
            }
        }
        match tables.tasks.get_mut(&task.id) {
            Some(slot) if slot.project_id == task.project_id => {
                *slot = task.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_task(&self, project_id: &str, task_id: &str) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let owned = tables
            .tasks
            .get(task_id)
            .is_some_and(|t| t.project_id == project_id);
        if owned {
            tables.tasks.remove(task_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn touch_user(&self, user_id: &str, email: Option<&str>) -> StoreResult<()> {
        let mut tables = self.write()?;
        let slot = tables.users.entry(user_id.to_string()).or_default();
        if let Some(email) = email {
            *slot = Some(email.to_string());
        }
        Ok(())
    }

    async fn known_users(&self, ids: &[String]) -> StoreResult<Vec<String>> {
        let tables = self.read()?;
        let mut known: Vec<String> = Vec::new();
        for id in ids {
            if tables.users.contains_key(id) && !known.contains(id) {
                known.push(id.clone());
            }
        }
        Ok(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn employee(id: &str) -> Employee {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Employee {
            id: id.into(),
            employee_code: format!("CODE-{id}"),
            name: format!("Employee {id}"),
            email: None,
            position: None,
            joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            basic_salary: Decimal::from(1000),
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    fn record(id: &str, employee_id: &str, month: i32, year: i32) -> SalaryRecord {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        SalaryRecord {
            id: id.into(),
            employee_id: employee_id.into(),
            month,
            year,
            basic_salary: Decimal::from(1000),
            bonus: Decimal::from(0),
            deductions: Decimal::from(0),
            net_salary: Decimal::from(1000),
            created_at: at,
            updated_at: at,
        }
    }

    #[actix_web::test]
    async fn duplicate_period_is_a_unique_violation() {
        let store = MemoryStore::new();
        store.insert_employee(&employee("E1")).await.unwrap();
        store.insert_salary(&record("r1", "E1", 6, 2025)).await.unwrap();

        let err = store
            .insert_salary(&record("r2", "E1", 6, 2025))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation(_)));
        assert_eq!(store.count_salaries(&SalaryFilter::default()).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn salary_requires_existing_employee() {
        let store = MemoryStore::new();
        let err = store
            .insert_salary(&record("r1", "ghost", 1, 2025))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
    }

    #[actix_web::test]
    async fn list_orders_by_year_then_month_descending() {
        let store = MemoryStore::new();
        store.insert_employee(&employee("E1")).await.unwrap();
        store.insert_salary(&record("a", "E1", 12, 2024)).await.unwrap();
        store.insert_salary(&record("b", "E1", 1, 2025)).await.unwrap();
        store.insert_salary(&record("c", "E1", 3, 2025)).await.unwrap();

        let (rows, total) = store
            .list_salaries(&SalaryFilter::default(), Pagination::default())
            .await
            .unwrap();

        assert_eq!(total, 3);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[actix_web::test]
    async fn employee_with_salaries_cannot_be_deleted() {
        let store = MemoryStore::new();
        store.insert_employee(&employee("E1")).await.unwrap();
        store.insert_salary(&record("r1", "E1", 6, 2025)).await.unwrap();

        let err = store.delete_employee("E1").await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(_)));

        store.delete_salary("r1").await.unwrap();
        assert!(store.delete_employee("E1").await.unwrap());
    }

    #[actix_web::test]
    async fn monthly_summary_groups_by_month() {
        let store = MemoryStore::new();
        store.insert_employee(&employee("E1")).await.unwrap();
        store.insert_employee(&employee("E2")).await.unwrap();
        store.insert_salary(&record("a", "E1", 6, 2025)).await.unwrap();
        let mut b = record("b", "E2", 6, 2025);
        b.net_salary = Decimal::from(2000);
        store.insert_salary(&b).await.unwrap();
        store.insert_salary(&record("c", "E1", 7, 2025)).await.unwrap();
        store.insert_salary(&record("d", "E1", 7, 2024)).await.unwrap();

        let summary = store.monthly_summary(2025).await.unwrap();

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].month, 6);
        assert_eq!(summary[0].records, 2);
        assert_eq!(summary[0].total_net, Decimal::from(3000));
        assert_eq!(summary[0].average_net, Decimal::from(1500));
        assert_eq!(summary[1].records, 1);
    }
}
