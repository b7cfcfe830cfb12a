use async_trait::async_trait;
use sqlx::{MySql, QueryBuilder};
use tracing::debug;

use super::{MySqlStore, placeholders};
use crate::model::employee::{Employee, EmployeeFilter, EmployeeSummary};
use crate::store::{EmployeeStore, StoreResult};
use crate::utils::pagination::Pagination;

const COLUMNS: &str = "id, employee_code, name, email, position, joining_date, basic_salary, \
                       is_active, created_at, updated_at";

fn push_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &EmployeeFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = &filter.search {
        let like = format!("%{}%", search);
        qb.push(" AND (name LIKE ")
            .push_bind(like.clone())
            .push(" OR employee_code LIKE ")
            .push_bind(like.clone())
            .push(" OR email LIKE ")
            .push_bind(like)
            .push(")");
    }
}

#[async_trait]
impl EmployeeStore for MySqlStore {
    async fn insert_employee(&self, e: &Employee) -> StoreResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO employees
            (id, employee_code, name, email, position, joining_date, basic_salary, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&e.id)
        .bind(&e.employee_code)
        .bind(&e.name)
        .bind(&e.email)
        .bind(&e.position)
        .bind(e.joining_date)
        .bind(e.basic_salary)
        .bind(e.is_active)
        .bind(e.created_at)
        .bind(e.updated_at);

        self.run(query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn employee(&self, id: &str) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {COLUMNS} FROM employees WHERE id = ?");
        self.run(
            sqlx::query_as::<_, Employee>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn employee_by_code(
        &self,
        code: &str,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<Employee>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE employee_code = ? AND (? IS NULL OR id <> ?) LIMIT 1"
        );
        self.run(
            sqlx::query_as::<_, Employee>(&sql)
                .bind(code)
                .bind(exclude_id)
                .bind(exclude_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn employee_summaries(&self, ids: &[String]) -> StoreResult<Vec<EmployeeSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, name, employee_code FROM employees WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, EmployeeSummary>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        self.run(query.fetch_all(&self.pool)).await
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<Employee>, i64)> {
        let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM employees");
        push_filter(&mut count_qb, filter);

        let mut data_qb = QueryBuilder::<MySql>::new(format!("SELECT {COLUMNS} FROM employees"));
        push_filter(&mut data_qb, filter);
        data_qb
            .push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        debug!(sql = %data_qb.sql(), ?filter, page = page.page, limit = page.limit, "Listing employees");

        let count = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool);
        let rows = data_qb.build_query_as::<Employee>().fetch_all(&self.pool);

        let (total, rows) = self.run(async { futures::try_join!(count, rows) }).await?;
        Ok((rows, total))
    }

    async fn update_employee(&self, e: &Employee) -> StoreResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE employees
            SET employee_code = ?, name = ?, email = ?, position = ?, joining_date = ?,
                basic_salary = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&e.employee_code)
        .bind(&e.name)
        .bind(&e.email)
        .bind(&e.position)
        .bind(e.joining_date)
        .bind(e.basic_salary)
        .bind(e.is_active)
        .bind(e.updated_at)
        .bind(&e.id);

        let result = self.run(query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_employee(&self, id: &str) -> StoreResult<bool> {
        // salary_records restricts, tasks.assignee_id is set to NULL by the FK
        let result = self
            .run(
                sqlx::query("DELETE FROM employees WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
