use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{MySql, QueryBuilder};
use tracing::debug;

use super::MySqlStore;
use crate::model::salary::{MonthlySummary, PeriodKey, SalaryFilter, SalaryRecord};
use crate::store::{SalaryStore, StoreResult};
use crate::utils::pagination::Pagination;

const COLUMNS: &str = "id, employee_id, month, year, basic_salary, bonus, deductions, \
                       net_salary, created_at, updated_at";

fn push_filter<'a>(qb: &mut QueryBuilder<'a, MySql>, filter: &'a SalaryFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(employee_id) = &filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id.as_str());
    }
    if let Some(month) = filter.month {
        qb.push(" AND month = ").push_bind(month);
    }
    if let Some(year) = filter.year {
        qb.push(" AND year = ").push_bind(year);
    }
}

#[async_trait]
impl SalaryStore for MySqlStore {
    async fn insert_salary(&self, r: &SalaryRecord) -> StoreResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO salary_records
            (id, employee_id, month, year, basic_salary, bonus, deductions, net_salary, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&r.id)
        .bind(&r.employee_id)
        .bind(r.month)
        .bind(r.year)
        .bind(r.basic_salary)
        .bind(r.bonus)
        .bind(r.deductions)
        .bind(r.net_salary)
        .bind(r.created_at)
        .bind(r.updated_at);

        self.run(query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn salary(&self, id: &str) -> StoreResult<Option<SalaryRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM salary_records WHERE id = ?");
        self.run(
            sqlx::query_as::<_, SalaryRecord>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn salary_for_period(
        &self,
        key: &PeriodKey,
        exclude_id: Option<&str>,
    ) -> StoreResult<Option<SalaryRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM salary_records \
             WHERE employee_id = ? AND month = ? AND year = ? AND (? IS NULL OR id <> ?) \
             LIMIT 1"
        );
        self.run(
            sqlx::query_as::<_, SalaryRecord>(&sql)
                .bind(&key.employee_id)
                .bind(key.month)
                .bind(key.year)
                .bind(exclude_id)
                .bind(exclude_id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn list_salaries(
        &self,
        filter: &SalaryFilter,
        page: Pagination,
    ) -> StoreResult<(Vec<SalaryRecord>, i64)> {
        let mut count_qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM salary_records");
        push_filter(&mut count_qb, filter);

        let mut data_qb = QueryBuilder::<MySql>::new(format!("SELECT {COLUMNS} FROM salary_records"));
        push_filter(&mut data_qb, filter);
        data_qb
            .push(" ORDER BY year DESC, month DESC, created_at DESC, id ASC LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        debug!(sql = %data_qb.sql(), ?filter, page = page.page, limit = page.limit, "Listing salary records");

        let count = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool);
        let rows = data_qb
            .build_query_as::<SalaryRecord>()
            .fetch_all(&self.pool);

        let (total, rows) = self.run(async { futures::try_join!(count, rows) }).await?;
        Ok((rows, total))
    }

    async fn count_salaries(&self, filter: &SalaryFilter) -> StoreResult<i64> {
        let mut qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM salary_records");
        push_filter(&mut qb, filter);
        self.run(qb.build_query_scalar::<i64>().fetch_one(&self.pool))
            .await
    }

    async fn update_salary(&self, r: &SalaryRecord) -> StoreResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE salary_records
            SET employee_id = ?, month = ?, year = ?, basic_salary = ?, bonus = ?,
                deductions = ?, net_salary = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&r.employee_id)
        .bind(r.month)
        .bind(r.year)
        .bind(r.basic_salary)
        .bind(r.bonus)
        .bind(r.deductions)
        .bind(r.net_salary)
        .bind(r.updated_at)
        .bind(&r.id);

        let result = self.run(query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_salary(&self, id: &str) -> StoreResult<bool> {
        let result = self
            .run(
                sqlx::query("DELETE FROM salary_records WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn monthly_summary(&self, year: i32) -> StoreResult<Vec<MonthlySummary>> {
        let rows = self
            .run(
                sqlx::query_as::<_, (i32, i64, Decimal)>(
                    r#"
                    SELECT month, COUNT(*), SUM(net_salary)
                    FROM salary_records
                    WHERE year = ?
                    GROUP BY month
                    ORDER BY month
                    "#,
                )
                .bind(year)
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|(month, records, total_net)| MonthlySummary {
                month,
                records,
                total_net,
                average_net: (total_net / Decimal::from(records)).round_dp(2),
            })
            .collect())
    }
}
