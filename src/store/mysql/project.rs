use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, MySql, Transaction};

use super::{MySqlStore, placeholders};
use crate::model::{
    project::{Project, ProjectStatus},
    task::{Task, TaskPriority, TaskStatus},
};
use crate::store::{ProjectStore, StoreError, StoreResult};
use crate::utils::pagination::Pagination;

const PROJECT_COLUMNS: &str =
    "p.id, p.name, p.description, p.status, p.start_date, p.end_date, p.manager_id, \
     p.created_at, p.updated_at";

const TASK_COLUMNS: &str = "id, project_id, title, description, priority, status, assignee_id, \
                            created_at, updated_at";

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: String,
    status: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    manager_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_project(self, team_members: Vec<String>) -> StoreResult<Project> {
        let status = ProjectStatus::from_str(&self.status).map_err(|_| {
            StoreError::Backend(format!("unknown project status '{}'", self.status))
        })?;

        Ok(Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            manager_id: self.manager_id,
            team_members,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    project_id: String,
    title: String,
    description: Option<String>,
    priority: String,
    status: String,
    assignee_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> StoreResult<Self> {
        let priority = TaskPriority::from_str(&row.priority)
            .map_err(|_| StoreError::Backend(format!("unknown task priority '{}'", row.priority)))?;
        let status = TaskStatus::from_str(&row.status)
            .map_err(|_| StoreError::Backend(format!("unknown task status '{}'", row.status)))?;

        Ok(Task {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            priority,
            status,
            assignee_id: row.assignee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn insert_members(
    tx: &mut Transaction<'_, MySql>,
    project_id: &str,
    members: &[String],
) -> Result<(), sqlx::Error> {
    for user_id in members {
        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

impl MySqlStore {
    async fn members_of(&self, project_ids: &[String]) -> StoreResult<HashMap<String, Vec<String>>> {
        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        if project_ids.is_empty() {
            return Ok(members);
        }

        let sql = format!(
            "SELECT project_id, user_id FROM project_members WHERE project_id IN ({}) \
             ORDER BY project_id, user_id",
            placeholders(project_ids.len())
        );
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for id in project_ids {
            query = query.bind(id);
        }

        for (project_id, user_id) in self.run(query.fetch_all(&self.pool)).await? {
            members.entry(project_id).or_default().push(user_id);
        }
        Ok(members)
    }

    async fn hydrate(&self, rows: Vec<ProjectRow>) -> StoreResult<Vec<Project>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut members = self.members_of(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let team = members.remove(&row.id).unwrap_or_default();
                row.into_project(team)
            })
            .collect()
    }
}

#[async_trait]
impl ProjectStore for MySqlStore {
    async fn insert_project(&self, p: &Project) -> StoreResult<()> {
        self.run(async {
            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO projects
                (id, name, description, status, start_date, end_date, manager_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&p.id)
            .bind(&p.name)
            .bind(&p.description)
            .bind(p.status.as_ref())
            .bind(p.start_date)
            .bind(p.end_date)
            .bind(&p.manager_id)
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await?;

            insert_members(&mut tx, &p.id, &p.team_members).await?;
            tx.commit().await
        })
        .await
    }

    async fn project(&self, id: &str) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?");
        let row = self
            .run(
                sqlx::query_as::<_, ProjectRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_visible_projects(
        &self,
        user_id: &str,
        page: Pagination,
    ) -> StoreResult<(Vec<Project>, i64)> {
        const VISIBLE: &str = "WHERE p.manager_id = ? OR EXISTS (\
             SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = ?)";

        let count_sql = format!("SELECT COUNT(*) FROM projects p {VISIBLE}");
        let data_sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p {VISIBLE} \
             ORDER BY p.created_at DESC, p.id ASC LIMIT ? OFFSET ?"
        );

        let count = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_one(&self.pool);
        let rows = sqlx::query_as::<_, ProjectRow>(&data_sql)
            .bind(user_id)
            .bind(user_id)
            .bind(page.limit as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool);

        let (total, rows) = self.run(async { futures::try_join!(count, rows) }).await?;
        Ok((self.hydrate(rows).await?, total))
    }

    async fn update_project(&self, p: &Project) -> StoreResult<bool> {
        self.run(async {
            let mut tx = self.pool.begin().await?;
            let result = sqlx::query(
                r#"
                UPDATE projects
                SET name = ?, description = ?, status = ?, start_date = ?, end_date = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&p.name)
            .bind(&p.description)
            .bind(p.status.as_ref())
            .bind(p.start_date)
            .bind(p.end_date)
            .bind(p.updated_at)
            .bind(&p.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }

            sqlx::query("DELETE FROM project_members WHERE project_id = ?")
                .bind(&p.id)
                .execute(&mut *tx)
                .await?;
            insert_members(&mut tx, &p.id, &p.team_members).await?;
            tx.commit().await?;
            Ok::<bool, sqlx::Error>(true)
        })
        .await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        // tasks and project_members cascade
        let result = self
            .run(
                sqlx::query("DELETE FROM projects WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, t: &Task) -> StoreResult<()> {
        let query = sqlx::query(
            r#"
            INSERT INTO tasks
            (id, project_id, title, description, priority, status, assignee_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&t.id)
        .bind(&t.project_id)
        .bind(&t.title)
        .bind(&t.description)
        .bind(t.priority.as_ref())
        .bind(t.status.as_ref())
        .bind(&t.assignee_id)
        .bind(t.created_at)
        .bind(t.updated_at);

        self.run(query.execute(&self.pool)).await?;
        Ok(())
    }

    async fn task(&self, project_id: &str, task_id: &str) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND project_id = ?");
        let row = self
            .run(
                sqlx::query_as::<_, TaskRow>(&sql)
                    .bind(task_id)
                    .bind(project_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.map(Task::try_from).transpose()
    }

    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ? ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .run(
                sqlx::query_as::<_, TaskRow>(&sql)
                    .bind(project_id)
                    .fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn update_task(&self, t: &Task) -> StoreResult<bool> {
        let query = sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, priority = ?, status = ?, assignee_id = ?, updated_at = ?
            WHERE id = ? AND project_id = ?
            "#,
        )
        .bind(&t.title)
        .bind(&t.description)
        .bind(t.priority.as_ref())
        .bind(t.status.as_ref())
        .bind(&t.assignee_id)
        .bind(t.updated_at)
        .bind(&t.id)
        .bind(&t.project_id);

        let result = self.run(query.execute(&self.pool)).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&self, project_id: &str, task_id: &str) -> StoreResult<bool> {
        let result = self
            .run(
                sqlx::query("DELETE FROM tasks WHERE id = ? AND project_id = ?")
                    .bind(task_id)
                    .bind(project_id)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
