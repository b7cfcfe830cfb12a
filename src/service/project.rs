use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::validation::Fields;
use crate::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::model::project::{NewProject, Project, ProjectPatch, ProjectStatus};
use crate::model::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::store::{EmployeeStore, ProjectStore, UserStore};
use crate::utils::pagination::{PageMeta, Pagination};

const PROJECT_STATUSES: &str = "active, completed, on-hold";
const TASK_PRIORITIES: &str = "low, medium, high, urgent";
const TASK_STATUSES: &str = "todo, in-progress, in-review, done";

const PROJECT_FIELDS: [&str; 6] = [
    "name",
    "description",
    "status",
    "startDate",
    "endDate",
    "teamMembers",
];

const TASK_FIELDS: [&str; 5] = ["title", "description", "priority", "status", "assigneeId"];

fn check_dates(f: &mut Fields<'_>, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
    if let Some(end) = end {
        if end < start {
            f.reject("endDate", "must not be before startDate");
        }
    }
}

pub fn parse_new_project(body: &Value) -> AppResult<NewProject> {
    let mut f = Fields::new(body)?;

    let name = f.required_str("name");
    let description = f.nullable_str("description").flatten().unwrap_or_default();
    let status = f
        .optional_enum::<ProjectStatus>("status", PROJECT_STATUSES)
        .unwrap_or_default();
    let start_date = if f.is_present("startDate") {
        f.required_datetime("startDate")
    } else {
        Utc::now().trunc_subsecs(3)
    };
    let end_date = f.nullable_datetime("endDate").flatten();
    check_dates(&mut f, start_date, end_date);
    let manager_id = f.optional_str("managerId");
    let team_members = f.optional_str_list("teamMembers").unwrap_or_default();
    f.finish()?;

    Ok(NewProject {
        name,
        description,
        status,
        start_date,
        end_date,
        manager_id,
        team_members,
    })
}

pub fn parse_project_patch(body: &Value) -> AppResult<ProjectPatch> {
    let mut f = Fields::new(body)?;
    if !f.has_any(&PROJECT_FIELDS) {
        f.reject("body", format!("provide at least one of: {}", PROJECT_FIELDS.join(", ")));
    }

    let patch = ProjectPatch {
        name: f.optional_str("name"),
        description: f.nullable_str("description").map(Option::unwrap_or_default),
        status: f.optional_enum("status", PROJECT_STATUSES),
        start_date: f.optional_datetime("startDate"),
        end_date: f.nullable_datetime("endDate"),
        team_members: f.optional_str_list("teamMembers"),
    };
    f.finish()?;

    Ok(patch)
}

pub fn parse_new_task(body: &Value) -> AppResult<NewTask> {
    let mut f = Fields::new(body)?;

    let task = NewTask {
        title: f.required_str("title"),
        description: f.nullable_str("description").flatten(),
        priority: f
            .optional_enum::<TaskPriority>("priority", TASK_PRIORITIES)
            .unwrap_or_default(),
        status: f
            .optional_enum::<TaskStatus>("status", TASK_STATUSES)
            .unwrap_or_default(),
        assignee_id: f.nullable_str("assigneeId").flatten(),
    };
    f.finish()?;

    Ok(task)
}

pub fn parse_task_patch(body: &Value) -> AppResult<TaskPatch> {
    let mut f = Fields::new(body)?;
    if !f.has_any(&TASK_FIELDS) {
        f.reject("body", format!("provide at least one of: {}", TASK_FIELDS.join(", ")));
    }

    let patch = TaskPatch {
        title: f.optional_str("title"),
        description: f.nullable_str("description"),
        priority: f.optional_enum("priority", TASK_PRIORITIES),
        status: f.optional_enum("status", TASK_STATUSES),
        assignee_id: f.nullable_str("assigneeId"),
    };
    f.finish()?;

    Ok(patch)
}

/// Projects and their tasks. Every call is scoped to the requesting principal:
/// projects they neither manage nor belong to are reported as missing.
#[derive(Clone)]
pub struct ProjectService {
    projects: Arc<dyn ProjectStore>,
    users: Arc<dyn UserStore>,
    employees: Arc<dyn EmployeeStore>,
}

impl ProjectService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        users: Arc<dyn UserStore>,
        employees: Arc<dyn EmployeeStore>,
    ) -> Self {
        Self {
            projects,
            users,
            employees,
        }
    }

    pub async fn create(&self, principal: &Principal, input: NewProject) -> AppResult<Project> {
        let manager_id = input
            .manager_id
            .unwrap_or_else(|| principal.user_id.clone());

        let mut referenced = input.team_members.clone();
        referenced.push(manager_id.clone());
        self.ensure_known_users(principal, &referenced).await?;

        let now = Utc::now().trunc_subsecs(3);
        let project = Project {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            status: input.status,
            start_date: input.start_date,
            end_date: input.end_date,
            manager_id,
            team_members: input.team_members,
            created_at: now,
            updated_at: now,
        };

        self.projects.insert_project(&project).await?;
        info!(
            project_id = %project.id,
            manager_id = %project.manager_id,
            members = project.team_members.len(),
            "Project created"
        );
        Ok(project)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        page: Pagination,
    ) -> AppResult<(Vec<Project>, PageMeta)> {
        let (projects, total) = self
            .projects
            .list_visible_projects(&principal.user_id, page)
            .await?;
        Ok((projects, page.meta(total)))
    }

    pub async fn get(&self, principal: &Principal, id: &str) -> AppResult<Project> {
        match self.projects.project(id).await? {
            Some(project) if project.is_visible_to(&principal.user_id) => Ok(project),
            Some(_) => {
                debug!(project_id = %id, user_id = %principal.user_id, "Project hidden from user");
                Err(AppError::not_found("Project not found"))
            }
            None => Err(AppError::not_found("Project not found")),
        }
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: ProjectPatch,
    ) -> AppResult<Project> {
        let mut project = self.managed(principal, id).await?;

        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(start_date) = patch.start_date {
            project.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            project.end_date = end_date;
        }
        if let Some(end) = project.end_date {
            if end < project.start_date {
                return Err(AppError::Validation(vec![crate::error::FieldError::new(
                    "endDate",
                    "must not be before startDate",
                )]));
            }
        }
        if let Some(members) = patch.team_members {
            self.ensure_known_users(principal, &members).await?;
            project.team_members = members;
        }
        project.updated_at = Utc::now().trunc_subsecs(3);

        if !self.projects.update_project(&project).await? {
            return Err(AppError::not_found("Project not found"));
        }
        info!(project_id = %project.id, "Project updated");
        Ok(project)
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<()> {
        self.managed(principal, id).await?;
        if !self.projects.delete_project(id).await? {
            return Err(AppError::not_found("Project not found"));
        }
        info!(project_id = %id, "Project deleted");
        Ok(())
    }

    pub async fn create_task(
        &self,
        principal: &Principal,
        project_id: &str,
        input: NewTask,
    ) -> AppResult<Task> {
        self.get(principal, project_id).await?;
        if let Some(assignee) = &input.assignee_id {
            self.ensure_employee(assignee).await?;
        }

        let now = Utc::now().trunc_subsecs(3);
        let task = Task {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: input.status,
            assignee_id: input.assignee_id,
            created_at: now,
            updated_at: now,
        };

        self.projects.insert_task(&task).await?;
        info!(task_id = %task.id, project_id = %project_id, "Task created");
        Ok(task)
    }

    pub async fn list_tasks(&self, principal: &Principal, project_id: &str) -> AppResult<Vec<Task>> {
        self.get(principal, project_id).await?;
        Ok(self.projects.list_tasks(project_id).await?)
    }

    pub async fn update_task(
        &self,
        principal: &Principal,
        project_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> AppResult<Task> {
        self.get(principal, project_id).await?;
        let mut task = self
            .projects
            .task(project_id, task_id)
            .await?
            .ok_or_else(|| AppError::not_found("Task not found"))?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(assignee) = patch.assignee_id {
            if let Some(id) = &assignee {
                self.ensure_employee(id).await?;
            }
            task.assignee_id = assignee;
        }
        task.updated_at = Utc::now().trunc_subsecs(3);

        if !self.projects.update_task(&task).await? {
            return Err(AppError::not_found("Task not found"));
        }
        info!(task_id = %task.id, status = %task.status, "Task updated");
        Ok(task)
    }

    pub async fn delete_task(
        &self,
        principal: &Principal,
        project_id: &str,
        task_id: &str,
    ) -> AppResult<()> {
        self.get(principal, project_id).await?;
        if !self.projects.delete_task(project_id, task_id).await? {
            return Err(AppError::not_found("Task not found"));
        }
        info!(task_id = %task_id, project_id = %project_id, "Task deleted");
        Ok(())
    }

    /// Visible and managed by the principal.
    async fn managed(&self, principal: &Principal, id: &str) -> AppResult<Project> {
        let project = self.get(principal, id).await?;
        if project.manager_id != principal.user_id {
            return Err(AppError::forbidden(
                "Only the project manager can modify this project",
            ));
        }
        Ok(project)
    }

    /// The caller always counts as known, even if the directory missed them.
    async fn ensure_known_users(&self, principal: &Principal, ids: &[String]) -> AppResult<()> {
        if ids.contains(&principal.user_id) {
            self.users
                .touch_user(&principal.user_id, principal.email.as_deref())
                .await?;
        }
        let known = self.users.known_users(ids).await?;
        let unknown: Vec<&str> = ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Unknown users: {}",
                unknown.join(", ")
            )))
        }
    }

    async fn ensure_employee(&self, id: &str) -> AppResult<()> {
        match self.employees.employee(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::BadRequest(format!("Unknown assignee: {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn principal(id: &str) -> Principal {
        Principal {
            user_id: id.into(),
            email: Some(format!("{id}@company.com")),
            name: None,
        }
    }

    async fn setup() -> ProjectService {
        let store = Arc::new(MemoryStore::new());
        for id in ["manager", "member", "outsider"] {
            store.touch_user(id, None).await.unwrap();
        }
        ProjectService::new(store.clone(), store.clone(), store)
    }

    async fn project(service: &ProjectService) -> Project {
        let input = parse_new_project(&json!({
            "name": "Payroll migration",
            "teamMembers": ["member"]
        }))
        .unwrap();
        service.create(&principal("manager"), input).await.unwrap()
    }

    #[actix_web::test]
    async fn unrecorded_caller_can_create_own_project() {
        let store = Arc::new(MemoryStore::new());
        let service = ProjectService::new(store.clone(), store.clone(), store);
        let input = parse_new_project(&json!({ "name": "Onboarding" })).unwrap();

        let project = service.create(&principal("newcomer"), input).await.unwrap();
        assert_eq!(project.manager_id, "newcomer");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = parse_new_project(&json!({
            "name": "x", "startDate": "2025-02-01", "endDate": "2025-01-01"
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn patch_cannot_clear_start_date() {
        let err = parse_project_patch(&json!({ "startDate": null })).unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "startDate");
    }

    #[test]
    fn unknown_status_lists_allowed_values() {
        let AppError::Validation(errors) =
            parse_new_project(&json!({ "name": "x", "status": "paused" })).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].message, format!("must be one of: {PROJECT_STATUSES}"));
    }

    #[test]
    fn task_defaults() {
        let task = parse_new_task(&json!({ "title": "Draft plan" })).unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[actix_web::test]
    async fn manager_defaults_to_principal() {
        let service = setup().await;
        let created = project(&service).await;
        assert_eq!(created.manager_id, "manager");
        assert_eq!(created.status, ProjectStatus::Active);
    }

    #[actix_web::test]
    async fn outsiders_cannot_see_projects() {
        let service = setup().await;
        let created = project(&service).await;

        assert!(service.get(&principal("member"), &created.id).await.is_ok());
        assert!(matches!(
            service.get(&principal("outsider"), &created.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[actix_web::test]
    async fn members_cannot_update_or_delete() {
        let service = setup().await;
        let created = project(&service).await;

        let patch = ProjectPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        assert!(matches!(
            service
                .update(&principal("member"), &created.id, patch)
                .await
                .unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            service.delete(&principal("member"), &created.id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[actix_web::test]
    async fn unknown_team_members_are_rejected() {
        let service = setup().await;
        let input = parse_new_project(&json!({ "name": "x", "teamMembers": ["ghost"] })).unwrap();
        assert!(matches!(
            service.create(&principal("manager"), input).await.unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[actix_web::test]
    async fn members_manage_tasks() {
        let service = setup().await;
        let created = project(&service).await;
        let member = principal("member");

        let task = service
            .create_task(&member, &created.id, parse_new_task(&json!({ "title": "Draft" })).unwrap())
            .await
            .unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let updated = service
            .update_task(&member, &created.id, &task.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);

        service.delete_task(&member, &created.id, &task.id).await.unwrap();
        assert!(service.list_tasks(&member, &created.id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_assignee_is_rejected() {
        let service = setup().await;
        let created = project(&service).await;
        let input = parse_new_task(&json!({ "title": "x", "assigneeId": "nobody" })).unwrap();

        assert!(matches!(
            service
                .create_task(&principal("manager"), &created.id, input)
                .await
                .unwrap_err(),
            AppError::BadRequest(_)
        ));
    }
}
