#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use hr_admin::store::UserStore;
use hr_admin::store::memory::MemoryStore;
use serde_json::json;

use common::bearer;

async fn store_with_users() -> MemoryStore {
    let store = MemoryStore::new();
    for id in ["manager", "member", "outsider"] {
        store.touch_user(id, None).await.unwrap();
    }
    store
}

#[actix_web::test]
async fn visibility_and_manager_only_changes() {
    let app = init_app!(common::state(store_with_users().await));

    let (status, project) = send!(
        app,
        TestRequest::post()
            .uri("/api/projects")
            .insert_header(bearer("manager"))
            .set_json(json!({
                "name": "Payroll migration",
                "startDate": "2025-01-06",
                "teamMembers": ["member"]
            }))
    );
    assert_eq!(status, StatusCode::CREATED, "{project}");
    assert_eq!(project["managerId"], "manager");
    assert_eq!(project["status"], "active");
    let id = project["id"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri(&format!("/api/projects/{id}"))
            .insert_header(bearer("outsider"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send!(
        app,
        TestRequest::get()
            .uri("/api/projects")
            .insert_header(bearer("member"))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["pagination"]["total"], 1);

    let (status, _) = send!(
        app,
        TestRequest::patch()
            .uri(&format!("/api/projects/{id}"))
            .insert_header(bearer("member"))
            .set_json(json!({ "status": "on-hold" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send!(
        app,
        TestRequest::patch()
            .uri(&format!("/api/projects/{id}"))
            .insert_header(bearer("manager"))
            .set_json(json!({ "status": "on-hold" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "on-hold");
}

#[actix_web::test]
async fn tasks_live_and_die_with_their_project() {
    let app = init_app!(common::state(store_with_users().await));
    let assignee = create_employee!(app, "DEV-1");

    let (_, project) = send!(
        app,
        TestRequest::post()
            .uri("/api/projects")
            .insert_header(bearer("manager"))
            .set_json(json!({ "name": "Onboarding", "teamMembers": ["member"] }))
    );
    let id = project["id"].as_str().unwrap().to_string();

    let (status, task) = send!(
        app,
        TestRequest::post()
            .uri(&format!("/api/projects/{id}/tasks"))
            .insert_header(bearer("member"))
            .set_json(json!({ "title": "Prepare laptop", "priority": "high", "assigneeId": assignee }))
    );
    assert_eq!(status, StatusCode::CREATED, "{task}");
    assert_eq!(task["status"], "todo");
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, moved) = send!(
        app,
        TestRequest::patch()
            .uri(&format!("/api/projects/{id}/tasks/{task_id}"))
            .insert_header(bearer("member"))
            .set_json(json!({ "status": "in-progress" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "in-progress");

    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri(&format!("/api/projects/{id}/tasks"))
            .insert_header(bearer("outsider"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send!(
        app,
        TestRequest::delete()
            .uri(&format!("/api/projects/{id}"))
            .insert_header(bearer("manager"))
    );
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send!(
        app,
        TestRequest::get()
            .uri(&format!("/api/projects/{id}/tasks"))
            .insert_header(bearer("manager"))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn callers_are_recorded_as_known_users() {
    let store = MemoryStore::new();
    let app = init_app!(common::state(store.clone()));

    let (status, me) = send!(app, TestRequest::get().uri("/api/me").insert_header(bearer("newcomer")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["userId"], "newcomer");

    let known = store.known_users(&["newcomer".to_string()]).await.unwrap();
    assert_eq!(known, vec!["newcomer".to_string()]);
}
