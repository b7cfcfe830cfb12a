#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hr_admin::assistant::{AssistantService, DEFAULT_SYSTEM_PROMPT};
use hr_admin::auth::jwt::{Claims, generate_token};
use hr_admin::config::Config;
use hr_admin::state::AppState;
use hr_admin::store::memory::MemoryStore;

pub const SECRET: &str = "integration-secret";

/// Rate limits are disabled: test requests carry no peer address.
pub fn config() -> Config {
    Config::from_lookup(|key| {
        let value = match key {
            "SERVER_ADDR" => "127.0.0.1:0",
            "DATABASE_URL" => "mysql://unused",
            "JWT_SECRET" => SECRET,
            "RATE_PROTECTED_PER_MIN" => "0",
            "RATE_ASSISTANT_PER_MIN" => "0",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

pub fn state_with(store: MemoryStore, assistant: AssistantService) -> AppState {
    AppState::new(store, assistant)
}

pub fn state(store: MemoryStore) -> AppState {
    state_with(
        store,
        AssistantService::new(None, DEFAULT_SYSTEM_PROMPT, Duration::from_secs(60)),
    )
}

pub fn token(user_id: &str) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
        + 3600;
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{user_id}@company.com")),
        name: Some("Test User".into()),
        exp,
        iss: None,
    };
    generate_token(&claims, SECRET).unwrap()
}

pub fn bearer(user_id: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id)))
}

/// Builds the full app over the given state.
#[macro_export]
macro_rules! init_app {
    ($state:expr) => {{
        let config = common::config();
        let limits = hr_admin::routes::RateLimits::from_config(&config);
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(config.clone()))
                .app_data(actix_web::web::Data::new($state))
                .configure(|cfg| hr_admin::routes::configure(cfg, &config, &limits)),
        )
        .await
    }};
}

/// Sends a request and returns the status and JSON body (`Null` for 204).
#[macro_export]
macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: serde_json::Value = if status == actix_web::http::StatusCode::NO_CONTENT {
            serde_json::Value::Null
        } else {
            actix_web::test::read_body_json(resp).await
        };
        (status, body)
    }};
}

/// Creates an employee through the API and returns its id.
#[macro_export]
macro_rules! create_employee {
    ($app:expr, $code:expr) => {{
        let (status, body) = send!(
            $app,
            actix_web::test::TestRequest::post()
                .uri("/api/employees")
                .insert_header(common::bearer("hr-admin"))
                .set_json(serde_json::json!({
                    "employeeId": $code,
                    "name": format!("Employee {}", $code),
                    "joiningDate": "2023-01-01",
                    "basicSalary": 5000
                }))
        );
        assert_eq!(status, actix_web::http::StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }};
}
