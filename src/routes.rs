use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::middleware::{Condition, from_fn};
use actix_web::{HttpResponse, get, web};
use serde_json::json;

use crate::{
    api::{self, assistant, employee, project, salary, task},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};

type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer limiter state. Built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    protected: Option<Limiter>,
    assistant: Option<Limiter>,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            protected: build_limiter(config.rate_protected_per_min),
            assistant: build_limiter(config.rate_assistant_per_min),
        }
    }
}

/// `None` when the limit is 0 (disabled).
fn build_limiter(requests_per_min: u32) -> Option<Limiter> {
    if requests_per_min == 0 {
        return None;
    }
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    Some(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default(),
    )
}

fn governor(limit: &Option<Limiter>) -> Condition<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    match limit {
        Some(cfg) => Condition::new(true, Governor::new(cfg)),
        None => Condition::new(false, Governor::new(&GovernorConfig::default())),
    }
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid JSON body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid path: {err}")).into()
    }));

    // Public routes
    cfg.service(health);

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(governor(&limits.protected))
            .service(api::me)
            .service(
                web::scope("/salaries")
                    // /salaries
                    .service(
                        web::resource("")
                            .route(web::get().to(salary::list_salaries))
                            .route(web::post().to(salary::create_salary)),
                    )
                    // /salaries/summary?year=
                    .service(web::resource("/summary").route(web::get().to(salary::salary_summary)))
                    // /salaries/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(salary::get_salary))
                            .route(web::patch().to(salary::update_salary))
                            .route(web::delete().to(salary::delete_salary)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::patch().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/projects")
                    .service(
                        web::resource("")
                            .route(web::get().to(project::list_projects))
                            .route(web::post().to(project::create_project)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(project::get_project))
                            .route(web::patch().to(project::update_project))
                            .route(web::delete().to(project::delete_project)),
                    )
                    // /projects/{id}/tasks
                    .service(
                        web::resource("/{id}/tasks")
                            .route(web::get().to(task::list_tasks))
                            .route(web::post().to(task::create_task)),
                    )
                    .service(
                        web::resource("/{id}/tasks/{task_id}")
                            .route(web::patch().to(task::update_task))
                            .route(web::delete().to(task::delete_task)),
                    ),
            )
            .service(
                web::resource("/assistant/chat")
                    .wrap(governor(&limits.assistant))
                    .route(web::post().to(assistant::chat)),
            ),
    );
}
