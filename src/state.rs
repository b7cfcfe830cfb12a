use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::assistant::{AssistantService, TextGenerator, gemini::GeminiClient};
use crate::config::Config;
use crate::service::{
    directory::UserDirectory, employee::EmployeeService, project::ProjectService,
    salary::SalaryService,
};
use crate::store::{EmployeeStore, ProjectStore, SalaryStore, UserStore};

/// Services shared by every worker, wrapped in `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub salaries: SalaryService,
    pub employees: EmployeeService,
    pub projects: ProjectService,
    pub directory: UserDirectory,
    pub assistant: AssistantService,
}

impl AppState {
    /// Wires every service onto one backend implementing all store traits.
    pub fn new<S>(store: S, assistant: AssistantService) -> Self
    where
        S: SalaryStore + EmployeeStore + ProjectStore + UserStore + 'static,
    {
        let store = Arc::new(store);
        let salaries: Arc<dyn SalaryStore> = store.clone();
        let employees: Arc<dyn EmployeeStore> = store.clone();
        let projects: Arc<dyn ProjectStore> = store.clone();
        let users: Arc<dyn UserStore> = store;

        Self {
            salaries: SalaryService::new(salaries.clone(), employees.clone()),
            employees: EmployeeService::new(employees.clone(), salaries),
            projects: ProjectService::new(projects, users.clone(), employees),
            directory: UserDirectory::new(users),
            assistant,
        }
    }
}

/// Builds the assistant from config; without an API key it answers 503.
pub fn assistant_from_config(config: &Config) -> Result<AssistantService> {
    let generator: Option<Arc<dyn TextGenerator>> = match &config.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(
                key.clone(),
                config.gemini_model.clone(),
                config.gemini_base_url.clone(),
                config.assistant_timeout,
            )?;
            info!(model = %config.gemini_model, "Assistant enabled");
            Some(Arc::new(client))
        }
        None => {
            warn!("GEMINI_API_KEY not set, assistant disabled");
            None
        }
    };

    Ok(AssistantService::new(
        generator,
        config.assistant_system_prompt.as_str(),
        config.assistant_cache_ttl,
    ))
}
