use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{EmployeeDirectory, PgEmployeeDirectory},
    services::{
        action_log::ActionLogService, hooks::TransitionHooks, status_catalog::StatusCatalog,
        transition_engine::TransitionEngine,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub catalog: Arc<StatusCatalog>,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub engine: TransitionEngine,
    pub action_logs: ActionLogService,
}

impl AppState {
    /// State backed by the database directory and the standard hooks.
    pub fn new(pool: DbPool, config: Config, catalog: StatusCatalog) -> Self {
        let directory = Arc::new(PgEmployeeDirectory::new(pool.clone()));
        Self::with_directory(pool, config, catalog, directory)
    }

    pub fn with_directory(
        pool: DbPool,
        config: Config,
        catalog: StatusCatalog,
        directory: Arc<dyn EmployeeDirectory>,
    ) -> Self {
        Self {
            engine: TransitionEngine::new(pool.clone(), TransitionHooks::standard()),
            action_logs: ActionLogService::new(pool.clone()),
            catalog: Arc::new(catalog),
            directory,
            pool,
            config,
        }
    }
}
