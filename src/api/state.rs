use std::sync::Arc;
use sqlx::{Pool, Sqlite};
use crate::auth::Authenticator;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub authenticator: Arc<Authenticator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>, config: Arc<Config>) -> Self {
        let authenticator = Arc::new(Authenticator::from_config(&config, db.clone()));
        Self {
            db,
            authenticator,
            config,
        }
    }
}
