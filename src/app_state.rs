use std::sync::Arc;

use sqlx::PgPool;

use crate::booking::clock::{Clock, SystemClock};
use crate::booking::store::ReservationStore;
use crate::config;
use crate::db::ReservationRepository;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub env: config::Config,
    pub store: Arc<dyn ReservationStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: PgPool, env: config::Config) -> Self {
        let store = Arc::new(ReservationRepository::new(db.clone()));
        Self {
            db,
            env,
            store,
            clock: Arc::new(SystemClock),
        }
    }
}
