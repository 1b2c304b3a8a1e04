use crate::db::{DbPool, OrmConn};

/// Shared per-request state: the sqlx pool backs migrations and the audit
/// trail, the SeaORM connection backs the catalog and order services.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}
