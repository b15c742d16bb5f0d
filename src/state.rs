use sqlx::PgPool;

/// Shared per-request context. The pool is injected here instead of living
/// behind a process-global handle so handlers stay testable and the
/// persistence dependency is explicit.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
