//! SQLite persistence.
//!
//! This is the data-access boundary: rows are decoded here (including the
//! legacy NULL status) and nothing above this module sees SQL types.

use sqlx::SqlitePool;

mod content;
mod engagement;
mod notification;
mod profile;

pub(crate) use content::CommentStub;
pub(crate) use engagement::{EdgeKind, LikerRow};

/// Handle to the backing database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Ids bound per `IN (...)` list. Callers with more ids run one query per
/// chunk and merge, keeping every statement far below SQLite's bind limit.
const ID_CHUNK: usize = 500;

/// Pushes `(?, ?, ...)` binding every id onto `query`. At most [`ID_CHUNK`]
/// ids per call.
fn push_id_list(query: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>, ids: &[uuid::Uuid]) {
    query.push("(");
    let mut list = query.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}
