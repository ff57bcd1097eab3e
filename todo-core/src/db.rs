use std::path::PathBuf;

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewTodo, Todo, TodoPatch};
use crate::query::{FieldFilter, TodoQuery, like_pattern};

const TODO_COLUMNS: &str =
    "id, title, description, status, priority, due_date, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database under the platform state
    /// directory.
    pub async fn connect() -> StoreResult<Self> {
        Self::connect_url(&Self::default_url()?).await
    }

    pub fn default_url() -> StoreResult<String> {
        let config_dir = dirs::state_dir()
            .or_else(dirs::config_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
            .ok_or(StoreError::NoStateDir)?;

        let db_path: PathBuf = config_dir.join("todo").join("data");
        std::fs::create_dir_all(&db_path)?;

        let db_file = db_path.join("todo.db");
        Ok(format!("sqlite:{}?mode=rwc", db_file.display()))
    }

    pub async fn connect_url(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::migrate(pool).await
    }

    /// A private database that lives as long as the returned handle. The
    /// pool is pinned to one connection since every SQLite memory
    /// connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Database { pool })
    }

    pub async fn list_todos(&self, query: &TodoQuery) -> StoreResult<Vec<Todo>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(TODO_COLUMNS).push(" FROM todos WHERE 1 = 1");

        push_membership(&mut builder, "status", &query.status);
        push_membership(&mut builder, "priority", &query.priority);

        if let Some(search) = &query.search {
            let pattern = like_pattern(&fold(search));
            builder
                .push(" AND (title_folded LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description_folded LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        builder
            .push(" ORDER BY ")
            .push(query.sort.field.column())
            .push(" ")
            .push(query.sort.direction.sql())
            .push(", id ASC");

        let rows = builder
            .build_query_as::<Todo>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(count = rows.len(), sort = %query.sort, "listed todos");
        Ok(rows)
    }

    pub async fn get_todo(&self, id: i64) -> StoreResult<Todo> {
        let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?");
        sqlx::query_as::<_, Todo>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn create_todo(&self, todo: &NewTodo) -> StoreResult<Todo> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO todos (title, description, status, priority, due_date, created_at, updated_at,
                                title_folded, description_folded)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {TODO_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Todo>(&sql)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.status)
            .bind(todo.priority)
            .bind(todo.due_date)
            .bind(now)
            .bind(now)
            .bind(fold(&todo.title))
            .bind(todo.description.as_deref().map(fold))
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(id = created.id, "created todo");
        Ok(created)
    }

    /// Applies the supplied fields and refreshes `updated_at` in one
    /// statement. An empty patch only touches `updated_at`.
    pub async fn update_todo(&self, id: i64, patch: &TodoPatch) -> StoreResult<Todo> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE todos SET updated_at = ");
        builder.push_bind(Utc::now());

        if let Some(title) = &patch.title {
            builder.push(", title = ").push_bind(title.clone());
            builder.push(", title_folded = ").push_bind(fold(title));
        }
        if let Some(description) = &patch.description {
            builder.push(", description = ").push_bind(description.clone());
            builder
                .push(", description_folded = ")
                .push_bind(description.as_deref().map(fold));
        }
        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status);
        }
        if let Some(priority) = patch.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(due_date) = patch.due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(TODO_COLUMNS);

        let updated = builder
            .build_query_as::<Todo>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        tracing::debug!(id, "updated todo");
        Ok(updated)
    }

    pub async fn delete_todo(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::debug!(id, "deleted todo");
        Ok(())
    }
}

/// Case folding used for search, applied to stored text and search terms alike.
fn fold(text: &str) -> String {
    text.to_lowercase()
}

fn push_membership<'args, T>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    column: &str,
    filter: &FieldFilter<T>,
) where
    T: Copy + Send + sqlx::Encode<'args, Sqlite> + sqlx::Type<Sqlite> + 'args,
{
    match filter {
        FieldFilter::Any => {}
        FieldFilter::OneOf(values) if values.is_empty() => {
            builder.push(" AND 0");
        }
        FieldFilter::OneOf(values) => {
            builder.push(" AND ").push(column).push(" IN (");
            let mut separated = builder.separated(", ");
            for value in values {
                separated.push_bind(*value);
            }
            separated.push_unseparated(")");
        }
    }
}
