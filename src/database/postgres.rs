use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    assign_id, Collection, DatabaseError, DeleteResult, Document, DocumentId, DocumentStore,
    InsertOneResult, UpdateResult, ID_FIELD,
};
use crate::config::DatabaseConfig;
use crate::filter::{Filter, Window};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id UUID NOT NULL,
        seq BIGSERIAL,
        body JSONB NOT NULL,
        PRIMARY KEY (collection, id)
    )"#,
    "CREATE INDEX IF NOT EXISTS documents_collection_seq_idx ON documents (collection, seq)",
];

/// Document store backed by a single Postgres JSONB table.
///
/// Every collection shares the `documents` table; `seq` gives the natural
/// order reads come back in.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the documents table in the connection's current schema
    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Document schema ready");
        Ok(())
    }
}

/// Bind value for a generated statement
#[derive(Debug, Clone, PartialEq)]
enum Param {
    Text(String),
    Uuid(Uuid),
    Json(Value),
}

/// WHERE clause plus its positional parameters, starting at `$1`
#[derive(Debug, Clone, PartialEq)]
struct SqlWhere {
    clause: String,
    params: Vec<Param>,
}

impl SqlWhere {
    fn new(collection: Collection, filter: &Filter) -> Self {
        let mut params = vec![Param::Text(collection.name().to_string())];
        let mut clause = String::from("collection = $1");

        for (field, value) in filter.clauses() {
            if field == ID_FIELD {
                // ids live in their own column; anything that is not an id matches nothing
                match value.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                    Some(id) => {
                        params.push(Param::Uuid(id));
                        clause.push_str(&format!(" AND id = ${}", params.len()));
                    }
                    None => clause.push_str(" AND FALSE"),
                }
                continue;
            }

            params.push(Param::Text(field.clone()));
            let key = params.len();
            if value.is_null() {
                clause.push_str(&format!(
                    " AND (body -> ${key}::text IS NULL OR body -> ${key}::text = 'null'::jsonb)"
                ));
            } else {
                params.push(Param::Json(value.clone()));
                clause.push_str(&format!(
                    " AND body -> ${key}::text = ${}::jsonb",
                    params.len()
                ));
            }
        }

        Self { clause, params }
    }

    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    p: &Param,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match p {
        Param::Text(s) => q.bind(s.clone()),
        Param::Uuid(u) => q.bind(*u),
        Param::Json(v) => q.bind(v.clone()),
    }
}

fn bind_all<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &[Param],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

fn row_to_document(row: PgRow) -> Result<Document, DatabaseError> {
    let body: Value = row.try_get("body")?;
    match body {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidArgument(format!(
            "stored body is not an object: {}",
            other
        ))),
    }
}

fn map_insert_error(err: sqlx::Error, collection: Collection, id: DocumentId) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::DuplicateKey(format!("{}.{}", collection, id))
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        window: Option<Window>,
    ) -> Result<Vec<Document>, DatabaseError> {
        let sql_where = SqlWhere::new(collection, filter);
        let mut sql = format!(
            "SELECT body FROM documents WHERE {} ORDER BY seq",
            sql_where.clause
        );

        let mut q_window: Option<(i64, Option<i64>)> = None;
        if let Some(window) = window {
            window.validate()?;
            let n = sql_where.next_placeholder();
            sql.push_str(&format!(" OFFSET ${} LIMIT ${}", n, n + 1));
            q_window = Some((window.skip, window.limit()));
        }

        debug!(%collection, sql = %sql, "find");

        let mut q = bind_all(sqlx::query(&sql), &sql_where.params);
        if let Some((skip, limit)) = q_window {
            q = q.bind(skip).bind(limit);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_document).collect()
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, DatabaseError> {
        let sql_where = SqlWhere::new(collection, filter);
        let sql = format!(
            "SELECT body FROM documents WHERE {} ORDER BY seq LIMIT 1",
            sql_where.clause
        );

        let row = bind_all(sqlx::query(&sql), &sql_where.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_document).transpose()
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql_where = SqlWhere::new(collection, filter);
        let sql = format!(
            "SELECT COUNT(*) AS count FROM documents WHERE {}",
            sql_where.clause
        );

        let row = bind_all(sqlx::query(&sql), &sql_where.params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<InsertOneResult, DatabaseError> {
        let id = assign_id(&mut document)?;

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(id.as_uuid())
            .bind(Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, collection, id))?;

        Ok(InsertOneResult::new(id))
    }

    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        set: Document,
    ) -> Result<UpdateResult, DatabaseError> {
        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), id.into());
        document.extend(set);

        // No row back means the document existed and the merge changed nothing
        let row = sqlx::query(
            r#"INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)
               ON CONFLICT (collection, id) DO UPDATE
                   SET body = documents.body || EXCLUDED.body
                   WHERE (documents.body || EXCLUDED.body) IS DISTINCT FROM documents.body
               RETURNING (xmax = 0) AS inserted"#,
        )
        .bind(collection.name())
        .bind(id.as_uuid())
        .bind(Value::Object(document))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let inserted: bool = row.try_get("inserted")?;
                if inserted {
                    Ok(UpdateResult::upserted(id))
                } else {
                    Ok(UpdateResult::matched(true))
                }
            }
            None => Ok(UpdateResult::matched(false)),
        }
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<DeleteResult, DatabaseError> {
        let sql_where = SqlWhere::new(collection, filter);
        let sql = format!(
            "DELETE FROM documents WHERE collection = $1 AND id = \
             (SELECT id FROM documents WHERE {} ORDER BY seq LIMIT 1)",
            sql_where.clause
        );

        let result = bind_all(sqlx::query(&sql), &sql_where.params)
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult::new(result.rows_affected()))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed document store pool");
    }
}
