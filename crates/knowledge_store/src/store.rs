use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query;
use sea_orm::sea_query::{
    Alias, CaseStatement, Expr, MysqlQueryBuilder, OnConflict, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SimpleExpr, SqliteQueryBuilder, Value as SeaValue,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::db::*;
use crate::migration::Migrator;
use crate::KnowledgeConfig;
use knowledge_core::{
    CompareOp, Entity, EntitySummary, EntityStoreApi, Fact, FactFilter, FactTypes, Id,
    KnowledgeError, KnowledgeResult, SaveReport, TypeMap, Value, ValueColumn, ValueColumns,
};

const FACT_COUNT: &str = "fact_count";

#[derive(Clone)]
pub struct KnowledgeStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
}

impl KnowledgeStore {
    pub async fn connect(config: &KnowledgeConfig, base_dir: &Path) -> KnowledgeResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        options.sqlx_logging(false);
        let conn = Database::connect(options)
            .await
            .map_err(KnowledgeError::from)?;
        let backend = conn.get_database_backend();
        log::debug!("running knowledge migrations");
        Migrator::up(&conn, None)
            .await
            .map_err(KnowledgeError::from)?;
        log::info!("knowledge store connected ({})", config.backend_name());
        Ok(Self { conn, backend })
    }

    /// Opens a sqlite file at `path`. Relative paths resolve against the
    /// working directory.
    pub async fn connect_sqlite(path: &Path) -> KnowledgeResult<Self> {
        let config = KnowledgeConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, Path::new(".")).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    async fn fetch_entity<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: Id,
    ) -> KnowledgeResult<Option<Entity>> {
        let select = Query::select()
            .from(KnowledgeEntities::Table)
            .columns([KnowledgeEntities::EntityId, KnowledgeEntities::Name])
            .and_where(Expr::col(KnowledgeEntities::EntityId).eq(id_value(entity_id)))
            .limit(1)
            .to_owned();
        let Some(row) = query_one(conn, &select).await? else {
            return Ok(None);
        };
        let name: String = row.try_get("", &col_name(KnowledgeEntities::Name))?;
        let facts = self.fetch_facts(conn, entity_id).await?;
        log::debug!("loaded entity {entity_id} with {} facts", facts.len());
        Entity::from_parts(entity_id, name, facts).map(Some)
    }

    async fn fetch_facts<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: Id,
    ) -> KnowledgeResult<Vec<Fact>> {
        let select = Query::select()
            .from(KnowledgeFacts::Table)
            .columns([
                KnowledgeFacts::FactId,
                KnowledgeFacts::Key,
                KnowledgeFacts::Type,
                KnowledgeFacts::IntValue,
                KnowledgeFacts::CharValue,
                KnowledgeFacts::FloatValue,
                KnowledgeFacts::BoolValue,
            ])
            .and_where(Expr::col(KnowledgeFacts::EntityId).eq(id_value(entity_id)))
            .order_by(KnowledgeFacts::Key, Order::Asc)
            .to_owned();
        query_all(conn, &select)
            .await?
            .iter()
            .map(read_fact)
            .collect()
    }

    async fn fetch_fact_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: Id,
    ) -> KnowledgeResult<HashSet<Id>> {
        let select = Query::select()
            .from(KnowledgeFacts::Table)
            .column(KnowledgeFacts::FactId)
            .and_where(Expr::col(KnowledgeFacts::EntityId).eq(id_value(entity_id)))
            .to_owned();
        query_all(conn, &select)
            .await?
            .iter()
            .map(|row| read_id(row, KnowledgeFacts::FactId))
            .collect()
    }
}

#[async_trait]
impl EntityStoreApi for KnowledgeStore {
    async fn save_entity(&self, entity: &Entity) -> KnowledgeResult<SaveReport> {
        let tx = self.conn.begin().await?;
        let upsert_entity = Query::insert()
            .into_table(KnowledgeEntities::Table)
            .columns([KnowledgeEntities::EntityId, KnowledgeEntities::Name])
            .values_panic([id_value(entity.id).into(), entity.name.clone().into()])
            .on_conflict(
                OnConflict::column(KnowledgeEntities::EntityId)
                    .update_column(KnowledgeEntities::Name)
                    .to_owned(),
            )
            .to_owned();
        exec(&tx, &upsert_entity).await?;

        let stored = self.fetch_fact_ids(&tx, entity.id).await?;
        let live: HashSet<Id> = entity.facts.rows().map(Fact::id).collect();
        let mut report = SaveReport::default();

        // Stale rows go first so a key that was deleted and re-added does not
        // collide with the unique (entity_id, key) index.
        for fact_id in stored.difference(&live) {
            let delete = Query::delete()
                .from_table(KnowledgeFacts::Table)
                .and_where(Expr::col(KnowledgeFacts::FactId).eq(id_value(*fact_id)))
                .to_owned();
            report.deleted += exec(&tx, &delete).await?;
        }

        for fact in entity.facts.rows() {
            let columns = fact.columns();
            if stored.contains(&fact.id()) {
                let update = Query::update()
                    .table(KnowledgeFacts::Table)
                    .values([
                        (KnowledgeFacts::Key, fact.key().to_string().into()),
                        (KnowledgeFacts::Type, discriminator_value(fact).into()),
                        (KnowledgeFacts::IntValue, columns.int_value.into()),
                        (KnowledgeFacts::CharValue, columns.char_value.clone().into()),
                        (KnowledgeFacts::FloatValue, columns.float_value.into()),
                        (KnowledgeFacts::BoolValue, columns.bool_value.into()),
                    ])
                    .and_where(Expr::col(KnowledgeFacts::FactId).eq(id_value(fact.id())))
                    .to_owned();
                exec(&tx, &update).await?;
                report.updated += 1;
            } else {
                let insert = Query::insert()
                    .into_table(KnowledgeFacts::Table)
                    .columns([
                        KnowledgeFacts::FactId,
                        KnowledgeFacts::EntityId,
                        KnowledgeFacts::Key,
                        KnowledgeFacts::Type,
                        KnowledgeFacts::IntValue,
                        KnowledgeFacts::CharValue,
                        KnowledgeFacts::FloatValue,
                        KnowledgeFacts::BoolValue,
                    ])
                    .values_panic([
                        id_value(fact.id()).into(),
                        id_value(entity.id).into(),
                        fact.key().to_string().into(),
                        discriminator_value(fact).into(),
                        columns.int_value.into(),
                        columns.char_value.clone().into(),
                        columns.float_value.into(),
                        columns.bool_value.into(),
                    ])
                    .to_owned();
                exec(&tx, &insert).await?;
                report.inserted += 1;
            }
        }
        tx.commit().await?;
        log::debug!(
            "saved entity {} ({} inserted, {} updated, {} deleted)",
            entity.id,
            report.inserted,
            report.updated,
            report.deleted
        );
        Ok(report)
    }

    async fn load_entity(&self, entity_id: Id) -> KnowledgeResult<Option<Entity>> {
        self.fetch_entity(&self.conn, entity_id).await
    }

    async fn find_entity_by_name(&self, name: &str) -> KnowledgeResult<Option<Entity>> {
        let select = Query::select()
            .from(KnowledgeEntities::Table)
            .column(KnowledgeEntities::EntityId)
            .and_where(Expr::col(KnowledgeEntities::Name).eq(name))
            .order_by(KnowledgeEntities::EntityId, Order::Asc)
            .limit(1)
            .to_owned();
        let Some(row) = query_one(&self.conn, &select).await? else {
            return Ok(None);
        };
        let entity_id = read_id(&row, KnowledgeEntities::EntityId)?;
        self.fetch_entity(&self.conn, entity_id).await
    }

    async fn delete_entity(&self, entity_id: Id) -> KnowledgeResult<bool> {
        let tx = self.conn.begin().await?;
        let delete_facts = Query::delete()
            .from_table(KnowledgeFacts::Table)
            .and_where(Expr::col(KnowledgeFacts::EntityId).eq(id_value(entity_id)))
            .to_owned();
        let facts = exec(&tx, &delete_facts).await?;
        let delete_entity = Query::delete()
            .from_table(KnowledgeEntities::Table)
            .and_where(Expr::col(KnowledgeEntities::EntityId).eq(id_value(entity_id)))
            .to_owned();
        let removed = exec(&tx, &delete_entity).await?;
        tx.commit().await?;
        log::debug!("deleted entity {entity_id} ({facts} facts)");
        Ok(removed > 0)
    }

    async fn list_entities(&self) -> KnowledgeResult<Vec<EntitySummary>> {
        let select = Query::select()
            .column((KnowledgeEntities::Table, KnowledgeEntities::EntityId))
            .column((KnowledgeEntities::Table, KnowledgeEntities::Name))
            .expr_as(
                Expr::col((KnowledgeFacts::Table, KnowledgeFacts::FactId)).count(),
                Alias::new(FACT_COUNT),
            )
            .from(KnowledgeEntities::Table)
            .left_join(
                KnowledgeFacts::Table,
                Expr::col((KnowledgeFacts::Table, KnowledgeFacts::EntityId))
                    .equals((KnowledgeEntities::Table, KnowledgeEntities::EntityId)),
            )
            .group_by_columns([
                (KnowledgeEntities::Table, KnowledgeEntities::EntityId),
                (KnowledgeEntities::Table, KnowledgeEntities::Name),
            ])
            .order_by((KnowledgeEntities::Table, KnowledgeEntities::Name), Order::Asc)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let fact_count: i64 = row.try_get("", FACT_COUNT)?;
            summaries.push(EntitySummary {
                id: read_id(&row, KnowledgeEntities::EntityId)?,
                name: row.try_get("", &col_name(KnowledgeEntities::Name))?,
                fact_count: u64::try_from(fact_count)
                    .map_err(|_| KnowledgeError::storage("negative fact count"))?,
            });
        }
        Ok(summaries)
    }

    async fn find_entities_by_fact(&self, filter: FactFilter) -> KnowledgeResult<Vec<Id>> {
        let value_type = filter.value.value_type();
        if FactTypes::entry(value_type).is_none() {
            return Err(KnowledgeError::unsupported_type(value_type));
        }
        let logical = Expr::expr(fact_value_expr(self.backend));
        let probe = Expr::val(value_to_sea(&filter.value)).cast_as(text_type(self.backend));
        let condition = match filter.op {
            CompareOp::Eq => logical.eq(probe),
            CompareOp::Ne => logical.ne(probe),
        };
        let select = Query::select()
            .distinct()
            .from(KnowledgeFacts::Table)
            .column(KnowledgeFacts::EntityId)
            .and_where(Expr::col(KnowledgeFacts::Key).eq(filter.key.as_str()))
            .and_where(condition)
            .order_by(KnowledgeFacts::EntityId, Order::Asc)
            .to_owned();
        query_all(&self.conn, &select)
            .await?
            .iter()
            .map(|row| read_id(row, KnowledgeFacts::EntityId))
            .collect()
    }
}

/// The logical fact value as text: a CASE over the discriminator picking the
/// mapped column. Rows whose discriminator maps to no column yield NULL.
fn fact_value_expr(backend: DatabaseBackend) -> SimpleExpr {
    let mut case = CaseStatement::new();
    for entry in FactTypes::ENTRIES {
        let (Some(discriminator), Some(column)) = (entry.discriminator, entry.column) else {
            continue;
        };
        case = case.case(
            Expr::col(KnowledgeFacts::Type).eq(discriminator),
            Expr::col(fact_column(column)).cast_as(text_type(backend)),
        );
    }
    case.into()
}

fn text_type(backend: DatabaseBackend) -> Alias {
    match backend {
        DatabaseBackend::MySql => Alias::new("CHAR"),
        _ => Alias::new("TEXT"),
    }
}

fn fact_column(column: ValueColumn) -> KnowledgeFacts {
    match column {
        ValueColumn::Int => KnowledgeFacts::IntValue,
        ValueColumn::Char => KnowledgeFacts::CharValue,
        ValueColumn::Float => KnowledgeFacts::FloatValue,
        ValueColumn::Bool => KnowledgeFacts::BoolValue,
    }
}

fn discriminator_value(fact: &Fact) -> SeaValue {
    fact.discriminator().map(str::to_string).into()
}

fn value_to_sea(value: &Value) -> SeaValue {
    match value {
        Value::Null => SeaValue::String(None),
        Value::Str(value) => value.clone().into(),
        Value::Int(value) => (*value).into(),
        Value::Float(value) => (*value).into(),
        Value::Bool(value) => (*value).into(),
    }
}

fn read_fact(row: &QueryResult) -> KnowledgeResult<Fact> {
    let fact_id = read_id(row, KnowledgeFacts::FactId)?;
    let key: String = row.try_get("", &col_name(KnowledgeFacts::Key))?;
    let discriminator: Option<String> = row.try_get("", &col_name(KnowledgeFacts::Type))?;
    if FactTypes::entry_for_discriminator(discriminator.as_deref()).is_none() {
        log::warn!("fact {fact_id} ('{key}') has unmapped discriminator {discriminator:?}");
    }
    let columns = ValueColumns {
        int_value: row.try_get("", &col_name(KnowledgeFacts::IntValue))?,
        char_value: row.try_get("", &col_name(KnowledgeFacts::CharValue))?,
        float_value: row.try_get("", &col_name(KnowledgeFacts::FloatValue))?,
        bool_value: row.try_get("", &col_name(KnowledgeFacts::BoolValue))?,
    };
    Ok(Fact::from_columns(fact_id, key, discriminator, columns))
}

fn id_value(id: Id) -> SeaValue {
    id.to_uuid_string().into()
}

fn read_id(row: &QueryResult, column: impl sea_query::Iden) -> KnowledgeResult<Id> {
    let value: String = row.try_get("", &col_name(column))?;
    Id::from_uuid_str(&value)
}

fn col_name(column: impl sea_query::Iden) -> String {
    column.to_string()
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
        #[allow(unreachable_patterns)]
        _ => stmt.build(SqliteQueryBuilder),
    }
}

/// Runs a write statement and returns the number of affected rows.
async fn exec<C, S>(conn: &C, stmt: &S) -> KnowledgeResult<u64>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let result = conn
        .execute(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(result.rows_affected())
}

async fn query_all<C, S>(conn: &C, stmt: &S) -> KnowledgeResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> KnowledgeResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}

fn build_connection_url(config: &KnowledgeConfig, base_dir: &Path) -> KnowledgeResult<String> {
    if let Some(url) = config.connection_url() {
        return Ok(url.to_string());
    }
    let path = config.sqlite_path(base_dir)?;
    Ok(format!("sqlite://{}?mode=rwc", path.display()))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use sea_orm::DatabaseBackend;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    use knowledge_core::ValueColumn;

    use super::{build_connection_url, col_name, fact_column, fact_value_expr, text_type};
    use crate::db::KnowledgeFacts;
    use crate::{DatabaseConfig, KnowledgeConfig};

    #[test]
    fn sqlite_url_uses_rwc_mode() {
        let config = KnowledgeConfig::default_sqlite("k.sqlite");
        let url = build_connection_url(&config, Path::new("/tmp/base")).expect("url");
        assert_eq!(url, "sqlite:///tmp/base/k.sqlite?mode=rwc");
    }

    #[test]
    fn server_url_is_passed_through() {
        let config = KnowledgeConfig {
            database: DatabaseConfig::Postgres {
                url: "postgres://localhost/k".to_string(),
            },
            pool: None,
        };
        let url = build_connection_url(&config, Path::new("/tmp")).expect("url");
        assert_eq!(url, "postgres://localhost/k");
    }

    #[test]
    fn value_expression_branches_on_discriminator() {
        let sql = Query::select()
            .expr(fact_value_expr(DatabaseBackend::Sqlite))
            .from(KnowledgeFacts::Table)
            .to_string(SqliteQueryBuilder);
        assert!(sql.contains("CASE"), "{sql}");
        assert!(sql.contains("\"type_\" = 'integer'"), "{sql}");
        assert!(sql.contains("CAST(\"char_value\" AS"), "{sql}");
        assert!(!sql.contains("ELSE"), "{sql}");
    }

    #[test]
    fn mysql_casts_to_char() {
        assert_eq!(
            sea_orm::sea_query::Iden::to_string(&text_type(DatabaseBackend::MySql)),
            "CHAR"
        );
    }

    #[test]
    fn relative_sqlite_path_is_not_doubled() {
        let config = KnowledgeConfig::default_sqlite("data/k.sqlite");
        let url = build_connection_url(&config, Path::new(".")).expect("url");
        assert_eq!(url, "sqlite://./data/k.sqlite?mode=rwc");
    }

    #[test]
    fn fact_columns_match_value_column_names() {
        for column in ValueColumn::ALL {
            assert_eq!(col_name(fact_column(column)), column.name());
        }
    }
}
