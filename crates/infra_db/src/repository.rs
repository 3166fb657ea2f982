//! Generic tenant-scoped repository
//!
//! Every CRM table is described once through the [`Table`] trait: its name,
//! the select list (with joins), and the whitelists of sortable, filterable
//! and searchable columns. [`Repository`] then provides add / update /
//! delete / find / find_by / list / exists on top of `sqlx::QueryBuilder`.
//!
//! Column names and SQL fragments only ever come from the `Table`
//! description; user input reaches the database as bound parameters.
//!
//! Each operation has an `_on` variant taking a `&mut PgConnection` so
//! repositories can combine generic operations inside a transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! let persons: Repository<PersonRow> = Repository::new(pool);
//! let options = ListOptions::new(1, 25).with_search("smith");
//! let page = persons.list(&ctx, &options).await?;
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{ListOptions, Page, SortOrder, TenantContext};

use crate::error::DatabaseError;

/// Alias of the main table in every generated statement
pub const TABLE_ALIAS: &str = "t";

/// Type of a filter value, used to parse query-string input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Uuid,
    Bool,
    Int,
    Date,
}

/// A filter a list query may apply
#[derive(Debug, Clone, Copy)]
pub struct Filter {
    /// Name used in list options
    pub name: &'static str,
    /// SQL condition with a single `?` marking where the value is bound
    pub condition: &'static str,
    pub kind: ColumnKind,
}

impl Filter {
    pub const fn new(name: &'static str, condition: &'static str, kind: ColumnKind) -> Self {
        Self { name, condition, kind }
    }
}

/// Description of a tenant-owned table
pub trait Table: for<'r> FromRow<'r, PgRow> + Send + Unpin + 'static {
    /// Table name
    const TABLE: &'static str;
    /// Entity name used in error messages
    const ENTITY: &'static str;
    /// Select list; the main table is aliased `t`
    const SELECT: &'static str;
    /// Join clauses appended after `FROM <table> t`
    const JOINS: &'static str = "";
    /// Column holding the owning user, for per-user tables like mail
    const OWNER_COLUMN: Option<&'static str> = None;
    /// `(name, SQL expression)` pairs a list may be sorted by
    const SORTABLE: &'static [(&'static str, &'static str)];
    const FILTERS: &'static [Filter];
    /// SQL expressions matched by the search term
    const SEARCHABLE: &'static [&'static str];
    /// `(SQL expression, order)` used when no known sort is requested
    const DEFAULT_SORT: (&'static str, SortOrder);
}

/// A value bound into a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Bool(bool),
    Int(Option<i64>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Parses raw filter input for a column of `kind`
    pub fn parse(kind: ColumnKind, raw: &str) -> Result<Self, DatabaseError> {
        let raw = raw.trim();
        let invalid = || DatabaseError::invalid_query(format!("invalid value '{}'", raw));
        match kind {
            ColumnKind::Text => Ok(SqlValue::Text(Some(raw.to_string()))),
            ColumnKind::Uuid => parse_uuid(raw).map(|u| SqlValue::Uuid(Some(u))).ok_or_else(invalid),
            ColumnKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(SqlValue::Bool(true)),
                "false" | "0" | "no" => Ok(SqlValue::Bool(false)),
                _ => Err(invalid()),
            },
            ColumnKind::Int => raw.parse().map(|v| SqlValue::Int(Some(v))).map_err(|_| invalid()),
            ColumnKind::Date => raw.parse().map(|d| SqlValue::Date(Some(d))).map_err(|_| invalid()),
        }
    }

    /// Optional typed identifier
    pub fn id<I: Into<Uuid>>(id: Option<I>) -> Self {
        SqlValue::Uuid(id.map(Into::into))
    }
}

/// Accepts bare UUIDs and prefixed identifiers such as `TAG-<uuid>`
fn parse_uuid(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok().or_else(|| {
        raw.split_once('-')
            .and_then(|(_, rest)| Uuid::parse_str(rest).ok())
    })
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for SqlValue {
    fn from(v: Option<Uuid>) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for SqlValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: SqlValue) {
    match value {
        SqlValue::Text(v) => builder.push_bind(v),
        SqlValue::Uuid(v) => builder.push_bind(v),
        SqlValue::Bool(v) => builder.push_bind(v),
        SqlValue::Int(v) => builder.push_bind(v),
        SqlValue::Date(v) => builder.push_bind(v),
        SqlValue::Timestamp(v) => builder.push_bind(v),
        SqlValue::Json(v) => builder.push_bind(v),
    };
}

/// Column assignments for an insert or update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    values: Vec<(&'static str, SqlValue)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing an earlier assignment of the same column
    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.values.push((column, value)),
        }
        self
    }

    /// Sets a column only when a value is present
    pub fn set_some<V: Into<SqlValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(c, _)| *c)
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }
}

/// A filter resolved against a table's whitelist
#[derive(Debug, Clone)]
struct ResolvedFilter {
    condition: &'static str,
    value: SqlValue,
}

/// Escapes `%`, `_` and `\` and wraps the term for a substring `ILIKE`
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Resolves the requested sort against the whitelist.
///
/// Unknown or missing columns fall back to the table's default sort.
pub fn resolve_sort<T: Table>(options: &ListOptions) -> (&'static str, SortOrder) {
    match options.sort_by.as_deref() {
        Some(name) => match T::SORTABLE.iter().find(|(n, _)| *n == name) {
            Some((_, expr)) => (*expr, options.sort_order),
            None => {
                debug!(table = T::TABLE, sort = name, "Unknown sort column, using default");
                T::DEFAULT_SORT
            }
        },
        None => T::DEFAULT_SORT,
    }
}

fn find_filter<T: Table>(name: &str) -> Result<&'static Filter, DatabaseError> {
    T::FILTERS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| DatabaseError::invalid_query(format!("unknown filter '{}'", name)))
}

fn resolve_filters<T: Table>(options: &ListOptions) -> Result<Vec<ResolvedFilter>, DatabaseError> {
    options
        .filters
        .iter()
        .map(|(name, raw)| {
            let filter = find_filter::<T>(name)?;
            let value = SqlValue::parse(filter.kind, raw)
                .map_err(|e| DatabaseError::invalid_query(format!("filter '{}': {}", name, e)))?;
            Ok(ResolvedFilter {
                condition: filter.condition,
                value,
            })
        })
        .collect()
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &str, value: SqlValue) {
    let (before, after) = condition.split_once('?').unwrap_or((condition, ""));
    builder.push(" AND ").push(before);
    push_value(builder, value);
    builder.push(after);
}

/// Tenant-scoped CRUD over the table described by `T`
pub struct Repository<T> {
    pool: PgPool,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("row", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Table> Repository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _row: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn select() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new(format!(
            "SELECT {} FROM {} {} {}",
            T::SELECT,
            T::TABLE,
            TABLE_ALIAS,
            T::JOINS
        ))
    }

    /// Pushes ` WHERE t.tenant_id = $n` plus the owner condition
    fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, ctx: &TenantContext) {
        builder
            .push(" WHERE t.tenant_id = ")
            .push_bind(*ctx.tenant_id.as_uuid());
        if let Some(owner) = T::OWNER_COLUMN {
            builder
                .push(" AND t.")
                .push(owner)
                .push(" = ")
                .push_bind(*ctx.user_id.as_uuid());
        }
    }

    fn push_filters(
        builder: &mut QueryBuilder<'_, Postgres>,
        filters: &[ResolvedFilter],
        search: Option<&str>,
    ) {
        for filter in filters {
            push_condition(builder, filter.condition, filter.value.clone());
        }
        if let Some(term) = search {
            if !T::SEARCHABLE.is_empty() {
                let pattern = like_pattern(term);
                builder.push(" AND (");
                for (i, expr) in T::SEARCHABLE.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(*expr).push(" ILIKE ").push_bind(pattern.clone());
                }
                builder.push(")");
            }
        }
    }

    fn check_changes(changes: &Changeset) -> Result<(), DatabaseError> {
        for column in changes.columns() {
            if column == "id" || column == "tenant_id" || Some(column) == T::OWNER_COLUMN {
                return Err(DatabaseError::invalid_query(format!(
                    "column '{}' of {} cannot be assigned",
                    column,
                    T::TABLE
                )));
            }
        }
        Ok(())
    }

    /// Inserts a row; id, tenant and owner come from the context
    pub async fn add(&self, ctx: &TenantContext, changes: Changeset) -> Result<T, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::add_on(&mut conn, ctx, changes).await
    }

    pub async fn add_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        changes: Changeset,
    ) -> Result<T, DatabaseError> {
        Self::check_changes(&changes)?;
        let id = Uuid::now_v7();

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (id, tenant_id", T::TABLE));
        if let Some(owner) = T::OWNER_COLUMN {
            builder.push(", ").push(owner);
        }
        for column in changes.columns() {
            builder.push(", ").push(column);
        }
        builder
            .push(") VALUES (")
            .push_bind(id)
            .push(", ")
            .push_bind(*ctx.tenant_id.as_uuid());
        if T::OWNER_COLUMN.is_some() {
            builder.push(", ").push_bind(*ctx.user_id.as_uuid());
        }
        for (_, value) in changes.values {
            builder.push(", ");
            push_value(&mut builder, value);
        }
        builder.push(")");
        builder.build().execute(&mut *conn).await?;

        debug!(table = T::TABLE, %id, "Inserted row");
        Self::find_on(conn, ctx, id).await
    }

    /// Updates the given columns and bumps `updated_at`
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        changes: Changeset,
    ) -> Result<T, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::update_on(&mut conn, ctx, id, changes).await
    }

    pub async fn update_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        id: Uuid,
        changes: Changeset,
    ) -> Result<T, DatabaseError> {
        Self::check_changes(&changes)?;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("UPDATE {} AS {} SET ", T::TABLE, TABLE_ALIAS));
        for (column, value) in changes.values {
            builder.push(column).push(" = ");
            push_value(&mut builder, value);
            builder.push(", ");
        }
        builder.push("updated_at = now()");
        Self::push_scope(&mut builder, ctx);
        builder.push(" AND t.id = ").push_bind(id);

        let result = builder.build().execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(T::ENTITY, id));
        }
        Self::find_on(conn, ctx, id).await
    }

    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> Result<(), DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_on(&mut conn, ctx, id).await
    }

    pub async fn delete_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<(), DatabaseError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("DELETE FROM {} AS {}", T::TABLE, TABLE_ALIAS));
        Self::push_scope(&mut builder, ctx);
        builder.push(" AND t.id = ").push_bind(id);

        let result = builder.build().execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(T::ENTITY, id));
        }
        debug!(table = T::TABLE, %id, "Deleted row");
        Ok(())
    }

    pub async fn find(&self, ctx: &TenantContext, id: Uuid) -> Result<T, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::find_on(&mut conn, ctx, id).await
    }

    pub async fn find_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<T, DatabaseError> {
        let mut builder = Self::select();
        Self::push_scope(&mut builder, ctx);
        builder.push(" AND t.id = ").push_bind(id);

        builder
            .build_query_as::<T>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::not_found(T::ENTITY, id))
    }

    /// Like [`Self::find_on`], holding a row lock until the transaction ends
    pub async fn lock_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<T, DatabaseError> {
        let mut builder = Self::select();
        Self::push_scope(&mut builder, ctx);
        builder.push(" AND t.id = ").push_bind(id).push(" FOR UPDATE OF t");

        builder
            .build_query_as::<T>()
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::not_found(T::ENTITY, id))
    }

    /// First row whose filter `name` matches `value`
    pub async fn find_by(
        &self,
        ctx: &TenantContext,
        name: &str,
        value: &str,
    ) -> Result<Option<T>, DatabaseError> {
        let filter = find_filter::<T>(name)?;
        let value = SqlValue::parse(filter.kind, value)?;

        let mut builder = Self::select();
        Self::push_scope(&mut builder, ctx);
        push_condition(&mut builder, filter.condition, value);
        let (sort, order) = T::DEFAULT_SORT;
        builder
            .push(" ORDER BY ")
            .push(sort)
            .push(" ")
            .push(order.as_sql())
            .push(" LIMIT 1");

        Ok(builder
            .build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn exists(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::exists_on(&mut conn, ctx, id).await
    }

    pub async fn exists_on(
        conn: &mut PgConnection,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT EXISTS (SELECT 1 FROM {} {}", T::TABLE, TABLE_ALIAS));
        Self::push_scope(&mut builder, ctx);
        builder.push(" AND t.id = ").push_bind(id).push(")");

        Ok(builder
            .build_query_scalar::<bool>()
            .fetch_one(&mut *conn)
            .await?)
    }

    /// One page of rows plus the total count for the same conditions
    pub async fn list(
        &self,
        ctx: &TenantContext,
        options: &ListOptions,
    ) -> Result<Page<T>, DatabaseError> {
        let filters = resolve_filters::<T>(options)?;
        let search = options.search.as_deref();

        let mut count: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} {} {}",
            T::TABLE,
            TABLE_ALIAS,
            T::JOINS
        ));
        Self::push_scope(&mut count, ctx);
        Self::push_filters(&mut count, &filters, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let (sort, order) = resolve_sort::<T>(options);
        let mut rows = Self::select();
        Self::push_scope(&mut rows, ctx);
        Self::push_filters(&mut rows, &filters, search);
        rows.push(" ORDER BY ")
            .push(sort)
            .push(" ")
            .push(order.as_sql())
            .push(", t.id ")
            .push(order.as_sql())
            .push(" LIMIT ")
            .push_bind(options.limit())
            .push(" OFFSET ")
            .push_bind(options.offset());

        let items = rows.build_query_as::<T>().fetch_all(&self.pool).await?;
        debug!(table = T::TABLE, total, returned = items.len(), "Listed rows");

        Ok(Page::new(items, total, options))
    }
}
