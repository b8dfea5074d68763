//! Record store boundary
//!
//! [`RecordStore`] is the seam between page logic and persistence.
//! [`PostgrestStore`] implements it against a Supabase project's REST API.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use records_portal_postgrest::{PostgrestClient, PostgrestError, SortOrder};

use crate::config::{ClientOptions, PortalConfig};
use crate::error::{ConstraintKind, ConstraintViolation, Error, Result};
use crate::normalize::Record;
use crate::schema::{Collection, Entity, EntitySchema};

/// A row filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    In(String, Vec<String>),
}

/// Select parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    /// Column and whether it sorts ascending
    pub order: Option<(String, bool)>,
    pub limit: Option<i32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns, joins and ordering an entity's list is read with
    pub fn for_schema(schema: &EntitySchema) -> Self {
        Self::new()
            .select(schema.select)
            .order(schema.order_by, schema.ascending)
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn in_list(mut self, column: &str, values: &[&str]) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, count: i32) -> Self {
        self.limit = Some(count);
        self
    }
}

/// Persistence for the four record collections
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `collection` matching `query`
    async fn select<T>(&self, collection: Collection, query: &ListQuery) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send;

    /// Create a record; the store assigns the id and server defaults
    async fn insert<E: Entity>(&self, record: &Record) -> Result<E>;

    /// Partially update record `id`; [`Error::NotFound`] when no row matched
    async fn update<E: Entity>(&self, id: i64, record: &Record) -> Result<E>;

    /// Delete record `id`; [`Error::NotFound`] when no row matched
    async fn delete<E: Entity>(&self, id: i64) -> Result<()>;

    /// The whole collection in its display order
    async fn list<E: Entity>(&self) -> Result<Vec<E>> {
        let schema = E::schema();
        self.select(schema.collection, &ListQuery::for_schema(schema))
            .await
    }
}

/// Turn a PostgREST failure into the portal's error type.
///
/// Constraint violations are recognized by PostgreSQL error code first and
/// by message text second. Anything else keeps the backend's message.
pub fn classify(err: PostgrestError) -> Error {
    let (message, detail) = match &err {
        PostgrestError::ApiError { details, .. } => (
            details.message.clone().unwrap_or_default(),
            details.details.clone(),
        ),
        PostgrestError::UnparsedApiError { message, .. } => (message.clone(), None),
        _ => return Error::store(err),
    };

    let kind = match err.code() {
        Some("23505") => Some(ConstraintKind::Unique),
        Some("23503") => Some(ConstraintKind::ForeignKey),
        Some("23502") => Some(ConstraintKind::NotNull),
        _ => constraint_from_message(&message),
    };

    match kind {
        Some(kind) => Error::Constraint(ConstraintViolation {
            kind,
            message,
            detail,
        }),
        None => Error::Store(err.message()),
    }
}

fn constraint_from_message(message: &str) -> Option<ConstraintKind> {
    if message.contains("duplicate key value violates unique constraint") {
        Some(ConstraintKind::Unique)
    } else if message.contains("violates foreign key constraint") {
        Some(ConstraintKind::ForeignKey)
    } else if message.contains("violates not-null constraint") {
        Some(ConstraintKind::NotNull)
    } else {
        None
    }
}

/// [`RecordStore`] backed by PostgREST
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    base_url: String,
    api_key: String,
    http_client: Client,
    options: ClientOptions,
}

impl PostgrestStore {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(config, http_client))
    }

    /// Share an existing HTTP client
    pub fn with_client(config: &PortalConfig, http_client: Client) -> Self {
        Self {
            base_url: config.url.as_str().trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
            http_client,
            options: config.options.clone(),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn from(&self, collection: Collection) -> Result<PostgrestClient> {
        let table = self.options.table(collection);
        let mut client =
            PostgrestClient::new(&self.base_url, &self.api_key, table, self.http_client.clone())?
                .with_auth(&self.api_key)?
                .with_timeout(self.options.request_timeout);
        if self.options.db_schema != "public" {
            client = client.schema(&self.options.db_schema)?;
        }
        Ok(client)
    }

    fn by_id(&self, collection: Collection, id: i64) -> Result<PostgrestClient> {
        Ok(self.from(collection)?.eq("id", &id.to_string()))
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select<T>(&self, collection: Collection, query: &ListQuery) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let mut client = self.from(collection)?;
        if let Some(columns) = &query.select {
            client = client.select(columns);
        }
        for filter in &query.filters {
            client = match filter {
                Filter::Eq(column, value) => client.eq(column, value),
                Filter::In(column, values) => {
                    let values: Vec<&str> = values.iter().map(String::as_str).collect();
                    client.in_list(column, &values)
                }
            };
        }
        if let Some((column, ascending)) = &query.order {
            client = client.order(column, SortOrder::from_ascending(*ascending));
        }
        if let Some(limit) = query.limit {
            client = client.limit(limit);
        }

        let rows = client.execute::<T>().await.map_err(|e| {
            warn!("select on {} failed: {}", collection, e);
            classify(e)
        })?;
        debug!("selected {} {} rows", rows.len(), collection);
        Ok(rows)
    }

    async fn insert<E: Entity>(&self, record: &Record) -> Result<E> {
        let schema = E::schema();
        let collection = schema.collection;
        let response = self
            .from(collection)?
            .select(schema.select)
            .insert(record)
            .await
            .map_err(|e| {
                warn!("insert into {} failed: {}", collection, e);
                classify(e)
            })?;

        let created: E = first_row(response)?
            .ok_or_else(|| Error::store(format!("insert into {} returned no row", collection)))?;
        debug!("created {} {}", collection, created.id());
        Ok(created)
    }

    async fn update<E: Entity>(&self, id: i64, record: &Record) -> Result<E> {
        let schema = E::schema();
        let collection = schema.collection;
        let response = self
            .by_id(collection, id)?
            .select(schema.select)
            .update(record)
            .await
            .map_err(|e| {
                warn!("update of {} {} failed: {}", collection, id, e);
                classify(e)
            })?;

        let updated = first_row(response)?.ok_or(Error::NotFound { collection, id })?;
        debug!("updated {} {}", collection, id);
        Ok(updated)
    }

    async fn delete<E: Entity>(&self, id: i64) -> Result<()> {
        let collection = E::schema().collection;
        let response = self.by_id(collection, id)?.delete().await.map_err(|e| {
            warn!("delete of {} {} failed: {}", collection, id, e);
            classify(e)
        })?;

        match response {
            Value::Array(rows) if rows.is_empty() => Err(Error::NotFound { collection, id }),
            _ => {
                debug!("deleted {} {}", collection, id);
                Ok(())
            }
        }
    }
}

// Representation comes back as an array of rows, or empty on 204.
fn first_row<E: Entity>(response: Value) -> Result<Option<E>> {
    let row = match response {
        Value::Array(rows) => rows.into_iter().next(),
        Value::Null => None,
        other => Some(other),
    };
    Ok(row.map(serde_json::from_value).transpose()?)
}
