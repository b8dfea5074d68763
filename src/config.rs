//! Configuration for the records portal

use std::env;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::schema::Collection;

/// Tuning for the store client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Database schema the tables live in
    pub db_schema: String,

    pub user_table: String,
    pub student_table: String,
    pub service_table: String,
    pub claim_table: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            // `user` is reserved in PostgreSQL
            user_table: "app_user".to_string(),
            student_table: "student".to_string(),
            service_table: "service".to_string(),
            claim_table: "claim".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Map a logical collection onto a differently named table
    pub fn with_table(mut self, collection: Collection, table: &str) -> Self {
        let slot = match collection {
            Collection::User => &mut self.user_table,
            Collection::Student => &mut self.student_table,
            Collection::Service => &mut self.service_table,
            Collection::Claim => &mut self.claim_table,
        };
        *slot = table.to_string();
        self
    }

    pub fn table(&self, collection: Collection) -> &str {
        match collection {
            Collection::User => &self.user_table,
            Collection::Student => &self.student_table,
            Collection::Service => &self.service_table,
            Collection::Claim => &self.claim_table,
        }
    }
}

/// Where the backend lives and how to reach it
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub url: Url,
    pub anon_key: String,
    pub options: ClientOptions,
}

impl PortalConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            options: ClientOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads `SUPABASE_URL` and `SUPABASE_ANON_KEY`, plus `SUPABASE_DB_SCHEMA`
    /// when set.
    pub fn from_env() -> Result<Self> {
        let url = env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let mut config = Self::new(&url, &anon_key)?;
        if let Ok(schema) = env::var("SUPABASE_DB_SCHEMA") {
            if !schema.trim().is_empty() {
                config.options = config.options.with_db_schema(schema.trim());
            }
        }
        Ok(config)
    }
}
