//! Records portal
//!
//! Client-side core of a special-education records portal backed by a
//! Supabase project: staff users, students, services delivered to students,
//! and billing claims.
//!
//! Forms go through an [`editor::Editor`], which normalizes raw input and
//! validates it against the entity's field table before anything reaches the
//! store. Pages are driven by a [`page::PageController`] per entity.

pub mod config;
pub mod editor;
pub mod error;
pub mod lookups;
pub mod models;
pub mod normalize;
pub mod page;
pub mod schema;
pub mod store;
pub mod validate;
pub mod views;

use std::sync::Arc;

use crate::config::{ClientOptions, PortalConfig};
use crate::error::Result;
use crate::lookups::{PractitionerOption, StudentOption};
use crate::models::{Claim, Service, Student, User};
use crate::page::PageController;
use crate::store::PostgrestStore;

/// The main entry point for the records portal
#[derive(Debug, Clone)]
pub struct Portal {
    config: PortalConfig,
    store: Arc<PostgrestStore>,
}

impl Portal {
    /// Connect to a Supabase project
    ///
    /// # Example
    ///
    /// ```
    /// use records_portal::Portal;
    ///
    /// let portal = Portal::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let students = portal.students();
    /// ```
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        Self::new_with_options(url, anon_key, ClientOptions::default())
    }

    pub fn new_with_options(url: &str, anon_key: &str, options: ClientOptions) -> Result<Self> {
        Self::from_config(PortalConfig::new(url, anon_key)?.with_options(options))
    }

    pub fn from_config(config: PortalConfig) -> Result<Self> {
        let store = PostgrestStore::new(&config)?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Reads the connection settings from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(PortalConfig::from_env()?)
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<PostgrestStore> {
        Arc::clone(&self.store)
    }

    pub fn users(&self) -> PageController<User, PostgrestStore> {
        PageController::new(self.store())
    }

    pub fn students(&self) -> PageController<Student, PostgrestStore> {
        PageController::new(self.store())
    }

    pub fn services(&self) -> PageController<Service, PostgrestStore> {
        PageController::new(self.store())
    }

    pub fn claims(&self) -> PageController<Claim, PostgrestStore> {
        PageController::new(self.store())
    }

    pub async fn practitioner_options(&self) -> Result<Vec<PractitionerOption>> {
        lookups::practitioner_options(self.store.as_ref()).await
    }

    pub async fn student_options(&self) -> Result<Vec<StudentOption>> {
        lookups::student_options(self.store.as_ref()).await
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::{ClientOptions, PortalConfig};
    pub use crate::editor::{Editor, Mode, Submission};
    pub use crate::error::{Error, Result};
    pub use crate::models::{Claim, Service, Student, User};
    pub use crate::page::{PageController, PageModel, PageState};
    pub use crate::schema::{Collection, Entity};
    pub use crate::store::{ListQuery, PostgrestStore, RecordStore};
    pub use crate::Portal;
}
