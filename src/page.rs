//! Per-entity page state
//!
//! A [`PageController`] owns the list shown on a page, the open editor, the
//! pending delete confirmation and the error banner. All of it lives behind
//! one lock; the lock is released while the store is being called, so a
//! response is only applied if the page is still on the same mount. A
//! refresh never cancels a save that is already in flight.

use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::editor::{Editor, Mode, Submission};
use crate::error::{Error, Result};
use crate::schema::Entity;
use crate::store::RecordStore;
use crate::validate::{user_message, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading,
    Ready,
    Submitting,
}

/// Everything a page renders from
#[derive(Debug, Clone)]
pub struct PageModel<E: Entity> {
    pub state: PageState,
    pub items: Vec<E>,
    /// Dismissable store failure
    pub banner: Option<String>,
    pub editor: Option<Editor<E>>,
    /// Last local validation failure of the open editor
    pub form_error: Option<ValidationError>,
    pub pending_delete: Option<i64>,
    mounted: bool,
    /// Mount generation, bumped only by unmount
    epoch: u64,
    /// Latest list request; older lists are dropped
    reload: u64,
    /// Bumped whenever a different editor is opened or the editor is closed
    editor_seq: u64,
}

impl<E: Entity> Default for PageModel<E> {
    fn default() -> Self {
        Self {
            state: PageState::Loading,
            items: Vec::new(),
            banner: None,
            editor: None,
            form_error: None,
            pending_delete: None,
            mounted: false,
            epoch: 0,
            reload: 0,
            editor_seq: 0,
        }
    }
}

impl<E: Entity> PageModel<E> {
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.mounted && self.epoch == epoch
    }

    fn upsert(&mut self, saved: E) {
        match self.items.iter_mut().find(|item| item.id() == saved.id()) {
            Some(slot) => *slot = saved,
            None => self.items.push(saved),
        }
    }

    fn begin(&mut self) -> u64 {
        self.state = PageState::Submitting;
        self.epoch
    }

    fn settle(&mut self) {
        if self.state != PageState::Submitting {
            self.state = PageState::Ready;
        }
    }

    fn replace_editor(&mut self, editor: Option<Editor<E>>) {
        self.editor = editor;
        self.form_error = None;
        self.editor_seq += 1;
    }
}

pub struct PageController<E: Entity, S: RecordStore> {
    store: Arc<S>,
    model: Arc<Mutex<PageModel<E>>>,
}

impl<E: Entity, S: RecordStore> Clone for PageController<E, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            model: Arc::clone(&self.model),
        }
    }
}

impl<E: Entity, S: RecordStore> PageController<E, S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            model: Arc::new(Mutex::new(PageModel::default())),
        }
    }

    /// Copy of the current page state
    pub async fn snapshot(&self) -> PageModel<E> {
        self.model.lock().await.clone()
    }

    /// Load the collection. Also used to refresh.
    ///
    /// A refresh while a save or delete is in flight reloads the list but
    /// leaves that mutation in charge of the page state.
    pub async fn mount(&self) -> Result<()> {
        let collection = E::schema().collection;
        let (epoch, reload) = {
            let mut model = self.model.lock().await;
            model.mounted = true;
            model.reload += 1;
            if model.state != PageState::Submitting {
                model.state = PageState::Loading;
            }
            (model.epoch, model.reload)
        };
        debug!("loading {} page", collection);

        let result = self.store.list::<E>().await;

        let mut model = self.model.lock().await;
        if !model.is_current(epoch) {
            warn!("discarding {} list that arrived after unmount", collection);
            return Ok(());
        }
        if model.reload != reload {
            debug!("discarding superseded {} list", collection);
            return Ok(());
        }
        model.settle();
        match result {
            Ok(items) => {
                debug!("{} page ready with {} records", collection, items.len());
                model.items = items;
                Ok(())
            }
            Err(err) => {
                model.banner = Some(user_message(&err, E::schema()));
                Err(err)
            }
        }
    }

    pub async fn open_create(&self) {
        self.model
            .lock()
            .await
            .replace_editor(Some(Editor::blank()));
    }

    /// Open the editor on a record from the current list
    pub async fn open_edit(&self, id: i64) -> Result<()> {
        let mut model = self.model.lock().await;
        let entity = model
            .items
            .iter()
            .find(|item| item.id() == id)
            .ok_or(Error::NotFound {
                collection: E::schema().collection,
                id,
            })?;
        let editor = Editor::edit(entity)?;
        model.replace_editor(Some(editor));
        Ok(())
    }

    pub async fn close_editor(&self) {
        self.model.lock().await.replace_editor(None);
    }

    /// Change the open editor; `None` when no editor is open
    pub async fn edit<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Editor<E>) -> R,
    {
        let mut model = self.model.lock().await;
        model.editor.as_mut().map(f)
    }

    /// Save the open editor.
    ///
    /// On a validation or store failure the editor stays open with the
    /// user's input. Store failures also raise the banner. A successful save
    /// only closes the editor it came from.
    pub async fn submit(&self) -> Result<E> {
        let collection = E::schema().collection;
        let (submission, epoch, editor_seq) = {
            let mut model = self.model.lock().await;
            if model.state == PageState::Submitting {
                return Err(Error::Busy);
            }
            let prepared = match &model.editor {
                Some(editor) => editor.prepare(),
                None => return Err(Error::store("No record is open for editing")),
            };
            let submission = match prepared {
                Ok(submission) => submission,
                Err(invalid) => {
                    model.form_error = Some(invalid.clone());
                    return Err(invalid.into());
                }
            };
            model.form_error = None;
            let editor_seq = model.editor_seq;
            (submission, model.begin(), editor_seq)
        };

        let result = match &submission {
            Submission::Create(record) => {
                debug!("creating {}", collection);
                self.store.insert::<E>(record).await
            }
            Submission::Update { id, record } => {
                debug!("updating {} {}", collection, id);
                self.store.update::<E>(*id, record).await
            }
        };

        let mut model = self.model.lock().await;
        if !model.is_current(epoch) {
            warn!("discarding {} save that completed after unmount", collection);
            return result;
        }
        model.state = PageState::Ready;
        match result {
            Ok(saved) => {
                model.upsert(saved.clone());
                if model.editor_seq == editor_seq {
                    model.replace_editor(None);
                }
                model.banner = None;
                Ok(saved)
            }
            Err(err) => {
                model.banner = Some(user_message(&err, E::schema()));
                Err(err)
            }
        }
    }

    /// Ask for confirmation before deleting `id`; returns the prompt
    pub async fn request_delete(&self, id: i64) -> String {
        let mut model = self.model.lock().await;
        model.pending_delete = Some(id);
        format!(
            "Are you sure you want to delete this {}? This action cannot be undone.",
            E::schema().collection
        )
    }

    pub async fn cancel_delete(&self) {
        self.model.lock().await.pending_delete = None;
    }

    /// Delete the record awaiting confirmation.
    ///
    /// A record the store no longer has counts as deleted.
    pub async fn confirm_delete(&self) -> Result<()> {
        let collection = E::schema().collection;
        let (id, epoch) = {
            let mut model = self.model.lock().await;
            if model.state == PageState::Submitting {
                return Err(Error::Busy);
            }
            let id = match model.pending_delete.take() {
                Some(id) => id,
                None => return Ok(()),
            };
            (id, model.begin())
        };
        debug!("deleting {} {}", collection, id);

        let result = match self.store.delete::<E>(id).await {
            Err(err) if err.is_not_found() => {
                debug!("{} {} was already gone", collection, id);
                Ok(())
            }
            other => other,
        };

        let mut model = self.model.lock().await;
        if !model.is_current(epoch) {
            warn!("discarding {} delete that completed after unmount", collection);
            return result;
        }
        model.state = PageState::Ready;
        match result {
            Ok(()) => {
                model.items.retain(|item| item.id() != id);
                let editing_deleted = model
                    .editor
                    .as_ref()
                    .map_or(false, |editor| editor.mode() == Mode::Edit { id });
                if editing_deleted {
                    model.replace_editor(None);
                }
                Ok(())
            }
            Err(err) => {
                model.banner = Some(user_message(&err, E::schema()));
                Err(err)
            }
        }
    }

    pub async fn dismiss_banner(&self) {
        self.model.lock().await.banner = None;
    }

    /// Leave the page; responses still in flight are ignored when they land
    pub async fn unmount(&self) {
        let mut model = self.model.lock().await;
        let epoch = model.epoch + 1;
        *model = PageModel {
            epoch,
            ..PageModel::default()
        };
        debug!("{} page unmounted", E::schema().collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConstraintKind, ConstraintViolation};
    use crate::models::{Service, Student};
    use crate::normalize::Record;
    use crate::schema::Collection;
    use crate::store::ListQuery;
    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// In-memory store; `gate` holds writes back while a test keeps it locked
    #[derive(Default)]
    struct FakeStore {
        rows: std::sync::Mutex<HashMap<Collection, Vec<Value>>>,
        fail_next: std::sync::Mutex<Option<Error>>,
        gate: Mutex<()>,
        next_id: std::sync::Mutex<i64>,
    }

    impl FakeStore {
        fn with_rows(collection: Collection, rows: Vec<Value>) -> Self {
            let store = FakeStore::default();
            *store.next_id.lock().unwrap() = 100;
            store.rows.lock().unwrap().insert(collection, rows);
            store
        }

        fn fail_next(&self, err: Error) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn take_failure(&self) -> Result<()> {
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn count(&self, collection: Collection) -> usize {
            self.rows
                .lock()
                .unwrap()
                .get(&collection)
                .map_or(0, Vec::len)
        }
    }

    #[async_trait]
    impl RecordStore for FakeStore {
        async fn select<T>(&self, collection: Collection, _query: &ListQuery) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send,
        {
            self.take_failure()?;
            let rows = self.rows.lock().unwrap().get(&collection).cloned();
            rows.unwrap_or_default()
                .into_iter()
                .map(|row| serde_json::from_value(row).map_err(Error::from))
                .collect()
        }

        async fn insert<E: Entity>(&self, record: &Record) -> Result<E> {
            let _gate = self.gate.lock().await;
            self.take_failure()?;
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                *next
            };
            let mut row = record.clone();
            row.insert("id".into(), json!(id));
            let row = Value::Object(row);
            self.rows
                .lock()
                .unwrap()
                .entry(E::schema().collection)
                .or_default()
                .push(row.clone());
            Ok(serde_json::from_value(row)?)
        }

        async fn update<E: Entity>(&self, id: i64, record: &Record) -> Result<E> {
            let _gate = self.gate.lock().await;
            self.take_failure()?;
            let collection = E::schema().collection;
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .entry(collection)
                .or_default()
                .iter_mut()
                .find(|row| row["id"] == json!(id))
                .ok_or(Error::NotFound { collection, id })?;
            if let Value::Object(map) = &mut *row {
                for (k, v) in record {
                    map.insert(k.clone(), v.clone());
                }
            }
            Ok(serde_json::from_value(row.clone())?)
        }

        async fn delete<E: Entity>(&self, id: i64) -> Result<()> {
            let _gate = self.gate.lock().await;
            self.take_failure()?;
            let collection = E::schema().collection;
            let mut rows = self.rows.lock().unwrap();
            let rows = rows.entry(collection).or_default();
            let before = rows.len();
            rows.retain(|row| row["id"] != json!(id));
            if rows.len() == before {
                return Err(Error::NotFound { collection, id });
            }
            Ok(())
        }
    }

    fn student_row(id: i64, ssid: &str, last_name: &str) -> Value {
        json!({
            "id": id,
            "ssid": ssid,
            "first_name": "Ada",
            "last_name": last_name,
            "birthdate": "2015-04-02",
            "status": "Active",
            "district": "North"
        })
    }

    fn students() -> Arc<FakeStore> {
        Arc::new(FakeStore::with_rows(
            Collection::Student,
            vec![student_row(1, "S-1", "Lovelace"), student_row(2, "S-2", "Byron")],
        ))
    }

    async fn mounted(store: &Arc<FakeStore>) -> PageController<Student, FakeStore> {
        let page = PageController::new(Arc::clone(store));
        page.mount().await.unwrap();
        page
    }

    fn fill_new_student(editor: &mut Editor<Student>, ssid: &str) {
        editor.set_text("ssid", ssid);
        editor.set_text("first_name", "Mary");
        editor.set_text("last_name", "Somerville");
        editor.set_text("birthdate", "2016-12-26");
        editor.set_text("district", "South");
    }

    async fn wait_for_submitting(page: &PageController<Student, FakeStore>) {
        while page.snapshot().await.state != PageState::Submitting {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_mount_loads_items() {
        let store = students();
        let page = mounted(&store).await;
        let model = page.snapshot().await;
        assert_eq!(model.state, PageState::Ready);
        assert_eq!(model.items.len(), 2);
        assert!(model.is_mounted());
    }

    #[tokio::test]
    async fn test_mount_failure_sets_banner() {
        let store = students();
        store.fail_next(Error::store("permission denied for table student"));
        let page = PageController::<Student, _>::new(Arc::clone(&store));

        assert!(page.mount().await.is_err());
        let model = page.snapshot().await;
        assert_eq!(model.state, PageState::Ready);
        assert_eq!(
            model.banner.as_deref(),
            Some("permission denied for table student")
        );

        page.dismiss_banner().await;
        assert!(page.snapshot().await.banner.is_none());
    }

    #[tokio::test]
    async fn test_create_appends_returned_record() {
        let store = students();
        let page = mounted(&store).await;

        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-3")).await.unwrap();
        let created = page.submit().await.unwrap();

        assert_eq!(created.id, 101);
        let model = page.snapshot().await;
        assert!(model.editor.is_none());
        assert_eq!(model.items.len(), 3);
        assert_eq!(model.items[2].ssid, "S-3");
    }

    #[tokio::test]
    async fn test_edit_replaces_in_place() {
        let store = students();
        let page = mounted(&store).await;

        page.open_edit(2).await.unwrap();
        page.edit(|e| e.set_text("school", "Elm Street")).await;
        let saved = page.submit().await.unwrap();

        assert_eq!(saved.school.as_deref(), Some("Elm Street"));
        let model = page.snapshot().await;
        assert_eq!(model.items.len(), 2);
        assert_eq!(model.items[1].school.as_deref(), Some("Elm Street"));
    }

    #[tokio::test]
    async fn test_open_edit_unknown_id() {
        let store = students();
        let page = mounted(&store).await;
        assert!(page.open_edit(99).await.unwrap_err().is_not_found());
        assert!(page.snapshot().await.editor.is_none());
    }

    #[tokio::test]
    async fn test_validation_error_keeps_editor_without_banner() {
        let store = students();
        let page = mounted(&store).await;

        page.open_create().await;
        page.edit(|e| e.set_text("first_name", "Mary")).await;
        let err = page.submit().await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        let model = page.snapshot().await;
        assert!(model.banner.is_none());
        assert!(model.form_error.is_some());
        assert_eq!(model.state, PageState::Ready);
        assert_eq!(model.editor.unwrap().text("first_name"), "Mary");
        assert_eq!(store.count(Collection::Student), 2);
    }

    #[tokio::test]
    async fn test_constraint_violation_sets_banner_and_keeps_input() {
        let store = students();
        let page = mounted(&store).await;

        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-1")).await;
        store.fail_next(Error::Constraint(ConstraintViolation {
            kind: ConstraintKind::Unique,
            message: "duplicate key value violates unique constraint \"student_ssid_key\"".into(),
            detail: Some("Key (ssid)=(S-1) already exists.".into()),
        }));

        assert!(page.submit().await.is_err());
        let model = page.snapshot().await;
        assert_eq!(
            model.banner.as_deref(),
            Some("A record with this identifier already exists.")
        );
        assert_eq!(model.items.len(), 2);
        assert_eq!(model.editor.unwrap().text("ssid"), "S-1");
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let store = students();
        let page = mounted(&store).await;

        let prompt = page.request_delete(1).await;
        assert_eq!(
            prompt,
            "Are you sure you want to delete this student? This action cannot be undone."
        );
        page.confirm_delete().await.unwrap();

        let model = page.snapshot().await;
        assert_eq!(model.items.len(), 1);
        assert!(model.pending_delete.is_none());
        assert_eq!(store.count(Collection::Student), 1);
    }

    #[tokio::test]
    async fn test_cancel_delete_keeps_record() {
        let store = students();
        let page = mounted(&store).await;

        page.request_delete(1).await;
        page.cancel_delete().await;
        page.confirm_delete().await.unwrap();
        assert_eq!(page.snapshot().await.items.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_harmless() {
        let store = students();
        let page = mounted(&store).await;

        page.request_delete(42).await;
        page.confirm_delete().await.unwrap();

        let model = page.snapshot().await;
        assert_eq!(model.items.len(), 2);
        assert!(model.banner.is_none());
    }

    #[tokio::test]
    async fn test_delete_already_gone_in_store() {
        let store = students();
        let page = mounted(&store).await;

        store.rows.lock().unwrap().insert(Collection::Student, vec![]);
        page.request_delete(1).await;
        page.confirm_delete().await.unwrap();
        assert_eq!(page.snapshot().await.items.len(), 1);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_busy() {
        let store = students();
        let page = mounted(&store).await;
        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-3")).await;

        let gate = store.gate.lock().await;
        let first = tokio::spawn({
            let page = page.clone();
            async move { page.submit().await }
        });
        wait_for_submitting(&page).await;

        assert!(matches!(page.submit().await, Err(Error::Busy)));
        page.request_delete(1).await;
        assert!(matches!(page.confirm_delete().await, Err(Error::Busy)));

        drop(gate);
        assert!(first.await.unwrap().is_ok());
        assert_eq!(page.snapshot().await.items.len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_during_save_keeps_save_in_charge() {
        let store = students();
        let page = mounted(&store).await;
        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-3")).await;

        let gate = store.gate.lock().await;
        let first = tokio::spawn({
            let page = page.clone();
            async move { page.submit().await }
        });
        wait_for_submitting(&page).await;

        page.mount().await.unwrap();
        assert_eq!(page.snapshot().await.state, PageState::Submitting);
        assert!(matches!(page.submit().await, Err(Error::Busy)));

        drop(gate);
        let created = first.await.unwrap().unwrap();

        let model = page.snapshot().await;
        assert_eq!(model.state, PageState::Ready);
        assert!(model.editor.is_none());
        assert!(model.items.iter().any(|s| s.id == created.id));
        assert_eq!(model.items.len(), 3);

        assert!(page.submit().await.is_err());
        assert_eq!(store.count(Collection::Student), 3);
    }

    #[tokio::test]
    async fn test_editor_opened_during_save_survives_it() {
        let store = students();
        let page = mounted(&store).await;
        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-3")).await;

        let gate = store.gate.lock().await;
        let pending = tokio::spawn({
            let page = page.clone();
            async move { page.submit().await }
        });
        wait_for_submitting(&page).await;

        page.open_edit(1).await.unwrap();
        page.edit(|e| e.set_text("school", "Elm Street")).await;
        drop(gate);
        assert!(pending.await.unwrap().is_ok());

        let model = page.snapshot().await;
        assert_eq!(model.items.len(), 3);
        let editor = model.editor.unwrap();
        assert_eq!(editor.mode(), Mode::Edit { id: 1 });
        assert_eq!(editor.text("school"), "Elm Street");
    }

    #[tokio::test]
    async fn test_late_response_after_unmount_is_discarded() {
        let store = students();
        let page = mounted(&store).await;
        page.open_create().await;
        page.edit(|e| fill_new_student(e, "S-3")).await;

        let gate = store.gate.lock().await;
        let pending = tokio::spawn({
            let page = page.clone();
            async move { page.submit().await }
        });
        wait_for_submitting(&page).await;

        page.unmount().await;
        drop(gate);
        assert!(pending.await.unwrap().is_ok());

        let model = page.snapshot().await;
        assert!(!model.is_mounted());
        assert!(model.items.is_empty());
        assert_eq!(model.state, PageState::Loading);
    }

    #[tokio::test]
    async fn test_service_page_derives_end_time() {
        let store = Arc::new(FakeStore::default());
        let page = PageController::<Service, _>::new(Arc::clone(&store));
        page.mount().await.unwrap();

        page.open_create().await;
        page.edit(|e| {
            e.set_text("student_id", "1");
            e.set_text("practitioner_id", "2");
            e.set_text("service_date", "2024-03-01");
            e.set_text("service_time", "09:00");
            e.set_text("duration_minutes", "45");
        })
        .await;
        let saved = page.submit().await.unwrap();

        assert_eq!(saved.end_time.as_deref(), Some("09:45"));
        assert_eq!(saved.status.as_str(), "Upcoming");
    }
}
