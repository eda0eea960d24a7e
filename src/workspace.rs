use crate::chart::{ChartConfig, ChartData, project};
use crate::dataset::{Dataset, DatasetError, FieldUpdate, RawRecord};
use crate::field::{Field, FieldType, Row};
use crate::import::{self, ImportError, ImportPreview};
use crate::login::verify_credentials;
use crate::storage::{KeyValueStore, StorageError};
use log::{info, warn};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const AUTH_KEY: &str = "sheetviz.authenticated";
pub const FIELDS_KEY: &str = "sheetviz.fields";
pub const ROWS_KEY: &str = "sheetviz.rows";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("an import is already being processed")]
    ImportInProgress,

    #[error("there is no import preview to confirm")]
    NoPendingImport,

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Application state owned by the top-level controller: the login flag,
/// the live dataset, a pending import preview and the import-in-progress
/// flag. Every dataset change is written to the store while logged in.
pub struct Workspace {
    store: Box<dyn KeyValueStore>,
    authenticated: bool,
    dataset: Dataset,
    preview: Option<ImportPreview>,
    processing: bool,
}

impl Workspace {
    /// Restore state from `store`. Unreadable entries are logged and ignored.
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        let authenticated = match store.get(AUTH_KEY) {
            Ok(flag) => flag.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read the authentication flag: {}", e);
                false
            }
        };

        let fields: Vec<Field> = load_entry(&*store, FIELDS_KEY);
        let rows: Vec<Row> = load_entry(&*store, ROWS_KEY);
        info!(
            "Workspace opened with {} fields and {} rows",
            fields.len(),
            rows.len()
        );

        Workspace {
            store,
            authenticated,
            dataset: Dataset::from_parts(fields, rows),
            preview: None,
            processing: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn preview(&self) -> Option<&ImportPreview> {
        self.preview.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), WorkspaceError> {
        if !verify_credentials(username, password) {
            warn!("Rejected login attempt for `{}`", username);
            return Err(WorkspaceError::InvalidCredentials);
        }
        self.authenticated = true;
        self.store.set(AUTH_KEY, "true".to_string())?;
        self.persist()?;
        info!("User `{}` logged in", username);
        Ok(())
    }

    /// Clear the login flag; the stored dataset is kept for the next login.
    pub fn logout(&mut self) -> Result<(), WorkspaceError> {
        self.authenticated = false;
        self.preview = None;
        self.store.remove(AUTH_KEY)?;
        info!("User logged out");
        Ok(())
    }

    fn require_auth(&self) -> Result<(), WorkspaceError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(WorkspaceError::NotAuthenticated)
        }
    }

    fn persist(&mut self) -> Result<(), WorkspaceError> {
        if !self.authenticated {
            return Ok(());
        }
        let fields = serde_json::to_string(&self.dataset.fields).map_err(StorageError::from)?;
        let rows = serde_json::to_string(&self.dataset.rows).map_err(StorageError::from)?;
        self.store.set(FIELDS_KEY, fields)?;
        self.store.set(ROWS_KEY, rows)?;
        Ok(())
    }

    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        required: bool,
    ) -> Result<Field, WorkspaceError> {
        self.require_auth()?;
        let field = self.dataset.add_field(name, field_type, required)?.clone();
        self.persist()?;
        Ok(field)
    }

    pub fn update_field(&mut self, id: &str, update: FieldUpdate) -> Result<Field, WorkspaceError> {
        self.require_auth()?;
        let field = self.dataset.update_field(id, update)?.clone();
        self.persist()?;
        Ok(field)
    }

    pub fn delete_field(&mut self, id: &str) -> Result<Field, WorkspaceError> {
        self.require_auth()?;
        let field = self.dataset.delete_field(id)?;
        self.persist()?;
        Ok(field)
    }

    pub fn move_field(&mut self, id: &str, index: usize) -> Result<(), WorkspaceError> {
        self.require_auth()?;
        self.dataset.move_field(id, index)?;
        self.persist()
    }

    pub fn add_row(&mut self, record: &RawRecord) -> Result<Row, WorkspaceError> {
        self.require_auth()?;
        let row = self.dataset.add_row(record)?.clone();
        self.persist()?;
        Ok(row)
    }

    pub fn update_row(&mut self, id: &str, record: &RawRecord) -> Result<Row, WorkspaceError> {
        self.require_auth()?;
        let row = self.dataset.update_row(id, record)?.clone();
        self.persist()?;
        Ok(row)
    }

    pub fn delete_row(&mut self, id: &str) -> Result<Row, WorkspaceError> {
        self.require_auth()?;
        let row = self.dataset.delete_row(id)?;
        self.persist()?;
        Ok(row)
    }

    /// Mark an import as in flight. Rejects a second import until
    /// [`Workspace::finish_import`] runs.
    pub fn begin_import(&mut self) -> Result<(), WorkspaceError> {
        self.require_auth()?;
        if self.processing {
            return Err(WorkspaceError::ImportInProgress);
        }
        self.processing = true;
        Ok(())
    }

    /// Run the import pipeline on the uploaded bytes and keep the result as
    /// the pending preview. The processing flag is cleared whatever the
    /// outcome and the live dataset is never touched here.
    pub fn finish_import(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&ImportPreview, WorkspaceError> {
        self.processing = false;
        self.require_auth()?;

        match import::import_bytes(file_name, bytes) {
            Ok(preview) => {
                let preview = self.preview.insert(preview);
                Ok(&*preview)
            }
            Err(e) => {
                warn!("Import of {} failed: {}", file_name, e);
                Err(e.into())
            }
        }
    }

    /// Clear the processing flag after the upload itself failed.
    pub fn abort_import(&mut self) {
        self.processing = false;
    }

    /// [`Workspace::begin_import`] and [`Workspace::finish_import`] in one step.
    pub fn import_bytes(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&ImportPreview, WorkspaceError> {
        self.begin_import()?;
        self.finish_import(file_name, bytes)
    }

    /// Replace the live dataset with the pending preview.
    pub fn confirm_import(&mut self) -> Result<&Dataset, WorkspaceError> {
        self.require_auth()?;
        let preview = self.preview.take().ok_or(WorkspaceError::NoPendingImport)?;
        info!(
            "Replacing dataset with import of {} ({} fields, {} rows)",
            preview.source,
            preview.fields.len(),
            preview.rows.len()
        );
        self.dataset.replace(preview.fields, preview.rows);
        self.persist()?;
        Ok(&self.dataset)
    }

    /// Drop the pending preview; returns whether there was one.
    pub fn cancel_import(&mut self) -> bool {
        self.preview.take().is_some()
    }

    /// Replace the live dataset with a restored snapshot.
    pub fn restore(&mut self, dataset: Dataset) -> Result<&Dataset, WorkspaceError> {
        self.require_auth()?;
        self.dataset = dataset;
        self.persist()?;
        Ok(&self.dataset)
    }

    pub fn chart(&self, config: &ChartConfig) -> ChartData {
        project(&self.dataset, config)
    }
}

fn load_entry<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!("Failed to read `{}`: {}", key, e);
            return T::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Discarding malformed `{}`: {}", key, e);
        T::default()
    })
}
