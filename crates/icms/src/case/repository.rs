use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::chief::{ChiefRequest, ChiefRequestId};
use crate::flow::{self, ProcessId, Task, TaskTable, TaskType};

use super::document_pack::{
    CaseDocumentReference, DocumentPack, DocumentReferenceId, PackId,
};
use super::domain::{Application, ApplicationStatus};
use super::service::CaseError;

/// Every table touched by case workflows. Only handed out inside a repository unit of work,
/// so anything holding `&mut CaseTables` holds the store lock.
#[derive(Debug, Clone)]
pub struct CaseTables {
    applications: BTreeMap<ProcessId, Application>,
    tasks: TaskTable,
    packs: BTreeMap<PackId, DocumentPack>,
    document_references: BTreeMap<DocumentReferenceId, CaseDocumentReference>,
    unique_references: BTreeMap<(String, Option<i32>), u32>,
    chief_requests: BTreeMap<ChiefRequestId, ChiefRequest>,
    next_process_id: u64,
    next_pack_id: u64,
    next_document_reference_id: u64,
    next_chief_request_id: u64,
    next_record_id: u64,
}

impl CaseTables {
    pub(crate) fn empty() -> Self {
        Self {
            applications: BTreeMap::new(),
            tasks: TaskTable::default(),
            packs: BTreeMap::new(),
            document_references: BTreeMap::new(),
            unique_references: BTreeMap::new(),
            chief_requests: BTreeMap::new(),
            next_process_id: 0,
            next_pack_id: 0,
            next_document_reference_id: 0,
            next_chief_request_id: 0,
            next_record_id: 0,
        }
    }

    pub fn application(&self, id: ProcessId) -> Result<&Application, RepositoryError> {
        self.applications
            .get(&id)
            .ok_or(RepositoryError::NotFound(id))
    }

    pub fn application_mut(&mut self, id: ProcessId) -> Result<&mut Application, RepositoryError> {
        self.applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn next_process_id(&mut self) -> ProcessId {
        self.next_process_id += 1;
        ProcessId(self.next_process_id)
    }

    pub fn insert_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        if self.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict(application.id));
        }
        self.applications.insert(application.id, application);
        Ok(())
    }

    pub fn save_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        let slot = self.application_mut(application.id)?;
        *slot = application;
        Ok(())
    }

    /// Deletes the application along with its task chain, packs and document references.
    pub fn remove_application(&mut self, id: ProcessId) -> Result<Application, RepositoryError> {
        let application = self
            .applications
            .remove(&id)
            .ok_or(RepositoryError::NotFound(id))?;

        self.tasks.remove_process(id);
        let pack_ids: Vec<PackId> = self
            .packs
            .values()
            .filter(|pack| pack.process_id == id)
            .map(|pack| pack.id)
            .collect();
        for pack_id in &pack_ids {
            self.packs.remove(pack_id);
        }
        self.document_references
            .retain(|_, reference| !pack_ids.contains(&reference.pack_id));

        Ok(application)
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskTable {
        &mut self.tasks
    }

    /// Loads the application and its single active task of `task_type`, checking the status.
    pub fn get_task(
        &self,
        id: ProcessId,
        expected_state: &[ApplicationStatus],
        task_type: TaskType,
    ) -> Result<Task, CaseError> {
        let application = self.application(id)?;
        Ok(flow::get_task(
            &self.tasks,
            application,
            expected_state,
            task_type,
        )?)
    }

    pub fn packs_for(&self, process_id: ProcessId) -> impl Iterator<Item = &DocumentPack> {
        self.packs
            .values()
            .filter(move |pack| pack.process_id == process_id)
    }

    pub fn pack_mut(&mut self, id: PackId) -> Option<&mut DocumentPack> {
        self.packs.get_mut(&id)
    }

    pub fn next_pack_id(&mut self) -> PackId {
        self.next_pack_id += 1;
        PackId(self.next_pack_id)
    }

    pub fn insert_pack(&mut self, pack: DocumentPack) {
        self.packs.insert(pack.id, pack);
    }

    pub fn document_references_for(
        &self,
        pack_id: PackId,
    ) -> impl Iterator<Item = &CaseDocumentReference> {
        self.document_references
            .values()
            .filter(move |reference| reference.pack_id == pack_id)
    }

    pub fn next_document_reference_id(&mut self) -> DocumentReferenceId {
        self.next_document_reference_id += 1;
        DocumentReferenceId(self.next_document_reference_id)
    }

    pub fn insert_document_reference(&mut self, reference: CaseDocumentReference) {
        self.document_references.insert(reference.id, reference);
    }

    pub fn remove_document_references(&mut self, pack_id: PackId) {
        self.document_references
            .retain(|_, reference| reference.pack_id != pack_id);
    }

    /// Next value of the `(prefix, year)` sequence, starting at one.
    pub fn next_unique_reference(&mut self, prefix: &str, year: Option<i32>) -> u32 {
        let last = self
            .unique_references
            .entry((prefix.to_string(), year))
            .or_insert(0);
        *last += 1;
        *last
    }

    pub fn chief_requests(&self) -> impl Iterator<Item = &ChiefRequest> {
        self.chief_requests.values()
    }

    pub fn chief_request_mut(&mut self, id: ChiefRequestId) -> Option<&mut ChiefRequest> {
        self.chief_requests.get_mut(&id)
    }

    pub fn next_chief_request_id(&mut self) -> ChiefRequestId {
        self.next_chief_request_id += 1;
        ChiefRequestId(self.next_chief_request_id)
    }

    pub fn insert_chief_request(&mut self, request: ChiefRequest) {
        self.chief_requests.insert(request.id, request);
    }

    /// Identifier for records owned by an application (variations, withdrawals, FIRs).
    pub fn next_record_id(&mut self) -> u64 {
        self.next_record_id += 1;
        self.next_record_id
    }
}

/// Storage abstraction so the case service can be exercised in isolation.
pub trait CaseRepository: Send + Sync {
    /// Runs `work` with exclusive access to the tables. Changes are kept only when it succeeds.
    fn atomic<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut CaseTables) -> Result<T, E>,
        E: From<RepositoryError>;

    fn read<T, F>(&self, query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&CaseTables) -> T;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("application {0} already exists")]
    Conflict(ProcessId),
    #[error("application {0} not found")]
    NotFound(ProcessId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone)]
pub struct InMemoryCaseRepository {
    tables: Arc<Mutex<CaseTables>>,
}

impl Default for InMemoryCaseRepository {
    fn default() -> Self {
        Self {
            tables: Arc::new(Mutex::new(CaseTables::empty())),
        }
    }
}

impl CaseRepository for InMemoryCaseRepository {
    fn atomic<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut CaseTables) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("case tables lock poisoned".to_string()))?;

        let mut staged = guard.clone();
        let value = work(&mut staged)?;
        *guard = staged;
        Ok(value)
    }

    fn read<T, F>(&self, query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&CaseTables) -> T,
    {
        let guard = self
            .tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("case tables lock poisoned".to_string()))?;
        Ok(query(&guard))
    }
}
