//! Import and export application case management.
//!
//! Every operation loads the application and checks its active task inside one repository unit
//! of work, so a case can only move along the workflow from the state a caseworker last saw.

pub mod checks;
pub mod document_pack;
pub mod domain;
pub mod reference;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use checks::{get_app_errors, get_submission_errors, FieldErrors};
pub use document_pack::{CaseDocumentReference, DocumentPack, LicenceUpdate, PackId, PackStatus};
pub use domain::{
    Application, ApplicationDetail, ApplicationStatus, CaseEmail, Checklist, Decision,
    FurtherInformationRequest, NewApplication, UpdateRequest, User,
};
pub use repository::{CaseRepository, CaseTables, InMemoryCaseRepository, RepositoryError};
pub use router::case_router;
pub use service::{CaseError, CaseService, CaseView, DecisionInput, RevokeInput};
