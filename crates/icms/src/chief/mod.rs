//! Licence hand-off to CHIEF (HMRC) and the reply callbacks that close it out.

mod client;
mod reply;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::document_pack::DocumentPackError;
use crate::flow::{ProcessId, ProcessType};

pub use client::{send_application_to_chief, ChiefAction, ChiefClient, ChiefLicenceType, LicencePayload};
pub use reply::{
    chief_licence_reply_approve_licence, chief_licence_reply_reject_licence,
    complete_chief_request, fail_chief_request, failed_licences, pending_licences,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChiefRequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChiefRequestStatus {
    Processing,
    Success,
    Error,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChiefResponseError {
    pub error_code: String,
    pub error_msg: String,
}

/// One licence submission to CHIEF and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChiefRequest {
    pub id: ChiefRequestId,
    pub process_id: ProcessId,
    pub case_reference: String,
    /// `None` when sending is disabled and the request was only recorded.
    pub request_data: Option<LicencePayload>,
    pub request_sent_datetime: DateTime<Utc>,
    pub response_received_datetime: Option<DateTime<Utc>>,
    pub status: ChiefRequestStatus,
    pub response_errors: Vec<ChiefResponseError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChiefError {
    #[error("{0:?} licences are not sent to CHIEF")]
    UnsupportedProcessType(ProcessType),
    #[error("application {0} has no licence document to send")]
    MissingLicence(ProcessId),
    #[error(transparent)]
    DocumentPack(#[from] DocumentPackError),
    #[error("CHIEF transport unavailable: {0}")]
    Transport(String),
}
