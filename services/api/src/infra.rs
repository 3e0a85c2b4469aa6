use chrono::NaiveDate;
use icms::chief::{ChiefClient, ChiefError, LicencePayload};
use icms::flow::CaseType;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// CHIEF adapter for environments without a live HMRC link: payloads are logged and accepted.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingChiefClient;

impl ChiefClient for LoggingChiefClient {
    fn send_licence(&self, payload: &LicencePayload) -> Result<(), ChiefError> {
        info!(
            action = ?payload.action,
            licence_type = ?payload.licence_type,
            case_reference = %payload.case_reference,
            licence_reference = %payload.licence_reference,
            "licence payload queued for CHIEF"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_case_type(raw: &str) -> Result<CaseType, String> {
    CaseType::from_code(&raw.trim().to_ascii_lowercase())
        .ok_or_else(|| format!("'{raw}' is not a case type (expected import or export)"))
}
