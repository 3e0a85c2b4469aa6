//! Field-level checks run before submission and before authorisation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::flow::{CaseType, ProcessType};

use super::document_pack::pack_draft_get;
use super::domain::{Application, ApplicationDetail, ApplicationStatus, Decision};
use super::repository::CaseTables;

pub const FIELD_REQUIRED: &str = "You must enter this item";
pub const LICENCE_MEDIUM_UNAVAILABLE: &str =
    "This licence type cannot be issued in the selected format.";

/// Errors keyed by field name, serialised as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn require<T>(&mut self, field: &str, value: Option<&T>) {
        if value.is_none() {
            self.add(field, FIELD_REQUIRED);
        }
    }

    pub fn require_any<T>(&mut self, field: &str, values: &[T]) {
        if values.is_empty() {
            self.add(field, FIELD_REQUIRED);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }
}

/// Missing type-specific data that prevents the applicant submitting.
pub fn get_submission_errors(application: &Application) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if application.organisation_name.trim().is_empty() {
        errors.add("organisation_name", FIELD_REQUIRED);
    }

    if !application.detail.matches(application.process_type) {
        errors.add("detail", "Application details do not match the application type");
        return errors;
    }

    match &application.detail {
        ApplicationDetail::Derogations {
            origin_country,
            consignment_country,
            commodity_code,
        }
        | ApplicationDetail::Sps {
            origin_country,
            consignment_country,
            commodity_code,
        } => {
            errors.require("origin_country", origin_country.as_ref());
            errors.require("consignment_country", consignment_country.as_ref());
            errors.require("commodity_code", commodity_code.as_ref());
        }
        ApplicationDetail::Firearms {
            origin_country,
            consignment_country,
            commodity,
        } => {
            errors.require("origin_country", origin_country.as_ref());
            errors.require("consignment_country", consignment_country.as_ref());
            errors.require("commodity_code", commodity.as_ref());
        }
        ApplicationDetail::IronSteel {
            origin_country,
            consignment_country,
            shipping_year,
            category_commodity_group,
            commodity_code,
        }
        | ApplicationDetail::Textiles {
            origin_country,
            consignment_country,
            shipping_year,
            category_commodity_group,
            commodity_code,
        } => {
            errors.require("origin_country", origin_country.as_ref());
            errors.require("consignment_country", consignment_country.as_ref());
            errors.require("shipping_year", shipping_year.as_ref());
            errors.require("category_commodity_group", category_commodity_group.as_ref());
            errors.require("commodity_code", commodity_code.as_ref());
        }
        ApplicationDetail::Opt {
            cp_origin_country,
            cp_processing_country,
            cp_category,
            cp_commodity_codes,
            ..
        } => {
            errors.require("cp_origin_country", cp_origin_country.as_ref());
            errors.require("cp_processing_country", cp_processing_country.as_ref());
            errors.require("cp_category", cp_category.as_ref());
            errors.require_any("cp_commodity_codes", cp_commodity_codes);
        }
        ApplicationDetail::Sanctions {
            origin_country,
            consignment_country,
            goods,
        } => {
            errors.require("origin_country", origin_country.as_ref());
            errors.require("consignment_country", consignment_country.as_ref());
            errors.require_any("goods", goods);
        }
        ApplicationDetail::Wood {
            shipping_year,
            commodity_code,
        } => {
            errors.require("shipping_year", shipping_year.as_ref());
            errors.require("commodity_code", commodity_code.as_ref());
        }
        ApplicationDetail::Export {
            countries, brands, ..
        } => {
            errors.require_any("countries", countries);
            if application.process_type == ProcessType::Gmp {
                errors.require_any("brands", brands);
            }
        }
    }

    errors
}

/// Problems that block the caseworker from starting authorisation.
pub fn get_app_errors(tables: &CaseTables, application: &Application) -> FieldErrors {
    let mut errors = FieldErrors::default();
    let variation = application.status == ApplicationStatus::VariationRequested
        && application.is_import_application();

    let (decision, refuse_reason) = if variation {
        (
            application.variation_decision,
            application.variation_refuse_reason.as_deref(),
        )
    } else {
        (application.decision, application.refuse_reason.as_deref())
    };

    match decision {
        None => errors.add("decision", FIELD_REQUIRED),
        Some(Decision::Refuse) if refuse_reason.map_or(true, |reason| reason.trim().is_empty()) => {
            errors.add("refuse_reason", FIELD_REQUIRED)
        }
        _ => {}
    }

    if application.application_type().case_checklist_flag
        && !application
            .checklist
            .as_ref()
            .is_some_and(|checklist| checklist.is_complete())
    {
        errors.add("checklist", "Please complete checklist prior to authorising.");
    }

    if application.has_open_firs() {
        errors.add(
            "further_information_requests",
            "Please close or withdraw open further information requests.",
        );
    }

    if application.has_open_update_requests() {
        errors.add(
            "update_requests",
            "Please close open update requests prior to authorising.",
        );
    }

    if application.case_type() == CaseType::Export && application.has_open_case_emails() {
        errors.add("case_emails", "Please close open case emails prior to authorising.");
    }

    if application.is_import_application() && decision == Some(Decision::Approve) {
        match pack_draft_get(tables, application.id) {
            Ok(draft) => {
                errors.require("licence_start_date", draft.licence_start_date.as_ref());
                errors.require("licence_end_date", draft.licence_end_date.as_ref());
                match draft.issue_paper_licence_only {
                    None => errors.add("issue_paper_licence_only", FIELD_REQUIRED),
                    Some(paper_only)
                        if !application
                            .application_type()
                            .supports_paper_licence_only(paper_only) =>
                    {
                        errors.add("issue_paper_licence_only", LICENCE_MEDIUM_UNAVAILABLE)
                    }
                    Some(_) => {}
                }
            }
            Err(_) => errors.add("licence", "No draft licence exists for this application."),
        }
    }

    errors
}
