use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::{CaseType, Process, ProcessId, ProcessType, UserId};

/// Lifecycle status shared by import and export applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    InProgress,
    Submitted,
    Processing,
    Completed,
    Withdrawn,
    Stopped,
    Revoked,
    VariationRequested,
}

impl ApplicationStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Submitted => "SUBMITTED",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Withdrawn => "WITHDRAWN",
            Self::Stopped => "STOPPED",
            Self::Revoked => "REVOKED",
            Self::VariationRequested => "VARIATION_REQUESTED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Submitted => "Submitted",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Withdrawn => "Withdrawn",
            Self::Stopped => "Stopped",
            Self::Revoked => "Revoked",
            Self::VariationRequested => "Variation Requested",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        [
            Self::InProgress,
            Self::Submitted,
            Self::Processing,
            Self::Completed,
            Self::Withdrawn,
            Self::Stopped,
            Self::Revoked,
            Self::VariationRequested,
        ]
        .into_iter()
        .find(|status| status.code() == value)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    Refuse,
}

impl Decision {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Refuse => "REFUSE",
        }
    }
}

/// Licence usage reported back by CHIEF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChiefUsageStatus {
    #[serde(rename = "C")]
    Cancelled,
    #[serde(rename = "E")]
    Exhausted,
    #[serde(rename = "D")]
    Expired,
    #[serde(rename = "S")]
    Surrendered,
}

impl ChiefUsageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cancelled => "Cancelled",
            Self::Exhausted => "Exhausted",
            Self::Expired => "Expired",
            Self::Surrendered => "Surrendered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirearmCommodity {
    ExChapter93,
    ExChapter97,
}

impl FirearmCommodity {
    pub const fn code(self) -> &'static str {
        match self {
            Self::ExChapter93 => "EX_CHAPTER_93",
            Self::ExChapter97 => "EX_CHAPTER_97",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ExChapter93 => "Goods outside Chapter 93",
            Self::ExChapter97 => "Goods outside Chapter 97",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        [Self::ExChapter93, Self::ExChapter97]
            .into_iter()
            .find(|commodity| commodity.code() == value)
    }
}

/// Applicant contacts and caseworkers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityGroup {
    pub group_code: String,
    pub group_name: String,
}

/// Static reference data per application type, mirroring the seeded application type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplicationType {
    pub process_type: ProcessType,
    pub type_code: &'static str,
    pub type_label: &'static str,
    pub sub_type: Option<&'static str>,
    pub sub_type_label: Option<&'static str>,
    pub chief_flag: bool,
    pub paper_licence_flag: bool,
    pub electronic_licence_flag: bool,
    pub case_checklist_flag: bool,
}

impl ApplicationType {
    pub const fn for_process(process_type: ProcessType) -> Self {
        let (type_code, type_label, sub_type, sub_type_label) = match process_type {
            ProcessType::Derogations => ("SAN", "Derogation from Sanctions Import Ban", None, None),
            ProcessType::FaDfl => (
                "FA",
                "Firearms and Ammunition",
                Some("DEACTIVATED"),
                Some("Deactivated Firearms Import Certificate"),
            ),
            ProcessType::FaOil => (
                "FA",
                "Firearms and Ammunition",
                Some("OIL"),
                Some("Open Individual Import Licence"),
            ),
            ProcessType::FaSil => (
                "FA",
                "Firearms and Ammunition",
                Some("SIL"),
                Some("Specific Individual Import Licence"),
            ),
            ProcessType::IronSteel => ("IS", "Iron and Steel (Quota)", Some("QUOTA"), None),
            ProcessType::Opt => ("OPT", "Outward Processing Trade", Some("QUOTA"), None),
            ProcessType::Sanctions => (
                "ADHOC",
                "Sanctions and Adhoc Licence Application",
                Some("ADHOC1"),
                None,
            ),
            ProcessType::Sps => ("SPS", "Prior Surveillance", Some("SPS1"), None),
            ProcessType::Textiles => ("TEX", "Textiles (Quota)", Some("QUOTA"), None),
            ProcessType::Wood => ("WD", "Wood (Quota)", Some("QUOTA"), None),
            ProcessType::Com => ("COM", "Certificate of Manufacture", None, None),
            ProcessType::Cfs => ("CFS", "Certificate of Free Sale", None, None),
            ProcessType::Gmp => ("GMP", "Certificate of Good Manufacturing Practice", None, None),
        };

        // chief, paper, electronic, checklist
        let (chief_flag, paper_licence_flag, electronic_licence_flag, case_checklist_flag) =
            match process_type {
                ProcessType::FaDfl | ProcessType::FaSil | ProcessType::Textiles => {
                    (true, true, true, true)
                }
                ProcessType::FaOil | ProcessType::Sanctions => (true, false, true, true),
                ProcessType::Sps => (true, true, true, false),
                ProcessType::Derogations | ProcessType::Opt | ProcessType::Wood => {
                    (false, true, false, true)
                }
                ProcessType::IronSteel => (false, true, false, false),
                ProcessType::Com | ProcessType::Cfs | ProcessType::Gmp => {
                    (false, false, false, true)
                }
            };

        Self {
            process_type,
            type_code,
            type_label,
            sub_type,
            sub_type_label,
            chief_flag,
            paper_licence_flag,
            electronic_licence_flag,
            case_checklist_flag,
        }
    }

    /// Whether a licence issued on paper only (`true`) or electronically (`false`) is available.
    pub const fn supports_paper_licence_only(&self, paper_only: bool) -> bool {
        if paper_only {
            self.paper_licence_flag
        } else {
            self.electronic_licence_flag
        }
    }

    /// Initial paper-only flag for a new licence; `None` leaves the choice to the caseworker.
    pub const fn initial_paper_licence_only(&self) -> Option<bool> {
        match (self.paper_licence_flag, self.electronic_licence_flag) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrespondenceStatus {
    Draft,
    Open,
    Responded,
    Closed,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateRequestStatus {
    Draft,
    Open,
    UpdateInProgress,
    Responded,
    Closed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurtherInformationRequest {
    pub id: u64,
    pub status: CorrespondenceStatus,
    pub request_subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub id: u64,
    pub status: UpdateRequestStatus,
    pub request_subject: String,
}

/// Emails sent to other government departments (BEIS for GMP, HSE for CFS, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseEmail {
    pub id: u64,
    pub status: CorrespondenceStatus,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariationRequestStatus {
    Draft,
    Open,
    Accepted,
    Rejected,
    Withdrawn,
    Cancelled,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationRequest {
    pub id: u64,
    pub status: VariationRequestStatus,
    pub what_varied: String,
    pub requested_by: UserId,
    pub requested_datetime: DateTime<Utc>,
    pub closed_datetime: Option<DateTime<Utc>>,
    pub reject_cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Open,
    Accepted,
    Rejected,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawApplication {
    pub id: u64,
    pub status: WithdrawalStatus,
    pub reason: String,
    pub request_by: UserId,
    pub response_by: Option<UserId>,
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistAnswer {
    Yes,
    No,
    NotApplicable,
}

/// Caseworker checklist completed before a licence or certificate can be authorised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub case_update: Option<ChecklistAnswer>,
    pub fir_required: Option<ChecklistAnswer>,
    pub validity_period_correct: Option<ChecklistAnswer>,
    pub endorsements_listed: Option<ChecklistAnswer>,
    #[serde(default)]
    pub response_preparation: bool,
    #[serde(default)]
    pub authorisation: bool,
}

impl Checklist {
    pub fn is_complete(&self) -> bool {
        self.case_update.is_some()
            && self.fir_required.is_some()
            && self.validity_period_correct.is_some()
            && self.endorsements_listed.is_some()
            && self.response_preparation
            && self.authorisation
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionsGoods {
    pub commodity_code: String,
    pub goods_description: String,
}

/// Type-specific application data read by workflow checks and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationDetail {
    Derogations {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        commodity_code: Option<String>,
    },
    Firearms {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        commodity: Option<FirearmCommodity>,
    },
    IronSteel {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        shipping_year: Option<i32>,
        category_commodity_group: Option<CommodityGroup>,
        commodity_code: Option<String>,
    },
    Opt {
        cp_origin_country: Option<String>,
        cp_processing_country: Option<String>,
        cp_category: Option<String>,
        #[serde(default)]
        cp_commodity_codes: Vec<String>,
        #[serde(default)]
        teg_commodity_codes: Vec<String>,
    },
    Sanctions {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        #[serde(default)]
        goods: Vec<SanctionsGoods>,
    },
    Sps {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        commodity_code: Option<String>,
    },
    Textiles {
        origin_country: Option<String>,
        consignment_country: Option<String>,
        shipping_year: Option<i32>,
        category_commodity_group: Option<CommodityGroup>,
        commodity_code: Option<String>,
    },
    Wood {
        shipping_year: Option<i32>,
        commodity_code: Option<String>,
    },
    Export {
        #[serde(default)]
        countries: Vec<String>,
        #[serde(default)]
        manufacturer_countries: Vec<String>,
        #[serde(default)]
        brands: Vec<String>,
    },
}

impl ApplicationDetail {
    /// Whether this detail shape belongs to the given process type.
    pub fn matches(&self, process_type: ProcessType) -> bool {
        matches!(
            (self, process_type),
            (Self::Derogations { .. }, ProcessType::Derogations)
                | (
                    Self::Firearms { .. },
                    ProcessType::FaDfl | ProcessType::FaOil | ProcessType::FaSil
                )
                | (Self::IronSteel { .. }, ProcessType::IronSteel)
                | (Self::Opt { .. }, ProcessType::Opt)
                | (Self::Sanctions { .. }, ProcessType::Sanctions)
                | (Self::Sps { .. }, ProcessType::Sps)
                | (Self::Textiles { .. }, ProcessType::Textiles)
                | (Self::Wood { .. }, ProcessType::Wood)
                | (
                    Self::Export { .. },
                    ProcessType::Com | ProcessType::Cfs | ProcessType::Gmp
                )
        )
    }

    /// An empty detail of the right shape, used when an application is first created.
    pub fn empty(process_type: ProcessType) -> Self {
        match process_type {
            ProcessType::Derogations => Self::Derogations {
                origin_country: None,
                consignment_country: None,
                commodity_code: None,
            },
            ProcessType::FaDfl | ProcessType::FaOil | ProcessType::FaSil => Self::Firearms {
                origin_country: None,
                consignment_country: None,
                commodity: None,
            },
            ProcessType::IronSteel => Self::IronSteel {
                origin_country: None,
                consignment_country: None,
                shipping_year: None,
                category_commodity_group: None,
                commodity_code: None,
            },
            ProcessType::Opt => Self::Opt {
                cp_origin_country: None,
                cp_processing_country: None,
                cp_category: None,
                cp_commodity_codes: Vec::new(),
                teg_commodity_codes: Vec::new(),
            },
            ProcessType::Sanctions => Self::Sanctions {
                origin_country: None,
                consignment_country: None,
                goods: Vec::new(),
            },
            ProcessType::Sps => Self::Sps {
                origin_country: None,
                consignment_country: None,
                commodity_code: None,
            },
            ProcessType::Textiles => Self::Textiles {
                origin_country: None,
                consignment_country: None,
                shipping_year: None,
                category_commodity_group: None,
                commodity_code: None,
            },
            ProcessType::Wood => Self::Wood {
                shipping_year: None,
                commodity_code: None,
            },
            ProcessType::Com | ProcessType::Cfs | ProcessType::Gmp => Self::Export {
                countries: Vec::new(),
                manufacturer_countries: Vec::new(),
                brands: Vec::new(),
            },
        }
    }
}

/// Payload used by applicants to start a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub process_type: ProcessType,
    pub contact: User,
    pub organisation_name: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub applicant_reference: Option<String>,
    #[serde(default)]
    pub detail: Option<ApplicationDetail>,
}

/// An import or export application. Every application is also a workflow process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ProcessId,
    pub process_type: ProcessType,
    pub is_active: bool,
    pub status: ApplicationStatus,
    pub reference: Option<String>,
    pub applicant_reference: Option<String>,
    pub decision: Option<Decision>,
    pub refuse_reason: Option<String>,
    pub variation_decision: Option<Decision>,
    pub variation_refuse_reason: Option<String>,
    pub case_owner: Option<User>,
    pub created: DateTime<Utc>,
    pub submit_datetime: Option<DateTime<Utc>>,
    pub submitted_by: Option<UserId>,
    pub order_datetime: DateTime<Utc>,
    pub contact: User,
    pub organisation_name: String,
    pub agent_name: Option<String>,
    pub chief_usage_status: Option<ChiefUsageStatus>,
    pub licence_reference: Option<u32>,
    pub checklist: Option<Checklist>,
    pub variation_requests: Vec<VariationRequest>,
    pub further_information_requests: Vec<FurtherInformationRequest>,
    pub update_requests: Vec<UpdateRequest>,
    pub case_emails: Vec<CaseEmail>,
    pub withdrawals: Vec<WithdrawApplication>,
    pub detail: ApplicationDetail,
}

impl Application {
    pub const DEFAULT_REF: &'static str = "Not Assigned";

    pub fn get_reference(&self) -> &str {
        self.reference.as_deref().unwrap_or(Self::DEFAULT_REF)
    }

    pub fn case_type(&self) -> CaseType {
        self.process_type.case_type()
    }

    pub fn is_import_application(&self) -> bool {
        self.case_type() == CaseType::Import
    }

    pub fn application_type(&self) -> ApplicationType {
        ApplicationType::for_process(self.process_type)
    }

    pub fn current_update_requests(&self) -> impl Iterator<Item = &UpdateRequest> {
        self.update_requests.iter().filter(|request| {
            matches!(
                request.status,
                UpdateRequestStatus::Open
                    | UpdateRequestStatus::UpdateInProgress
                    | UpdateRequestStatus::Responded
            )
        })
    }

    pub fn has_open_firs(&self) -> bool {
        self.further_information_requests
            .iter()
            .any(|fir| fir.status == CorrespondenceStatus::Open)
    }

    pub fn has_open_update_requests(&self) -> bool {
        self.update_requests
            .iter()
            .any(|request| request.status == UpdateRequestStatus::Open)
    }

    pub fn has_open_case_emails(&self) -> bool {
        self.case_emails
            .iter()
            .any(|email| email.status == CorrespondenceStatus::Open)
    }

    pub fn open_variation_request_mut(&mut self) -> Option<&mut VariationRequest> {
        self.variation_requests
            .iter_mut()
            .find(|vr| vr.status == VariationRequestStatus::Open)
    }

    /// Closes the open variation request, if any, with the given outcome.
    pub fn close_open_variation(&mut self, status: VariationRequestStatus) {
        if let Some(variation) = self.open_variation_request_mut() {
            variation.status = status;
            variation.closed_datetime = Some(Utc::now());
        }
    }

    pub fn open_withdrawal_mut(&mut self) -> Option<&mut WithdrawApplication> {
        self.withdrawals
            .iter_mut()
            .find(|withdrawal| withdrawal.status == WithdrawalStatus::Open)
    }
}

impl Process for Application {
    fn process_id(&self) -> ProcessId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn status(&self) -> ApplicationStatus {
        self.status
    }
}
