use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::domain::ApplicationStatus;

/// Identifier shared by every process (applications, requests) stored in the case tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Import applications result in licences, export applications in certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseType {
    Import,
    Export,
}

impl CaseType {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "import" => Some(Self::Import),
            "export" => Some(Self::Export),
            _ => None,
        }
    }
}

/// Concrete application kinds, keyed by their legacy process type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    #[serde(rename = "DerogationsApplication")]
    Derogations,
    #[serde(rename = "DFLApplication")]
    FaDfl,
    #[serde(rename = "OpenIndividualLicenceApplication")]
    FaOil,
    #[serde(rename = "SILApplication")]
    FaSil,
    #[serde(rename = "IronSteelApplication")]
    IronSteel,
    #[serde(rename = "OutwardProcessingTradeApplication")]
    Opt,
    #[serde(rename = "SanctionsAndAdhocApplication")]
    Sanctions,
    #[serde(rename = "PriorSurveillanceApplication")]
    Sps,
    #[serde(rename = "TextilesApplication")]
    Textiles,
    #[serde(rename = "WoodQuotaApplication")]
    Wood,
    #[serde(rename = "CertificateOfManufactureApplication")]
    Com,
    #[serde(rename = "CertificateOfFreeSaleApplication")]
    Cfs,
    #[serde(rename = "CertificateofGoodManufacturingPractice")]
    Gmp,
}

impl ProcessType {
    pub const IMPORT: [ProcessType; 10] = [
        Self::Derogations,
        Self::FaDfl,
        Self::FaOil,
        Self::FaSil,
        Self::IronSteel,
        Self::Opt,
        Self::Sanctions,
        Self::Sps,
        Self::Textiles,
        Self::Wood,
    ];

    pub const EXPORT: [ProcessType; 3] = [Self::Com, Self::Cfs, Self::Gmp];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Derogations => "DerogationsApplication",
            Self::FaDfl => "DFLApplication",
            Self::FaOil => "OpenIndividualLicenceApplication",
            Self::FaSil => "SILApplication",
            Self::IronSteel => "IronSteelApplication",
            Self::Opt => "OutwardProcessingTradeApplication",
            Self::Sanctions => "SanctionsAndAdhocApplication",
            Self::Sps => "PriorSurveillanceApplication",
            Self::Textiles => "TextilesApplication",
            Self::Wood => "WoodQuotaApplication",
            Self::Com => "CertificateOfManufactureApplication",
            Self::Cfs => "CertificateOfFreeSaleApplication",
            Self::Gmp => "CertificateofGoodManufacturingPractice",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Derogations => "Derogation from Sanctions Import Ban",
            Self::FaDfl => "Firearms and Ammunition (Deactivated Firearms Licence)",
            Self::FaOil => "Firearms and Ammunition (Open Individual Import Licence)",
            Self::FaSil => "Firearms and Ammunition (Specific Individual Import Licence)",
            Self::IronSteel => "Iron and Steel (Quota)",
            Self::Opt => "Outward Processing Trade",
            Self::Sanctions => "Sanctions and Adhoc Licence Application",
            Self::Sps => "Prior Surveillance",
            Self::Textiles => "Textiles (Quota)",
            Self::Wood => "Wood (Quota)",
            Self::Com => "Certificate of Manufacture",
            Self::Cfs => "Certificate of Free Sale",
            Self::Gmp => "Certificate of Good Manufacturing Practice",
        }
    }

    pub const fn case_type(self) -> CaseType {
        match self {
            Self::Com | Self::Cfs | Self::Gmp => CaseType::Export,
            _ => CaseType::Import,
        }
    }

    pub const fn is_firearms(self) -> bool {
        matches!(self, Self::FaDfl | Self::FaOil | Self::FaSil)
    }

    /// Sidebar heading shown to applicants while they complete the application.
    pub const fn application_details_link(self) -> &'static str {
        match self {
            Self::FaDfl | Self::FaOil | Self::FaSil => "Firearms and Ammunition",
            Self::Textiles => "Textiles",
            Self::Wood => "Wood",
            Self::Derogations => "Sanctions Derogation",
            Self::Sps => "Prior Surveillance",
            Self::Sanctions => "Sanctions and Adhoc",
            Self::Opt => "Outward Processing Trade",
            Self::Cfs => "CFS Application",
            Self::Com => "COM Application",
            Self::Gmp => "GMP Application",
            Self::IronSteel => "Application Details",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        Self::IMPORT
            .into_iter()
            .chain(Self::EXPORT)
            .find(|process_type| process_type.code() == value)
    }
}

/// Workflow stages a case moves through. At most one active task of each type per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Prepare,
    Process,
    VrRequestChange,
    Authorise,
    DocumentError,
    DocumentSigning,
    ChiefWait,
    ChiefRevokeWait,
    ChiefError,
    Rejected,
}

impl TaskType {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Process => "process",
            Self::VrRequestChange => "vr_request_change",
            Self::Authorise => "authorise",
            Self::DocumentError => "document_error",
            Self::DocumentSigning => "document_signing",
            Self::ChiefWait => "chief_wait",
            Self::ChiefRevokeWait => "chief_revoke_wait",
            Self::ChiefError => "chief_error",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Read access shared by every process type that owns a task chain.
pub trait Process {
    fn process_id(&self) -> ProcessId;
    fn is_active(&self) -> bool;
    fn status(&self) -> ApplicationStatus;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub process_id: ProcessId,
    pub task_type: TaskType,
    pub is_active: bool,
    pub created: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub previous: Option<TaskId>,
    pub owner: Option<UserId>,
}

/// Task rows for every process. Only reachable through a case unit of work.
#[derive(Debug, Clone, Default)]
pub struct TaskTable {
    tasks: BTreeMap<TaskId, Task>,
    next_id: u64,
}

impl TaskTable {
    /// Appends a task to the process chain. Does not check for an existing active task.
    pub fn create(
        &mut self,
        process_id: ProcessId,
        task_type: TaskType,
        previous: Option<TaskId>,
    ) -> Task {
        self.next_id += 1;
        let task = Task {
            id: TaskId(self.next_id),
            process_id,
            task_type,
            is_active: true,
            created: Utc::now(),
            finished: None,
            previous,
            owner: None,
        };
        self.tasks.insert(task.id, task.clone());
        task
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn for_process(&self, process_id: ProcessId) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(move |task| task.process_id == process_id)
    }

    pub fn active_for(&self, process_id: ProcessId) -> impl Iterator<Item = &Task> {
        self.for_process(process_id).filter(|task| task.is_active)
    }

    pub fn has_active(&self, process_id: ProcessId, task_type: TaskType) -> bool {
        self.active_for(process_id)
            .any(|task| task.task_type == task_type)
    }

    /// Marks the task finished, recording the user who completed it when known.
    pub fn end(&mut self, id: TaskId, owner: Option<UserId>) -> Option<&Task> {
        let task = self.tasks.get_mut(&id)?;
        task.is_active = false;
        task.finished = Some(Utc::now());
        if owner.is_some() {
            task.owner = owner;
        }
        Some(&*task)
    }

    pub fn end_all_active(&mut self, process_id: ProcessId) {
        let now = Utc::now();
        for task in self
            .tasks
            .values_mut()
            .filter(|task| task.process_id == process_id && task.is_active)
        {
            task.is_active = false;
            task.finished = Some(now);
        }
    }

    pub(crate) fn remove_process(&mut self, process_id: ProcessId) {
        self.tasks.retain(|_, task| task.process_id != process_id);
    }
}
