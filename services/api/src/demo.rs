use crate::infra::LoggingChiefClient;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use clap::Args;
use icms::case::domain::{ChecklistAnswer, FirearmCommodity};
use icms::case::{
    Application, ApplicationDetail, CaseError, CaseRepository, CaseService, Checklist, Decision,
    DecisionInput, InMemoryCaseRepository, LicenceUpdate, NewApplication, User,
};
use icms::chief::ChiefClient;
use icms::config::IcmsConfig;
use icms::error::AppError;
use icms::flow::{CaseType, ProcessType, UserId};
use icms::search::{ResultRow, SearchResults, SearchTerms};
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = CaseService<InMemoryCaseRepository, LoggingChiefClient>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Build CHIEF payloads for electronic licences instead of only recording the request.
    #[arg(long)]
    pub(crate) send_to_chief: bool,
    /// Maximum number of rows shown in each search summary.
    #[arg(long, default_value_t = 10)]
    pub(crate) limit: usize,
}

/// Searches run against the sample applications the demo seeds, since storage is in memory.
#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Case type to search (import or export)
    #[arg(long, value_parser = crate::infra::parse_case_type)]
    pub(crate) case_type: CaseType,
    /// Case reference, `%` matches any run of characters
    #[arg(long)]
    pub(crate) case_ref: Option<String>,
    /// Status code such as SUBMITTED or PROCESSING
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Earliest submission date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) submitted_from: Option<NaiveDate>,
    /// Maximum number of rows to print
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Write every matching row to this CSV file instead of printing
    #[arg(long)]
    pub(crate) spreadsheet: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = IcmsConfig {
        send_licence_to_chief: args.send_to_chief,
        ..IcmsConfig::default()
    };
    let service = demo_service(config);
    let seeded = seed_demo_cases(&service)?;

    println!("Case workflow demo");
    for application in &seeded {
        println!(
            "- {:<14} {:<55} {}",
            application.get_reference(),
            application.process_type.label(),
            application.status.label()
        );
    }

    for case_type in [CaseType::Import, CaseType::Export] {
        let results = service.search(&SearchTerms::new(case_type), None, Some(args.limit))?;
        println!(
            "\n{} search: {} case(s)",
            case_type.code(),
            results.total_rows
        );
        render_results(&results);
    }

    let pending = service.pending_chief_licences()?;
    println!("\nLicences waiting on CHIEF: {}", pending.len());

    Ok(())
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let service = demo_service(IcmsConfig::default());
    seed_demo_cases(&service)?;

    let mut terms = SearchTerms::new(args.case_type);
    terms.case_ref = args.case_ref;
    terms.case_status = args.status;
    terms.submitted_date_start = args.submitted_from;

    if let Some(path) = args.spreadsheet {
        let bytes = service.search_spreadsheet(&terms, None)?;
        std::fs::write(&path, bytes)?;
        println!("Search results written to {}", path.display());
        return Ok(());
    }

    let results = service.search(&terms, None, args.limit)?;
    println!("{} matching case(s)", results.total_rows);
    render_results(&results);
    Ok(())
}

fn demo_service(config: IcmsConfig) -> DemoService {
    CaseService::new(
        Arc::new(InMemoryCaseRepository::default()),
        Arc::new(LoggingChiefClient),
        config,
    )
}

fn render_results(results: &SearchResults) {
    for row in &results.records {
        match row {
            ResultRow::Import(row) => println!(
                "  {} | {} | {} | {} | {}",
                row.case_status.case_reference,
                row.case_status.application_type,
                row.case_status.status,
                row.applicant_details.organisation_name,
                row.assignee_details.assignee_name
            ),
            ResultRow::Export(row) => println!(
                "  {} | {} | {} | {} | {}",
                row.case_reference,
                row.application_type,
                row.status,
                row.organisation_name,
                row.certificates.join(", ")
            ),
        }
    }
}

fn applicant() -> User {
    User {
        id: UserId(1),
        first_name: "Imogen".to_string(),
        last_name: "Porter".to_string(),
        email: "imogen.porter@example.com".to_string(),
    }
}

fn caseworker() -> User {
    User {
        id: UserId(2),
        first_name: "Casey".to_string(),
        last_name: "Worker".to_string(),
        email: "casey.worker@example.com".to_string(),
    }
}

fn draft(process_type: ProcessType, detail: ApplicationDetail) -> NewApplication {
    let agent_name = match process_type.case_type() {
        CaseType::Import => Some("Harbour Customs Agents".to_string()),
        CaseType::Export => None,
    };
    NewApplication {
        process_type,
        contact: applicant(),
        organisation_name: "Northwind Trading Ltd".to_string(),
        agent_name,
        applicant_reference: Some("NW-2024".to_string()),
        detail: Some(detail),
    }
}

fn sample_applications() -> Vec<(NewApplication, DemoStage)> {
    vec![
        (
            draft(
                ProcessType::Wood,
                ApplicationDetail::Wood {
                    shipping_year: Some(Utc::now().year()),
                    commodity_code: Some("4403211000".to_string()),
                },
            ),
            DemoStage::Issued,
        ),
        (
            draft(
                ProcessType::FaOil,
                ApplicationDetail::Firearms {
                    origin_country: Some("Any Country".to_string()),
                    consignment_country: Some("Any Country".to_string()),
                    commodity: Some(FirearmCommodity::ExChapter93),
                },
            ),
            DemoStage::Issued,
        ),
        (
            draft(
                ProcessType::FaSil,
                ApplicationDetail::Firearms {
                    origin_country: Some("Norway".to_string()),
                    consignment_country: Some("Belgium".to_string()),
                    commodity: Some(FirearmCommodity::ExChapter97),
                },
            ),
            DemoStage::Owned,
        ),
        (
            draft(
                ProcessType::Cfs,
                ApplicationDetail::Export {
                    countries: vec!["Japan".to_string(), "Brazil".to_string()],
                    manufacturer_countries: vec!["United Kingdom".to_string()],
                    brands: Vec::new(),
                },
            ),
            DemoStage::Issued,
        ),
        (
            draft(
                ProcessType::Gmp,
                ApplicationDetail::Export {
                    countries: vec!["China".to_string()],
                    manufacturer_countries: Vec::new(),
                    brands: vec!["Aurora".to_string()],
                },
            ),
            DemoStage::Submitted,
        ),
        (
            draft(
                ProcessType::Com,
                ApplicationDetail::Export {
                    countries: vec!["Canada".to_string()],
                    manufacturer_countries: Vec::new(),
                    brands: Vec::new(),
                },
            ),
            DemoStage::Draft,
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DemoStage {
    Draft,
    Submitted,
    Owned,
    Issued,
}

/// Seeds one application per sample, each advanced to its demo stage.
pub(crate) fn seed_demo_cases<R, C>(
    service: &CaseService<R, C>,
) -> Result<Vec<Application>, CaseError>
where
    R: CaseRepository + 'static,
    C: ChiefClient + 'static,
{
    let applicant = applicant();
    let caseworker = caseworker();
    let mut seeded = Vec::new();

    for (new_application, stage) in sample_applications() {
        let case_type = new_application.process_type.case_type();
        let created = service.create_application(&applicant, new_application)?;
        let id = created.id;
        if stage == DemoStage::Draft {
            seeded.push(created);
            continue;
        }

        let submitted = service.submit_application(case_type, id, &applicant)?;
        if stage == DemoStage::Submitted {
            seeded.push(submitted);
            continue;
        }

        let owned = service.take_ownership(case_type, id, &caseworker)?;
        if stage == DemoStage::Owned {
            seeded.push(owned);
            continue;
        }

        service.complete_checklist(case_type, id, demo_checklist())?;
        if case_type == CaseType::Import {
            service.edit_licence(
                case_type,
                id,
                LicenceUpdate {
                    licence_end_date: Some(Utc::now().date_naive() + Duration::days(180)),
                    ..LicenceUpdate::default()
                },
            )?;
        }
        service.set_decision(
            case_type,
            id,
            DecisionInput {
                decision: Decision::Approve,
                refuse_reason: None,
            },
        )?;
        service.start_authorisation(case_type, id, &caseworker)?;
        service.authorise_documents(case_type, id, &caseworker)?;
        let signed = service.documents_signed(case_type, id)?;

        // Electronic licences only complete once CHIEF accepts them.
        if signed.status != icms::case::ApplicationStatus::Completed {
            service.chief_approve(id)?;
        }
        seeded.push(service.get_application(case_type, id)?);
    }

    Ok(seeded)
}

fn demo_checklist() -> Checklist {
    Checklist {
        case_update: Some(ChecklistAnswer::No),
        fir_required: Some(ChecklistAnswer::NotApplicable),
        validity_period_correct: Some(ChecklistAnswer::Yes),
        endorsements_listed: Some(ChecklistAnswer::Yes),
        response_preparation: true,
        authorisation: true,
    }
}
