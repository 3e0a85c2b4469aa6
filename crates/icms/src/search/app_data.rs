//! Loads the records behind a page of search results, one process type at a time.

use crate::case::document_pack::{
    doc_ref_documents_all, pack_latest_get, CaseDocumentReference, DocumentPack, DocumentType,
};
use crate::case::domain::{Application, ApplicationDetail};
use crate::case::repository::CaseTables;
use crate::flow::{ProcessId, ProcessType};

use super::types::CommodityDetails;

/// An application together with its latest draft, active or revoked pack.
#[derive(Debug, Clone)]
pub struct SearchRecord<'a> {
    pub application: &'a Application,
    pub pack: Option<&'a DocumentPack>,
    pub documents: Vec<&'a CaseDocumentReference>,
}

impl SearchRecord<'_> {
    pub fn licence_reference(&self) -> Option<&str> {
        self.documents
            .iter()
            .find(|document| document.document_type == DocumentType::Licence)
            .and_then(|document| document.reference.as_deref())
    }

    pub fn certificate_references(&self) -> Vec<String> {
        let mut references: Vec<String> = self
            .documents
            .iter()
            .filter(|document| document.document_type == DocumentType::Certificate)
            .filter_map(|document| document.reference.clone())
            .collect();
        references.sort();
        references
    }
}

/// Loader for one process type.
pub type RecordLoader = for<'a> fn(&'a CaseTables, &[ProcessId]) -> Vec<SearchRecord<'a>>;

pub fn loader_for(process_type: ProcessType) -> RecordLoader {
    match process_type {
        ProcessType::Derogations => get_derogations_applications,
        ProcessType::FaDfl => get_fa_dfl_applications,
        ProcessType::FaOil => get_fa_oil_applications,
        ProcessType::FaSil => get_fa_sil_applications,
        ProcessType::IronSteel => get_ironsteel_applications,
        ProcessType::Opt => get_opt_applications,
        ProcessType::Sanctions => get_sanctionadhoc_applications,
        ProcessType::Sps => get_sps_applications,
        ProcessType::Textiles => get_textiles_applications,
        ProcessType::Wood => get_wood_applications,
        ProcessType::Cfs => get_cfs_applications,
        ProcessType::Com => get_com_applications,
        ProcessType::Gmp => get_gmp_applications,
    }
}

pub fn get_derogations_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Derogations, ids)
}

pub fn get_fa_dfl_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::FaDfl, ids)
}

pub fn get_fa_oil_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::FaOil, ids)
}

pub fn get_fa_sil_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::FaSil, ids)
}

pub fn get_ironsteel_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::IronSteel, ids)
}

pub fn get_opt_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Opt, ids)
}

pub fn get_sanctionadhoc_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Sanctions, ids)
}

pub fn get_sps_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Sps, ids)
}

pub fn get_textiles_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Textiles, ids)
}

pub fn get_wood_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Wood, ids)
}

pub fn get_cfs_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Cfs, ids)
}

pub fn get_com_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Com, ids)
}

pub fn get_gmp_applications<'a>(tables: &'a CaseTables, ids: &[ProcessId]) -> Vec<SearchRecord<'a>> {
    load(tables, ProcessType::Gmp, ids)
}

/// The latest visible pack for an application, with its document references.
pub fn latest_pack_record<'a>(tables: &'a CaseTables, application: &'a Application) -> SearchRecord<'a> {
    let pack = pack_latest_get(tables, application.id);
    let documents = pack
        .map(|pack| doc_ref_documents_all(tables, pack.id))
        .unwrap_or_default();

    SearchRecord {
        application,
        pack,
        documents,
    }
}

fn load<'a>(
    tables: &'a CaseTables,
    process_type: ProcessType,
    ids: &[ProcessId],
) -> Vec<SearchRecord<'a>> {
    ids.iter()
        .filter_map(|id| tables.application(*id).ok())
        .filter(|application| application.process_type == process_type)
        .map(|application| latest_pack_record(tables, application))
        .collect()
}

/// Commodity section of an import result row. Each application type reports different fields.
pub fn get_commodity_details(application: &Application) -> CommodityDetails {
    let submitted_year = application
        .submit_datetime
        .map(|submitted| chrono::Datelike::year(&submitted));
    let name = |country: &Option<String>| country.clone().unwrap_or_default();
    let codes = |codes: Vec<&Option<String>>| {
        Some(codes.into_iter().flatten().cloned().collect::<Vec<_>>())
    };

    match &application.detail {
        ApplicationDetail::Wood {
            shipping_year,
            commodity_code,
        } => CommodityDetails {
            // Wood quota applications have no origin country.
            origin_country: "None".to_string(),
            shipping_year: *shipping_year,
            commodity_codes: codes(vec![commodity_code]),
            ..CommodityDetails::default()
        },
        ApplicationDetail::Firearms {
            origin_country,
            consignment_country,
            commodity,
        } => CommodityDetails {
            origin_country: name(origin_country),
            consignment_country: Some(name(consignment_country)),
            goods_category: commodity.map(|commodity| commodity.label().to_string()),
            ..CommodityDetails::default()
        },
        ApplicationDetail::Opt {
            cp_origin_country,
            cp_processing_country,
            cp_category,
            cp_commodity_codes,
            teg_commodity_codes,
        } => {
            let mut commodity_codes: Vec<String> = cp_commodity_codes
                .iter()
                .chain(teg_commodity_codes)
                .cloned()
                .collect();
            commodity_codes.sort();

            CommodityDetails {
                origin_country: name(cp_origin_country),
                consignment_country: Some(name(cp_processing_country)),
                shipping_year: submitted_year,
                goods_category: cp_category.clone(),
                commodity_codes: Some(commodity_codes),
            }
        }
        ApplicationDetail::Sanctions {
            origin_country,
            consignment_country,
            goods,
        } => {
            let mut commodity_codes: Vec<String> =
                goods.iter().map(|good| good.commodity_code.clone()).collect();
            commodity_codes.sort();

            CommodityDetails {
                origin_country: name(origin_country),
                consignment_country: Some(name(consignment_country)),
                shipping_year: submitted_year,
                commodity_codes: Some(commodity_codes),
                ..CommodityDetails::default()
            }
        }
        ApplicationDetail::Sps {
            origin_country,
            consignment_country,
            commodity_code,
        } => CommodityDetails {
            origin_country: name(origin_country),
            consignment_country: Some(name(consignment_country)),
            shipping_year: submitted_year,
            commodity_codes: codes(vec![commodity_code]),
            ..CommodityDetails::default()
        },
        ApplicationDetail::Textiles {
            origin_country,
            consignment_country,
            shipping_year,
            category_commodity_group,
            commodity_code,
        }
        | ApplicationDetail::IronSteel {
            origin_country,
            consignment_country,
            shipping_year,
            category_commodity_group,
            commodity_code,
        } => CommodityDetails {
            origin_country: name(origin_country),
            consignment_country: Some(name(consignment_country)),
            goods_category: category_commodity_group
                .as_ref()
                .map(|group| group.group_code.clone()),
            shipping_year: *shipping_year,
            commodity_codes: codes(vec![commodity_code]),
        },
        ApplicationDetail::Derogations {
            origin_country,
            consignment_country,
            commodity_code,
        } => CommodityDetails {
            origin_country: name(origin_country),
            consignment_country: Some(name(consignment_country)),
            shipping_year: submitted_year,
            commodity_codes: codes(vec![commodity_code]),
            ..CommodityDetails::default()
        },
        ApplicationDetail::Export { .. } => CommodityDetails::default(),
    }
}
