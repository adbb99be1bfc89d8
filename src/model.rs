//! Tender records produced by extraction and persisted by the store

use chrono::{DateTime, Utc};

/// Marker appended to a field label when the field is absent from the page
pub const NOT_FOUND_MARKER: &str = "Não encontrado";

/// Builds the value recorded for a field whose label was not found
///
/// `"Órgão:"` becomes `"Órgão Não encontrado"`.
pub fn not_found_sentinel(label: &str) -> String {
    format!("{} {}", label.replace(':', "").trim(), NOT_FOUND_MARKER)
}

/// Returns true if `value` is the sentinel for `label`
pub fn is_not_found(label: &str, value: &str) -> bool {
    value == not_found_sentinel(label)
}

/// Labeled header fields of a tender detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Location,
    IssuingBody,
    PurchasingUnit,
    Modality,
    LegalBasis,
    TenderType,
    DisputeMode,
    PriceRegistry,
    BudgetSource,
    PublishedAt,
    Status,
    ProposalsOpen,
    ProposalsClose,
    ExternalId,
    Source,
}

impl HeaderField {
    /// Every header field, in page order
    pub const ALL: [HeaderField; 15] = [
        Self::Location,
        Self::IssuingBody,
        Self::PurchasingUnit,
        Self::Modality,
        Self::LegalBasis,
        Self::TenderType,
        Self::DisputeMode,
        Self::PriceRegistry,
        Self::BudgetSource,
        Self::PublishedAt,
        Self::Status,
        Self::ProposalsOpen,
        Self::ProposalsClose,
        Self::ExternalId,
        Self::Source,
    ];

    /// Label text shown next to the value on the detail page
    pub fn label(self) -> &'static str {
        match self {
            Self::Location => "Local:",
            Self::IssuingBody => "Órgão:",
            Self::PurchasingUnit => "Unidade compradora:",
            Self::Modality => "Modalidade da contratação:",
            Self::LegalBasis => "Amparo legal:",
            Self::TenderType => "Tipo:",
            Self::DisputeMode => "Modo de disputa:",
            Self::PriceRegistry => "Registro de preço:",
            Self::BudgetSource => "Fonte orçamentária:",
            Self::PublishedAt => "Data de divulgação no PNCP:",
            Self::Status => "Situação:",
            Self::ProposalsOpen => "Data de início de recebimento de propostas:",
            Self::ProposalsClose => "Data fim de recebimento de propostas:",
            Self::ExternalId => "Id contratação PNCP:",
            Self::Source => "Fonte:",
        }
    }
}

/// Header attributes of a tender, stored as display strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenderHeader {
    pub location: String,
    pub issuing_body: String,
    pub purchasing_unit: String,
    pub modality: String,
    pub legal_basis: String,
    pub tender_type: String,
    pub dispute_mode: String,
    pub price_registry: String,
    pub budget_source: String,
    pub published_at: String,
    pub status: String,
    pub proposals_open: String,
    pub proposals_close: String,
    pub source: String,
}

impl TenderHeader {
    /// Mutable slot for a field; `None` for the external id, which lives on [`Tender`]
    pub fn slot_mut(&mut self, field: HeaderField) -> Option<&mut String> {
        let slot = match field {
            HeaderField::Location => &mut self.location,
            HeaderField::IssuingBody => &mut self.issuing_body,
            HeaderField::PurchasingUnit => &mut self.purchasing_unit,
            HeaderField::Modality => &mut self.modality,
            HeaderField::LegalBasis => &mut self.legal_basis,
            HeaderField::TenderType => &mut self.tender_type,
            HeaderField::DisputeMode => &mut self.dispute_mode,
            HeaderField::PriceRegistry => &mut self.price_registry,
            HeaderField::BudgetSource => &mut self.budget_source,
            HeaderField::PublishedAt => &mut self.published_at,
            HeaderField::Status => &mut self.status,
            HeaderField::ProposalsOpen => &mut self.proposals_open,
            HeaderField::ProposalsClose => &mut self.proposals_close,
            HeaderField::Source => &mut self.source,
            HeaderField::ExternalId => return None,
        };
        Some(slot)
    }

    pub fn get(&self, field: HeaderField) -> Option<&str> {
        let value = match field {
            HeaderField::Location => &self.location,
            HeaderField::IssuingBody => &self.issuing_body,
            HeaderField::PurchasingUnit => &self.purchasing_unit,
            HeaderField::Modality => &self.modality,
            HeaderField::LegalBasis => &self.legal_basis,
            HeaderField::TenderType => &self.tender_type,
            HeaderField::DisputeMode => &self.dispute_mode,
            HeaderField::PriceRegistry => &self.price_registry,
            HeaderField::BudgetSource => &self.budget_source,
            HeaderField::PublishedAt => &self.published_at,
            HeaderField::Status => &self.status,
            HeaderField::ProposalsOpen => &self.proposals_open,
            HeaderField::ProposalsClose => &self.proposals_close,
            HeaderField::Source => &self.source,
            HeaderField::ExternalId => return None,
        };
        Some(value)
    }
}

/// A public procurement record
#[derive(Debug, Clone, PartialEq)]
pub struct Tender {
    /// Source system id, unique across the store
    pub external_id: String,
    pub url: String,
    pub header: TenderHeader,
    pub object_text: String,
    pub total_estimated_value: String,
    pub captured_at: DateTime<Utc>,
}

/// A line item of a tender; values are kept as displayed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenderItem {
    pub number: String,
    pub description: String,
    pub quantity: String,
    pub unit_value: String,
    pub total_value: String,
}

/// A notice document attached to a tender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderDocument {
    pub url: String,
}

/// An entry of the tender's history tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub event: String,
    pub timestamp: String,
}

/// Everything read from one detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTender {
    pub tender: Tender,
    pub items: Vec<TenderItem>,
    pub documents: Vec<TenderDocument>,
    pub history: Vec<HistoryEvent>,
}
