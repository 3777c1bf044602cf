// src/models/documents.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Estimate,
    Quote,
    InsuranceDocument,
}

impl DocumentKind {
    /// Nome da coleção onde documentos deste tipo vivem.
    pub fn collection(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::Estimate => "estimates",
            DocumentKind::Quote => "quotes",
            DocumentKind::InsuranceDocument => "insurance_documents",
        }
    }

    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "invoices" => Some(DocumentKind::Invoice),
            "estimates" => Some(DocumentKind::Estimate),
            "quotes" => Some(DocumentKind::Quote),
            "insurance_documents" => Some(DocumentKind::InsuranceDocument),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    Paid,
    Overdue,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Accepted => "accepted",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Expired => "expired",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Sent,
    Signed,
    Declined,
    Paid,
    Expired,
}

// --- Structs ---

/// Uma entrada do livro-razão de auditoria. Uma vez anexada, nunca muda.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,

    #[schema(example = "maria@empresa.com.br")]
    pub actor: String,

    // Estritamente crescente por documento, nunca reutilizada.
    pub version: u64,

    // Descrições legíveis das mudanças, só para `updated`.
    pub changes: Option<Vec<String>>,

    pub created_at: DateTime<Utc>,
}

/// Registro de assinatura da contraparte externa. Sua presença equivale
/// ao status `accepted`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    #[schema(example = "João da Silva")]
    pub signer_name: String,

    // Payload da imagem (data URL capturada no canvas da contraparte).
    pub signature_image: String,

    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillableDocument {
    pub id: Uuid,
    pub kind: DocumentKind,

    #[schema(example = "Reforma do telhado")]
    pub title: String,

    #[schema(example = "João da Silva")]
    pub customer_name: Option<String>,

    pub status: DocumentStatus,

    #[schema(example = "1500.50")]
    pub total: Decimal,

    #[schema(example = "BRL")]
    pub currency: String,

    pub signature: Option<SignatureRecord>,

    #[serde(default)]
    pub audit_log: Vec<AuditLogEntry>,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Índice global de links compartilháveis: mapeia o id público do documento
/// para o caminho real no armazenamento, sem exigir autenticação.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareIndexEntry {
    pub path: String,
    pub kind: DocumentKind,
}

/// O que a contraparte (ou o dono) enxerga ao abrir um link compartilhável.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub document: BillableDocument,

    // False para o dono e para documentos já respondidos: a UI esconde
    // os controles de aceitar/recusar.
    pub can_respond: bool,

    pub is_owner: bool,
}
