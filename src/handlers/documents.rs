// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::CurrentProfile, rbac::ensure_access},
    models::documents::{AuditLogEntry, BillableDocument, DocumentKind, DocumentStatus},
    services::document_service::{DocumentDraft, DocumentPatch},
};

// O segmento de URL é o nome da coleção ("invoices", "estimates"...).
// Segmento desconhecido é indistinguível de documento inexistente.
fn parse_kind(segment: &str) -> Result<DocumentKind, AppError> {
    DocumentKind::from_collection(segment).ok_or(AppError::DocumentNotFound)
}

fn view_permission(kind: DocumentKind) -> String {
    format!("view:{}", kind.collection())
}

fn manage_permission(kind: DocumentKind) -> String {
    format!("manage:{}", kind.collection())
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentPayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    #[schema(example = "Reforma do telhado")]
    pub title: String,

    #[schema(example = "João da Silva")]
    pub customer_name: Option<String>,

    #[serde(default)]
    #[schema(example = "1500.50")]
    pub total: Decimal,

    #[serde(default = "default_currency")]
    #[schema(example = "BRL")]
    pub currency: String,
}

fn default_currency() -> String {
    "BRL".to_string()
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentPayload {
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionPayload {
    pub status: DocumentStatus,
}

// ---
// Handlers
// ---

// POST /api/documents/{kind}
#[utoipa::path(
    post,
    path = "/api/documents/{kind}",
    tag = "Documents",
    request_body = CreateDocumentPayload,
    responses(
        (status = 201, description = "Documento criado em rascunho", body = BillableDocument),
        (status = 402, description = "Teto do plano gratuito atingido; resposta traz o caminho de upgrade"),
        (status = 403, description = "Sem permissão de gestão para este tipo")
    ),
    params(("kind" = String, Path, description = "Coleção: invoices | estimates | quotes | insurance_documents")),
    security(("api_jwt" = []))
)]
pub async fn create_document(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path(kind): Path<String>,
    Json(payload): Json<CreateDocumentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let kind = parse_kind(&kind)?;

    // Permissão rechecada no caminho da mutação, nunca só na UI.
    ensure_access(&profile.0, &manage_permission(kind))?;

    // Guarda de quota: portão de UX, sempre antes de criar.
    let allowed = app_state.quota_service.check_usage_limit(&profile.0, kind).await?;
    if !allowed {
        return Err(AppError::QuotaExceeded(kind.collection().to_string()));
    }

    let document = app_state
        .document_service
        .create_document(
            &profile.0,
            kind,
            DocumentDraft {
                title: payload.title,
                customer_name: payload.customer_name,
                total: payload.total,
                currency: payload.currency,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

// GET /api/documents/{kind}
#[utoipa::path(
    get,
    path = "/api/documents/{kind}",
    tag = "Documents",
    responses(
        (status = 200, description = "Documentos do pool do principal/workspace", body = [BillableDocument])
    ),
    params(("kind" = String, Path, description = "Coleção de documentos")),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &view_permission(kind))?;

    let documents = app_state.document_service.list_documents(&profile.0, kind).await?;
    Ok(Json(documents))
}

// GET /api/documents/{kind}/{id}
#[utoipa::path(
    get,
    path = "/api/documents/{kind}/{id}",
    tag = "Documents",
    responses(
        (status = 200, description = "Documento", body = BillableDocument),
        (status = 404, description = "Documento não encontrado")
    ),
    params(
        ("kind" = String, Path, description = "Coleção de documentos"),
        ("id" = Uuid, Path, description = "Id do documento")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_document(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &view_permission(kind))?;

    let document = app_state.document_service.get_document(&profile.0, kind, id).await?;
    Ok(Json(document))
}

// PUT /api/documents/{kind}/{id}
#[utoipa::path(
    put,
    path = "/api/documents/{kind}/{id}",
    tag = "Documents",
    request_body = UpdateDocumentPayload,
    responses(
        (status = 200, description = "Documento atualizado; a escrita segue pelo gateway", body = BillableDocument),
        (status = 409, description = "Documento não está mais editável")
    ),
    params(
        ("kind" = String, Path, description = "Coleção de documentos"),
        ("id" = Uuid, Path, description = "Id do documento")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_document(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateDocumentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &manage_permission(kind))?;

    let document = app_state
        .document_service
        .update_document(
            &profile.0,
            kind,
            id,
            DocumentPatch {
                title: payload.title,
                customer_name: payload.customer_name,
                total: payload.total,
                currency: payload.currency,
            },
        )
        .await?;

    Ok(Json(document))
}

// DELETE /api/documents/{kind}/{id}
pub async fn delete_document(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &manage_permission(kind))?;

    app_state.document_service.delete_document(&profile.0, kind, id).await?;
    Ok(StatusCode::ACCEPTED)
}

// POST /api/documents/{kind}/{id}/transition
#[utoipa::path(
    post,
    path = "/api/documents/{kind}/{id}/transition",
    tag = "Documents",
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Status alterado", body = BillableDocument),
        (status = 409, description = "Transição inválida para a máquina de estados")
    ),
    params(
        ("kind" = String, Path, description = "Coleção de documentos"),
        ("id" = Uuid, Path, description = "Id do documento")
    ),
    security(("api_jwt" = []))
)]
pub async fn transition_document(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &manage_permission(kind))?;

    let document = app_state
        .document_service
        .transition(&profile.0, kind, id, payload.status)
        .await?;
    Ok(Json(document))
}

// GET /api/documents/{kind}/{id}/audit
#[utoipa::path(
    get,
    path = "/api/documents/{kind}/{id}/audit",
    tag = "Documents",
    responses(
        (status = 200, description = "Livro-razão em ordem decrescente de versão", body = [AuditLogEntry])
    ),
    params(
        ("kind" = String, Path, description = "Coleção de documentos"),
        ("id" = Uuid, Path, description = "Id do documento")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_audit_log(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    ensure_access(&profile.0, &view_permission(kind))?;

    let entries = app_state.document_service.audit_log(&profile.0, kind, id).await?;
    Ok(Json(entries))
}
