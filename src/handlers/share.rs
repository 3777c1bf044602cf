// src/handlers/share.rs
//
// A única superfície exposta a não-principais: links compartilháveis.
// Nenhuma rota aqui exige autenticação; um token presente só serve para
// reconhecer o dono e esconder os controles de resposta.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::MaybePrincipal,
    models::documents::{BillableDocument, ShareView},
    services::lifecycle_service::AcceptanceInput,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptSharePayload {
    #[schema(example = "João da Silva")]
    pub signer_name: Option<String>,

    // Data URL capturada no canvas de assinatura.
    pub signature_image: Option<String>,

    #[serde(default)]
    pub agreement_accepted: bool,
}

// GET /api/share/{id}
#[utoipa::path(
    get,
    path = "/api/share/{id}",
    tag = "Share",
    responses(
        (status = 200, description = "Visão pública do documento", body = ShareView),
        (status = 404, description = "Link não corresponde a nenhum documento")
    ),
    params(("id" = Uuid, Path, description = "Id compartilhável do documento"))
)]
pub async fn get_share(
    State(app_state): State<AppState>,
    maybe_principal: MaybePrincipal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // Visitante com sessão pode ser o dono; sem sessão é a contraparte.
    let viewer = match maybe_principal.0 {
        Some(principal) => app_state.tenancy_service.get_profile(principal.id).await?,
        None => None,
    };

    let view = app_state.lifecycle_service.share_view(id, viewer.as_ref()).await?;
    Ok(Json(view))
}

// POST /api/share/{id}/accept
#[utoipa::path(
    post,
    path = "/api/share/{id}/accept",
    tag = "Share",
    request_body = AcceptSharePayload,
    responses(
        (status = 200, description = "Documento aceito e assinado", body = BillableDocument),
        (status = 400, description = "Assinatura incompleta"),
        (status = 404, description = "Link não corresponde a nenhum documento"),
        (status = 409, description = "Documento já respondido")
    ),
    params(("id" = Uuid, Path, description = "Id compartilhável do documento"))
)]
pub async fn accept_share(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptSharePayload>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state
        .lifecycle_service
        .accept(
            id,
            &AcceptanceInput {
                signer_name: payload.signer_name,
                signature_image: payload.signature_image,
                agreement_accepted: payload.agreement_accepted,
            },
        )
        .await?;
    Ok(Json(document))
}

// POST /api/share/{id}/decline
#[utoipa::path(
    post,
    path = "/api/share/{id}/decline",
    tag = "Share",
    responses(
        (status = 200, description = "Documento recusado", body = BillableDocument),
        (status = 404, description = "Link não corresponde a nenhum documento"),
        (status = 409, description = "Documento já respondido")
    ),
    params(("id" = Uuid, Path, description = "Id compartilhável do documento"))
)]
pub async fn decline_share(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let document = app_state.lifecycle_service.decline(id).await?;
    Ok(Json(document))
}
