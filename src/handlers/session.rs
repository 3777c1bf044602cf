// src/handlers/session.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AuthenticatedPrincipal, CurrentProfile},
    models::auth::{Plan, Principal, Role, UserProfile},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapPayload {
    // Dica de workspace vinda do contexto de sessão/URL do convite;
    // habilita a sondagem O(1) da Estratégia A.
    pub workspace_hint: Option<Uuid>,
}

// POST /api/session/bootstrap
// O lado servidor do callback de mudança de sessão do provedor de auth:
// chamado uma vez por evento de autenticação.
#[utoipa::path(
    post,
    path = "/api/session/bootstrap",
    tag = "Session",
    request_body = BootstrapPayload,
    responses(
        (status = 200, description = "Perfil resolvido (criado, reivindicado ou já existente)", body = UserProfile)
    ),
    security(("api_jwt" = []))
)]
pub async fn bootstrap(
    State(app_state): State<AppState>,
    principal: AuthenticatedPrincipal,
    Json(payload): Json<BootstrapPayload>,
) -> Result<impl IntoResponse, AppError> {
    let profile = match app_state
        .bootstrap_service
        .bootstrap(&principal.0, payload.workspace_hint)
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            // Falha de bootstrap nunca trava o login: loga e segue pelo
            // caminho pessoal até um administrador intervir.
            tracing::error!(principal = %principal.0.id, "bootstrap falhou: {e}");
            fallback_profile(&principal.0)
        }
    };

    Ok((StatusCode::OK, Json(profile)))
}

fn fallback_profile(principal: &Principal) -> UserProfile {
    let now = Utc::now();
    UserProfile {
        principal_id: principal.id,
        email: principal.email.trim().to_lowercase(),
        display_name: principal.display_name.clone(),
        workspace_id: None,
        plan: Plan::Free,
        role: Role::FreeUser,
        permission_overrides: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Session",
    responses(
        (status = 200, description = "Perfil do principal autenticado", body = UserProfile),
        (status = 404, description = "Bootstrap ainda não rodou")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(profile: CurrentProfile) -> Result<impl IntoResponse, AppError> {
    Ok(Json(profile.0))
}
