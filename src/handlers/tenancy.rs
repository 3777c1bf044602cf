// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::CurrentProfile,
        rbac::{ensure_access, PermManageEmployees, RequirePermission},
    },
    models::{auth::Role, tenancy::{Membership, Workspace}},
};

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspacePayload {
    #[validate(length(min = 1, message = "O nome do workspace é obrigatório."))]
    #[schema(example = "Oficina do Zé LTDA")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberPayload {
    #[validate(email(message = "E-mail inválido."))]
    #[schema(example = "maria@empresa.com.br")]
    pub email: String,

    pub role: Role,

    #[serde(default)]
    pub permission_overrides: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    pub role: Role,

    #[serde(default)]
    pub permission_overrides: Vec<String>,
}

// ---
// Handlers
// ---

// POST /api/workspaces
#[utoipa::path(
    post,
    path = "/api/workspaces",
    tag = "Tenancy",
    request_body = CreateWorkspacePayload,
    responses(
        (status = 201, description = "Workspace criado; o criador vira dono", body = Workspace),
        (status = 409, description = "O principal já pertence a um workspace")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_workspace(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
    Json(payload): Json<CreateWorkspacePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let workspace = app_state
        .tenancy_service
        .create_workspace(&profile.0, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

// POST /api/workspaces/members
#[utoipa::path(
    post,
    path = "/api/workspaces/members",
    tag = "Tenancy",
    request_body = InviteMemberPayload,
    responses(
        (status = 201, description = "Convite pendente gravado", body = Membership),
        (status = 403, description = "Sem a permissão manage:employees"),
        (status = 409, description = "Já existe um membro com este e-mail")
    ),
    security(("api_jwt" = []))
)]
pub async fn invite_member(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermManageEmployees>,
    Json(payload): Json<InviteMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let profile = guard.profile;
    let workspace_id = profile.workspace_id.ok_or(AppError::WorkspaceNotFound)?;

    // Recheque imediatamente antes da mutação.
    ensure_access(&profile, "manage:employees")?;

    let membership = app_state
        .tenancy_service
        .invite_member(
            &profile,
            workspace_id,
            &payload.email,
            payload.role,
            payload.permission_overrides,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

// GET /api/workspaces/members
#[utoipa::path(
    get,
    path = "/api/workspaces/members",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Membros (ativos e convites pendentes)", body = [Membership])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermManageEmployees>,
) -> Result<impl IntoResponse, AppError> {
    let workspace_id = guard.profile.workspace_id.ok_or(AppError::WorkspaceNotFound)?;
    let members = app_state.tenancy_service.list_members(workspace_id).await?;
    Ok(Json(members))
}

// PUT /api/workspaces/members/{principal_id}
pub async fn update_member(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermManageEmployees>,
    Path(principal_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberPayload>,
) -> Result<impl IntoResponse, AppError> {
    let workspace_id = guard.profile.workspace_id.ok_or(AppError::WorkspaceNotFound)?;
    ensure_access(&guard.profile, "manage:employees")?;

    app_state
        .tenancy_service
        .update_member_role(workspace_id, principal_id, payload.role, payload.permission_overrides)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/workspaces/current
pub async fn get_current_workspace(
    State(app_state): State<AppState>,
    profile: CurrentProfile,
) -> Result<impl IntoResponse, AppError> {
    let workspace_id = profile.0.workspace_id.ok_or(AppError::WorkspaceNotFound)?;
    let workspace = app_state.tenancy_service.get_workspace(workspace_id).await?;
    Ok(Json(workspace))
}
