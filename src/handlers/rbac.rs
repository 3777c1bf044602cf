// src/handlers/rbac.rs

use axum::{response::IntoResponse, Json};

use crate::services::permission_service::{self, PermissionInfo};

// GET /api/permissions (para o frontend saber o que mostrar na tela)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Catálogo estático de permissões", body = [PermissionInfo])
    )
)]
pub async fn list_permissions() -> impl IntoResponse {
    Json(permission_service::list_permissions())
}
