// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Claims do token de sessão emitido pelo provedor de autenticação.
// O core só valida e extrai; nunca emite nem guarda credenciais.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// A identidade autenticada, independente de qualquer workspace.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Business,
}

// Enumeração fixa de papéis. A ordem de privilégio não é linear:
// owner/admin passam incondicionalmente; os demais dependem da tabela
// de permissões.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Manager,
    Employee,
    Viewer,
    FreeUser,
}

impl Role {
    pub fn is_superuser(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Um perfil por principal. Criado no primeiro login pelo protocolo de
/// bootstrap; nunca apagado.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub principal_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub plan: Plan,
    pub role: Role,
    #[serde(default)]
    pub permission_overrides: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// O sujeito normalizado que chega ao motor de permissões.
///
/// Toda forma solta (papel avulso, perfil completo) vira isto na borda,
/// antes de qualquer verificação.
#[derive(Debug, Clone)]
pub struct AccessSubject {
    pub role: Role,
    pub plan: Plan,
    pub permission_overrides: Vec<String>,
}

impl AccessSubject {
    // Adaptador legado: chamadas antigas passavam só o papel.
    pub fn from_role(role: Role) -> Self {
        Self { role, plan: Plan::Free, permission_overrides: Vec::new() }
    }
}

impl From<&UserProfile> for AccessSubject {
    fn from(profile: &UserProfile) -> Self {
        Self {
            role: profile.role,
            plan: profile.plan,
            permission_overrides: profile.permission_overrides.clone(),
        }
    }
}
