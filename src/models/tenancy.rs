// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::Role;

// ---
// 1. Workspace (o "Tenant")
// ---
// O contêiner compartilhado da empresa: um único pool de registros,
// independente de quem os criou.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,

    #[schema(example = "Oficina do Zé LTDA")]
    pub name: String,

    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    PendingInvitation,
    Active,
}

// ---
// 2. Membership (a "Ponte" Principal-Workspace)
// ---
// Invariante: no máximo um membro ativo por par (principal, workspace).
// Enquanto pendente, o documento vive sob um id determinístico derivado do
// e-mail; ao ser reivindicado, renasce chaveado pelo id real do principal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    // None enquanto o convite está pendente.
    pub principal_id: Option<Uuid>,

    #[schema(example = "maria@empresa.com.br")]
    pub email: String,

    pub role: Role,
    pub status: MembershipStatus,

    #[serde(default)]
    pub permission_overrides: Vec<String>,

    pub invited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Id determinístico do documento de convite pendente, derivado do e-mail.
/// É o que permite a sondagem O(1) da Estratégia A do bootstrap.
pub fn invite_member_id(email: &str) -> String {
    let sanitized: String = email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("invite_{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_id_e_deterministico_e_normalizado() {
        assert_eq!(invite_member_id("Maria@Empresa.COM"), invite_member_id("maria@empresa.com "));
        assert_eq!(invite_member_id("a@b.c"), "invite_a_b_c");
    }
}
