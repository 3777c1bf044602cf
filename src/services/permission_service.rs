// src/services/permission_service.rs

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::auth::{AccessSubject, Role};

// A tabela estática de permissões: id -> papéis autorizados.
// Owner/admin nem consultam a tabela (bypass incondicional no motor).
const PERMISSION_TABLE: &[(&str, &[Role])] = &[
    ("view:invoices", &[Role::Manager, Role::Employee, Role::Viewer, Role::FreeUser]),
    ("manage:invoices", &[Role::Manager, Role::Employee, Role::FreeUser]),
    ("view:estimates", &[Role::Manager, Role::Employee, Role::Viewer, Role::FreeUser]),
    ("manage:estimates", &[Role::Manager, Role::Employee, Role::FreeUser]),
    ("view:quotes", &[Role::Manager, Role::Employee, Role::Viewer, Role::FreeUser]),
    ("manage:quotes", &[Role::Manager, Role::Employee, Role::FreeUser]),
    ("view:insurance_documents", &[Role::Manager, Role::Employee, Role::Viewer, Role::FreeUser]),
    ("manage:insurance_documents", &[Role::Manager, Role::Employee, Role::FreeUser]),
    ("view:reports", &[Role::Manager]),
    ("manage:employees", &[]),
    ("manage:workspace", &[]),
];

fn table() -> &'static HashMap<&'static str, &'static [Role]> {
    static TABLE: OnceLock<HashMap<&'static str, &'static [Role]>> = OnceLock::new();
    TABLE.get_or_init(|| PERMISSION_TABLE.iter().copied().collect())
}

/// O motor de permissões: puro, síncrono e sem efeitos colaterais.
///
/// Precisa ser verificado DUAS vezes: no portão da UI e de novo logo antes
/// de qualquer mutação — o portão da UI sozinho é contornável.
///
/// Ordem, com curto-circuito:
/// 1. owner/admin passam incondicionalmente;
/// 2. override explícito do sujeito passa;
/// 3. consulta à tabela estática (id ausente nega por padrão).
pub fn has_access(subject: Option<&AccessSubject>, permission_id: &str) -> bool {
    let Some(subject) = subject else {
        return false;
    };

    if subject.role.is_superuser() {
        return true;
    }

    if subject.permission_overrides.iter().any(|p| p == permission_id) {
        return true;
    }

    match table().get(permission_id) {
        Some(allowed) => allowed.contains(&subject.role),
        None => false,
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionInfo {
    #[schema(example = "view:invoices")]
    pub id: String,
    pub allowed_roles: Vec<Role>,
}

// Catálogo para o frontend montar a tela de papéis.
pub fn list_permissions() -> Vec<PermissionInfo> {
    PERMISSION_TABLE
        .iter()
        .map(|(id, roles)| PermissionInfo { id: (*id).to_string(), allowed_roles: roles.to_vec() })
        .collect()
}
