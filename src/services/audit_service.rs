// src/services/audit_service.rs

use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::models::documents::{AuditAction, AuditLogEntry};

// Campos de identidade/escrituração que nunca entram no diff.
// (Os nomes são os do JSON serializado, em camelCase.)
const EXCLUDED_FIELDS: &[&str] =
    &["id", "workspaceId", "principalId", "createdAt", "updatedAt", "auditLog", "kind"];

const MAX_VALUE_LEN: usize = 40;

/// Anexa uma nova entrada ao livro-razão do documento e a devolve.
///
/// A versão é `max(existentes) + 1`; entradas anteriores nunca são tocadas.
/// Para `updated`, o diff entre os dois estados vira a lista de mudanças.
pub fn append_entry(
    log: &mut Vec<AuditLogEntry>,
    action: AuditAction,
    actor: &str,
    previous: Option<&Value>,
    next: Option<&Value>,
) -> AuditLogEntry {
    let changes = match (action, previous, next) {
        (AuditAction::Updated, Some(prev), Some(next)) => Some(diff_states(prev, next)),
        _ => None,
    };

    let entry = AuditLogEntry {
        id: Uuid::new_v4(),
        action,
        actor: actor.to_string(),
        version: next_version(log),
        changes,
        created_at: Utc::now(),
    };
    log.push(entry.clone());
    entry
}

pub fn next_version(log: &[AuditLogEntry]) -> u64 {
    log.iter().map(|e| e.version).max().unwrap_or(0) + 1
}

/// Diff campo a campo entre dois estados do documento.
///
/// Percorre a união das chaves, pula os campos de escrituração e emite uma
/// linha legível por chave divergente. Campos com valor de array comparam
/// pelo valor inteiro — granularidade grossa, de propósito.
pub fn diff_states(previous: &Value, next: &Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let prev_map = previous.as_object().unwrap_or(&empty);
    let next_map = next.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = prev_map.keys().chain(next_map.keys()).collect();

    let mut changes = Vec::new();
    for key in keys {
        if EXCLUDED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let before = prev_map.get(key);
        let after = next_map.get(key);
        if before != after {
            changes.push(format!(
                "Campo '{}' alterado de '{}' para '{}'",
                key,
                display_value(before),
                display_value(after),
            ));
        }
    }
    changes
}

/// Entradas em ordem de exibição: última versão primeiro.
pub fn sorted_for_display(log: &[AuditLogEntry]) -> Vec<AuditLogEntry> {
    let mut entries = log.to_vec();
    entries.sort_by(|a, b| b.version.cmp(&a.version));
    entries
}

fn display_value(value: Option<&Value>) -> String {
    let rendered = match value {
        None | Some(Value::Null) => "(vazio)".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    truncate(&rendered, MAX_VALUE_LEN)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}…")
    }
}
