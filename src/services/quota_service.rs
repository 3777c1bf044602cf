// src/services/quota_service.rs

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::{
    common::error::AppError,
    db::DocumentStore,
    models::{
        auth::{Plan, UserProfile},
        documents::DocumentKind,
    },
    services::tenancy_service::resolve_path,
};

// Teto mensal do plano gratuito, por tipo de registro.
const FREE_MONTHLY_LIMIT: usize = 5;

/// O guarda de quota.
///
/// É um portão de UX, não uma fronteira de segurança: um cliente malicioso
/// consegue contorná-lo, então o deployment de produção também o impõe nas
/// regras do armazenamento. Chamado antes de TODA criação de registro;
/// quando falha, o chamador redireciona para o fluxo de upgrade.
#[derive(Clone)]
pub struct QuotaService {
    store: Arc<dyn DocumentStore>,
}

impl QuotaService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn limit_for(_kind: DocumentKind) -> usize {
        FREE_MONTHLY_LIMIT
    }

    /// `true` = pode criar. Planos pagos passam sem contar nada.
    pub async fn check_usage_limit(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
    ) -> Result<bool, AppError> {
        if profile.plan != Plan::Free {
            return Ok(true);
        }

        let Some(collection) = resolve_path(Some(profile), kind) else {
            return Err(AppError::PathUnresolved);
        };

        let now = Utc::now();
        let docs = self.store.list(&collection).await?;
        let this_month = docs
            .iter()
            .filter(|(_, doc)| {
                doc.get("createdAt")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                    .is_some_and(|t| t.year() == now.year() && t.month() == now.month())
            })
            .count();

        Ok(this_month < Self::limit_for(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::auth::Role;
    use serde_json::json;
    use uuid::Uuid;

    fn profile(plan: Plan) -> UserProfile {
        UserProfile {
            principal_id: Uuid::new_v4(),
            email: "ze@pessoal.com".into(),
            display_name: None,
            workspace_id: None,
            plan,
            role: Role::FreeUser,
            permission_overrides: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn seed_invoices(store: &MemoryStore, profile: &UserProfile, n: usize, created_at: DateTime<Utc>) {
        let collection = resolve_path(Some(profile), DocumentKind::Invoice).unwrap();
        for i in 0..n {
            store
                .set(
                    &format!("{collection}/doc-{i}"),
                    json!({"createdAt": created_at.to_rfc3339()}),
                    false,
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn plano_gratuito_bloqueia_a_sexta_fatura_do_mes() {
        let store = Arc::new(MemoryStore::new());
        let service = QuotaService::new(store.clone());
        let p = profile(Plan::Free);

        seed_invoices(&store, &p, 5, Utc::now()).await;

        let allowed = service.check_usage_limit(&p, DocumentKind::Invoice).await.unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn faturas_de_meses_anteriores_nao_contam() {
        let store = Arc::new(MemoryStore::new());
        let service = QuotaService::new(store.clone());
        let p = profile(Plan::Free);

        let old = Utc::now() - chrono::Duration::days(90);
        seed_invoices(&store, &p, 5, old).await;

        let allowed = service.check_usage_limit(&p, DocumentKind::Invoice).await.unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn plano_business_passa_com_qualquer_volume() {
        let store = Arc::new(MemoryStore::new());
        let service = QuotaService::new(store.clone());
        let p = profile(Plan::Business);

        seed_invoices(&store, &p, 500, Utc::now()).await;

        let allowed = service.check_usage_limit(&p, DocumentKind::Invoice).await.unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn quota_e_por_tipo_de_registro() {
        let store = Arc::new(MemoryStore::new());
        let service = QuotaService::new(store.clone());
        let p = profile(Plan::Free);

        seed_invoices(&store, &p, 5, Utc::now()).await;

        // Cinco faturas não bloqueiam o primeiro orçamento.
        let allowed = service.check_usage_limit(&p, DocumentKind::Estimate).await.unwrap();
        assert!(allowed);
    }
}
