// src/services/billing_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BatchOp, DocumentStore},
    models::{
        auth::{Plan, Role},
        tenancy::{Membership, MembershipStatus},
    },
    services::tenancy_service::{member_path, profile_path},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEventKind {
    #[serde(rename = "subscription.created")]
    Created,
    #[serde(rename = "subscription.updated")]
    Updated,
    #[serde(rename = "subscription.deleted")]
    Deleted,
}

/// Evento de ciclo de vida emitido pelo processador de pagamentos.
/// O workspace afetado vem nos metadados do evento.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEvent {
    #[serde(rename = "type")]
    pub kind: SubscriptionEventKind,
    pub workspace_id: Uuid,
}

/// Reage aos eventos do processador de pagamentos: sincroniza o plano de
/// cada perfil do workspace e troca `owner <-> free_user` conforme o sentido
/// da mudança. Gatilho externo; o core nunca chama o processador.
#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn DocumentStore>,
}

impl BillingService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn handle_event(&self, event: &SubscriptionEvent) -> Result<(), AppError> {
        let plan = match event.kind {
            SubscriptionEventKind::Created | SubscriptionEventKind::Updated => Plan::Business,
            SubscriptionEventKind::Deleted => Plan::Free,
        };
        self.sync_workspace_plan(event.workspace_id, plan).await
    }

    async fn sync_workspace_plan(&self, workspace_id: Uuid, plan: Plan) -> Result<(), AppError> {
        let docs = self.store.list(&format!("workspaces/{workspace_id}/members")).await?;

        let now = Utc::now();
        let mut ops = Vec::new();
        for (_, doc) in docs {
            let membership: Membership =
                serde_json::from_value(doc).map_err(anyhow::Error::from)?;
            if membership.status != MembershipStatus::Active {
                continue;
            }
            let Some(principal_id) = membership.principal_id else {
                continue;
            };

            // Downgrade rebaixa donos; upgrade promove free_user a dono.
            let role = match (plan, membership.role) {
                (Plan::Free, Role::Owner) => Role::FreeUser,
                (Plan::Business, Role::FreeUser) => Role::Owner,
                (_, role) => role,
            };

            let patch = json!({ "plan": plan, "role": role, "updatedAt": now });
            ops.push(BatchOp::Update {
                path: member_path(workspace_id, &principal_id.to_string()),
                patch: json!({ "role": role, "updatedAt": now }),
            });
            ops.push(BatchOp::Update { path: profile_path(principal_id), patch });
        }

        if !ops.is_empty() {
            self.store.commit(ops).await?;
        }
        tracing::info!(%workspace_id, ?plan, "plano do workspace sincronizado");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::auth::UserProfile;

    async fn seed_member(
        store: &MemoryStore,
        workspace_id: Uuid,
        role: Role,
        plan: Plan,
        status: MembershipStatus,
    ) -> Uuid {
        let principal_id = Uuid::new_v4();
        let now = Utc::now();
        let membership = Membership {
            principal_id: Some(principal_id),
            email: format!("{principal_id}@empresa.com"),
            role,
            status,
            permission_overrides: Vec::new(),
            invited_by: None,
            created_at: now,
            updated_at: now,
        };
        store
            .set(
                &member_path(workspace_id, &principal_id.to_string()),
                serde_json::to_value(&membership).unwrap(),
                false,
            )
            .await
            .unwrap();

        let profile = UserProfile {
            principal_id,
            email: membership.email.clone(),
            display_name: None,
            workspace_id: Some(workspace_id),
            plan,
            role,
            permission_overrides: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        store
            .set(&profile_path(principal_id), serde_json::to_value(&profile).unwrap(), false)
            .await
            .unwrap();
        principal_id
    }

    async fn profile_of(store: &MemoryStore, principal_id: Uuid) -> UserProfile {
        serde_json::from_value(store.get(&profile_path(principal_id)).await.unwrap().unwrap())
            .unwrap()
    }

    #[tokio::test]
    async fn cancelamento_rebaixa_dono_e_mantem_funcionario() {
        let store = Arc::new(MemoryStore::new());
        let service = BillingService::new(store.clone());
        let wid = Uuid::new_v4();

        let owner =
            seed_member(&store, wid, Role::Owner, Plan::Business, MembershipStatus::Active).await;
        let employee =
            seed_member(&store, wid, Role::Employee, Plan::Business, MembershipStatus::Active)
                .await;

        service
            .handle_event(&SubscriptionEvent {
                kind: SubscriptionEventKind::Deleted,
                workspace_id: wid,
            })
            .await
            .unwrap();

        let owner_profile = profile_of(&store, owner).await;
        assert_eq!(owner_profile.plan, Plan::Free);
        assert_eq!(owner_profile.role, Role::FreeUser);

        let employee_profile = profile_of(&store, employee).await;
        assert_eq!(employee_profile.plan, Plan::Free);
        assert_eq!(employee_profile.role, Role::Employee);
    }

    #[tokio::test]
    async fn assinatura_criada_promove_free_user_a_dono() {
        let store = Arc::new(MemoryStore::new());
        let service = BillingService::new(store.clone());
        let wid = Uuid::new_v4();

        let demoted =
            seed_member(&store, wid, Role::FreeUser, Plan::Free, MembershipStatus::Active).await;

        service
            .handle_event(&SubscriptionEvent {
                kind: SubscriptionEventKind::Created,
                workspace_id: wid,
            })
            .await
            .unwrap();

        let profile = profile_of(&store, demoted).await;
        assert_eq!(profile.plan, Plan::Business);
        assert_eq!(profile.role, Role::Owner);
    }

    #[tokio::test]
    async fn convites_pendentes_ficam_intocados() {
        let store = Arc::new(MemoryStore::new());
        let service = BillingService::new(store.clone());
        let wid = Uuid::new_v4();

        // Convite pendente não tem principal nem perfil para sincronizar.
        let now = Utc::now();
        let invite = Membership {
            principal_id: None,
            email: "pendente@empresa.com".into(),
            role: Role::Employee,
            status: MembershipStatus::PendingInvitation,
            permission_overrides: Vec::new(),
            invited_by: None,
            created_at: now,
            updated_at: now,
        };
        store
            .set(
                &member_path(wid, "invite_pendente_empresa_com"),
                serde_json::to_value(&invite).unwrap(),
                false,
            )
            .await
            .unwrap();

        service
            .handle_event(&SubscriptionEvent {
                kind: SubscriptionEventKind::Deleted,
                workspace_id: wid,
            })
            .await
            .unwrap();

        let stored = store
            .get(&member_path(wid, "invite_pendente_empresa_com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["status"], "pending_invitation");
        assert_eq!(stored["role"], "employee");
    }
}
