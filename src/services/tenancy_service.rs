// src/services/tenancy_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BatchOp, DocumentStore},
    models::{
        auth::{Plan, Role, UserProfile},
        documents::DocumentKind,
        tenancy::{invite_member_id, Membership, MembershipStatus, Workspace},
    },
};

// --- Caminhos canônicos do armazenamento ---

pub fn profile_path(principal_id: Uuid) -> String {
    format!("profiles/{principal_id}")
}

pub fn workspace_path(workspace_id: Uuid) -> String {
    format!("workspaces/{workspace_id}")
}

pub fn member_path(workspace_id: Uuid, member_id: &str) -> String {
    format!("workspaces/{workspace_id}/members/{member_id}")
}

pub fn share_path(document_id: Uuid) -> String {
    format!("shares/{document_id}")
}

/// O roteador de tenant: resolve a coleção onde os registros do principal
/// vivem.
///
/// Perfil vinculado a workspace -> pool compartilhado do workspace, para
/// donos e convidados igualmente. Sem workspace -> coleção pessoal do
/// principal. `None` significa "não resolvido — o chamador não deve
/// prosseguir".
pub fn resolve_path(profile: Option<&UserProfile>, kind: DocumentKind) -> Option<String> {
    let profile = profile?;
    if profile.principal_id.is_nil() {
        return None;
    }
    match profile.workspace_id {
        Some(wid) => Some(format!("workspaces/{}/{}", wid, kind.collection())),
        None => Some(format!("principals/{}/{}", profile.principal_id, kind.collection())),
    }
}

pub fn resolve_document_path(
    profile: Option<&UserProfile>,
    kind: DocumentKind,
    document_id: Uuid,
) -> Option<String> {
    resolve_path(profile, kind).map(|collection| format!("{collection}/{document_id}"))
}

#[derive(Clone)]
pub struct TenancyService {
    store: Arc<dyn DocumentStore>,
}

impl TenancyService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Cria um workspace e, atomicamente, torna o criador o seu dono:
    /// documento do workspace + membro ativo + revinculação do perfil,
    /// tudo em um único lote.
    pub async fn create_workspace(
        &self,
        profile: &UserProfile,
        name: &str,
    ) -> Result<Workspace, AppError> {
        if profile.workspace_id.is_some() {
            return Err(AppError::AlreadyInWorkspace);
        }

        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: profile.principal_id,
            created_at: now,
            updated_at: now,
        };

        let membership = Membership {
            principal_id: Some(profile.principal_id),
            email: profile.email.clone(),
            role: Role::Owner,
            status: MembershipStatus::Active,
            permission_overrides: Vec::new(),
            invited_by: None,
            created_at: now,
            updated_at: now,
        };

        let ops = vec![
            BatchOp::Set {
                path: workspace_path(workspace.id),
                data: serde_json::to_value(&workspace).map_err(anyhow::Error::from)?,
                merge: false,
            },
            BatchOp::Set {
                path: member_path(workspace.id, &profile.principal_id.to_string()),
                data: serde_json::to_value(&membership).map_err(anyhow::Error::from)?,
                merge: false,
            },
            BatchOp::Set {
                path: profile_path(profile.principal_id),
                data: json!({
                    "workspaceId": workspace.id,
                    "role": Role::Owner,
                    "updatedAt": now,
                }),
                merge: true,
            },
        ];
        self.store.commit(ops).await?;

        tracing::info!(workspace_id = %workspace.id, "workspace criado");
        Ok(workspace)
    }

    pub async fn get_workspace(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        let doc = self
            .store
            .get(&workspace_path(workspace_id))
            .await?
            .ok_or(AppError::WorkspaceNotFound)?;
        Ok(serde_json::from_value(doc).map_err(anyhow::Error::from)?)
    }

    /// Grava o convite pendente no id determinístico derivado do e-mail —
    /// exatamente onde a Estratégia A do bootstrap vai sondar.
    pub async fn invite_member(
        &self,
        inviter: &UserProfile,
        workspace_id: Uuid,
        email: &str,
        role: Role,
        permission_overrides: Vec<String>,
    ) -> Result<Membership, AppError> {
        let normalized = email.trim().to_lowercase();

        let existing = self
            .store
            .query(
                &format!("workspaces/{workspace_id}/members"),
                "email",
                &json!(normalized),
            )
            .await?;
        if !existing.is_empty() {
            return Err(AppError::MemberAlreadyExists);
        }

        let now = Utc::now();
        let membership = Membership {
            principal_id: None,
            email: normalized.clone(),
            role,
            status: MembershipStatus::PendingInvitation,
            permission_overrides,
            invited_by: Some(inviter.principal_id),
            created_at: now,
            updated_at: now,
        };

        let path = member_path(workspace_id, &invite_member_id(&normalized));
        self.store
            .set(
                &path,
                serde_json::to_value(&membership).map_err(anyhow::Error::from)?,
                false,
            )
            .await?;

        tracing::info!(%workspace_id, email = %normalized, "convite pendente gravado");
        Ok(membership)
    }

    pub async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let docs = self.store.list(&format!("workspaces/{workspace_id}/members")).await?;
        let mut members = Vec::with_capacity(docs.len());
        for (_, doc) in docs {
            members.push(serde_json::from_value(doc).map_err(anyhow::Error::from)?);
        }
        Ok(members)
    }

    /// Edição administrativa de papel/overrides. Membro e perfil mudam no
    /// mesmo lote para não divergirem.
    pub async fn update_member_role(
        &self,
        workspace_id: Uuid,
        principal_id: Uuid,
        role: Role,
        permission_overrides: Vec<String>,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let patch = json!({
            "role": role,
            "permissionOverrides": permission_overrides,
            "updatedAt": now,
        });

        let ops = vec![
            BatchOp::Update {
                path: member_path(workspace_id, &principal_id.to_string()),
                patch: patch.clone(),
            },
            BatchOp::Update { path: profile_path(principal_id), patch },
        ];
        self.store.commit(ops).await?;
        Ok(())
    }

    pub async fn get_profile(&self, principal_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        match self.store.get(&profile_path(principal_id)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(anyhow::Error::from)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::Utc;

    fn profile(workspace: Option<Uuid>) -> UserProfile {
        UserProfile {
            principal_id: Uuid::new_v4(),
            email: "maria@empresa.com".into(),
            display_name: None,
            workspace_id: workspace,
            plan: if workspace.is_some() { Plan::Business } else { Plan::Free },
            role: if workspace.is_some() { Role::Owner } else { Role::FreeUser },
            permission_overrides: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn perfil_com_workspace_resolve_para_o_pool_compartilhado() {
        let wid = Uuid::new_v4();
        let p = profile(Some(wid));
        let path = resolve_path(Some(&p), DocumentKind::Invoice).unwrap();
        assert_eq!(path, format!("workspaces/{wid}/invoices"));
    }

    #[test]
    fn perfil_sem_workspace_resolve_para_a_colecao_pessoal() {
        let p = profile(None);
        let path = resolve_path(Some(&p), DocumentKind::Estimate).unwrap();
        assert_eq!(path, format!("principals/{}/estimates", p.principal_id));
    }

    #[test]
    fn sem_perfil_nao_resolve() {
        assert!(resolve_path(None, DocumentKind::Invoice).is_none());
    }

    #[test]
    fn principal_nulo_nao_resolve() {
        let mut p = profile(None);
        p.principal_id = Uuid::nil();
        assert!(resolve_path(Some(&p), DocumentKind::Invoice).is_none());
    }

    #[tokio::test]
    async fn criar_workspace_vincula_dono_e_perfil_atomicamente() {
        let store = Arc::new(MemoryStore::new());
        let service = TenancyService::new(store.clone());

        let p = profile(None);
        store
            .set(
                &profile_path(p.principal_id),
                serde_json::to_value(&p).unwrap(),
                false,
            )
            .await
            .unwrap();

        let ws = service.create_workspace(&p, "Oficina do Zé").await.unwrap();

        let member = store
            .get(&member_path(ws.id, &p.principal_id.to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member["status"], "active");
        assert_eq!(member["role"], "owner");

        let bound: UserProfile = serde_json::from_value(
            store.get(&profile_path(p.principal_id)).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(bound.workspace_id, Some(ws.id));
        assert_eq!(bound.role, Role::Owner);
    }

    #[tokio::test]
    async fn nao_cria_segundo_workspace_para_perfil_vinculado() {
        let store = Arc::new(MemoryStore::new());
        let service = TenancyService::new(store);

        let p = profile(Some(Uuid::new_v4()));
        let err = service.create_workspace(&p, "Outra").await;
        assert!(matches!(err, Err(AppError::AlreadyInWorkspace)));
    }

    #[tokio::test]
    async fn convite_duplicado_por_email_conflita() {
        let store = Arc::new(MemoryStore::new());
        let service = TenancyService::new(store);

        let owner = profile(Some(Uuid::new_v4()));
        let wid = owner.workspace_id.unwrap();
        service
            .invite_member(&owner, wid, "novo@empresa.com", Role::Employee, vec![])
            .await
            .unwrap();

        let err = service
            .invite_member(&owner, wid, "NOVO@empresa.com", Role::Viewer, vec![])
            .await;
        assert!(matches!(err, Err(AppError::MemberAlreadyExists)));
    }
}
