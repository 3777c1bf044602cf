// src/services/bootstrap_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{parent_id, BatchOp, DocumentStore},
    models::{
        auth::{Plan, Principal, Role, UserProfile},
        tenancy::{invite_member_id, Membership, MembershipStatus},
    },
    services::tenancy_service::{member_path, profile_path},
};

// A busca cruzada da Estratégia B é um fallback raro; o teto evita que o
// crescimento de tenants a transforme em varredura ilimitada.
const BOOTSTRAP_SEARCH_LIMIT: usize = 50;

/// Protocolo de bootstrap de vínculo: o primeiro contato de um principal
/// recém-autenticado.
///
/// Idempotente por principal. Ou descobre e reivindica um convite pendente
/// (lote atômico), ou cria um perfil pessoal avulso. Nunca sobrescreve um
/// perfil já vinculado — edições administrativas manuais não podem ser
/// revertidas por um simples login.
#[derive(Clone)]
pub struct BootstrapService {
    store: Arc<dyn DocumentStore>,
}

impl BootstrapService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn bootstrap(
        &self,
        principal: &Principal,
        workspace_hint: Option<Uuid>,
    ) -> Result<UserProfile, AppError> {
        let existing = self.load_profile(principal.id).await?;

        // Já vinculado: no-op, zero escritas.
        if let Some(profile) = &existing {
            if profile.workspace_id.is_some() {
                return Ok(profile.clone());
            }
        }

        if let Some((invite_path, invitation)) =
            self.find_pending_invitation(principal, workspace_hint).await
        {
            match self.claim_invitation(principal, &invite_path, &invitation).await {
                Ok(profile) => return Ok(profile),
                Err(e) => {
                    // Corrida perdida (a outra aba apagou o placeholder
                    // primeiro) ou falha de lote: seguimos pelo caminho
                    // pessoal em vez de travar o login.
                    tracing::warn!(path = %invite_path, "reivindicação de convite falhou: {e}");
                    if let Some(profile) = self.load_profile(principal.id).await? {
                        if profile.workspace_id.is_some() {
                            return Ok(profile);
                        }
                    }
                }
            }
        }

        match existing {
            Some(profile) => Ok(profile),
            None => self.create_standalone(principal).await,
        }
    }

    // Estratégia A (preferida, O(1)): sonda o convite no id determinístico
    // derivado do e-mail, dentro do workspace sugerido pelo contexto.
    // Estratégia B (fallback, O(n)): busca cruzada por qualquer convite
    // pendente com o e-mail do principal.
    // Erros de busca são registrados e tratados como "nenhum convite".
    async fn find_pending_invitation(
        &self,
        principal: &Principal,
        workspace_hint: Option<Uuid>,
    ) -> Option<(String, Membership)> {
        let email = principal.email.trim().to_lowercase();

        if let Some(wid) = workspace_hint {
            let path = member_path(wid, &invite_member_id(&email));
            match self.store.get(&path).await {
                Ok(Some(doc)) => {
                    if let Some(m) = Self::parse_pending(&doc, &email) {
                        return Some((path, m));
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("sondagem de convite (estratégia A) falhou: {e}"),
            }
        }

        match self
            .store
            .query_group("members", "status", &json!("pending_invitation"))
            .await
        {
            Ok(candidates) => {
                if candidates.len() > BOOTSTRAP_SEARCH_LIMIT {
                    tracing::warn!(
                        total = candidates.len(),
                        "busca de convites excedeu o teto; considerando só os {BOOTSTRAP_SEARCH_LIMIT} primeiros"
                    );
                }
                candidates
                    .into_iter()
                    .take(BOOTSTRAP_SEARCH_LIMIT)
                    .find_map(|(path, doc)| Self::parse_pending(&doc, &email).map(|m| (path, m)))
            }
            Err(e) => {
                tracing::warn!("busca de convites (estratégia B) falhou: {e}");
                None
            }
        }
    }

    fn parse_pending(doc: &serde_json::Value, email: &str) -> Option<Membership> {
        let membership: Membership = serde_json::from_value(doc.clone()).ok()?;
        (membership.status == MembershipStatus::PendingInvitation
            && membership.email.eq_ignore_ascii_case(email))
        .then_some(membership)
    }

    /// Reivindica o convite em um único lote atômico: perfil vinculado,
    /// placeholder apagado, membro ativo chaveado pelo id real.
    ///
    /// O delete carrega pré-condição de existência — é o que desempata duas
    /// autenticações quase simultâneas: só uma encontra algo para apagar.
    async fn claim_invitation(
        &self,
        principal: &Principal,
        invite_path: &str,
        invitation: &Membership,
    ) -> Result<UserProfile, AppError> {
        let workspace_id: Uuid = parent_id(invite_path)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("caminho de convite malformado: {invite_path}"))?;

        let now = Utc::now();
        let profile = UserProfile {
            principal_id: principal.id,
            email: principal.email.trim().to_lowercase(),
            display_name: principal.display_name.clone(),
            workspace_id: Some(workspace_id),
            plan: Plan::Business,
            role: invitation.role,
            permission_overrides: invitation.permission_overrides.clone(),
            created_at: now,
            updated_at: now,
        };

        let membership = Membership {
            principal_id: Some(principal.id),
            email: profile.email.clone(),
            role: invitation.role,
            status: MembershipStatus::Active,
            permission_overrides: invitation.permission_overrides.clone(),
            invited_by: invitation.invited_by,
            created_at: invitation.created_at,
            updated_at: now,
        };

        let ops = vec![
            BatchOp::Set {
                path: profile_path(principal.id),
                data: serde_json::to_value(&profile).map_err(anyhow::Error::from)?,
                merge: false,
            },
            BatchOp::Delete { path: invite_path.to_string() },
            BatchOp::Set {
                path: member_path(workspace_id, &principal.id.to_string()),
                data: serde_json::to_value(&membership).map_err(anyhow::Error::from)?,
                merge: false,
            },
        ];
        self.store.commit(ops).await?;

        tracing::info!(%workspace_id, principal = %principal.id, "convite reivindicado");
        Ok(profile)
    }

    async fn create_standalone(&self, principal: &Principal) -> Result<UserProfile, AppError> {
        let now = Utc::now();
        let profile = UserProfile {
            principal_id: principal.id,
            email: principal.email.trim().to_lowercase(),
            display_name: principal.display_name.clone(),
            workspace_id: None,
            plan: Plan::Free,
            role: Role::FreeUser,
            permission_overrides: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .set(
                &profile_path(principal.id),
                serde_json::to_value(&profile).map_err(anyhow::Error::from)?,
                false,
            )
            .await?;

        tracing::info!(principal = %principal.id, "perfil pessoal criado");
        Ok(profile)
    }

    async fn load_profile(&self, principal_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        match self.store.get(&profile_path(principal_id)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc).map_err(anyhow::Error::from)?)),
            None => Ok(None),
        }
    }
}
