// src/services/document_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BatchOp, DocumentStore, WriteGateway},
    models::{
        auth::UserProfile,
        documents::{
            AuditAction, AuditLogEntry, BillableDocument, DocumentKind, DocumentStatus,
            ShareIndexEntry,
        },
    },
    services::{
        audit_service,
        lifecycle_service::{can_transition, is_editable},
        tenancy_service::{resolve_document_path, resolve_path, share_path},
    },
};

#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub title: String,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub customer_name: Option<String>,
    pub total: Option<Decimal>,
    pub currency: Option<String>,
}

/// CRUD dos documentos faturáveis, costurando roteador de tenant, livro-razão
/// e gateway de escrita.
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn DocumentStore>,
    gateway: WriteGateway,
}

impl DocumentService {
    pub fn new(store: Arc<dyn DocumentStore>, gateway: WriteGateway) -> Self {
        Self { store, gateway }
    }

    /// Criação aguardada: o chamador passou pelo guarda de quota e precisa
    /// saber que a escrita aconteceu. Documento + índice de compartilhamento
    /// nascem no mesmo lote.
    pub async fn create_document(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        draft: DocumentDraft,
    ) -> Result<BillableDocument, AppError> {
        let Some(collection) = resolve_path(Some(profile), kind) else {
            return Err(AppError::PathUnresolved);
        };

        let now = Utc::now();
        let mut document = BillableDocument {
            id: Uuid::new_v4(),
            kind,
            title: draft.title,
            customer_name: draft.customer_name,
            status: DocumentStatus::Draft,
            total: draft.total,
            currency: draft.currency,
            signature: None,
            audit_log: Vec::new(),
            created_by: profile.principal_id,
            created_at: now,
            updated_at: now,
        };
        audit_service::append_entry(
            &mut document.audit_log,
            AuditAction::Created,
            &profile.email,
            None,
            None,
        );

        let path = format!("{collection}/{}", document.id);
        let ops = vec![
            BatchOp::Set {
                path: path.clone(),
                data: serde_json::to_value(&document).map_err(anyhow::Error::from)?,
                merge: false,
            },
            BatchOp::Set {
                path: share_path(document.id),
                data: serde_json::to_value(ShareIndexEntry { path, kind })
                    .map_err(anyhow::Error::from)?,
                merge: false,
            },
        ];
        self.store.commit(ops).await?;

        Ok(document)
    }

    pub async fn list_documents(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
    ) -> Result<Vec<BillableDocument>, AppError> {
        let Some(collection) = resolve_path(Some(profile), kind) else {
            return Err(AppError::PathUnresolved);
        };

        let docs = self.store.list(&collection).await?;
        let mut documents = Vec::with_capacity(docs.len());
        for (_, doc) in docs {
            documents.push(
                serde_json::from_value::<BillableDocument>(doc).map_err(anyhow::Error::from)?,
            );
        }
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    pub async fn get_document(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<BillableDocument, AppError> {
        let (_, document) = self.load(profile, kind, document_id).await?;
        Ok(document)
    }

    /// Atualização editável: diff entre os dois estados vira a entrada
    /// `updated`, e campos alterados + nova entrada viajam em UMA escrita
    /// mesclada despachada pelo gateway (fire-and-forget — a UI não espera).
    pub async fn update_document(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
        patch: DocumentPatch,
    ) -> Result<BillableDocument, AppError> {
        let (path, mut document) = self.load(profile, kind, document_id).await?;

        if !is_editable(document.status) {
            return Err(AppError::DocumentNotEditable);
        }

        let previous = serde_json::to_value(&document).map_err(anyhow::Error::from)?;

        if let Some(title) = patch.title {
            document.title = title;
        }
        if let Some(customer_name) = patch.customer_name {
            document.customer_name = Some(customer_name);
        }
        if let Some(total) = patch.total {
            document.total = total;
        }
        if let Some(currency) = patch.currency {
            document.currency = currency;
        }
        document.updated_at = Utc::now();

        let next = serde_json::to_value(&document).map_err(anyhow::Error::from)?;
        audit_service::append_entry(
            &mut document.audit_log,
            AuditAction::Updated,
            &profile.email,
            Some(&previous),
            Some(&next),
        );

        self.gateway.dispatch_update(
            path,
            json!({
                "title": document.title,
                "customerName": document.customer_name,
                "total": document.total,
                "currency": document.currency,
                "auditLog": document.audit_log,
                "updatedAt": document.updated_at,
            }),
        );

        Ok(document)
    }

    /// Transição disparada pelo dono (enviar, marcar pago, expirar).
    /// Aceite/recusa são exclusivos do caminho compartilhável.
    pub async fn transition(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
        to: DocumentStatus,
    ) -> Result<BillableDocument, AppError> {
        let (path, mut document) = self.load(profile, kind, document_id).await?;

        if matches!(to, DocumentStatus::Accepted | DocumentStatus::Rejected)
            || !can_transition(document.kind, document.status, to)
        {
            return Err(AppError::InvalidTransition(
                document.status.as_str().into(),
                to.as_str().into(),
            ));
        }

        let action = match to {
            DocumentStatus::Sent => AuditAction::Sent,
            DocumentStatus::Paid => AuditAction::Paid,
            DocumentStatus::Expired => AuditAction::Expired,
            _ => AuditAction::Updated,
        };
        audit_service::append_entry(&mut document.audit_log, action, &profile.email, None, None);
        document.status = to;
        document.updated_at = Utc::now();

        // Mudança de estado importa: escrita aguardada.
        self.gateway
            .update(
                &path,
                json!({
                    "status": document.status,
                    "auditLog": document.audit_log,
                    "updatedAt": document.updated_at,
                }),
            )
            .await?;

        Ok(document)
    }

    /// Remoção fire-and-forget: documento e índice de compartilhamento saem
    /// pelo gateway; falhas aparecem no canal fora de banda.
    pub async fn delete_document(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<(), AppError> {
        let (path, _) = self.load(profile, kind, document_id).await?;

        self.gateway.dispatch_delete(path);
        self.gateway.dispatch_delete(share_path(document_id));
        Ok(())
    }

    pub async fn audit_log(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let (_, document) = self.load(profile, kind, document_id).await?;
        Ok(audit_service::sorted_for_display(&document.audit_log))
    }

    async fn load(
        &self,
        profile: &UserProfile,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<(String, BillableDocument), AppError> {
        let Some(path) = resolve_document_path(Some(profile), kind, document_id) else {
            return Err(AppError::PathUnresolved);
        };
        let doc = self.store.get(&path).await?.ok_or(AppError::DocumentNotFound)?;
        let document = serde_json::from_value(doc).map_err(anyhow::Error::from)?;
        Ok((path, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::auth::{Plan, Role};
    use std::time::Duration;

    fn service() -> (Arc<MemoryStore>, DocumentService) {
        let store = Arc::new(MemoryStore::new());
        let gateway = WriteGateway::new(store.clone());
        (store.clone(), DocumentService::new(store, gateway))
    }

    fn free_profile() -> UserProfile {
        UserProfile {
            principal_id: Uuid::new_v4(),
            email: "ze@pessoal.com".into(),
            display_name: None,
            workspace_id: None,
            plan: Plan::Free,
            role: Role::FreeUser,
            permission_overrides: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn draft() -> DocumentDraft {
        DocumentDraft {
            title: "Troca do portão".into(),
            customer_name: Some("João".into()),
            total: Decimal::new(120000, 2),
            currency: "BRL".into(),
        }
    }

    async fn flush() {
        // Dá tempo das escritas despachadas pelo gateway completarem.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn criacao_grava_documento_e_indice_de_compartilhamento() {
        let (store, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Invoice, draft()).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.audit_log.len(), 1);
        assert_eq!(doc.audit_log[0].version, 1);
        assert!(matches!(doc.audit_log[0].action, AuditAction::Created));

        let share = store.get(&share_path(doc.id)).await.unwrap().unwrap();
        assert_eq!(
            share["path"],
            format!("principals/{}/invoices/{}", p.principal_id, doc.id)
        );
    }

    #[tokio::test]
    async fn atualizacao_gera_diff_e_versao_sequencial() {
        let (store, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Estimate, draft()).await.unwrap();
        let patch = DocumentPatch { total: Some(Decimal::new(150000, 2)), ..Default::default() };
        let updated = service
            .update_document(&p, DocumentKind::Estimate, doc.id, patch)
            .await
            .unwrap();

        assert_eq!(updated.audit_log.len(), 2);
        assert_eq!(updated.audit_log[1].version, 2);
        let changes = updated.audit_log[1].changes.as_ref().unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].contains("total"));

        flush().await;
        let stored: BillableDocument = serde_json::from_value(
            store
                .get(&format!("principals/{}/estimates/{}", p.principal_id, doc.id))
                .await
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(stored.audit_log.len(), 2);
        assert_eq!(stored.total, Decimal::new(150000, 2));
    }

    #[tokio::test]
    async fn documento_aceito_nao_e_mais_editavel() {
        let (store, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Quote, draft()).await.unwrap();
        let path = format!("principals/{}/quotes/{}", p.principal_id, doc.id);
        store.update(&path, json!({"status": "accepted"})).await.unwrap();

        let err = service
            .update_document(&p, DocumentKind::Quote, doc.id, DocumentPatch::default())
            .await;
        assert!(matches!(err, Err(AppError::DocumentNotEditable)));
    }

    #[tokio::test]
    async fn transicoes_do_dono_respeitam_a_maquina_de_estados() {
        let (_, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Invoice, draft()).await.unwrap();

        // Rascunho não vira pago direto.
        let err = service
            .transition(&p, DocumentKind::Invoice, doc.id, DocumentStatus::Paid)
            .await;
        assert!(matches!(err, Err(AppError::InvalidTransition(_, _))));

        let sent = service
            .transition(&p, DocumentKind::Invoice, doc.id, DocumentStatus::Sent)
            .await
            .unwrap();
        assert_eq!(sent.status, DocumentStatus::Sent);

        let paid = service
            .transition(&p, DocumentKind::Invoice, doc.id, DocumentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, DocumentStatus::Paid);
        let versions: Vec<u64> = paid.audit_log.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn dono_nao_se_auto_aceita() {
        let (_, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Quote, draft()).await.unwrap();
        service
            .transition(&p, DocumentKind::Quote, doc.id, DocumentStatus::Sent)
            .await
            .unwrap();

        let err = service
            .transition(&p, DocumentKind::Quote, doc.id, DocumentStatus::Accepted)
            .await;
        assert!(matches!(err, Err(AppError::InvalidTransition(_, _))));
    }

    #[tokio::test]
    async fn remocao_apaga_documento_e_indice() {
        let (store, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Invoice, draft()).await.unwrap();
        service.delete_document(&p, DocumentKind::Invoice, doc.id).await.unwrap();

        flush().await;
        let path = format!("principals/{}/invoices/{}", p.principal_id, doc.id);
        assert!(store.get(&path).await.unwrap().is_none());
        assert!(store.get(&share_path(doc.id)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn documento_inexistente_e_nao_encontrado() {
        let (_, service) = service();
        let p = free_profile();
        let err = service.get_document(&p, DocumentKind::Invoice, Uuid::new_v4()).await;
        assert!(matches!(err, Err(AppError::DocumentNotFound)));
    }

    #[tokio::test]
    async fn historico_sai_em_ordem_decrescente() {
        let (_, service) = service();
        let p = free_profile();

        let doc = service.create_document(&p, DocumentKind::Invoice, draft()).await.unwrap();
        service
            .transition(&p, DocumentKind::Invoice, doc.id, DocumentStatus::Sent)
            .await
            .unwrap();

        let log = service.audit_log(&p, DocumentKind::Invoice, doc.id).await.unwrap();
        let versions: Vec<u64> = log.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![2, 1]);
    }
}
