// src/services/lifecycle_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::DocumentStore,
    models::{
        auth::UserProfile,
        documents::{
            AuditAction, BillableDocument, DocumentKind, DocumentStatus, ShareIndexEntry,
            ShareView, SignatureRecord,
        },
    },
    services::{audit_service, tenancy_service::{resolve_document_path, share_path}},
};

// Ator registrado no livro-razão para ações da contraparte externa.
const CLIENT_ACTOR: &str = "client";

/// A máquina de estados do ciclo de vida: `draft -> sent -> {accepted |
/// rejected | expired}`; faturas ainda suportam `sent -> {paid | overdue}`.
pub fn can_transition(kind: DocumentKind, from: DocumentStatus, to: DocumentStatus) -> bool {
    use DocumentStatus::*;
    match (from, to) {
        (Draft, Sent) => true,
        (Sent, Accepted) | (Sent, Rejected) | (Sent, Expired) => true,
        (Sent, Paid) | (Sent, Overdue) => kind == DocumentKind::Invoice,
        _ => false,
    }
}

/// `draft` e `sent` são os únicos estados em que o dono ainda edita.
pub fn is_editable(status: DocumentStatus) -> bool {
    matches!(status, DocumentStatus::Draft | DocumentStatus::Sent)
}

#[derive(Debug, Clone)]
pub struct AcceptanceInput {
    pub signer_name: Option<String>,
    pub signature_image: Option<String>,
    pub agreement_accepted: bool,
}

// Os três insumos do aceite são obrigatórios; qualquer ausência rejeita
// sem mudar status nem anexar entrada.
fn validate_acceptance(input: &AcceptanceInput) -> Result<(String, String), AppError> {
    let signer_name = input
        .signer_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::SignatureIncomplete("nome do signatário ausente".into()))?;
    let signature_image = input
        .signature_image
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::SignatureIncomplete("imagem da assinatura ausente".into()))?;
    if !input.agreement_accepted {
        return Err(AppError::SignatureIncomplete("aceite do acordo não confirmado".into()));
    }
    Ok((signer_name.to_string(), signature_image.to_string()))
}

/// Operações alcançáveis pelo link compartilhável — a única superfície
/// exposta a não-principais.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn DocumentStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // Um link velho ou adulterado cai aqui com ShareNotFound, nunca com um
    // erro genérico: este caminho é alcançável sem autenticação.
    async fn resolve_share(&self, document_id: Uuid) -> Result<(String, BillableDocument), AppError> {
        let index_doc = self
            .store
            .get(&share_path(document_id))
            .await?
            .ok_or(AppError::ShareNotFound)?;
        let entry: ShareIndexEntry =
            serde_json::from_value(index_doc).map_err(|_| AppError::ShareNotFound)?;

        let doc = self.store.get(&entry.path).await?.ok_or(AppError::ShareNotFound)?;
        let document: BillableDocument =
            serde_json::from_value(doc).map_err(|_| AppError::ShareNotFound)?;
        Ok((entry.path, document))
    }

    /// Visão pública do documento. O dono vê status e histórico, mas nunca
    /// os controles de aceitar/recusar (não pode se auto-aceitar).
    pub async fn share_view(
        &self,
        document_id: Uuid,
        viewer: Option<&UserProfile>,
    ) -> Result<ShareView, AppError> {
        let (path, document) = self.resolve_share(document_id).await?;

        let is_owner = viewer
            .and_then(|p| resolve_document_path(Some(p), document.kind, document.id))
            .is_some_and(|owner_path| owner_path == path);

        let can_respond = !is_owner
            && document.signature.is_none()
            && document.status == DocumentStatus::Sent;

        Ok(ShareView { document, can_respond, is_owner })
    }

    /// Aceite pela contraparte externa: assinatura completa, status
    /// `accepted` e entrada `signed` viajam em UMA escrita mesclada.
    pub async fn accept(
        &self,
        document_id: Uuid,
        input: &AcceptanceInput,
    ) -> Result<BillableDocument, AppError> {
        let (path, mut document) = self.resolve_share(document_id).await?;

        if document.signature.is_some() || document.status == DocumentStatus::Rejected {
            return Err(AppError::AlreadyResponded);
        }
        if !can_transition(document.kind, document.status, DocumentStatus::Accepted) {
            return Err(AppError::InvalidTransition(
                document.status.as_str().into(),
                DocumentStatus::Accepted.as_str().into(),
            ));
        }

        let (signer_name, signature_image) = validate_acceptance(input)?;

        let now = Utc::now();
        let signature = SignatureRecord { signer_name, signature_image, signed_at: now };
        audit_service::append_entry(
            &mut document.audit_log,
            AuditAction::Signed,
            CLIENT_ACTOR,
            None,
            None,
        );
        document.status = DocumentStatus::Accepted;
        document.signature = Some(signature);
        document.updated_at = now;

        // A contraparte precisa de certeza: escrita aguardada, não o gateway.
        self.store
            .update(
                &path,
                json!({
                    "status": document.status,
                    "signature": document.signature,
                    "auditLog": document.audit_log,
                    "updatedAt": now,
                }),
            )
            .await?;

        tracing::info!(document = %document_id, "documento aceito pela contraparte");
        Ok(document)
    }

    /// Recusa pela contraparte externa.
    pub async fn decline(&self, document_id: Uuid) -> Result<BillableDocument, AppError> {
        let (path, mut document) = self.resolve_share(document_id).await?;

        if document.signature.is_some() || document.status == DocumentStatus::Rejected {
            return Err(AppError::AlreadyResponded);
        }
        if !can_transition(document.kind, document.status, DocumentStatus::Rejected) {
            return Err(AppError::InvalidTransition(
                document.status.as_str().into(),
                DocumentStatus::Rejected.as_str().into(),
            ));
        }

        let now = Utc::now();
        audit_service::append_entry(
            &mut document.audit_log,
            AuditAction::Declined,
            CLIENT_ACTOR,
            None,
            None,
        );
        document.status = DocumentStatus::Rejected;
        document.updated_at = now;

        self.store
            .update(
                &path,
                json!({
                    "status": document.status,
                    "auditLog": document.audit_log,
                    "updatedAt": now,
                }),
            )
            .await?;

        tracing::info!(document = %document_id, "documento recusado pela contraparte");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::auth::{Plan, Role};
    use rust_decimal::Decimal;

    fn sent_document(kind: DocumentKind) -> BillableDocument {
        let now = Utc::now();
        BillableDocument {
            id: Uuid::new_v4(),
            kind,
            title: "Reforma do telhado".into(),
            customer_name: Some("João".into()),
            status: DocumentStatus::Sent,
            total: Decimal::new(150050, 2),
            currency: "BRL".into(),
            signature: None,
            audit_log: Vec::new(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed(store: &MemoryStore, doc: &BillableDocument, owner: Uuid) -> String {
        let path = format!("principals/{}/{}/{}", owner, doc.kind.collection(), doc.id);
        store.set(&path, serde_json::to_value(doc).unwrap(), false).await.unwrap();
        store
            .set(
                &share_path(doc.id),
                serde_json::to_value(ShareIndexEntry { path: path.clone(), kind: doc.kind })
                    .unwrap(),
                false,
            )
            .await
            .unwrap();
        path
    }

    fn full_input() -> AcceptanceInput {
        AcceptanceInput {
            signer_name: Some("João da Silva".into()),
            signature_image: Some("data:image/png;base64,iVBOR".into()),
            agreement_accepted: true,
        }
    }

    #[test]
    fn tabela_de_transicoes() {
        use DocumentStatus::*;
        assert!(can_transition(DocumentKind::Quote, Draft, Sent));
        assert!(can_transition(DocumentKind::Quote, Sent, Accepted));
        assert!(can_transition(DocumentKind::Quote, Sent, Rejected));
        assert!(can_transition(DocumentKind::Quote, Sent, Expired));
        // Paid/overdue só para faturas.
        assert!(can_transition(DocumentKind::Invoice, Sent, Paid));
        assert!(!can_transition(DocumentKind::Quote, Sent, Paid));
        // Estados terminais não voltam.
        assert!(!can_transition(DocumentKind::Invoice, Accepted, Sent));
        assert!(!can_transition(DocumentKind::Invoice, Rejected, Accepted));
        assert!(!can_transition(DocumentKind::Invoice, Draft, Accepted));
    }

    #[tokio::test]
    async fn aceite_sem_imagem_nao_muda_nada() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let doc = sent_document(DocumentKind::Estimate);
        let path = seed(&store, &doc, Uuid::new_v4()).await;

        let mut input = full_input();
        input.signature_image = None;

        let err = service.accept(doc.id, &input).await;
        assert!(matches!(err, Err(AppError::SignatureIncomplete(_))));

        // Nem status nem livro-razão mudaram.
        let stored: BillableDocument =
            serde_json::from_value(store.get(&path).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.status, DocumentStatus::Sent);
        assert!(stored.audit_log.is_empty());
    }

    #[tokio::test]
    async fn aceite_completo_grava_assinatura_status_e_entrada() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let doc = sent_document(DocumentKind::Quote);
        let path = seed(&store, &doc, Uuid::new_v4()).await;

        let accepted = service.accept(doc.id, &full_input()).await.unwrap();
        assert_eq!(accepted.status, DocumentStatus::Accepted);
        assert_eq!(accepted.signature.as_ref().unwrap().signer_name, "João da Silva");

        let stored: BillableDocument =
            serde_json::from_value(store.get(&path).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.status, DocumentStatus::Accepted);
        assert!(stored.signature.is_some());
        assert_eq!(stored.audit_log.len(), 1);
        assert_eq!(stored.audit_log[0].version, 1);
        assert_eq!(stored.audit_log[0].actor, "client");
        assert!(matches!(stored.audit_log[0].action, AuditAction::Signed));
    }

    #[tokio::test]
    async fn recusa_e_depois_aceite_e_rejeitado() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let doc = sent_document(DocumentKind::Estimate);
        seed(&store, &doc, Uuid::new_v4()).await;

        service.decline(doc.id).await.unwrap();

        let err = service.accept(doc.id, &full_input()).await;
        assert!(matches!(err, Err(AppError::AlreadyResponded)));

        // E a visão pública já não oferece os controles.
        let view = service.share_view(doc.id, None).await.unwrap();
        assert!(!view.can_respond);
        assert_eq!(view.document.status, DocumentStatus::Rejected);
    }

    #[tokio::test]
    async fn segundo_aceite_e_rejeitado() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let doc = sent_document(DocumentKind::Quote);
        seed(&store, &doc, Uuid::new_v4()).await;

        service.accept(doc.id, &full_input()).await.unwrap();
        let err = service.decline(doc.id).await;
        assert!(matches!(err, Err(AppError::AlreadyResponded)));
    }

    #[tokio::test]
    async fn link_morto_produz_nao_encontrado_distinto() {
        let service = LifecycleService::new(Arc::new(MemoryStore::new()));
        let err = service.share_view(Uuid::new_v4(), None).await;
        assert!(matches!(err, Err(AppError::ShareNotFound)));

        let err = service.accept(Uuid::new_v4(), &full_input()).await;
        assert!(matches!(err, Err(AppError::ShareNotFound)));
    }

    #[tokio::test]
    async fn dono_ve_mas_nao_responde() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let owner_id = Uuid::new_v4();
        let doc = sent_document(DocumentKind::Quote);
        seed(&store, &doc, owner_id).await;

        let owner_profile = UserProfile {
            principal_id: owner_id,
            email: "dono@pessoal.com".into(),
            display_name: None,
            workspace_id: None,
            plan: Plan::Free,
            role: Role::FreeUser,
            permission_overrides: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = service.share_view(doc.id, Some(&owner_profile)).await.unwrap();
        assert!(view.is_owner);
        assert!(!view.can_respond);

        // A contraparte anônima, por sua vez, pode responder.
        let anon = service.share_view(doc.id, None).await.unwrap();
        assert!(!anon.is_owner);
        assert!(anon.can_respond);
    }

    #[tokio::test]
    async fn rascunho_nao_aceita() {
        let store = Arc::new(MemoryStore::new());
        let service = LifecycleService::new(store.clone());
        let mut doc = sent_document(DocumentKind::Quote);
        doc.status = DocumentStatus::Draft;
        seed(&store, &doc, Uuid::new_v4()).await;

        let err = service.accept(doc.id, &full_input()).await;
        assert!(matches!(err, Err(AppError::InvalidTransition(_, _))));
    }
}
