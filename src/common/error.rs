use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Perfil não encontrado")]
    ProfileNotFound,

    #[error("Permissão '{0}' necessária")]
    PermissionDenied(String),

    #[error("Limite do plano gratuito atingido para '{0}'")]
    QuotaExceeded(String),

    #[error("Documento não encontrado")]
    DocumentNotFound,

    // Links compartilháveis são alcançados por terceiros sem sessão; um link
    // morto precisa de uma resposta terminal própria, nunca um 500 genérico.
    #[error("Link compartilhável não encontrado")]
    ShareNotFound,

    #[error("Workspace não encontrado")]
    WorkspaceNotFound,

    #[error("O principal já pertence a um workspace")]
    AlreadyInWorkspace,

    #[error("Já existe um membro com este e-mail")]
    MemberAlreadyExists,

    #[error("Transição de status inválida: {0} -> {1}")]
    InvalidTransition(String, String),

    #[error("O documento não está mais editável")]
    DocumentNotEditable,

    #[error("Assinatura incompleta: {0}")]
    SignatureIncomplete(String),

    #[error("O documento já foi respondido pela contraparte")]
    AlreadyResponded,

    #[error("Caminho de armazenamento não resolvido para o principal")]
    PathUnresolved,

    // Erros vindos do armazenamento de documentos
    #[error("Erro de armazenamento")]
    StoreError(#[from] StoreError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // Falha de quota é um portão de UX: a resposta carrega o caminho
            // de upgrade em vez de um erro opaco.
            AppError::QuotaExceeded(ref kind) => {
                let body = Json(json!({
                    "error": format!(
                        "Limite do plano gratuito atingido para '{}'. Faça upgrade para continuar.",
                        kind
                    ),
                    "upgradeUrl": "/upgrade",
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }

            AppError::PermissionDenied(ref perm) => {
                let body = Json(json!({
                    "error": format!("Você precisa da permissão '{}' para realizar esta ação.", perm),
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }

            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente.".to_string())
            }
            AppError::JwtError(_) => {
                (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente.".to_string())
            }
            AppError::ProfileNotFound => {
                (StatusCode::NOT_FOUND, "Perfil não encontrado.".to_string())
            }
            AppError::DocumentNotFound => {
                (StatusCode::NOT_FOUND, "Documento não encontrado.".to_string())
            }
            AppError::ShareNotFound => (
                StatusCode::NOT_FOUND,
                "Este link não corresponde a nenhum documento. Ele pode ter sido removido.".to_string(),
            ),
            AppError::WorkspaceNotFound => {
                (StatusCode::NOT_FOUND, "Workspace não encontrado.".to_string())
            }
            AppError::AlreadyInWorkspace => (
                StatusCode::CONFLICT,
                "O principal já pertence a um workspace.".to_string(),
            ),
            AppError::MemberAlreadyExists => (
                StatusCode::CONFLICT,
                "Já existe um membro ativo com este e-mail.".to_string(),
            ),
            AppError::InvalidTransition(ref from, ref to) => (
                StatusCode::CONFLICT,
                format!("Transição de status inválida: {} -> {}.", from, to),
            ),
            AppError::DocumentNotEditable => (
                StatusCode::CONFLICT,
                "O documento não está mais editável.".to_string(),
            ),
            AppError::SignatureIncomplete(ref field) => (
                StatusCode::BAD_REQUEST,
                format!("Assinatura incompleta: {}.", field),
            ),
            AppError::AlreadyResponded => (
                StatusCode::CONFLICT,
                "O documento já foi aceito ou recusado pela contraparte.".to_string(),
            ),
            AppError::PathUnresolved => (
                StatusCode::FORBIDDEN,
                "Não foi possível resolver o armazenamento deste principal.".to_string(),
            ),

            // Todos os outros erros (StoreError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
