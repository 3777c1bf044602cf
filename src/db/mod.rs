// src/db/mod.rs

pub mod gateway;
pub mod memory;

pub use gateway::{WriteFailure, WriteGateway, WriteOp};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// Erros do colaborador de armazenamento. O backend hospedado fica atrás
// do trait; aqui só modelamos o que o core precisa distinguir.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("documento não existe: {0}")]
    NotFound(String),

    #[error("pré-condição falhou em: {0}")]
    PreconditionFailed(String),

    #[error("backend indisponível: {0}")]
    Unavailable(String),
}

// Uma operação dentro de um commit em lote.
// `Delete` carrega pré-condição de existência: é o mecanismo de
// de-duplicação da corrida de convites no bootstrap.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Set { path: String, data: Value, merge: bool },
    Update { path: String, patch: Value },
    Delete { path: String },
}

/// O colaborador de banco de documentos, injetado uma única vez no AppState.
///
/// Semântica esperada: leitura/escrita de documento único fortemente
/// consistente, `commit` atômico entre documentos, consultas entre coleções
/// eventualmente consistentes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// `merge = true` mescla os campos de nível superior no documento
    /// existente; `merge = false` substitui o documento inteiro.
    async fn set(&self, path: &str, data: Value, merge: bool) -> Result<(), StoreError>;

    /// Aplica um patch de campos de nível superior. Falha se o documento
    /// não existir.
    async fn update(&self, path: &str, patch: Value) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Lista todos os documentos diretos de uma coleção.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Consulta por igualdade de campo dentro de uma coleção.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// Consulta por igualdade de campo em TODAS as subcoleções com este
    /// nome, independente do pai (ex.: "members" de todos os workspaces).
    async fn query_group(
        &self,
        subcollection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// Commit atômico: ou todas as operações aplicam, ou nenhuma.
    async fn commit(&self, ops: Vec<BatchOp>) -> Result<(), StoreError>;
}

// Mescla os campos de nível superior de `patch` em `base`.
// Campos não-objeto (inclusive arrays) substituem o valor inteiro.
pub(crate) fn merge_fields(base: &mut Value, patch: &Value) {
    if let (Value::Object(base_map), Value::Object(patch_map)) = (base, patch) {
        for (k, v) in patch_map {
            base_map.insert(k.clone(), v.clone());
        }
    }
}

/// Extrai o id do pai dois níveis acima (ex.: o workspace de
/// `workspaces/{wid}/members/{id}`).
pub fn parent_id(path: &str) -> Option<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop()?; // id do documento
    segments.pop()?; // nome da subcoleção
    segments.pop()
}
