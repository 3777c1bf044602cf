// src/db/memory.rs

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{merge_fields, BatchOp, DocumentStore, StoreError};

/// Implementação em processo do colaborador de armazenamento.
///
/// Usada pelo servidor de desenvolvimento e por todos os testes; em produção
/// o cliente do banco hospedado entra atrás do mesmo trait. O mapa inteiro
/// vive sob um único RwLock, então `commit` é atômico por construção.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> StoreError {
        StoreError::Unavailable("lock envenenado".into())
    }

    // Documentos diretos de `collection`: prefixo bate e o restante do
    // caminho é um único segmento.
    fn in_collection(path: &str, collection: &str) -> bool {
        path.strip_prefix(collection)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
    }

    // Documentos de qualquer subcoleção chamada `subcollection`
    // (penúltimo segmento do caminho).
    fn in_group(path: &str, subcollection: &str) -> bool {
        let segments: Vec<&str> = path.split('/').collect();
        segments.len() >= 2 && segments[segments.len() - 2] == subcollection
    }

    fn matches(data: &Value, field: &str, value: &Value) -> bool {
        data.get(field) == Some(value)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.read().map_err(|_| Self::lock_err())?;
        Ok(docs.get(path).cloned())
    }

    async fn set(&self, path: &str, data: Value, merge: bool) -> Result<(), StoreError> {
        let mut docs = self.docs.write().map_err(|_| Self::lock_err())?;
        if merge {
            if let Some(existing) = docs.get_mut(path) {
                merge_fields(existing, &data);
                return Ok(());
            }
        }
        docs.insert(path.to_string(), data);
        Ok(())
    }

    async fn update(&self, path: &str, patch: Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write().map_err(|_| Self::lock_err())?;
        let existing = docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        merge_fields(existing, &patch);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.write().map_err(|_| Self::lock_err())?;
        docs.remove(path);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.read().map_err(|_| Self::lock_err())?;
        Ok(docs
            .iter()
            .filter(|(path, _)| Self::in_collection(path, collection))
            .map(|(path, data)| (path.clone(), data.clone()))
            .collect())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.read().map_err(|_| Self::lock_err())?;
        Ok(docs
            .iter()
            .filter(|(path, data)| {
                Self::in_collection(path, collection) && Self::matches(data, field, value)
            })
            .map(|(path, data)| (path.clone(), data.clone()))
            .collect())
    }

    async fn query_group(
        &self,
        subcollection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.read().map_err(|_| Self::lock_err())?;
        Ok(docs
            .iter()
            .filter(|(path, data)| {
                Self::in_group(path, subcollection) && Self::matches(data, field, value)
            })
            .map(|(path, data)| (path.clone(), data.clone()))
            .collect())
    }

    async fn commit(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut docs = self.docs.write().map_err(|_| Self::lock_err())?;

        // 1ª passada: valida pré-condições sem aplicar nada.
        for op in &ops {
            match op {
                BatchOp::Update { path, .. } => {
                    if !docs.contains_key(path) {
                        return Err(StoreError::NotFound(path.clone()));
                    }
                }
                BatchOp::Delete { path } => {
                    if !docs.contains_key(path) {
                        return Err(StoreError::PreconditionFailed(path.clone()));
                    }
                }
                BatchOp::Set { .. } => {}
            }
        }

        // 2ª passada: aplica tudo sob o mesmo lock.
        for op in ops {
            match op {
                BatchOp::Set { path, data, merge } => {
                    if merge {
                        if let Some(existing) = docs.get_mut(&path) {
                            merge_fields(existing, &data);
                            continue;
                        }
                    }
                    docs.insert(path, data);
                }
                BatchOp::Update { path, patch } => {
                    if let Some(existing) = docs.get_mut(&path) {
                        merge_fields(existing, &patch);
                    }
                }
                BatchOp::Delete { path } => {
                    docs.remove(&path);
                }
            }
        }
        Ok(())
    }
}
