// src/db/gateway.rs

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use super::{DocumentStore, StoreError};

const FAILURE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Create => write!(f, "create"),
            WriteOp::Update => write!(f, "update"),
            WriteOp::Delete => write!(f, "delete"),
        }
    }
}

/// Falha de escrita publicada fora de banda, chaveada por operação e caminho.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub op: WriteOp,
    pub path: String,
    pub message: String,
}

/// Gateway de escrita não-bloqueante.
///
/// Os métodos `dispatch_*` despacham a mutação em uma task e retornam na
/// hora; a falha vai para o canal de broadcast, onde um assinante (banner de
/// erro, logger) a consome. Quem precisa de certeza síncrona — criação
/// limitada por quota, bootstrap — usa as variantes aguardadas.
#[derive(Clone)]
pub struct WriteGateway {
    store: Arc<dyn DocumentStore>,
    failures: broadcast::Sender<WriteFailure>,
}

impl WriteGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self { store, failures }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WriteFailure> {
        self.failures.subscribe()
    }

    // --- Variantes fire-and-forget ---

    pub fn dispatch_set(&self, path: String, data: Value, merge: bool) {
        let store = Arc::clone(&self.store);
        let failures = self.failures.clone();
        tokio::spawn(async move {
            if let Err(e) = store.set(&path, data, merge).await {
                Self::publish(&failures, WriteOp::Create, path, e);
            }
        });
    }

    pub fn dispatch_update(&self, path: String, patch: Value) {
        let store = Arc::clone(&self.store);
        let failures = self.failures.clone();
        tokio::spawn(async move {
            if let Err(e) = store.update(&path, patch).await {
                Self::publish(&failures, WriteOp::Update, path, e);
            }
        });
    }

    pub fn dispatch_delete(&self, path: String) {
        let store = Arc::clone(&self.store);
        let failures = self.failures.clone();
        tokio::spawn(async move {
            if let Err(e) = store.delete(&path).await {
                Self::publish(&failures, WriteOp::Delete, path, e);
            }
        });
    }

    // --- Variantes aguardadas, para quem precisa do resultado ---

    pub async fn set(&self, path: &str, data: Value, merge: bool) -> Result<(), StoreError> {
        self.store.set(path, data, merge).await
    }

    pub async fn update(&self, path: &str, patch: Value) -> Result<(), StoreError> {
        self.store.update(path, patch).await
    }

    fn publish(
        failures: &broadcast::Sender<WriteFailure>,
        op: WriteOp,
        path: String,
        err: StoreError,
    ) {
        let failure = WriteFailure { op, path, message: err.to_string() };
        // Sem assinantes não é erro: o canal só existe para quem quiser ouvir.
        let _ = failures.send(failure);
    }
}

/// Assinante padrão: loga cada falha de escrita. É o análogo servidor do
/// banner de "permissão negada" da UI.
pub async fn log_write_failures(mut rx: broadcast::Receiver<WriteFailure>) {
    loop {
        match rx.recv().await {
            Ok(failure) => {
                tracing::warn!(
                    op = %failure.op,
                    path = %failure.path,
                    "falha de escrita fora de banda: {}",
                    failure.message
                );
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("assinante de falhas atrasado: {} eventos perdidos", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
