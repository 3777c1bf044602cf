// src/config.rs

use std::env;
use std::sync::Arc;

use crate::db::{DocumentStore, MemoryStore, WriteGateway};
use crate::services::{
    billing_service::BillingService, bootstrap_service::BootstrapService,
    document_service::DocumentService, lifecycle_service::LifecycleService,
    quota_service::QuotaService, tenancy_service::TenancyService,
};

// O estado compartilhado, construído UMA vez no arranque e injetado
// explicitamente — nada de singletons ambientes, para que cada serviço
// seja testável isoladamente com dublês.
#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub store: Arc<dyn DocumentStore>,
    pub gateway: WriteGateway,
    pub bootstrap_service: BootstrapService,
    pub tenancy_service: TenancyService,
    pub quota_service: QuotaService,
    pub document_service: DocumentService,
    pub lifecycle_service: LifecycleService,
    pub billing_service: BillingService,
}

impl AppState {
    // Carrega as configurações do ambiente e monta o grafo de serviços.
    pub fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET deve ser definida"))?;

        // Em produção o cliente do banco hospedado entra aqui, atrás do
        // mesmo trait.
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        Ok(Self::with_store(jwt_secret, store))
    }

    pub fn with_store(jwt_secret: String, store: Arc<dyn DocumentStore>) -> Self {
        let gateway = WriteGateway::new(store.clone());
        Self {
            jwt_secret,
            bootstrap_service: BootstrapService::new(store.clone()),
            tenancy_service: TenancyService::new(store.clone()),
            quota_service: QuotaService::new(store.clone()),
            document_service: DocumentService::new(store.clone(), gateway.clone()),
            lifecycle_service: LifecycleService::new(store.clone()),
            billing_service: BillingService::new(store.clone()),
            gateway,
            store,
        }
    }
}
