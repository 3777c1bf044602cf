//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::db::gateway::log_write_failures;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().expect("Falha ao inicializar o estado da aplicação.");

    // Assinante do canal de falhas do gateway de escrita não-bloqueante.
    tokio::spawn(log_write_failures(app_state.gateway.subscribe()));

    // Rotas de sessão (o lado servidor do callback de autenticação)
    let session_routes = Router::new()
        .route("/bootstrap", post(handlers::session::bootstrap))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let user_routes = Router::new()
        .route("/me", get(handlers::session::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let workspace_routes = Router::new()
        .route("/", post(handlers::tenancy::create_workspace))
        .route("/current", get(handlers::tenancy::get_current_workspace))
        .route(
            "/members",
            get(handlers::tenancy::list_members).post(handlers::tenancy::invite_member),
        )
        .route("/members/{principal_id}", put(handlers::tenancy::update_member))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let document_routes = Router::new()
        .route(
            "/{kind}",
            post(handlers::documents::create_document).get(handlers::documents::list_documents),
        )
        .route(
            "/{kind}/{id}",
            get(handlers::documents::get_document)
                .put(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route("/{kind}/{id}/transition", post(handlers::documents::transition_document))
        .route("/{kind}/{id}/audit", get(handlers::documents::get_audit_log))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Rotas públicas: a única superfície alcançável sem autenticação.
    let share_routes = Router::new()
        .route("/{id}", get(handlers::share::get_share))
        .route("/{id}/accept", post(handlers::share::accept_share))
        .route("/{id}/decline", post(handlers::share::decline_share));

    let billing_routes = Router::new()
        .route("/events", post(handlers::billing::subscription_event));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/permissions", get(handlers::rbac::list_permissions))
        .nest("/api/session", session_routes)
        .nest("/api/users", user_routes)
        .nest("/api/workspaces", workspace_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/share", share_routes)
        .nest("/api/billing", billing_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
