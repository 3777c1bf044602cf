// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Session ---
        handlers::session::bootstrap,
        handlers::session::get_me,

        // --- Tenancy ---
        handlers::tenancy::create_workspace,
        handlers::tenancy::invite_member,
        handlers::tenancy::list_members,

        // --- Documents ---
        handlers::documents::create_document,
        handlers::documents::list_documents,
        handlers::documents::get_document,
        handlers::documents::update_document,
        handlers::documents::transition_document,
        handlers::documents::get_audit_log,

        // --- Share (público) ---
        handlers::share::get_share,
        handlers::share::accept_share,
        handlers::share::decline_share,

        // --- Billing ---
        handlers::billing::subscription_event,

        // --- RBAC ---
        handlers::rbac::list_permissions,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Principal,
            models::auth::Plan,
            models::auth::Role,
            models::auth::UserProfile,

            // --- Tenancy ---
            models::tenancy::Workspace,
            models::tenancy::Membership,
            models::tenancy::MembershipStatus,

            // --- Documents ---
            models::documents::DocumentKind,
            models::documents::DocumentStatus,
            models::documents::AuditAction,
            models::documents::AuditLogEntry,
            models::documents::SignatureRecord,
            models::documents::BillableDocument,
            models::documents::ShareView,

            // --- RBAC ---
            services::permission_service::PermissionInfo,

            // --- Billing ---
            services::billing_service::SubscriptionEvent,
            services::billing_service::SubscriptionEventKind,

            // --- Payloads ---
            handlers::session::BootstrapPayload,
            handlers::tenancy::CreateWorkspacePayload,
            handlers::tenancy::InviteMemberPayload,
            handlers::tenancy::UpdateMemberPayload,
            handlers::documents::CreateDocumentPayload,
            handlers::documents::UpdateDocumentPayload,
            handlers::documents::TransitionPayload,
            handlers::share::AcceptSharePayload,
        )
    ),
    tags(
        (name = "Session", description = "Bootstrap de vínculo e perfil do principal"),
        (name = "Tenancy", description = "Workspaces, membros e convites"),
        (name = "Documents", description = "Documentos faturáveis e livro-razão de auditoria"),
        (name = "Share", description = "Links compartilháveis (aceite/recusa da contraparte)"),
        (name = "Billing", description = "Eventos do processador de pagamentos"),
        (name = "RBAC", description = "Catálogo de permissões")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
