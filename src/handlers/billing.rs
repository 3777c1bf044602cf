// src/handlers/billing.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    services::billing_service::SubscriptionEvent,
};

// POST /api/billing/events
// Webhook do processador de pagamentos. A verificação da assinatura do
// webhook acontece no proxy de borda, antes de chegar aqui.
#[utoipa::path(
    post,
    path = "/api/billing/events",
    tag = "Billing",
    request_body = SubscriptionEvent,
    responses(
        (status = 204, description = "Evento processado; planos e papéis do workspace sincronizados")
    )
)]
pub async fn subscription_event(
    State(app_state): State<AppState>,
    Json(event): Json<SubscriptionEvent>,
) -> Result<impl IntoResponse, AppError> {
    app_state.billing_service.handle_event(&event).await?;
    Ok(StatusCode::NO_CONTENT)
}
