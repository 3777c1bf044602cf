// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{Claims, Principal},
};

fn decode_principal(token: &str, secret: &str) -> Result<Principal, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(Principal {
        id: token_data.claims.sub,
        email: token_data.claims.email,
        display_name: token_data.claims.name,
    })
}

// O middleware em si: valida o token de sessão do provedor de autenticação
// e insere o Principal nos "extensions" da requisição. O core nunca emite
// tokens nem gerencia credenciais.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    if let Some(auth_header) = auth_header {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            let principal = decode_principal(token, &app_state.jwt_secret)?;
            request.extensions_mut().insert(principal);
            return Ok(next.run(request).await);
        }
    }

    Err(AppError::InvalidToken)
}

// Extrator para obter o principal autenticado diretamente nos handlers
pub struct AuthenticatedPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or(AppError::InvalidToken)
    }
}

/// Extrator que carrega o perfil do principal autenticado a partir do
/// armazenamento. Rejeita com 404 se o bootstrap ainda não rodou.
pub struct CurrentProfile(pub crate::models::auth::UserProfile);

impl<S> FromRequestParts<S> for CurrentProfile
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        let profile = app_state
            .tenancy_service
            .get_profile(principal.id)
            .await?
            .ok_or(AppError::ProfileNotFound)?;
        Ok(CurrentProfile(profile))
    }
}

/// Extrator tolerante para rotas públicas (links compartilháveis): se
/// houver um token válido, identifica o visitante; qualquer falha vira
/// simplesmente "anônimo", nunca uma rejeição.
pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let principal = parts
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .and_then(|token| decode_principal(token, &app_state.jwt_secret).ok());
        Ok(MaybePrincipal(principal))
    }
}
