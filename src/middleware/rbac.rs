// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{AccessSubject, Principal, UserProfile},
    services::permission_service,
};

/// 1. O trait que define o que é uma permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O extrator (guardião): carrega o perfil e verifica a permissão no
/// motor ANTES do handler rodar. O handler recebe o perfil já verificado.
pub struct RequirePermission<T> {
    pub profile: UserProfile,
    _marker: PhantomData<T>,
}

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. Extrai o principal (inserido pelo auth_guard)
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::InvalidToken)?;

        // B. Carrega o perfil
        let profile = app_state
            .tenancy_service
            .get_profile(principal.id)
            .await?
            .ok_or(AppError::ProfileNotFound)?;

        // C. Verifica no motor de permissões
        let subject = AccessSubject::from(&profile);
        let required_perm = T::slug();
        if !permission_service::has_access(Some(&subject), required_perm) {
            return Err(AppError::PermissionDenied(required_perm.to_string()));
        }

        Ok(RequirePermission { profile, _marker: PhantomData })
    }
}

/// Recheque imediatamente antes de uma mutação — o portão da UI (e até o
/// extrator da rota) é contornável; a escrita não.
pub fn ensure_access(profile: &UserProfile, permission_id: &str) -> Result<(), AppError> {
    let subject = AccessSubject::from(profile);
    if permission_service::has_access(Some(&subject), permission_id) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(permission_id.to_string()))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermManageEmployees;
impl PermissionDef for PermManageEmployees {
    fn slug() -> &'static str {
        "manage:employees"
    }
}

pub struct PermManageWorkspace;
impl PermissionDef for PermManageWorkspace {
    fn slug() -> &'static str {
        "manage:workspace"
    }
}
