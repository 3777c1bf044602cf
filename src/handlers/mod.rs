pub mod billing;
pub mod documents;
pub mod rbac;
pub mod session;
pub mod share;
pub mod tenancy;
