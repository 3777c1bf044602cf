pub mod audit_service;
pub mod billing_service;
pub mod bootstrap_service;
pub mod document_service;
pub mod lifecycle_service;
pub mod permission_service;
pub mod quota_service;
pub mod tenancy_service;
