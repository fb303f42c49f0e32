pub mod app_services;
pub mod catalog_services;
pub mod manifest_services;
pub mod token_cache_services;
pub mod token_issuer_services;
pub mod upstream_services;

pub use app_services::AppServices;
pub use token_issuer_services::DynTokenIssuer;
