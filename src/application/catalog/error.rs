use thiserror::Error;

use crate::application::repos::RepoError;
use crate::cache::CacheError;
use crate::domain::error::{DomainError, EntityLevel};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("discount store unavailable")]
    DiscountUnavailable(#[source] CacheError),
}

impl CatalogError {
    pub fn not_found(level: EntityLevel) -> Self {
        Self::Domain(DomainError::not_found(level))
    }

    /// The hierarchy level reported missing, if this is a not-found error.
    pub fn missing_level(&self) -> Option<EntityLevel> {
        match self {
            CatalogError::Domain(DomainError::NotFound { level }) => Some(*level),
            _ => None,
        }
    }
}
