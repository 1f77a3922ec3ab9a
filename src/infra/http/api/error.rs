use crate::application::catalog::CatalogError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub detail: String,
    pub code: String,
}

pub mod codes {
    pub const NOT_FOUND: &str = "not_found";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
    pub const CACHE_UNAVAILABLE: &str = "cache_unavailable";
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
    diagnostic: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
            diagnostic: None,
        }
    }

    /// Internal detail that is logged but never sent to the client.
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_INPUT, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let diagnostic = self.diagnostic.unwrap_or_else(|| self.detail.clone());
        let body = ApiErrorBody {
            detail: self.detail,
            code: self.code.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        ErrorReport::from_message(
            "infra::http::api",
            self.status,
            format!("{}: {diagnostic}", self.code),
        )
        .attach(&mut response);
        response
    }
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "record with this id already exists",
        )
        .with_diagnostic(constraint),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => {
            ApiError::bad_request("invalid input").with_diagnostic(message)
        }
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "integrity constraint violated",
        )
        .with_diagnostic(message),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "database timeout",
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::STORE_UNAVAILABLE,
            "store of record unavailable",
        )
        .with_diagnostic(message),
    }
}

pub(crate) fn catalog_to_api(err: CatalogError) -> ApiError {
    match err {
        CatalogError::Domain(DomainError::NotFound { level }) => {
            ApiError::not_found(format!("{level} not found"))
        }
        CatalogError::Domain(DomainError::Validation { message }) => {
            ApiError::bad_request(message)
        }
        CatalogError::Repo(err) => repo_to_api(err),
        CatalogError::DiscountUnavailable(err) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::CACHE_UNAVAILABLE,
            "discount store unavailable",
        )
        .with_diagnostic(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::EntityLevel;

    #[test]
    fn not_found_names_the_missing_level() {
        let api = catalog_to_api(CatalogError::not_found(EntityLevel::Submenu));
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert_eq!(api.detail, "submenu not found");
    }

    #[test]
    fn repo_errors_map_to_conflict_and_unavailable() {
        let duplicate = repo_to_api(RepoError::Duplicate {
            constraint: "menus_pkey".to_string(),
        });
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let down = catalog_to_api(CatalogError::Repo(RepoError::from_persistence("refused")));
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(down.detail, "store of record unavailable");
    }
}
