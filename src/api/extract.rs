//! Request extraction helpers that report failures in the API error envelope.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};

/// `Json<T>` whose rejections become 400 validation errors
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Trimmed, non-empty value of a required field
pub fn required(value: Option<String>, field: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| AppError::validation(format!("{} is required", field)))
}

/// `None` for missing or blank values
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  Asha ".into()), "name").unwrap(), "Asha");
        assert!(matches!(
            required(Some("   ".into()), "name"),
            Err(AppError::Validation(ref m)) if m == "name is required"
        ));
        assert!(required(None, "phone").is_err());
        assert_eq!(non_empty(Some("".into())), None);
    }
}
