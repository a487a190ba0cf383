use serde::Serialize;
use thiserror::Error;

/// A single constraint violation, pointing at the offending property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Violation {
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Violation {
            message: message.into(),
            path: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum DocshelfError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{message}")]
    Validation {
        message: String,
        violations: Vec<Violation>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Storage engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocshelfError {
    /// Suggested HTTP status code, for the request-scoped error variants.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DocshelfError::Validation { .. } | DocshelfError::BadRequest(_) => Some(400),
            DocshelfError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// HTTP-shaped error payload for the request-scoped variants.
    /// Configuration and engine errors have no body; they are not client errors.
    pub fn to_body(&self) -> Option<ErrorBody> {
        let status_code = self.status_code()?;
        let errors = match self {
            DocshelfError::Validation { violations, .. } => violations.clone(),
            other => vec![Violation::message(other.to_string())],
        };
        Some(ErrorBody {
            status_code,
            status_message: self.to_string(),
            body: ErrorList { errors },
        })
    }
}

/// The error shape consumers serialize into HTTP responses:
/// `{statusCode, statusMessage, body: {errors: [{message, path?}]}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub status_message: String,
    pub body: ErrorList,
}

#[derive(Debug, Serialize)]
pub struct ErrorList {
    pub errors: Vec<Violation>,
}

pub type Result<T> = std::result::Result<T, DocshelfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_error_body_shape() {
        let err = DocshelfError::Validation {
            message: "Request body is invalid".into(),
            violations: vec![
                Violation::at("email", "Required field 'email' is missing"),
                Violation::at("age", "expected number, got string"),
            ],
        };

        let body = err.to_body().unwrap();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["statusMessage"], "Request body is invalid");
        assert_eq!(json["body"]["errors"][0]["path"], "email");
        assert_eq!(
            json["body"]["errors"][1]["message"],
            "expected number, got string"
        );
    }

    #[test]
    fn test_not_found_body() {
        let err = DocshelfError::NotFound("users".into());
        assert_eq!(err.status_code(), Some(404));
        let json = serde_json::to_value(err.to_body().unwrap()).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["body"]["errors"][0]["message"], "users not found");
        assert!(json["body"]["errors"][0].get("path").is_none());
    }

    #[test]
    fn test_non_request_errors_have_no_body() {
        let err = DocshelfError::Configuration("no schemas".into());
        assert_eq!(err.status_code(), None);
        assert!(err.to_body().is_none());
    }
}
