//! Shared API request/response types
//!
//! Mutating endpoints answer with a tagged envelope:
//! `{"success": true, "result": ...}` or
//! `{"success": false, "error": {"message": ...}}`.

use serde::{Deserialize, Serialize};

/// Error payload inside a failed envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,

    /// Set when the concert's order keys must be respaced before retrying
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_rebalance: bool,
}

/// Success-or-error response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Success { success: True, result: T },
    Failure { success: False, error: ErrorBody },
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        ApiResponse::Success {
            success: True,
            result,
        }
    }

    pub fn failure(error: ErrorBody) -> Self {
        ApiResponse::Failure {
            success: False,
            error,
        }
    }
}

impl From<&crate::Error> for ErrorBody {
    fn from(err: &crate::Error) -> Self {
        ErrorBody {
            message: err.to_string(),
            needs_rebalance: err.needs_rebalance(),
        }
    }
}

/// Serializes as the literal `true`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct True;

/// Serializes as the literal `false`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct False;

macro_rules! bool_literal {
    ($ty:ident, $value:literal) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bool($value)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if bool::deserialize(deserializer)? == $value {
                    Ok($ty)
                } else {
                    Err(serde::de::Error::custom(concat!("expected ", stringify!($value))))
                }
            }
        }
    };
}

bool_literal!(True, true);
bool_literal!(False, false);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let value = serde_json::to_value(ApiResponse::ok(json!({"id": "x"}))).unwrap();
        assert_eq!(value, json!({"success": true, "result": {"id": "x"}}));
    }

    #[test]
    fn test_error_envelope() {
        let body = ErrorBody {
            message: "Invalid passcode".to_string(),
            needs_rebalance: false,
        };
        let value = serde_json::to_value(ApiResponse::<()>::failure(body)).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": {"message": "Invalid passcode"}})
        );
    }

    #[test]
    fn test_exhaustion_sets_rebalance_flag() {
        let err = crate::Error::from(crate::OrderKeyError::Exhausted {
            before: "0000001.000".to_string(),
            after: "0000001.001".to_string(),
        });
        let value = serde_json::to_value(ApiResponse::<()>::failure(ErrorBody::from(&err))).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["needs_rebalance"], json!(true));
    }

    #[test]
    fn test_envelope_deserializes_by_flag() {
        let parsed: ApiResponse<u32> =
            serde_json::from_value(json!({"success": false, "error": {"message": "no"}})).unwrap();
        assert!(matches!(parsed, ApiResponse::Failure { .. }));

        let parsed: ApiResponse<u32> =
            serde_json::from_value(json!({"success": true, "result": 7})).unwrap();
        assert!(matches!(parsed, ApiResponse::Success { result: 7, .. }));
    }
}
