use axum::http::HeaderMap;
use serde::Serialize;

/// Headers populated by the hosting platform's authentication layer
pub const PRINCIPAL_NAME_HEADER: &str = "x-ms-client-principal-name";
pub const PRINCIPAL_ID_HEADER: &str = "x-ms-client-principal-id";

const DEFAULT_PRINCIPAL_NAME: &str = "dummy@example.com";
const DEFAULT_PRINCIPAL_ID: &str = "9876543210";

/// A user authenticated from forwarded platform headers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub identifier: String,
    pub id: String,
    pub role: String,
    pub provider: String,
}

/// Extract the user from forwarded auth headers
///
/// Local development has no auth layer in front, so missing headers fall
/// back to a fixed development principal.
pub fn user_from_headers(headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let user_name = headers
        .get(PRINCIPAL_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_PRINCIPAL_NAME);
    let user_id = headers
        .get(PRINCIPAL_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_PRINCIPAL_ID);
    tracing::debug!("Auth headers resolved to {} ({})", user_name, user_id);

    if user_name.is_empty() {
        return None;
    }

    Some(AuthenticatedUser {
        identifier: user_name.to_string(),
        id: user_id.to_string(),
        role: "admin".to_string(),
        provider: "header".to_string(),
    })
}
