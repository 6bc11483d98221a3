//! Onshape REST API endpoint constants.

/// Base URL for the Onshape REST API.
pub const ONSHAPE_BASE_URL: &str = "https://cad.onshape.com";

/// OAuth token endpoint used for refresh exchanges.
pub const ONSHAPE_TOKEN_URL: &str = "https://oauth.onshape.com/oauth/token";

/// Document endpoints.
pub mod documents {
    /// List or create documents.
    pub const DOCUMENTS: &str = "/api/documents";

    /// Path of a single document.
    pub fn document(document_id: &str) -> String {
        format!("{DOCUMENTS}/{document_id}")
    }
}

/// Account endpoints.
pub mod users {
    /// Information about the authenticated user.
    pub const SESSION_INFO: &str = "/api/users/sessioninfo";
}
