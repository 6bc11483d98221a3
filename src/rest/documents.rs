//! Document endpoints.
//!
//! These are thin wrappers: they only hand method, path, query and body to
//! the signed request executor.

use serde::{Deserialize, Serialize};

use crate::auth::QueryParams;
use crate::error::OnshapeError;
use crate::rest::client::OnshapeClient;
use crate::rest::endpoints::documents;

/// Filters for listing documents.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsQuery {
    /// Free-text search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Numeric filter selector (0 = my documents, 1 = created, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<u32>,
    /// Owner id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Column to sort on, e.g. `modifiedAt`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    /// `asc` or `desc`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    /// Number of items to skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Maximum number of items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Reference to a workspace.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceRef {
    /// Workspace id
    pub id: String,
    /// Workspace name
    #[serde(default)]
    pub name: Option<String>,
}

/// Document owner.
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    /// Owner id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// A document summary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document id
    pub id: String,
    /// Document name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the document is public
    #[serde(default)]
    pub public: bool,
    /// Owner
    #[serde(default)]
    pub owner: Option<Owner>,
    /// Default workspace
    #[serde(default)]
    pub default_workspace: Option<WorkspaceRef>,
    /// API URL of this document
    #[serde(default)]
    pub href: Option<String>,
    /// Creation timestamp as returned by the API
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last modification timestamp as returned by the API
    #[serde(default)]
    pub modified_at: Option<String>,
}

/// A page of documents.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList {
    /// Documents on this page
    #[serde(default)]
    pub items: Vec<Document>,
    /// URL of the next page
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page
    #[serde(default)]
    pub previous: Option<String>,
}

/// Parameters for creating a document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    /// Name of the new document
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Make the document public
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl CreateDocumentRequest {
    /// Create a request for a private document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_public: None,
        }
    }
}

impl OnshapeClient {
    /// List documents visible to the authenticated user.
    pub async fn list_documents(&self, query: &DocumentsQuery) -> Result<DocumentList, OnshapeError> {
        let params = QueryParams::from_serializable(query)?;
        self.get_json(documents::DOCUMENTS, &params).await
    }

    /// Get a single document.
    pub async fn get_document(&self, document_id: &str) -> Result<Document, OnshapeError> {
        self.get_json(&documents::document(document_id), &QueryParams::new())
            .await
    }

    /// Create a document.
    pub async fn create_document(
        &self,
        request: &CreateDocumentRequest,
    ) -> Result<Document, OnshapeError> {
        self.post_json(documents::DOCUMENTS, &QueryParams::new(), request)
            .await
    }

    /// Delete a document (moves it to the trash).
    pub async fn delete_document(&self, document_id: &str) -> Result<(), OnshapeError> {
        self.delete(&documents::document(document_id), &QueryParams::new())
            .await
    }
}
