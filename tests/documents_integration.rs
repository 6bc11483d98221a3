use wiremock::matchers::{body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use onshape_client::auth::ApiKeyCredentials;
use onshape_client::rest::OnshapeClient;
use onshape_client::rest::documents::{CreateDocumentRequest, DocumentsQuery};

fn build_client(server: &MockServer) -> OnshapeClient {
    OnshapeClient::builder()
        .base_url(format!("{}/", server.uri()))
        .credentials(
            ApiKeyCredentials::new(
                "AbCdEfGhIjKlMnOpQrStUvWx",
                "S3cr3tK3yForOnshapeSigningTestsOnly0123456789abc",
            )
            .into(),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_list_documents() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .and(query_param("q", "bracket"))
        .and(query_param("filter", "0"))
        .and(query_param("limit", "2"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "id": "d1",
                    "name": "Bracket",
                    "public": false,
                    "owner": { "id": "u1", "name": "Jane" },
                    "defaultWorkspace": { "id": "w1", "name": "Main" }
                },
                { "id": "d2", "name": "Bracket v2", "public": true }
            ],
            "next": "https://cad.onshape.com/api/documents?offset=2&limit=2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    let query = DocumentsQuery {
        q: Some("bracket".into()),
        filter: Some(0),
        limit: Some(2),
        ..Default::default()
    };
    let documents = client.list_documents(&query).await.unwrap();

    assert_eq!(documents.items.len(), 2);
    assert_eq!(documents.items[0].name, "Bracket");
    assert_eq!(
        documents.items[0].owner.as_ref().unwrap().name.as_deref(),
        Some("Jane")
    );
    assert!(documents.items[1].public);
    assert!(documents.next.is_some());
    assert!(documents.previous.is_none());
}

#[tokio::test]
async fn test_get_document() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/documents/e60c4803eaf2ac8be492c18e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "e60c4803eaf2ac8be492c18e",
            "name": "Gearbox",
            "description": "Two-stage reduction",
            "createdAt": "2024-03-01T10:00:00.000+00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    let document = client
        .get_document("e60c4803eaf2ac8be492c18e")
        .await
        .unwrap();

    assert_eq!(document.name, "Gearbox");
    assert_eq!(document.description.as_deref(), Some("Two-stage reduction"));
    assert!(document.default_workspace.is_none());
}

#[tokio::test]
async fn test_create_document() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/documents"))
        .and(body_json(serde_json::json!({ "name": "Bracket", "isPublic": false })))
        .and(header_exists("content-md5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "d9",
            "name": "Bracket"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    let request = CreateDocumentRequest {
        is_public: Some(false),
        ..CreateDocumentRequest::new("Bracket")
    };
    let document = client.create_document(&request).await.unwrap();
    assert_eq!(document.id, "d9");
}

#[tokio::test]
async fn test_delete_document() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/documents/d9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    client.delete_document("d9").await.unwrap();
}

#[tokio::test]
async fn test_session_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/sessioninfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "u1",
            "name": "Jane"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    let info = client.session_info().await.unwrap();
    assert_eq!(info["name"], "Jane");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/documents/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server);
    let err = client.get_document("d1").await.unwrap_err();
    assert!(matches!(
        err,
        onshape_client::OnshapeError::InvalidResponse(_)
    ));
}
