//! `IndexAttachment` over the OpenAI vector store files API.

use async_trait::async_trait;
use serde_json::json;

use super::{check_status, OpenAiClient};
use crate::artifacts::IndexAttachment;
use crate::Result;

#[async_trait]
impl IndexAttachment for OpenAiClient {
    async fn attach(&self, index_id: &str, artifact_id: &str) -> Result<()> {
        let response = self
            .post_request(&format!("vector_stores/{index_id}/files"))
            .json(&json!({ "file_id": artifact_id }))
            .send()
            .await?;
        check_status(response, "Attach file to vector store").await?;
        tracing::info!(
            file_id = artifact_id,
            vector_store_id = index_id,
            "Attached file to vector store"
        );
        Ok(())
    }

    async fn detach(&self, index_id: &str, artifact_id: &str) -> Result<()> {
        let response = self
            .delete_request(&format!("vector_stores/{index_id}/files/{artifact_id}"))
            .send()
            .await?;
        check_status(response, "Detach file from vector store").await?;
        tracing::info!(
            file_id = artifact_id,
            vector_store_id = index_id,
            "Detached file from vector store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> OpenAiClient {
        OpenAiClient::new(reqwest::Client::new(), server.url(), "sk-test")
    }

    #[tokio::test]
    async fn attach_posts_file_id() {
        let mut server = Server::new_async().await;
        let attach = server
            .mock("POST", "/vector_stores/vs_hr/files")
            .match_header("openai-beta", "assistants=v2")
            .match_body(Matcher::Json(json!({ "file_id": "file-abc" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"file-abc","object":"vector_store.file","status":"in_progress"}"#)
            .create_async()
            .await;

        client(&server).attach("vs_hr", "file-abc").await.unwrap();

        attach.assert_async().await;
    }

    #[tokio::test]
    async fn detach_maps_missing_file_to_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/vector_stores/vs_hr/files/file-gone")
            .with_status(404)
            .with_body(r#"{"error":{"message":"No file found with id 'file-gone'"}}"#)
            .create_async()
            .await;

        let result = client(&server).detach("vs_hr", "file-gone").await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn detach_server_error_is_upstream_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/vector_stores/vs_hr/files/file-abc")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let result = client(&server).detach("vs_hr", "file-abc").await;

        assert!(
            matches!(result, Err(Error::Upstream { message, .. }) if message.contains("HTTP 500"))
        );
    }
}
