//! AI text-generation collaborator.

use async_trait::async_trait;
use domain::error::DomainError;
use domain::models::billing::GenerateContentRequest;
use domain::ports::TextGenerator;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collaborator::CollaboratorClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    shop_id: Uuid,
    product_id: &'a str,
    field: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    content: String,
}

#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    http: CollaboratorClient,
}

impl HttpTextGenerator {
    pub fn new(http: CollaboratorClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(
        &self,
        shop_id: Uuid,
        request: &GenerateContentRequest,
    ) -> Result<String, DomainError> {
        let body = GenerateBody {
            shop_id,
            product_id: &request.product_id,
            field: &request.field,
            instructions: request.instructions.as_deref(),
        };
        let reply: GenerateReply = self.http.post_json(&["generate"], &body).await?;
        if reply.content.trim().is_empty() {
            return Err(DomainError::Upstream(format!(
                "{} returned empty content",
                self.http.name()
            )));
        }
        Ok(reply.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body_omits_missing_instructions() {
        let body = serde_json::to_value(GenerateBody {
            shop_id: Uuid::nil(),
            product_id: "p-1",
            field: "seo_title",
            instructions: None,
        })
        .unwrap();
        assert_eq!(body["productId"], "p-1");
        assert!(body.get("instructions").is_none());
    }

    #[test]
    fn test_reply_parsing() {
        let reply: GenerateReply =
            serde_json::from_str(r#"{"content":"Organic cotton tee","model":"x"}"#).unwrap();
        assert_eq!(reply.content, "Organic cotton tee");
    }
}
