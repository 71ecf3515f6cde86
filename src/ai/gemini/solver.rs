use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
use crate::ai::SolverService;
use crate::models::{Config, ImageData};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiSolverClient {
    http: GeminiHttpClient,
}

impl GeminiSolverClient {
    pub fn new(api_key: String, model: String, timeout: Option<Duration>) -> Self {
        Self::new_with_client(api_key, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Option<Duration>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.request_timeout,
        )
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(text: &str, image: Option<&ImageData>) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.base64.clone(),
                },
            });
        }
        parts.push(Part::Text {
            text: prompts::problem_text(text).to_string(),
        });

        GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: prompts::SOLVE_SYSTEM.to_string(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }

    /// Joins every text part of the first candidate.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl SolverService for GeminiSolverClient {
    async fn solve(&self, text: &str, image: Option<&ImageData>) -> Result<String> {
        tracing::debug!(
            "Sending solve request to Gemini (model: {}, image: {})",
            self.http.model(),
            image.map(|i| i.mime_type.as_str()).unwrap_or("none")
        );

        let request = Self::build_request(text, image);
        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        match Self::extract_text(&response) {
            Some(solution) => {
                tracing::info!("Received solution ({} chars)", solution.len());
                Ok(solution)
            }
            None => {
                let reason = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone());
                tracing::warn!("Gemini returned no solution text (finish reason: {:?})", reason);
                Err(Error::Service(match reason {
                    Some(reason) => format!("No solution text in Gemini response ({})", reason),
                    None => "No solution text in Gemini response".to_string(),
                }))
            }
        }
    }
}
