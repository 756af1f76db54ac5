//! Imgflip `caption_image` client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MemeError;
use crate::render::{CaptionedImage, ImageCaptioner};

const TEXT_COLOR: &str = "#ffffff";
const OUTLINE_COLOR: &str = "#000000";

#[derive(Debug, Deserialize)]
struct ImgflipResponse {
    success: bool,
    data: Option<ImgflipData>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImgflipData {
    url: String,
    page_url: Option<String>,
}

#[derive(Clone)]
pub struct ImgflipClient {
    client: Client,
    api_url: String,
    username: String,
    password: String,
}

impl ImgflipClient {
    pub fn new(
        api_url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Imgflip HTTP client")?;
        Ok(Self {
            client,
            api_url,
            username,
            password,
        })
    }

    /// Form fields for one request: credentials, template id, and a
    /// text/color/outline triple per caption box.
    fn caption_form(&self, template_id: u64, captions: &[String]) -> Vec<(String, String)> {
        let mut form = vec![
            ("template_id".to_string(), template_id.to_string()),
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ];

        for (i, text) in captions.iter().enumerate() {
            form.push((format!("boxes[{i}][text]"), text.clone()));
            form.push((format!("boxes[{i}][color]"), TEXT_COLOR.to_string()));
            form.push((
                format!("boxes[{i}][outline_color]"),
                OUTLINE_COLOR.to_string(),
            ));
        }

        form
    }
}

/// Turns a decoded Imgflip reply into a hosted image or an upstream error.
fn interpret_response(response: ImgflipResponse) -> Result<CaptionedImage, MemeError> {
    if !response.success {
        return Err(MemeError::UpstreamApi(
            response
                .error_message
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    let data = response.data.ok_or_else(|| {
        MemeError::UpstreamApi("success response carried no image data".to_string())
    })?;

    Ok(CaptionedImage {
        url: data.url,
        page_url: data.page_url,
    })
}

#[async_trait]
impl ImageCaptioner for ImgflipClient {
    async fn caption_image(
        &self,
        template_id: u64,
        captions: &[String],
    ) -> Result<CaptionedImage, MemeError> {
        let form = self.caption_form(template_id, captions);

        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MemeError::UpstreamApi(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemeError::UpstreamApi(format!("status {status}: {body}")));
        }

        let body: ImgflipResponse = response
            .json()
            .await
            .map_err(|e| MemeError::UpstreamApi(format!("undecodable response: {e}")))?;

        let image = interpret_response(body)?;
        debug!("Imgflip rendered template {template_id}: {}", image.url);
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ImgflipClient {
        ImgflipClient::new(
            "http://localhost/caption_image".to_string(),
            "user".to_string(),
            "secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_caption_form_has_triple_per_box() {
        let form = client().caption_form(
            181913649,
            &["top".to_string(), "bottom".to_string()],
        );

        assert_eq!(form.len(), 3 + 2 * 3);
        assert!(form.contains(&("template_id".to_string(), "181913649".to_string())));
        assert!(form.contains(&("username".to_string(), "user".to_string())));
        assert!(form.contains(&("password".to_string(), "secret".to_string())));
        assert!(form.contains(&("boxes[1][text]".to_string(), "bottom".to_string())));
        assert!(form.contains(&("boxes[0][color]".to_string(), "#ffffff".to_string())));
        assert!(form.contains(&(
            "boxes[1][outline_color]".to_string(),
            "#000000".to_string()
        )));
    }

    #[test]
    fn test_success_response_yields_url() {
        let body: ImgflipResponse = serde_json::from_str(
            r#"{"success": true, "data": {"url": "https://i.imgflip.com/abc.jpg", "page_url": "https://imgflip.com/i/abc"}}"#,
        )
        .unwrap();
        let image = interpret_response(body).unwrap();
        assert_eq!(image.url, "https://i.imgflip.com/abc.jpg");
        assert_eq!(image.page_url.as_deref(), Some("https://imgflip.com/i/abc"));
    }

    #[test]
    fn test_failure_response_is_upstream_error() {
        let body: ImgflipResponse = serde_json::from_str(
            r#"{"success": false, "error_message": "Invalid username/password"}"#,
        )
        .unwrap();
        match interpret_response(body) {
            Err(MemeError::UpstreamApi(msg)) => assert_eq!(msg, "Invalid username/password"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_without_data_is_upstream_error() {
        let body: ImgflipResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(
            interpret_response(body),
            Err(MemeError::UpstreamApi(_))
        ));
    }
}
