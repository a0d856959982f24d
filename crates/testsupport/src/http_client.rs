use anyhow::Result;
use ocr_models::{ErrorShape, LanguagesResponse, OcrJsonRequest, OcrResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Optional fields of an OCR request.
#[derive(Debug, Clone, Default)]
pub struct OcrOptions {
    pub language: Option<String>,
    pub region: Option<String>,
    pub level: Option<String>,
    pub client_id: Option<String>,
}

/// Raw outcome of `POST /ocr`, success or not.
#[derive(Debug)]
pub struct OcrReply {
    pub status: u16,
    pub request_id: Option<String>,
    pub retry_after: Option<u64>,
    pub body: Value,
}

impl OcrReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn response(&self) -> Result<OcrResponse> {
        if !self.is_success() {
            anyhow::bail!("OCR failed with {}: {}", self.status, self.body);
        }
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn error(&self) -> Result<ErrorShape> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

#[derive(Clone)]
pub struct OcrClient {
    client: Client,
    base_url: String,
}

impl OcrClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/healthz", self.base_url))
            .send()
            .await?;
        Ok(response.status().is_success() && response.text().await? == "OK")
    }

    pub async fn root(&self) -> Result<String> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        Ok(response.text().await?)
    }

    pub async fn languages(&self) -> Result<LanguagesResponse> {
        let response = self
            .client
            .get(format!("{}/languages", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("List languages failed: {}", error_text);
        }

        Ok(response.json().await?)
    }

    pub async fn metrics_text(&self) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await?;
        Ok(response.text().await?)
    }

    pub async fn ocr_multipart(
        &self,
        image: Vec<u8>,
        file_name: &str,
        options: &OcrOptions,
    ) -> Result<OcrReply> {
        let mut form = Form::new().part("image", Part::bytes(image).file_name(file_name.to_string()));
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(region) = &options.region {
            form = form.text("region", region.clone());
        }
        if let Some(level) = &options.level {
            form = form.text("level", level.clone());
        }

        let request = self.client.post(format!("{}/ocr", self.base_url)).multipart(form);
        self.send(request, options).await
    }

    pub async fn ocr_raw(
        &self,
        image: Vec<u8>,
        content_type: &str,
        options: &OcrOptions,
    ) -> Result<OcrReply> {
        let mut query = Vec::new();
        if let Some(language) = &options.language {
            query.push(("language", language.clone()));
        }
        if let Some(region) = &options.region {
            query.push(("region", region.clone()));
        }
        if let Some(level) = &options.level {
            query.push(("level", level.clone()));
        }

        let request = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image);
        self.send(request, options).await
    }

    pub async fn ocr_json(&self, body: &OcrJsonRequest, options: &OcrOptions) -> Result<OcrReply> {
        let request = self.client.post(format!("{}/ocr", self.base_url)).json(body);
        self.send(request, options).await
    }

    async fn send(&self, mut request: RequestBuilder, options: &OcrOptions) -> Result<OcrReply> {
        if let Some(client_id) = &options.client_id {
            request = request.header("x-client-id", client_id);
        }
        let response = request.send().await?;

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body: Value = response.json().await?;

        Ok(OcrReply {
            status,
            request_id,
            retry_after,
            body,
        })
    }
}
