//! Natural-language crew report from an external text-generation service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::types::CrewRecord;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ReportError>;
}

/// Plant-manager prompt around the crews serialized as JSON.
pub fn build_crew_report_prompt(crews: &[CrewRecord]) -> Result<String, ReportError> {
    let data = serde_json::to_string(crews).map_err(|e| ReportError::Serialize(e.to_string()))?;
    Ok(format!(
        "Actúa como un Gerente de Planta experto en logística y producción.\n\
         Analiza los siguientes datos de rendimiento de las tripulaciones del turno matutino:\n\
         {data}\n\
         \n\
         Métricas clave:\n\
         - PDF (Productividad): Mayor es mejor.\n\
         - Tiempo Estancia: Menor es mejor.\n\
         - Seguridad: 5.00 es perfecto.\n\
         \n\
         Genera un reporte ejecutivo breve (máximo 150 palabras) en español que incluya:\n\
         1. ¿Quién es la tripulación ganadora y por qué?\n\
         2. Una observación crítica sobre la tripulación con menor rendimiento.\n\
         3. Una recomendación de mejora general.\n\
         \n\
         Usa un tono profesional, directo e industrial."
    ))
}

pub async fn generate_crew_report(
    generator: &dyn TextGenerator,
    crews: &[CrewRecord],
) -> Result<String, ReportError> {
    let prompt = build_crew_report_prompt(crews)?;
    log::info!("Requesting crew report for {} crews", crews.len());
    let text = generator.generate(&prompt).await?;
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ReportError::EmptyResponse);
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Gemini REST client
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, ReportError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ReportError::NoApiKey);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            },
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ReportError> {
    let resp: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ReportError::Request(format!("Invalid response: {}", e)))?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ReportError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ReportError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            log::warn!("Gemini API error {}: {}", status, body);
            return Err(ReportError::Status { status, body });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| ReportError::Request(e.to_string()))?;
        extract_text(&text)
    }
}
