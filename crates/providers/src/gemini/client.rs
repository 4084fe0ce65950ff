use crate::error::{map_reqwest_err, map_status_err, upstream_error_message};
use crate::gemini::config::GeminiConfig;
use crate::sse;
use futures::StreamExt;
use relay_core::llm::{ChatDelta, ChatOpts, ChatStream, ModelClient};
use relay_core::{ChatError, Message, Role};
use reqwest::{header, Client};
use serde::Serialize;
use tokio::time::Duration;
use tracing::{debug, error, info};
use url::Url;

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    cfg: GeminiConfig,
    endpoint: Url,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut key = header::HeaderValue::from_str(&cfg.api_key)?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .connect_timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        let mut endpoint = Url::parse(&format!(
            "{}/models/{}:streamGenerateContent",
            cfg.base_url.trim_end_matches('/'),
            cfg.model
        ))?;
        endpoint.query_pairs_mut().append_pair("alt", "sse");
        Ok(Self { http, cfg, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// System turns are lifted into `systemInstruction`; the rest keep their
    /// order, with `assistant` spelled `model`.
    fn build_request<'a>(msgs: &'a [Message], opts: &ChatOpts) -> GenerateContentRequest<'a> {
        let system_parts: Vec<Part<'a>> = msgs
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part { text: &m.content })
            .collect();
        let contents = msgs
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(Content {
                    role: Some(role),
                    parts: vec![Part { text: &m.content }],
                })
            })
            .collect();
        GenerateContentRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                role: None,
                parts: system_parts,
            }),
            generation_config: GenerationConfig {
                max_output_tokens: opts.max_tokens,
                temperature: opts.temperature,
            },
        }
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stream_chat(&self, msgs: Vec<Message>, opts: ChatOpts) -> Result<ChatStream, ChatError> {
        info!(target:"providers::gemini","start stream model={} messages={}", self.cfg.model, msgs.len());
        let body = Self::build_request(&msgs, &opts);
        let send = self.http.post(self.endpoint.clone()).json(&body).send();
        let resp = tokio::time::timeout(self.cfg.timeout, send)
            .await
            .map_err(|_| {
                ChatError::Timeout(format!("no response headers within {:?}", self.cfg.timeout))
            })?
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target:"providers::gemini","stream non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }

        let mut events = Box::pin(sse::response_events(resp));
        let s = async_stream::stream! {
            'outer: while let Some(ev) = events.next().await {
                match ev.and_then(|data| parse_gemini_event(&data)) {
                    Ok(deltas) => {
                        for delta in deltas {
                            let finished = matches!(delta, ChatDelta::Finish(_));
                            yield Ok(delta);
                            if finished {
                                debug!(target:"providers::gemini","stream finished");
                                break 'outer;
                            }
                        }
                    }
                    Err(e) => { yield Err(e); break 'outer; }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

/// One payload may carry text and a finish reason; text comes first.
fn parse_gemini_event(data: &str) -> Result<Vec<ChatDelta>, ChatError> {
    let v: serde_json::Value =
        serde_json::from_str(data).map_err(|e| ChatError::Decode(e.to_string()))?;
    if let Some(msg) = upstream_error_message(&v) {
        return Err(ChatError::Protocol(msg));
    }
    let candidate = &v["candidates"][0];
    let mut out = Vec::new();
    if let Some(parts) = candidate["content"]["parts"].as_array() {
        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if !text.is_empty() {
            out.push(ChatDelta::Text(text));
        }
    }
    if let Some(reason) = candidate["finishReason"].as_str() {
        out.push(ChatDelta::Finish(Some(reason.to_string())));
    }
    Ok(out)
}
