use crate::error::{map_reqwest_err, map_status_err, upstream_error_message};
use crate::openai::config::OpenAiConfig;
use crate::sse;
use futures::StreamExt;
use relay_core::llm::{ChatDelta, ChatOpts, ChatStream, ModelClient};
use relay_core::{ChatError, Message};
use reqwest::{header, Client};
use serde::Serialize;
use tokio::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    cfg: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
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
        Ok(Self { http, cfg })
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    fn map_messages<'a>(&self, msgs: &'a [Message]) -> Vec<WireMessage<'a>> {
        msgs.iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ModelClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(&self, msgs: Vec<Message>, opts: ChatOpts) -> Result<ChatStream, ChatError> {
        let url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        info!(target:"providers::openai","start chat stream model={} url={} messages={}", self.cfg.model, url, msgs.len());
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages: self.map_messages(&msgs),
            stream: true,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
        };
        let send = self.http.post(&url).json(&body).send();
        let resp = tokio::time::timeout(self.cfg.timeout, send)
            .await
            .map_err(|_| {
                ChatError::Timeout(format!("no response headers within {:?}", self.cfg.timeout))
            })?
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target:"providers::openai","chat stream non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }

        let mut events = Box::pin(sse::response_events(resp));
        // Chat completions always close with `[DONE]` or a finish_reason;
        // a body that ends without one was cut off.
        let s = async_stream::stream! {
            loop {
                let Some(ev) = events.next().await else {
                    error!(target:"providers::openai","chat stream closed before [DONE]");
                    yield Err(ChatError::Protocol("stream ended before [DONE]".into()));
                    break;
                };
                match ev.and_then(|data| parse_chat_sse_event(&data)) {
                    Ok(Some(delta)) => {
                        let finished = matches!(delta, ChatDelta::Finish(_));
                        yield Ok(delta);
                        if finished {
                            debug!(target:"providers::openai","chat stream finished");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => { yield Err(e); break; }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

/// Interprets one `data:` payload of a chat-completions stream.
fn parse_chat_sse_event(data: &str) -> Result<Option<ChatDelta>, ChatError> {
    if data.trim() == "[DONE]" {
        return Ok(Some(ChatDelta::Finish(None)));
    }
    let v: serde_json::Value =
        serde_json::from_str(data).map_err(|e| ChatError::Decode(e.to_string()))?;
    if let Some(msg) = upstream_error_message(&v) {
        return Err(ChatError::Protocol(msg));
    }
    let choice = &v["choices"][0];
    if let Some(content) = choice["delta"]["content"].as_str() {
        if !content.is_empty() {
            return Ok(Some(ChatDelta::Text(content.to_string())));
        }
    }
    if let Some(fr) = choice["finish_reason"].as_str() {
        return Ok(Some(ChatDelta::Finish(Some(fr.to_string()))));
    }
    Ok(None)
}
