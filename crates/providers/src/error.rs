use relay_core::ChatError;
use reqwest::StatusCode;

pub(crate) fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else if e.is_request() || e.is_connect() || e.is_body() {
        ChatError::Network(e.to_string())
    } else if e.is_decode() {
        ChatError::Decode(e.to_string())
    } else {
        ChatError::Other(e.to_string())
    }
}

pub(crate) fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let body = body.unwrap_or_default();
    let s = format!("{} {}", status.as_u16(), body.trim()).trim_end().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(s),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimit(s),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ChatError::Network(s),
        _ => ChatError::Other(s),
    }
}

/// Pulls `error.message` out of an upstream JSON payload, if it is one.
pub(crate) fn upstream_error_message(v: &serde_json::Value) -> Option<String> {
    let err = v.get("error")?;
    Some(
        err.get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            map_status_err(StatusCode::UNAUTHORIZED, Some("bad key".into())),
            ChatError::Auth(m) if m == "401 bad key"
        ));
        assert!(matches!(
            map_status_err(StatusCode::TOO_MANY_REQUESTS, None),
            ChatError::RateLimit(m) if m == "429"
        ));
        assert!(matches!(
            map_status_err(StatusCode::BAD_GATEWAY, None),
            ChatError::Network(_)
        ));
        assert!(matches!(
            map_status_err(StatusCode::BAD_REQUEST, Some("nope".into())),
            ChatError::Other(_)
        ));
    }

    #[test]
    fn extracts_nested_error_message() {
        let v = serde_json::json!({"error": {"message": "quota exceeded", "code": 429}});
        assert_eq!(upstream_error_message(&v).as_deref(), Some("quota exceeded"));
        let v = serde_json::json!({"error": "flat"});
        assert_eq!(upstream_error_message(&v).as_deref(), Some("\"flat\""));
        assert_eq!(upstream_error_message(&serde_json::json!({"ok": 1})), None);
    }
}
