pub mod error;
pub mod event;
pub mod message;
pub mod provider;

pub use error::{ChatError, ErrorKind};
pub use event::StreamEvent;
pub use message::{validate_conversation, Message, RawMessage, Role};
pub use provider::ProviderKind;

pub mod llm {
    use std::pin::Pin;

    use futures::Stream;

    use crate::{ChatError, Message};

    pub const DEFAULT_MAX_TOKENS: u32 = 1000;
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ChatOpts {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
    }

    impl Default for ChatOpts {
        fn default() -> Self {
            Self {
                temperature: Some(DEFAULT_TEMPERATURE),
                max_tokens: Some(DEFAULT_MAX_TOKENS),
            }
        }
    }

    impl ChatOpts {
        /// Per-request overrides win over `self`.
        pub fn merged(&self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
            Self {
                temperature: temperature.or(self.temperature),
                max_tokens: max_tokens.or(self.max_tokens),
            }
        }

        pub fn validate(&self) -> Result<(), ChatError> {
            if self.max_tokens == Some(0) {
                return Err(ChatError::InvalidInput(
                    "max_tokens must be greater than zero".into(),
                ));
            }
            if let Some(t) = self.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(ChatError::InvalidInput(format!(
                        "temperature must be within 0.0..=2.0, got {t}"
                    )));
                }
            }
            Ok(())
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ChatDelta {
        Text(String),
        Finish(Option<String>),
    }

    pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatDelta, ChatError>> + Send>>;

    /// A streaming completion backend.
    ///
    /// `stream_chat` resolves once the upstream has accepted the request, so
    /// connect, auth and status failures surface through the outer `Result`
    /// before any fragment exists. Dropping the returned stream aborts the
    /// upstream call.
    #[async_trait::async_trait]
    pub trait ModelClient: Send + Sync {
        fn name(&self) -> &str;

        async fn stream_chat(&self, msgs: Vec<Message>, opts: ChatOpts)
            -> Result<ChatStream, ChatError>;
    }
}
