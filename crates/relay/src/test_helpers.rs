//! Shared test helpers for relay tests.

use quotarelay_core::error::ProviderError;
use quotarelay_core::message::Message;
use quotarelay_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub enum Scripted {
    Reply(ProviderResponse),
    Fail(ProviderError),
    Hang,
    Panic,
}

/// A provider that plays back scripted outcomes in order and records requests.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[(&str, i64)]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|(text, total)| Scripted::Reply(text_response(text, *total)))
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider: script exhausted");
        match next {
            Scripted::Reply(response) => Ok(response),
            Scripted::Fail(err) => Err(err),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("hung provider was not cancelled")
            }
            Scripted::Panic => panic!("scripted provider panic"),
        }
    }
}

/// A reply whose usage splits `total` roughly 2:1 prompt/completion.
pub fn text_response(text: &str, total: i64) -> ProviderResponse {
    let prompt = total * 2 / 3;
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage::new(prompt, total - prompt, total)),
        model: "scripted-model".into(),
    }
}
