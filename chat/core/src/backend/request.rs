//! Weather agent request payload

use serde::Serialize;
use serde_json::Value;

use super::traits::{HistoryEntry, RequestBuilder};
use crate::config::RequestDefaults;
use crate::messages::MessageRole;

/// Wire shape of a request to the weather agent
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    run_id: &'a str,
    max_retries: u32,
    max_steps: u32,
    temperature: f32,
    top_p: f32,
    runtime_context: serde_json::Map<String, Value>,
    thread_id: &'a str,
    resource_id: &'a str,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

/// Builds weather agent payloads from configured static fields
#[derive(Clone, Debug, Default)]
pub struct WeatherRequestBuilder {
    defaults: RequestDefaults,
}

impl WeatherRequestBuilder {
    /// Create a builder using `defaults` for every static field
    #[must_use]
    pub fn new(defaults: RequestDefaults) -> Self {
        Self { defaults }
    }
}

impl RequestBuilder for WeatherRequestBuilder {
    fn build(&self, user_message: &str, history: &[HistoryEntry]) -> anyhow::Result<Value> {
        let mut messages: Vec<WireMessage<'_>> = history
            .iter()
            .map(|entry| WireMessage {
                role: entry.role,
                content: &entry.content,
            })
            .collect();
        messages.push(WireMessage {
            role: MessageRole::User,
            content: user_message,
        });

        let request = AgentRequest {
            messages,
            run_id: &self.defaults.run_id,
            max_retries: self.defaults.max_retries,
            max_steps: self.defaults.max_steps,
            temperature: self.defaults.temperature,
            top_p: self.defaults.top_p,
            runtime_context: serde_json::Map::new(),
            thread_id: &self.defaults.thread_id,
            resource_id: &self.defaults.resource_id,
        };

        Ok(serde_json::to_value(request)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_without_history() {
        let payload = WeatherRequestBuilder::default()
            .build("Weather in Oslo?", &[])
            .unwrap();

        assert_eq!(
            payload,
            json!({
                "messages": [{"role": "user", "content": "Weather in Oslo?"}],
                "runId": "weatherAgent",
                "maxRetries": 2,
                "maxSteps": 5,
                "temperature": 0.5,
                "topP": 1.0,
                "runtimeContext": {},
                "threadId": "19102B0032",
                "resourceId": "weatherAgent",
            })
        );
    }

    #[test]
    fn test_build_appends_after_history() {
        let history = vec![
            HistoryEntry {
                role: MessageRole::User,
                content: "Weather in Oslo?".to_string(),
            },
            HistoryEntry {
                role: MessageRole::Assistant,
                content: "Cold and clear.".to_string(),
            },
        ];
        let builder = WeatherRequestBuilder::new(RequestDefaults {
            thread_id: "custom".to_string(),
            ..RequestDefaults::default()
        });

        let payload = builder.build("And tomorrow?", &history).unwrap();

        assert_eq!(
            payload["messages"],
            json!([
                {"role": "user", "content": "Weather in Oslo?"},
                {"role": "assistant", "content": "Cold and clear."},
                {"role": "user", "content": "And tomorrow?"},
            ])
        );
        assert_eq!(payload["threadId"], "custom");
    }
}
