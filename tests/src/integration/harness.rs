//! Fake signer page.
//!
//! Opens `GET /events` like the real page does, parses the server-sent
//! events and answers through `POST /response`. Messages are kept as raw
//! JSON so tests assert on the wire shape.

use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wallet_relay::{BrowserConfig, RelayConfig};

/// How long a test waits for any single message.
pub const MESSAGE_WAIT: Duration = Duration::from_secs(10);

/// Relay config for tests: ephemeral port, no browser, no settle delay.
pub fn test_config() -> RelayConfig {
    RelayConfig {
        port: 0,
        settle_delay: Duration::ZERO,
        attach_poll_interval: Duration::from_millis(5),
        browser_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(30),
        shutdown_grace: Duration::from_millis(500),
        browser: BrowserConfig {
            launch: false,
            ..BrowserConfig::default()
        },
        ..RelayConfig::default()
    }
}

/// A browser tab attached to a relay.
pub struct FakeBrowser {
    base: String,
    client: reqwest::Client,
    messages: mpsc::UnboundedReceiver<Value>,
    reader: JoinHandle<()>,
}

impl FakeBrowser {
    /// Attach to the relay at `base` (`http://127.0.0.1:port/`) and consume
    /// the `connected` message.
    pub async fn attach(base: &str) -> Self {
        let client = reqwest::Client::new();
        let response = client
            .get(format!("{base}events"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .expect("open push channel");

        let (tx, messages) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(Ok(chunk)) = body.next().await {
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = buffer.find("\n\n") {
                    let frame: String = buffer.drain(..end + 2).collect();
                    if let Some(message) = parse_frame(&frame) {
                        if tx.send(message).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        let mut browser = Self {
            base: base.to_string(),
            client,
            messages,
            reader,
        };
        let first = browser.next_message().await.expect("connected message");
        assert_eq!(first["type"], "connected", "first message was {first}");
        browser
    }

    /// Next message, or `None` if the stream ended or nothing arrived in time.
    pub async fn next_message(&mut self) -> Option<Value> {
        tokio::time::timeout(MESSAGE_WAIT, self.messages.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next `request` message.
    pub async fn next_request(&mut self) -> Value {
        loop {
            let message = self.next_message().await.expect("request message");
            if message["type"] == "request" {
                return message;
            }
        }
    }

    pub async fn respond(&self, id: &Value, result: Value) -> reqwest::Response {
        self.post(json!({ "id": id, "result": result })).await
    }

    pub async fn respond_error(&self, id: &Value, error: Value) -> reqwest::Response {
        self.post(json!({ "id": id, "error": error })).await
    }

    pub async fn post(&self, body: Value) -> reqwest::Response {
        self.post_raw(body.to_string()).await
    }

    pub async fn post_raw(&self, body: String) -> reqwest::Response {
        self.client
            .post(format!("{}response", self.base))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("post response")
    }

    /// Close the tab: drop the event stream connection.
    pub fn close(self) {
        self.reader.abort();
    }
}

/// `GET /status` as JSON.
pub async fn status(base: &str) -> Value {
    reqwest::get(format!("{base}status"))
        .await
        .expect("status request")
        .json()
        .await
        .expect("status body")
}

/// Poll `/status` until `state` matches or `within` elapses.
pub async fn wait_for_state(base: &str, state: &str, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if status(base).await["state"] == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn parse_frame(frame: &str) -> Option<Value> {
    let data: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if data.is_empty() {
        // keep-alive comment
        return None;
    }
    serde_json::from_str(&data.join("\n")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame() {
        assert_eq!(
            parse_frame("data: {\"type\":\"connected\",\"generation\":1}\n\n"),
            Some(json!({ "type": "connected", "generation": 1 }))
        );
        assert_eq!(parse_frame(":\n\n"), None);
    }
}
