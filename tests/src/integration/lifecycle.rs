//! # Channel Lifecycle Over HTTP
//!
//! Ordering, replay and disconnect behavior as a real browser sees it.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{status, test_config, wait_for_state, FakeBrowser};
    use serde_json::json;
    use std::time::Duration;
    use wallet_relay::domain::encoding;
    use wallet_relay::{BrowserWallet, Operation, RelayError, SessionStatus};

    const DETACH_WAIT: Duration = Duration::from_secs(20);

    fn sign_message(text: &str) -> Operation {
        Operation::SignMessage {
            data: encoding::encode(text.as_bytes()),
            options: None,
        }
    }

    #[tokio::test]
    async fn test_requests_arrive_in_enqueue_order() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let mut browser = FakeBrowser::attach(wallet.url()).await;
        let session = wallet.session();

        let mut pending = Vec::new();
        for text in ["A", "B", "C"] {
            let (request, response) = session.table().enqueue(sign_message(text), None);
            assert!(session.lifecycle().deliver(request));
            pending.push(response);
        }

        for (text, response) in ["A", "B", "C"].into_iter().zip(pending) {
            let request = browser.next_request().await;
            assert_eq!(request["id"], json!(response.id()));
            assert_eq!(request["params"]["data"], encoding::encode(text.as_bytes()));
            browser.respond(&request["id"], json!(text)).await;
            assert_eq!(response.await.unwrap(), json!(text));
        }

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_queued_requests_replay_on_attach() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let session = wallet.session();

        let mut ids = Vec::new();
        let mut pending = Vec::new();
        for text in ["A", "B", "C"] {
            let (request, response) = session.table().enqueue(sign_message(text), None);
            // nobody attached yet
            assert!(!session.lifecycle().deliver(request));
            ids.push(json!(response.id()));
            pending.push(response);
        }

        let mut browser = FakeBrowser::attach(wallet.url()).await;
        for id in &ids {
            let request = browser.next_request().await;
            assert_eq!(&request["id"], id);
            browser.respond(id, json!("ok")).await;
        }
        for response in pending {
            assert_eq!(response.await.unwrap(), json!("ok"));
        }

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_disconnect_fails_every_pending_request() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let mut browser = FakeBrowser::attach(wallet.url()).await;
        let session = wallet.session();

        let mut pending = Vec::new();
        for text in ["A", "B", "C"] {
            let (request, response) = session.table().enqueue(sign_message(text), None);
            session.lifecycle().deliver(request);
            pending.push(response);
        }
        for _ in 0..3 {
            browser.next_request().await;
        }

        browser.close();
        for response in pending {
            let settled = tokio::time::timeout(DETACH_WAIT, response).await.unwrap();
            assert_eq!(settled.unwrap_err(), RelayError::ConnectionLost);
        }

        assert!(wait_for_state(wallet.url(), "detached", DETACH_WAIT).await);
        let snapshot = status(wallet.url()).await;
        assert_eq!(snapshot["pending"], 0);
        assert_eq!(snapshot["session"], "failed");

        // the session is over; new calls don't wait for a browser
        let err = wallet.get_all_addresses().await.unwrap_err();
        assert!(err.is_session_fatal());

        wallet.close(SessionStatus::Failed).await;
    }

    #[tokio::test]
    async fn test_close_sends_completed_notice() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let mut browser = FakeBrowser::attach(wallet.url()).await;

        wallet.close(SessionStatus::Success).await;

        let message = browser.next_message().await.unwrap();
        assert_eq!(message, json!({ "type": "completed", "status": "success" }));
    }

    #[tokio::test]
    async fn test_second_tab_displaces_first() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let mut first = FakeBrowser::attach(wallet.url()).await;
        let mut second = FakeBrowser::attach(wallet.url()).await;

        assert_eq!(first.next_message().await, Some(json!({ "type": "replaced" })));
        // nothing follows on the displaced stream
        assert_eq!(first.next_message().await, None);

        // the new tab owns the session
        let session = wallet.session();
        let (request, response) = session.table().enqueue(sign_message("A"), None);
        assert!(session.lifecycle().deliver(request));
        let request = second.next_request().await;
        second.respond(&request["id"], json!("signed")).await;
        assert_eq!(response.await.unwrap(), json!("signed"));
        assert_eq!(status(wallet.url()).await["state"], "attached");

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_malformed_response_body_rejected() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let browser = FakeBrowser::attach(wallet.url()).await;

        let response = browser.post_raw("{not json".to_string()).await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);

        // unknown ids are accepted and ignored
        let response = browser
            .respond(&json!("00000000-0000-0000-0000-000000000000"), json!("x"))
            .await;
        assert!(response.status().is_success());

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_duplicate_response_settles_once() {
        let wallet = BrowserWallet::initialize(test_config()).await.unwrap();
        let mut browser = FakeBrowser::attach(wallet.url()).await;
        let session = wallet.session();

        let (request, response) = session.table().enqueue(sign_message("A"), None);
        session.lifecycle().deliver(request);
        let request = browser.next_request().await;

        browser.respond(&request["id"], json!("first")).await;
        let second = browser.respond(&request["id"], json!("second")).await;
        assert!(second.status().is_success());

        assert_eq!(response.await.unwrap(), json!("first"));
        assert_eq!(session.snapshot().stats.late_responses, 1);

        wallet.close(SessionStatus::Success).await;
    }
}
