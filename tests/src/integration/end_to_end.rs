//! # End-to-End Scenarios
//!
//! The façade, server and a fake browser talking real HTTP on loopback.
//!
//! 1. Ephemeral port serves the signer page
//! 2. `signature` round trip decodes the browser's bytes
//! 3. `getActiveAddress` is answered from cache once known
//! 4. An occupied port fails `initialize` with the port in the message

#[cfg(test)]
mod tests {
    use crate::integration::harness::{test_config, wait_for_state, FakeBrowser};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wallet_relay::domain::encoding;
    use wallet_relay::{BrowserWallet, OperationKind, RelayConfig, RelayError, SessionStatus};

    async fn wallet() -> Arc<BrowserWallet> {
        Arc::new(BrowserWallet::initialize(test_config()).await.unwrap())
    }

    // =============================================================================
    // SCENARIO 1: SERVER COMES UP ON AN OS-ASSIGNED PORT
    // =============================================================================

    #[tokio::test]
    async fn test_ephemeral_port_serves_page() {
        let wallet = wallet().await;
        let port: u16 = wallet
            .url()
            .trim_end_matches('/')
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap();
        assert_ne!(port, 0);

        let page = reqwest::get(wallet.url()).await.unwrap().text().await.unwrap();
        assert!(page.contains("<html"));
        assert!(page.contains("/events"));

        wallet.close(SessionStatus::Success).await;
    }

    // =============================================================================
    // SCENARIO 2: SIGNATURE ROUND TRIP
    // =============================================================================

    #[tokio::test]
    async fn test_signature_returns_browser_bytes() {
        let wallet = wallet().await;
        let mut browser = FakeBrowser::attach(wallet.url()).await;

        let caller = Arc::clone(&wallet);
        let call = tokio::spawn(async move {
            caller
                .signature(&[0xde, 0xad, 0xbe, 0xef], json!("stub-algorithm"))
                .await
        });

        let request = browser.next_request().await;
        assert_eq!(request["kind"], "signature");
        assert_eq!(request["params"]["data"], encoding::encode(&[0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(request["params"]["algorithm"], "stub-algorithm");

        let response = browser
            .respond(&request["id"], json!(encoding::encode(&[1, 2, 3])))
            .await;
        assert!(response.status().is_success());

        assert_eq!(call.await.unwrap().unwrap(), vec![1, 2, 3]);
        wallet.close(SessionStatus::Success).await;
    }

    // =============================================================================
    // SCENARIO 3: ADDRESS CACHE
    // =============================================================================

    #[tokio::test]
    async fn test_active_address_cached_without_channel() {
        let wallet = wallet().await;
        let mut browser = FakeBrowser::attach(wallet.url()).await;

        let caller = Arc::clone(&wallet);
        let call = tokio::spawn(async move { caller.get_active_address().await });
        let request = browser.next_request().await;
        assert_eq!(request["kind"], "getActiveAddress");
        browser.respond(&request["id"], json!("abc123")).await;
        assert_eq!(call.await.unwrap().unwrap(), "abc123");

        browser.close();
        assert!(wait_for_state(wallet.url(), "detached", Duration::from_secs(20)).await);

        let registered = wallet.session().snapshot().stats.registered;
        assert_eq!(wallet.get_active_address().await.unwrap(), "abc123");
        assert_eq!(wallet.session().snapshot().stats.registered, registered);
        assert_eq!(wallet.session().table().pending_count(), 0);

        wallet.close(SessionStatus::Success).await;
    }

    // =============================================================================
    // SCENARIO 4: PORT CONFLICT
    // =============================================================================

    #[tokio::test]
    async fn test_port_in_use_rejects_initialize() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let config = RelayConfig {
            port,
            free_port: false,
            ..test_config()
        };
        let err = BrowserWallet::initialize(config).await.err().unwrap();
        assert_eq!(err, RelayError::PortInUse { port });
        assert!(err.to_string().contains(&port.to_string()));

        // the occupying listener is untouched and still accepts
        let accept = tokio::spawn(async move { occupied.accept().await.is_ok() });
        tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        assert!(accept.await.unwrap());
    }

    // =============================================================================
    // ERROR PROPAGATION
    // =============================================================================

    #[tokio::test]
    async fn test_timeout_isolation() {
        let wallet = Arc::new(
            BrowserWallet::initialize(RelayConfig {
                request_timeout: Duration::from_millis(300),
                ..test_config()
            })
            .await
            .unwrap(),
        );
        let mut browser = FakeBrowser::attach(wallet.url()).await;

        let slow = Arc::clone(&wallet);
        let slow = tokio::spawn(async move { slow.encrypt(b"secret", json!("RSA-OAEP")).await });
        let ignored = browser.next_request().await;
        assert_eq!(ignored["kind"], "encrypt");

        let fast = Arc::clone(&wallet);
        let fast = tokio::spawn(async move { fast.get_permissions().await });
        let answered = browser.next_request().await;
        browser
            .respond(&answered["id"], json!(["ACCESS_ADDRESS", "SIGNATURE"]))
            .await;

        assert_eq!(fast.await.unwrap().unwrap().len(), 2);
        match slow.await.unwrap().unwrap_err() {
            RelayError::Timeout { kind, elapsed } => {
                assert_eq!(kind, OperationKind::Encrypt);
                assert!(elapsed >= Duration::from_millis(300));
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        // a late answer for the timed-out id is accepted and ignored
        let late = browser.respond(&ignored["id"], json!("AQID")).await;
        assert!(late.status().is_success());
        assert_eq!(wallet.session().snapshot().stats.late_responses, 1);

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_extension_errors_reach_caller() {
        let wallet = wallet().await;
        let mut browser = FakeBrowser::attach(wallet.url()).await;

        let caller = Arc::clone(&wallet);
        let call = tokio::spawn(async move { caller.is_token_added("token-id").await });
        let request = browser.next_request().await;
        browser
            .respond_error(
                &request["id"],
                json!({ "message": "isTokenAdded missing", "code": "UNSUPPORTED_CAPABILITY" }),
            )
            .await;
        assert_eq!(
            call.await.unwrap().unwrap_err(),
            RelayError::CapabilityMissing {
                kind: OperationKind::IsTokenAdded
            }
        );

        let caller = Arc::clone(&wallet);
        let call = tokio::spawn(async move { caller.disconnect().await });
        let request = browser.next_request().await;
        browser
            .respond_error(&request["id"], json!("User rejected the request"))
            .await;
        assert_eq!(
            call.await.unwrap().unwrap_err().to_string(),
            "User rejected the request"
        );

        wallet.close(SessionStatus::Success).await;
    }

    #[tokio::test]
    async fn test_no_browser_is_unresponsive() {
        let wallet = BrowserWallet::initialize(RelayConfig {
            browser_timeout: Duration::from_millis(150),
            ..test_config()
        })
        .await
        .unwrap();

        let err = wallet.get_all_addresses().await.unwrap_err();
        assert!(matches!(err, RelayError::BrowserUnresponsive { .. }));
        assert!(err.to_string().contains("browser page not responding"));
        wallet.close(SessionStatus::Failed).await;
    }
}
