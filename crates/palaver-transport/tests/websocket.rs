//! Integration tests for the WebSocket transport.
//!
//! Both ends are real sockets: a `WebSocketTransport` listener on an
//! OS-assigned port and a `ClientConnection` dialing it.

#[cfg(feature = "websocket")]
mod websocket {
    use palaver_transport::{
        ClientConnection, Connection, ServerConnection, Transport,
        TransportError, WebSocketTransport,
    };

    /// Binds a listener on port 0, dials it, and returns both ends.
    async fn connected_pair() -> (ServerConnection, ClientConnection) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let client = ClientConnection::connect(&format!("ws://{addr}/ws"))
            .await
            .expect("client should connect");
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_send_receive_both_directions() {
        let (server, client) = connected_pair().await;
        assert!(server.id().into_inner() > 0);
        assert_ne!(server.id(), client.id());

        client
            .send(br#"{"type":0}"#)
            .await
            .expect("client send should succeed");
        let received = server
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":0}"#);

        server
            .send(b"hello from relay")
            .await
            .expect("server send should succeed");
        let received = client.recv().await.unwrap().unwrap();
        assert_eq!(received, b"hello from relay");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_payload_survives_as_binary() {
        let (server, client) = connected_pair().await;

        client.send(&[0xff, 0x00, 0xfe]).await.unwrap();
        let received = server.recv().await.unwrap().unwrap();
        assert_eq!(received, vec![0xff, 0x00, 0xfe]);
    }

    #[tokio::test]
    async fn test_websocket_send_not_blocked_by_pending_recv() {
        // The client loop selects over recv and send; a parked recv
        // must not hold the write half.
        let (server, client) = connected_pair().await;
        let client = std::sync::Arc::new(client);

        let reader = std::sync::Arc::clone(&client);
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            client.send(b"while reading"),
        )
        .await
        .expect("send should not wait for recv")
        .unwrap();
        assert_eq!(server.recv().await.unwrap().unwrap(), b"while reading");

        server.send(b"wake up").await.unwrap();
        let woke = pending.await.unwrap().unwrap().unwrap();
        assert_eq!(woke, b"wake up");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server, client) = connected_pair().await;

        client.close().await.expect("close should succeed");

        let result = server.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_returns_connect_failed() {
        // Bind then drop to obtain a port nobody listens on.
        let addr = {
            let transport = WebSocketTransport::bind("127.0.0.1:0")
                .await
                .unwrap();
            transport.local_addr().unwrap()
        };

        let result = ClientConnection::connect(&format!("ws://{addr}")).await;
        assert!(
            matches!(result, Err(TransportError::ConnectFailed { .. })),
            "expected ConnectFailed"
        );
    }
}
