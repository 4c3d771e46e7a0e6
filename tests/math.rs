use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

mod support;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::time::timeout;

use math_rpc::client::MathClient;
use math_rpc::config::ClientConfig;
use math_rpc::error::{MathClientError, TransportError};
use math_rpc::service::{self, Calculator, MathService};
use math_rpc::xdr::math::{AddRequest, AddResponse, DivideRequest, DivideResponse};
use math_rpc::tcp::{MathTcp, MathTcpListener};

use support::start_server;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

fn client_for(port: u16) -> MathClient {
    MathClient::new("127.0.0.1", port)
}

/// Answers `add` only after a delay; `divide` is immediate.
struct SlowAdder {
    delay: Duration,
}

#[async_trait]
impl MathService for SlowAdder {
    async fn add(&self, request: AddRequest) -> AddResponse {
        tokio::time::sleep(self.delay).await;
        service::add(request.summand1, request.summand2)
    }

    async fn divide(&self, request: DivideRequest) -> DivideResponse {
        service::divide(request.dividend, request.divisor)
    }
}

/// A loopback port nothing is listening on.
fn unused_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind probe");
    listener.local_addr().expect("probe addr").port()
}

#[tokio::test]
async fn demo_sequence_over_tcp() {
    let server = start_server().await;
    let client = client_for(server.local_addr().port());

    let sum = timeout(CALL_TIMEOUT, client.try_add(42, 42))
        .await
        .expect("add timeout")
        .expect("add");
    assert_eq!(sum.result, 84);
    assert_eq!(sum.equation, "42 + 42 = 84");

    let quotient = timeout(CALL_TIMEOUT, client.divide(42.0, 2.0))
        .await
        .expect("divide timeout")
        .expect("divide");
    assert_eq!(quotient, 21.0);

    let err = timeout(CALL_TIMEOUT, client.divide(42.0, 0.0))
        .await
        .expect("divide timeout")
        .expect_err("division by zero");
    assert!(err.is_invalid_argument(), "unexpected error: {err:?}");
    assert!(!err.is_transport());
    assert_eq!(err.to_string(), "Invalid argument: Division by zero");

    assert!(client.shutdown().await);
    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn ping_and_fire_and_forget_add() {
    let server = start_server().await;
    let client = client_for(server.local_addr().port());

    timeout(CALL_TIMEOUT, client.ping()).await.expect("ping timeout").expect("ping");
    timeout(CALL_TIMEOUT, client.add(i32::MAX, 1)).await.expect("add timeout");

    let wrapped = client.try_add(i32::MAX, 1).await.expect("add");
    assert_eq!(wrapped.result, i32::MIN);

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn concurrent_callers_share_one_client() {
    let server = start_server().await;
    let client = Arc::new(client_for(server.local_addr().port()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.try_add(i, i).await }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let res = timeout(CALL_TIMEOUT, task).await.expect("timeout").expect("join").expect("add");
        assert_eq!(res.result, 2 * i as i32);
    }

    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let client = client_for(unused_port());

    let err = timeout(CALL_TIMEOUT, client.divide(42.0, 2.0))
        .await
        .expect("divide timeout")
        .expect_err("no server");
    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert!(matches!(
        err,
        MathClientError::Transport { procedure: "divide", source: TransportError::Io(_) }
    ));
    assert!(err.to_string().starts_with("RPC divide request failed with status:"));

    // add only logs the failure
    timeout(CALL_TIMEOUT, client.add(1, 2)).await.expect("add timeout");
    assert!(client.try_add(1, 2).await.expect_err("no server").is_transport());
}

#[tokio::test]
async fn reconnects_after_server_restart() {
    let server = start_server().await;
    let addr = server.local_addr();
    let client = client_for(addr.port());
    client.ping().await.expect("first ping");

    server.stop().await.expect("stop server");
    // the old connection is gone; the call fails and drops it
    assert!(client.ping().await.is_err());

    let restarted = MathTcpListener::bind(&addr.to_string(), Calculator)
        .await
        .expect("rebind")
        .spawn();
    timeout(CALL_TIMEOUT, client.ping()).await.expect("ping timeout").expect("ping after restart");
    restarted.stop().await.expect("stop server");
}

#[tokio::test]
async fn shutdown_gives_up_on_stuck_call() {
    // accepts the connection and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let silent = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = [0_u8; 1024];
        while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
    });

    let config = ClientConfig {
        shutdown_timeout: Duration::from_millis(200),
        ..ClientConfig::default()
    };
    let client = Arc::new(MathClient::with_config("127.0.0.1", port, config));
    let stuck = {
        let client = client.clone();
        tokio::spawn(async move { client.divide(1.0, 3.0).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let drained = timeout(Duration::from_secs(2), client.shutdown()).await.expect("shutdown hung");
    assert!(!drained);
    let err = client.ping().await.expect_err("closed");
    assert!(matches!(err, MathClientError::Transport { source: TransportError::Closed, .. }));

    stuck.abort();
    silent.abort();
}

#[tokio::test]
async fn listener_reports_bound_port() {
    let listener = MathTcpListener::bind("127.0.0.1:0", Calculator).await.expect("bind");
    assert_ne!(listener.get_listen_port(), 0);
    assert!(listener.get_listen_ip().is_loopback());
    assert_eq!(listener.local_addr().port(), listener.get_listen_port());
}

#[tokio::test]
async fn handle_until_returns_on_signal() {
    let listener = MathTcpListener::bind("127.0.0.1:0", Calculator).await.expect("bind");
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let serve = tokio::spawn(async move {
        listener
            .handle_until(async move {
                let _ = rx.await;
            })
            .await
    });
    tx.send(()).expect("signal");
    timeout(CALL_TIMEOUT, serve).await.expect("serve timeout").expect("join").expect("serve");
}

#[tokio::test]
async fn binding_a_busy_port_fails() {
    let first = MathTcpListener::bind("127.0.0.1:0", Calculator).await.expect("bind");
    let addr = first.local_addr().to_string();
    assert!(MathTcpListener::bind(&addr, Calculator).await.is_err());
}

#[tokio::test]
async fn eager_connect_reports_unreachable_server() {
    let err = MathClient::connect("127.0.0.1", unused_port(), ClientConfig::default())
        .await
        .expect_err("no server");
    assert!(matches!(err, TransportError::Io(_)));

    let server = start_server().await;
    let client =
        MathClient::connect("127.0.0.1", server.local_addr().port(), ClientConfig::default())
            .await
            .expect("connect");
    assert_eq!(client.divide(1.0, 4.0).await.expect("divide"), 0.25);
    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn abandoned_call_does_not_leak_its_reply() {
    let slow = SlowAdder { delay: Duration::from_millis(300) };
    let server = MathTcpListener::bind("127.0.0.1:0", slow).await.expect("bind").spawn();
    let client = client_for(server.local_addr().port());
    client.ping().await.expect("ping");

    // the add request is on the wire when the caller gives up on it
    assert!(timeout(Duration::from_millis(50), client.try_add(1, 2)).await.is_err());

    let quotient = timeout(CALL_TIMEOUT, client.divide(42.0, 2.0))
        .await
        .expect("divide timeout")
        .expect("divide after abandoned add");
    assert_eq!(quotient, 21.0);

    // the slow reply arrives after the divide; later calls stay in sync
    tokio::time::sleep(Duration::from_millis(400)).await;
    let sum = timeout(CALL_TIMEOUT, client.try_add(2, 3))
        .await
        .expect("add timeout")
        .expect("add");
    assert_eq!(sum.result, 5);

    server.stop().await.expect("stop server");
}
