//! One call in flight per connection.

use std::{sync::Arc, time::Duration};

use nebula_client::{ClientError, Connection, ConnectionState, SessionId};
use test_util::{MockGraphServer, PASSWORD, USERNAME};
use tokio::time::{sleep, timeout};

async fn authenticated(server: &MockGraphServer) -> (Connection, SessionId) {
    let conn = Connection::new(server.config()).expect("config");
    conn.open().await.expect("open");
    let id = conn
        .authenticate(USERNAME, PASSWORD)
        .await
        .expect("authenticate")
        .session_id()
        .expect("session issued");
    (conn, id)
}

#[tokio::test]
async fn second_execute_during_first_is_rejected() {
    let server = MockGraphServer::start().await.expect("server");
    let (conn, id) = authenticated(&server).await;

    let (slow, fast) = tokio::join!(conn.execute(id.get(), "SLEEP 300"), async {
        sleep(Duration::from_millis(50)).await;
        conn.execute(id.get(), "YIELD 1").await
    });

    assert!(slow.expect("first call").is_succeeded());
    assert!(
        matches!(fast, Err(ClientError::CallInProgress)),
        "got {fast:?}"
    );
    assert!(conn.ping(id.get()).await.expect("ping after guard"));
    conn.close().await;
}

#[tokio::test]
async fn guard_holds_across_tasks() {
    let server = MockGraphServer::start().await.expect("server");
    let (conn, id) = authenticated(&server).await;
    let conn = Arc::new(conn);

    let background = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.execute(id.get(), "SLEEP 300").await }
    });
    sleep(Duration::from_millis(50)).await;

    let err = conn.signout(id.get()).await.expect_err("busy");
    assert!(matches!(err, ClientError::CallInProgress), "got {err:?}");
    assert_eq!(conn.state(), ConnectionState::Authenticated(id));

    let resp = background.await.expect("join").expect("first call");
    assert!(resp.is_succeeded());
    conn.signout(id.get()).await.expect("signout");
    conn.close().await;
}

#[tokio::test]
async fn close_waits_for_in_flight_call() {
    let server = MockGraphServer::start().await.expect("server");
    let (conn, id) = authenticated(&server).await;

    let (resp, state) = tokio::join!(conn.execute(id.get(), "SLEEP 200"), async {
        sleep(Duration::from_millis(50)).await;
        conn.close().await;
        conn.state()
    });

    assert!(resp.expect("call completes before close").is_succeeded());
    assert_eq!(state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn abandoned_call_breaks_connection_until_reopened() {
    let server = MockGraphServer::start().await.expect("server");
    let (conn, id) = authenticated(&server).await;

    let abandoned = timeout(Duration::from_millis(50), conn.execute(id.get(), "SLEEP 150")).await;
    assert!(abandoned.is_err(), "call must still be waiting");
    sleep(Duration::from_millis(200)).await;

    let err = conn.execute(id.get(), "YIELD 1").await.expect_err("stale reply pending");
    assert!(
        matches!(
            err,
            ClientError::InvalidState {
                actual: ConnectionState::Broken,
                ..
            }
        ),
        "got {err:?}"
    );
    assert_eq!(conn.session_id(), None);

    conn.close().await;
    conn.open().await.expect("reopen");
    let id = conn
        .authenticate(USERNAME, PASSWORD)
        .await
        .expect("authenticate")
        .session_id()
        .expect("session issued");
    for _ in 0..3 {
        assert!(conn.ping(id.get()).await.expect("ping"));
    }
    conn.close().await;
}
