//! Heartbeat liveness monitoring for connected clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Run heartbeat checks for a connection.
///
/// At each `interval` tick the alive flag is checked and reset. A client
/// that has not responded since the last tick accrues a missed pong; once
/// `timeout / interval` consecutive misses (at least one) are reached the
/// connection is considered dead and `HeartbeatResult::TimedOut` is
/// returned. Any inbound frame resets the budget.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    let mut missed_pongs: u32 = 0;
    let interval_secs = interval.as_secs().max(1);
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_secs() / interval_secs).max(1) as u32;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                // check_alive resets the flag; the client must respond again
                // before the next tick.
                if connection.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use quadro_core::{ConnectionId, UserId};
    use quadro_session::{HandshakeAuth, TokenService, authenticate};
    use tokio::sync::mpsc;

    fn make_connection() -> Arc<ClientConnection> {
        let tokens = TokenService::new(b"test-secret");
        let token = tokens
            .issue(UserId::new(7), Duration::from_secs(3600))
            .unwrap();
        let context = authenticate(
            &HandshakeAuth::new(token.clone(), token),
            &["userId".to_owned()],
            &tokens,
        )
        .unwrap();
        let (tx, _rx) = mpsc::channel(32);
        Arc::new(ClientConnection::new(
            ConnectionId::from("hb-conn"),
            context,
            tx,
        ))
    }

    #[tokio::test]
    async fn cancellation_wins_over_the_timer() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            conn,
            Duration::from_secs(100),
            Duration::from_secs(300),
            cancel.clone(),
        ));

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_times_out() {
        let conn = make_connection();
        // Drain the initial alive flag so every tick is a miss.
        let _ = conn.check_alive();

        let result = run_heartbeat(
            conn,
            Duration::from_secs(30),
            Duration::from_secs(90),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
    }

    #[tokio::test]
    async fn responsive_client_never_times_out() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_millis(50),
            Duration::from_millis(200),
            cancel.clone(),
        ));

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            conn.mark_alive();
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn missed_budget_is_timeout_over_interval() {
        // timeout 90s with 30s interval: three consecutive misses required.
        let conn = make_connection();
        let _ = conn.check_alive();

        let start = tokio::time::Instant::now();
        let result = run_heartbeat(
            conn,
            Duration::from_secs(30),
            Duration::from_secs(90),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, HeartbeatResult::TimedOut);
        // First tick fires immediately, so two more intervals elapse.
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn late_response_resets_the_budget() {
        let conn = make_connection();
        let cancel = CancellationToken::new();
        // 600ms budget at 200ms intervals: three max misses.
        let handle = tokio::spawn(run_heartbeat(
            conn.clone(),
            Duration::from_millis(200),
            Duration::from_millis(600),
            cancel.clone(),
        ));

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            conn.mark_alive();
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), HeartbeatResult::Cancelled);
    }
}
