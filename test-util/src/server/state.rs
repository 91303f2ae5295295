//! Session table and statement script of the mock server.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        PoisonError,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use nebula_client::{
    ErrorCode,
    protocol::{AuthReply, ExecReply, Value},
};

/// Server-side execution time reported by every reply.
const LATENCY_US: u64 = 120;

/// What the connection handler does with an execute request.
#[derive(Debug)]
pub(crate) enum Action {
    /// Send the reply immediately.
    Reply(ExecReply),
    /// Wait, then send the reply.
    Delay(Duration, ExecReply),
    /// Send a reply whose body cannot be parsed.
    Garble,
    /// Close the socket without replying.
    Drop,
}

/// Shared state of one mock server.
#[derive(Debug)]
pub(crate) struct ServerState {
    username: String,
    password: String,
    last_session: AtomicI64,
    sessions: Mutex<HashSet<i64>>,
    signouts: AtomicUsize,
}

fn failure(code: ErrorCode, msg: impl Into<String>) -> ExecReply {
    ExecReply {
        error_code: code.code(),
        error_msg: Some(msg.into()),
        latency_us: LATENCY_US,
        ..ExecReply::default()
    }
}

fn success(column_names: Vec<String>, rows: Vec<Vec<Value>>) -> ExecReply {
    ExecReply {
        error_code: ErrorCode::Succeeded.code(),
        latency_us: LATENCY_US,
        column_names,
        rows,
        ..ExecReply::default()
    }
}

impl ServerState {
    pub(crate) fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            last_session: AtomicI64::new(0),
            sessions: Mutex::new(HashSet::new()),
            signouts: AtomicUsize::new(0),
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashSet<i64>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn active_sessions(&self) -> usize { self.sessions().len() }

    pub(crate) fn signouts(&self) -> usize { self.signouts.load(Ordering::SeqCst) }

    pub(crate) fn authenticate(&self, username: &str, password: &str) -> AuthReply {
        if username != self.username || password != self.password {
            return AuthReply {
                error_code: ErrorCode::BadUsernamePassword.code(),
                session_id: 0,
                error_msg: Some("Bad username/password".to_owned()),
            };
        }
        let id = self.last_session.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions().insert(id);
        AuthReply {
            error_code: ErrorCode::Succeeded.code(),
            session_id: id,
            error_msg: None,
        }
    }

    pub(crate) fn signout(&self, session_id: i64) {
        self.sessions().remove(&session_id);
        self.signouts.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn execute(&self, session_id: i64, statement: &str) -> Action {
        if !self.sessions().contains(&session_id) {
            return Action::Reply(failure(ErrorCode::SessionInvalid, "Session not existed!"));
        }
        let stmt = statement.trim();
        let upper = stmt.to_ascii_uppercase();
        if upper.is_empty() {
            return Action::Reply(failure(ErrorCode::StatementEmpty, "Statement empty"));
        }
        if upper == "SHOW SPACES" {
            return Action::Reply(success(Vec::new(), Vec::new()));
        }
        if upper == "YIELD 1" {
            return Action::Reply(success(vec!["1".to_owned()], vec![vec![Value::Int(1)]]));
        }
        if upper == "GARBLE" {
            return Action::Garble;
        }
        if upper == "DROP" {
            return Action::Drop;
        }
        if let Some(ms) = upper
            .strip_prefix("SLEEP ")
            .and_then(|rest| rest.trim().parse::<u64>().ok())
        {
            return Action::Delay(Duration::from_millis(ms), success(Vec::new(), Vec::new()));
        }
        Action::Reply(failure(
            ErrorCode::SyntaxError,
            format!("syntax error near `{stmt}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn logged_in() -> (ServerState, i64) {
        let state = ServerState::new("root", "nebula");
        let id = state.authenticate("root", "nebula").session_id;
        (state, id)
    }

    #[test]
    fn issues_distinct_sessions() {
        let (state, first) = logged_in();
        let second = state.authenticate("root", "nebula").session_id;
        assert_ne!(first, 0);
        assert_ne!(first, second);
        assert_eq!(state.active_sessions(), 2);
    }

    #[rstest]
    #[case("root", "wrong")]
    #[case("nobody", "nebula")]
    fn rejects_bad_credentials(#[case] user: &str, #[case] pass: &str) {
        let state = ServerState::new("root", "nebula");
        let reply = state.authenticate(user, pass);
        assert_eq!(reply.error_code, ErrorCode::BadUsernamePassword.code());
        assert_eq!(reply.session_id, 0);
        assert_eq!(state.active_sessions(), 0);
    }

    #[rstest]
    #[case("SHOW SPACES", 0)]
    #[case("yield 1", 0)]
    #[case("  ", -9)]
    #[case("MATCH (v) RETURN v", -7)]
    fn scripted_statements(#[case] statement: &str, #[case] code: i32) {
        let (state, id) = logged_in();
        let Action::Reply(reply) = state.execute(id, statement) else {
            panic!("expected an immediate reply");
        };
        assert_eq!(reply.error_code, code);
    }

    #[test]
    fn signed_out_session_is_invalid() {
        let (state, id) = logged_in();
        state.signout(id);
        assert_eq!(state.signouts(), 1);
        let Action::Reply(reply) = state.execute(id, "YIELD 1") else {
            panic!("expected an immediate reply");
        };
        assert_eq!(reply.error_code, ErrorCode::SessionInvalid.code());
    }

    #[test]
    fn sleep_is_delayed() {
        let (state, id) = logged_in();
        assert!(matches!(
            state.execute(id, "SLEEP 25"),
            Action::Delay(d, _) if d == Duration::from_millis(25)
        ));
    }
}
