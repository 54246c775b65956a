//! Three-step challenge/response authentication.
//!
//! The hub logs a client in with a fixed question sequence: an empty
//! initiation request is answered with an EMAIL question, the email answer
//! with a PASSWORD question, and the password answer with the session token.
//! [`AuthFlow`] models that sequence as an explicit state machine so the
//! challenge-type branching is testable without a transport; [`AuthSession`]
//! holds the credentials and the current token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{
    ACCOUNT_RESPONSE_SUCCESS, QUESTION_TYPE_EMAIL, QUESTION_TYPE_PASSWORD, Response,
};

/// Which credential the hub asks for during login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    Email,
    Password,
}

impl std::fmt::Display for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Challenge::Email => write!(f, "email"),
            Challenge::Password => write!(f, "password"),
        }
    }
}

/// Account credentials, immutable for the client's lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Login progress. Each non-terminal state produces one request and
/// validates one response; any mismatch fails the whole attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlow {
    /// Nothing sent yet; next request is the empty initiation.
    Begin,
    /// The hub asked for the email; next request answers it.
    AnswerEmail,
    /// The hub asked for the password; next request answers it.
    AnswerPassword,
    /// Login complete; carries the session token.
    Authenticated(String),
}

impl AuthFlow {
    /// The request to send in the current state, or `None` once done.
    #[must_use]
    pub fn request(&self, credentials: &Credentials) -> Option<Value> {
        match self {
            AuthFlow::Begin => Some(json!({"account": {"auth": {"params": []}}})),
            AuthFlow::AnswerEmail => {
                Some(json!({"account": {"answer": {"data": credentials.email}}}))
            }
            AuthFlow::AnswerPassword => {
                Some(json!({"account": {"answer": {"data": credentials.password}}}))
            }
            AuthFlow::Authenticated(_) => None,
        }
    }

    /// Validate the hub's response to the current step and advance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedChallengeType`] when the hub deviates from
    /// the EMAIL → PASSWORD sequence, and [`Error::AuthenticationFailed`]
    /// when the final step is rejected or carries no token.
    pub fn advance(self, response: &Response) -> Result<AuthFlow> {
        match self {
            AuthFlow::Begin => {
                let status = response
                    .result_at(&["account", "auth", "status"])
                    .and_then(Value::as_str);
                let question = response
                    .result_at(&["account", "auth", "question", "type"])
                    .and_then(Value::as_str);
                if status != Some(ACCOUNT_RESPONSE_SUCCESS)
                    || question != Some(QUESTION_TYPE_EMAIL)
                {
                    return Err(Error::UnexpectedChallengeType {
                        expected: Challenge::Email,
                        got: question.unwrap_or("none").to_string(),
                    });
                }
                Ok(AuthFlow::AnswerEmail)
            }
            AuthFlow::AnswerEmail => {
                let question = response
                    .result_at(&["account", "answer", "question", "type"])
                    .and_then(Value::as_str);
                if question != Some(QUESTION_TYPE_PASSWORD) {
                    return Err(Error::UnexpectedChallengeType {
                        expected: Challenge::Password,
                        got: question.unwrap_or("none").to_string(),
                    });
                }
                Ok(AuthFlow::AnswerPassword)
            }
            AuthFlow::AnswerPassword => {
                let status = response
                    .result_at(&["account", "answer", "status"])
                    .and_then(Value::as_str);
                if status != Some(ACCOUNT_RESPONSE_SUCCESS) {
                    return Err(Error::AuthenticationFailed);
                }
                let token = response
                    .result_at(&["account", "answer", "token"])
                    .and_then(Value::as_str)
                    .ok_or(Error::AuthenticationFailed)?;
                Ok(AuthFlow::Authenticated(token.to_string()))
            }
            done @ AuthFlow::Authenticated(_) => Ok(done),
        }
    }
}

/// Credential and token state for one client instance.
///
/// The token is either valid-for-hub or absent; any rejection clears it
/// before a new flow runs. Only the login flow mutates it.
pub struct AuthSession {
    credentials: Credentials,
    token: Mutex<Option<String>>,
    /// Bumped on every successful login; used to coalesce concurrent
    /// stale-token refreshes.
    generation: AtomicU64,
    /// Serializes login flows so concurrent refresh attempts run one at a
    /// time instead of each re-authenticating.
    flow_lock: tokio::sync::Mutex<()>,
}

impl AuthSession {
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: Mutex::new(None),
            generation: AtomicU64::new(0),
            flow_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock_token().is_some()
    }

    /// Current token, if any; stamped into every outgoing envelope.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    pub fn set_token(&self, token: String) {
        *self.lock_token() = Some(token);
        let _ = self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn clear_token(&self) {
        self.lock_token().take();
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Acquire the login-flow lock. Held across an entire 3-step flow.
    pub async fn begin_flow(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.flow_lock.lock().await
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn email_challenge() -> Response {
        Response::success(
            1,
            json!({"account": {"auth": {
                "status": "ACCOUNT_RESPONSE_SUCCESS",
                "question": {"type": "QUESTION_TYPE_EMAIL"}
            }}}),
        )
    }

    fn password_challenge() -> Response {
        Response::success(
            2,
            json!({"account": {"answer": {
                "question": {"type": "QUESTION_TYPE_PASSWORD"}
            }}}),
        )
    }

    fn token_grant(token: &str) -> Response {
        Response::success(
            3,
            json!({"account": {"answer": {
                "status": "ACCOUNT_RESPONSE_SUCCESS",
                "token": token
            }}}),
        )
    }

    #[test]
    fn test_happy_path_reaches_token() {
        let creds = credentials();
        let flow = AuthFlow::Begin;
        assert_eq!(
            flow.request(&creds),
            Some(json!({"account": {"auth": {"params": []}}}))
        );

        let flow = flow.advance(&email_challenge()).unwrap();
        assert_eq!(flow, AuthFlow::AnswerEmail);
        assert_eq!(
            flow.request(&creds),
            Some(json!({"account": {"answer": {"data": "user@example.com"}}}))
        );

        let flow = flow.advance(&password_challenge()).unwrap();
        assert_eq!(flow, AuthFlow::AnswerPassword);
        assert_eq!(
            flow.request(&creds),
            Some(json!({"account": {"answer": {"data": "hunter2"}}}))
        );

        let flow = flow.advance(&token_grant("T")).unwrap();
        assert_eq!(flow, AuthFlow::Authenticated("T".to_string()));
        assert_eq!(flow.request(&creds), None);
    }

    #[test]
    fn test_missing_email_challenge_fails() {
        let response = Response::success(
            1,
            json!({"account": {"auth": {
                "status": "ACCOUNT_RESPONSE_SUCCESS",
                "question": {"type": "QUESTION_TYPE_PIN"}
            }}}),
        );
        let err = AuthFlow::Begin.advance(&response).unwrap_err();
        match err {
            Error::UnexpectedChallengeType { expected, got } => {
                assert_eq!(expected, Challenge::Email);
                assert_eq!(got, "QUESTION_TYPE_PIN");
            }
            other => panic!("expected challenge mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_initiation_status_fails() {
        let response = Response::success(
            1,
            json!({"account": {"auth": {
                "status": "ACCOUNT_RESPONSE_ERROR",
                "question": {"type": "QUESTION_TYPE_EMAIL"}
            }}}),
        );
        assert!(matches!(
            AuthFlow::Begin.advance(&response),
            Err(Error::UnexpectedChallengeType { .. })
        ));
    }

    #[test]
    fn test_missing_password_challenge_fails() {
        let response = Response::success(2, json!({"account": {"answer": {}}}));
        let err = AuthFlow::AnswerEmail.advance(&response).unwrap_err();
        match err {
            Error::UnexpectedChallengeType { expected, got } => {
                assert_eq!(expected, Challenge::Password);
                assert_eq!(got, "none");
            }
            other => panic!("expected challenge mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rejected_password_fails() {
        let response = Response::success(
            3,
            json!({"account": {"answer": {"status": "ACCOUNT_RESPONSE_WRONG_PASSWORD"}}}),
        );
        assert!(matches!(
            AuthFlow::AnswerPassword.advance(&response),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_success_without_token_fails() {
        let response = Response::success(
            3,
            json!({"account": {"answer": {"status": "ACCOUNT_RESPONSE_SUCCESS"}}}),
        );
        assert!(matches!(
            AuthFlow::AnswerPassword.advance(&response),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_session_token_state() {
        let session = AuthSession::new(credentials());
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.set_token("T".to_string());
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("T".to_string()));
        assert_eq!(session.generation(), 1);

        session.clear_token();
        assert!(!session.is_authenticated());
        // Clearing does not bump the generation; only a successful login does.
        assert_eq!(session.generation(), 1);
    }
}
