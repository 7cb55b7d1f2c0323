use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;
use crate::session::{Session, SessionInfo, SessionOptions, SessionState};

/// Host-wide table of live sessions, mutated under a single lock (§5: "Host
/// session registry: mutated under a single lock").
///
/// Sessions themselves serialize their own state behind their own locks, so
/// this registry only ever needs to hold its lock long enough to insert,
/// look up, or remove an `Arc<Session>` — never across a PTY or IO call.
pub struct SessionRegistry {
    max_sessions: usize,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(max_sessions: usize) -> SessionRegistry {
        SessionRegistry { max_sessions, sessions: Mutex::new(HashMap::new()) }
    }

    /// Spawns and registers a new session. Rejects a duplicate id or a
    /// registry already at `max_sessions` without spawning anything.
    pub fn create(&self, options: SessionOptions) -> Result<Arc<Session>, SessionError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&options.id) {
            return Err(SessionError::LimitExceeded(format!(
                "session id {:?} already exists",
                options.id
            )));
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::LimitExceeded(format!(
                "session limit of {} reached",
                self.max_sessions
            )));
        }

        let session = Arc::new(Session::spawn(options)?);
        sessions.insert(session.id().to_string(), Arc::clone(&session));
        Ok(session)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    #[must_use]
    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions.lock().unwrap().values().map(|s| s.info()).collect()
    }

    /// Requests termination of `id`; returns `false` if no such session.
    pub fn kill(&self, id: &str, force: bool) -> Result<bool, SessionError> {
        let Some(session) = self.get(id) else { return Ok(false) };
        session.kill(force)?;
        Ok(true)
    }

    /// Kills every session whose `is_idle_timed_out()` is true, then removes
    /// every session already in a terminal state (`Exited`/`Failed`) from
    /// the table — including ones just killed above, once their read loop
    /// has finished recording the transition. Called by the host's idle
    /// reaper tick; this is the only place sessions are dropped from the
    /// registry, so a session's id and resources are freed for reuse once
    /// its `State` stops being `Running`.
    pub fn reap_idle(&self) {
        let idle: Vec<Arc<Session>> = {
            let sessions = self.sessions.lock().unwrap();
            sessions.values().filter(|s| s.is_idle_timed_out()).cloned().collect()
        };
        for session in idle {
            log::info!("session {} idle-timed-out, killing", session.id());
            if let Err(err) = session.kill(true) {
                log::warn!("failed to kill idle session {}: {err}", session.id());
            }
        }

        let terminated: Vec<String> = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .values()
                .filter(|s| matches!(s.state(), SessionState::Exited | SessionState::Failed))
                .map(|s| s.id().to_string())
                .collect()
        };
        for id in terminated {
            log::debug!("removing terminated session {id} from the registry");
            self.remove(&id);
        }
    }

    /// Removes a session from the table regardless of its state. Safe to
    /// call repeatedly; a no-op once the id is gone.
    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn echo_options(id: &str) -> SessionOptions {
        SessionOptions {
            id: id.to_string(),
            cmd: "/bin/cat".to_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            cols: 80,
            rows: 24,
            buffer_size: 4096,
            idle_timeout: None,
        }
    }

    #[test]
    fn rejects_duplicate_id() {
        let registry = SessionRegistry::new(10);
        registry.create(echo_options("dup")).unwrap();
        let err = registry.create(echo_options("dup")).unwrap_err();
        assert!(matches!(err, SessionError::LimitExceeded(_)));
    }

    #[test]
    fn rejects_beyond_max_sessions() {
        let registry = SessionRegistry::new(1);
        registry.create(echo_options("a")).unwrap();
        let err = registry.create(echo_options("b")).unwrap_err();
        assert!(matches!(err, SessionError::LimitExceeded(_)));
    }

    #[test]
    fn kill_unknown_id_returns_false() {
        let registry = SessionRegistry::new(10);
        assert!(!registry.kill("nope", true).unwrap());
    }

    #[test]
    fn list_reflects_created_sessions() {
        let registry = SessionRegistry::new(10);
        registry.create(echo_options("listed")).unwrap();
        let infos = registry.list();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].id, "listed");
    }

    #[test]
    fn reap_idle_kills_but_does_not_remove_from_table() {
        let mut opts = echo_options("idle");
        opts.idle_timeout = Some(Duration::from_millis(0));
        let registry = SessionRegistry::new(10);
        let session = registry.create(opts).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.is_idle_timed_out());
        registry.reap_idle();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn reap_idle_removes_sessions_once_they_have_actually_terminated() {
        let registry = SessionRegistry::new(10);
        let session = registry.create(echo_options("short-lived")).unwrap();
        session.kill(true).unwrap();

        for _ in 0..100 {
            if session.state() != SessionState::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_ne!(session.state(), SessionState::Running);

        registry.reap_idle();
        assert_eq!(registry.len(), 0);
        assert!(registry.get("short-lived").is_none());
    }
}
