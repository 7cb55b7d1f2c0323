use termhost_protocol::{SessionInfo as WireInfo, WireSessionState};
use termhost_session::{SessionInfo, SessionState};

fn wire_state(state: SessionState) -> WireSessionState {
    match state {
        SessionState::Starting => WireSessionState::Starting,
        SessionState::Running => WireSessionState::Running,
        SessionState::Exited => WireSessionState::Exited,
        SessionState::Failed => WireSessionState::Failed,
    }
}

pub fn to_wire_info(info: SessionInfo) -> WireInfo {
    WireInfo {
        id: info.id,
        cmd: info.cmd,
        cwd: info.cwd,
        state: wire_state(info.state),
        created_ms: info.created_ms,
        exit: info.exit,
        cols: info.cols,
        rows: info.rows,
    }
}

pub fn to_wire_infos(infos: Vec<SessionInfo>) -> Vec<WireInfo> {
    infos.into_iter().map(to_wire_info).collect()
}
