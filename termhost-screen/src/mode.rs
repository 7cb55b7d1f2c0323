/// `CSI ? Pm h/l` private mode numbers this screen understands.
///
/// Numbers not listed here are accepted (the set/reset CSI still dispatches
/// cleanly) but have no observable effect on the grid.
pub mod private {
    pub const CURSOR_KEYS: i64 = 1;
    pub const COLUMN_132: i64 = 3;
    pub const ORIGIN: i64 = 6;
    pub const AUTOWRAP: i64 = 7;
    pub const SHOW_CURSOR: i64 = 25;
    pub const ALT_SCREEN_47: i64 = 47;
    pub const BRACKETED_PASTE: i64 = 2004;
    pub const FOCUS_EVENTS: i64 = 1004;
    pub const ALT_SCREEN_SAVE_1047: i64 = 1047;
    pub const ALT_SCREEN_SAVE_CURSOR_1048: i64 = 1048;
    pub const ALT_SCREEN_SAVE_CURSOR_1049: i64 = 1049;
    pub const SYNC_UPDATE: i64 = 2026;
}

/// Shape requested via `CSI Ps SP q` (DECSCUSR).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CursorStyle {
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorStyle {
    #[must_use]
    pub fn from_param(p: i64) -> Option<CursorStyle> {
        use CursorStyle::*;
        match p {
            0 | 1 => Some(BlinkingBlock),
            2 => Some(SteadyBlock),
            3 => Some(BlinkingUnderline),
            4 => Some(SteadyUnderline),
            5 => Some(BlinkingBar),
            6 => Some(SteadyBar),
            _ => None,
        }
    }
}
