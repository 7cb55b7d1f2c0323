//! Grid-of-cells screen model driven by the escape sequence parser.
//!
//! [`ScreenBuffer`] is the pure data side: a primary and alternate
//! [`Grid`](grid::Grid) of [`Cell`](cell::Cell)s, cursor/pen/scrolling-region
//! state. [`Screen`] wraps it and implements `termhost_vte::Actor` so a
//! [`termhost_vte::Parser`] can drive it directly from PTY bytes.

mod cell;
mod color;
mod grid;
mod mode;
mod screen;
mod sgr;

pub use cell::{Cell, Flags, Pen};
pub use color::Color;
pub use grid::Grid;
pub use mode::{private, CursorStyle};
pub use screen::{Screen, ScreenBuffer};
pub use sgr::{apply_sgr, SgrDiffer};
