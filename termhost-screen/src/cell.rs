use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Per-cell rendering attributes.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Flags: u16 {
        const BOLD          = 0b0000_0001;
        const DIM           = 0b0000_0010;
        const ITALIC        = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const BLINK         = 0b0001_0000;
        const INVERSE       = 0b0010_0000;
        const HIDDEN        = 0b0100_0000;
        const STRIKETHROUGH = 0b1000_0000;
    }
}

/// The fg/bg/attribute triple applied to newly written cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub flags: Flags,
}

impl Default for Pen {
    fn default() -> Self {
        Pen {
            fg: Color::default(),
            bg: Color::default(),
            flags: Flags::empty(),
        }
    }
}

/// A single grid element.
///
/// A NUL codepoint marks the cell empty. Every `Cell` is always a valid
/// value — there is no uninitialized state — but an empty cell still
/// compares equal to a space-with-default-pen cell for rendering purposes
/// via [`Cell::is_blank`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cell {
    pub c: char,
    pub fg: Color,
    pub bg: Color,
    pub flags: Flags,
}

impl Cell {
    #[must_use]
    pub fn blank() -> Cell {
        Cell {
            c: '\0',
            fg: Color::default(),
            bg: Color::default(),
            flags: Flags::empty(),
        }
    }

    #[must_use]
    pub fn with_pen(pen: Pen) -> Cell {
        Cell {
            c: '\0',
            fg: pen.fg,
            bg: pen.bg,
            flags: pen.flags,
        }
    }

    /// True if this cell has no visible content and the default pen: an
    /// empty cell and a space-with-defaults cell are both "blank" for
    /// rendering, even though their stored codepoint differs.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        (self.c == '\0' || self.c == ' ')
            && self.fg.is_default()
            && self.bg.is_default()
            && self.flags.is_empty()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::blank()
    }
}
