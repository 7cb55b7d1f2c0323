use crate::cell::{Flags, Pen};
use crate::color::Color;

/// Applies the parameters of a completed `CSI ... m` to `pen` in place.
///
/// An empty parameter list is equivalent to a single `0` (full reset). `38`
/// and `48` consume either `5;n` (256-color) or `2;r;g;b` (truecolor) from
/// the remaining parameters; colon-separated sub-parameters have already
/// been flattened into the same integer list by the parser layer, so `38:2:
/// :r:g:b`-style sequences are handled identically to the semicolon form.
pub fn apply_sgr(pen: &mut Pen, params: &[i64]) {
    if params.is_empty() {
        *pen = Pen::default();
        return;
    }

    let mut i = 0;
    while i < params.len() {
        let code = params[i];
        match code {
            0 => *pen = Pen::default(),
            1 => pen.flags.insert(Flags::BOLD),
            2 => pen.flags.insert(Flags::DIM),
            3 => pen.flags.insert(Flags::ITALIC),
            4 => pen.flags.insert(Flags::UNDERLINE),
            5 | 6 => pen.flags.insert(Flags::BLINK),
            7 => pen.flags.insert(Flags::INVERSE),
            8 => pen.flags.insert(Flags::HIDDEN),
            9 => pen.flags.insert(Flags::STRIKETHROUGH),
            21 => pen.flags.remove(Flags::BOLD),
            22 => pen.flags.remove(Flags::BOLD | Flags::DIM),
            23 => pen.flags.remove(Flags::ITALIC),
            24 => pen.flags.remove(Flags::UNDERLINE),
            25 => pen.flags.remove(Flags::BLINK),
            27 => pen.flags.remove(Flags::INVERSE),
            28 => pen.flags.remove(Flags::HIDDEN),
            29 => pen.flags.remove(Flags::STRIKETHROUGH),
            30..=37 => pen.fg = Color::indexed((code - 30) as u8),
            38 => {
                let (color, consumed) = extended_color(&params[i + 1..]);
                if let Some(color) = color {
                    pen.fg = color;
                }
                i += consumed;
            }
            39 => pen.fg = Color::default(),
            40..=47 => pen.bg = Color::indexed((code - 40) as u8),
            48 => {
                let (color, consumed) = extended_color(&params[i + 1..]);
                if let Some(color) = color {
                    pen.bg = color;
                }
                i += consumed;
            }
            49 => pen.bg = Color::default(),
            90..=97 => pen.fg = Color::indexed((code - 90 + 8) as u8),
            100..=107 => pen.bg = Color::indexed((code - 100 + 8) as u8),
            _ => {}
        }
        i += 1;
    }
}

/// Parses the tail of a `38;...`/`48;...` sequence, returning the decoded
/// color (if any) and the number of extra parameters consumed beyond the
/// `38`/`48` code itself.
fn extended_color(rest: &[i64]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => {
            let idx = rest.get(1).copied().unwrap_or(0).clamp(0, 255) as u8;
            (Some(Color::indexed(idx)), 2)
        }
        Some(2) => {
            let r = rest.get(1).copied().unwrap_or(0).clamp(0, 255) as u8;
            let g = rest.get(2).copied().unwrap_or(0).clamp(0, 255) as u8;
            let b = rest.get(3).copied().unwrap_or(0).clamp(0, 255) as u8;
            (Some(Color::rgb(r, g, b)), 4)
        }
        _ => (None, 1),
    }
}

/// Tracks the last emitted pen while rendering and writes the shortest SGR
/// needed to move from it to a target pen.
///
/// If any attribute bit would need to be *cleared*, the differ emits a full
/// reset (`CSI 0 m`) and re-applies every bit that should still be set,
/// since SGR has no per-bit "unset" codes that are universally supported;
/// additions and color changes are otherwise emitted incrementally.
pub struct SgrDiffer {
    last: Pen,
}

impl SgrDiffer {
    #[must_use]
    pub fn new() -> SgrDiffer {
        SgrDiffer { last: Pen::default() }
    }

    pub fn diff_into(&mut self, target: Pen, out: &mut String) {
        if target == self.last {
            return;
        }

        let cleared = self.last.flags.difference(target.flags);
        let mut codes: Vec<String> = Vec::new();

        if !cleared.is_empty() || (self.last.fg != target.fg && target.fg.is_default())
            || (self.last.bg != target.bg && target.bg.is_default())
        {
            codes.push("0".to_string());
            self.last = Pen::default();
        }

        if target.flags.contains(Flags::BOLD) && !self.last.flags.contains(Flags::BOLD) {
            codes.push("1".to_string());
        }
        if target.flags.contains(Flags::DIM) && !self.last.flags.contains(Flags::DIM) {
            codes.push("2".to_string());
        }
        if target.flags.contains(Flags::ITALIC) && !self.last.flags.contains(Flags::ITALIC) {
            codes.push("3".to_string());
        }
        if target.flags.contains(Flags::UNDERLINE) && !self.last.flags.contains(Flags::UNDERLINE) {
            codes.push("4".to_string());
        }
        if target.flags.contains(Flags::BLINK) && !self.last.flags.contains(Flags::BLINK) {
            codes.push("5".to_string());
        }
        if target.flags.contains(Flags::INVERSE) && !self.last.flags.contains(Flags::INVERSE) {
            codes.push("7".to_string());
        }
        if target.flags.contains(Flags::HIDDEN) && !self.last.flags.contains(Flags::HIDDEN) {
            codes.push("8".to_string());
        }
        if target.flags.contains(Flags::STRIKETHROUGH)
            && !self.last.flags.contains(Flags::STRIKETHROUGH)
        {
            codes.push("9".to_string());
        }

        if target.fg != self.last.fg {
            push_color(&mut codes, target.fg, true);
        }
        if target.bg != self.last.bg {
            push_color(&mut codes, target.bg, false);
        }

        if !codes.is_empty() {
            out.push_str("\x1b[");
            out.push_str(&codes.join(";"));
            out.push('m');
        }

        self.last = target;
    }
}

impl Default for SgrDiffer {
    fn default() -> Self {
        Self::new()
    }
}

fn push_color(codes: &mut Vec<String>, color: Color, foreground: bool) {
    if color.is_default() {
        codes.push(if foreground { "39" } else { "49" }.to_string());
    } else if let Some((r, g, b)) = color.rgb_components() {
        let base = if foreground { 38 } else { 48 };
        codes.push(format!("{base};2;{r};{g};{b}"));
    } else if let Some(idx) = color.index() {
        if idx < 8 {
            codes.push((if foreground { 30 } else { 40 } + idx as u32).to_string());
        } else if idx < 16 {
            codes.push((if foreground { 90 } else { 100 } + (idx - 8) as u32).to_string());
        } else {
            let base = if foreground { 38 } else { 48 };
            codes.push(format!("{base};5;{idx}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_all_on_empty_params() {
        let mut pen = Pen {
            fg: Color::indexed(1),
            bg: Color::default(),
            flags: Flags::BOLD,
        };
        apply_sgr(&mut pen, &[]);
        assert_eq!(pen, Pen::default());
    }

    #[test]
    fn truecolor_foreground() {
        let mut pen = Pen::default();
        apply_sgr(&mut pen, &[38, 2, 10, 20, 30]);
        assert_eq!(pen.fg.rgb_components(), Some((10, 20, 30)));
    }

    #[test]
    fn indexed_256_background() {
        let mut pen = Pen::default();
        apply_sgr(&mut pen, &[48, 5, 200]);
        assert_eq!(pen.bg.index(), Some(200));
    }

    #[test]
    fn differ_emits_only_additions_when_nothing_cleared() {
        let mut differ = SgrDiffer::new();
        let mut out = String::new();
        let mut pen = Pen::default();
        pen.flags.insert(Flags::BOLD);
        differ.diff_into(pen, &mut out);
        assert_eq!(out, "\x1b[1m");

        out.clear();
        pen.fg = Color::indexed(2);
        differ.diff_into(pen, &mut out);
        assert_eq!(out, "\x1b[32m");
    }

    #[test]
    fn differ_emits_full_reset_when_clearing() {
        let mut differ = SgrDiffer::new();
        let mut out = String::new();
        let mut pen = Pen::default();
        pen.flags.insert(Flags::BOLD);
        differ.diff_into(pen, &mut out);

        out.clear();
        pen.flags.remove(Flags::BOLD);
        differ.diff_into(pen, &mut out);
        assert_eq!(out, "\x1b[0m");
    }
}
