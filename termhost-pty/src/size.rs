/// The size of the visible display area in the pty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// The number of lines of text.
    pub rows: u16,
    /// The number of columns of text.
    pub cols: u16,
    /// The width of a cell in pixels.
    pub cell_width: u16,
    /// The height of a cell in pixels.
    pub cell_height: u16,
}

impl Default for PtySize {
    fn default() -> Self {
        PtySize {
            rows: 30,
            cols: 80,
            cell_width: 0,
            cell_height: 0,
        }
    }
}

impl From<PtySize> for portable_pty::PtySize {
    fn from(value: PtySize) -> portable_pty::PtySize {
        portable_pty::PtySize {
            rows: value.rows,
            cols: value.cols,
            pixel_width: value.cols * value.cell_width,
            pixel_height: value.rows * value.cell_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_portable_pty_size_without_loss() {
        let size = PtySize {
            rows: 42,
            cols: 120,
            cell_width: 8,
            cell_height: 16,
        };

        let converted: portable_pty::PtySize = size.into();

        assert_eq!(converted.rows, 42);
        assert_eq!(converted.cols, 120);
        assert_eq!(converted.pixel_width, 960);
        assert_eq!(converted.pixel_height, 672);
    }
}
