//! 2 x 3 row/column switch matrix.
//!
//! Rows are driven to the active level one at a time; after a settle delay
//! the three columns are sampled (a low column means the cell at the
//! crossing is closed) and the row is returned to the inactive level before
//! the next row is touched.  Every row sits at the inactive level outside
//! of its own scan window.
//!
//! Cells (0, 0) and (1, 0) are the desk up / down controls.  They are hold
//! to run, so they bypass the debounce window and report both edges on the
//! tick they are seen.  A column that cannot be read counts as open, which
//! for those two cells means "stop".

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::warn;

use super::debounce::DebounceRecord;
use super::push_event;
use crate::config::{InputConfig, Level};
use crate::events::{InputEvent, InputEvents, SwitchId};

pub const MATRIX_ROWS: usize = 2;
pub const MATRIX_COLS: usize = 3;

/// Column shared by the two momentary desk cells.
const DESK_COL: usize = 0;

pub struct SwitchMatrix<O, I, D> {
    rows: [O; MATRIX_ROWS],
    cols: [I; MATRIX_COLS],
    delay: D,
    settle_us: u32,
    row_active: Level,
    debounce_ms: u64,
    cells: [[DebounceRecord; MATRIX_COLS]; MATRIX_ROWS],
    /// Closed state of the desk cells as of the last scan, indexed by row.
    desk_closed: [bool; MATRIX_ROWS],
}

impl<O, I, D> SwitchMatrix<O, I, D>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Takes ownership of the lines and parks every row at the inactive level.
    pub fn new(rows: [O; MATRIX_ROWS], cols: [I; MATRIX_COLS], delay: D, cfg: &InputConfig) -> Self {
        let mut matrix = Self {
            rows,
            cols,
            delay,
            settle_us: cfg.matrix_settle_us,
            row_active: cfg.row_active_level,
            debounce_ms: cfg.debounce_ms,
            cells: [[DebounceRecord::new(); MATRIX_COLS]; MATRIX_ROWS],
            desk_closed: [false; MATRIX_ROWS],
        };
        for row in 0..MATRIX_ROWS {
            matrix.release_row(row);
        }
        matrix
    }

    /// Scan every row once and append the resulting events in row-major order.
    pub fn scan(&mut self, now_ms: u64, events: &mut InputEvents) {
        for row in 0..MATRIX_ROWS {
            let driven = self.drive_row(row);
            let mut closed = [false; MATRIX_COLS];
            if driven {
                self.delay.delay_us(self.settle_us);
                for (col, slot) in closed.iter_mut().enumerate() {
                    *slot = self.sample_col(row, col);
                }
            }
            self.release_row(row);

            for (col, &is_closed) in closed.iter().enumerate() {
                if col == DESK_COL {
                    self.update_desk_cell(row, is_closed, events);
                } else if self.cells[row][col].accept(now_ms, is_closed, self.debounce_ms) {
                    push_event(
                        events,
                        InputEvent::SwitchPressed(SwitchId::Matrix {
                            row: row as u8,
                            col: col as u8,
                        }),
                    );
                }
            }
        }
    }

    fn update_desk_cell(&mut self, row: usize, closed: bool, events: &mut InputEvents) {
        if closed == self.desk_closed[row] {
            return;
        }
        self.desk_closed[row] = closed;
        let id = if row == 0 { SwitchId::DeskUp } else { SwitchId::DeskDown };
        let event = if closed {
            InputEvent::SwitchPressed(id)
        } else {
            InputEvent::SwitchReleased(id)
        };
        push_event(events, event);
    }

    fn drive_row(&mut self, row: usize) -> bool {
        match self.rows[row].set_state(PinState::from(self.row_active)) {
            Ok(()) => true,
            Err(_) => {
                warn!("Matrix: failed to drive row {row}, cells read as open");
                false
            }
        }
    }

    fn release_row(&mut self, row: usize) {
        if self.rows[row]
            .set_state(PinState::from(self.row_active.inverted()))
            .is_err()
        {
            warn!("Matrix: failed to release row {row}");
        }
    }

    fn sample_col(&mut self, row: usize, col: usize) -> bool {
        match self.cols[col].is_low() {
            Ok(closed) => closed,
            Err(_) => {
                warn!("Matrix: read error at ({row}, {col}), treated as open");
                false
            }
        }
    }
}
