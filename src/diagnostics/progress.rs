//! Single-line progress indicator, redrawn in place with a carriage return.

const BAR_WIDTH: usize = 28;

/// Counts processed units against an expected total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    current: u64,
    total: u64,
}

impl ProgressIndicator {
    /// Reset the counter and set the expected number of units.
    pub fn start(&mut self, total: u64) {
        self.current = 0;
        self.total = total;
    }

    /// Count one more processed unit. Returns the new count.
    pub fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// The indicator line, starting with `\r` so it overwrites the previous one.
    ///
    /// Counts past the total keep counting with a full bar.
    pub fn render(&self) -> String {
        if self.total == 0 {
            return format!("\r  {}", self.current);
        }

        let done = self.current.min(self.total);
        let filled = usize::try_from(done * BAR_WIDTH as u64 / self.total).unwrap_or(BAR_WIDTH);
        let bar = if filled >= BAR_WIDTH {
            "=".repeat(BAR_WIDTH)
        } else {
            format!("{}>{}", "=".repeat(filled), "-".repeat(BAR_WIDTH - filled - 1))
        };
        let percent = done * 100 / self.total;
        let width = self.total.to_string().len();

        format!(
            "\r  {:>width$}/{} [{bar}] {percent:>3}%",
            self.current, self.total
        )
    }
}
