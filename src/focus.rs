//! Single-line focus navigation over a fixed line count.
//!
//! One navigator exists per active reading view and is discarded with it;
//! nothing here is persisted. Boundary moves and out-of-range jumps are
//! silent no-ops rather than errors.

/// Callback invoked when the focused line actually changes.
pub type LineChangeListener = Box<dyn FnMut(u32) + Send>;

pub struct FocusNavigator {
    current_line: u32,
    total_lines: u32,
    enabled: bool,
    on_line_change: Option<LineChangeListener>,
}

impl FocusNavigator {
    /// Creates a navigator over `total_lines` lines, starting at line 1
    /// with focus mode disabled.
    pub fn new(total_lines: u32) -> Self {
        Self {
            current_line: 1,
            total_lines,
            enabled: false,
            on_line_change: None,
        }
    }

    /// Like [`new`](Self::new) but starting at `line`. An out-of-range
    /// starting line falls back to 1.
    pub fn starting_at(total_lines: u32, line: u32) -> Self {
        let mut navigator = Self::new(total_lines);
        if line >= 1 && line <= total_lines {
            navigator.current_line = line;
        }
        navigator
    }

    /// Registers the listener called synchronously on every real line
    /// change. No-op moves never fire it.
    pub fn on_line_change(&mut self, listener: LineChangeListener) {
        self.on_line_change = Some(listener);
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    pub fn total_lines(&self) -> u32 {
        self.total_lines
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Moves focus down one line; no-op at the last line.
    pub fn next(&mut self) {
        if self.current_line < self.total_lines {
            self.set_line(self.current_line + 1);
        }
    }

    /// Moves focus up one line; no-op at line 1.
    pub fn previous(&mut self) {
        if self.current_line > 1 {
            self.set_line(self.current_line - 1);
        }
    }

    /// Jumps straight to `line` when it is in `[1, total_lines]`;
    /// otherwise the jump is silently ignored.
    pub fn jump_to(&mut self, line: u32) {
        if line >= 1 && line <= self.total_lines {
            self.set_line(line);
        }
    }

    /// Flips focus mode on or off without touching the current line.
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    fn set_line(&mut self, line: u32) {
        if line == self.current_line {
            return;
        }
        self.current_line = line;
        if let Some(listener) = self.on_line_change.as_mut() {
            listener(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn next_stops_at_the_last_line() {
        let mut nav = FocusNavigator::new(5);
        for _ in 0..5 {
            nav.next();
        }
        assert_eq!(nav.current_line(), 5);
        // A sixth call is a no-op, not an error.
        nav.next();
        assert_eq!(nav.current_line(), 5);
    }

    #[test]
    fn previous_stops_at_line_one() {
        let mut nav = FocusNavigator::new(3);
        nav.previous();
        assert_eq!(nav.current_line(), 1);
    }

    #[test]
    fn out_of_range_jumps_are_ignored() {
        let mut nav = FocusNavigator::new(5);
        nav.jump_to(3);
        assert_eq!(nav.current_line(), 3);
        nav.jump_to(0);
        assert_eq!(nav.current_line(), 3);
        nav.jump_to(6);
        assert_eq!(nav.current_line(), 3);
    }

    #[test]
    fn toggle_flips_enabled_without_moving() {
        let mut nav = FocusNavigator::starting_at(5, 4);
        assert!(!nav.is_enabled());
        nav.toggle();
        assert!(nav.is_enabled());
        assert_eq!(nav.current_line(), 4);
        nav.toggle();
        assert!(!nav.is_enabled());
    }

    #[test]
    fn starting_line_out_of_range_falls_back_to_one() {
        let nav = FocusNavigator::starting_at(5, 9);
        assert_eq!(nav.current_line(), 1);
    }

    #[test]
    fn listener_fires_only_on_real_changes() {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut nav = FocusNavigator::new(2);
        nav.on_line_change(Box::new(move |line| sink.lock().unwrap().push(line)));

        nav.next(); // 1 -> 2
        nav.next(); // boundary no-op
        nav.jump_to(7); // out of range, no-op
        nav.previous(); // 2 -> 1

        assert_eq!(*seen.lock().unwrap(), vec![2, 1]);
    }
}
