use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Human-facing run log on stderr. Library diagnostics go through `tracing`.
pub struct ConsoleProgress {
    enabled: bool,
    started: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(msg.as_ref());
    }

    /// `[mm:ss] [3/7] wiki: 120 written, 4 rejected`
    pub fn stage(&self, index: usize, total: usize, name: &str, detail: impl AsRef<str>) {
        let total = total.max(1);
        self.emit(&format!("[{}/{total}] {name}: {}", index.min(total), detail.as_ref()));
    }

    fn emit(&self, line: &str) {
        if !self.enabled {
            return;
        }
        let clock = clock(self.started.elapsed());
        let _ = writeln!(io::stderr().lock(), "[{clock}] {line}");
    }
}

fn clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, mins, secs) = (secs / 3600, secs / 60 % 60, secs % 60);
    match hours {
        0 => format!("{mins:02}:{secs:02}"),
        _ => format!("{hours:02}:{mins:02}:{secs:02}"),
    }
}
