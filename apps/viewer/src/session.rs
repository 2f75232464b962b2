use std::io::{IsTerminal, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use reconcile::{StatusDisplay, WAITING_STATUS};

/// Status line shared between the poller and whoever reports on shutdown.
#[derive(Clone, Default)]
pub struct AppSession {
    inner: Arc<Mutex<Inner>>,
    // mirror status changes to stdout
    echo: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Inner {
    pub status: String,
    pub cycles: u64,
    pub waiting_cycles: u64,
}

impl AppSession {
    pub fn new(echo: bool) -> Self {
        Self { inner: Arc::default(), echo }
    }

    pub fn status(&self) -> String {
        self.inner.lock().status.clone()
    }

    pub fn summary(&self) -> Inner {
        self.inner.lock().clone()
    }
}

impl StatusDisplay for AppSession {
    fn set_status(&mut self, text: &str) {
        let mut inner = self.inner.lock();
        inner.cycles += 1;
        if text == WAITING_STATUS {
            inner.waiting_cycles += 1;
        }
        if inner.status == text {
            return;
        }
        inner.status = text.to_string();
        drop(inner);

        tracing::debug!(status = text, "status changed");
        if self.echo {
            let stdout = std::io::stdout();
            let tty = stdout.is_terminal();
            let mut out = stdout.lock();
            // a terminal gets one line redrawn in place
            let _ = if tty { write!(out, "\r\x1b[2K{text}") } else { writeln!(out, "{text}") };
            let _ = out.flush();
        }
    }
}
