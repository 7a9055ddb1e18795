//! Terminal window host.
//!
//! Stands in for a native window: announces the backend address, optionally
//! opens it in the system browser and treats Enter (or stdin EOF) as the
//! window being closed.

use std::sync::Mutex;

use async_trait::async_trait;
use stitch_core::{CloseReason, WindowError, WindowHandle, WindowHost, WindowRequest};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Presents the backend in the terminal and, optionally, the browser.
pub struct TerminalWindowHost {
    open_browser: bool,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalWindowHost {
    pub const fn new(open_browser: bool) -> Self {
        Self {
            open_browser,
            watcher: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WindowHost for TerminalWindowHost {
    async fn open(&self, request: WindowRequest) -> Result<WindowHandle, WindowError> {
        let (notifier, handle) = WindowHandle::channel(request.label.clone());

        println!("{} is ready at {}", request.title, request.url);
        println!("Press Enter to stop.");

        if self.open_browser {
            if let Err(e) = open::that(&request.url) {
                // The address is printed; a missing browser is not fatal
                warn!(url = %request.url, error = %e, "Failed to open browser");
            }
        }

        let watcher = tokio::spawn(async move {
            let reason = wait_for_dismiss(BufReader::new(tokio::io::stdin())).await;
            notifier.notify(reason);
        });
        if let Ok(mut slot) = self.watcher.lock() {
            *slot = Some(watcher);
        }

        info!(label = %request.label, url = %request.url, "Window presented in terminal");
        Ok(handle)
    }

    async fn close(&self, label: &str) -> Result<(), WindowError> {
        let watcher = self
            .watcher
            .lock()
            .map_err(|e| WindowError::Close(e.to_string()))?
            .take();
        if let Some(watcher) = watcher {
            debug!(%label, "Dismissing terminal window");
            watcher.abort();
        }
        Ok(())
    }
}

/// Resolve once the operator presses Enter or input ends.
async fn wait_for_dismiss<R: AsyncBufRead + Unpin>(mut input: R) -> CloseReason {
    let mut line = String::new();
    match input.read_line(&mut line).await {
        Ok(_) => CloseReason::User,
        Err(e) => {
            debug!(error = %e, "stdin closed with error");
            CloseReason::HostGone
        }
    }
}
