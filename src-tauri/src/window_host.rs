//! Native window host backed by a Tauri webview.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stitch_core::{CloseReason, WindowError, WindowHandle, WindowHost, WindowRequest};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder, WindowEvent};
use tracing::{debug, info};

/// Opens the backend address in a webview window.
///
/// The window's `Destroyed` event is reported as the close.
pub struct TauriWindowHost {
    app: AppHandle,
}

impl TauriWindowHost {
    pub const fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl WindowHost for TauriWindowHost {
    async fn open(&self, request: WindowRequest) -> Result<WindowHandle, WindowError> {
        let url = request
            .url
            .parse::<tauri::Url>()
            .map_err(|e| WindowError::Open(format!("{}: {e}", request.url)))?;

        let window = WebviewWindowBuilder::new(&self.app, &request.label, WebviewUrl::External(url))
            .title(&request.title)
            .inner_size(f64::from(request.width), f64::from(request.height))
            .build()
            .map_err(|e| WindowError::Open(e.to_string()))?;

        if request.devtools {
            window.open_devtools();
        }

        let (notifier, handle) = WindowHandle::channel(request.label.clone());
        // on_window_event takes an Fn; the notifier fires once
        let notifier = Arc::new(Mutex::new(Some(notifier)));
        let label = request.label.clone();
        window.on_window_event(move |event| {
            if let WindowEvent::Destroyed = event {
                debug!(%label, "Window destroyed");
                if let Some(notifier) = notifier.lock().ok().and_then(|mut n| n.take()) {
                    notifier.notify(CloseReason::User);
                }
            }
        });

        info!(label = %request.label, url = %request.url, "Webview window opened");
        Ok(handle)
    }

    async fn close(&self, label: &str) -> Result<(), WindowError> {
        if let Some(window) = self.app.get_webview_window(label) {
            window
                .destroy()
                .map_err(|e| WindowError::Close(e.to_string()))?;
        }
        Ok(())
    }
}
