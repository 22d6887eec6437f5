//! Application State

use std::sync::Arc;

use widget_core::WidgetConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Settings published to the browser bundle
    pub config: Arc<WidgetConfig>,
}

impl AppState {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
