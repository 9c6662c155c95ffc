//! Builder pattern for panel configuration.
//!
//! # Example
//!
//! ```ignore
//! use devtools_panel::Panel;
//!
//! let panel = Panel::builder()
//!     .endpoint("ws://127.0.0.1:9222/devtools/page/1")
//!     .preserve_log()
//!     .build()
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::CommandBridge;

use super::core::Panel;
use super::options::PanelOptions;

// ============================================================================
// PanelBuilder
// ============================================================================

/// Where a built panel sends its commands.
#[derive(Clone)]
enum Target {
    Endpoint(String),
    Bridge(Arc<dyn CommandBridge>),
}

/// Builder for configuring a [`Panel`].
///
/// Use [`Panel::builder()`] to create a new builder.
#[derive(Clone, Default)]
pub struct PanelBuilder {
    options: PanelOptions,
    target: Option<Target>,
    attach: bool,
}

impl fmt::Debug for PanelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.target {
            Some(Target::Endpoint(url)) => url.as_str(),
            Some(Target::Bridge(_)) => "<bridge>",
            None => "<unset>",
        };
        f.debug_struct("PanelBuilder")
            .field("options", &self.options)
            .field("target", &target)
            .field("attach", &self.attach)
            .finish()
    }
}

impl PanelBuilder {
    /// Creates a builder with default options that attaches on build.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            attach: true,
            ..Self::default()
        }
    }

    /// Connects to a CDP WebSocket endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.target = Some(Target::Endpoint(url.into()));
        self
    }

    /// Uses an existing command bridge.
    ///
    /// Events must then be fed through [`Panel::dispatch`].
    #[inline]
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn CommandBridge>) -> Self {
        self.target = Some(Target::Bridge(bridge));
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: PanelOptions) -> Self {
        self.options = options;
        self
    }

    /// Keeps network records across navigations.
    #[inline]
    #[must_use]
    pub fn preserve_log(mut self) -> Self {
        self.options = self.options.with_preserve_log();
        self
    }

    /// Sets the per-command timeout.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_command_timeout(timeout);
        self
    }

    /// Builds without enabling any protocol domain.
    #[inline]
    #[must_use]
    pub fn detached(mut self) -> Self {
        self.attach = false;
        self
    }

    /// Builds the panel and, unless [`detached`](Self::detached), attaches it.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither endpoint nor bridge is set, or the
    ///   options are invalid
    /// - Connection failures for an endpoint
    /// - Failures from [`Panel::attach`]
    pub async fn build(self) -> Result<Panel> {
        self.options.validate()?;

        let target = self.target.ok_or_else(|| {
            Error::config(
                "A target is required. Use .endpoint() or .bridge() to set it.\n\
                 Example: Panel::builder().endpoint(\"ws://127.0.0.1:9222/devtools/page/1\")",
            )
        })?;

        let panel = match target {
            Target::Endpoint(url) => Panel::connect(&url, self.options).await?,
            Target::Bridge(bridge) => Panel::new(bridge, self.options)?,
        };

        if self.attach {
            panel.attach().await?;
        }
        Ok(panel)
    }
}

// ============================================================================
// Tests
// ============================================================================
