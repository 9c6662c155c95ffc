//! Panel configuration options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use devtools_panel::PanelOptions;
//!
//! let options = PanelOptions::new()
//!     .with_preserve_log()
//!     .with_command_timeout(Duration::from_secs(5));
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one bridge command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on in-flight bridge commands.
pub const DEFAULT_MAX_PENDING_COMMANDS: usize = 100;

// ============================================================================
// PanelOptions
// ============================================================================

/// Panel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOptions {
    /// Keep network records across top-frame navigations.
    pub preserve_log: bool,

    /// Maximum time to wait for one command response.
    pub command_timeout: Duration,

    /// Maximum number of commands in flight before `send` is rejected.
    pub max_pending_commands: usize,

    /// Fetch the page resource tree as part of attaching.
    pub load_resources_on_attach: bool,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PanelOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            preserve_log: false,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_pending_commands: DEFAULT_MAX_PENDING_COMMANDS,
            load_resources_on_attach: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PanelOptions {
    /// Keeps network records across navigations.
    #[inline]
    #[must_use]
    pub fn with_preserve_log(mut self) -> Self {
        self.preserve_log = true;
        self
    }

    /// Sets the per-command timeout.
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the in-flight command cap.
    #[inline]
    #[must_use]
    pub fn with_max_pending_commands(mut self, max: usize) -> Self {
        self.max_pending_commands = max;
        self
    }

    /// Skips the resource tree fetch on attach.
    #[inline]
    #[must_use]
    pub fn without_initial_resources(mut self) -> Self {
        self.load_resources_on_attach = false;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PanelOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the timeout or the pending cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout.is_zero() {
            return Err(Error::config("Command timeout must be greater than zero"));
        }
        if self.max_pending_commands == 0 {
            return Err(Error::config(
                "Maximum pending commands must be greater than zero",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
