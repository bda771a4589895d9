//! `prd-driver`: subprocess bridge to an external AI assistant.
//!
//! A driver is any program that takes a prompt on stdin, relays it to an
//! assistant (an editor automation script, a CLI client, ...) and returns the
//! assistant's answer. The answer is read from the driver's stdout, or from a
//! separate transcript command such as `pbpaste` when the driver leaves it on
//! the clipboard.
//!
//! ```text
//! DriverConfig
//!     │
//!     ▼
//! DriverProcess   ← spawns the driver, feeds the prompt on stdin,
//!     │              drains stderr in the background
//!     ▼
//! run / run_blocking  ← timeout (wait + grace), kill on expiry,
//!                       optional transcript command
//! ```

pub mod error;
pub mod runner;
pub mod types;

pub(crate) mod process;

pub use error::DriverError;
pub use runner::{run, run_blocking};
pub use types::{DriverConfig, DriverOutput};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, DriverError>;
