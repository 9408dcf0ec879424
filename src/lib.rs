pub mod alerts;
pub mod charts;
pub mod config;
pub mod console;
pub mod controller;
pub mod csrf;
pub mod errors;
pub mod format;
pub mod models;
pub mod remote;
pub mod state;
pub mod ui;
pub mod validation;

pub use config::ConsoleConfig;
pub use console::Console;
pub use controller::{OptimisticActionController, OverlapPolicy, ToggleOutcome};
pub use errors::{ConsoleError, Failure};
pub use remote::{HttpRemote, Remote};
