//! Interactive terminal front end.

pub mod console;
pub mod listing;
pub mod menu;
pub mod session_runner;

pub use console::Console;
pub use menu::{App, MenuState};
