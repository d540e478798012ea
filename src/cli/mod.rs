//! Terminal front end: one module per command, rendering through `ui`.

pub mod advise;
pub mod history;
pub mod market;
pub mod setup;
pub mod ui;
