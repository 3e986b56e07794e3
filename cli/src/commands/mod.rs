//! Action handlers, one module per terminal action.

pub mod password;
pub mod quit;
pub mod save;
pub mod service;
pub mod start;
