//! Observability - debug log routing.

mod logging;

pub use logging::{
    install, installed_destination, log_destination, LogDestination, LogLocation,
};
