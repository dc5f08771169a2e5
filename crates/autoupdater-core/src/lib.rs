//! Detects new service builds dropped into a directory and installs them
//! through a fixed stop/replace/start sequence.

pub mod apply;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod runner;
pub mod scan;
pub mod sleep;
pub mod step;
pub mod watcher;

pub use error::{ErrorKind, Result, UpdateError};
