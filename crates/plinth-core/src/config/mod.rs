//! User configuration

pub mod rc;

pub use rc::{RcFile, RC_PATH_ENV};
