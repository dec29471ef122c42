//! Diagnostic tool clients and output parsers
//!
//! Parsers here are pure functions over the text a tool printed; the clients only
//! add the command line and hand the bytes to a [`executor::CommandExecutor`].

pub mod executor;
pub mod lsblk;
pub mod nvme;
pub mod racadm;
pub mod types;

pub use executor::{CommandExecutor, SystemCommandExecutor};
pub use lsblk::{DriveDiscovery, LsblkDiscovery};
pub use nvme::SmartClient;
pub use racadm::RaidClient;
