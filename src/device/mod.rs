//! Block device discovery
//!
//! Parsers for the system listing tools, the partition model and the
//! [`DeviceFacts`] facade built on top of them.

pub mod cmdline;
pub mod error;
pub mod facts;
pub mod parsers;
pub mod partition;
pub mod path;

pub use error::DeviceError;
pub use facts::{DetectedPartition, DeviceFacts, PhysicalDevice, SystemDeviceFacts};
pub use partition::Partition;
