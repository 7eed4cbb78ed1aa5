//! Typed USB descriptor trees decoded from the kernel's JSON records, and the
//! `lsusb` style text rendering of them.

pub use descriptor::{
    decode_device, decode_source, BcdVersion, ConfigurationDescriptor, DeviceDescriptor,
    Direction, EndpointDescriptor, InterfaceDescriptor, TransferType,
};
pub use error::DescriptorError;
pub use report::{Reporter, UNKNOWN_DEVICE};

mod descriptor;
mod error;
mod report;

#[cfg(test)]
mod testing;
