//! In-memory index of the `usb.ids` database.
//!
//! Every lookup is best effort: unknown ids give `None`, and a database that
//! could not be loaded is simply empty.

use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use parser::{Line, LineParser, Record};
use tracing::{debug, trace};

pub use error::UsbIdsError;
pub use parser::ParseStats;

mod error;
mod parser;

#[derive(Debug, Default)]
struct Vendor {
    name: String,
    devices: AHashMap<u16, Device>,
}

#[derive(Debug, Default)]
struct Device {
    name: String,
    interfaces: AHashMap<u8, String>,
}

#[derive(Debug, Default)]
struct Class {
    name: String,
    subclasses: AHashMap<u8, Subclass>,
}

#[derive(Debug, Default)]
struct Subclass {
    name: String,
    protocols: AHashMap<u8, String>,
}

#[derive(Debug, Default)]
pub struct UsbIdDatabase {
    vendors: AHashMap<u16, Vendor>,
    classes: AHashMap<u8, Class>,
    stats: ParseStats,
}

impl UsbIdDatabase {
    /// Builds the database from the contents of a `usb.ids` file. Lines that
    /// can't be understood are skipped and counted in [`ParseStats::skipped`].
    pub fn parse(text: &str) -> Self {
        let mut database = Self::default();
        let mut parser = LineParser::new();

        for (number, line) in text.lines().enumerate() {
            match parser.feed(line) {
                Line::Ignored => {}
                Line::Record(record) => {
                    if !database.insert(record) {
                        trace!(line = number + 1, ?record, "duplicate usb.ids entry");
                        database.stats.skipped += 1;
                    }
                }
                Line::Malformed => {
                    trace!(line = number + 1, "skipping malformed usb.ids line");
                    database.stats.skipped += 1;
                }
            }
        }

        database
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, UsbIdsError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| UsbIdsError::Io {
            path: path.to_owned(),
            source,
        })?;

        // usb.ids has historically carried a few non UTF-8 names
        let database = Self::parse(&String::from_utf8_lossy(&bytes));
        debug!(
            path = %path.display(),
            vendors = database.stats.vendors,
            devices = database.stats.devices,
            classes = database.stats.classes,
            skipped = database.stats.skipped,
            "loaded usb.ids"
        );
        Ok(database)
    }

    /// Opens the first readable file out of `paths`.
    pub fn open_first<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, UsbIdsError> {
        let mut tried = Vec::new();
        for path in paths {
            match Self::open(&path) {
                Ok(database) => return Ok(database),
                Err(err) => {
                    trace!(%err, "usb.ids candidate unavailable");
                    tried.push(path.as_ref().to_owned());
                }
            }
        }
        Err(UsbIdsError::NotFound { tried })
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty() && self.classes.is_empty()
    }

    pub fn vendor_name(&self, vendor_id: u16) -> Option<&str> {
        self.vendors
            .get(&vendor_id)
            .map(|vendor| vendor.name.as_str())
    }

    pub fn device_name(&self, vendor_id: u16, product_id: u16) -> Option<&str> {
        self.vendors
            .get(&vendor_id)?
            .devices
            .get(&product_id)
            .map(|device| device.name.as_str())
    }

    pub fn interface_name(&self, vendor_id: u16, product_id: u16, interface: u8) -> Option<&str> {
        self.vendors
            .get(&vendor_id)?
            .devices
            .get(&product_id)?
            .interfaces
            .get(&interface)
            .map(String::as_str)
    }

    pub fn class_name(&self, class: u8) -> Option<&str> {
        self.classes.get(&class).map(|class| class.name.as_str())
    }

    pub fn subclass_name(&self, class: u8, subclass: u8) -> Option<&str> {
        self.classes
            .get(&class)?
            .subclasses
            .get(&subclass)
            .map(|subclass| subclass.name.as_str())
    }

    pub fn protocol_name(&self, class: u8, subclass: u8, protocol: u8) -> Option<&str> {
        self.classes
            .get(&class)?
            .subclasses
            .get(&subclass)?
            .protocols
            .get(&protocol)
            .map(String::as_str)
    }

    // Returns false when the key is already defined, the first definition wins.
    fn insert(&mut self, record: Record<'_>) -> bool {
        match record {
            Record::Vendor(vendor, name) => match self.vendors.entry(vendor) {
                Entry::Occupied(_) => false,
                Entry::Vacant(entry) => {
                    entry.insert(Vendor {
                        name: name.to_owned(),
                        ..Default::default()
                    });
                    self.stats.vendors += 1;
                    true
                }
            },
            Record::Device(vendor, product, name) => {
                let Some(vendor) = self.vendors.get_mut(&vendor) else {
                    return false;
                };
                match vendor.devices.entry(product) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(Device {
                            name: name.to_owned(),
                            ..Default::default()
                        });
                        self.stats.devices += 1;
                        true
                    }
                }
            }
            Record::Interface(vendor, product, interface, name) => {
                let Some(device) = self
                    .vendors
                    .get_mut(&vendor)
                    .and_then(|vendor| vendor.devices.get_mut(&product))
                else {
                    return false;
                };
                match device.interfaces.entry(interface) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(name.to_owned());
                        self.stats.interfaces += 1;
                        true
                    }
                }
            }
            Record::Class(class, name) => match self.classes.entry(class) {
                Entry::Occupied(_) => false,
                Entry::Vacant(entry) => {
                    entry.insert(Class {
                        name: name.to_owned(),
                        ..Default::default()
                    });
                    self.stats.classes += 1;
                    true
                }
            },
            Record::Subclass(class, subclass, name) => {
                let Some(class) = self.classes.get_mut(&class) else {
                    return false;
                };
                match class.subclasses.entry(subclass) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(Subclass {
                            name: name.to_owned(),
                            ..Default::default()
                        });
                        self.stats.subclasses += 1;
                        true
                    }
                }
            }
            Record::Protocol(class, subclass, protocol, name) => {
                let Some(subclass) = self
                    .classes
                    .get_mut(&class)
                    .and_then(|class| class.subclasses.get_mut(&subclass))
                else {
                    return false;
                };
                match subclass.protocols.entry(protocol) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(name.to_owned());
                        self.stats.protocols += 1;
                        true
                    }
                }
            }
        }
    }
}
