use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use crate::error::DescriptorError;

/// A device and everything below it, as exposed by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceDescriptor {
    pub device_address: u32,
    pub vendor_id: u16,
    pub product_id: u16,
    pub length: u8,
    pub descriptor_type: u8,
    pub usb_spec_compliance_bcd: u16,
    pub device_class: u8,
    pub device_sub_class: u8,
    pub device_protocol: u8,
    pub max_packet_size: u8,
    pub device_release_bcd: u16,
    pub manufacturer_id_descriptor_index: u8,
    pub product_string_descriptor_index: u8,
    pub serial_number_descriptor_index: u8,
    pub num_configurations: u8,
    #[serde(default)]
    pub configurations: Vec<ConfigurationDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigurationDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub number_of_interfaces: u8,
    pub attributes_bitmap: u8,
    /// In units of 2mA.
    pub max_power: u8,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class_code: u8,
    pub interface_sub_class_code: u8,
    pub interface_protocol: u8,
    pub interface_string_desc_index: u8,
    #[serde(default)]
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub endpoint_address: u8,
    pub attribute_bitmap: u8,
    pub max_packet_size: u16,
    pub polling_interval: u8,
}

/// A binary coded decimal version number, `0x0210` is USB 2.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcdVersion(pub u16);

impl BcdVersion {
    pub fn major(self) -> u8 {
        (((self.0 >> 12) & 0xf) * 10 + ((self.0 >> 8) & 0xf)) as u8
    }

    pub fn minor(self) -> u8 {
        ((self.0 >> 4) & 0xf) as u8
    }

    pub fn sub_minor(self) -> u8 {
        (self.0 & 0xf) as u8
    }
}

impl fmt::Display for BcdVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}{}", self.major(), self.minor(), self.sub_minor())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransferType::Control => write!(f, "Control"),
            TransferType::Isochronous => write!(f, "Isochronous"),
            TransferType::Bulk => write!(f, "Bulk"),
            TransferType::Interrupt => write!(f, "Interrupt"),
        }
    }
}

impl DeviceDescriptor {
    pub fn usb_version(&self) -> BcdVersion {
        BcdVersion(self.usb_spec_compliance_bcd)
    }

    pub fn device_version(&self) -> BcdVersion {
        BcdVersion(self.device_release_bcd)
    }
}

impl ConfigurationDescriptor {
    pub fn self_powered(&self) -> bool {
        self.attributes_bitmap & 0x40 != 0
    }

    pub fn remote_wakeup(&self) -> bool {
        self.attributes_bitmap & 0x20 != 0
    }

    pub fn max_power_milliamps(&self) -> u32 {
        u32::from(self.max_power) * 2
    }
}

impl EndpointDescriptor {
    pub fn number(&self) -> u8 {
        self.endpoint_address & 0x0f
    }

    pub fn direction(&self) -> Direction {
        if self.endpoint_address & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn transfer_type(&self) -> TransferType {
        match self.attribute_bitmap & 0x03 {
            0 => TransferType::Control,
            1 => TransferType::Isochronous,
            2 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// Decodes a single device record. A missing field, a field of the wrong
/// type and a value that doesn't fit the descriptor field all fail the same
/// way.
pub fn decode_device(record: Value) -> Result<DeviceDescriptor, DescriptorError> {
    Ok(serde_json::from_value(record)?)
}

/// Decodes the contents of one device source. Each record is decoded on its
/// own so one bad device doesn't hide the others; only text that isn't a JSON
/// array (or a lone object) fails as a whole.
pub fn decode_source(
    text: &str,
) -> Result<Vec<Result<DeviceDescriptor, DescriptorError>>, DescriptorError> {
    let records = match serde_json::from_str::<Value>(text).map_err(DescriptorError::Syntax)? {
        Value::Array(records) => records,
        record @ Value::Object(_) => vec![record],
        Value::Null => return Err(DescriptorError::UnexpectedShape("null")),
        Value::Bool(_) => return Err(DescriptorError::UnexpectedShape("a boolean")),
        Value::Number(_) => return Err(DescriptorError::UnexpectedShape("a number")),
        Value::String(_) => return Err(DescriptorError::UnexpectedShape("a string")),
    };

    trace!(records = records.len(), "decoding device source");
    Ok(records.into_iter().map(decode_device).collect())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::testing::device_record;

    #[test]
    fn test_decode_device() -> anyhow::Result<()> {
        let device = decode_device(device_record())?;

        assert_eq!(device.device_address, 3);
        assert_eq!(device.vendor_id, 0x046d);
        assert_eq!(device.product_id, 0xc52b);
        assert_eq!(device.configurations.len(), 1);

        let configuration = &device.configurations[0];
        assert_eq!(configuration.total_length, 84);
        assert_eq!(configuration.interfaces.len(), 1);

        let endpoints = &configuration.interfaces[0].endpoints;
        let addresses: Vec<u8> = endpoints.iter().map(|e| e.endpoint_address).collect();
        assert_eq!(addresses, vec![0x81, 0x02]);
        Ok(())
    }

    #[test]
    fn test_missing_field_fails() {
        let mut record = device_record();
        record.as_object_mut().unwrap().remove("vendor_id");

        let err = decode_device(record).unwrap_err();
        assert!(matches!(err, DescriptorError::Record(_)));
        assert!(err.to_string().contains("vendor_id"));
    }

    #[test]
    fn test_wrong_type_and_out_of_range_fail() {
        let mut record = device_record();
        record["product_id"] = json!("c52b");
        assert!(decode_device(record).is_err());

        let mut record = device_record();
        record["vendor_id"] = json!(0x1_0000);
        assert!(decode_device(record).is_err());

        let mut record = device_record();
        record["configurations"][0]["interfaces"][0]["endpoints"][0]["endpoint_address"] =
            json!(-1);
        assert!(decode_device(record).is_err());
    }

    #[test]
    fn test_missing_children_default_to_empty() -> anyhow::Result<()> {
        let mut record = device_record();
        record.as_object_mut().unwrap().remove("configurations");

        let device = decode_device(record)?;
        assert!(device.configurations.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_source_keeps_good_records() -> anyhow::Result<()> {
        let mut broken = device_record();
        broken.as_object_mut().unwrap().remove("device_address");
        let text = Value::Array(vec![device_record(), broken, device_record()]).to_string();

        let results = decode_source(&text)?;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        Ok(())
    }

    #[test]
    fn test_decode_source_accepts_single_object() -> anyhow::Result<()> {
        let results = decode_source(&device_record().to_string())?;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        Ok(())
    }

    #[test]
    fn test_decode_source_rejects_non_records() {
        assert!(matches!(
            decode_source("{ not json"),
            Err(DescriptorError::Syntax(_))
        ));
        assert!(matches!(
            decode_source("42"),
            Err(DescriptorError::UnexpectedShape("a number"))
        ));
    }

    #[test]
    fn test_bcd_version() {
        assert_eq!(BcdVersion(0x0210).to_string(), "2.10");
        assert_eq!(BcdVersion(0x0110).to_string(), "1.10");
        assert_eq!(BcdVersion(0x0200).to_string(), "2.00");
        assert_eq!(BcdVersion(0x1211).to_string(), "12.11");
    }

    #[test]
    fn test_endpoint_address() {
        let mut endpoint = EndpointDescriptor {
            length: 7,
            descriptor_type: 5,
            endpoint_address: 0x81,
            attribute_bitmap: 0x03,
            max_packet_size: 8,
            polling_interval: 10,
        };
        assert_eq!(endpoint.number(), 1);
        assert_eq!(endpoint.direction(), Direction::In);
        assert_eq!(endpoint.transfer_type(), TransferType::Interrupt);

        endpoint.endpoint_address = 0x02;
        endpoint.attribute_bitmap = 0x02;
        assert_eq!(endpoint.number(), 2);
        assert_eq!(endpoint.direction(), Direction::Out);
        assert_eq!(endpoint.transfer_type(), TransferType::Bulk);
    }

    #[test]
    fn test_configuration_attributes() {
        let configuration = ConfigurationDescriptor {
            length: 9,
            descriptor_type: 2,
            total_length: 34,
            number_of_interfaces: 1,
            attributes_bitmap: 0xe0,
            max_power: 50,
            interfaces: Vec::new(),
        };
        assert!(configuration.self_powered());
        assert!(configuration.remote_wakeup());
        assert_eq!(configuration.max_power_milliamps(), 100);
    }
}
