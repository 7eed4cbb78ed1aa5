use usb_ids::UsbIdDatabase;

use crate::descriptor::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};

/// Shown in place of a product name that isn't in the database. Unknown
/// vendors are left blank instead.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";

struct Section {
    name: &'static str,
    content: Vec<(&'static str, String, Option<String>)>,
}

impl Section {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            content: Vec::new(),
        }
    }

    fn add(&mut self, name: &'static str, value: String, comment: Option<String>) {
        self.content.push((name, value, comment));
    }

    fn into_lines(self, indent_level: usize) -> Vec<String> {
        let indent = "  ".repeat(indent_level);

        let (first_column_width, second_column_width) = self
            .content
            .iter()
            .map(|(name, value, _)| (name.len(), value.len()))
            .reduce(|a, b| (a.0.max(b.0), a.1.max(b.1)))
            .unwrap_or((0, 0));

        let mut lines = Vec::with_capacity(self.content.len() + 1);
        lines.push(format!("{indent}{}", self.name));
        for (name, value, comment) in self.content {
            let line = format!(
                "{indent}  {:<first_column_width$}   {:>second_column_width$} {}",
                name,
                value,
                comment.unwrap_or_default()
            );
            lines.push(line.trim_end().to_owned());
        }
        lines
    }
}

/// Renders devices, looking names up in a [`UsbIdDatabase`].
pub struct Reporter<'db> {
    database: &'db UsbIdDatabase,
    verbose: bool,
}

impl<'db> Reporter<'db> {
    pub fn new(database: &'db UsbIdDatabase, verbose: bool) -> Self {
        Self { database, verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// The summary line, followed by the whole descriptor tree in verbose mode.
    pub fn render(&self, device: &DeviceDescriptor) -> Vec<String> {
        let mut lines = vec![self.summary(device)];
        if !self.verbose {
            return lines;
        }

        lines.extend(self.device_section(device).into_lines(0));
        for configuration in &device.configurations {
            lines.extend(configuration_section(configuration).into_lines(1));
            for interface in &configuration.interfaces {
                lines.extend(self.interface_section(device, interface).into_lines(2));
                for endpoint in &interface.endpoints {
                    lines.extend(endpoint_section(endpoint).into_lines(3));
                }
            }
        }
        lines
    }

    pub fn summary(&self, device: &DeviceDescriptor) -> String {
        format!(
            "Device {}: ID {:04x}:{:04x} {} {}",
            device.device_address,
            device.vendor_id,
            device.product_id,
            self.vendor_name(device),
            self.device_name(device),
        )
    }

    fn vendor_name(&self, device: &DeviceDescriptor) -> &'db str {
        self.database
            .vendor_name(device.vendor_id)
            .unwrap_or_default()
    }

    fn device_name(&self, device: &DeviceDescriptor) -> &'db str {
        self.database
            .device_name(device.vendor_id, device.product_id)
            .unwrap_or(UNKNOWN_DEVICE)
    }

    // The protocol lookup is attempted even when the subclass has no name.
    fn class_names(&self, class: u8, subclass: u8, protocol: u8) -> [Option<String>; 3] {
        [
            self.database.class_name(class).map(str::to_owned),
            self.database
                .subclass_name(class, subclass)
                .map(str::to_owned),
            self.database
                .protocol_name(class, subclass, protocol)
                .map(str::to_owned),
        ]
    }

    fn device_section(&self, device: &DeviceDescriptor) -> Section {
        let [class_name, subclass_name, protocol_name] = self.class_names(
            device.device_class,
            device.device_sub_class,
            device.device_protocol,
        );

        let mut section = Section::new("Device Descriptor");
        section.add("bLength", device.length.to_string(), None);
        section.add("bDescriptorType", device.descriptor_type.to_string(), None);
        section.add("bcdUSB", device.usb_version().to_string(), None);
        section.add("bDeviceClass", device.device_class.to_string(), class_name);
        section.add(
            "bDeviceSubClass",
            device.device_sub_class.to_string(),
            subclass_name,
        );
        section.add(
            "bDeviceProtocol",
            device.device_protocol.to_string(),
            protocol_name,
        );
        section.add("bMaxPacketSize", device.max_packet_size.to_string(), None);
        section.add(
            "idVendor",
            format!("{:#06x}", device.vendor_id),
            Some(self.vendor_name(device).to_owned()),
        );
        section.add(
            "idProduct",
            format!("{:#06x}", device.product_id),
            Some(self.device_name(device).to_owned()),
        );
        section.add("bcdDevice", device.device_version().to_string(), None);
        section.add(
            "iManufacturer",
            device.manufacturer_id_descriptor_index.to_string(),
            None,
        );
        section.add(
            "iProduct",
            device.product_string_descriptor_index.to_string(),
            None,
        );
        section.add(
            "iSerial",
            device.serial_number_descriptor_index.to_string(),
            None,
        );
        section.add(
            "bNumConfigurations",
            device.num_configurations.to_string(),
            None,
        );
        section
    }

    fn interface_section(
        &self,
        device: &DeviceDescriptor,
        interface: &InterfaceDescriptor,
    ) -> Section {
        let [class_name, subclass_name, protocol_name] = self.class_names(
            interface.interface_class_code,
            interface.interface_sub_class_code,
            interface.interface_protocol,
        );
        let interface_name = self
            .database
            .interface_name(
                device.vendor_id,
                device.product_id,
                interface.interface_number,
            )
            .map(str::to_owned);

        let mut section = Section::new("Interface Descriptor:");
        section.add("bLength", interface.length.to_string(), None);
        section.add(
            "bDescriptorType",
            interface.descriptor_type.to_string(),
            None,
        );
        section.add(
            "bInterfaceNumber",
            interface.interface_number.to_string(),
            interface_name,
        );
        section.add(
            "bAlternateSetting",
            interface.alternate_setting.to_string(),
            None,
        );
        section.add("bNumEndpoints", interface.num_endpoints.to_string(), None);
        section.add(
            "bInterfaceClass",
            interface.interface_class_code.to_string(),
            class_name,
        );
        section.add(
            "bInterfaceSubClass",
            interface.interface_sub_class_code.to_string(),
            subclass_name,
        );
        section.add(
            "bInterfaceProtocol",
            interface.interface_protocol.to_string(),
            protocol_name,
        );
        section.add(
            "iInterface",
            interface.interface_string_desc_index.to_string(),
            None,
        );
        section
    }
}

fn configuration_section(configuration: &ConfigurationDescriptor) -> Section {
    let mut attributes = vec![if configuration.self_powered() {
        "Self Powered"
    } else {
        "Bus Powered"
    }];
    if configuration.remote_wakeup() {
        attributes.push("Remote Wakeup");
    }

    let mut section = Section::new("Configuration Descriptor:");
    section.add("bLength", configuration.length.to_string(), None);
    section.add(
        "bDescriptorType",
        configuration.descriptor_type.to_string(),
        None,
    );
    section.add(
        "wTotalLength",
        configuration.total_length.to_string(),
        None,
    );
    section.add(
        "bNumInterfaces",
        configuration.number_of_interfaces.to_string(),
        None,
    );
    section.add(
        "bmAttributes",
        format!("{:#04x}", configuration.attributes_bitmap),
        Some(attributes.join(", ")),
    );
    section.add(
        "MaxPower",
        format!("{}mA", configuration.max_power_milliamps()),
        None,
    );
    section
}

fn endpoint_section(endpoint: &EndpointDescriptor) -> Section {
    let mut section = Section::new("Endpoint Descriptor:");
    section.add("bLength", endpoint.length.to_string(), None);
    section.add("bDescriptorType", endpoint.descriptor_type.to_string(), None);
    section.add(
        "bEndpointAddress",
        format!("{:#04x}", endpoint.endpoint_address),
        Some(format!("EP {} {}", endpoint.number(), endpoint.direction())),
    );
    section.add(
        "bmAttributes",
        format!("{:#04x}", endpoint.attribute_bitmap),
        Some(endpoint.transfer_type().to_string()),
    );
    section.add(
        "wMaxPacketSize",
        format!("{:#06x}", endpoint.max_packet_size),
        None,
    );
    section.add("bInterval", endpoint.polling_interval.to_string(), None);
    section
}
