use serde_json::{json, Value};

/// A Logitech Unifying Receiver as the kernel reports it.
pub(crate) fn device_record() -> Value {
    let endpoints = vec![
        json!({
            "length": 7,
            "descriptor_type": 5,
            "endpoint_address": 0x81,
            "attribute_bitmap": 3,
            "max_packet_size": 8,
            "polling_interval": 8
        }),
        json!({
            "length": 7,
            "descriptor_type": 5,
            "endpoint_address": 0x02,
            "attribute_bitmap": 2,
            "max_packet_size": 64,
            "polling_interval": 0
        }),
    ];
    let interface = json!({
        "length": 9,
        "descriptor_type": 4,
        "interface_number": 0,
        "alternate_setting": 0,
        "num_endpoints": 2,
        "interface_class_code": 3,
        "interface_sub_class_code": 1,
        "interface_protocol": 1,
        "interface_string_desc_index": 0,
        "endpoints": endpoints
    });
    let configuration = json!({
        "length": 9,
        "descriptor_type": 2,
        "total_length": 84,
        "number_of_interfaces": 3,
        "attributes_bitmap": 0xa0,
        "max_power": 49,
        "interfaces": [interface]
    });

    json!({
        "device_address": 3,
        "vendor_id": 0x046d,
        "product_id": 0xc52b,
        "length": 18,
        "descriptor_type": 1,
        "usb_spec_compliance_bcd": 0x0200,
        "device_class": 0,
        "device_sub_class": 0,
        "device_protocol": 0,
        "max_packet_size": 8,
        "device_release_bcd": 0x1211,
        "manufacturer_id_descriptor_index": 1,
        "product_string_descriptor_index": 2,
        "serial_number_descriptor_index": 0,
        "num_configurations": 1,
        "configurations": [configuration]
    })
}
