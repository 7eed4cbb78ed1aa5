//! Line classifier for the `usb.ids` format.
//!
//! The file is a flat list of lines whose nesting is given by leading tabs:
//!
//! ```text
//! vvvv  vendor name
//! <tab>pppp  product name
//! <tab><tab>ii  interface name
//! C cc  class name
//! <tab>ss  subclass name
//! <tab><tab>pp  protocol name
//! ```
//!
//! Other top-level sections (`AT`, `HID`, `R`, `L`, ...) are recognised only
//! so that their nested lines can be ignored.

/// One named entry, with the full key of the block it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Record<'a> {
    Vendor(u16, &'a str),
    Device(u16, u16, &'a str),
    Interface(u16, u16, u8, &'a str),
    Class(u8, &'a str),
    Subclass(u8, u8, &'a str),
    Protocol(u8, u8, u8, &'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    /// Blank lines, comments and the contents of sections we don't index.
    Ignored,
    Record(Record<'a>),
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No block opened yet, nested lines have nothing to attach to.
    Start,
    Vendor { vendor: u16, product: Option<u16> },
    Class { class: u8, subclass: Option<u8> },
    /// Inside a section we don't index.
    Other,
}

/// Counts gathered while building a database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    pub vendors: usize,
    pub devices: usize,
    pub interfaces: usize,
    pub classes: usize,
    pub subclasses: usize,
    pub protocols: usize,
    /// Malformed lines plus duplicate definitions.
    pub skipped: usize,
}

pub(crate) struct LineParser {
    state: State,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            state: State::Start,
        }
    }

    pub fn feed<'a>(&mut self, line: &'a str) -> Line<'a> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Line::Ignored;
        }

        let body = line.trim_start_matches('\t');
        let depth = line.len() - body.len();

        match depth {
            0 => self.top_level(body),
            1 => self.nested(body),
            2 => self.doubly_nested(body),
            _ => Line::Malformed,
        }
    }

    fn top_level<'a>(&mut self, body: &'a str) -> Line<'a> {
        if let Some(class) = body.strip_prefix("C ") {
            return match parse_u8(class) {
                Some((class, name)) => {
                    self.state = State::Class {
                        class,
                        subclass: None,
                    };
                    Line::Record(Record::Class(class, name))
                }
                None => {
                    self.state = State::Other;
                    Line::Malformed
                }
            };
        }

        if let Some((vendor, name)) = parse_u16(body) {
            self.state = State::Vendor {
                vendor,
                product: None,
            };
            return Line::Record(Record::Vendor(vendor, name));
        }

        self.state = State::Other;
        if is_section_marker(body) {
            Line::Ignored
        } else {
            Line::Malformed
        }
    }

    fn nested<'a>(&mut self, body: &'a str) -> Line<'a> {
        match &mut self.state {
            State::Vendor { vendor, product } => {
                *product = None;
                let Some((id, name)) = parse_u16(body) else {
                    return Line::Malformed;
                };
                *product = Some(id);
                Line::Record(Record::Device(*vendor, id, name))
            }
            State::Class { class, subclass } => {
                *subclass = None;
                let Some((id, name)) = parse_u8(body) else {
                    return Line::Malformed;
                };
                *subclass = Some(id);
                Line::Record(Record::Subclass(*class, id, name))
            }
            State::Other => Line::Ignored,
            State::Start => Line::Malformed,
        }
    }

    fn doubly_nested<'a>(&mut self, body: &'a str) -> Line<'a> {
        match self.state {
            State::Vendor {
                vendor,
                product: Some(product),
            } => match parse_u8(body) {
                Some((interface, name)) => {
                    Line::Record(Record::Interface(vendor, product, interface, name))
                }
                None => Line::Malformed,
            },
            State::Class {
                class,
                subclass: Some(subclass),
            } => match parse_u8(body) {
                Some((protocol, name)) => {
                    Line::Record(Record::Protocol(class, subclass, protocol, name))
                }
                None => Line::Malformed,
            },
            State::Other => Line::Ignored,
            _ => Line::Malformed,
        }
    }
}

/// Splits `<digits hex digits><whitespace><name>`.
fn parse_id(body: &str, digits: usize) -> Option<(u16, &str)> {
    let id = body.get(..digits)?;
    if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let rest = &body[digits..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let name = rest.trim();
    if name.is_empty() {
        return None;
    }

    Some((u16::from_str_radix(id, 16).ok()?, name))
}

fn parse_u16(body: &str) -> Option<(u16, &str)> {
    parse_id(body, 4)
}

fn parse_u8(body: &str) -> Option<(u8, &str)> {
    let (id, name) = parse_id(body, 2)?;
    Some((u8::try_from(id).ok()?, name))
}

// e.g. "AT 0100  USB Undefined", "HID 21  HID", "L 0001  Arabic"
fn is_section_marker(body: &str) -> bool {
    body.split_whitespace()
        .next()
        .is_some_and(|token| token.bytes().all(|b| b.is_ascii_uppercase()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn feed_all<'a>(lines: &[&'a str]) -> Vec<Line<'a>> {
        let mut parser = LineParser::new();
        lines.iter().map(|&line| parser.feed(line)).collect()
    }

    #[test]
    fn test_vendor_block() {
        let lines = feed_all(&[
            "046d  Logitech, Inc.",
            "\tc52b  Unifying Receiver",
            "\t\t02  Receiver Interface",
        ]);

        assert_eq!(
            lines,
            vec![
                Line::Record(Record::Vendor(0x046d, "Logitech, Inc.")),
                Line::Record(Record::Device(0x046d, 0xc52b, "Unifying Receiver")),
                Line::Record(Record::Interface(0x046d, 0xc52b, 0x02, "Receiver Interface")),
            ]
        );
    }

    #[test]
    fn test_class_block() {
        let lines = feed_all(&[
            "C 03  Human Interface Device",
            "\t01  Boot Interface Subclass",
            "\t\t02  Mouse",
        ]);

        assert_eq!(
            lines,
            vec![
                Line::Record(Record::Class(0x03, "Human Interface Device")),
                Line::Record(Record::Subclass(0x03, 0x01, "Boot Interface Subclass")),
                Line::Record(Record::Protocol(0x03, 0x01, 0x02, "Mouse")),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_keep_context() {
        let lines = feed_all(&[
            "1d6b  Linux Foundation",
            "",
            "# root hubs",
            "\t0002  2.0 root hub",
        ]);

        assert_eq!(lines[1], Line::Ignored);
        assert_eq!(lines[2], Line::Ignored);
        assert_eq!(
            lines[3],
            Line::Record(Record::Device(0x1d6b, 0x0002, "2.0 root hub"))
        );
    }

    #[test]
    fn test_other_sections_are_ignored() {
        let lines = feed_all(&[
            "AT 0100  USB Undefined",
            "\t0101  USB Streaming",
            "L 0001  Arabic",
            "\t01  Saudi Arabia",
            "HID 21  HID",
        ]);

        assert!(lines.iter().all(|line| *line == Line::Ignored));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let lines = feed_all(&[
            "046d  Logitech, Inc.",
            "\tzz2b  Broken product",
            "\t\t00  Orphan interface",
            "\tc52b  Unifying Receiver",
            "\tc52c",
            "\t\t\t00  Too deep",
        ]);

        assert_eq!(lines[1], Line::Malformed);
        // the product above failed, so the interface has no parent
        assert_eq!(lines[2], Line::Malformed);
        assert_eq!(
            lines[3],
            Line::Record(Record::Device(0x046d, 0xc52b, "Unifying Receiver"))
        );
        assert_eq!(lines[4], Line::Malformed);
        assert_eq!(lines[5], Line::Malformed);
    }

    #[test]
    fn test_garbage_top_level_line_closes_block() {
        let lines = feed_all(&["046d  Logitech, Inc.", "what is this", "\tc52b  Receiver"]);

        assert_eq!(lines[1], Line::Malformed);
        assert_eq!(lines[2], Line::Ignored);
    }

    #[test]
    fn test_nested_line_before_any_block() {
        let lines = feed_all(&["\t0001  Nobody's product"]);
        assert_eq!(lines, vec![Line::Malformed]);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_u16("04B4  Cypress"), Some((0x04b4, "Cypress")));
        assert_eq!(parse_u16("04b4\tCypress\r"), Some((0x04b4, "Cypress")));
        assert_eq!(parse_u16("04b4Cypress"), None);
        assert_eq!(parse_u16("04b"), None);
        assert_eq!(parse_u8("ff  Vendor Specific"), Some((0xff, "Vendor Specific")));
        assert_eq!(parse_u8("fff  Too long"), None);
        assert_eq!(parse_u8("é1  Not hex"), None);
    }
}
