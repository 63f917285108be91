//! The object dictionary described by an EDS file.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use log::debug;

use crate::error::{EdsError, Result};
use crate::ini::{parse_number, IniFile, Section};

/// Node id assumed when the description does not override it.
pub const DEFAULT_NODE_ID: u8 = 5;

/// Bit length of a CANopen basic data type. Strings and unknown types are 0.
pub fn data_type_bits(data_type: u16) -> u16 {
    match data_type {
        0x0001 => 1,                     // BOOLEAN
        0x0002 | 0x0005 => 8,            // INTEGER8, UNSIGNED8
        0x0003 | 0x0006 => 16,           // INTEGER16, UNSIGNED16
        0x0004 | 0x0007 | 0x0008 => 32,  // INTEGER32, UNSIGNED32, REAL32
        0x0010 | 0x001B => 64,           // INTEGER64, UNSIGNED64
        _ => 0,
    }
}

/// `[DeviceInfo]` identity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_name: String,
    pub product_name: String,
    pub vendor_number: u32,
    pub product_number: u32,
    pub revision: String,
    pub order_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubObject {
    pub sub_index: u8,
    pub name: String,
    pub data_type: u16,
    pub access: String,
    pub pdo_mapping: bool,
    pub default_value: Option<String>,
    pub bit_length: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictObject {
    pub index: u16,
    pub name: String,
    /// 7 = VAR, 8 = ARRAY, 9 = RECORD.
    pub object_type: u8,
    pub data_type: u16,
    pub access: String,
    pub pdo_mapping: bool,
    pub default_value: Option<String>,
    pub subs: BTreeMap<u8, SubObject>,
}

impl DictObject {
    /// A sub-object's default value read as a number.
    pub fn sub_value(&self, sub_index: u8) -> Option<u64> {
        self.subs
            .get(&sub_index)
            .and_then(|s| s.default_value.as_deref())
            .and_then(|v| parse_number(v, DEFAULT_NODE_ID))
    }
}

/// A parsed EDS file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdsDevice {
    pub info: DeviceInfo,
    pub objects: BTreeMap<u16, DictObject>,
}

impl EdsDevice {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EdsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let ini = IniFile::parse(text)?;
        let mut device = EdsDevice::default();

        if let Some(info) = ini.section("DeviceInfo") {
            device.info = DeviceInfo {
                vendor_name: info.get("VendorName").unwrap_or_default().to_string(),
                product_name: info.get("ProductName").unwrap_or_default().to_string(),
                vendor_number: number(info, "VendorNumber", 0)? as u32,
                product_number: number(info, "ProductNumber", 0)? as u32,
                revision: info.get("RevisionNumber").unwrap_or("0").to_string(),
                order_code: info.get("OrderCode").unwrap_or_default().to_string(),
            };
        }

        // Objects first, so sub-object sections always find their parent.
        for section in ini.sections() {
            if let Some((index, None)) = section_address(&section.name) {
                let object = DictObject {
                    index,
                    name: section
                        .get("ParameterName")
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Object_{index:04X}")),
                    object_type: number(section, "ObjectType", 7)? as u8,
                    data_type: number(section, "DataType", 0)? as u16,
                    access: section.get("AccessType").unwrap_or("rw").to_string(),
                    pdo_mapping: section.get("PDOMapping") == Some("1"),
                    default_value: section.get("DefaultValue").map(str::to_string),
                    subs: BTreeMap::new(),
                };
                device.objects.insert(index, object);
            }
        }
        for section in ini.sections() {
            if let Some((index, Some(sub_index))) = section_address(&section.name) {
                let Some(parent) = device.objects.get_mut(&index) else {
                    debug!("sub-object [{}] has no parent object, skipped", section.name);
                    continue;
                };
                let data_type = number(section, "DataType", 0)? as u16;
                parent.subs.insert(
                    sub_index,
                    SubObject {
                        sub_index,
                        name: section
                            .get("ParameterName")
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("SubIndex_{sub_index}")),
                        data_type,
                        access: section.get("AccessType").unwrap_or("rw").to_string(),
                        pdo_mapping: section.get("PDOMapping") == Some("1"),
                        default_value: section.get("DefaultValue").map(str::to_string),
                        bit_length: data_type_bits(data_type),
                    },
                );
            }
        }

        debug!(
            "EDS '{}': {} object(s)",
            device.info.product_name,
            device.objects.len()
        );
        Ok(device)
    }

    /// Display name of a mapped object: the sub-object's name if it exists,
    /// otherwise the object's.
    pub fn mapped_name(&self, index: u16, sub_index: u8) -> Option<&str> {
        let object = self.objects.get(&index)?;
        Some(
            object
                .subs
                .get(&sub_index)
                .map(|s| s.name.as_str())
                .unwrap_or(&object.name),
        )
    }

    /// The `Index / Name / Type / PDO` table, sorted by index then sub-index.
    pub fn object_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<7} {:<40} {:<8} PDO", "Index", "Name", "Type");
        let _ = writeln!(out, "{}", "-".repeat(60));
        for (index, object) in &self.objects {
            let _ = writeln!(
                out,
                "0x{index:04X}  {:<40} {:<8} {}",
                object.name,
                object.object_type,
                yes_no(object.pdo_mapping)
            );
            for (sub_index, sub) in &object.subs {
                let _ = writeln!(
                    out,
                    "  [{sub_index}]  {:<38} {:<8} {}",
                    sub.name,
                    sub.data_type,
                    yes_no(sub.pdo_mapping)
                );
            }
        }
        out
    }
}

fn yes_no(flag: bool) -> char {
    if flag {
        'Y'
    } else {
        'N'
    }
}

fn number(section: &Section, key: &str, default: u64) -> Result<u64> {
    match section.get(key) {
        None | Some("") => Ok(default),
        Some(value) => parse_number(value, DEFAULT_NODE_ID).ok_or_else(|| EdsError::InvalidNumber {
            section: section.name.clone(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Read `1A00`, `0x1A00`, `1A00sub1` or `0x1A00sub0x1` as (index, sub-index).
fn section_address(name: &str) -> Option<(u16, Option<u8>)> {
    let lower = name.to_ascii_lowercase();
    match lower.split_once("sub") {
        Some((index, sub)) => {
            let index = parse_hex(index.trim(), false)?;
            let sub = sub.trim();
            let sub_index = if let Some(hex) = sub.strip_prefix("0x") {
                u8::from_str_radix(hex, 16).ok()?
            } else if !sub.is_empty() && sub.bytes().all(|b| b.is_ascii_digit()) {
                sub.parse().ok()?
            } else {
                u8::from_str_radix(sub, 16).ok()?
            };
            Some((index, Some(sub_index)))
        }
        None => parse_hex(&lower, true).map(|index| (index, None)),
    }
}

fn parse_hex(text: &str, bare_max_four: bool) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x") {
        return u16::from_str_radix(hex, 16).ok();
    }
    if text.is_empty()
        || !text.bytes().all(|b| b.is_ascii_hexdigit())
        || (bare_max_four && text.len() > 4)
    {
        return None;
    }
    u16::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVE_EDS: &str = include_str!("../testdata/drive.eds");

    #[test]
    fn reads_identity_and_objects() {
        let device = EdsDevice::parse(DRIVE_EDS).unwrap();
        assert_eq!(device.info.vendor_name, "Acme Motion");
        assert_eq!(device.info.vendor_number, 0x1AB);
        assert_eq!(device.objects.len(), 3);

        let status = &device.objects[&0x6041];
        assert_eq!(status.access, "ro");
        assert!(status.pdo_mapping);
        assert_eq!(device.objects[&0x606C].access, "rw");

        let map = &device.objects[&0x1A00];
        assert_eq!(map.object_type, 9);
        assert_eq!(map.subs.len(), 3);
        assert_eq!(map.subs[&0].bit_length, 8);
        assert_eq!(map.sub_value(1), Some(0x6041_0010));
    }

    #[test]
    fn section_addresses() {
        assert_eq!(section_address("1A00"), Some((0x1A00, None)));
        assert_eq!(section_address("0x1a00"), Some((0x1A00, None)));
        assert_eq!(section_address("1018sub1"), Some((0x1018, Some(1))));
        assert_eq!(section_address("1018sub0x2"), Some((0x1018, Some(2))));
        assert_eq!(section_address("1018subA"), Some((0x1018, Some(10))));
        assert_eq!(section_address("DeviceInfo"), None);
        assert_eq!(section_address("12345"), None);
    }

    #[test]
    fn data_type_lengths() {
        assert_eq!(data_type_bits(0x0001), 1);
        assert_eq!(data_type_bits(0x0006), 16);
        assert_eq!(data_type_bits(0x0008), 32);
        assert_eq!(data_type_bits(0x001B), 64);
        assert_eq!(data_type_bits(0x0009), 0);
    }

    #[test]
    fn table_lists_sub_objects_indented() {
        let device = EdsDevice::parse(DRIVE_EDS).unwrap();
        let table = device.object_table();
        let lines: Vec<_> = table.lines().collect();
        assert!(lines[0].starts_with("Index"));
        assert!(lines[2].starts_with("0x1A00  TPDO1 mapping"));
        assert!(lines[3].starts_with("  [0]  Number of entries"));
        assert!(table.contains("0x6041  Statusword"));
    }

    #[test]
    fn bad_number_is_reported() {
        let err = EdsError::InvalidNumber {
            section: "6041".into(),
            key: "DataType".into(),
            value: "zz".into(),
        };
        assert_eq!(
            EdsDevice::parse("[6041]\nDataType=zz\n").unwrap_err().to_string(),
            err.to_string()
        );
    }
}
