//! PDO mapping decoding and signal identity reservation.
//!
//! Mapping objects live at `0x1A00..=0x1A03` (transmit) and
//! `0x1600..=0x1603` (receive). Sub-index 0 holds the entry count and
//! sub-indices 1..=8 hold packed `0xIIIISSLL` values.

use lq_core::{PdoDirection, SignalId};

use crate::dictionary::EdsDevice;

/// Number of PDOs per direction.
pub const PDO_SLOTS: u8 = 4;

/// Mapping entries per PDO.
pub const MAX_MAPPED: u8 = 8;

/// First identity reserved for transmit (status) signals.
pub const TPDO_SIGNAL_BASE: u32 = 100;

/// First identity reserved for receive (command) signals.
pub const RPDO_SIGNAL_BASE: u32 = 0;

/// First transmit and receive identity of one device.
///
/// Every device reserves its mapped signals in both ranges, so a second
/// device starts where the first one stopped. The ranges stay disjoint
/// while the receive signals of all devices number fewer than 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalBases {
    pub tpdo: u32,
    pub rpdo: u32,
}

impl Default for SignalBases {
    fn default() -> Self {
        Self {
            tpdo: TPDO_SIGNAL_BASE,
            rpdo: RPDO_SIGNAL_BASE,
        }
    }
}

/// One mapped object: `index` / `sub_index` / `length` in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    pub index: u16,
    pub sub_index: u8,
    pub length: u8,
}

impl MappingEntry {
    /// Decode a packed mapping value.
    pub fn from_packed(value: u32) -> Self {
        Self {
            index: (value >> 16) as u16,
            sub_index: ((value >> 8) & 0xFF) as u8,
            length: (value & 0xFF) as u8,
        }
    }

    pub fn to_packed(self) -> u32 {
        (u32::from(self.index) << 16) | (u32::from(self.sub_index) << 8) | u32::from(self.length)
    }
}

/// Object index of a PDO's mapping parameter.
pub fn mapping_index(direction: PdoDirection, slot: u8) -> u16 {
    match direction {
        PdoDirection::Transmit => 0x1A00 + u16::from(slot),
        PdoDirection::Receive => 0x1600 + u16::from(slot),
    }
}

/// Communication identifier of a PDO for a node id.
pub fn cob_id(direction: PdoDirection, slot: u8, node_id: u8) -> u32 {
    let base = match direction {
        PdoDirection::Transmit => 0x180,
        PdoDirection::Receive => 0x200,
    };
    base + 0x100 * u32::from(slot) + u32::from(node_id)
}

/// Decode the mapping entries of one PDO. Zero entries are skipped.
pub fn decode_entries(device: &EdsDevice, direction: PdoDirection, slot: u8) -> Vec<MappingEntry> {
    let Some(object) = device.objects.get(&mapping_index(direction, slot)) else {
        return Vec::new();
    };
    let count = object.sub_value(0).unwrap_or(0).min(u64::from(MAX_MAPPED)) as u8;
    (1..=count)
        .filter_map(|sub| object.sub_value(sub))
        .filter(|v| *v != 0)
        .map(|v| MappingEntry::from_packed(v as u32))
        .collect()
}

/// A mapping entry with its display name and reserved signal identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSignal {
    pub entry: MappingEntry,
    pub name: String,
    pub signal: SignalId,
}

/// One non-empty PDO after projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdo {
    pub direction: PdoDirection,
    /// 0-based slot, `k` in the COB-ID formula.
    pub slot: u8,
    pub cob_id: u32,
    pub signals: Vec<MappedSignal>,
}

impl Pdo {
    /// `tpdo1`, `rpdo3`, ...
    pub fn name(&self) -> String {
        format!("{}{}", self.direction.prefix(), self.slot + 1)
    }
}

/// All PDOs of a device for one node id, with identities assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdoLayout {
    pub node_id: u8,
    pub tpdos: Vec<Pdo>,
    pub rpdos: Vec<Pdo>,
}

impl PdoLayout {
    /// Project a device onto a node id. Identities are handed out in
    /// encounter order: transmit from 100, receive from 0.
    pub fn new(device: &EdsDevice, node_id: u8) -> Self {
        Self::with_bases(device, node_id, SignalBases::default())
    }

    /// Project a device whose identities start at `bases`.
    pub fn with_bases(device: &EdsDevice, node_id: u8, bases: SignalBases) -> Self {
        Self {
            node_id,
            tpdos: project(device, PdoDirection::Transmit, node_id, bases.tpdo),
            rpdos: project(device, PdoDirection::Receive, node_id, bases.rpdo),
        }
    }

    /// Where the next device's identities start.
    pub fn next_bases(&self, bases: SignalBases) -> SignalBases {
        let mapped = |pdos: &[Pdo]| pdos.iter().map(|p| p.signals.len() as u32).sum::<u32>();
        SignalBases {
            tpdo: bases.tpdo + mapped(&self.tpdos),
            rpdo: bases.rpdo + mapped(&self.rpdos),
        }
    }

    /// Receive PDOs first, then transmit.
    pub fn pdos(&self) -> impl Iterator<Item = &Pdo> {
        self.rpdos.iter().chain(self.tpdos.iter())
    }

    pub fn signal_count(&self) -> usize {
        self.pdos().map(|p| p.signals.len()).sum()
    }
}

fn project(device: &EdsDevice, direction: PdoDirection, node_id: u8, base: u32) -> Vec<Pdo> {
    let mut next = base;
    let mut pdos = Vec::new();
    for slot in 0..PDO_SLOTS {
        let entries = decode_entries(device, direction, slot);
        if entries.is_empty() {
            continue;
        }
        let signals = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let name = device
                    .mapped_name(entry.index, entry.sub_index)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        format!("{}{}_Signal{i}", direction.prefix().to_uppercase(), slot + 1)
                    });
                let signal = SignalId(next);
                next += 1;
                MappedSignal {
                    entry,
                    name,
                    signal,
                }
            })
            .collect();
        pdos.push(Pdo {
            direction,
            slot,
            cob_id: cob_id(direction, slot, node_id),
            signals,
        });
    }
    pdos
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRIVE_EDS: &str = include_str!("../testdata/drive.eds");

    #[test]
    fn packed_values() {
        let e = MappingEntry::from_packed(0x6041_0010);
        assert_eq!(
            e,
            MappingEntry {
                index: 0x6041,
                sub_index: 0,
                length: 16
            }
        );
        assert_eq!(e.to_packed(), 0x6041_0010);
    }

    #[test]
    fn cob_ids_follow_slot_and_node() {
        assert_eq!(cob_id(PdoDirection::Transmit, 0, 7), 0x187);
        assert_eq!(cob_id(PdoDirection::Transmit, 3, 5), 0x485);
        assert_eq!(cob_id(PdoDirection::Receive, 1, 5), 0x305);
    }

    #[test]
    fn node_id_override_recomputes_cob_id() {
        let device = EdsDevice::parse(DRIVE_EDS).unwrap();
        let layout = PdoLayout::new(&device, 7);
        assert_eq!(layout.tpdos.len(), 1);
        let tpdo = &layout.tpdos[0];
        assert_eq!(tpdo.cob_id, 0x187);
        assert_eq!(tpdo.name(), "tpdo1");
        let ids: Vec<_> = tpdo.signals.iter().map(|s| s.signal.0).collect();
        assert_eq!(ids, vec![100, 101]);
        assert_eq!(tpdo.signals[0].name, "Statusword");
        assert_eq!(tpdo.signals[1].entry.length, 32);
        assert!(layout.rpdos.is_empty());
    }

    #[test]
    fn receive_and_transmit_ranges_are_disjoint() {
        let text = format!(
            "{}\n[1600]\nParameterName=RPDO1 mapping\n[1600sub0]\nDefaultValue=3\n\
             [1600sub1]\nDefaultValue=0x60400010\n[1600sub2]\nDefaultValue=0\n\
             [1600sub3]\nDefaultValue=0x60FF0020\n",
            DRIVE_EDS
        );
        let device = EdsDevice::parse(&text).unwrap();
        let layout = PdoLayout::new(&device, 5);
        let rx: Vec<_> = layout.rpdos[0].signals.iter().map(|s| s.signal.0).collect();
        assert_eq!(rx, vec![0, 1]);
        assert_eq!(layout.rpdos[0].signals[0].name, "RPDO1_Signal0");
        assert_eq!(layout.signal_count(), 4);
        assert!(layout
            .rpdos
            .iter()
            .flat_map(|p| &p.signals)
            .all(|s| s.signal.0 < TPDO_SIGNAL_BASE));
    }

    #[test]
    fn later_devices_continue_both_ranges() {
        let text = format!(
            "{}\n[1600]\n[1600sub0]\nDefaultValue=1\n[1600sub1]\nDefaultValue=0x60400010\n",
            DRIVE_EDS
        );
        let device = EdsDevice::parse(&text).unwrap();
        let first = PdoLayout::new(&device, 5);
        let bases = first.next_bases(SignalBases::default());
        assert_eq!(bases, SignalBases { tpdo: 102, rpdo: 1 });

        let second = PdoLayout::with_bases(&device, 6, bases);
        let ids: Vec<_> = second.pdos().flat_map(|p| &p.signals).map(|s| s.signal.0).collect();
        assert_eq!(ids, vec![1, 102, 103]);
    }

    #[test]
    fn count_is_capped_at_eight() {
        let mut text = String::from("[1A01]\n[1A01sub0]\nDefaultValue=12\n");
        for sub in 1..=12 {
            text.push_str(&format!("[1A01sub{sub}]\nDefaultValue=0x2000{sub:02X}08\n"));
        }
        let device = EdsDevice::parse(&text).unwrap();
        assert_eq!(decode_entries(&device, PdoDirection::Transmit, 1).len(), 8);
        let layout = PdoLayout::new(&device, 5);
        assert_eq!(layout.tpdos[0].slot, 1);
        assert_eq!(layout.tpdos[0].cob_id, 0x285);
    }
}
