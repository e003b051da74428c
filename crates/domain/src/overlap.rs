use crate::zone_address::ZoneAddress;
use std::collections::HashMap;

/// Outcome of registering one address with the [`OverlapValidator`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapCheck {
    /// The exact same address was registered before.
    pub same: bool,
    /// The address contends with an earlier one for the same traffic.
    pub overlap: bool,
    /// Key of the earlier address when `overlap` is set, empty otherwise.
    pub overlap_key: String,
}

/// Detects binds that would contend for the same traffic.
///
/// A wildcard bind and a specific-interface bind for the same zone, port and
/// transport are mutually exclusive. Distinct specific interfaces are fine.
/// One validator lives for the duration of a single configuration load and
/// must see every address after key-enhancer fan-out.
#[derive(Debug, Default)]
pub struct OverlapValidator {
    registered: HashMap<String, String>,
    multicast_seen: HashMap<String, String>,
}

impl OverlapValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_and_check(&mut self, zone: &ZoneAddress) -> OverlapCheck {
        let key = zone.as_key();
        if self.registered.contains_key(&key) {
            return OverlapCheck {
                same: true,
                ..OverlapCheck::default()
            };
        }

        let mkey = zone.multicast_projection().as_key();

        // A wildcard bind for this zone/port/transport already exists.
        if let Some(owner) = self.registered.get(&mkey) {
            return overlapping(owner);
        }
        // We are the wildcard and a specific bind got there first.
        if zone.is_multicast() {
            if let Some(owner) = self.multicast_seen.get(&mkey) {
                return overlapping(owner);
            }
        }

        self.registered.insert(key.clone(), key.clone());
        self.multicast_seen.entry(mkey).or_insert(key);
        OverlapCheck::default()
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

fn overlapping(owner: &str) -> OverlapCheck {
    OverlapCheck {
        same: false,
        overlap: true,
        overlap_key: owner.to_string(),
    }
}
