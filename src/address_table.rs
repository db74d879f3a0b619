use std::collections::HashMap;

use crate::packet::MacAddr;

/// Learned host locations for a single switch: which port each Ethernet
/// address was last seen on.
///
/// Entries are never evicted. A table belongs to exactly one switch session.
#[derive(Clone, Debug, Default)]
pub struct AddressTable {
    known_hosts: HashMap<MacAddr, u16>,
}

impl AddressTable {
    pub fn new() -> AddressTable {
        AddressTable::default()
    }

    /// Record that `addr` was seen on `port`, replacing any earlier port.
    pub fn observe(&mut self, addr: MacAddr, port: u16) -> Option<u16> {
        self.known_hosts.insert(addr, port)
    }

    pub fn lookup(&self, addr: &MacAddr) -> Option<u16> {
        self.known_hosts.get(addr).cloned()
    }

    pub fn len(&self) -> usize {
        self.known_hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_hosts.is_empty()
    }
}
