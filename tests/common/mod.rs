#![allow(dead_code)]

use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chain_ofp::error::FabricError;
use chain_ofp::openflow0x01::{FlowMod, PacketIn, PacketInReason, PacketOut, Payload};
use chain_ofp::packet::{ETH_TYP_ARP, ETH_TYP_IP, IP_PROTO_UDP};
use chain_ofp::{ChainPolicy, FlowDecisionEngine, Role, RoleTable, SwitchFabric, SwitchId};

pub const ENTRY: SwitchId = SwitchId(1);
pub const INTERIOR: SwitchId = SwitchId(2);
pub const RETURN: SwitchId = SwitchId(5);
pub const UNMANAGED: SwitchId = SwitchId(9);

pub fn mac(last: u8) -> [u8; 6] {
    [0x00, 0x00, 0x00, 0x00, 0x00, last]
}

fn eth(dst: [u8; 6], src: [u8; 6], typ: u16) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&typ.to_be_bytes());
    frame
}

/// An ARP request from `src` to `dst`.
pub fn arp_frame(src: [u8; 6], dst: [u8; 6]) -> Vec<u8> {
    let mut frame = eth(dst, src, ETH_TYP_ARP);
    frame.extend_from_slice(&[0, 1, 0x08, 0x00, 6, 4, 0, 1]);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&[10, 0, 1, 1]);
    frame.extend_from_slice(&[0; 6]);
    frame.extend_from_slice(&[10, 0, 3, 1]);
    frame
}

/// A UDP datagram from `ip_src` to 10.0.3.1.
pub fn udp_frame(src: [u8; 6], dst: [u8; 6], ip_src: Ipv4Addr) -> Vec<u8> {
    let mut frame = eth(dst, src, ETH_TYP_IP);
    frame.extend_from_slice(&[0x45, 0, 0, 28, 0, 1, 0x40, 0, 64, IP_PROTO_UDP, 0, 0]);
    frame.extend_from_slice(&ip_src.octets());
    frame.extend_from_slice(&[10, 0, 3, 1]);
    frame.extend_from_slice(&[0x0f, 0xa0, 0x13, 0x89, 0, 8, 0, 0]);
    frame
}

pub fn unbuffered(port: u16, frame: Vec<u8>) -> PacketIn {
    PacketIn {
        total_len: frame.len() as u16,
        input_payload: Payload::NotBuffered(frame),
        port: port,
        reason: PacketInReason::NoMatch,
    }
}

pub fn buffered(port: u16, buffer_id: u32, frame: Vec<u8>) -> PacketIn {
    PacketIn {
        total_len: frame.len() as u16,
        input_payload: Payload::Buffered(buffer_id, frame),
        port: port,
        reason: PacketInReason::NoMatch,
    }
}

/// Roles used throughout: 1 is the entry, 5 the return switch, 9 unmanaged,
/// everything else interior.
pub fn engine(policy: ChainPolicy) -> Arc<FlowDecisionEngine> {
    let mut roles = RoleTable::new(Role::Interior);
    roles.assign(ENTRY, Role::Entry);
    roles.assign(RETURN, Role::Return);
    roles.assign(UNMANAGED, Role::Unmanaged);
    Arc::new(FlowDecisionEngine::new(policy, roles))
}

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    FlowMod(SwitchId, FlowMod),
    PacketOut(SwitchId, PacketOut),
}

/// Records every instruction instead of delivering it.
#[derive(Default)]
pub struct RecordingFabric {
    pub sent: Vec<Sent>,
}

impl RecordingFabric {
    pub fn take(&mut self) -> Vec<Sent> {
        std::mem::take(&mut self.sent)
    }
}

impl SwitchFabric for RecordingFabric {
    fn send_flow_mod(&mut self, sw: SwitchId, _: u32, flow_mod: FlowMod)
                     -> Result<(), FabricError> {
        self.sent.push(Sent::FlowMod(sw, flow_mod));
        Ok(())
    }

    fn send_packet_out(&mut self, sw: SwitchId, _: u32, pkt: PacketOut)
                       -> Result<(), FabricError> {
        self.sent.push(Sent::PacketOut(sw, pkt));
        Ok(())
    }
}

/// Fails every send as if the switch connection had dropped.
pub struct FailingFabric;

impl SwitchFabric for FailingFabric {
    fn send_flow_mod(&mut self, _: SwitchId, _: u32, _: FlowMod) -> Result<(), FabricError> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "switch gone").into())
    }

    fn send_packet_out(&mut self, _: SwitchId, _: u32, _: PacketOut) -> Result<(), FabricError> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "switch gone").into())
    }
}
