use std::convert::TryFrom;
use std::io::{self, Write};
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::CodecError;
use crate::packet::{Nw, Packet, Tp, MacAddr};

pub const OFP_VERSION: u8 = 0x01;

/// OpenFlow 1.0 message type codes, used by headers to identify meaning of the rest of a message.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MsgCode {
    Hello,
    Error,
    EchoReq,
    EchoResp,
    Vendor,
    FeaturesReq,
    FeaturesResp,
    GetConfigReq,
    GetConfigResp,
    SetConfig,
    PacketIn,
    FlowRemoved,
    PortStatus,
    PacketOut,
    FlowMod,
    PortMod,
    StatsReq,
    StatsResp,
    BarrierReq,
    BarrierResp,
    QueueGetConfigReq,
    QueueGetConfigResp,
}

impl TryFrom<u8> for MsgCode {
    type Error = CodecError;

    fn try_from(code: u8) -> Result<MsgCode, CodecError> {
        Ok(match code {
            0 => MsgCode::Hello,
            1 => MsgCode::Error,
            2 => MsgCode::EchoReq,
            3 => MsgCode::EchoResp,
            4 => MsgCode::Vendor,
            5 => MsgCode::FeaturesReq,
            6 => MsgCode::FeaturesResp,
            7 => MsgCode::GetConfigReq,
            8 => MsgCode::GetConfigResp,
            9 => MsgCode::SetConfig,
            10 => MsgCode::PacketIn,
            11 => MsgCode::FlowRemoved,
            12 => MsgCode::PortStatus,
            13 => MsgCode::PacketOut,
            14 => MsgCode::FlowMod,
            15 => MsgCode::PortMod,
            16 => MsgCode::StatsReq,
            17 => MsgCode::StatsResp,
            18 => MsgCode::BarrierReq,
            19 => MsgCode::BarrierResp,
            20 => MsgCode::QueueGetConfigReq,
            21 => MsgCode::QueueGetConfigResp,
            _ => return Err(CodecError::UnknownMessageCode(code)),
        })
    }
}

/// Common API for message types implementing OpenFlow Message Codes (see `MsgCode` enum).
pub trait MessageType: Sized {
    /// Return the byte-size of a message.
    fn size_of(msg: &Self) -> usize;
    /// Parse a buffer into a message.
    fn parse(buf: &[u8]) -> Result<Self, CodecError>;
    /// Marshal a message into a `u8` buffer.
    fn marshal(msg: Self, bytes: &mut Vec<u8>) -> io::Result<()>;
}

fn ensure(message: &'static str, need: usize, buf: &[u8]) -> Result<(), CodecError> {
    if buf.len() < need {
        Err(CodecError::Truncated {
            message: message,
            need: need,
            have: buf.len(),
        })
    } else {
        Ok(())
    }
}

const OFPFW_IN_PORT: u32 = 1 << 0;
const OFPFW_DL_VLAN: u32 = 1 << 1;
const OFPFW_DL_SRC: u32 = 1 << 2;
const OFPFW_DL_DST: u32 = 1 << 3;
const OFPFW_DL_TYPE: u32 = 1 << 4;
const OFPFW_NW_PROTO: u32 = 1 << 5;
const OFPFW_TP_SRC: u32 = 1 << 6;
const OFPFW_TP_DST: u32 = 1 << 7;
const OFPFW_NW_SRC_SHIFT: u32 = 8;
const OFPFW_NW_DST_SHIFT: u32 = 14;
const OFPFW_NW_ALL: u32 = 32;
const OFPFW_DL_VLAN_PCP: u32 = 1 << 20;
const OFPFW_NW_TOS: u32 = 1 << 21;

/// `dl_vlan` value matching untagged frames.
const OFP_VLAN_NONE: u16 = 0xffff;

/// Fields to match against flows. `None` fields are wildcarded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    pub dl_src: Option<MacAddr>,
    pub dl_dst: Option<MacAddr>,
    pub dl_typ: Option<u16>,
    /// `Some(None)` matches untagged frames only.
    pub dl_vlan: Option<Option<u16>>,
    pub dl_vlan_pcp: Option<u8>,
    pub nw_src: Option<Ipv4Addr>,
    pub nw_dst: Option<Ipv4Addr>,
    pub nw_proto: Option<u8>,
    pub nw_tos: Option<u8>,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,
    pub in_port: Option<u16>,
}

impl Pattern {
    const SIZE: usize = 40;

    /// A pattern with every field wildcarded.
    pub fn match_all() -> Pattern {
        Pattern::default()
    }

    /// The exact match for `pkt` received on `in_port`.
    ///
    /// Layer 3 fields are filled in for IPv4 and ARP, layer 4 fields for TCP
    /// and UDP ports, or the ICMP type and code.
    pub fn exact(in_port: u16, pkt: &Packet) -> Pattern {
        let mut pattern = Pattern {
            in_port: Some(in_port),
            dl_src: Some(pkt.dl_src),
            dl_dst: Some(pkt.dl_dst),
            dl_vlan: Some(pkt.dl_vlan),
            dl_vlan_pcp: Some(pkt.dl_vlan_pcp),
            dl_typ: Some(pkt.dl_typ()),
            ..Pattern::match_all()
        };
        match pkt.nw {
            Nw::Ip(ref ip) => {
                pattern.nw_tos = Some(ip.tos);
                pattern.nw_proto = Some(ip.proto);
                pattern.nw_src = Some(ip.src);
                pattern.nw_dst = Some(ip.dst);
                let (tp_src, tp_dst) = match ip.tp {
                    Tp::Tcp(ref tcp) => (Some(tcp.src), Some(tcp.dst)),
                    Tp::Udp(ref udp) => (Some(udp.src), Some(udp.dst)),
                    Tp::Icmp(ref icmp) => (Some(icmp.typ as u16), Some(icmp.code as u16)),
                    Tp::Unparsable(_) => (None, None),
                };
                pattern.tp_src = tp_src;
                pattern.tp_dst = tp_dst;
            }
            Nw::Arp(ref arp) => {
                pattern.nw_proto = Some(arp.oper() as u8);
                pattern.nw_src = Some(arp.sender_ip());
                pattern.nw_dst = Some(arp.target_ip());
            }
            Nw::Unparsable(_) => (),
        }
        pattern
    }

    fn wildcards(&self) -> u32 {
        fn flag<T>(field: &Option<T>, bit: u32) -> u32 {
            if field.is_none() { bit } else { 0 }
        }
        flag(&self.in_port, OFPFW_IN_PORT) | flag(&self.dl_vlan, OFPFW_DL_VLAN) |
        flag(&self.dl_src, OFPFW_DL_SRC) | flag(&self.dl_dst, OFPFW_DL_DST) |
        flag(&self.dl_typ, OFPFW_DL_TYPE) | flag(&self.nw_proto, OFPFW_NW_PROTO) |
        flag(&self.tp_src, OFPFW_TP_SRC) | flag(&self.tp_dst, OFPFW_TP_DST) |
        flag(&self.nw_src, OFPFW_NW_ALL << OFPFW_NW_SRC_SHIFT) |
        flag(&self.nw_dst, OFPFW_NW_ALL << OFPFW_NW_DST_SHIFT) |
        flag(&self.dl_vlan_pcp, OFPFW_DL_VLAN_PCP) | flag(&self.nw_tos, OFPFW_NW_TOS)
    }

    fn marshal(p: &Pattern, bytes: &mut Vec<u8>) -> io::Result<()> {
        let mac = |m: Option<MacAddr>| m.unwrap_or_default().octets();
        let ip = |a: Option<Ipv4Addr>| a.map(u32::from).unwrap_or(0);
        bytes.write_u32::<BigEndian>(p.wildcards())?;
        bytes.write_u16::<BigEndian>(p.in_port.unwrap_or(0))?;
        bytes.write_all(&mac(p.dl_src))?;
        bytes.write_all(&mac(p.dl_dst))?;
        bytes.write_u16::<BigEndian>(match p.dl_vlan {
                Some(Some(vlan)) => vlan,
                Some(None) => OFP_VLAN_NONE,
                None => 0,
            })?;
        bytes.write_u8(p.dl_vlan_pcp.unwrap_or(0))?;
        bytes.write_u8(0)?;
        bytes.write_u16::<BigEndian>(p.dl_typ.unwrap_or(0))?;
        bytes.write_u8(p.nw_tos.unwrap_or(0))?;
        bytes.write_u8(p.nw_proto.unwrap_or(0))?;
        bytes.write_u16::<BigEndian>(0)?;
        bytes.write_u32::<BigEndian>(ip(p.nw_src))?;
        bytes.write_u32::<BigEndian>(ip(p.nw_dst))?;
        bytes.write_u16::<BigEndian>(p.tp_src.unwrap_or(0))?;
        bytes.write_u16::<BigEndian>(p.tp_dst.unwrap_or(0))
    }
}

/// Port behavior.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PseudoPort {
    PhysicalPort(u16),
    /// Every physical port except the ingress port.
    AllPorts,
}

/// Reserved port numbers.
#[repr(u16)]
enum OfpPort {
    All = 0xfffc,
    None = 0xffff,
}

impl PseudoPort {
    fn to_int(pp: PseudoPort) -> u16 {
        match pp {
            PseudoPort::PhysicalPort(p) => p,
            PseudoPort::AllPorts => OfpPort::All as u16,
        }
    }

    fn marshal(pp: PseudoPort, bytes: &mut Vec<u8>) -> io::Result<()> {
        bytes.write_u16::<BigEndian>(PseudoPort::to_int(pp))
    }
}

/// Actions associated with flows and packets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Output(PseudoPort),
}

const OFPAT_OUTPUT: u16 = 0;

impl Action {
    fn size_of(a: &Action) -> usize {
        match *a {
            Action::Output(_) => 8,
        }
    }

    fn size_of_sequence(actions: &[Action]) -> usize {
        actions.iter().map(Action::size_of).sum()
    }

    fn marshal(act: Action, bytes: &mut Vec<u8>) -> io::Result<()> {
        match act {
            Action::Output(pp) => {
                bytes.write_u16::<BigEndian>(OFPAT_OUTPUT)?;
                bytes.write_u16::<BigEndian>(Action::size_of(&act) as u16)?;
                PseudoPort::marshal(pp, bytes)?;
                // max_len only applies to controller output
                bytes.write_u16::<BigEndian>(0)
            }
        }
    }
}

/// How long before a flow entry expires.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    Permanent,
    ExpiresAfter(u16),
}

impl Timeout {
    pub fn of_int(tm: u16) -> Timeout {
        match tm {
            0 => Timeout::Permanent,
            d => Timeout::ExpiresAfter(d),
        }
    }

    pub fn to_int(tm: Timeout) -> u16 {
        match tm {
            Timeout::Permanent => 0,
            Timeout::ExpiresAfter(d) => d,
        }
    }
}

/// Switch features, as reported in reply to a features request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub datapath_id: u64,
    pub num_buffers: u32,
    pub num_tables: u8,
    pub capabilities: u32,
    pub actions: u32,
    pub num_ports: usize,
}

impl SwitchFeatures {
    const SIZE: usize = 24;
    const PHY_PORT_SIZE: usize = 48;
}

impl MessageType for SwitchFeatures {
    fn size_of(sf: &SwitchFeatures) -> usize {
        SwitchFeatures::SIZE + sf.num_ports * SwitchFeatures::PHY_PORT_SIZE
    }

    fn parse(buf: &[u8]) -> Result<SwitchFeatures, CodecError> {
        ensure("features reply", SwitchFeatures::SIZE, buf)?;
        Ok(SwitchFeatures {
            datapath_id: BigEndian::read_u64(&buf[0..8]),
            num_buffers: BigEndian::read_u32(&buf[8..12]),
            num_tables: buf[12],
            capabilities: BigEndian::read_u32(&buf[16..20]),
            actions: BigEndian::read_u32(&buf[20..24]),
            num_ports: (buf.len() - SwitchFeatures::SIZE) / SwitchFeatures::PHY_PORT_SIZE,
        })
    }

    /// Port descriptions are not retained, so they are written zeroed.
    fn marshal(sf: SwitchFeatures, bytes: &mut Vec<u8>) -> io::Result<()> {
        bytes.write_u64::<BigEndian>(sf.datapath_id)?;
        bytes.write_u32::<BigEndian>(sf.num_buffers)?;
        bytes.write_u8(sf.num_tables)?;
        bytes.write_all(&[0; 3])?;
        bytes.write_u32::<BigEndian>(sf.capabilities)?;
        bytes.write_u32::<BigEndian>(sf.actions)?;
        bytes.write_all(&vec![0; sf.num_ports * SwitchFeatures::PHY_PORT_SIZE])
    }
}

/// `ofp_flow_mod_command` for adding a flow.
const OFPFC_ADD: u16 = 0;

/// A flow added to a switch's table by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowMod {
    pub pattern: Pattern,
    pub priority: u16,
    pub actions: Vec<Action>,
    pub cookie: u64,
    pub idle_timeout: Timeout,
    pub hard_timeout: Timeout,
    pub notify_when_removed: bool,
    pub apply_to_packet: Option<u32>,
    pub out_port: Option<PseudoPort>,
    pub check_overlap: bool,
}

impl FlowMod {
    const SIZE: usize = 24;

    fn flags_to_int(check_overlap: bool, notify_when_removed: bool) -> u16 {
        (if check_overlap { 1 << 1 } else { 0 }) | (if notify_when_removed { 1 << 0 } else { 0 })
    }
}

impl MessageType for FlowMod {
    fn size_of(msg: &FlowMod) -> usize {
        Pattern::SIZE + FlowMod::SIZE + Action::size_of_sequence(&msg.actions)
    }

    /// Flow-mods are only ever sent by the controller.
    fn parse(_: &[u8]) -> Result<FlowMod, CodecError> {
        Err(CodecError::Unsupported("flow mod"))
    }

    fn marshal(fm: FlowMod, bytes: &mut Vec<u8>) -> io::Result<()> {
        Pattern::marshal(&fm.pattern, bytes)?;
        bytes.write_u64::<BigEndian>(fm.cookie)?;
        bytes.write_u16::<BigEndian>(OFPFC_ADD)?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(fm.idle_timeout))?;
        bytes.write_u16::<BigEndian>(Timeout::to_int(fm.hard_timeout))?;
        bytes.write_u16::<BigEndian>(fm.priority)?;
        bytes.write_u32::<BigEndian>(fm.apply_to_packet.unwrap_or(NO_BUFFER))?;
        match fm.out_port {
            None => bytes.write_u16::<BigEndian>(OfpPort::None as u16)?,
            Some(x) => PseudoPort::marshal(x, bytes)?,
        }
        bytes.write_u16::<BigEndian>(FlowMod::flags_to_int(fm.check_overlap,
                                                          fm.notify_when_removed))?;
        for act in fm.actions {
            Action::marshal(act, bytes)?
        }
        Ok(())
    }
}

const NO_BUFFER: u32 = 0xffff_ffff;

/// The data associated with a packet received by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Buffered(u32, Vec<u8>),
    NotBuffered(Vec<u8>),
}

impl Payload {
    pub fn size_of(payload: &Payload) -> usize {
        payload.bytes().len()
    }

    /// The raw frame (possibly truncated to `miss_send_len` for buffered packets).
    pub fn bytes(&self) -> &[u8] {
        match *self {
            Payload::Buffered(_, ref buf) |
            Payload::NotBuffered(ref buf) => buf,
        }
    }

    /// The switch-side buffer holding the packet, if any.
    pub fn buffer_id(&self) -> Option<u32> {
        match *self {
            Payload::Buffered(id, _) => Some(id),
            Payload::NotBuffered(_) => None,
        }
    }
}

/// The reason a packet arrives at the controller.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PacketInReason {
    NoMatch,
    ExplicitSend,
}

/// Represents packets received by the datapath and sent to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketIn {
    pub input_payload: Payload,
    pub total_len: u16,
    pub port: u16,
    pub reason: PacketInReason,
}

impl PacketIn {
    const SIZE: usize = 10;
}

impl MessageType for PacketIn {
    fn size_of(pi: &PacketIn) -> usize {
        PacketIn::SIZE + Payload::size_of(&pi.input_payload)
    }

    fn parse(buf: &[u8]) -> Result<PacketIn, CodecError> {
        ensure("packet in", PacketIn::SIZE, buf)?;
        let total_len = BigEndian::read_u16(&buf[4..6]);
        let port = BigEndian::read_u16(&buf[6..8]);
        let reason = match buf[8] {
            0 => PacketInReason::NoMatch,
            1 => PacketInReason::ExplicitSend,
            r => return Err(CodecError::UnknownReason(r)),
        };
        let data = buf[PacketIn::SIZE..].to_vec();
        let payload = match BigEndian::read_u32(&buf[0..4]) {
            NO_BUFFER => Payload::NotBuffered(data),
            n => Payload::Buffered(n, data),
        };
        Ok(PacketIn {
            input_payload: payload,
            total_len: total_len,
            port: port,
            reason: reason,
        })
    }

    fn marshal(pi: PacketIn, bytes: &mut Vec<u8>) -> io::Result<()> {
        bytes.write_u32::<BigEndian>(pi.input_payload.buffer_id().unwrap_or(NO_BUFFER))?;
        bytes.write_u16::<BigEndian>(pi.total_len)?;
        bytes.write_u16::<BigEndian>(pi.port)?;
        bytes.write_u8(pi.reason as u8)?;
        bytes.write_u8(0)?;
        bytes.write_all(pi.input_payload.bytes())
    }
}

/// Send a packet out of the datapath.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketOut {
    pub output_payload: Payload,
    pub port_id: Option<u16>,
    pub apply_actions: Vec<Action>,
}

impl PacketOut {
    const SIZE: usize = 8;
}

impl MessageType for PacketOut {
    fn size_of(po: &PacketOut) -> usize {
        let data = match po.output_payload {
            Payload::Buffered(..) => 0,
            Payload::NotBuffered(ref buf) => buf.len(),
        };
        PacketOut::SIZE + Action::size_of_sequence(&po.apply_actions) + data
    }

    /// Packet-outs are only ever sent by the controller.
    fn parse(_: &[u8]) -> Result<PacketOut, CodecError> {
        Err(CodecError::Unsupported("packet out"))
    }

    fn marshal(po: PacketOut, bytes: &mut Vec<u8>) -> io::Result<()> {
        bytes.write_u32::<BigEndian>(po.output_payload.buffer_id().unwrap_or(NO_BUFFER))?;
        bytes.write_u16::<BigEndian>(po.port_id.unwrap_or(OfpPort::None as u16))?;
        bytes.write_u16::<BigEndian>(Action::size_of_sequence(&po.apply_actions) as u16)?;
        for act in po.apply_actions {
            Action::marshal(act, bytes)?;
        }
        match po.output_payload {
            Payload::Buffered(..) => Ok(()),
            Payload::NotBuffered(buf) => bytes.write_all(&buf),
        }
    }
}

/// An error reported by the switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub typ: u16,
    pub code: u16,
    pub data: Vec<u8>,
}

impl MessageType for Error {
    fn size_of(err: &Error) -> usize {
        4 + err.data.len()
    }

    fn parse(buf: &[u8]) -> Result<Error, CodecError> {
        ensure("error", 4, buf)?;
        Ok(Error {
            typ: BigEndian::read_u16(&buf[0..2]),
            code: BigEndian::read_u16(&buf[2..4]),
            data: buf[4..].to_vec(),
        })
    }

    fn marshal(err: Error, bytes: &mut Vec<u8>) -> io::Result<()> {
        bytes.write_u16::<BigEndian>(err.typ)?;
        bytes.write_u16::<BigEndian>(err.code)?;
        bytes.write_all(&err.data)
    }
}

/// Encapsulates handling of messages implementing `MessageType` trait.
pub mod message {
    use super::*;
    use crate::error::PacketError;
    use crate::ofp_header::OfpHeader;
    use crate::ofp_message::OfpMessage;

    /// Abstractions of OpenFlow messages mapping to message codes.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Message {
        Hello,
        Error(Error),
        EchoRequest(Vec<u8>),
        EchoReply(Vec<u8>),
        FeaturesReq,
        FeaturesReply(SwitchFeatures),
        FlowMod(FlowMod),
        PacketIn(PacketIn),
        PacketOut(PacketOut),
        /// A message the controller does not act on, with its body dropped.
        Other(MsgCode),
    }

    impl Message {
        /// Map `Message` to associated OpenFlow message type code `MsgCode`.
        fn msg_code_of_message(msg: &Message) -> MsgCode {
            match *msg {
                Message::Hello => MsgCode::Hello,
                Message::Error(_) => MsgCode::Error,
                Message::EchoRequest(_) => MsgCode::EchoReq,
                Message::EchoReply(_) => MsgCode::EchoResp,
                Message::FeaturesReq => MsgCode::FeaturesReq,
                Message::FeaturesReply(_) => MsgCode::FeaturesResp,
                Message::FlowMod(_) => MsgCode::FlowMod,
                Message::PacketIn(_) => MsgCode::PacketIn,
                Message::PacketOut(_) => MsgCode::PacketOut,
                Message::Other(code) => code,
            }
        }

        /// Marshal the OpenFlow message `msg`.
        fn marshal_body(msg: Message, bytes: &mut Vec<u8>) -> io::Result<()> {
            match msg {
                Message::Hello | Message::FeaturesReq | Message::Other(_) => Ok(()),
                Message::Error(err) => Error::marshal(err, bytes),
                Message::EchoReply(buf) |
                Message::EchoRequest(buf) => bytes.write_all(&buf),
                Message::FeaturesReply(sf) => SwitchFeatures::marshal(sf, bytes),
                Message::FlowMod(flow_mod) => FlowMod::marshal(flow_mod, bytes),
                Message::PacketIn(packet_in) => PacketIn::marshal(packet_in, bytes),
                Message::PacketOut(packet_out) => PacketOut::marshal(packet_out, bytes),
            }
        }
    }

    impl OfpMessage for Message {
        fn size_of(msg: &Message) -> usize {
            let body = match *msg {
                Message::Hello | Message::FeaturesReq | Message::Other(_) => 0,
                Message::Error(ref err) => Error::size_of(err),
                Message::EchoRequest(ref buf) |
                Message::EchoReply(ref buf) => buf.len(),
                Message::FeaturesReply(ref sf) => SwitchFeatures::size_of(sf),
                Message::FlowMod(ref flow_mod) => FlowMod::size_of(flow_mod),
                Message::PacketIn(ref packet_in) => PacketIn::size_of(packet_in),
                Message::PacketOut(ref po) => PacketOut::size_of(po),
            };
            OfpHeader::size() + body
        }

        fn header_of(xid: u32, msg: &Message) -> OfpHeader {
            OfpHeader::new(OFP_VERSION,
                           Self::msg_code_of_message(msg) as u8,
                           Self::size_of(msg) as u16,
                           xid)
        }

        /// Fails with `InvalidInput` when the message does not fit the 16-bit
        /// length field.
        fn marshal(xid: u32, msg: Message) -> io::Result<Vec<u8>> {
            let size = Self::size_of(&msg);
            if size > u16::MAX as usize {
                return Err(io::Error::new(io::ErrorKind::InvalidInput,
                                          format!("{} byte message exceeds the OpenFlow length field",
                                                  size)));
            }
            let hdr = Self::header_of(xid, &msg);
            let mut bytes = Vec::with_capacity(hdr.length());
            OfpHeader::marshal(&mut bytes, hdr)?;
            Message::marshal_body(msg, &mut bytes)?;
            Ok(bytes)
        }

        fn parse(header: &OfpHeader, buf: &[u8]) -> Result<(u32, Message), CodecError> {
            if header.version() != OFP_VERSION {
                return Err(CodecError::UnsupportedVersion(header.version()));
            }
            let msg = match header.type_code()? {
                MsgCode::Hello => Message::Hello,
                MsgCode::Error => Message::Error(Error::parse(buf)?),
                MsgCode::EchoReq => Message::EchoRequest(buf.to_vec()),
                MsgCode::EchoResp => Message::EchoReply(buf.to_vec()),
                MsgCode::FeaturesReq => Message::FeaturesReq,
                MsgCode::FeaturesResp => Message::FeaturesReply(SwitchFeatures::parse(buf)?),
                MsgCode::PacketIn => Message::PacketIn(PacketIn::parse(buf)?),
                code => Message::Other(code),
            };
            Ok((header.xid(), msg))
        }
    }

    /// Return a `FlowMod` adding a flow parameterized by the given `priority`, `pattern`,
    /// and `actions`.
    pub fn add_flow(prio: u16, pattern: Pattern, actions: Vec<Action>) -> FlowMod {
        FlowMod {
            pattern: pattern,
            priority: prio,
            actions: actions,
            cookie: 0,
            idle_timeout: Timeout::Permanent,
            hard_timeout: Timeout::Permanent,
            notify_when_removed: false,
            out_port: None,
            apply_to_packet: None,
            check_overlap: false,
        }
    }

    /// Parse the Ethernet frame carried by a packet-in payload.
    pub fn parse_payload(p: &Payload) -> Result<Packet, PacketError> {
        Packet::parse(p.bytes())
    }
}
