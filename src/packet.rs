use std::fmt;
use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};

use crate::error::PacketError;

/// A 48-bit Ethernet address.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    fn read(buf: &[u8]) -> MacAddr {
        let mut addr = [0; 6];
        addr.copy_from_slice(&buf[..6]);
        MacAddr(addr)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let o = &self.0;
        write!(f,
               "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
               o[0],
               o[1],
               o[2],
               o[3],
               o[4],
               o[5])
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn ensure(layer: &'static str, need: usize, buf: &[u8]) -> Result<(), PacketError> {
    if buf.len() < need {
        Err(PacketError::Truncated {
            layer: layer,
            need: need,
            have: buf.len(),
        })
    } else {
        Ok(())
    }
}

/// TCP frame of a packet. Only the fields used for flow matching are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tcp {
    pub src: u16,
    pub dst: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u16,
    pub window: u16,
}

impl Tcp {
    const SIZE: usize = 20;

    fn parse(buf: &[u8]) -> Option<Tcp> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Tcp {
            src: BigEndian::read_u16(&buf[0..2]),
            dst: BigEndian::read_u16(&buf[2..4]),
            seq: BigEndian::read_u32(&buf[4..8]),
            ack: BigEndian::read_u32(&buf[8..12]),
            flags: BigEndian::read_u16(&buf[12..14]) & 0x01ff,
            window: BigEndian::read_u16(&buf[14..16]),
        })
    }
}

/// UDP frame of a packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Udp {
    pub src: u16,
    pub dst: u16,
}

impl Udp {
    const SIZE: usize = 8;

    fn parse(buf: &[u8]) -> Option<Udp> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Udp {
            src: BigEndian::read_u16(&buf[0..2]),
            dst: BigEndian::read_u16(&buf[2..4]),
        })
    }
}

/// ICMP frame of a packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Icmp {
    pub typ: u8,
    pub code: u8,
}

impl Icmp {
    const SIZE: usize = 4;

    fn parse(buf: &[u8]) -> Option<Icmp> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Icmp {
            typ: buf[0],
            code: buf[1],
        })
    }
}

/// Represents packets at the transport protocol level, which are encapsulated
/// within the IPv4 payload. TCP, UDP, and ICMP are decoded; anything else
/// (including non-first fragments) only carries its IPv4 protocol number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tp {
    Tcp(Tcp),
    Udp(Udp),
    Icmp(Icmp),
    Unparsable(u8),
}

pub const IP_PROTO_ICMP: u8 = 0x01;
pub const IP_PROTO_TCP: u8 = 0x06;
pub const IP_PROTO_UDP: u8 = 0x11;

/// IPv4 frame of a packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ip {
    pub tos: u8,
    pub ident: u16,
    pub ttl: u8,
    pub proto: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub tp: Tp,
}

impl Ip {
    const MIN_SIZE: usize = 20;

    fn parse(buf: &[u8]) -> Result<Ip, PacketError> {
        ensure("IPv4", Self::MIN_SIZE, buf)?;
        let vhl = buf[0];
        if (vhl >> 4) != 4 {
            return Err(PacketError::IpVersion(vhl >> 4));
        }
        let ihl = vhl & 0x0f;
        let header_len = ihl as usize * 4;
        if header_len < Self::MIN_SIZE || header_len > buf.len() {
            return Err(PacketError::IpHeaderLength(ihl));
        }
        let frag = BigEndian::read_u16(&buf[6..8]);
        let proto = buf[9];
        let rest = &buf[header_len..];
        let tp = if frag & 0x1fff != 0 {
            None
        } else {
            match proto {
                IP_PROTO_ICMP => Icmp::parse(rest).map(Tp::Icmp),
                IP_PROTO_TCP => Tcp::parse(rest).map(Tp::Tcp),
                IP_PROTO_UDP => Udp::parse(rest).map(Tp::Udp),
                _ => None,
            }
        };
        Ok(Ip {
            tos: buf[1],
            ident: BigEndian::read_u16(&buf[4..6]),
            ttl: buf[8],
            proto: proto,
            src: Ipv4Addr::from(BigEndian::read_u32(&buf[12..16])),
            dst: Ipv4Addr::from(BigEndian::read_u32(&buf[16..20])),
            tp: tp.unwrap_or(Tp::Unparsable(proto)),
        })
    }
}

/// Address resolution protocol (ARP) packet payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arp {
    Query(MacAddr, Ipv4Addr, Ipv4Addr),
    Reply(MacAddr, Ipv4Addr, MacAddr, Ipv4Addr),
}

impl Arp {
    const SIZE: usize = 28;

    /// Parse an ARP body. Operations other than request and reply yield `None`.
    fn parse(buf: &[u8]) -> Result<Option<Arp>, PacketError> {
        ensure("ARP", Self::SIZE, buf)?;
        let oper = BigEndian::read_u16(&buf[6..8]);
        let sha = MacAddr::read(&buf[8..14]);
        let spa = Ipv4Addr::from(BigEndian::read_u32(&buf[14..18]));
        let tha = MacAddr::read(&buf[18..24]);
        let tpa = Ipv4Addr::from(BigEndian::read_u32(&buf[24..28]));
        Ok(match oper {
            0x0001 => Some(Arp::Query(sha, spa, tpa)),
            0x0002 => Some(Arp::Reply(sha, spa, tha, tpa)),
            _ => None,
        })
    }

    /// The ARP operation code (1 for requests, 2 for replies).
    pub fn oper(&self) -> u16 {
        match *self {
            Arp::Query(..) => 0x0001,
            Arp::Reply(..) => 0x0002,
        }
    }

    pub fn sender_ip(&self) -> Ipv4Addr {
        match *self {
            Arp::Query(_, spa, _) | Arp::Reply(_, spa, _, _) => spa,
        }
    }

    pub fn target_ip(&self) -> Ipv4Addr {
        match *self {
            Arp::Query(_, _, tpa) | Arp::Reply(_, _, _, tpa) => tpa,
        }
    }
}

/// Represents a packet at the network protocol level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Nw {
    Ip(Ip),
    Arp(Arp),
    Unparsable(u16),
}

pub const ETH_TYP_IP: u16 = 0x0800;
pub const ETH_TYP_ARP: u16 = 0x0806;
pub const ETH_TYP_VLAN: u16 = 0x8100;

/// `dl_type` OpenFlow switches report for 802.3 frames, whose type field
/// holds a length (anything below 0x0600).
pub const ETH_TYP_NOT_ETH: u16 = 0x05ff;

/// Represents a packet at the ethernet protocol level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub dl_src: MacAddr,
    pub dl_dst: MacAddr,
    pub dl_vlan: Option<u16>,
    pub dl_vlan_dei: bool,
    pub dl_vlan_pcp: u8,
    pub nw: Nw,
}

impl Packet {
    const ETH_SIZE: usize = 14;
    const VLAN_TAG_SIZE: usize = 4;

    /// Parse an Ethernet frame.
    ///
    /// A frame whose link-layer header, or whose IPv4/ARP header, is cut short
    /// is an error. Unknown ethertypes are returned as `Nw::Unparsable`.
    pub fn parse(buf: &[u8]) -> Result<Packet, PacketError> {
        ensure("Ethernet", Self::ETH_SIZE, buf)?;
        let dst = MacAddr::read(&buf[0..6]);
        let src = MacAddr::read(&buf[6..12]);
        let typ = BigEndian::read_u16(&buf[12..14]);
        let (tag, dei, pcp, typ, offset) = match typ {
            ETH_TYP_VLAN => {
                ensure("802.1Q", Self::ETH_SIZE + Self::VLAN_TAG_SIZE, buf)?;
                let tag_and_pcp = BigEndian::read_u16(&buf[14..16]);
                let tag = tag_and_pcp & 0xfff;
                let dei = (tag_and_pcp & 0x1000) > 0;
                let pcp = tag_and_pcp >> 13;
                let typ = BigEndian::read_u16(&buf[16..18]);
                (Some(tag), dei, pcp as u8, typ, Self::ETH_SIZE + Self::VLAN_TAG_SIZE)
            }
            _ => (None, false, 0x0, typ, Self::ETH_SIZE),
        };
        let body = &buf[offset..];
        let nw = match typ {
            ETH_TYP_IP => Nw::Ip(Ip::parse(body)?),
            ETH_TYP_ARP => Arp::parse(body)?.map(Nw::Arp).unwrap_or(Nw::Unparsable(typ)),
            _ => Nw::Unparsable(typ),
        };
        Ok(Packet {
            dl_src: src,
            dl_dst: dst,
            dl_vlan: tag,
            dl_vlan_dei: dei,
            dl_vlan_pcp: pcp,
            nw: nw,
        })
    }

    /// The ethertype of the encapsulated network-layer payload, as a switch
    /// classifies it for flow matching.
    pub fn dl_typ(&self) -> u16 {
        match self.nw {
            Nw::Ip(_) => ETH_TYP_IP,
            Nw::Arp(_) => ETH_TYP_ARP,
            Nw::Unparsable(typ) if typ < 0x0600 => ETH_TYP_NOT_ETH,
            Nw::Unparsable(typ) => typ,
        }
    }

    /// The IPv4 header, when the payload is IPv4.
    pub fn ipv4(&self) -> Option<&Ip> {
        match self.nw {
            Nw::Ip(ref ip) => Some(ip),
            _ => None,
        }
    }
}
