use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, SessionError};
use crate::openflow0x01::{FlowMod, PacketIn, PacketOut, SwitchFeatures};

/// Identity of a connected switch: its OpenFlow datapath id.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwitchId(pub u64);

impl fmt::Display for SwitchId {
    /// Dash-separated hex of the low 48 bits, with any high bits appended
    /// after a `|`, e.g. `00-00-00-00-00-01`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (i, b) in bytes[2..].iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        match self.0 >> 48 {
            0 => Ok(()),
            hi => write!(f, "|{}", hi),
        }
    }
}

impl fmt::Debug for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The switch-facing side of the controller: how decisions reach switches.
pub trait SwitchFabric {
    /// Install (or modify) a flow rule on switch `sw`.
    fn send_flow_mod(&mut self, sw: SwitchId, xid: u32, flow_mod: FlowMod)
                     -> Result<(), FabricError>;
    /// Have switch `sw` send a single packet.
    fn send_packet_out(&mut self, sw: SwitchId, xid: u32, pkt: PacketOut)
                       -> Result<(), FabricError>;
}

/// OpenFlow Controller
///
/// Version-agnostic API for implementing an OpenFlow controller application.
/// The fabric delivers events; replies go back through the `SwitchFabric`.
pub trait OfpController {
    /// A switch completed the handshake.
    fn switch_connected(&mut self, sw: SwitchId, features: &SwitchFeatures);
    /// The connection to a switch went away.
    fn switch_disconnected(&mut self, sw: SwitchId);
    /// A switch sent a packet to the controller.
    fn packet_in<F: SwitchFabric>(&mut self,
                                  sw: SwitchId,
                                  xid: u32,
                                  pkt: &PacketIn,
                                  fabric: &mut F)
                                  -> Result<(), SessionError>;
}

/// OpenFlow 1.0 switch connections.
pub mod openflow0x01 {
    use std::io::{self, Read, Write};

    use tracing::{debug, info, warn};

    use super::*;
    use crate::error::CodecError;
    use crate::ofp_header::OfpHeader;
    use crate::ofp_message::OfpMessage;
    use crate::openflow0x01::message::Message;

    /// A single switch connection speaking OpenFlow 1.0 over `S`.
    pub struct Connection<S> {
        stream: S,
        switch: Option<SwitchId>,
    }

    impl<S: Read + Write> Connection<S> {
        pub fn new(stream: S) -> Connection<S> {
            Connection {
                stream: stream,
                switch: None,
            }
        }

        /// The switch on the other end, once the handshake has identified it.
        pub fn switch(&self) -> Option<SwitchId> {
            self.switch
        }

        pub fn into_inner(self) -> S {
            self.stream
        }

        /// Perform the handshake, then dispatch incoming messages to
        /// `controller` until the switch disconnects.
        ///
        /// An error is returned when the stream fails or a message cannot be
        /// framed; in both cases the connection is unusable. The controller is
        /// told about the disconnect either way.
        pub fn run<C: OfpController>(&mut self, controller: &mut C) -> Result<(), FabricError> {
            let result = self.serve(controller);
            if let Some(sw) = self.switch.take() {
                info!(dpid = %sw, "switch disconnected");
                controller.switch_disconnected(sw);
            }
            result
        }

        fn serve<C: OfpController>(&mut self, controller: &mut C) -> Result<(), FabricError> {
            self.send_message(0, Message::Hello)?;
            self.send_message(0, Message::FeaturesReq)?;
            while let Some((xid, msg)) = self.recv_message()? {
                match msg {
                    Ok(msg) => self.handle_message(xid, msg, controller)?,
                    Err(e) => warn!(error = %e, xid, "ignoring undecodable message"),
                }
            }
            Ok(())
        }

        fn handle_message<C: OfpController>(&mut self,
                                            xid: u32,
                                            msg: Message,
                                            controller: &mut C)
                                            -> Result<(), FabricError> {
            match msg {
                Message::Hello => debug!("hello"),
                Message::EchoRequest(bytes) => self.send_message(xid, Message::EchoReply(bytes))?,
                Message::FeaturesReply(features) => {
                    let sw = SwitchId(features.datapath_id);
                    if self.switch == Some(sw) {
                        debug!(dpid = %sw, "repeated features reply");
                        return Ok(());
                    }
                    if let Some(old) = self.switch.replace(sw) {
                        controller.switch_disconnected(old);
                    }
                    info!(dpid = %sw,
                          buffers = features.num_buffers,
                          tables = features.num_tables,
                          ports = features.num_ports,
                          "switch connected");
                    controller.switch_connected(sw, &features);
                }
                Message::PacketIn(pkt) => {
                    match self.switch {
                        None => warn!(xid, "packet-in before features reply, ignoring"),
                        Some(sw) => {
                            match controller.packet_in(sw, xid, &pkt, self) {
                                Ok(()) => (),
                                Err(SessionError::Send(e)) => return Err(e),
                                Err(e) => warn!(dpid = %sw, error = %e, "packet-in not handled"),
                            }
                        }
                    }
                }
                Message::Error(err) => {
                    warn!(typ = err.typ, code = err.code, "switch reported an error")
                }
                msg => debug!(?msg, "ignoring message"),
            }
            Ok(())
        }

        /// Read the next message. `None` means the switch closed the
        /// connection between messages; closing inside a message is an error.
        fn recv_message(&mut self)
                        -> Result<Option<(u32, Result<Message, CodecError>)>, FabricError> {
            let mut buf = [0u8; 8];
            let mut filled = 0;
            while filled < buf.len() {
                match self.stream.read(&mut buf[filled..]) {
                    Ok(0) if filled == 0 => return Ok(None),
                    Ok(0) => {
                        return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                                                  "connection closed inside a message header")
                            .into())
                    }
                    Ok(n) => filled += n,
                    Err(ref e) if e.kind() == io::ErrorKind::Interrupted => (),
                    Err(e) => return Err(e.into()),
                }
            }
            let header = OfpHeader::parse(&buf)?;
            let mut body = vec![0; header.body_length()];
            self.stream.read_exact(&mut body)?;
            let msg = Message::parse(&header, &body).map(|(_, msg)| msg);
            Ok(Some((header.xid(), msg)))
        }

        fn send_message(&mut self, xid: u32, msg: Message) -> Result<(), FabricError> {
            let bytes = Message::marshal(xid, msg)?;
            self.stream.write_all(&bytes)?;
            self.stream.flush()?;
            Ok(())
        }

        fn check_target(&self, sw: SwitchId) -> Result<(), FabricError> {
            if self.switch == Some(sw) {
                Ok(())
            } else {
                Err(FabricError::NotConnected(sw))
            }
        }
    }

    impl<S: Read + Write> SwitchFabric for Connection<S> {
        fn send_flow_mod(&mut self, sw: SwitchId, xid: u32, flow_mod: FlowMod)
                         -> Result<(), FabricError> {
            self.check_target(sw)?;
            self.send_message(xid, Message::FlowMod(flow_mod))
        }

        fn send_packet_out(&mut self, sw: SwitchId, xid: u32, pkt: PacketOut)
                           -> Result<(), FabricError> {
            self.check_target(sw)?;
            self.send_message(xid, Message::PacketOut(pkt))
        }
    }
}
