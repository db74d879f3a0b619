use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::decision::FlowDecisionEngine;
use crate::error::SessionError;
use crate::ofp_controller::{OfpController, SwitchFabric, SwitchId};
use crate::openflow0x01::{PacketIn, SwitchFeatures};
use crate::session::SwitchSession;

/// Learning switch with service-chain steering.
///
/// Keeps one `SwitchSession` per connected switch. Sessions are created when a
/// switch connects and dropped, along with everything they learned, when it
/// disconnects.
pub struct ChainController {
    engine: Arc<FlowDecisionEngine>,
    sessions: HashMap<SwitchId, SwitchSession>,
}

impl ChainController {
    pub fn new(engine: Arc<FlowDecisionEngine>) -> ChainController {
        ChainController {
            engine: engine,
            sessions: HashMap::new(),
        }
    }

    pub fn session(&self, sw: SwitchId) -> Option<&SwitchSession> {
        self.sessions.get(&sw)
    }

    pub fn num_sessions(&self) -> usize {
        self.sessions.len()
    }
}

impl OfpController for ChainController {
    fn switch_connected(&mut self, sw: SwitchId, _: &SwitchFeatures) {
        let session = SwitchSession::new(sw, self.engine.clone());
        info!(dpid = %sw, role = %session.role(), "controlling switch");
        if self.sessions.insert(sw, session).is_some() {
            debug!(dpid = %sw, "replaced stale session");
        }
    }

    fn switch_disconnected(&mut self, sw: SwitchId) {
        if let Some(session) = self.sessions.remove(&sw) {
            debug!(dpid = %sw,
                   known_hosts = session.address_table().len(),
                   "dropping session");
        }
    }

    fn packet_in<F: SwitchFabric>(&mut self,
                                  sw: SwitchId,
                                  xid: u32,
                                  pkt: &PacketIn,
                                  fabric: &mut F)
                                  -> Result<(), SessionError> {
        let session = self.sessions.get_mut(&sw).ok_or(SessionError::UnknownSwitch(sw))?;
        session.packet_in(xid, pkt, fabric)?;
        Ok(())
    }
}
