use std::sync::Arc;

use tracing::{debug, info_span, warn, Span};

use crate::address_table::AddressTable;
use crate::decision::{FlowDecisionEngine, ForwardingDecision, Role, RuleSettings};
use crate::error::FabricError;
use crate::ofp_controller::{SwitchFabric, SwitchId};
use crate::openflow0x01::message::{add_flow, parse_payload};
use crate::openflow0x01::{Action, FlowMod, PacketIn, PacketOut, Pattern, PseudoPort, Timeout};

/// Controller state for one connected switch.
///
/// Owns the switch's address table; the decision engine is shared. A session
/// lives exactly as long as the switch connection and handles one packet-in at
/// a time.
pub struct SwitchSession {
    switch: SwitchId,
    role: Role,
    table: AddressTable,
    engine: Arc<FlowDecisionEngine>,
    span: Span,
}

impl SwitchSession {
    pub fn new(switch: SwitchId, engine: Arc<FlowDecisionEngine>) -> SwitchSession {
        let role = engine.role_of(switch);
        SwitchSession {
            switch: switch,
            role: role,
            table: AddressTable::new(),
            engine: engine,
            span: info_span!("switch", dpid = %switch, %role),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address_table(&self) -> &AddressTable {
        &self.table
    }

    /// Handle a packet-in: decide, then install a rule and/or resend the packet.
    ///
    /// Returns the decision taken, or `None` when the packet could not be
    /// parsed (nothing is sent and nothing is learned in that case). A send
    /// failure is returned as is; whatever was learned from the packet stays.
    pub fn packet_in<F: SwitchFabric>(&mut self,
                                      xid: u32,
                                      pkt: &PacketIn,
                                      fabric: &mut F)
                                      -> Result<Option<ForwardingDecision>, FabricError> {
        let _enter = self.span.enter();
        let packet = match parse_payload(&pkt.input_payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(in_port = pkt.port, error = %e, "ignoring incomplete packet");
                return Ok(None);
            }
        };
        let (decision, pattern) =
            self.engine.decide_for_role(self.role, &packet, pkt.port, &mut self.table);

        match decision {
            ForwardingDecision::Forward { port, rule } => {
                let actions = vec![Action::Output(PseudoPort::PhysicalPort(port))];
                debug!(src = %packet.dl_src, dst = %packet.dl_dst, out_port = port,
                       idle_timeout = rule.idle_timeout, "installing flow");
                fabric.send_flow_mod(self.switch,
                                     xid,
                                     self.flow_rule(pkt, pattern, actions.clone(), rule))?;
                if pkt.input_payload.buffer_id().is_none() {
                    fabric.send_packet_out(self.switch, xid, self.resend(pkt, actions))?;
                }
            }
            ForwardingDecision::Drop { rule } => {
                debug!(src = %packet.dl_src, dst = %packet.dl_dst, "installing drop flow");
                fabric.send_flow_mod(self.switch, xid, self.flow_rule(pkt, pattern, vec![], rule))?;
            }
            ForwardingDecision::Flood => {
                debug!(dst = %packet.dl_dst, known_hosts = self.table.len(), "flooding");
                let flood = vec![Action::Output(PseudoPort::AllPorts)];
                fabric.send_packet_out(self.switch, xid, self.resend(pkt, flood))?;
            }
        }
        Ok(Some(decision))
    }

    /// A rule matching `pattern`, applied to the triggering packet when the
    /// switch buffered it.
    fn flow_rule(&self,
                 pkt: &PacketIn,
                 pattern: Pattern,
                 actions: Vec<Action>,
                 rule: RuleSettings)
                 -> FlowMod {
        let mut flow_mod = add_flow(rule.priority, pattern, actions);
        flow_mod.idle_timeout = Timeout::of_int(rule.idle_timeout);
        flow_mod.apply_to_packet = pkt.input_payload.buffer_id();
        flow_mod
    }

    fn resend(&self, pkt: &PacketIn, actions: Vec<Action>) -> PacketOut {
        PacketOut {
            output_payload: pkt.input_payload.clone(),
            port_id: Some(pkt.port),
            apply_actions: actions,
        }
    }
}
