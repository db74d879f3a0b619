//! Per-packet forwarding decisions.
//!
//! Non-IPv4 traffic is handled as a learning switch on the switches that face
//! hosts. IPv4 traffic is steered along a static service chain: the entry
//! switch picks a chain by source address, every other switch forwards to its
//! next hop.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address_table::AddressTable;
use crate::ofp_controller::SwitchId;
use crate::openflow0x01::Pattern;
use crate::packet::{Ip, Packet};

/// Position of a switch in the deployment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Where traffic enters the chain; picks the chain by IPv4 source.
    Entry,
    /// A hop inside the chain.
    Interior,
    /// Where chain output rejoins the outside network.
    Return,
    /// Not part of the deployment; all traffic is dropped.
    Unmanaged,
}

impl Role {
    /// Whether non-IPv4 traffic is switched (rather than dropped) here.
    pub fn learns(&self) -> bool {
        match *self {
            Role::Entry | Role::Return => true,
            Role::Interior | Role::Unmanaged => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Role::Entry => "entry",
            Role::Interior => "interior",
            Role::Return => "return",
            Role::Unmanaged => "unmanaged",
        })
    }
}

/// Static assignment of roles to switches, with a fallback for switches that
/// are not listed.
#[derive(Clone, Debug)]
pub struct RoleTable {
    roles: HashMap<SwitchId, Role>,
    default_role: Role,
}

impl RoleTable {
    pub fn new(default_role: Role) -> RoleTable {
        RoleTable {
            roles: HashMap::new(),
            default_role: default_role,
        }
    }

    /// Assign `role` to `sw`, returning the role it previously had, if any.
    pub fn assign(&mut self, sw: SwitchId, role: Role) -> Option<Role> {
        self.roles.insert(sw, role)
    }

    pub fn role_of(&self, sw: SwitchId) -> Role {
        self.roles.get(&sw).cloned().unwrap_or(self.default_role)
    }
}

/// Idle timeout and priority of an installed flow rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    pub idle_timeout: u16,
    pub priority: u16,
}

pub const LEARNING_RULE: RuleSettings = RuleSettings {
    idle_timeout: 350,
    priority: 1,
};

pub const CHAIN_RULE: RuleSettings = RuleSettings {
    idle_timeout: 360,
    priority: 1,
};

/// What to do with a packet.
///
/// `Forward` and `Drop` install a flow rule so the switch handles the rest of
/// the flow itself. `Flood` is a one-shot resend and installs nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ForwardingDecision {
    Flood,
    Forward { port: u16, rule: RuleSettings },
    Drop { rule: RuleSettings },
}

impl ForwardingDecision {
    pub fn installs_rule(&self) -> bool {
        self.rule().is_some()
    }

    pub fn rule(&self) -> Option<RuleSettings> {
        match *self {
            ForwardingDecision::Flood => None,
            ForwardingDecision::Forward { rule, .. } |
            ForwardingDecision::Drop { rule } => Some(rule),
        }
    }
}

/// Service chain policy applied to IPv4 traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainPolicy {
    /// Entry-switch output port that starts the chain for each known source.
    pub entry_ports: HashMap<Ipv4Addr, u16>,
    /// Port every interior hop forwards chain traffic on.
    pub next_hop_port: u16,
    /// Port return switches send chain output on. When unset, return switches
    /// forward like interior hops.
    pub return_port: Option<u16>,
    pub learning_rule: RuleSettings,
    pub chain_rule: RuleSettings,
}

impl Default for ChainPolicy {
    fn default() -> ChainPolicy {
        let mut entry_ports = HashMap::new();
        entry_ports.insert(Ipv4Addr::new(10, 0, 1, 1), 1);
        entry_ports.insert(Ipv4Addr::new(10, 0, 2, 1), 2);
        ChainPolicy {
            entry_ports: entry_ports,
            next_hop_port: 1,
            return_port: None,
            learning_rule: LEARNING_RULE,
            chain_rule: CHAIN_RULE,
        }
    }
}

/// Classifies packet-ins into forwarding decisions.
///
/// The engine holds only configuration; per-switch state lives in the
/// `AddressTable` passed to each call, so one engine is shared by all sessions.
#[derive(Clone, Debug)]
pub struct FlowDecisionEngine {
    policy: ChainPolicy,
    roles: RoleTable,
}

impl FlowDecisionEngine {
    pub fn new(policy: ChainPolicy, roles: RoleTable) -> FlowDecisionEngine {
        FlowDecisionEngine {
            policy: policy,
            roles: roles,
        }
    }

    pub fn role_of(&self, sw: SwitchId) -> Role {
        self.roles.role_of(sw)
    }

    /// Decide what `sw` should do with `pkt`, received on `in_port`.
    ///
    /// Returns the decision together with the exact match for the packet,
    /// which is the match of any rule the decision installs.
    pub fn decide(&self,
                  sw: SwitchId,
                  pkt: &Packet,
                  in_port: u16,
                  table: &mut AddressTable)
                  -> (ForwardingDecision, Pattern) {
        self.decide_for_role(self.role_of(sw), pkt, in_port, table)
    }

    /// Like `decide`, for a switch whose role has already been resolved.
    pub fn decide_for_role(&self,
                           role: Role,
                           pkt: &Packet,
                           in_port: u16,
                           table: &mut AddressTable)
                           -> (ForwardingDecision, Pattern) {
        let decision = match pkt.ipv4() {
            Some(ip) => self.chain_route(role, ip),
            None if role.learns() => self.learn_and_switch(pkt, in_port, table),
            None => ForwardingDecision::Drop { rule: self.policy.learning_rule },
        };
        debug!(%role, src = %pkt.dl_src, dst = %pkt.dl_dst, in_port, ?decision, "decided");
        (decision, Pattern::exact(in_port, pkt))
    }

    fn learn_and_switch(&self,
                        pkt: &Packet,
                        in_port: u16,
                        table: &mut AddressTable)
                        -> ForwardingDecision {
        table.observe(pkt.dl_src, in_port);
        match table.lookup(&pkt.dl_dst) {
            Some(port) => {
                ForwardingDecision::Forward {
                    port: port,
                    rule: self.policy.learning_rule,
                }
            }
            None => ForwardingDecision::Flood,
        }
    }

    fn chain_route(&self, role: Role, ip: &Ip) -> ForwardingDecision {
        let rule = self.policy.chain_rule;
        match role {
            Role::Entry => {
                match self.policy.entry_ports.get(&ip.src) {
                    Some(&port) => ForwardingDecision::Forward {
                        port: port,
                        rule: rule,
                    },
                    None => {
                        warn!(src = %ip.src, "no chain configured for source, dropping flow");
                        ForwardingDecision::Drop { rule: rule }
                    }
                }
            }
            Role::Return => {
                ForwardingDecision::Forward {
                    port: self.policy.return_port.unwrap_or(self.policy.next_hop_port),
                    rule: rule,
                }
            }
            Role::Interior => {
                ForwardingDecision::Forward {
                    port: self.policy.next_hop_port,
                    rule: rule,
                }
            }
            Role::Unmanaged => ForwardingDecision::Drop { rule: rule },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Arp, MacAddr, Nw, Tp, Udp};
    use pretty_assertions::assert_eq;

    const A: MacAddr = MacAddr([0, 0, 0, 0, 0, 0x0a]);
    const B: MacAddr = MacAddr([0, 0, 0, 0, 0, 0x0b]);

    fn arp(src: MacAddr, dst: MacAddr) -> Packet {
        Packet {
            dl_src: src,
            dl_dst: dst,
            dl_vlan: None,
            dl_vlan_dei: false,
            dl_vlan_pcp: 0,
            nw: Nw::Arp(Arp::Query(src, Ipv4Addr::new(10, 0, 1, 1), Ipv4Addr::new(10, 0, 2, 1))),
        }
    }

    fn udp_from(src: Ipv4Addr) -> Packet {
        Packet {
            dl_src: A,
            dl_dst: B,
            dl_vlan: None,
            dl_vlan_dei: false,
            dl_vlan_pcp: 0,
            nw: Nw::Ip(Ip {
                tos: 0,
                ident: 1,
                ttl: 64,
                proto: 0x11,
                src: src,
                dst: Ipv4Addr::new(10, 0, 3, 1),
                tp: Tp::Udp(Udp {
                    src: 4000,
                    dst: 5001,
                }),
            }),
        }
    }

    fn engine_with(policy: ChainPolicy) -> FlowDecisionEngine {
        let mut roles = RoleTable::new(Role::Interior);
        roles.assign(SwitchId(1), Role::Entry);
        roles.assign(SwitchId(5), Role::Return);
        roles.assign(SwitchId(9), Role::Unmanaged);
        FlowDecisionEngine::new(policy, roles)
    }

    fn engine() -> FlowDecisionEngine {
        engine_with(ChainPolicy::default())
    }

    fn forward(port: u16, rule: RuleSettings) -> ForwardingDecision {
        ForwardingDecision::Forward {
            port: port,
            rule: rule,
        }
    }

    #[test]
    fn learning_floods_unknown_then_forwards_learned() {
        let engine = engine();
        let mut table = AddressTable::new();

        let (decision, _) = engine.decide(SwitchId(1), &arp(A, B), 3, &mut table);
        assert_eq!(decision, ForwardingDecision::Flood);
        assert!(!decision.installs_rule());

        let (decision, pattern) = engine.decide(SwitchId(1), &arp(B, A), 7, &mut table);
        assert_eq!(decision, forward(3, LEARNING_RULE));
        assert!(decision.installs_rule());
        assert_eq!(pattern.in_port, Some(7));
        assert_eq!(pattern.dl_src, Some(B));
        assert_eq!(pattern.dl_dst, Some(A));
        assert_eq!(table.lookup(&B), Some(7));
    }

    #[test]
    fn return_switch_also_learns() {
        let engine = engine();
        let mut table = AddressTable::new();
        engine.decide(SwitchId(5), &arp(A, B), 2, &mut table);
        assert_eq!(table.lookup(&A), Some(2));
    }

    #[test]
    fn non_ip_on_chain_hops_is_dropped_without_learning() {
        let engine = engine();
        for sw in [SwitchId(2), SwitchId(9)].iter() {
            let mut table = AddressTable::new();
            let (decision, _) = engine.decide(*sw, &arp(A, B), 1, &mut table);
            assert_eq!(decision, ForwardingDecision::Drop { rule: LEARNING_RULE });
            assert!(table.is_empty());
        }
    }

    #[test]
    fn entry_switch_picks_chain_by_source() {
        let engine = engine();
        let mut table = AddressTable::new();

        let (decision, pattern) =
            engine.decide(SwitchId(1), &udp_from(Ipv4Addr::new(10, 0, 1, 1)), 3, &mut table);
        assert_eq!(decision, forward(1, CHAIN_RULE));
        assert_eq!(pattern.nw_src, Some(Ipv4Addr::new(10, 0, 1, 1)));
        assert_eq!(pattern.tp_dst, Some(5001));

        let (decision, _) =
            engine.decide(SwitchId(1), &udp_from(Ipv4Addr::new(10, 0, 2, 1)), 3, &mut table);
        assert_eq!(decision, forward(2, CHAIN_RULE));

        assert!(table.is_empty());
    }

    #[test]
    fn unmapped_source_at_entry_is_dropped() {
        let engine = engine();
        let mut table = AddressTable::new();
        let (decision, _) =
            engine.decide(SwitchId(1), &udp_from(Ipv4Addr::new(10, 0, 9, 9)), 3, &mut table);
        assert_eq!(decision, ForwardingDecision::Drop { rule: CHAIN_RULE });
        assert!(decision.installs_rule());
    }

    #[test]
    fn interior_forwards_to_next_hop_regardless_of_source() {
        let engine = engine_with(ChainPolicy {
            next_hop_port: 3,
            ..ChainPolicy::default()
        });
        let mut table = AddressTable::new();
        for src in [Ipv4Addr::new(10, 0, 1, 1), Ipv4Addr::new(10, 0, 9, 9)].iter() {
            let (decision, _) = engine.decide(SwitchId(3), &udp_from(*src), 2, &mut table);
            assert_eq!(decision, forward(3, CHAIN_RULE));
        }
    }

    #[test]
    fn return_switch_uses_return_port_only_when_configured() {
        let pkt = udp_from(Ipv4Addr::new(10, 0, 3, 1));
        let mut table = AddressTable::new();

        let (decision, _) = engine().decide(SwitchId(5), &pkt, 1, &mut table);
        assert_eq!(decision, forward(1, CHAIN_RULE));

        let engine = engine_with(ChainPolicy {
            return_port: Some(4),
            ..ChainPolicy::default()
        });
        let (decision, _) = engine.decide(SwitchId(5), &pkt, 1, &mut table);
        assert_eq!(decision, forward(4, CHAIN_RULE));
    }

    #[test]
    fn unmanaged_switch_drops_ip() {
        let (decision, _) = engine().decide(SwitchId(9),
                                            &udp_from(Ipv4Addr::new(10, 0, 1, 1)),
                                            1,
                                            &mut AddressTable::new());
        assert_eq!(decision, ForwardingDecision::Drop { rule: CHAIN_RULE });
    }

    #[test]
    fn repeated_packets_get_the_same_decision() {
        let engine = engine();
        let mut table = AddressTable::new();
        engine.decide(SwitchId(1), &arp(B, A), 4, &mut table);

        let first = engine.decide(SwitchId(1), &arp(A, B), 3, &mut table);
        let second = engine.decide(SwitchId(1), &arp(A, B), 3, &mut table);
        assert_eq!(first, second);
        assert_eq!(first.0, forward(4, LEARNING_RULE));

        let pkt = udp_from(Ipv4Addr::new(10, 0, 2, 1));
        assert_eq!(engine.decide(SwitchId(1), &pkt, 3, &mut table),
                   engine.decide(SwitchId(1), &pkt, 3, &mut table));
    }

    #[test]
    fn role_table_falls_back_to_default() {
        let mut roles = RoleTable::new(Role::Unmanaged);
        assert_eq!(roles.assign(SwitchId(1), Role::Entry), None);
        assert_eq!(roles.assign(SwitchId(1), Role::Return), Some(Role::Entry));
        assert_eq!(roles.role_of(SwitchId(1)), Role::Return);
        assert_eq!(roles.role_of(SwitchId(2)), Role::Unmanaged);
    }
}
