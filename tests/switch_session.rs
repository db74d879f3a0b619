mod common;

use std::net::Ipv4Addr;

use chain_ofp::decision::{CHAIN_RULE, LEARNING_RULE};
use chain_ofp::error::FabricError;
use chain_ofp::openflow0x01::{Action, Payload, PseudoPort, Timeout};
use chain_ofp::packet::MacAddr;
use chain_ofp::{ChainPolicy, ForwardingDecision, SwitchSession};
use pretty_assertions::assert_eq;

use common::*;

fn output(port: u16) -> Vec<Action> {
    vec![Action::Output(PseudoPort::PhysicalPort(port))]
}

#[test]
fn floods_unknown_destination_then_installs_learned_route() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();

    let decision = session.packet_in(1, &unbuffered(3, arp_frame(mac(0xa), mac(0xb))), &mut fabric)
        .unwrap();
    assert_eq!(decision, Some(ForwardingDecision::Flood));
    let sent = fabric.take();
    assert_eq!(sent.len(), 1);
    match sent[0] {
        Sent::PacketOut(sw, ref po) => {
            assert_eq!(sw, ENTRY);
            assert_eq!(po.port_id, Some(3));
            assert_eq!(po.apply_actions, vec![Action::Output(PseudoPort::AllPorts)]);
        }
        ref other => panic!("expected a flood, got {:?}", other),
    }

    let decision = session.packet_in(2, &buffered(7, 42, arp_frame(mac(0xb), mac(0xa))), &mut fabric)
        .unwrap();
    assert_eq!(decision,
               Some(ForwardingDecision::Forward {
                   port: 3,
                   rule: LEARNING_RULE,
               }));
    let sent = fabric.take();
    assert_eq!(sent.len(), 1);
    match sent[0] {
        Sent::FlowMod(sw, ref fm) => {
            assert_eq!(sw, ENTRY);
            assert_eq!(fm.actions, output(3));
            assert_eq!(fm.priority, 1);
            assert_eq!(fm.idle_timeout, Timeout::ExpiresAfter(350));
            assert_eq!(fm.hard_timeout, Timeout::Permanent);
            assert_eq!(fm.apply_to_packet, Some(42));
            assert_eq!(fm.pattern.in_port, Some(7));
            assert_eq!(fm.pattern.dl_src, Some(MacAddr(mac(0xb))));
            assert_eq!(fm.pattern.dl_dst, Some(MacAddr(mac(0xa))));
        }
        ref other => panic!("expected a flow rule, got {:?}", other),
    }

    let table = session.address_table();
    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup(&MacAddr(mac(0xa))), Some(3));
    assert_eq!(table.lookup(&MacAddr(mac(0xb))), Some(7));
}

#[test]
fn unbuffered_forward_also_resends_the_packet() {
    let mut session = SwitchSession::new(RETURN, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();
    session.packet_in(1, &unbuffered(4, arp_frame(mac(0xb), mac(0xa))), &mut fabric).unwrap();
    fabric.take();

    let frame = arp_frame(mac(0xa), mac(0xb));
    session.packet_in(2, &unbuffered(2, frame.clone()), &mut fabric).unwrap();
    let sent = fabric.take();
    assert_eq!(sent.len(), 2);
    match (&sent[0], &sent[1]) {
        (&Sent::FlowMod(_, ref fm), &Sent::PacketOut(_, ref po)) => {
            assert_eq!(fm.apply_to_packet, None);
            assert_eq!(fm.actions, output(4));
            assert_eq!(po.output_payload, Payload::NotBuffered(frame));
            assert_eq!(po.apply_actions, output(4));
        }
        other => panic!("unexpected instructions {:?}", other),
    }
}

#[test]
fn entry_switch_steers_each_source_onto_its_chain() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();

    for &(src, port) in [(Ipv4Addr::new(10, 0, 1, 1), 1), (Ipv4Addr::new(10, 0, 2, 1), 2)].iter() {
        let pkt = buffered(3, 8, udp_frame(mac(0xa), mac(0xb), src));
        let decision = session.packet_in(1, &pkt, &mut fabric).unwrap();
        assert_eq!(decision,
                   Some(ForwardingDecision::Forward {
                       port: port,
                       rule: CHAIN_RULE,
                   }));
        match fabric.take().as_slice() {
            [Sent::FlowMod(_, fm)] => {
                assert_eq!(fm.actions, output(port));
                assert_eq!(fm.idle_timeout, Timeout::ExpiresAfter(360));
                assert_eq!(fm.pattern.nw_src, Some(src));
                assert_eq!(fm.pattern.dl_typ, Some(0x0800));
            }
            other => panic!("unexpected instructions {:?}", other),
        }
    }
    assert!(session.address_table().is_empty());
}

#[test]
fn unmapped_source_installs_a_drop_rule() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();
    let pkt = buffered(3, 8, udp_frame(mac(0xa), mac(0xb), Ipv4Addr::new(10, 0, 7, 7)));

    let decision = session.packet_in(1, &pkt, &mut fabric).unwrap();
    assert_eq!(decision, Some(ForwardingDecision::Drop { rule: CHAIN_RULE }));
    match fabric.take().as_slice() {
        [Sent::FlowMod(_, fm)] => {
            assert!(fm.actions.is_empty());
            assert_eq!(fm.idle_timeout, Timeout::ExpiresAfter(360));
        }
        other => panic!("unexpected instructions {:?}", other),
    }
}

#[test]
fn interior_and_return_switches_follow_the_chain() {
    let policy = ChainPolicy {
        next_hop_port: 2,
        return_port: Some(6),
        ..ChainPolicy::default()
    };
    let engine = engine(policy);
    let mut fabric = RecordingFabric::default();
    let pkt = buffered(1, 8, udp_frame(mac(0xa), mac(0xb), Ipv4Addr::new(10, 0, 1, 1)));

    let mut interior = SwitchSession::new(INTERIOR, engine.clone());
    assert_eq!(interior.packet_in(1, &pkt, &mut fabric).unwrap(),
               Some(ForwardingDecision::Forward {
                   port: 2,
                   rule: CHAIN_RULE,
               }));

    let mut ret = SwitchSession::new(RETURN, engine);
    assert_eq!(ret.packet_in(1, &pkt, &mut fabric).unwrap(),
               Some(ForwardingDecision::Forward {
                   port: 6,
                   rule: CHAIN_RULE,
               }));
    assert_eq!(fabric.take().len(), 2);
}

#[test]
fn non_ip_on_interior_switch_is_dropped() {
    let mut session = SwitchSession::new(INTERIOR, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();
    let decision = session.packet_in(1, &buffered(2, 1, arp_frame(mac(0xa), mac(0xb))), &mut fabric)
        .unwrap();
    assert_eq!(decision, Some(ForwardingDecision::Drop { rule: LEARNING_RULE }));
    assert!(session.address_table().is_empty());
    match fabric.take().as_slice() {
        [Sent::FlowMod(_, fm)] => assert!(fm.actions.is_empty()),
        other => panic!("unexpected instructions {:?}", other),
    }
}

#[test]
fn repeated_packet_in_yields_identical_instructions() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();
    session.packet_in(1, &buffered(5, 1, arp_frame(mac(0xb), mac(0xa))), &mut fabric).unwrap();
    fabric.take();

    let pkt = buffered(3, 2, arp_frame(mac(0xa), mac(0xb)));
    session.packet_in(2, &pkt, &mut fabric).unwrap();
    let first = fabric.take();
    session.packet_in(2, &pkt, &mut fabric).unwrap();
    let second = fabric.take();
    assert_eq!(first, second);
    assert_eq!(session.address_table().len(), 2);
}

#[test]
fn sessions_do_not_share_learned_addresses() {
    let engine = engine(ChainPolicy::default());
    let mut entry = SwitchSession::new(ENTRY, engine.clone());
    let mut ret = SwitchSession::new(RETURN, engine);
    let mut fabric = RecordingFabric::default();

    entry.packet_in(1, &buffered(4, 1, arp_frame(mac(0xb), mac(0xa))), &mut fabric).unwrap();
    let decision = ret.packet_in(1, &buffered(2, 2, arp_frame(mac(0xa), mac(0xb))), &mut fabric)
        .unwrap();
    assert_eq!(decision, Some(ForwardingDecision::Flood));
    assert_eq!(entry.address_table().lookup(&MacAddr(mac(0xb))), Some(4));
    assert_eq!(ret.address_table().lookup(&MacAddr(mac(0xb))), None);
}

#[test]
fn malformed_packet_is_ignored() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let mut fabric = RecordingFabric::default();

    let mut frame = arp_frame(mac(0xa), mac(0xb));
    frame.truncate(20);
    assert_eq!(session.packet_in(1, &unbuffered(3, frame), &mut fabric).unwrap(), None);
    assert_eq!(session.packet_in(1, &unbuffered(3, vec![0; 6]), &mut fabric).unwrap(), None);
    assert!(fabric.sent.is_empty());
    assert!(session.address_table().is_empty());
}

#[test]
fn send_failure_is_reported_and_learning_is_kept() {
    let mut session = SwitchSession::new(ENTRY, engine(ChainPolicy::default()));
    let result = session.packet_in(1, &unbuffered(3, arp_frame(mac(0xa), mac(0xb))), &mut FailingFabric);
    match result {
        Err(FabricError::Io(ref e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(session.address_table().lookup(&MacAddr(mac(0xa))), Some(3));
}
