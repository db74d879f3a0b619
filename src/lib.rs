#![crate_name = "chain_ofp"]
#![crate_type = "lib"]

pub mod address_table;
pub mod config;
pub mod controller;
pub mod decision;
pub mod error;
pub mod ofp_controller;
pub mod ofp_header;
pub mod ofp_message;
pub mod openflow0x01;
pub mod packet;
pub mod session;

pub use crate::address_table::AddressTable;
pub use crate::config::ControllerConfig;
pub use crate::controller::ChainController;
pub use crate::decision::{ChainPolicy, FlowDecisionEngine, ForwardingDecision, Role, RoleTable,
                          RuleSettings};
pub use crate::ofp_controller::{OfpController, SwitchFabric, SwitchId};
pub use crate::session::SwitchSession;
