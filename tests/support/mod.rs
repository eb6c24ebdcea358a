// tests/support/mod.rs

//! Scripted Redis doubles shared by the unit tests. A `FakeDialer` hands out
//! connections whose replies come from per-address scripts, and records every
//! command issued so tests can assert on ordering and targeting.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use slotward::core::SlotwardError;
use slotward::core::client::{RedisConn, RedisDialer};
use slotward::core::cluster::attributes::{NodeAttributes, NodeFlags};
use slotward::core::cluster::node::NodeHandle;
use slotward::core::protocol::RespFrame;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Every command issued through the dialer, as `(addr, argv)`.
pub type CommandLog = Arc<Mutex<Vec<(String, Vec<String>)>>>;

/// Scripted behavior of one fake node.
#[derive(Debug, Default)]
pub struct NodeState {
    /// Successive `CLUSTER NODES` replies; the last one keeps repeating.
    pub cluster_nodes: VecDeque<String>,
    /// Successive `CLUSTER GETKEYSINSLOT` replies; empty once drained.
    pub keys_in_slot: VecDeque<Vec<String>>,
    /// When set, `PING` fails instead of answering `+PONG`.
    pub fail_ping: bool,
}

pub struct FakeDialer {
    nodes: Mutex<HashMap<String, Arc<Mutex<NodeState>>>>,
    dead: Mutex<HashSet<String>>,
    pub log: CommandLog,
}

impl FakeDialer {
    pub fn new() -> Arc<FakeDialer> {
        Arc::new(FakeDialer {
            nodes: Mutex::new(HashMap::new()),
            dead: Mutex::new(HashSet::new()),
            log: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Registers (or replaces) the script for `addr`.
    pub fn script(&self, addr: &str, state: NodeState) {
        self.nodes
            .lock()
            .unwrap()
            .insert(addr.to_string(), Arc::new(Mutex::new(state)));
    }

    /// Marks `addr` as unreachable: dialing it fails.
    pub fn kill(&self, addr: &str) {
        self.dead.lock().unwrap().insert(addr.to_string());
    }

    /// The argv of every command issued against `addr`, in order.
    pub fn commands_on(&self, addr: &str) -> Vec<Vec<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == addr)
            .map(|(_, argv)| argv.clone())
            .collect()
    }

    /// Every `(addr, argv)` pair whose command name matches, in issue order.
    pub fn commands_named(&self, name: &str) -> Vec<(String, Vec<String>)> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, argv)| argv_name(argv) == name)
            .cloned()
            .collect()
    }
}

/// The command name of an argv: `CLUSTER` commands include the subcommand.
pub fn argv_name(argv: &[String]) -> String {
    match argv {
        [first, second, ..] if first == "CLUSTER" => format!("CLUSTER {second}"),
        [first, ..] => first.clone(),
        [] => String::new(),
    }
}

#[async_trait]
impl RedisDialer for FakeDialer {
    async fn dial(&self, host: &str, port: u16) -> Result<Box<dyn RedisConn>, SlotwardError> {
        let addr = format!("{host}:{port}");
        if self.dead.lock().unwrap().contains(&addr) {
            return Err(SlotwardError::Timeout(format!("connect to {addr}")));
        }
        let state = self
            .nodes
            .lock()
            .unwrap()
            .entry(addr.clone())
            .or_default()
            .clone();
        Ok(Box::new(FakeConn {
            addr,
            state,
            log: self.log.clone(),
        }))
    }
}

struct FakeConn {
    addr: String,
    state: Arc<Mutex<NodeState>>,
    log: CommandLog,
}

#[async_trait]
impl RedisConn for FakeConn {
    async fn exec(&mut self, frame: RespFrame) -> Result<RespFrame, SlotwardError> {
        let argv = flatten(&frame);
        self.log
            .lock()
            .unwrap()
            .push((self.addr.clone(), argv.clone()));

        let mut state = self.state.lock().unwrap();
        let reply = match argv_name(&argv).as_str() {
            "PING" => {
                if state.fail_ping {
                    return Err(SlotwardError::Timeout(format!("PING {}", self.addr)));
                }
                RespFrame::SimpleString("PONG".to_string())
            }
            "CLUSTER NODES" => {
                let raw = if state.cluster_nodes.len() > 1 {
                    state.cluster_nodes.pop_front().unwrap_or_default()
                } else {
                    state.cluster_nodes.front().cloned().unwrap_or_default()
                };
                RespFrame::BulkString(Bytes::from(raw))
            }
            "CLUSTER GETKEYSINSLOT" => {
                let keys = state.keys_in_slot.pop_front().unwrap_or_default();
                RespFrame::Array(
                    keys.into_iter()
                        .map(|k| RespFrame::BulkString(Bytes::from(k)))
                        .collect(),
                )
            }
            _ => RespFrame::SimpleString("OK".to_string()),
        };
        Ok(reply)
    }
}

fn flatten(frame: &RespFrame) -> Vec<String> {
    match frame {
        RespFrame::Array(parts) => parts
            .iter()
            .map(|part| match part {
                RespFrame::BulkString(b) => String::from_utf8_lossy(b).to_string(),
                other => other.describe(),
            })
            .collect(),
        other => vec![other.describe()],
    }
}

/// Joins `CLUSTER NODES` lines the way Redis renders them, trailing newline
/// included.
pub fn nodes_reply<S: AsRef<str>>(lines: &[S]) -> String {
    let mut raw = lines
        .iter()
        .map(|line| line.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    raw.push('\n');
    raw
}

/// Builds a master handle without touching the network.
pub fn master_handle(
    dialer: &Arc<FakeDialer>,
    id: &str,
    host: &str,
    port: u16,
    ordinal: Option<u32>,
    slots: Vec<u16>,
) -> NodeHandle {
    let attrs = NodeAttributes {
        id: id.to_string(),
        host: host.to_string(),
        port,
        flags: NodeFlags::MASTER,
        replicates: None,
        slots,
    };
    NodeHandle::from_attributes(dialer.clone() as Arc<dyn RedisDialer>, host, port, attrs, ordinal)
}

/// Builds a replica handle without touching the network.
pub fn replica_handle(
    dialer: &Arc<FakeDialer>,
    id: &str,
    host: &str,
    port: u16,
    ordinal: Option<u32>,
    master_id: &str,
) -> NodeHandle {
    let attrs = NodeAttributes {
        id: id.to_string(),
        host: host.to_string(),
        port,
        flags: NodeFlags::REPLICA,
        replicates: Some(master_id.to_string()),
        slots: Vec::new(),
    };
    NodeHandle::from_attributes(dialer.clone() as Arc<dyn RedisDialer>, host, port, attrs, ordinal)
}
