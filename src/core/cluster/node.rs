// src/core/cluster/node.rs

//! A handle to one managed Redis process: a command channel bound to
//! `host:port` plus the node attributes cached from its last `CLUSTER NODES`
//! reply.

use crate::core::SlotwardError;
use crate::core::client::{
    RedisConn, RedisDialer, expect_keys, expect_ok, expect_simple, expect_text, reply_error,
};
use crate::core::cluster::attributes::{NodeAttributes, parse_cluster_nodes};
use crate::core::protocol::RespFrame;
use bytes::Bytes;
use std::sync::Arc;

/// Target state for `CLUSTER SETSLOT`.
#[derive(Debug, Clone, Copy)]
pub enum SetSlotState<'a> {
    /// The slot is being imported from the named node.
    Importing(&'a str),
    /// The slot is being migrated to the named node.
    Migrating(&'a str),
    /// The named node is the authoritative owner of the slot.
    Node(&'a str),
}

/// A bound Redis command client with cached node attributes.
///
/// The connection is opened lazily on the first command, so a handle for an
/// unreachable peer can exist without erroring until it is actually used.
/// Identity across passes is the node `id`, never the address: a restarted
/// process keeps its id via nodes.conf even when its IP changes.
pub struct NodeHandle {
    dialer: Arc<dyn RedisDialer>,
    conn: Option<Box<dyn RedisConn>>,
    host: String,
    port: u16,
    /// Attributes from the `myself` line of the last `CLUSTER NODES` reply.
    pub attrs: NodeAttributes,
    /// Ordinal parsed from the endpoint name, absent on handles built from gossip.
    pub ordinal: Option<u32>,
    /// Non-`myself` lines of the last `CLUSTER NODES` reply.
    peers: Vec<NodeAttributes>,
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("attrs", &self.attrs)
            .field("ordinal", &self.ordinal)
            .field("peers", &self.peers)
            .finish()
    }
}

impl NodeHandle {
    /// Binds a handle to an endpoint, immediately reading its `CLUSTER NODES`
    /// output to learn the node's own id, role and slots. Fails if no line is
    /// flagged `myself`.
    pub async fn connect(
        dialer: Arc<dyn RedisDialer>,
        host: &str,
        port: u16,
        ordinal: Option<u32>,
    ) -> Result<NodeHandle, SlotwardError> {
        let mut handle = NodeHandle::from_attributes(
            dialer,
            host,
            port,
            // Placeholder until the first refresh fills in the real attributes.
            NodeAttributes {
                id: String::new(),
                host: host.to_string(),
                port,
                flags: Default::default(),
                replicates: None,
                slots: Vec::new(),
            },
            ordinal,
        );
        handle.refresh().await?;
        Ok(handle)
    }

    /// Builds a handle from already-known attributes without touching the
    /// network. Used for gossip-discovered peers, which share the dialer of
    /// the handle that discovered them.
    pub fn from_attributes(
        dialer: Arc<dyn RedisDialer>,
        host: &str,
        port: u16,
        attrs: NodeAttributes,
        ordinal: Option<u32>,
    ) -> NodeHandle {
        NodeHandle {
            dialer,
            conn: None,
            host: host.to_string(),
            port,
            attrs,
            ordinal,
            peers: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.attrs.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Re-reads `CLUSTER NODES` and replaces the cached attributes. The bound
    /// address is preserved: a freshly started node may advertise an empty
    /// address until it has been met.
    pub async fn refresh(&mut self) -> Result<(), SlotwardError> {
        let raw = self.cluster_nodes().await?;
        let mut myself = None;
        let mut peers = Vec::new();
        for attrs in parse_cluster_nodes(&raw)? {
            if attrs.is_myself() {
                myself = Some(attrs);
            } else {
                peers.push(attrs);
            }
        }
        self.attrs = myself.ok_or_else(|| SlotwardError::MissingMyself(self.addr()))?;
        self.peers = peers;
        Ok(())
    }

    /// Returns a handle for every non-`myself` line of the latest
    /// `CLUSTER NODES` reply, bound to the line's advertised address.
    pub fn friends(&self) -> Vec<NodeHandle> {
        self.peers
            .iter()
            .map(|attrs| {
                NodeHandle::from_attributes(
                    self.dialer.clone(),
                    &attrs.host,
                    attrs.port,
                    attrs.clone(),
                    None,
                )
            })
            .collect()
    }

    async fn command(&mut self, frame: RespFrame) -> Result<RespFrame, SlotwardError> {
        if self.conn.is_none() {
            self.conn = Some(self.dialer.dial(&self.host, self.port).await?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(SlotwardError::Internal(format!(
                "no connection to {} after dialing",
                self.addr()
            )));
        };
        conn.exec(frame).await
    }

    pub async fn ping(&mut self) -> Result<(), SlotwardError> {
        let reply = self.command(RespFrame::command(["PING"])).await?;
        expect_simple(reply, "PING", &self.addr()).map(|_| ())
    }

    pub async fn cluster_nodes(&mut self) -> Result<String, SlotwardError> {
        let reply = self
            .command(RespFrame::command(["CLUSTER", "NODES"]))
            .await?;
        expect_text(reply, "CLUSTER NODES", &self.addr())
    }

    /// Introduces this node to the given peer (`CLUSTER MEET`). Idempotent on
    /// the Redis side: meeting an already-known peer replies `+OK`.
    pub async fn meet(&mut self, host: &str, port: u16) -> Result<(), SlotwardError> {
        let port = port.to_string();
        let reply = self
            .command(RespFrame::command(["CLUSTER", "MEET", host, port.as_str()]))
            .await?;
        expect_ok(reply, "CLUSTER MEET", &self.addr())
    }

    pub async fn cluster_addslots(&mut self, slots: &[u16]) -> Result<(), SlotwardError> {
        let mut parts = vec!["CLUSTER".to_string(), "ADDSLOTS".to_string()];
        parts.extend(slots.iter().map(|slot| slot.to_string()));
        let reply = self.command(RespFrame::command(parts)).await?;
        expect_ok(reply, "CLUSTER ADDSLOTS", &self.addr())
    }

    pub async fn cluster_replicate(&mut self, master_id: &str) -> Result<(), SlotwardError> {
        let reply = self
            .command(RespFrame::command(["CLUSTER", "REPLICATE", master_id]))
            .await?;
        expect_ok(reply, "CLUSTER REPLICATE", &self.addr())
    }

    /// Strips cluster state (id, peers, slot ownership) while preserving the
    /// keyspace, causing the node to rejoin as a standalone master.
    pub async fn cluster_reset_soft(&mut self) -> Result<(), SlotwardError> {
        let reply = self
            .command(RespFrame::command(["CLUSTER", "RESET", "SOFT"]))
            .await?;
        expect_ok(reply, "CLUSTER RESET SOFT", &self.addr())
    }

    pub async fn cluster_forget(&mut self, node_id: &str) -> Result<(), SlotwardError> {
        let reply = self
            .command(RespFrame::command(["CLUSTER", "FORGET", node_id]))
            .await?;
        expect_ok(reply, "CLUSTER FORGET", &self.addr())
    }

    pub async fn cluster_getkeysinslot(
        &mut self,
        slot: u16,
        count: usize,
    ) -> Result<Vec<Bytes>, SlotwardError> {
        let (slot, count) = (slot.to_string(), count.to_string());
        let reply = self
            .command(RespFrame::command([
                "CLUSTER",
                "GETKEYSINSLOT",
                slot.as_str(),
                count.as_str(),
            ]))
            .await?;
        expect_keys(reply, "CLUSTER GETKEYSINSLOT", &self.addr())
    }

    pub async fn cluster_setslot(
        &mut self,
        slot: u16,
        state: SetSlotState<'_>,
    ) -> Result<(), SlotwardError> {
        let (subcommand, node_id) = match state {
            SetSlotState::Importing(id) => ("IMPORTING", id),
            SetSlotState::Migrating(id) => ("MIGRATING", id),
            SetSlotState::Node(id) => ("NODE", id),
        };
        let slot = slot.to_string();
        let reply = self
            .command(RespFrame::command([
                "CLUSTER",
                "SETSLOT",
                slot.as_str(),
                subcommand,
                node_id,
            ]))
            .await?;
        expect_ok(reply, "CLUSTER SETSLOT", &self.addr())
    }

    /// Moves a batch of keys to the destination node. The empty key argument
    /// selects the `KEYS` form; `NOKEY` replies count as success, as a key may
    /// have expired between enumeration and migration.
    pub async fn migrate(
        &mut self,
        host: &str,
        port: u16,
        keys: &[Bytes],
        db_index: usize,
        timeout_ms: u64,
    ) -> Result<(), SlotwardError> {
        let mut parts: Vec<Bytes> = vec![
            Bytes::from_static(b"MIGRATE"),
            Bytes::copy_from_slice(host.as_bytes()),
            Bytes::copy_from_slice(port.to_string().as_bytes()),
            Bytes::new(),
            Bytes::copy_from_slice(db_index.to_string().as_bytes()),
            Bytes::copy_from_slice(timeout_ms.to_string().as_bytes()),
            Bytes::from_static(b"KEYS"),
        ];
        parts.extend(keys.iter().cloned());
        let reply = self.command(RespFrame::command(parts)).await?;
        match reply {
            RespFrame::SimpleString(s)
                if s.eq_ignore_ascii_case("OK") || s.eq_ignore_ascii_case("NOKEY") =>
            {
                Ok(())
            }
            other => Err(reply_error(other, "MIGRATE", &self.addr())),
        }
    }
}
