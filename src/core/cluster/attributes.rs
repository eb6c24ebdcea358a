// src/core/cluster/attributes.rs

//! Decodes the `CLUSTER NODES` wire format into a typed node model.
//!
//! One line per node, space-separated fields:
//!
//! ```text
//! <id> <ip:port@cport> <flags(csv)> <masterId|-> <ping-sent> <pong-recv> <epoch> <link-state> [slot-token ...]
//! ```

use crate::core::SlotwardError;
use bitflags::bitflags;

/// The total number of hash slots in a Redis cluster.
pub const SLOT_COUNT: usize = 16384;

/// The number of mandatory fields before the slot tokens begin.
const FIXED_FIELDS: usize = 8;

bitflags! {
    /// Flags reported for a node on its `CLUSTER NODES` line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u16 {
        const MYSELF    = 1 << 0; // The line describes the node answering the query.
        const MASTER    = 1 << 1;
        const REPLICA   = 1 << 2; // Reported on the wire as "slave".
        const PFAIL     = 1 << 3; // Possible failure ("fail?"), unconfirmed.
        const FAIL      = 1 << 4; // Confirmed failure.
        const HANDSHAKE = 1 << 5; // Node not yet fully part of the cluster.
        const NOADDR    = 1 << 6; // Node address is unknown.
    }
}

impl NodeFlags {
    /// Parses the comma-separated flags field. Unknown tokens are ignored so
    /// that newer Redis versions do not break the parser.
    pub fn from_tokens(csv: &str) -> NodeFlags {
        let mut flags = NodeFlags::empty();
        for token in csv.split(',') {
            flags |= match token {
                "myself" => NodeFlags::MYSELF,
                "master" => NodeFlags::MASTER,
                "slave" => NodeFlags::REPLICA,
                "fail?" => NodeFlags::PFAIL,
                "fail" => NodeFlags::FAIL,
                "handshake" => NodeFlags::HANDSHAKE,
                "noaddr" => NodeFlags::NOADDR,
                _ => NodeFlags::empty(),
            };
        }
        flags
    }
}

/// The attributes of one cluster node, parsed from its `CLUSTER NODES` line.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttributes {
    /// 40-hex node id, stable across restarts as long as nodes.conf survives.
    pub id: String,
    /// Advertised client address. Empty for a node that does not yet know its own IP.
    pub host: String,
    pub port: u16,
    pub flags: NodeFlags,
    /// The id of the replicated master, present only on replicas.
    pub replicates: Option<String>,
    /// Owned slots, expanded from range tokens, in line order.
    pub slots: Vec<u16>,
}

impl NodeAttributes {
    /// Parses one line of `CLUSTER NODES` output.
    pub fn parse_line(line: &str) -> Result<NodeAttributes, SlotwardError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < FIXED_FIELDS {
            return Err(SlotwardError::MalformedNodeLine(line.to_string()));
        }

        // The gossip port suffix (`@cport`) is dropped; it is always client port + 10000.
        let addr = fields[1].split('@').next().unwrap_or(fields[1]);
        let (host, port_str) = addr
            .rsplit_once(':')
            .ok_or_else(|| SlotwardError::MalformedNodeLine(line.to_string()))?;
        let port: u16 = port_str
            .parse()
            .map_err(|_| SlotwardError::MalformedNodeLine(line.to_string()))?;

        let flags = NodeFlags::from_tokens(fields[2]);
        let replicates = match fields[3] {
            "-" => None,
            master_id => Some(master_id.to_string()),
        };

        let mut slots = Vec::new();
        for token in &fields[FIXED_FIELDS..] {
            // Migration descriptors like "[123->-<id>]" are in-flight state,
            // not owned slots.
            if token.starts_with('[') {
                continue;
            }
            expand_slot_token(token, &mut slots)
                .map_err(|_| SlotwardError::MalformedNodeLine(line.to_string()))?;
        }

        Ok(NodeAttributes {
            id: fields[0].to_string(),
            host: host.to_string(),
            port,
            flags,
            replicates,
            slots,
        })
    }

    pub fn is_myself(&self) -> bool {
        self.flags.contains(NodeFlags::MYSELF)
    }

    pub fn is_master(&self) -> bool {
        self.flags.contains(NodeFlags::MASTER)
    }

    pub fn is_replica(&self) -> bool {
        self.flags.contains(NodeFlags::REPLICA)
    }

    pub fn is_failed(&self) -> bool {
        self.flags.contains(NodeFlags::FAIL)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Expands a slot token into individual slot ids: `"8"` is a single slot,
/// `"0-9"` a closed range.
fn expand_slot_token(token: &str, out: &mut Vec<u16>) -> Result<(), ()> {
    let parse = |s: &str| -> Result<u16, ()> {
        let slot: u16 = s.parse().map_err(|_| ())?;
        if (slot as usize) < SLOT_COUNT { Ok(slot) } else { Err(()) }
    };
    match token.split_once('-') {
        Some((start, end)) => {
            let (start, end) = (parse(start)?, parse(end)?);
            if start > end {
                return Err(());
            }
            out.extend(start..=end);
        }
        None => out.push(parse(token)?),
    }
    Ok(())
}

/// Parses a whole `CLUSTER NODES` reply. Blank lines (including the trailing
/// newline Redis appends) are skipped; any malformed line rejects the reply.
pub fn parse_cluster_nodes(raw: &str) -> Result<Vec<NodeAttributes>, SlotwardError> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(NodeAttributes::parse_line)
        .collect()
}
