//! Transaction multigraph construction and per-account indices.
//!
//! Accounts are interned into dense integer node IDs; every transaction
//! becomes one directed edge, so parallel transfers between the same pair
//! of accounts stay distinct. After `build` returns the graph is frozen:
//! detectors only read it.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::Transaction;

/// Dense node identifier assigned in order of first sighting.
pub type NodeId = u32;

/// One directed edge, carrying its originating transaction.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub transaction_id: String,
    pub from: NodeId,
    pub to: NodeId,
    pub amount: f64,
    pub timestamp: NaiveDateTime,
}

/// Directed transaction multigraph with per-account indices.
pub struct TransactionGraph {
    accounts: Vec<String>,
    account_index: HashMap<String, NodeId>,
    edges: Vec<EdgeData>,
    outbound: Vec<Vec<u32>>,
    inbound: Vec<Vec<u32>>,
    sorted_nodes: Vec<NodeId>,
}

impl TransactionGraph {
    /// Build the graph from well-typed transactions.
    ///
    /// Nodes are materialized on first sighting (sender before receiver);
    /// edge IDs equal input position. Inbound/outbound indices are sorted
    /// by timestamp, ties keeping input order.
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut graph = Self {
            accounts: Vec::new(),
            account_index: HashMap::new(),
            edges: Vec::with_capacity(transactions.len()),
            outbound: Vec::new(),
            inbound: Vec::new(),
            sorted_nodes: Vec::new(),
        };

        for tx in transactions {
            let from = graph.intern(&tx.sender_id);
            let to = graph.intern(&tx.receiver_id);
            let edge_id = graph.edges.len() as u32;
            graph.edges.push(EdgeData {
                transaction_id: tx.transaction_id.clone(),
                from,
                to,
                amount: tx.amount,
                timestamp: tx.timestamp,
            });
            graph.outbound[from as usize].push(edge_id);
            graph.inbound[to as usize].push(edge_id);
        }

        // Stable sort keeps input order for equal timestamps.
        let edges = &graph.edges;
        for list in graph.outbound.iter_mut().chain(graph.inbound.iter_mut()) {
            list.sort_by_key(|&e| edges[e as usize].timestamp);
        }

        let mut sorted_nodes: Vec<NodeId> = (0..graph.accounts.len() as NodeId).collect();
        sorted_nodes
            .sort_by(|&a, &b| graph.accounts[a as usize].cmp(&graph.accounts[b as usize]));
        graph.sorted_nodes = sorted_nodes;

        graph
    }

    fn intern(&mut self, account_id: &str) -> NodeId {
        if let Some(&node) = self.account_index.get(account_id) {
            return node;
        }
        let node = self.accounts.len() as NodeId;
        self.accounts.push(account_id.to_string());
        self.account_index.insert(account_id.to_string(), node);
        self.outbound.push(Vec::new());
        self.inbound.push(Vec::new());
        node
    }

    pub fn node_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn account_id(&self, node: NodeId) -> &str {
        &self.accounts[node as usize]
    }

    pub fn node(&self, account_id: &str) -> Option<NodeId> {
        self.account_index.get(account_id).copied()
    }

    pub fn edge(&self, edge_id: u32) -> &EdgeData {
        &self.edges[edge_id as usize]
    }

    pub fn edges(&self) -> &[EdgeData] {
        &self.edges
    }

    /// Outbound edge IDs of a node, ascending by timestamp.
    pub fn outbound_edges(&self, node: NodeId) -> &[u32] {
        &self.outbound[node as usize]
    }

    /// Inbound edge IDs of a node, ascending by timestamp.
    pub fn inbound_edges(&self, node: NodeId) -> &[u32] {
        &self.inbound[node as usize]
    }

    /// In-degree + out-degree, counted with multiplicity.
    pub fn total_transactions(&self, node: NodeId) -> usize {
        self.outbound[node as usize].len() + self.inbound[node as usize].len()
    }

    /// All node IDs ordered by account ID. Detectors iterate this so that
    /// ring numbering is reproducible across runs.
    pub fn nodes_by_account_id(&self) -> &[NodeId] {
        &self.sorted_nodes
    }

    /// Distinct successor nodes of `node`, ordered by account ID.
    /// Collapses parallel edges; includes self-loop targets.
    pub fn distinct_successors(&self, node: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut successors: Vec<NodeId> = self.outbound[node as usize]
            .iter()
            .map(|&e| self.edges[e as usize].to)
            .filter(|&n| seen.insert(n))
            .collect();
        successors.sort_by(|&a, &b| self.accounts[a as usize].cmp(&self.accounts[b as usize]));
        successors
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            account_count: self.accounts.len(),
            edge_count: self.edges.len(),
            total_volume: self.edges.iter().map(|e| e.amount).sum(),
        }
    }

    pub fn account_stats(&self, account_id: &str) -> Option<AccountStats> {
        let node = self.node(account_id)?;
        let inbound = &self.inbound[node as usize];
        let outbound = &self.outbound[node as usize];
        let senders: HashSet<NodeId> = inbound
            .iter()
            .map(|&e| self.edges[e as usize].from)
            .collect();
        let receivers: HashSet<NodeId> = outbound
            .iter()
            .map(|&e| self.edges[e as usize].to)
            .collect();
        Some(AccountStats {
            account_id: account_id.to_string(),
            total_inflow: inbound.iter().map(|&e| self.edges[e as usize].amount).sum(),
            total_outflow: outbound.iter().map(|&e| self.edges[e as usize].amount).sum(),
            transaction_count: inbound.len() + outbound.len(),
            incoming_connections: senders.len(),
            outgoing_connections: receivers.len(),
        })
    }
}

/// Whole-graph totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub account_count: usize,
    pub edge_count: usize,
    pub total_volume: f64,
}

/// Per-account flow totals and connection counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStats {
    pub account_id: String,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub transaction_count: usize,
    pub incoming_connections: usize,
    pub outgoing_connections: usize,
}
