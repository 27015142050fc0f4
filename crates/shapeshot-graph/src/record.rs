//! Transport record for captured graphs.
//!
//! [`GraphRecord`] is the persisted layout: a flat structure with integer-keyed
//! maps and camelCase field names. Derived indices and identity tables are
//! never persisted; a loaded graph rebuilds its indices on first query.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use shapeshot_host::PlatformInfo;
use shapeshot_types::{type_table, NodeId, PrimitiveType};

use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::graph::ObjectGraph;
use crate::store::{Attributes, GraphStore, Properties};

/// Serializable form of an [`ObjectGraph`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecord {
    /// Capture completion time, in milliseconds since the epoch.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    pub user_agent: String,
    pub environment: PlatformInfo,
    pub root: Option<NodeId>,
    pub key: String,
    pub data: BTreeMap<NodeId, Properties>,
    pub protos: BTreeMap<NodeId, NodeId>,
    /// Category name → sentinel, so readers can check the encoding.
    pub types: BTreeMap<String, NodeId>,
    /// Storage key → original name, for every rewritten name.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    pub blacklisted_keys: Vec<String>,
    pub functions: Vec<NodeId>,
    pub metadata: BTreeMap<NodeId, Attributes>,
}

impl GraphRecord {
    fn check_types(&self) -> GraphResult<()> {
        for ty in PrimitiveType::ALL {
            let found = self.types.get(ty.name()).copied();
            if found != Some(ty.sentinel()) {
                return Err(GraphError::TypeTableMismatch {
                    name: ty.name().to_string(),
                    expected: ty.sentinel(),
                    found,
                });
            }
        }
        Ok(())
    }
}

impl ObjectGraph {
    /// Project this graph onto its transport record.
    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            timestamp: self.timestamp,
            user_agent: self.user_agent.clone(),
            environment: self.environment.clone(),
            root: self.root,
            key: self.key.clone(),
            data: self.store.data.clone(),
            protos: self.store.protos.clone(),
            types: type_table(),
            keys: self.store.key_names.clone(),
            blacklisted_keys: self.config.blacklisted_keys.clone(),
            functions: self.store.functions.clone(),
            metadata: self.store.metadata.clone(),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    /// Rebuild a graph from a record, with the default configuration apart
    /// from the recorded key blacklist.
    pub fn from_record(record: GraphRecord) -> GraphResult<Self> {
        Self::from_record_with_config(record, GraphConfig::default())
    }

    /// Rebuild a graph from a record on top of `config`.
    pub fn from_record_with_config(
        record: GraphRecord,
        mut config: GraphConfig,
    ) -> GraphResult<Self> {
        record.check_types()?;

        let GraphRecord {
            timestamp,
            user_agent,
            environment,
            root,
            key,
            data,
            protos,
            keys,
            blacklisted_keys,
            functions,
            mut metadata,
            ..
        } = record;

        for id in data.keys() {
            metadata.entry(*id).or_default();
        }
        metadata.retain(|id, _| data.contains_key(id));

        config.blacklisted_keys = blacklisted_keys;
        config.user_agent = user_agent.clone();
        let store = GraphStore::from_parts(data, metadata, protos, functions, keys);
        debug!(objects = store.len(), key = %key, "loaded graph record");

        let mut graph = Self::from_store(config, store);
        graph.root = root;
        graph.key = key;
        graph.timestamp = timestamp;
        graph.user_agent = user_agent;
        graph.environment = environment;
        Ok(graph)
    }

    /// Parse a graph from JSON produced by [`to_json`](Self::to_json).
    pub fn from_json(text: &str) -> GraphResult<Self> {
        let record: GraphRecord = serde_json::from_str(text)?;
        Self::from_record(record)
    }
}
