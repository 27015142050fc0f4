use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use shapeshot_host::{
    same_object, EnumerationStrategy, EscapingRewriter, HostObject, NameRewriter, ObjectRef,
    OwnPropertyNames, VendorAliasStrategy, PROTO_SEGMENT,
};
use shapeshot_sched::QueueConfig;

thread_local! {
    static DEFAULT_BLACKLIST: RefCell<Vec<ObjectRef>> = const { RefCell::new(Vec::new()) };
}

/// Add `obj` to the default object blacklist of this thread.
///
/// Every graph constructed afterwards starts with `obj` blacklisted. Graphs
/// that already exist are unaffected.
pub fn blacklist_by_default(obj: ObjectRef) {
    DEFAULT_BLACKLIST.with(|list| {
        let mut list = list.borrow_mut();
        if !list.iter().any(|known| same_object(known, &obj)) {
            list.push(obj);
        }
    });
}

fn default_blacklist() -> Vec<ObjectRef> {
    DEFAULT_BLACKLIST.with(|list| list.borrow().clone())
}

fn default_rewriter() -> Rc<dyn NameRewriter> {
    Rc::new(EscapingRewriter)
}

/// Configuration for an [`ObjectGraph`](crate::ObjectGraph).
///
/// The serializable part can be loaded from a TOML file; blacklisted objects,
/// strategy overrides and the rewriter are runtime-only.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Property names that are never captured.
    pub blacklisted_keys: Vec<String>,
    /// Maximum work items per scheduler batch.
    pub batch_size: usize,
    /// User agent recorded with each capture.
    pub user_agent: String,
    /// Class names probed for vendor-prefixed aliases.
    pub vendor_alias_classes: Vec<String>,
    /// Prefixes used by the vendor alias probe.
    pub vendor_prefixes: Vec<String>,
    /// Objects that are never traversed into.
    #[serde(skip)]
    pub blacklisted_objects: Vec<ObjectRef>,
    /// Enumeration overrides, tried in order before the default strategy.
    #[serde(skip)]
    pub strategies: Vec<Rc<dyn EnumerationStrategy>>,
    /// Maps property names to storage keys.
    #[serde(skip, default = "default_rewriter")]
    pub rewriter: Rc<dyn NameRewriter>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            blacklisted_keys: vec![PROTO_SEGMENT.to_string()],
            batch_size: QueueConfig::default().batch_size,
            user_agent: format!("shapeshot/{}", env!("CARGO_PKG_VERSION")),
            vendor_alias_classes: Vec::new(),
            vendor_prefixes: VendorAliasStrategy::DEFAULT_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            blacklisted_objects: Vec::new(),
            strategies: Vec::new(),
            rewriter: default_rewriter(),
        }
    }
}

impl GraphConfig {
    /// Parse the serializable part of a configuration from TOML.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Blacklist an object for graphs built from this configuration.
    pub fn blacklist_object(mut self, obj: ObjectRef) -> Self {
        self.add_blacklisted_object(obj);
        self
    }

    /// Register an enumeration override.
    pub fn with_strategy(mut self, strategy: Rc<dyn EnumerationStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub(crate) fn add_blacklisted_object(&mut self, obj: ObjectRef) {
        if !self.is_blacklisted_object(&obj) {
            self.blacklisted_objects.push(obj);
        }
    }

    /// Merge the thread's default blacklist into this configuration.
    pub(crate) fn merge_default_blacklist(&mut self) {
        for obj in default_blacklist() {
            self.add_blacklisted_object(obj);
        }
    }

    pub(crate) fn is_blacklisted_object(&self, obj: &ObjectRef) -> bool {
        self.blacklisted_objects
            .iter()
            .any(|known| same_object(known, obj))
    }

    pub(crate) fn is_blacklisted_key(&self, name: &str) -> bool {
        self.blacklisted_keys.iter().any(|k| k == name)
    }

    pub(crate) fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            batch_size: self.batch_size,
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("blacklisted_keys", &self.blacklisted_keys)
            .field("batch_size", &self.batch_size)
            .field("user_agent", &self.user_agent)
            .field("vendor_alias_classes", &self.vendor_alias_classes)
            .field("vendor_prefixes", &self.vendor_prefixes)
            .field("blacklisted_objects", &self.blacklisted_objects.len())
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

/// The enumeration strategies resolved from a configuration.
#[derive(Clone, Default)]
pub(crate) struct Enumerators {
    strategies: Vec<Rc<dyn EnumerationStrategy>>,
}

impl Enumerators {
    pub(crate) fn from_config(config: &GraphConfig) -> Self {
        let mut strategies = config.strategies.clone();
        if !config.vendor_alias_classes.is_empty() {
            strategies.push(Rc::new(
                VendorAliasStrategy::new(config.vendor_alias_classes.iter().cloned())
                    .with_prefixes(config.vendor_prefixes.iter().cloned()),
            ));
        }
        Self { strategies }
    }

    /// The first override that applies to `obj`, or the default strategy.
    pub(crate) fn select(&self, obj: &dyn HostObject) -> &dyn EnumerationStrategy {
        self.strategies
            .iter()
            .find(|s| s.applies_to(obj))
            .map(|s| &**s)
            .unwrap_or(&OwnPropertyNames)
    }
}
