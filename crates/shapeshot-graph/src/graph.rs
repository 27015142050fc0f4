//! The captured object graph and its lifecycle.
//!
//! [`ObjectGraph`] owns a [`GraphStore`], the identity table that maps live
//! objects to identities, and the lazily derived indices the query engine
//! reads. A capture resets the store, visits the root, and drains the
//! resulting work through a [`TaskQueue`] in bounded batches.
//!
//! Identities persist across captures on the same instance: capturing the
//! same object twice yields the same identity both times.

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shapeshot_host::{describe_environment, HostValue, ObjectRef, PlatformInfo};
use shapeshot_sched::{drain, drain_blocking, BatchTick, DrainReport, TaskQueue};
use shapeshot_types::NodeId;

use crate::builder::{Builder, VisitTask};
use crate::config::{blacklist_by_default, Enumerators, GraphConfig};
use crate::error::GraphResult;
use crate::identity::IdentityTable;
use crate::index::DerivedIndices;
use crate::store::GraphStore;

/// Callback fired once a capture has completed.
pub type DoneCallback = Box<dyn FnOnce(&ObjectGraph)>;

/// Per-capture options.
#[derive(Default)]
pub struct CaptureOptions {
    /// Name of the root, used as the base of every reconstructed path.
    pub key: String,
    /// User agent to record instead of the configured one.
    pub user_agent: Option<String>,
    /// Fired exactly once, after the queue has drained.
    pub on_done: Option<DoneCallback>,
}

impl CaptureOptions {
    /// Options naming the root `key`.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Record `user_agent` for this capture.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Run `f` once the capture completes.
    pub fn on_done<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&ObjectGraph) + 'static,
    {
        self.on_done = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for CaptureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("key", &self.key)
            .field("user_agent", &self.user_agent)
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}

/// Summary of one capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureReport {
    /// Identity or sentinel of the root.
    pub root: NodeId,
    /// Objects stored by the capture.
    pub objects: usize,
    /// Work items executed.
    pub tasks: u64,
    /// Scheduler batches flushed.
    pub batches: u64,
}

/// A captured object graph.
#[derive(Clone)]
pub struct ObjectGraph {
    pub(crate) config: GraphConfig,
    enumerators: Enumerators,
    identities: IdentityTable,
    pub(crate) store: GraphStore,
    pub(crate) root: Option<NodeId>,
    pub(crate) key: String,
    pub(crate) timestamp: Option<DateTime<Utc>>,
    pub(crate) user_agent: String,
    pub(crate) environment: PlatformInfo,
    indices: OnceCell<DerivedIndices>,
    pub(crate) keys_cache: RefCell<HashMap<NodeId, Vec<String>>>,
}

impl ObjectGraph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph, merging the thread's default object blacklist
    /// into `config`.
    pub fn with_config(mut config: GraphConfig) -> Self {
        config.merge_default_blacklist();
        let enumerators = Enumerators::from_config(&config);
        let user_agent = config.user_agent.clone();
        let environment = describe_environment(&user_agent);
        Self {
            config,
            enumerators,
            identities: IdentityTable::new(),
            store: GraphStore::default(),
            root: None,
            key: String::new(),
            timestamp: None,
            user_agent,
            environment,
            indices: OnceCell::new(),
            keys_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Rebuild a graph around persisted state.
    pub(crate) fn from_store(config: GraphConfig, store: GraphStore) -> Self {
        let mut graph = Self::with_config(config);
        graph.store = store;
        graph
    }

    /// Add `obj` to the default blacklist for graphs created afterwards on
    /// this thread.
    pub fn blacklist_object_by_default(obj: ObjectRef) {
        blacklist_by_default(obj);
    }

    /// Blacklist `obj` for this graph's future captures.
    pub fn blacklist_object(&mut self, obj: ObjectRef) {
        self.config.add_blacklisted_object(obj);
    }

    /// The configuration in effect.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// The captured maps.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no object is stored.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Identity or sentinel of the capture root.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Name of the capture root.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// When the last capture completed.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// User agent recorded with the last capture.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Environment derived from the recorded user agent.
    pub fn environment(&self) -> &PlatformInfo {
        &self.environment
    }

    // ---------------------------------------------------------------
    // Capture
    // ---------------------------------------------------------------

    /// Capture everything reachable from `root`, yielding to the runtime
    /// between scheduler batches.
    ///
    /// Capturing a blacklisted object completes immediately with an empty
    /// graph whose root is the object's identity; `on_done` fires before this
    /// future first suspends.
    pub async fn capture(
        &mut self,
        root: &HostValue,
        mut options: CaptureOptions,
    ) -> GraphResult<CaptureReport> {
        let on_done = options.on_done.take();
        let (root, queue) = self.begin(root, options)?;
        let Some(mut queue) = queue else {
            return Ok(self.complete(root, DrainReport::default(), on_done));
        };

        let mut builder = Builder {
            store: &mut self.store,
            identities: &mut self.identities,
            config: &self.config,
            enumerators: &self.enumerators,
        };
        let drained = drain(
            &mut queue,
            |task, queue| builder.run(task, queue),
            log_tick,
        )
        .await;
        let drained = self.settle(drained)?;
        Ok(self.complete(root, drained, on_done))
    }

    /// Capture everything reachable from `root` on the current call stack.
    pub fn capture_blocking(
        &mut self,
        root: &HostValue,
        mut options: CaptureOptions,
    ) -> GraphResult<CaptureReport> {
        let on_done = options.on_done.take();
        let (root, queue) = self.begin(root, options)?;
        let Some(mut queue) = queue else {
            return Ok(self.complete(root, DrainReport::default(), on_done));
        };

        let mut builder = Builder {
            store: &mut self.store,
            identities: &mut self.identities,
            config: &self.config,
            enumerators: &self.enumerators,
        };
        let drained = drain_blocking(
            &mut queue,
            |task, queue| builder.run(task, queue),
            log_tick,
        );
        let drained = self.settle(drained)?;
        Ok(self.complete(root, drained, on_done))
    }

    /// Reset the graph and visit the root. The queue is `None` if there is
    /// nothing to drain because the root is blacklisted.
    fn begin(
        &mut self,
        root: &HostValue,
        options: CaptureOptions,
    ) -> GraphResult<(NodeId, Option<TaskQueue<VisitTask>>)> {
        self.store.clear();
        self.invalidate();
        self.timestamp = None;
        self.key = options.key;
        self.user_agent = options
            .user_agent
            .unwrap_or_else(|| self.config.user_agent.clone());
        self.environment = describe_environment(&self.user_agent);

        if let HostValue::Object(obj) = root {
            if self.config.is_blacklisted_object(obj) {
                let (id, _) = self.identities.identify(obj);
                self.root = Some(id);
                debug!(root = %id, "capture root is blacklisted; nothing to traverse");
                return Ok((id, None));
            }
        }

        let mut queue = TaskQueue::new(self.config.queue_config());
        let mut builder = Builder {
            store: &mut self.store,
            identities: &mut self.identities,
            config: &self.config,
            enumerators: &self.enumerators,
        };
        let id = builder.visit(root, &mut queue)?;
        self.root = Some(id);
        debug!(root = %id, key = %self.key, queued = queue.len(), "capture started");
        Ok((id, Some(queue)))
    }

    fn settle(&mut self, drained: GraphResult<DrainReport>) -> GraphResult<DrainReport> {
        // Queries must not see indices built from a half-written store.
        self.invalidate();
        if drained.is_err() {
            warn!(key = %self.key, "capture aborted by a consistency fault");
        }
        drained
    }

    fn complete(
        &mut self,
        root: NodeId,
        drained: DrainReport,
        on_done: Option<DoneCallback>,
    ) -> CaptureReport {
        self.timestamp = Some(Utc::now());
        self.identities.prune();
        let report = CaptureReport {
            root,
            objects: self.store.len(),
            tasks: drained.executed,
            batches: drained.batches,
        };
        debug!(
            root = %report.root,
            objects = report.objects,
            tasks = report.tasks,
            batches = report.batches,
            "capture complete"
        );
        if let Some(done) = on_done {
            done(self);
        }
        report
    }

    // ---------------------------------------------------------------
    // Copies and removal
    // ---------------------------------------------------------------

    /// A copy of this graph with the given identities removed.
    pub fn clone_without(&self, ids: &[NodeId]) -> Self {
        let mut copy = self.clone();
        copy.remove_ids(ids);
        copy
    }

    /// Remove identities in place, along with every entry pointing at them.
    ///
    /// Returns how many of the identities were stored.
    pub fn remove_ids(&mut self, ids: &[NodeId]) -> usize {
        let ids: BTreeSet<NodeId> = ids.iter().copied().collect();
        let removed = self.store.remove_ids(&ids);
        self.invalidate();
        removed
    }

    /// Delete primitive-valued entries, given as `(object, storage key)`.
    ///
    /// Stops at the first entry that is missing or holds an object
    /// reference; entries before it stay removed.
    pub fn remove_primitives<'a, I>(&mut self, entries: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = (NodeId, &'a str)>,
    {
        let result = entries
            .into_iter()
            .try_for_each(|(id, key)| self.store.remove_primitive(id, key));
        self.invalidate();
        result
    }

    // ---------------------------------------------------------------
    // Derived state
    // ---------------------------------------------------------------

    pub(crate) fn indices(&self) -> &DerivedIndices {
        self.indices.get_or_init(|| DerivedIndices::build(&self.store))
    }

    fn invalidate(&mut self) {
        self.indices = OnceCell::new();
        self.keys_cache.get_mut().clear();
    }
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectGraph")
            .field("root", &self.root)
            .field("key", &self.key)
            .field("objects", &self.store.len())
            .field("functions", &self.store.functions.len())
            .field("timestamp", &self.timestamp)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn log_tick(tick: BatchTick) {
    debug!(batch = tick.batch, pending = tick.pending, "capture batch");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use shapeshot_types::PrimitiveType;

    use shapeshot_host::MemObject;

    use crate::error::GraphError;

    fn sentinel(ty: PrimitiveType) -> NodeId {
        ty.sentinel()
    }

    /// `{ a: 1, self: <itself> }`
    fn self_cycle() -> Rc<MemObject> {
        let root = MemObject::new("Object");
        root.set("a", 1);
        root.set_object("self", root.clone());
        root
    }

    #[test]
    fn self_cycle_is_stored_once() {
        let root = self_cycle();
        let mut graph = ObjectGraph::new();
        let report = graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();

        let id = graph.root().unwrap();
        assert_eq!(report.root, id);
        assert_eq!(report.objects, 1);
        let props = &graph.store().data[&id];
        assert_eq!(props.len(), 2);
        assert_eq!(props["a"], sentinel(PrimitiveType::Number));
        assert_eq!(props["self"], id);
        assert_eq!(graph.store().protos[&id], sentinel(PrimitiveType::Null));
        assert!(graph.timestamp().is_some());
    }

    #[test]
    fn diamond_is_visited_once() {
        let shared = MemObject::new("Shared");
        let left = MemObject::new("Left");
        let right = MemObject::new("Right");
        left.set_object("to", shared.clone());
        right.set_object("to", shared.clone());
        let root = MemObject::new("Root");
        root.set_object("left", left);
        root.set_object("right", right);

        let mut graph = ObjectGraph::new();
        let report = graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        assert_eq!(report.objects, 4);

        let root = graph.root().unwrap();
        let left = graph.store().data[&root]["left"];
        let right = graph.store().data[&root]["right"];
        assert_eq!(
            graph.store().data[&left]["to"],
            graph.store().data[&right]["to"]
        );
    }

    #[test]
    fn delegation_parents_and_functions_are_recorded() {
        let base = MemObject::new("Base");
        let method = MemObject::function("Function");
        base.set_object("method", method);
        let child = MemObject::new("Child");
        child.set_prototype(Some(base.clone()));

        let mut graph = ObjectGraph::new();
        graph
            .capture_blocking(&HostValue::object(child), CaptureOptions::default())
            .unwrap();
        let root = graph.root().unwrap();
        let base = graph.store().protos[&root];
        assert!(!base.is_type());
        let method = graph.store().data[&base]["method"];
        assert_eq!(graph.store().functions, vec![method]);
    }

    #[test]
    fn hostile_members_are_recorded_as_exceptions() {
        let root = MemObject::new("Host");
        root.define_throwing("detached", "InvalidStateError");
        root.set("ok", true);
        root.fail_descriptor("ok");

        let mut graph = ObjectGraph::new();
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        let id = graph.root().unwrap();
        let props = &graph.store().data[&id];
        assert_eq!(props["detached"], sentinel(PrimitiveType::Exception));
        assert_eq!(props["ok"], sentinel(PrimitiveType::Boolean));
        let meta = &graph.store().metadata[&id];
        assert!(meta.contains_key("detached"));
        assert!(!meta.contains_key("ok"));
    }

    #[test]
    fn blacklisted_root_completes_synchronously() {
        let secret = MemObject::new("Secret");
        secret.set("inner", 1);
        let mut graph =
            ObjectGraph::with_config(GraphConfig::default().blacklist_object(secret.clone()));

        let fired = Rc::new(RefCell::new(None));
        let sink = fired.clone();
        let options = CaptureOptions::default().on_done(move |g| {
            *sink.borrow_mut() = g.root();
        });
        let report = graph
            .capture_blocking(&HostValue::object(secret), options)
            .unwrap();

        assert!(graph.is_empty());
        assert!(graph.store().protos.is_empty());
        assert!(graph.store().functions.is_empty());
        assert_eq!(*fired.borrow(), Some(report.root));
        assert_eq!(report.tasks, 0);
    }

    #[tokio::test]
    async fn blacklisted_root_needs_no_scheduling() {
        let secret = MemObject::new("Secret");
        let mut graph = ObjectGraph::new();
        graph.blacklist_object(secret.clone());

        let fired = Rc::new(RefCell::new(false));
        let sink = fired.clone();
        let options = CaptureOptions::default().on_done(move |_| *sink.borrow_mut() = true);
        let report = graph
            .capture(&HostValue::object(secret), options)
            .await
            .unwrap();
        assert!(*fired.borrow());
        assert_eq!(report.batches, 0);
        assert!(graph.is_empty());
    }

    #[test]
    fn blacklisted_members_are_skipped() {
        let secret = MemObject::new("Secret");
        let root = MemObject::new("Root");
        root.set_object("secret", secret.clone());
        root.set_object("alias", secret.clone());
        root.set("kept", "yes");

        let mut graph = ObjectGraph::new();
        graph.blacklist_object(secret);
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        let id = graph.root().unwrap();
        let keys: Vec<&str> = graph.store().data[&id].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["kept"]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn member_turning_blacklisted_after_listing_is_skipped() {
        let secret = MemObject::new("Secret");
        secret.set("inner", 1);
        let root = MemObject::new("Root");
        root.set("kept", 1);
        let reads = Rc::new(std::cell::Cell::new(0u32));
        let counter = reads.clone();
        let late: ObjectRef = secret.clone();
        root.define_getter("flip", move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Ok(HostValue::from(1))
            } else {
                Ok(HostValue::Object(late.clone()))
            }
        });

        let mut graph = ObjectGraph::new();
        graph.blacklist_object(secret);
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();

        assert_eq!(reads.get(), 2);
        let id = graph.root().unwrap();
        assert!(!graph.store().data[&id].contains_key("flip"));
        assert!(!graph.store().metadata[&id].contains_key("flip"));
        assert!(graph.store().data[&id].contains_key("kept"));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn blacklisted_delegation_parent_is_not_linked() {
        let secret = MemObject::new("Secret");
        secret.set("x", 1);
        let root = MemObject::new("Root");
        root.set_prototype(Some(secret.clone()));

        let mut graph = ObjectGraph::new();
        graph.blacklist_object(secret);
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.store().protos.is_empty());
    }

    #[test]
    fn default_blacklist_applies_to_new_graphs_only() {
        let global = MemObject::new("Global");
        let before = ObjectGraph::new();
        ObjectGraph::blacklist_object_by_default(global.clone());
        let after = ObjectGraph::new();
        let global: ObjectRef = global;
        assert!(!before.config().is_blacklisted_object(&global));
        assert!(after.config().is_blacklisted_object(&global));
    }

    #[test]
    fn blacklisted_keys_are_skipped() {
        let root = MemObject::new("Root");
        root.set("__proto__", 1);
        root.set("caller", 2);
        root.set("name", "x");
        let config = GraphConfig {
            blacklisted_keys: vec!["__proto__".into(), "caller".into()],
            ..Default::default()
        };
        let mut graph = ObjectGraph::with_config(config);
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        let id = graph.root().unwrap();
        assert_eq!(graph.store().data[&id].len(), 1);
    }

    #[test]
    fn primitive_root_is_its_sentinel() {
        let mut graph = ObjectGraph::new();
        let report = graph
            .capture_blocking(&HostValue::from("text"), CaptureOptions::default())
            .unwrap();
        assert_eq!(report.root, sentinel(PrimitiveType::String));
        assert!(graph.is_empty());
    }

    #[test]
    fn identities_persist_across_captures() {
        let root = self_cycle();
        let value = HostValue::object(root.clone());
        let mut graph = ObjectGraph::new();
        let first = graph
            .capture_blocking(&value, CaptureOptions::with_key("first"))
            .unwrap();
        root.set("b", false);
        let second = graph
            .capture_blocking(&value, CaptureOptions::with_key("second"))
            .unwrap();
        assert_eq!(first.root, second.root);
        assert_eq!(graph.key(), "second");
        assert_eq!(graph.store().data[&second.root].len(), 3);
    }

    #[test]
    fn small_batches_still_drain() {
        let root = MemObject::new("Root");
        for i in 0..20 {
            let child = MemObject::new("Child");
            child.set("i", i);
            root.set_object(format!("c{i}"), child);
        }
        let config = GraphConfig {
            batch_size: 3,
            ..Default::default()
        };
        let mut graph = ObjectGraph::with_config(config);
        let report = graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        assert_eq!(report.objects, 21);
        assert!(report.batches > 1);
    }

    #[tokio::test]
    async fn async_capture_matches_blocking_capture() {
        let root: Rc<MemObject> = self_cycle();
        let child = MemObject::new("Child");
        child.set("deep", 1.5);
        root.set_object("child", child);
        let value = HostValue::object(root);

        let config = GraphConfig {
            batch_size: 2,
            ..Default::default()
        };
        let mut blocking = ObjectGraph::with_config(config.clone());
        blocking
            .capture_blocking(&value, CaptureOptions::default())
            .unwrap();
        let mut asynchronous = ObjectGraph::with_config(config);
        asynchronous
            .capture(&value, CaptureOptions::default())
            .await
            .unwrap();
        assert_eq!(blocking.store(), asynchronous.store());
    }

    #[test]
    fn capture_records_user_agent() {
        let mut graph = ObjectGraph::new();
        let ua = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
        graph
            .capture_blocking(
                &HostValue::object(MemObject::new("Object")),
                CaptureOptions::default().user_agent(ua),
            )
            .unwrap();
        assert_eq!(graph.user_agent(), ua);
        assert_eq!(graph.environment().name, "Firefox");
    }

    #[test]
    fn clone_without_removes_entries_pointing_at_removed_ids() {
        let root = MemObject::new("Root");
        let gone = MemObject::new("Gone");
        gone.set("x", 1);
        root.set_object("gone", gone);
        root.set("n", 2);

        let mut graph = ObjectGraph::new();
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        let root = graph.root().unwrap();
        let gone = graph.store().data[&root]["gone"];

        let pruned = graph.clone_without(&[gone]);
        assert!(!pruned.store().data.contains_key(&gone));
        assert!(!pruned.store().data[&root].contains_key("gone"));
        assert!(graph.store().data.contains_key(&gone));

        let again = pruned.clone_without(&[gone]);
        assert_eq!(again.store(), pruned.store());
    }

    #[test]
    fn remove_primitives_refuses_object_references() {
        let root = MemObject::new("Root");
        root.set_object("child", MemObject::new("Child"));
        root.set("n", 1);

        let mut graph = ObjectGraph::new();
        graph
            .capture_blocking(&HostValue::object(root), CaptureOptions::default())
            .unwrap();
        let root = graph.root().unwrap();

        let err = graph.remove_primitives([(root, "child")]).unwrap_err();
        assert!(matches!(err, GraphError::NotPrimitive { .. }));
        assert!(graph.store().data[&root].contains_key("child"));

        graph.remove_primitives([(root, "n")]).unwrap();
        assert!(!graph.store().data[&root].contains_key("n"));
    }

    #[test]
    fn vendor_aliases_are_captured() {
        let style = MemObject::new("CSSStyleDeclaration");
        style.set("transform", "none");
        style.define_hidden("webkitTransform", "none");
        let config = GraphConfig {
            vendor_alias_classes: vec!["CSSStyleDeclaration".into()],
            ..Default::default()
        };
        let mut graph = ObjectGraph::with_config(config);
        graph
            .capture_blocking(&HostValue::object(style), CaptureOptions::default())
            .unwrap();
        let id = graph.root().unwrap();
        assert!(graph.store().data[&id].contains_key("webkitTransform"));
    }
}
