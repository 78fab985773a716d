//! Reachability scan over the instance tree.
//!
//! Finds every unique source geometry and every instances component that a
//! root geometry set can reach, in first-seen depth-first order. The schema
//! collector and the per-geometry info cache both work from this result.
//!
//! Only selected top-level instances are followed, and each only as deep as
//! its depth allows. Instances components below that depth are recorded as
//! kept rather than expanded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexSet;

use super::RealizeOptions;
use crate::geom::{GeometrySet, InstanceReference, Instances};
use crate::scene::{CollectionKey, CurvesKey, GeometryStore, MeshKey, ObjectKey, PointCloudKey};
use crate::util::{Error, Result};

/// Object or collection that is currently being expanded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum OpenNode {
    Object(ObjectKey),
    Collection(CollectionKey),
}

/// Stack of nodes open on the current recursion path.
#[derive(Debug, Default)]
pub(crate) struct OpenStack {
    nodes: Vec<OpenNode>,
}

impl OpenStack {
    /// Push `node`, failing if it is already open.
    pub fn enter(&mut self, store: &GeometryStore, node: OpenNode) -> Result<()> {
        if self.nodes.contains(&node) {
            let name = match node {
                OpenNode::Object(key) => format!("object '{}'", store.require_object(key)?.name),
                OpenNode::Collection(key) => format!("collection '{}'", store.require_collection(key)?.name),
            };
            return Err(Error::CyclicInstancing(name));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn leave(&mut self) {
        self.nodes.pop();
    }
}

/// How far below a geometry set instances are still expanded.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Depth<'s> {
    /// The root set. Only the listed instances expand, each followed by the
    /// instance levels left below it.
    Root(&'s [(usize, Option<u32>)]),
    /// Instance levels left. `Some(0)` keeps instances, `None` is unlimited.
    Remaining(Option<u32>),
}

impl Depth<'_> {
    /// True if instances at this level are kept instead of expanded.
    #[inline]
    pub fn keeps_instances(self) -> bool {
        matches!(self, Depth::Remaining(Some(0)))
    }

    /// Instances that expand at this level, each with the levels left below it.
    pub fn expanded(self, instances: &Instances) -> Vec<(usize, Option<u32>)> {
        match self {
            Depth::Root(selection) => selection.to_vec(),
            Depth::Remaining(levels) => {
                let below = levels.map(|l| l.saturating_sub(1));
                (0..instances.num_instances()).map(|i| (i, below)).collect()
            }
        }
    }
}

/// An instances component reached by the scan.
#[derive(Clone, Debug)]
pub(crate) struct ReachedInstances {
    pub instances: Arc<Instances>,
    /// The "id" layer is ignored. Set when ids are kept and the component is
    /// only reachable through the root or embedded geometry sets.
    pub ids_stripped: bool,
}

/// Everything reachable from one root geometry set.
#[derive(Debug, Default)]
pub(crate) struct Reachable {
    pub meshes: IndexSet<MeshKey>,
    pub point_clouds: IndexSet<PointCloudKey>,
    pub curves: IndexSet<CurvesKey>,
    /// Instances components that get expanded, root included
    pub instances: Vec<ReachedInstances>,
    /// Instances components at their depth limit, merged into the output as instances
    pub kept_instances: Vec<ReachedInstances>,
}

/// Scan `root` and everything its selected instances reach.
///
/// `selection` lists the expanded top-level instances in ascending order
/// with the instance levels left below each.
pub(crate) fn scan(
    store: &GeometryStore,
    root: &GeometrySet,
    selection: &[(usize, Option<u32>)],
    options: &RealizeOptions,
) -> Result<Reachable> {
    let mut scanner = Scanner {
        store,
        reachable: Reachable::default(),
        open: OpenStack::default(),
        done: HashSet::new(),
        visited: HashSet::new(),
        expanded: HashMap::new(),
        kept: HashMap::new(),
    };
    scanner.visit_geometry(root, Depth::Root(selection), options.keep_original_ids)?;
    Ok(scanner.reachable)
}

struct Scanner<'a> {
    store: &'a GeometryStore,
    reachable: Reachable,
    open: OpenStack,
    /// Objects and collections already scanned at a depth
    done: HashSet<(OpenNode, Option<u32>)>,
    /// Nested instances components already scanned at a depth and strip mode
    visited: HashSet<(*const Instances, Option<u32>, bool)>,
    /// Position of each component in `reachable.instances`
    expanded: HashMap<*const Instances, usize>,
    /// Position of each component in `reachable.kept_instances`
    kept: HashMap<*const Instances, usize>,
}

/// Record `instances` once, clearing the strip flag if any path keeps its ids.
fn record(
    list: &mut Vec<ReachedInstances>,
    positions: &mut HashMap<*const Instances, usize>,
    instances: &Arc<Instances>,
    strip_ids: bool,
) {
    match positions.get(&Arc::as_ptr(instances)) {
        Some(&pos) => list[pos].ids_stripped &= strip_ids,
        None => {
            positions.insert(Arc::as_ptr(instances), list.len());
            list.push(ReachedInstances {
                instances: Arc::clone(instances),
                ids_stripped: strip_ids,
            });
        }
    }
}

impl Scanner<'_> {
    fn visit_geometry(&mut self, geometry: &GeometrySet, depth: Depth<'_>, strip_ids: bool) -> Result<()> {
        if let Some(key) = geometry.mesh {
            self.reachable.meshes.insert(key);
        }
        if let Some(key) = geometry.point_cloud {
            self.reachable.point_clouds.insert(key);
        }
        if let Some(instances) = &geometry.instances {
            if depth.keeps_instances() {
                record(&mut self.reachable.kept_instances, &mut self.kept, instances, strip_ids);
            } else {
                self.visit_instances(instances, depth, strip_ids)?;
            }
        }
        if let Some(key) = geometry.curves {
            self.reachable.curves.insert(key);
        }
        Ok(())
    }

    fn visit_instances(&mut self, instances: &Arc<Instances>, depth: Depth<'_>, strip_ids: bool) -> Result<()> {
        if let Depth::Remaining(levels) = depth {
            if !self.visited.insert((Arc::as_ptr(instances), levels, strip_ids)) {
                return Ok(());
            }
        }
        let expanded = depth.expanded(instances);
        if expanded.is_empty() {
            return Ok(());
        }
        record(&mut self.reachable.instances, &mut self.expanded, instances, strip_ids);

        // Follow each reference once per distinct depth it is asked for.
        let mut followed: HashSet<(u32, Option<u32>)> = HashSet::new();
        for (i, below) in expanded {
            if !followed.insert((instances.handles()[i], below)) {
                continue;
            }
            match instances.reference_of(i)? {
                InstanceReference::Object(key) => self.visit_object(*key, below)?,
                InstanceReference::Collection(key) => self.visit_collection(*key, below)?,
                InstanceReference::GeometrySet(geometry) => {
                    self.visit_geometry(geometry, Depth::Remaining(below), strip_ids)?
                }
                InstanceReference::None => {}
            }
        }
        Ok(())
    }

    fn visit_object(&mut self, key: ObjectKey, levels: Option<u32>) -> Result<()> {
        let node = OpenNode::Object(key);
        if self.done.contains(&(node, levels)) {
            return Ok(());
        }
        let store = self.store;
        self.open.enter(store, node)?;
        self.visit_geometry(&store.require_object(key)?.geometry, Depth::Remaining(levels), false)?;
        self.open.leave();
        self.done.insert((node, levels));
        Ok(())
    }

    fn visit_collection(&mut self, key: CollectionKey, levels: Option<u32>) -> Result<()> {
        let node = OpenNode::Collection(key);
        if self.done.contains(&(node, levels)) {
            return Ok(());
        }
        let store = self.store;
        self.open.enter(store, node)?;
        for object in store.collection_objects_recursive(key)? {
            self.visit_object(object, levels)?;
        }
        self.open.leave();
        self.done.insert((node, levels));
        Ok(())
    }
}
