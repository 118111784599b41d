use ordered_float::OrderedFloat;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use petgraph::algo::astar;
use petgraph::prelude::*;

use crate::error::FactoryError;
use crate::transform::{LinearTransform, MathTransform, concatenate_all};

const DEFAULT_ACCURACY: f64 = 1.0;

/// One registered operation between two frames, weighted by its positional
/// accuracy in metres.
#[derive(Debug, Clone)]
pub struct Hop {
    transform: Arc<dyn MathTransform>,
    accuracy: OrderedFloat<f64>,
}

impl Hop {
    pub fn with_accuracy(transform: Arc<dyn MathTransform>, accuracy: f64) -> Self {
        Self {
            transform,
            accuracy: OrderedFloat(accuracy),
        }
    }

    pub fn new(transform: Arc<dyn MathTransform>) -> Self {
        Self::with_accuracy(transform, DEFAULT_ACCURACY)
    }
}

type PathCache = HashMap<(NodeIndex, NodeIndex), Option<Arc<dyn MathTransform>>>;

/// Directed multigraph of reference frames joined by registered operations.
///
/// Frames are keyed by any caller identifier. Lookup composes the cheapest
/// chain by total accuracy; results are cached until the next registration.
#[derive(Debug)]
pub struct FrameGraph<C: std::hash::Hash + Eq + Clone> {
    graph: StableDiGraph<C, Hop>,
    frames: HashMap<C, NodeInfo>,
    path_cache: RwLock<PathCache>,
}

#[derive(Debug, Copy, Clone)]
struct NodeInfo {
    idx: NodeIndex,
    dimension: usize,
}

impl<C: std::hash::Hash + Eq + Clone> Default for FrameGraph<C> {
    fn default() -> Self {
        Self {
            graph: StableDiGraph::default(),
            frames: HashMap::new(),
            path_cache: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: std::hash::Hash + Eq + Clone> FrameGraph<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_frame(&mut self, frame: C, dimension: usize) -> Result<NodeIndex, FactoryError> {
        if let Some(n) = self.frames.get(&frame) {
            if n.dimension != dimension {
                return Err(FactoryError::Data(format!(
                    "existing frame has {} axes; the new operation needs {}",
                    n.dimension, dimension
                )));
            }
            Ok(n.idx)
        } else {
            let idx = self.graph.add_node(frame.clone());
            self.frames.insert(frame, NodeInfo { idx, dimension });
            Ok(idx)
        }
    }

    /// Returns whether the inverse hop was added too.
    /// Fails when the operation's dimensions disagree with its frames.
    pub fn add_operation(
        &mut self,
        source: impl Into<C>,
        target: impl Into<C>,
        transform: Arc<dyn MathTransform>,
        accuracy: f64,
        with_inverse: bool,
    ) -> Result<bool, FactoryError> {
        self.clear_cache();

        let u = self.ensure_frame(source.into(), transform.source_dimensions())?;
        let v = self.ensure_frame(target.into(), transform.target_dimensions())?;

        let mut added_inverse = false;
        if with_inverse {
            if let Ok(inverse) = transform.inverse() {
                self.graph
                    .add_edge(v, u, Hop::with_accuracy(inverse, accuracy));
                added_inverse = true;
            }
        }

        self.graph
            .add_edge(u, v, Hop::with_accuracy(transform, accuracy));
        Ok(added_inverse)
    }

    fn best_hop(&self, source: NodeIndex, target: NodeIndex) -> Option<&Hop> {
        self.graph
            .edges_connecting(source, target)
            .min_by_key(|e| e.weight().accuracy)
            .map(|e| e.weight())
    }

    fn cache_get(
        &self,
        source: &NodeIndex,
        target: &NodeIndex,
    ) -> Option<Option<Arc<dyn MathTransform>>> {
        let outer = self.path_cache.read().expect("should not be poisonned");
        outer.get(&(*source, *target)).map(|t| t.as_ref().cloned())
    }

    fn cache_insert(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        t: Option<Arc<dyn MathTransform>>,
    ) -> Option<Option<Arc<dyn MathTransform>>> {
        self.path_cache
            .write()
            .expect("should not be poisonned")
            .insert((source, target), t)
    }

    fn clear_cache(&mut self) {
        self.path_cache.get_mut().unwrap().clear();
    }

    /// The transform along the most accurate registered route, if the two
    /// frames are connected at all.
    pub fn find_operation(&self, from: &C, to: &C) -> Option<Arc<dyn MathTransform>> {
        let start = self.frames.get(from)?;

        if from == to {
            return Some(Arc::new(LinearTransform::identity(start.dimension)));
        }

        let u = start.idx;
        let v = self.frames.get(to)?.idx;

        if let Some(maybe) = self.cache_get(&u, &v) {
            return maybe;
        }

        let zero = OrderedFloat(0.0);
        let Some((cost, path)) = astar(
            &self.graph,
            u,
            |n| n == v,
            |e| e.weight().accuracy,
            |_| zero,
        ) else {
            self.cache_insert(u, v, None);
            return None;
        };
        log::debug!("routing through {} hop(s), accuracy {}", path.len() - 1, cost);

        let t = match path.len() {
            0 | 1 => unreachable!(),
            2 => self
                .best_hop(path[0], path[1])
                .map(|hop| hop.transform.clone())
                .expect("already checked for path existence"),
            n => {
                let mut steps: Vec<Arc<dyn MathTransform>> = Vec::with_capacity(n - 1);
                for pair in path.windows(2) {
                    steps.push(self.best_hop(pair[0], pair[1])?.transform.clone());
                }
                concatenate_all(steps).expect("already checked dimensionality")
            }
        };

        self.cache_insert(u, v, Some(t.clone()));
        Some(t)
    }
}
