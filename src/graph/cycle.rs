//! Cycle detection over resolved node inputs.

use super::NodeId;

/// Tracks the visitation state of a node during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// Return the first cycle found, rotated so its smallest name leads.
///
/// `edges[i]` lists the inputs of node `i`; `names[i]` is its name.
pub(crate) fn find_cycle(edges: &[Vec<NodeId>], names: &[&str]) -> Option<Vec<String>> {
    let mut detector = CycleDetector::new(edges);
    for start in 0..edges.len() {
        let node = NodeId::new(start);
        if detector.is_visited(node) {
            continue;
        }
        if let Some(found) = detector.visit(node) {
            let named = found
                .into_iter()
                .map(|id| names.get(id.index()).copied().unwrap_or_default().to_owned())
                .collect();
            return Some(canonicalize_cycle(named));
        }
    }
    None
}

struct CycleDetector<'a> {
    edges: &'a [Vec<NodeId>],
    stack: Vec<NodeId>,
    states: Vec<VisitState>,
}

impl<'a> CycleDetector<'a> {
    fn new(edges: &'a [Vec<NodeId>]) -> Self {
        Self {
            edges,
            stack: Vec::new(),
            states: vec![VisitState::Unvisited; edges.len()],
        }
    }

    fn state(&self, node: NodeId) -> VisitState {
        self.states
            .get(node.index())
            .copied()
            .unwrap_or(VisitState::Visited)
    }

    fn set_state(&mut self, node: NodeId, state: VisitState) {
        if let Some(slot) = self.states.get_mut(node.index()) {
            *slot = state;
        }
    }

    fn is_visited(&self, node: NodeId) -> bool {
        self.state(node) == VisitState::Visited
    }

    fn visit(&mut self, node: NodeId) -> Option<Vec<NodeId>> {
        match self.state(node) {
            VisitState::Visited => return None,
            VisitState::Visiting => {
                let idx = self
                    .stack
                    .iter()
                    .position(|n| *n == node)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting node must be on the stack");
                        0
                    });
                let mut cycle: Vec<NodeId> = self.stack.iter().skip(idx).copied().collect();
                cycle.push(node);
                return Some(cycle);
            }
            VisitState::Unvisited => self.set_state(node, VisitState::Visiting),
        }

        self.stack.push(node);

        let edges = self.edges;
        for input in edges.get(node.index()).into_iter().flatten() {
            if let Some(cycle) = self.visit(*input) {
                return Some(cycle);
            }
        }

        self.stack.pop();
        self.set_state(node, VisitState::Visited);
        None
    }
}

fn canonicalize_cycle(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        slot.clone_from(&first);
    }
    cycle
}
