// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Erdsketch-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Erdsketch and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Layered (Sugiyama-style) graph layout over sized boxes.
//!
//! Phases:
//! 1. cycle removal (greedy feedback arc set)
//! 2. longest-path rank assignment
//! 3. dummy nodes for edges spanning several ranks
//! 4. crossing reduction (barycenter sweeps)
//! 5. coordinate assignment
//!
//! Results are deterministic: every tie is broken by insertion order.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Position, Size};

/// Direction in which ranks advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDir {
    LeftRight,
    TopBottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayeredOptions {
    pub rank_dir: RankDir,
    /// Gap between neighbouring boxes of one rank.
    pub node_sep: f64,
    /// Gap between consecutive ranks.
    pub rank_sep: f64,
    pub crossing_passes: usize,
}

impl Default for LayeredOptions {
    fn default() -> Self {
        Self {
            rank_dir: RankDir::LeftRight,
            node_sep: 150.0,
            rank_sep: 150.0,
            crossing_passes: 24,
        }
    }
}

/// Input graph. Nodes keep insertion order; malformed edges are dropped on insert.
#[derive(Debug, Clone, Default)]
pub struct LayeredGraph {
    names: Vec<String>,
    sizes: Vec<Size>,
    index: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
}

impl LayeredGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node; a repeated name keeps the first size.
    pub fn add_node(&mut self, name: impl Into<String>, size: Size) {
        let name = name.into();
        if self.index.contains_key(&name) {
            return;
        }
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.sizes.push(size);
    }

    /// Adds an edge. Self-loops, duplicates (in either direction) and edges touching unknown
    /// nodes are skipped, and `false` is returned.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if from == to
            || self
                .edges
                .iter()
                .any(|&(a, b)| (a, b) == (from, to) || (a, b) == (to, from))
        {
            return false;
        }
        self.edges.push((from, to));
        true
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayeredLayout {
    centers: BTreeMap<String, Position>,
    ranks: Vec<Vec<String>>,
}

impl LayeredLayout {
    /// Box centers keyed by node name.
    pub fn centers(&self) -> &BTreeMap<String, Position> {
        &self.centers
    }

    pub fn into_centers(self) -> BTreeMap<String, Position> {
        self.centers
    }

    /// Real nodes per rank, in final order.
    pub fn ranks(&self) -> &[Vec<String>] {
        &self.ranks
    }
}

/// A node of the layering graph: either a real node or a dummy on a long edge.
#[derive(Debug, Clone, Copy)]
struct LayerNode {
    real: Option<usize>,
    rank: usize,
    main_extent: f64,
    cross_extent: f64,
}

pub fn layout_layered(graph: &LayeredGraph, options: &LayeredOptions) -> LayeredLayout {
    let n = graph.node_count();
    if n == 0 {
        return LayeredLayout::default();
    }

    let order = greedy_fas_order(n, &graph.edges);
    let mut order_pos = vec![0usize; n];
    for (pos, &node) in order.iter().enumerate() {
        order_pos[node] = pos;
    }

    // Orient every edge forward in the FAS order, which makes the graph acyclic.
    let acyclic = graph
        .edges
        .iter()
        .map(|&(a, b)| if order_pos[a] < order_pos[b] { (a, b) } else { (b, a) })
        .collect::<Vec<_>>();

    let ranks = assign_ranks(&order, &acyclic, n);

    let (nodes, succs, preds) = build_layer_graph(graph, options.rank_dir, &ranks, &acyclic);

    let rank_count = nodes.iter().map(|node| node.rank).max().unwrap_or(0) + 1;
    let mut layers = vec![Vec::<usize>::new(); rank_count];
    for (idx, node) in nodes.iter().enumerate() {
        layers[node.rank].push(idx);
    }

    minimise_crossings(&mut layers, &succs, &preds, options.crossing_passes);

    let cross = assign_cross_coordinates(&layers, &nodes, &succs, &preds, options.node_sep);

    let mut thickness = vec![0.0f64; rank_count];
    for node in &nodes {
        thickness[node.rank] = thickness[node.rank].max(node.main_extent);
    }
    let mut rank_start = Vec::with_capacity(rank_count);
    let mut cursor = 0.0;
    for t in &thickness {
        rank_start.push(cursor);
        cursor += t + options.rank_sep;
    }

    let min_cross = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.real.is_some())
        .map(|(idx, node)| cross[idx] - node.cross_extent / 2.0)
        .fold(f64::INFINITY, f64::min);
    let min_cross = if min_cross.is_finite() { min_cross } else { 0.0 };

    let mut centers = BTreeMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        let Some(real) = node.real else {
            continue;
        };
        let main = rank_start[node.rank] + thickness[node.rank] / 2.0;
        let cross = cross[idx] - min_cross;
        let center = match options.rank_dir {
            RankDir::LeftRight => Position::new(main, cross),
            RankDir::TopBottom => Position::new(cross, main),
        };
        centers.insert(graph.names[real].clone(), center);
    }

    let ranks = layers
        .iter()
        .map(|layer| {
            layer
                .iter()
                .filter_map(|&idx| nodes[idx].real.map(|real| graph.names[real].clone()))
                .collect::<Vec<_>>()
        })
        .filter(|layer| !layer.is_empty())
        .collect();

    LayeredLayout { centers, ranks }
}

/// Eades' greedy feedback-arc-set ordering: sinks go to the back, sources to the front, and
/// otherwise the node with the largest out-minus-in degree moves to the front.
fn greedy_fas_order(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut out_adj = vec![Vec::new(); n];
    let mut in_adj = vec![Vec::new(); n];
    for &(a, b) in edges {
        out_adj[a].push(b);
        in_adj[b].push(a);
    }
    let mut out_deg = out_adj.iter().map(Vec::len).collect::<Vec<_>>();
    let mut in_deg = in_adj.iter().map(Vec::len).collect::<Vec<_>>();
    let mut removed = vec![false; n];
    let mut front = Vec::with_capacity(n);
    let mut back = Vec::new();

    let mut remaining = n;
    while remaining > 0 {
        let active = (0..n).filter(|&v| !removed[v]);
        let next = if let Some(sink) = active.clone().find(|&v| out_deg[v] == 0) {
            back.push(sink);
            sink
        } else if let Some(source) = active.clone().find(|&v| in_deg[v] == 0) {
            front.push(source);
            source
        } else {
            let mut best = None::<(usize, isize)>;
            for v in active {
                let score = out_deg[v] as isize - in_deg[v] as isize;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((v, score));
                }
            }
            let Some((v, _)) = best else {
                break;
            };
            front.push(v);
            v
        };
        removed[next] = true;
        for &w in &out_adj[next] {
            if !removed[w] {
                in_deg[w] -= 1;
            }
        }
        for &u in &in_adj[next] {
            if !removed[u] {
                out_deg[u] -= 1;
            }
        }
        remaining -= 1;
    }

    back.reverse();
    front.extend(back);
    front
}

/// Longest-path ranking. `order` must be a topological order of `edges`.
fn assign_ranks(order: &[usize], edges: &[(usize, usize)], n: usize) -> Vec<usize> {
    let mut outgoing = vec![Vec::new(); n];
    for &(a, b) in edges {
        outgoing[a].push(b);
    }

    let mut ranks = vec![0usize; n];
    for &from in order {
        for &to in &outgoing[from] {
            ranks[to] = ranks[to].max(ranks[from] + 1);
        }
    }
    ranks
}

type Adjacency = Vec<Vec<usize>>;

fn build_layer_graph(
    graph: &LayeredGraph,
    rank_dir: RankDir,
    ranks: &[usize],
    edges: &[(usize, usize)],
) -> (Vec<LayerNode>, Adjacency, Adjacency) {
    let mut nodes = graph
        .sizes
        .iter()
        .enumerate()
        .map(|(idx, size)| {
            let (main_extent, cross_extent) = match rank_dir {
                RankDir::LeftRight => (size.width, size.height),
                RankDir::TopBottom => (size.height, size.width),
            };
            LayerNode {
                real: Some(idx),
                rank: ranks[idx],
                main_extent,
                cross_extent,
            }
        })
        .collect::<Vec<_>>();

    let mut links = Vec::new();
    for &(from, to) in edges {
        let mut prev = from;
        for rank in ranks[from] + 1..ranks[to] {
            let dummy = nodes.len();
            nodes.push(LayerNode {
                real: None,
                rank,
                main_extent: 0.0,
                cross_extent: 0.0,
            });
            links.push((prev, dummy));
            prev = dummy;
        }
        links.push((prev, to));
    }

    let mut succs = vec![Vec::new(); nodes.len()];
    let mut preds = vec![Vec::new(); nodes.len()];
    for (a, b) in links {
        succs[a].push(b);
        preds[b].push(a);
    }
    (nodes, succs, preds)
}

fn minimise_crossings(layers: &mut [Vec<usize>], succs: &Adjacency, preds: &Adjacency, passes: usize) {
    if layers.len() < 2 {
        return;
    }

    let mut best = layers.to_vec();
    let mut best_crossings = count_all_crossings(layers, succs);

    for pass in 0..passes {
        if best_crossings == 0 {
            break;
        }
        if pass % 2 == 0 {
            for rank in 1..layers.len() {
                let (fixed, moving) = layers.split_at_mut(rank);
                sort_by_barycenter(&mut moving[0], &fixed[rank - 1], preds);
            }
        } else {
            for rank in (0..layers.len() - 1).rev() {
                let (moving, fixed) = layers.split_at_mut(rank + 1);
                sort_by_barycenter(&mut moving[rank], &fixed[0], succs);
            }
        }

        let crossings = count_all_crossings(layers, succs);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.to_vec();
        }
    }

    layers.clone_from_slice(&best);
}

/// Reorders `layer` by the mean position of each node's neighbours in `fixed`.
/// Nodes without neighbours there keep their current index as barycenter.
fn sort_by_barycenter(layer: &mut [usize], fixed: &[usize], neighbours: &Adjacency) {
    let fixed_pos = fixed
        .iter()
        .enumerate()
        .map(|(pos, &node)| (node, pos as f64))
        .collect::<HashMap<_, _>>();

    let mut keyed = layer
        .iter()
        .enumerate()
        .map(|(current, &node)| {
            let (sum, count) = neighbours[node]
                .iter()
                .filter_map(|other| fixed_pos.get(other))
                .fold((0.0, 0usize), |(sum, count), pos| (sum + pos, count + 1));
            let bary = if count == 0 {
                current as f64
            } else {
                sum / count as f64
            };
            (bary, current, node)
        })
        .collect::<Vec<_>>();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    for (slot, (_, _, node)) in layer.iter_mut().zip(keyed) {
        *slot = node;
    }
}

fn count_all_crossings(layers: &[Vec<usize>], succs: &Adjacency) -> usize {
    layers
        .windows(2)
        .map(|pair| count_crossings(&pair[0], &pair[1], succs))
        .sum()
}

fn count_crossings(upper: &[usize], lower: &[usize], succs: &Adjacency) -> usize {
    let lower_pos = lower
        .iter()
        .enumerate()
        .map(|(pos, &node)| (node, pos))
        .collect::<HashMap<_, _>>();

    let mut segments = Vec::new();
    for (upper_pos, &node) in upper.iter().enumerate() {
        for succ in &succs[node] {
            if let Some(&pos) = lower_pos.get(succ) {
                segments.push((upper_pos, pos));
            }
        }
    }

    let mut crossings = 0;
    for (i, &(a1, b1)) in segments.iter().enumerate() {
        for &(a2, b2) in &segments[i + 1..] {
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

/// Packs every rank along the cross axis, then pulls boxes toward the barycenter of their
/// neighbours while keeping order and `node_sep` spacing.
fn assign_cross_coordinates(
    layers: &[Vec<usize>],
    nodes: &[LayerNode],
    succs: &Adjacency,
    preds: &Adjacency,
    node_sep: f64,
) -> Vec<f64> {
    let mut cross = vec![0.0f64; nodes.len()];
    for layer in layers {
        let mut cursor = 0.0;
        for &node in layer {
            let extent = nodes[node].cross_extent;
            cross[node] = cursor + extent / 2.0;
            cursor += extent + node_sep;
        }
    }

    const REFINE_ITERATIONS: usize = 8;
    for iteration in 0..REFINE_ITERATIONS {
        let downward = iteration % 2 == 0;
        let rank_order = if downward {
            (0..layers.len()).collect::<Vec<_>>()
        } else {
            (0..layers.len()).rev().collect::<Vec<_>>()
        };

        for rank in rank_order {
            let layer = &layers[rank];
            let neighbours = if downward { preds } else { succs };

            let desired = layer
                .iter()
                .map(|&node| {
                    let linked = &neighbours[node];
                    if linked.is_empty() {
                        cross[node]
                    } else {
                        linked.iter().map(|&other| cross[other]).sum::<f64>() / linked.len() as f64
                    }
                })
                .collect::<Vec<_>>();

            let mut placed = Vec::with_capacity(layer.len());
            for (pos, &node) in layer.iter().enumerate() {
                let mut center = desired[pos];
                if pos > 0 {
                    let prev = layer[pos - 1];
                    let min_center = placed[pos - 1]
                        + (nodes[prev].cross_extent + nodes[node].cross_extent) / 2.0
                        + node_sep;
                    center = center.max(min_center);
                }
                placed.push(center);
            }

            // The forward pass only pushes boxes one way; recenter on the desired mean.
            let shift = (desired.iter().sum::<f64>() - placed.iter().sum::<f64>())
                / layer.len().max(1) as f64;
            for (pos, &node) in layer.iter().enumerate() {
                cross[node] = placed[pos] + shift;
            }
        }
    }

    cross
}

#[cfg(test)]
mod tests {
    use super::{greedy_fas_order, layout_layered, LayeredGraph, LayeredOptions, RankDir};
    use crate::model::{Position, Rect, Size};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> LayeredGraph {
        let mut g = LayeredGraph::new();
        for name in nodes {
            g.add_node(*name, Size::new(250.0, 114.0));
        }
        for (a, b) in edges {
            g.add_edge(a, b);
        }
        g
    }

    fn rects(g: &LayeredGraph, centers: &std::collections::BTreeMap<String, Position>) -> Vec<Rect> {
        g.names
            .iter()
            .zip(&g.sizes)
            .map(|(name, size)| {
                let c = centers[name];
                Rect::new(c.x - size.width / 2.0, c.y - size.height / 2.0, size.width, size.height)
            })
            .collect()
    }

    fn assert_no_overlap(rects: &[Rect]) {
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn chain_advances_one_rank_per_edge() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let layout = layout_layered(&g, &LayeredOptions::default());

        assert_eq!(
            layout.ranks(),
            &[vec!["a".to_owned()], vec!["b".to_owned()], vec!["c".to_owned()]]
        );
        let c = layout.centers();
        assert!(c["a"].x < c["b"].x && c["b"].x < c["c"].x);
        assert_eq!(c["a"].y, c["b"].y);
    }

    #[test]
    fn top_bottom_advances_vertically() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        let options = LayeredOptions {
            rank_dir: RankDir::TopBottom,
            ..LayeredOptions::default()
        };
        let c = layout_layered(&g, &options).into_centers();
        assert!(c["a"].y < c["b"].y);
        assert_eq!(c["a"].x, c["b"].x);
    }

    #[test]
    fn cycles_are_broken_without_losing_nodes() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let layout = layout_layered(&g, &LayeredOptions::default());

        assert_eq!(layout.centers().len(), 4);
        assert_no_overlap(&rects(&g, layout.centers()));
    }

    #[test]
    fn fas_order_keeps_dag_edges_forward() {
        let order = greedy_fas_order(4, &[(0, 1), (1, 2), (0, 3), (3, 2)]);
        let pos = |v: usize| order.iter().position(|&x| x == v).unwrap();
        assert!(pos(0) < pos(1) && pos(1) < pos(2));
        assert!(pos(0) < pos(3) && pos(3) < pos(2));
    }

    #[test]
    fn malformed_edges_are_skipped() {
        let mut g = graph(&["a", "b"], &[]);
        assert!(g.add_edge("a", "b"));
        assert!(!g.add_edge("b", "a"));
        assert!(!g.add_edge("a", "a"));
        assert!(!g.add_edge("a", "ghost"));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn barycenter_removes_avoidable_crossings() {
        // b->e and c->d cross if the last rank stays in insertion order [d, e].
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "e"), ("c", "d")],
        );
        let layout = layout_layered(&g, &LayeredOptions::default());
        let c = layout.centers();

        assert_eq!(c["b"].y < c["c"].y, c["e"].y < c["d"].y);
    }

    #[test]
    fn long_edges_and_mixed_sizes_never_overlap() {
        let mut g = LayeredGraph::new();
        g.add_node("hub", Size::new(300.0, 400.0));
        for idx in 0..6 {
            g.add_node(format!("n{idx}"), Size::new(250.0 + idx as f64 * 10.0, 80.0 + idx as f64 * 20.0));
        }
        g.add_node("lonely", Size::new(250.0, 82.0));
        for idx in 0..6 {
            g.add_edge("hub", &format!("n{idx}"));
        }
        g.add_edge("n0", "n1");
        g.add_edge("n1", "n2");
        g.add_edge("hub", "n5");
        g.add_edge("n2", "n5");

        let layout = layout_layered(&g, &LayeredOptions::default());
        assert_eq!(layout.centers().len(), 8);
        assert_no_overlap(&rects(&g, layout.centers()));
    }

    #[test]
    fn layout_is_deterministic() {
        let g = graph(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("c", "b"), ("d", "e"), ("e", "a"), ("f", "c")],
        );
        let options = LayeredOptions::default();
        assert_eq!(layout_layered(&g, &options), layout_layered(&g, &options));
    }

    #[test]
    fn empty_graph_yields_empty_layout() {
        let layout = layout_layered(&LayeredGraph::new(), &LayeredOptions::default());
        assert!(layout.centers().is_empty());
    }
}
