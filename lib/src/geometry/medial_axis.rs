//! Medial axis of thin regions.
//!
//! The boundary is sampled densely and triangulated; the circumcenters of the
//! Delaunay triangles are the vertices of the Voronoi diagram of the samples,
//! and Voronoi edges that separate two distant parts of the boundary form the
//! skeleton. Spurs towards convex corners are pruned and the remaining edges
//! are chained into polylines.

use super::{ExPolygon, Point, Polygon, Polyline};
use crate::{Coord, CoordF, SCALED_RESOLUTION};
use spade::{DelaunayTriangulation, Point2, Triangulation};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Skeleton nodes closer than this are merged.
const SNAP_GRID: Coord = 50;

/// Minimum ratio between the distance of the two generating samples and the
/// inscribed radius. Parallel walls give 2, a right-angle corner about 1.41.
const MIN_OPPOSITION: CoordF = 1.6;

/// Compute the medial axis of `expolygon` for beads up to `width` wide.
///
/// Parts of the region wider than `width` produce no skeleton. Branches that
/// end in a corner and are shorter than `width` are removed, as are pieces
/// shorter than half the width.
pub fn medial_axis(expolygon: &ExPolygon, width: Coord) -> Vec<Polyline> {
    if expolygon.is_empty() || width <= 0 {
        return Vec::new();
    }
    let bb = expolygon.bounding_box();
    let origin = bb.min;
    let step = (width / 4).max(SCALED_RESOLUTION / 4).max(1) as CoordF;

    let mut dt: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    for ring in std::iter::once(&expolygon.contour).chain(expolygon.holes.iter()) {
        for (x, y) in sample_ring(ring, origin, step) {
            if let Err(e) = dt.insert(Point2::new(x, y)) {
                log::trace!("medial axis: skipped boundary sample: {e:?}");
            }
        }
    }

    // Voronoi vertices that lie inside the region and are narrow enough.
    let max_radius = width as CoordF * 0.55;
    let mut nodes: Vec<Point> = Vec::new();
    let mut node_of_key: HashMap<(Coord, Coord), usize> = HashMap::new();
    let mut node_of_face: HashMap<usize, (usize, CoordF)> = HashMap::new();
    for face in dt.inner_faces() {
        let c = face.circumcenter();
        if !c.x.is_finite() || !c.y.is_finite() {
            continue;
        }
        let v = face.vertices()[0].position();
        let radius = (c.x - v.x).hypot(c.y - v.y);
        if radius > max_radius {
            continue;
        }
        let p = Point::new(c.x.round() as Coord + origin.x, c.y.round() as Coord + origin.y);
        if !expolygon.contains_point(&p) {
            continue;
        }
        let key = (p.x.div_euclid(SNAP_GRID), p.y.div_euclid(SNAP_GRID));
        let node = *node_of_key.entry(key).or_insert_with(|| {
            nodes.push(p);
            nodes.len() - 1
        });
        node_of_face.insert(face.fix().index(), (node, radius));
    }

    // A Voronoi edge belongs to the skeleton when the two samples it separates
    // face each other across the region rather than meeting at a corner.
    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for edge in dt.directed_edges() {
        let (Some(left), Some(right)) = (edge.face().as_inner(), edge.rev().face().as_inner())
        else {
            continue;
        };
        let (fa, fb) = (left.fix().index(), right.fix().index());
        if fa >= fb {
            continue;
        }
        let (Some(&(na, ra)), Some(&(nb, rb))) = (node_of_face.get(&fa), node_of_face.get(&fb))
        else {
            continue;
        };
        if na == nb {
            continue;
        }
        let (a, b) = (edge.from().position(), edge.to().position());
        if (a.x - b.x).hypot(a.y - b.y) < MIN_OPPOSITION * ra.max(rb) {
            continue;
        }
        edges.insert((na.min(nb), na.max(nb)));
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for &(a, b) in &edges {
        adjacency[a].push(b);
        adjacency[b].push(a);
    }

    let mut paths = walk_graph(&adjacency);
    prune_spurs(&mut paths, &nodes, width as CoordF);
    join_paths(&mut paths);

    paths
        .into_iter()
        .map(|path| {
            Polyline::from_points(path.iter().map(|&i| nodes[i]).collect())
                .simplified(SCALED_RESOLUTION)
        })
        .filter(|pl| pl.length() >= width as CoordF / 2.0)
        .collect()
}

/// Sample a ring at roughly `step` spacing, relative to `origin`.
fn sample_ring(ring: &Polygon, origin: Point, step: CoordF) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for line in ring.lines() {
        let a = (line.a - origin).to_f64();
        let b = (line.b - origin).to_f64();
        let n = (line.length() / step).ceil().max(1.0) as usize;
        for k in 0..n {
            let t = k as f64 / n as f64;
            out.push((a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
        }
    }
    out
}

/// Split the skeleton graph into chains between nodes of degree other than two.
fn walk_graph(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let key = |a: usize, b: usize| (a.min(b), a.max(b));
    let mut used: HashSet<(usize, usize)> = HashSet::new();
    let mut paths = Vec::new();

    let walk = |start: usize, next: usize, used: &mut HashSet<(usize, usize)>| {
        let mut path = vec![start];
        let mut cur = next;
        used.insert(key(start, next));
        loop {
            path.push(cur);
            if adjacency[cur].len() != 2 || cur == start {
                break;
            }
            match adjacency[cur].iter().find(|&&n| !used.contains(&key(cur, n))) {
                Some(&n) => {
                    used.insert(key(cur, n));
                    cur = n;
                }
                None => break,
            }
        }
        path
    };

    // open chains first, then whatever is left are closed cycles
    for pass_cycles in [false, true] {
        for start in 0..adjacency.len() {
            if !pass_cycles && adjacency[start].len() == 2 {
                continue;
            }
            for &next in &adjacency[start] {
                if !used.contains(&key(start, next)) {
                    paths.push(walk(start, next, &mut used));
                }
            }
        }
    }
    paths
}

fn path_length(path: &[usize], nodes: &[Point]) -> CoordF {
    path.windows(2).map(|w| nodes[w[0]].distance(&nodes[w[1]])).sum()
}

fn end_counts(paths: &[Vec<usize>]) -> HashMap<usize, usize> {
    let mut counts = HashMap::new();
    for path in paths {
        if let (Some(&a), Some(&b)) = (path.first(), path.last()) {
            *counts.entry(a).or_insert(0) += 1;
            *counts.entry(b).or_insert(0) += 1;
        }
    }
    counts
}

/// Remove short chains hanging off a junction with a free end.
fn prune_spurs(paths: &mut Vec<Vec<usize>>, nodes: &[Point], max_length: CoordF) {
    loop {
        let counts = end_counts(paths);
        let spur = paths.iter().position(|path| {
            let (a, b) = (path[0], path[path.len() - 1]);
            if a == b {
                return false;
            }
            let (ca, cb) = (counts[&a], counts[&b]);
            let hangs = (ca == 1 && cb >= 3) || (cb == 1 && ca >= 3);
            hangs && path_length(path, nodes) < max_length
        });
        match spur {
            Some(i) => {
                paths.remove(i);
            }
            None => break,
        }
    }
}

/// Merge chains that meet end to end at a node no other chain touches.
fn join_paths(paths: &mut Vec<Vec<usize>>) {
    loop {
        let counts = end_counts(paths);
        let mut pair = None;
        'search: for (i, p) in paths.iter().enumerate() {
            if p[0] == p[p.len() - 1] {
                continue;
            }
            for &v in [p[0], p[p.len() - 1]].iter() {
                if counts[&v] != 2 {
                    continue;
                }
                if let Some(j) = paths.iter().enumerate().position(|(j, q)| {
                    j != i && q[0] != q[q.len() - 1] && (q[0] == v || q[q.len() - 1] == v)
                }) {
                    pair = Some((i, j, v));
                    break 'search;
                }
            }
        }
        let Some((i, j, v)) = pair else { break };
        let mut second = paths[j].clone();
        let first = &mut paths[i];
        if first[0] == v {
            first.reverse();
        }
        if second[0] != v {
            second.reverse();
        }
        first.extend_from_slice(&second[1..]);
        paths.remove(j);
    }
}
