//! Greedy nearest-neighbour ordering.
//!
//! Used to order sibling loops and open paths so the nozzle travels as little
//! as possible between them. The heuristic is deterministic: ties resolve to
//! the lowest index.

use super::{Point, Polyline};

/// Order items tagged by one point each.
///
/// Starts from the item nearest to `start` (or the first item when `start` is
/// `None`) and repeatedly jumps to the nearest unvisited item. Returns indices
/// into `points`.
pub fn chain_points(points: &[Point], start: Option<Point>) -> Vec<usize> {
    let mut order = Vec::with_capacity(points.len());
    if points.is_empty() {
        return order;
    }
    let mut visited = vec![false; points.len()];

    let mut current = match start {
        Some(s) => nearest_unvisited(points, &visited, s).unwrap_or(0),
        None => 0,
    };
    loop {
        visited[current] = true;
        order.push(current);
        match nearest_unvisited(points, &visited, points[current]) {
            Some(next) => current = next,
            None => break,
        }
    }
    order
}

fn nearest_unvisited(points: &[Point], visited: &[bool], from: Point) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| !visited[*i])
        .min_by_key(|(i, p)| (from.distance_squared(p), *i))
        .map(|(i, _)| i)
}

/// Order open paths given by their end points.
///
/// Returns `(index, reversed)` pairs: each path is entered from whichever end
/// is nearer to where the previous one finished. The first path keeps its
/// direction unless `start` is given.
pub fn chain_endpoints(ends: &[(Point, Point)], start: Option<Point>) -> Vec<(usize, bool)> {
    let mut visited = vec![false; ends.len()];
    let mut out = Vec::with_capacity(ends.len());
    let mut cursor = start;

    while out.len() < ends.len() {
        let mut best: Option<(i128, usize, bool)> = None;
        for (i, (first, last)) in ends.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let Some(from) = cursor else {
                best = Some((0, i, false));
                break;
            };
            let d_first = from.distance_squared(first);
            let d_last = from.distance_squared(last);
            let (d, rev) = if d_last < d_first { (d_last, true) } else { (d_first, false) };
            if best.map_or(true, |(bd, _, _)| d < bd) {
                best = Some((d, i, rev));
            }
        }
        let Some((_, i, rev)) = best else { break };
        visited[i] = true;
        cursor = Some(if rev { ends[i].0 } else { ends[i].1 });
        out.push((i, rev));
    }
    out
}

/// Order open polylines, reversing them where entering from the far end is shorter.
pub fn chain_polylines(polylines: Vec<Polyline>, start: Option<Point>) -> Vec<Polyline> {
    let polylines: Vec<Polyline> = polylines.into_iter().filter(|p| !p.is_empty()).collect();
    let ends: Vec<(Point, Point)> = polylines
        .iter()
        .map(|p| (p.first_point(), p.last_point()))
        .collect();
    let order = chain_endpoints(&ends, start);
    let mut slots: Vec<Option<Polyline>> = polylines.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|(i, rev)| {
            let mut pl = slots[i].take()?;
            if rev {
                pl.reverse();
            }
            Some(pl)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_points_greedy() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(10, 0),
            Point::new(50, 0),
        ];
        assert_eq!(chain_points(&pts, None), vec![0, 2, 3, 1]);
        assert_eq!(chain_points(&pts, Some(Point::new(99, 0))), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_chain_points_empty() {
        assert!(chain_points(&[], None).is_empty());
    }

    #[test]
    fn test_chain_polylines_reverses() {
        let a = Polyline::from_points(vec![Point::new(0, 0), Point::new(10, 0)]);
        let b = Polyline::from_points(vec![Point::new(30, 0), Point::new(12, 0)]);
        let out = chain_polylines(vec![a, b], None);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].first_point(), Point::new(12, 0));
    }
}
