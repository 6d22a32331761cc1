//! Containment hierarchy over a flat set of polygons.
//!
//! Nodes live in an arena and refer to each other by index. A polygon's parent
//! is the smallest polygon that encloses it (even-odd nesting): each child is
//! enclosed by exactly its immediate parent and never by a sibling.

use super::Polygon;

/// One node of a [`ContainmentTree`].
#[derive(Clone, Debug)]
pub struct ContainmentNode {
    pub polygon: Polygon,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Arena-backed containment tree.
#[derive(Clone, Debug, Default)]
pub struct ContainmentTree {
    nodes: Vec<ContainmentNode>,
    roots: Vec<usize>,
}

impl ContainmentTree {
    /// Build the tree for `polygons`.
    ///
    /// Polygons are placed largest first, so every candidate parent is already
    /// in the arena when a polygon is inserted. Input order is preserved among
    /// siblings of equal standing.
    pub fn build(polygons: Vec<Polygon>) -> Self {
        let tags = vec![0; polygons.len()];
        Self::build_tagged(polygons, &tags)
    }

    /// Like [`build`](Self::build), but a polygon only nests inside polygons
    /// carrying the same tag. Polygons from different islands stay in
    /// separate trees even when one island sits inside another's hole.
    pub fn build_tagged(polygons: Vec<Polygon>, tags: &[usize]) -> Self {
        debug_assert_eq!(polygons.len(), tags.len());
        let areas: Vec<f64> = polygons.iter().map(|p| p.area().abs()).collect();
        let mut order: Vec<usize> = (0..polygons.len()).collect();
        order.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]));

        let mut slots: Vec<Option<Polygon>> = polygons.into_iter().map(Some).collect();
        let mut tree = ContainmentTree::default();
        let mut arena_area: Vec<f64> = Vec::with_capacity(slots.len());
        let mut arena_tag: Vec<usize> = Vec::with_capacity(slots.len());

        for idx in order {
            let Some(polygon) = slots[idx].take() else {
                continue;
            };
            if polygon.is_empty() {
                continue;
            }
            let tag = tags.get(idx).copied().unwrap_or(0);
            let probe = polygon.first_point();
            let parent = tree
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, n)| arena_tag[*i] == tag && n.polygon.contains_point(&probe))
                .min_by(|(a, _), (b, _)| arena_area[*a].total_cmp(&arena_area[*b]))
                .map(|(i, _)| i);

            let id = tree.nodes.len();
            tree.nodes.push(ContainmentNode {
                polygon,
                parent,
                children: Vec::new(),
            });
            arena_area.push(areas[idx]);
            arena_tag.push(tag);
            match parent {
                Some(p) => tree.nodes[p].children.push(id),
                None => tree.roots.push(id),
            }
        }
        tree
    }

    #[inline]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    #[inline]
    pub fn node(&self, id: usize) -> &ContainmentNode {
        &self.nodes[id]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of ancestors of `id`.
    pub fn depth(&self, id: usize) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.nodes[p].parent;
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Polygon {
        Polygon::rectangle_mm(min, min, max, max)
    }

    #[test]
    fn test_nested_squares_form_chain() {
        let tree = ContainmentTree::build(vec![square(2.0, 8.0), square(0.0, 10.0), square(4.0, 6.0)]);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots().len(), 1);

        let root = tree.roots()[0];
        assert!((tree.node(root).polygon.area().abs() - square(0.0, 10.0).area()).abs() < 1.0);
        assert_eq!(tree.node(root).children.len(), 1);

        let mid = tree.node(root).children[0];
        let inner = tree.node(mid).children[0];
        assert_eq!(tree.depth(inner), 2);
        assert!(tree.node(inner).children.is_empty());
    }

    #[test]
    fn test_disjoint_polygons_are_roots() {
        let a = Polygon::rectangle_mm(0.0, 0.0, 1.0, 1.0);
        let b = Polygon::rectangle_mm(5.0, 5.0, 6.0, 6.0);
        let tree = ContainmentTree::build(vec![a, b]);
        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.depth(0), 0);
        assert_eq!(tree.depth(1), 0);
    }

    #[test]
    fn test_siblings_not_nested() {
        let outer = square(0.0, 10.0);
        let a = Polygon::rectangle_mm(1.0, 1.0, 4.0, 4.0);
        let b = Polygon::rectangle_mm(6.0, 6.0, 9.0, 9.0);
        let tree = ContainmentTree::build(vec![a, outer, b]);
        let root = tree.roots()[0];
        assert_eq!(tree.node(root).children.len(), 2);
    }

    #[test]
    fn test_tags_keep_islands_apart() {
        // A small island inside the hole of a framed square.
        let frame = square(0.0, 10.0);
        let hole = square(2.0, 8.0);
        let island = square(4.0, 6.0);
        let tree = ContainmentTree::build_tagged(vec![frame, hole, island], &[0, 0, 1]);
        assert_eq!(tree.roots().len(), 2);
        let nested = (0..tree.len()).filter(|&i| tree.depth(i) == 1).count();
        assert_eq!(nested, 1);
    }
}
