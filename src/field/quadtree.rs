use eframe::egui::{Pos2, Rect, pos2};

/// Subdivision stops at this depth; deeper leaves keep accepting points past
/// their capacity so that coincident points cannot split forever.
const QUADTREE_MAX_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct IndexedPoint {
    pub(crate) position: Pos2,
    pub(crate) index: usize,
}

impl IndexedPoint {
    pub(crate) fn new(position: Pos2, index: usize) -> Self {
        Self { position, index }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Quadrant {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Quadrant {
    const INSERT_ORDER: [Self; 4] = [
        Self::NorthEast,
        Self::NorthWest,
        Self::SouthEast,
        Self::SouthWest,
    ];
    const QUERY_ORDER: [Self; 4] = [
        Self::NorthWest,
        Self::NorthEast,
        Self::SouthWest,
        Self::SouthEast,
    ];

    fn slot(self) -> usize {
        match self {
            Self::NorthEast => 0,
            Self::NorthWest => 1,
            Self::SouthEast => 2,
            Self::SouthWest => 3,
        }
    }

    /// North is toward smaller `y`, matching screen coordinates.
    fn region_of(self, parent: Rect) -> Rect {
        let mid = parent.center();
        match self {
            Self::NorthEast => {
                Rect::from_min_max(pos2(mid.x, parent.min.y), pos2(parent.max.x, mid.y))
            }
            Self::NorthWest => Rect::from_min_max(parent.min, mid),
            Self::SouthEast => Rect::from_min_max(mid, parent.max),
            Self::SouthWest => {
                Rect::from_min_max(pos2(parent.min.x, mid.y), pos2(mid.x, parent.max.y))
            }
        }
    }
}

/// Half-open membership used for insertion, so sibling quadrants never both
/// claim a point lying on their shared edge.
fn region_holds(region: Rect, point: Pos2) -> bool {
    point.x >= region.min.x
        && point.x < region.max.x
        && point.y >= region.min.y
        && point.y < region.max.y
}

fn range_covers(range: Rect, point: Pos2) -> bool {
    point.x >= range.min.x
        && point.x <= range.max.x
        && point.y >= range.min.y
        && point.y <= range.max.y
}

fn regions_overlap(a: Rect, b: Rect) -> bool {
    a.min.x <= b.max.x && b.min.x <= a.max.x && a.min.y <= b.max.y && b.min.y <= a.max.y
}

pub(crate) struct QuadtreeCell {
    pub(crate) region: Rect,
    pub(crate) depth: usize,
    pub(crate) is_leaf: bool,
}

pub(crate) struct QuadNode {
    region: Rect,
    capacity: usize,
    depth: usize,
    points: Vec<IndexedPoint>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    pub(crate) fn new(region: Rect, capacity: usize) -> Self {
        Self::with_depth(region, capacity.max(1), 0)
    }

    fn with_depth(region: Rect, capacity: usize, depth: usize) -> Self {
        Self {
            region,
            capacity,
            depth,
            points: Vec::with_capacity(capacity),
            children: None,
        }
    }

    pub(crate) fn insert(&mut self, point: IndexedPoint) -> bool {
        if !region_holds(self.region, point.position) {
            return false;
        }

        if self.children.is_none() {
            if self.points.len() < self.capacity || self.depth >= QUADTREE_MAX_DEPTH {
                self.points.push(point);
                return true;
            }
            self.subdivide();
        }

        self.insert_into_children(point)
    }

    fn insert_into_children(&mut self, point: IndexedPoint) -> bool {
        let Some(children) = self.children.as_mut() else {
            return false;
        };

        Quadrant::INSERT_ORDER
            .iter()
            .any(|quadrant| children[quadrant.slot()].insert(point))
    }

    fn subdivide(&mut self) {
        let depth = self.depth + 1;
        let region = self.region;
        let capacity = self.capacity;
        let make = |quadrant: Quadrant| {
            Self::with_depth(quadrant.region_of(region), capacity, depth)
        };
        self.children = Some(Box::new([
            make(Quadrant::NorthEast),
            make(Quadrant::NorthWest),
            make(Quadrant::SouthEast),
            make(Quadrant::SouthWest),
        ]));

        let held = std::mem::take(&mut self.points);
        for point in held {
            if !self.insert_into_children(point) {
                self.points.push(point);
            }
        }
    }

    /// Appends every indexed point inside `range` (bounds inclusive) to `found`.
    pub(crate) fn query(&self, range: Rect, found: &mut Vec<IndexedPoint>) {
        if !regions_overlap(self.region, range) {
            return;
        }

        found.extend(
            self.points
                .iter()
                .filter(|point| range_covers(range, point.position)),
        );

        if let Some(children) = self.children.as_ref() {
            for quadrant in Quadrant::QUERY_ORDER {
                children[quadrant.slot()].query(range, found);
            }
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub(crate) fn collect_cells(&self, cells: &mut Vec<QuadtreeCell>) {
        cells.push(QuadtreeCell {
            region: self.region,
            depth: self.depth,
            is_leaf: self.is_leaf(),
        });

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_cells(cells);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    impl QuadNode {
        fn build(
            region: Rect,
            capacity: usize,
            points: impl IntoIterator<Item = IndexedPoint>,
        ) -> (Self, usize) {
            let mut root = Self::new(region, capacity);
            let rejected = points
                .into_iter()
                .filter(|point| !root.insert(*point))
                .count();
            (root, rejected)
        }

        fn child(&self, quadrant: Quadrant) -> Option<&QuadNode> {
            self.children
                .as_ref()
                .map(|children| &children[quadrant.slot()])
        }

        fn len(&self) -> usize {
            self.points.len()
                + self
                    .children
                    .as_ref()
                    .map_or(0, |children| children.iter().map(Self::len).sum())
        }
    }

    fn surface() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0))
    }

    fn sorted_indices(points: &[IndexedPoint]) -> Vec<usize> {
        let mut indices = points.iter().map(|point| point.index).collect::<Vec<_>>();
        indices.sort_unstable();
        indices
    }

    fn brute_force(points: &[IndexedPoint], range: Rect) -> Vec<usize> {
        let matches = points
            .iter()
            .copied()
            .filter(|point| range_covers(range, point.position))
            .collect::<Vec<_>>();
        sorted_indices(&matches)
    }

    fn random_points(rng: &mut StdRng, count: usize, area: Rect) -> Vec<IndexedPoint> {
        (0..count)
            .map(|index| {
                let position = pos2(
                    rng.gen_range(area.min.x..area.max.x),
                    rng.gen_range(area.min.y..area.max.y),
                );
                IndexedPoint::new(position, index)
            })
            .collect()
    }

    fn random_range(rng: &mut StdRng) -> Rect {
        let center = pos2(rng.gen_range(-50.0..850.0), rng.gen_range(-50.0..650.0));
        let half = rng.gen_range(1.0..220.0);
        Rect::from_center_size(center, eframe::egui::vec2(half * 2.0, half * 2.0))
    }

    #[test]
    fn rejects_points_outside_region() {
        let mut tree = QuadNode::new(surface(), 4);
        assert!(!tree.insert(IndexedPoint::new(pos2(-0.1, 10.0), 0)));
        assert!(!tree.insert(IndexedPoint::new(pos2(800.0, 10.0), 1)));
        assert!(!tree.insert(IndexedPoint::new(pos2(10.0, 600.0), 2)));
        assert!(!tree.insert(IndexedPoint::new(pos2(f32::NAN, 10.0), 3)));
        assert!(tree.insert(IndexedPoint::new(pos2(0.0, 0.0), 4)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn splits_once_when_capacity_is_exceeded() {
        let mut tree = QuadNode::new(surface(), 4);
        let spread = [
            pos2(100.0, 100.0),
            pos2(700.0, 100.0),
            pos2(100.0, 500.0),
            pos2(700.0, 500.0),
        ];
        for (index, position) in spread.into_iter().enumerate() {
            assert!(tree.insert(IndexedPoint::new(position, index)));
        }
        assert!(tree.is_leaf());
        assert_eq!(tree.points.len(), 4);

        assert!(tree.insert(IndexedPoint::new(pos2(300.0, 200.0), 4)));
        assert!(!tree.is_leaf());
        assert!(tree.points.is_empty());
        assert_eq!(tree.len(), 5);

        let parent_area = tree.region.area();
        let mut union_area = 0.0;
        for quadrant in Quadrant::INSERT_ORDER {
            let child = tree.child(quadrant).expect("split node has children");
            assert!(child.is_leaf());
            assert!(child.points.len() <= 4);
            assert!((child.region.area() - parent_area / 4.0).abs() < 1e-3);
            assert!(tree.region.contains_rect(child.region));
            union_area += child.region.area();
        }
        assert!((union_area - parent_area).abs() < 1e-3);

        let north_west = tree.child(Quadrant::NorthWest).expect("north west child");
        assert_eq!(sorted_indices(&north_west.points), vec![0, 4]);
    }

    #[test]
    fn query_matches_brute_force_on_uniform_points() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in [0usize, 1, 5, 60, 400] {
            let points = random_points(&mut rng, count, surface());
            let (tree, rejected) = QuadNode::build(surface(), 4, points.iter().copied());
            assert_eq!(rejected, 0);
            assert_eq!(tree.len(), count);

            for _ in 0..40 {
                let range = random_range(&mut rng);
                let mut found = Vec::new();
                tree.query(range, &mut found);
                assert_eq!(sorted_indices(&found), brute_force(&points, range));
            }
        }
    }

    #[test]
    fn query_matches_brute_force_on_dense_clusters() {
        let mut rng = StdRng::seed_from_u64(42);
        let cluster = Rect::from_min_max(pos2(400.0, 300.0), pos2(402.0, 301.5));
        let mut points = random_points(&mut rng, 300, cluster);
        let scattered = random_points(&mut rng, 50, surface());
        points.extend(
            scattered
                .into_iter()
                .map(|point| IndexedPoint::new(point.position, point.index + 300)),
        );

        let (tree, rejected) = QuadNode::build(surface(), 4, points.iter().copied());
        assert_eq!(rejected, 0);

        let mut cells = Vec::new();
        tree.collect_cells(&mut cells);
        assert!(cells.iter().any(|cell| cell.depth >= 6));

        let mut ranges = vec![
            Rect::from_min_max(pos2(399.0, 299.0), pos2(403.0, 302.0)),
            Rect::from_min_max(pos2(401.0, 300.5), pos2(401.5, 301.0)),
        ];
        ranges.extend((0..30).map(|_| random_range(&mut rng)));
        for range in ranges {
            let mut found = Vec::new();
            tree.query(range, &mut found);
            assert_eq!(sorted_indices(&found), brute_force(&points, range));
        }
    }

    #[test]
    fn query_is_independent_of_insertion_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = random_points(&mut rng, 120, surface());
        let range = Rect::from_min_max(pos2(150.0, 120.0), pos2(520.0, 410.0));

        let (forward, _) = QuadNode::build(surface(), 4, points.iter().copied());
        let (backward, _) = QuadNode::build(surface(), 4, points.iter().rev().copied());

        let mut forward_found = Vec::new();
        let mut backward_found = Vec::new();
        forward.query(range, &mut forward_found);
        backward.query(range, &mut backward_found);
        assert_eq!(sorted_indices(&forward_found), sorted_indices(&backward_found));
    }

    #[test]
    fn query_bounds_are_inclusive() {
        let (tree, _) = QuadNode::build(
            surface(),
            4,
            [
                IndexedPoint::new(pos2(100.0, 100.0), 0),
                IndexedPoint::new(pos2(200.0, 200.0), 1),
                IndexedPoint::new(pos2(200.5, 200.0), 2),
            ],
        );
        let mut found = Vec::new();
        tree.query(
            Rect::from_min_max(pos2(100.0, 100.0), pos2(200.0, 200.0)),
            &mut found,
        );
        assert_eq!(sorted_indices(&found), vec![0, 1]);
    }

    #[test]
    fn coincident_points_stop_at_depth_limit() {
        let points = (0..64).map(|index| IndexedPoint::new(pos2(10.0, 10.0), index));
        let (tree, rejected) = QuadNode::build(surface(), 4, points);
        assert_eq!(rejected, 0);
        assert_eq!(tree.len(), 64);

        let mut cells = Vec::new();
        tree.collect_cells(&mut cells);
        let deepest = cells.iter().map(|cell| cell.depth).max().unwrap_or(0);
        assert_eq!(deepest, QUADTREE_MAX_DEPTH);

        let mut found = Vec::new();
        tree.query(Rect::from_center_size(pos2(10.0, 10.0), eframe::egui::vec2(1.0, 1.0)), &mut found);
        assert_eq!(found.len(), 64);
    }
}
