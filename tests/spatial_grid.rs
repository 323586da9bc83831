use glam::{IVec3, Vec3};

use particle_entity_bridge::spatial::{Aabb, HierarchicalHashGrid};

fn grid() -> HierarchicalHashGrid<u32> {
    let mut grid = HierarchicalHashGrid::new();
    assert!(grid.init(3, &[100.0, 1000.0, 10000.0]));
    grid
}

fn found(grid: &HierarchicalHashGrid<u32>, point: Vec3, level: usize) -> Vec<u32> {
    let mut out = Vec::new();
    grid.find_overlapping(point, level, &mut out);
    out
}

#[test]
fn every_point_inside_a_box_finds_it_until_removed() {
    let mut grid = grid();
    let bounds = Aabb::new(Vec3::new(-150.0, 20.0, 0.0), Vec3::new(230.0, 180.0, 40.0));
    let index = grid.add(9, &bounds, 0).unwrap();

    let points = [
        bounds.min,
        bounds.max,
        bounds.center(),
        Vec3::new(-149.0, 179.0, 39.0),
        Vec3::new(229.0, 21.0, 1.0),
        Vec3::new(0.0, 100.0, 20.0),
    ];
    for point in points {
        assert!(found(&grid, point, 0).contains(&9), "missing at {point}");
    }

    assert!(grid.remove(index, &bounds, 0));
    for point in points {
        assert!(!found(&grid, point, 0).contains(&9), "still present at {point}");
    }
    assert_eq!(grid.cell_count(0), 0);
}

#[test]
fn a_max_corner_on_a_cell_boundary_claims_no_extra_cell() {
    let mut grid = grid();
    let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(100.0));
    grid.add(1, &bounds, 0).unwrap();

    assert_eq!(grid.cell_count(0), 1);
    assert!(grid.find_cell(0, 0, 0, 0).is_some());
    assert!(grid.find_cell(1, 0, 0, 0).is_none());
    assert!(grid.find_cell(1, 1, 1, 0).is_none());
    assert_eq!(grid.cell_coords(Vec3::splat(100.0), 0), Some(IVec3::ONE));
}

#[test]
fn degenerate_box_on_a_boundary_keeps_its_cell() {
    let mut grid = grid();
    let point = Vec3::splat(200.0);
    grid.add(4, &Aabb::new(point, point), 0).unwrap();
    assert_eq!(found(&grid, point, 0), vec![4]);
}

#[test]
fn levels_are_independent() {
    let mut grid = grid();
    let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(50.0));
    grid.add(1, &bounds, 0).unwrap();
    grid.add(2, &bounds, 2).unwrap();

    assert_eq!(found(&grid, Vec3::splat(10.0), 0), vec![1]);
    assert_eq!(found(&grid, Vec3::splat(10.0), 1), Vec::<u32>::new());
    assert_eq!(found(&grid, Vec3::splat(5000.0), 2), vec![2]);
    assert!(grid.add(3, &bounds, 7).is_none());
}
