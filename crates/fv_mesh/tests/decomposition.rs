// crates/fv_mesh/tests/decomposition.rs

//! 块网格切分一致性测试

use fv_mesh::{BlockMesh, PatchKind, PolyMesh};

fn total_volume(parts: &[PolyMesh]) -> f64 {
    parts.iter().flat_map(|p| p.cell_volumes()).sum()
}

#[test]
fn test_partitions_cover_the_block() {
    let block = BlockMesh::two_dimensional(7, 3, 7.0, 1.5);
    let whole = block.build().unwrap();
    let parts = block.decompose_x(3).unwrap();

    let n_cells: usize = parts.iter().map(PolyMesh::n_cells).sum();
    assert_eq!(n_cells, whole.n_cells());
    assert!((total_volume(&parts) - total_volume(std::slice::from_ref(&whole))).abs() < 1e-12);

    // 每个分区内部面加上 processor 面等于全局内部面
    let internal: usize = parts.iter().map(PolyMesh::n_internal_faces).sum();
    let processor: usize = parts
        .iter()
        .flat_map(|p| p.patches())
        .filter(|p| p.kind.is_processor())
        .map(|p| p.size)
        .sum();
    assert_eq!(internal + processor / 2, whole.n_internal_faces());
}

#[test]
fn test_processor_patches_are_paired() {
    let parts = BlockMesh::two_dimensional(6, 2, 3.0, 1.0).decompose_x(3).unwrap();
    for (rank, part) in parts.iter().enumerate() {
        for patch in part.patches() {
            let PatchKind::Processor {
                my_rank,
                neighb_rank,
                tag,
            } = patch.kind
            else {
                continue;
            };
            assert_eq!(my_rank, rank);
            let other = parts[neighb_rank]
                .patches()
                .iter()
                .find(|p| p.kind.neighbour_rank() == Some(rank))
                .unwrap();
            assert_eq!(other.size, patch.size);
            match other.kind {
                PatchKind::Processor { tag: t, .. } => assert_eq!(t, tag),
                _ => unreachable!(),
            }

            // 两侧面心一一对应
            let mine = &part.face_centres()[patch.range()];
            let theirs = &parts[neighb_rank].face_centres()[other.range()];
            for (a, b) in mine.iter().zip(theirs) {
                assert!((*a - *b).length() < 1e-12);
            }
        }
    }
}

#[test]
fn test_outer_patches_stay_on_end_partitions() {
    let parts = BlockMesh::one_dimensional(4, 1.0).decompose_x(2).unwrap();
    let size = |part: &PolyMesh, name: &str| part.find_patch(name).map_or(0, |i| part.patches()[i].size);
    assert_eq!(size(&parts[0], "xmin"), 1);
    assert_eq!(size(&parts[0], "xmax"), 0);
    assert_eq!(size(&parts[1], "xmin"), 0);
    assert_eq!(size(&parts[1], "xmax"), 1);
}
