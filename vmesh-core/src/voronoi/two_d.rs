use vmesh_geom::{polygon_area_centroid2, Vector2};
use vmesh_topology::VertexId;

use super::{CellRecord, FaceRecord, VoronoiView};
use crate::error::{Result, TessellationError};
use crate::tessellator::Tessellator2D;

pub type Face2D = FaceRecord<Vector2<f64>>;
pub type Cell2D = CellRecord<Vector2<f64>>;
pub type VoronoiView2D = VoronoiView<Vector2<f64>>;

fn to_vec(p: [f64; 2]) -> Vector2<f64> {
    Vector2::new(p[0], p[1])
}

/// Builds the Voronoi dual of every local generator in `tess`.
///
/// In 2D a cell's Delaunay one-ring *is* its dual polygon: rotating
/// around generator `g` visits each incident triangle in order and its
/// circumcenter is the next polygon vertex.
pub fn build_voronoi(tess: &Tessellator2D) -> Result<VoronoiView2D> {
    let vs = tess.vertex_store();
    if !vs.is_consolidated() {
        return Err(TessellationError::InvariantViolation {
            description: "build_voronoi called before consolidate()".into(),
        });
    }
    let aux = tess.aux_count();
    let vertex_end = vs.vertex_end().expect("consolidated store always has vertex_end");

    let mut cells = Vec::new();
    let mut faces = Vec::new();

    for idx in aux..vertex_end {
        let g = VertexId(idx);
        let ring = tess.incident_simplices(g);
        if ring.len() < 3 {
            continue;
        }

        let mut polygon = Vec::with_capacity(ring.len());
        let mut partners = Vec::with_capacity(ring.len());
        for &sid in &ring {
            let verts = tess.simplex_store().get(sid).vertices;
            let slot_g = verts.iter().position(|&v| v == g).expect("ring triangle must contain g");
            let p = [
                to_vec(vs.position(verts[0])),
                to_vec(vs.position(verts[1])),
                to_vec(vs.position(verts[2])),
            ];
            let center = vmesh_geom::circumcenter2(p[0], p[1], p[2]).unwrap_or(p[slot_g]);
            polygon.push(center);
            partners.push(verts[(slot_g + 1) % 3]);
        }

        let (area, centroid) = polygon_area_centroid2(&polygon);
        let n = polygon.len();
        let mut face_ids = Vec::new();
        for i in 0..n {
            let a = partners[i];
            let is_ghost = vs.is_ghost(a);
            if !is_ghost && a.0 <= g.0 {
                continue;
            }
            let p0 = polygon[i];
            let p1 = polygon[(i + 1) % n];
            faces.push(Face2D {
                sid: if is_ghost { 1 } else { 0 },
                left: g,
                right: a,
                area: (p1 - p0).norm(),
                midpoint: (p0 + p1) / 2.0,
                polygon: vec![p0, p1],
            });
            face_ids.push(faces.len() - 1);
        }

        cells.push(Cell2D {
            generator: g,
            volume: area,
            centroid,
            faces: face_ids,
        });
    }

    Ok(VoronoiView2D { cells, faces })
}

/// Tab-separated text dump: one `C` line per cell (centroid,
/// area-as-"volume", face count) followed by its `F` lines.
pub fn print_voronoi(view: &VoronoiView2D) -> String {
    let mut out = String::new();
    for cell in &view.cells {
        out.push_str(&format!(
            "C\t{}\t{}\t0\t{}\t{}\n",
            cell.centroid.x,
            cell.centroid.y,
            cell.volume,
            cell.faces.len()
        ));
        for &fid in &cell.faces {
            let f = &view.faces[fid];
            out.push_str(&format!(
                "F\t{}\t{}\t{}\t{}\t0\n",
                f.sid, f.area, f.midpoint.x, f.midpoint.y
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessellatorConfig;

    #[test]
    fn unit_square_grid_cells_have_unit_area() {
        let config = TessellatorConfig::new(vec![-1.0, -1.0], 6.0);
        let mut tess = Tessellator2D::init(config);
        for x in 0..4 {
            for y in 0..4 {
                tess.add_local_vertex([x as f64, y as f64]).unwrap();
            }
        }
        tess.consolidate();
        // Ring of ghosts well outside the grid closes every interior cell.
        for x in -2..6 {
            for y in -2..6 {
                if (0..4).contains(&x) && (0..4).contains(&y) {
                    continue;
                }
                tess.add_ghost_vertex([x as f64, y as f64]).unwrap();
            }
        }
        let view = build_voronoi(&tess).unwrap();
        assert_eq!(view.cells.len(), 16);
        for cell in &view.cells {
            let p = tess.vertex_store().position(cell.generator);
            let gx = p[0].round();
            let gy = p[1].round();
            let interior = (1.0..=2.0).contains(&gx) && (1.0..=2.0).contains(&gy);
            if interior {
                assert!(
                    (cell.volume - 1.0).abs() < 1e-6,
                    "interior cell at ({gx},{gy}) has area {}",
                    cell.volume
                );
                assert!((cell.centroid - Vector2::new(p[0], p[1])).norm() < 1e-6);
            }
        }
    }
}
