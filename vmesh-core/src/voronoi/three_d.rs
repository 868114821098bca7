use std::collections::HashSet;

use vmesh_geom::{polygon_area_centroid3, tetra_signed_volume_centroid, Vector3};
use vmesh_topology::VertexId;

use super::{CellRecord, FaceRecord, VoronoiView};
use crate::error::{Result, TessellationError};
use crate::tessellator::Tessellator3D;

pub type Face3D = FaceRecord<Vector3<f64>>;
pub type Cell3D = CellRecord<Vector3<f64>>;
pub type VoronoiView3D = VoronoiView<Vector3<f64>>;

fn to_vec(p: [f64; 3]) -> Vector3<f64> {
    Vector3::new(p[0], p[1], p[2])
}

/// Builds the Voronoi dual of every local generator in `tess`.
///
/// For each generator `g`, every other vertex sharing a tetrahedron with
/// it defines a Delaunay edge `(g, a)`; rotating around that edge
/// ([`Tessellator3D::rotate_around_edge`]) yields the ring of
/// circumcenters bounding the dual face. The cell's volume and centroid
/// accumulate as a sum of tetrahedra fanned from `g` over each face's own
/// triangle fan.
pub fn build_voronoi(tess: &Tessellator3D) -> Result<VoronoiView3D> {
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
        let incident = tess.incident_simplices(g);
        if incident.is_empty() {
            continue;
        }

        let mut neighbors = Vec::new();
        let mut seen_n: HashSet<VertexId> = HashSet::new();
        for &sid in &incident {
            for &v in &tess.simplex_store().get(sid).vertices {
                if v != g && seen_n.insert(v) {
                    neighbors.push(v);
                }
            }
        }

        let pg = to_vec(vs.position(g));
        let mut volume = 0.0_f64;
        let mut moment = Vector3::zeros();
        let mut face_ids = Vec::new();

        for a in neighbors {
            let seed = incident
                .iter()
                .copied()
                .find(|&sid| tess.simplex_store().get(sid).vertices.contains(&a))
                .expect("a came from an incident tet, so one must contain both g and a");
            let ring = tess.rotate_around_edge(seed, g, a);
            if ring.len() < 3 {
                continue;
            }
            let mut polygon = Vec::with_capacity(ring.len());
            for &(tid, _slot) in &ring {
                let verts = tess.simplex_store().get(tid).vertices;
                let p = [
                    to_vec(vs.position(verts[0])),
                    to_vec(vs.position(verts[1])),
                    to_vec(vs.position(verts[2])),
                    to_vec(vs.position(verts[3])),
                ];
                if let Some(c) = vmesh_geom::circumcenter3(p[0], p[1], p[2], p[3]) {
                    polygon.push(c);
                }
            }
            if polygon.len() < 3 {
                continue;
            }

            let normal_hint = pg - to_vec(vs.position(a));
            let (area, face_centroid) = polygon_area_centroid3(&polygon, normal_hint);
            for i in 1..polygon.len() - 1 {
                let (vol, tet_centroid) =
                    tetra_signed_volume_centroid(pg, polygon[0], polygon[i], polygon[i + 1]);
                let vol = vol.abs();
                volume += vol;
                moment += vol * tet_centroid;
            }

            let is_ghost = vs.is_ghost(a);
            if !is_ghost && a.0 <= g.0 {
                continue;
            }
            faces.push(Face3D {
                sid: if is_ghost { 1 } else { 0 },
                left: g,
                right: a,
                area,
                midpoint: face_centroid,
                polygon,
            });
            face_ids.push(faces.len() - 1);
        }

        let centroid = if volume > 0.0 { moment / volume } else { pg };
        cells.push(Cell3D {
            generator: g,
            volume,
            centroid,
            faces: face_ids,
        });
    }

    Ok(VoronoiView3D { cells, faces })
}

/// Tab-separated text dump, analogous to [`super::two_d::print_voronoi`].
pub fn print_voronoi(view: &VoronoiView3D) -> String {
    let mut out = String::new();
    for cell in &view.cells {
        out.push_str(&format!(
            "C\t{}\t{}\t{}\t{}\t{}\n",
            cell.centroid.x,
            cell.centroid.y,
            cell.centroid.z,
            cell.volume,
            cell.faces.len()
        ));
        for &fid in &cell.faces {
            let f = &view.faces[fid];
            out.push_str(&format!(
                "F\t{}\t{}\t{}\t{}\t{}",
                f.sid, f.area, f.midpoint.x, f.midpoint.y, f.midpoint.z
            ));
            for v in &f.polygon {
                out.push_str(&format!("\t({} {} {})", v.x, v.y, v.z));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessellatorConfig;

    #[test]
    fn unit_cube_cells_have_expected_volume_and_centroid() {
        let config = TessellatorConfig::new(vec![0.0, 0.0, 0.0], 1.0);
        let mut tess = Tessellator3D::init(config);
        let corners = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
        ];
        for c in corners {
            tess.add_local_vertex(c).unwrap();
        }
        tess.consolidate();
        for x in -1..=2 {
            for y in -1..=2 {
                for z in -1..=2 {
                    let inside = (0..=1).contains(&x) && (0..=1).contains(&y) && (0..=1).contains(&z);
                    if inside {
                        continue;
                    }
                    tess.add_ghost_vertex([x as f64, y as f64, z as f64]).unwrap();
                }
            }
        }
        let view = build_voronoi(&tess).unwrap();
        assert_eq!(view.cells.len(), 8);
        let total: f64 = view.total_volume();
        assert!((total - 1.0).abs() < 1e-6, "expected total volume 1, got {total}");
    }
}
