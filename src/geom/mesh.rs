//! Polygon mesh with offset-encoded faces.

use std::collections::HashMap;

use glam::Vec3;

use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray, AttributeStorage, DomainMapping};
use crate::scene::MaterialKey;
use crate::util::{Error, Result};

/// Builtin name of the per-face material slot attribute.
pub const MATERIAL_INDEX: &str = "material_index";

/// Non-attribute settings carried over from a source mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshParams {
    /// Faces are shaded smooth unless an attribute says otherwise.
    pub shade_smooth: bool,
    /// Voxel size used by remeshing tools.
    pub remesh_voxel_size: f32,
}

/// Polygon mesh.
///
/// Face `f` spans corners `face_offsets[f]..face_offsets[f + 1]`. Each corner
/// references a vertex (`corner_verts`) and the edge leaving it toward the
/// next corner of the face (`corner_edges`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Edge vertex pairs.
    pub edges: Vec<[u32; 2]>,
    /// Face start offsets into the corner arrays, one more than the face count.
    pub face_offsets: Vec<u32>,
    /// Vertex index of each corner.
    pub corner_verts: Vec<u32>,
    /// Edge index of each corner.
    pub corner_edges: Vec<u32>,
    /// Material slots. `None` is an empty slot.
    pub materials: Vec<Option<MaterialKey>>,
    /// Generic attributes.
    pub attributes: AttributeStorage,
    /// Names of the point float attributes that act as vertex groups.
    pub vertex_group_names: Vec<String>,
    /// Non-attribute settings.
    pub params: MeshParams,
    loose_edges: Option<usize>,
    loose_verts: Option<usize>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self {
            face_offsets: vec![0],
            ..Default::default()
        }
    }

    /// Build a mesh from polygons given as vertex index lists.
    ///
    /// Edges are derived from consecutive corners and deduplicated.
    pub fn from_polygons(positions: Vec<Vec3>, polygons: &[&[u32]]) -> Result<Self> {
        let mut mesh = Self::new();
        let mut edge_lookup: HashMap<(u32, u32), u32> = HashMap::new();
        for polygon in polygons {
            if polygon.len() < 3 {
                return Err(Error::topology(format!(
                    "Polygon with {} corners",
                    polygon.len()
                )));
            }
            for (i, &v) in polygon.iter().enumerate() {
                if v as usize >= positions.len() {
                    return Err(Error::topology(format!(
                        "Vertex index {v} out of range ({} vertices)",
                        positions.len()
                    )));
                }
                let next = polygon[(i + 1) % polygon.len()];
                let key = (v.min(next), v.max(next));
                let edge = *edge_lookup.entry(key).or_insert_with(|| {
                    mesh.edges.push([key.0, key.1]);
                    mesh.edges.len() as u32 - 1
                });
                mesh.corner_verts.push(v);
                mesh.corner_edges.push(edge);
            }
            mesh.face_offsets.push(mesh.corner_verts.len() as u32);
        }
        mesh.positions = positions;
        Ok(mesh)
    }

    /// Get number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Get number of edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Get number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.face_offsets.len().saturating_sub(1)
    }

    /// Get number of face corners.
    #[inline]
    pub fn num_corners(&self) -> usize {
        self.corner_verts.len()
    }

    /// True if the mesh has no elements at all.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.edges.is_empty()
            && self.num_faces() == 0
            && self.corner_verts.is_empty()
    }

    /// Corner range of face `f`.
    #[inline]
    pub fn face_range(&self, f: usize) -> std::ops::Range<usize> {
        self.face_offsets[f] as usize..self.face_offsets[f + 1] as usize
    }

    /// Check offsets and index ranges.
    pub fn validate(&self) -> Result<()> {
        let corners = self.num_corners();
        if self.face_offsets.first().copied().unwrap_or(0) != 0
            || self.face_offsets.last().copied().unwrap_or(0) as usize != corners
        {
            return Err(Error::topology("Face offsets do not span the corner arrays"));
        }
        if self.face_offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::topology("Face offsets are not monotonic"));
        }
        if self.corner_edges.len() != corners {
            return Err(Error::topology("Corner edge count differs from corner vertex count"));
        }
        let verts = self.num_vertices() as u32;
        if self.corner_verts.iter().any(|&v| v >= verts) || self.edges.iter().flatten().any(|&v| v >= verts) {
            return Err(Error::topology("Vertex index out of range"));
        }
        let edges = self.num_edges() as u32;
        if self.corner_edges.iter().any(|&e| e >= edges) {
            return Err(Error::topology("Edge index out of range"));
        }
        Ok(())
    }

    /// Face index of every corner.
    pub fn corner_to_face(&self) -> Vec<u32> {
        let mut map = vec![0_u32; self.num_corners()];
        for f in 0..self.num_faces() {
            map[self.face_range(f)].fill(f as u32);
        }
        map
    }

    /// Count edges not used by any face.
    pub fn count_loose_edges(&self) -> usize {
        let mut used = vec![false; self.num_edges()];
        for &e in &self.corner_edges {
            if let Some(u) = used.get_mut(e as usize) {
                *u = true;
            }
        }
        used.iter().filter(|u| !**u).count()
    }

    /// Count vertices not used by any edge.
    pub fn count_loose_verts(&self) -> usize {
        let mut used = vec![false; self.num_vertices()];
        for &v in self.edges.iter().flatten() {
            if let Some(u) = used.get_mut(v as usize) {
                *u = true;
            }
        }
        used.iter().filter(|u| !**u).count()
    }

    /// Compute and cache the loose element counts.
    pub fn cache_loose_counts(&mut self) {
        self.loose_edges = Some(self.count_loose_edges());
        self.loose_verts = Some(self.count_loose_verts());
    }

    /// Cached number of loose edges, if known.
    #[inline]
    pub fn cached_loose_edges(&self) -> Option<usize> {
        self.loose_edges
    }

    /// Cached number of loose vertices, if known.
    #[inline]
    pub fn cached_loose_verts(&self) -> Option<usize> {
        self.loose_verts
    }

    /// Record that the mesh has no loose edges without recomputing.
    pub fn tag_loose_edges_none(&mut self) {
        self.loose_edges = Some(0);
    }

    /// Record that the mesh has no loose vertices without recomputing.
    pub fn tag_loose_verts_none(&mut self) {
        self.loose_verts = Some(0);
    }

    /// Drop cached topology information after edits.
    pub fn tag_topology_changed(&mut self) {
        self.loose_edges = None;
        self.loose_verts = None;
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        super::bounds(&self.positions)
    }

    /// Unit normal of every face. Degenerate faces get a zero normal.
    pub fn face_normals(&self) -> Vec<Vec3> {
        (0..self.num_faces())
            .map(|f| {
                let corners = &self.corner_verts[self.face_range(f)];
                let mut normal = Vec3::ZERO;
                for (i, &v) in corners.iter().enumerate() {
                    let next = corners[(i + 1) % corners.len()];
                    normal += self.positions[v as usize].cross(self.positions[next as usize]);
                }
                normal.normalize_or_zero()
            })
            .collect()
    }

    /// Normals derived from the faces, moved to `domain`.
    ///
    /// Points and edges average their adjacent faces. Corners take the
    /// normal of their face.
    pub fn normals_on(&self, domain: AttrDomain) -> Vec<Vec3> {
        let faces = self.face_normals();
        if domain == AttrDomain::Face {
            return faces;
        }
        let Some(mapping) = self.domain_mapping(AttrDomain::Face, domain) else {
            return vec![Vec3::ZERO; self.domain_size(domain).unwrap_or(0)];
        };
        mapping
            .apply(&AttributeArray::from_vec(faces))
            .into_typed::<Vec3>()
            .unwrap_or_default()
            .into_iter()
            .map(Vec3::normalize_or_zero)
            .collect()
    }

    /// Next corner within the same face.
    fn next_corner(&self, corner: usize, face: usize) -> usize {
        let range = self.face_range(face);
        if corner + 1 == range.end {
            range.start
        } else {
            corner + 1
        }
    }

    /// Previous corner within the same face.
    fn prev_corner(&self, corner: usize, face: usize) -> usize {
        let range = self.face_range(face);
        if corner == range.start {
            range.end - 1
        } else {
            corner - 1
        }
    }

    fn face_corners(&self) -> impl Iterator<Item = (u32, usize)> + Clone + '_ {
        (0..self.num_faces()).flat_map(move |f| self.face_range(f).map(move |c| (f as u32, c)))
    }
}

impl AttributeAccessor for Mesh {
    fn attributes(&self) -> &AttributeStorage {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeStorage {
        &mut self.attributes
    }

    fn domain_size(&self, domain: AttrDomain) -> Option<usize> {
        match domain {
            AttrDomain::Point => Some(self.num_vertices()),
            AttrDomain::Edge => Some(self.num_edges()),
            AttrDomain::Face => Some(self.num_faces()),
            AttrDomain::Corner => Some(self.num_corners()),
            AttrDomain::Curve | AttrDomain::Instance => None,
        }
    }

    fn domain_mapping(&self, from: AttrDomain, to: AttrDomain) -> Option<DomainMapping> {
        use AttrDomain::{Corner, Edge, Face, Point};

        let verts = &self.corner_verts;
        let edges = &self.corner_edges;
        let corner_faces = self.corner_to_face();
        let mapping = match (from, to) {
            (Point, Corner) => DomainMapping::from_index_map(verts),
            (Edge, Corner) => {
                let pairs = (0..self.num_corners()).flat_map(|c| {
                    let prev = self.prev_corner(c, corner_faces[c] as usize);
                    [(c as u32, edges[c]), (c as u32, edges[prev])]
                });
                DomainMapping::from_pairs(self.num_corners(), pairs)
            }
            (Face, Corner) => DomainMapping::from_index_map(&corner_faces),
            (Point, Edge) => DomainMapping::from_pairs(
                self.num_edges(),
                self.edges.iter().enumerate().flat_map(|(e, &[a, b])| [(e as u32, a), (e as u32, b)]),
            ),
            (Point, Face) => DomainMapping::from_pairs(
                self.num_faces(),
                self.face_corners().map(|(f, c)| (f, verts[c])),
            ),
            (Edge, Face) => DomainMapping::from_pairs(
                self.num_faces(),
                self.face_corners().map(|(f, c)| (f, edges[c])),
            ),
            (Corner, Face) => DomainMapping::from_pairs(
                self.num_faces(),
                self.face_corners().map(|(f, c)| (f, c as u32)),
            ),
            (Edge, Point) => DomainMapping::from_pairs(
                self.num_vertices(),
                self.edges.iter().enumerate().flat_map(|(e, &[a, b])| [(a, e as u32), (b, e as u32)]),
            ),
            (Face, Point) => DomainMapping::from_pairs(
                self.num_vertices(),
                self.face_corners().map(|(f, c)| (verts[c], f)),
            ),
            (Corner, Point) => DomainMapping::from_pairs(
                self.num_vertices(),
                (0..self.num_corners()).map(|c| (verts[c], c as u32)),
            ),
            (Face, Edge) => DomainMapping::from_pairs(
                self.num_edges(),
                self.face_corners().map(|(f, c)| (edges[c], f)),
            ),
            (Corner, Edge) => {
                let pairs = (0..self.num_corners()).flat_map(|c| {
                    let next = self.next_corner(c, corner_faces[c] as usize);
                    [(edges[c], c as u32), (edges[c], next as u32)]
                });
                DomainMapping::from_pairs(self.num_edges(), pairs)
            }
            _ => return None,
        };
        Some(mapping)
    }
}
