// Procedural meshes for the scene renderer's shape variants.
//
// Two-layer pipeline:
//   builder → PolyMesh → triangulate_smooth() → RenderMesh → MeshAtlas → GPU
//
// Polyhedra are built with one vertex per face corner so the smooth-normal
// pass yields flat facets. Sphere, capsule and torus share vertices and come
// out smooth.

use std::f32::consts::{PI, TAU};
use std::ops::Range;

use glam::Vec3;

use super::config::ShapeVariant;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// One mesh vertex as `particles.wgsl` reads it: position at location 0,
/// normal at location 1, both in model space.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh. Faces are CCW when viewed from outside.
#[derive(Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Flip every face whose normal points toward the origin.
    /// Only meaningful for convex shapes that contain the origin.
    fn orient_outward(&mut self) {
        for face in &mut self.faces {
            let a = self.positions[face[0]];
            let b = self.positions[face[1]];
            let c = self.positions[face[2]];
            let centroid = face.iter().map(|&i| self.positions[i]).sum::<Vec3>() / face.len() as f32;
            if (b - a).cross(c - a).dot(centroid) < 0.0 {
                face.reverse();
            }
        }
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// Triangle list with per-vertex normals, ready for the atlas.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
}

impl RenderMesh {
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Fan-triangulate every face and give each vertex the sum of the normals of
/// the triangles touching it. The unnormalized cross product weights each
/// triangle by its area. Unshared corners therefore keep their face normal.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let triangles: Vec<[usize; 3]> = poly
        .faces
        .iter()
        .flat_map(|face| face.windows(2).skip(1).map(move |w| [face[0], w[0], w[1]]))
        .collect();

    let mut normals = vec![Vec3::ZERO; poly.vertex_count()];
    for &[a, b, c] in &triangles {
        let (pa, pb, pc) = (poly.positions[a], poly.positions[b], poly.positions[c]);
        let area_normal = (pb - pa).cross(pc - pa);
        for corner in [a, b, c] {
            normals[corner] += area_normal;
        }
    }

    RenderMesh {
        vertices: poly
            .positions
            .iter()
            .zip(&normals)
            .map(|(p, n)| GpuVertex { position: p.to_array(), normal: n.normalize_or_zero().to_array() })
            .collect(),
        indices: triangles.iter().flatten().map(|&i| i as u32).collect(),
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Unshared-vertex mesh from a corner list and face index lists.
fn faceted(corners: &[Vec3], faces: &[&[usize]]) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    for face in faces {
        let indices = face.iter().map(|&i| mesh.add_vertex(corners[i])).collect();
        mesh.add_face(indices);
    }
    mesh.orient_outward();
    mesh
}

pub fn cube(size: f32) -> PolyMesh {
    let h = size * 0.5;
    let corners: Vec<Vec3> = (0..8)
        .map(|i| Vec3::new(
            if i & 1 == 0 { -h } else { h },
            if i & 2 == 0 { -h } else { h },
            if i & 4 == 0 { -h } else { h },
        ))
        .collect();
    faceted(&corners, &[
        &[0, 2, 3, 1], &[4, 5, 7, 6],  // -Z, +Z
        &[0, 1, 5, 4], &[2, 6, 7, 3],  // -Y, +Y
        &[0, 4, 6, 2], &[1, 3, 7, 5],  // -X, +X
    ])
}

pub fn tetrahedron(radius: f32) -> PolyMesh {
    let s = radius / 3.0_f32.sqrt();
    let corners = [
        Vec3::new( s,  s,  s),
        Vec3::new(-s, -s,  s),
        Vec3::new(-s,  s, -s),
        Vec3::new( s, -s, -s),
    ];
    faceted(&corners, &[&[0, 1, 2], &[0, 3, 1], &[0, 2, 3], &[1, 3, 2]])
}

pub fn octahedron(radius: f32) -> PolyMesh {
    let corners = [
        Vec3::X * radius, Vec3::NEG_X * radius,
        Vec3::Y * radius, Vec3::NEG_Y * radius,
        Vec3::Z * radius, Vec3::NEG_Z * radius,
    ];
    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(8);
    for x in [0, 1] {
        for y in [2, 3] {
            for z in [4, 5] {
                faces.push([x, y, z]);
            }
        }
    }
    let refs: Vec<&[usize]> = faces.iter().map(|f| f.as_slice()).collect();
    faceted(&corners, &refs)
}

/// Unit-radius icosahedron corners and its twenty triangles.
fn icosahedron_parts() -> ([Vec3; 12], [[usize; 3]; 20]) {
    let phi = (1.0 + 5.0_f32.sqrt()) * 0.5;
    let corners = [
        (-1.0, phi, 0.0), (1.0, phi, 0.0), (-1.0, -phi, 0.0), (1.0, -phi, 0.0),
        (0.0, -1.0, phi), (0.0, 1.0, phi), (0.0, -1.0, -phi), (0.0, 1.0, -phi),
        (phi, 0.0, -1.0), (phi, 0.0, 1.0), (-phi, 0.0, -1.0), (-phi, 0.0, 1.0),
    ]
    .map(|(x, y, z)| Vec3::new(x, y, z).normalize());
    let faces = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];
    (corners, faces)
}

pub fn icosahedron(radius: f32) -> PolyMesh {
    let (corners, faces) = icosahedron_parts();
    let corners = corners.map(|c| c * radius);
    let refs: Vec<&[usize]> = faces.iter().map(|f| f.as_slice()).collect();
    faceted(&corners, &refs)
}

/// Dual of the icosahedron: one corner per icosahedron face, one pentagon
/// per icosahedron vertex.
pub fn dodecahedron(radius: f32) -> PolyMesh {
    let (ico_corners, ico_faces) = icosahedron_parts();
    let corners: Vec<Vec3> = ico_faces
        .iter()
        .map(|f| f.iter().map(|&i| ico_corners[i]).sum::<Vec3>().normalize() * radius)
        .collect();

    let pentagons: Vec<Vec<usize>> = ico_corners
        .iter()
        .enumerate()
        .map(|(v, axis)| {
            let u = axis.any_orthonormal_vector();
            let w = axis.cross(u);
            let mut ring: Vec<usize> = (0..ico_faces.len()).filter(|&f| ico_faces[f].contains(&v)).collect();
            ring.sort_by(|&a, &b| {
                let angle = |f: usize| corners[f].dot(w).atan2(corners[f].dot(u));
                angle(a).total_cmp(&angle(b))
            });
            ring
        })
        .collect();

    let refs: Vec<&[usize]> = pentagons.iter().map(|f| f.as_slice()).collect();
    faceted(&corners, &refs)
}

/// Ring torus around the Z axis with shared vertices, so it shades smooth.
pub fn torus(major: f32, minor: f32, major_segments: usize, minor_segments: usize) -> PolyMesh {
    let (around, across) = (major_segments.max(3), minor_segments.max(3));
    let mut mesh = PolyMesh::new();
    for i in 0..around {
        let u = TAU * i as f32 / around as f32;
        for j in 0..across {
            let v = TAU * j as f32 / across as f32;
            let reach = major + minor * v.cos();
            mesh.add_vertex(Vec3::new(reach * u.cos(), reach * u.sin(), minor * v.sin()));
        }
    }
    let at = |i: usize, j: usize| (i % around) * across + j % across;
    // Increasing u then v winds counter-clockwise seen from outside the tube.
    for i in 0..around {
        for j in 0..across {
            mesh.add_face(vec![at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)]);
        }
    }
    mesh
}

/// Y-aligned capsule: a UV sphere split at the equator and pulled apart by
/// `length`. With `length == 0` this is a plain sphere.
pub fn capsule(radius: f32, length: f32, slices: usize, stacks: usize) -> PolyMesh {
    let slices = slices.max(3);
    let stacks = (stacks.max(2) / 2) * 2;  // even, so the equator is a ring
    let mut mesh = PolyMesh::new();

    let top = mesh.add_vertex(Vec3::new(0.0, radius + length * 0.5, 0.0));
    let mut rings: Vec<Vec<usize>> = Vec::new();
    for stack in 1..stacks {
        let polar = PI * stack as f32 / stacks as f32;
        let lift = if stack * 2 <= stacks { length * 0.5 } else { -length * 0.5 };
        let mut ring = Vec::with_capacity(slices);
        for slice in 0..slices {
            let azimuth = TAU * slice as f32 / slices as f32;
            ring.push(mesh.add_vertex(Vec3::new(
                radius * polar.sin() * azimuth.cos(),
                radius * polar.cos() + lift,
                radius * polar.sin() * azimuth.sin(),
            )));
        }
        rings.push(ring);
        // The equator ring is duplicated so the cylinder wall joins both caps.
        if stack * 2 == stacks && length > 0.0 {
            let upper = rings[rings.len() - 1].clone();
            let lower = upper.iter().map(|&i| {
                let p = mesh.positions[i];
                mesh.add_vertex(Vec3::new(p.x, p.y - length, p.z))
            }).collect();
            rings.push(lower);
        }
    }
    let bottom = mesh.add_vertex(Vec3::new(0.0, -radius - length * 0.5, 0.0));

    for slice in 0..slices {
        let next = (slice + 1) % slices;
        mesh.add_face(vec![top, rings[0][next], rings[0][slice]]);
        for pair in rings.windows(2) {
            mesh.add_face(vec![pair[0][slice], pair[0][next], pair[1][next], pair[1][slice]]);
        }
        let last = &rings[rings.len() - 1];
        mesh.add_face(vec![bottom, last[slice], last[next]]);
    }
    mesh.orient_outward();
    mesh
}

/// Mesh for one concrete shape, roughly unit sized.
pub fn shape_mesh(shape: ShapeVariant) -> PolyMesh {
    match shape {
        ShapeVariant::Capsule => capsule(0.08, 0.32, 8, 8),
        ShapeVariant::Sphere | ShapeVariant::Mixed => capsule(0.15, 0.0, 16, 12),
        ShapeVariant::Box => cube(0.22),
        ShapeVariant::Tetrahedron => tetrahedron(0.22),
        ShapeVariant::Octahedron => octahedron(0.12),
        ShapeVariant::Icosahedron => icosahedron(0.15),
        ShapeVariant::Dodecahedron => dodecahedron(0.1),
        ShapeVariant::Torus => torus(0.08, 0.03, 16, 8),
    }
}

// ============================================================================
// MESH ATLAS
// ============================================================================

/// Where one shape lives inside the shared vertex/index buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasEntry {
    pub base_vertex: i32,
    pub indices: Range<u32>,
}

/// Every concrete shape packed into one vertex buffer and one index buffer.
pub struct MeshAtlas {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
    entries: Vec<AtlasEntry>,
}

impl MeshAtlas {
    pub fn build() -> Self {
        let mut atlas = Self { vertices: Vec::new(), indices: Vec::new(), entries: Vec::new() };
        for shape in ShapeVariant::CONCRETE {
            let mesh = triangulate_smooth(&shape_mesh(shape));
            let base_vertex = atlas.vertices.len() as i32;
            let start = atlas.indices.len() as u32;
            atlas.vertices.extend_from_slice(&mesh.vertices);
            atlas.indices.extend_from_slice(&mesh.indices);
            atlas.entries.push(AtlasEntry {
                base_vertex,
                indices: start..start + mesh.index_count() as u32,
            });
        }
        atlas
    }

    pub fn entry(&self, shape: ShapeVariant) -> Option<&AtlasEntry> {
        shape.mesh_index().and_then(|i| self.entries.get(i))
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
