//! Vertex/index data for every drawable object class.

use std::collections::BTreeMap;
use std::fmt;

use bytemuck::{Pod, Zeroable};

use crate::family::PassFamily;
use crate::gfx::{
    BufferDesc, BufferHandle, DeviceContext, DeviceError, DeviceResult, GraphicsDevice, IndexFormat,
    InputElement, Topology, VertexFormat,
};

// ── vertex ────────────────────────────────────────────────────────────────

/// Position-only vertex shared by every pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }

    /// The primary input layout: a single `POSITION` float3.
    pub fn layout() -> [InputElement; 1] {
        [InputElement {
            semantic: "POSITION",
            semantic_index: 0,
            format: VertexFormat::Float32x3,
            input_slot: 0,
            byte_offset: 0,
        }]
    }
}

// ── mesh kinds ────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MeshKind {
    Cube,
    FullScreenQuad,
    PlantGrid,
    SnakeStripX,
    SnakeStripZ,
}

impl MeshKind {
    pub const ALL: [MeshKind; 5] = [
        MeshKind::Cube,
        MeshKind::FullScreenQuad,
        MeshKind::PlantGrid,
        MeshKind::SnakeStripX,
        MeshKind::SnakeStripZ,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MeshKind::Cube => "cube",
            MeshKind::FullScreenQuad => "full-screen quad",
            MeshKind::PlantGrid => "plant grid",
            MeshKind::SnakeStripX => "snake strip x",
            MeshKind::SnakeStripZ => "snake strip z",
        }
    }

    /// Families whose shaders must all be loaded before this mesh is created.
    pub fn families(self) -> &'static [PassFamily] {
        match self {
            MeshKind::Cube => &[
                PassFamily::ImplicitShapes,
                PassFamily::ImplicitPrimitives,
                PassFamily::Terrain,
                PassFamily::Water,
                PassFamily::Spheres,
                PassFamily::Fractals,
            ],
            MeshKind::FullScreenQuad => &[PassFamily::Underwater],
            MeshKind::PlantGrid => &[PassFamily::Plants],
            MeshKind::SnakeStripX => &[PassFamily::Snakes],
            MeshKind::SnakeStripZ => &[PassFamily::Snakes2],
        }
    }

    /// Topology the mesh is authored for. The cube is also drawn as quad patches.
    pub fn topology(self) -> Topology {
        match self {
            MeshKind::Cube | MeshKind::FullScreenQuad => Topology::TriangleList,
            MeshKind::PlantGrid => Topology::PointList,
            MeshKind::SnakeStripX | MeshKind::SnakeStripZ => Topology::LineStrip,
        }
    }

    pub fn build(self) -> MeshData {
        match self {
            MeshKind::Cube => MeshData::cube(),
            MeshKind::FullScreenQuad => MeshData::full_screen_quad(),
            MeshKind::PlantGrid => MeshData::plant_grid(),
            MeshKind::SnakeStripX => MeshData::snake_strip([1.0, 0.0, 0.0]),
            MeshKind::SnakeStripZ => MeshData::snake_strip([0.0, 0.0, 1.0]),
        }
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── CPU-side mesh data ────────────────────────────────────────────────────

const CUBE_VERTICES: [Vertex; 8] = [
    Vertex::new(-0.5, -0.5, -0.5),
    Vertex::new(-0.5, -0.5, 0.5),
    Vertex::new(-0.5, 0.5, -0.5),
    Vertex::new(-0.5, 0.5, 0.5),
    Vertex::new(0.5, -0.5, -0.5),
    Vertex::new(0.5, -0.5, 0.5),
    Vertex::new(0.5, 0.5, -0.5),
    Vertex::new(0.5, 0.5, 0.5),
];

#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    0, 2, 1,  1, 2, 3,
    4, 5, 6,  5, 7, 6,
    0, 1, 5,  0, 5, 4,
    2, 6, 7,  2, 7, 3,
    0, 4, 6,  0, 6, 2,
    1, 3, 7,  1, 7, 5,
];

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new(-1.0, -1.0, 0.0),
    Vertex::new(-1.0, 1.0, 0.0),
    Vertex::new(1.0, -1.0, 0.0),
    Vertex::new(1.0, 1.0, 0.0),
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Plant grid spans -PLANT_EXTENT..=PLANT_EXTENT on x and z.
const PLANT_EXTENT: i32 = 20;
const SNAKE_SEGMENTS: u16 = 9;

/// Vertices and 16-bit indices built on the CPU, consumed by [`MeshData::upload`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub topology: Topology,
}

impl MeshData {
    pub fn cube() -> Self {
        Self {
            vertices: CUBE_VERTICES.to_vec(),
            indices: CUBE_INDICES.to_vec(),
            topology: Topology::TriangleList,
        }
    }

    pub fn full_screen_quad() -> Self {
        Self {
            vertices: QUAD_VERTICES.to_vec(),
            indices: QUAD_INDICES.to_vec(),
            topology: Topology::TriangleList,
        }
    }

    /// One point per integer grid cell; the geometry shader expands each into a billboard.
    pub fn plant_grid() -> Self {
        let vertices: Vec<Vertex> = (-PLANT_EXTENT..=PLANT_EXTENT)
            .flat_map(|i| {
                (-PLANT_EXTENT..=PLANT_EXTENT).map(move |j| Vertex::new(i as f32, 0.0, j as f32))
            })
            .collect();
        let indices = sequential_indices(vertices.len());
        Self {
            vertices,
            indices,
            topology: Topology::PointList,
        }
    }

    /// Line strip of unit segments along `axis`, starting half a unit from the origin.
    pub fn snake_strip(axis: [f32; 3]) -> Self {
        let vertices: Vec<Vertex> = (1..=SNAKE_SEGMENTS)
            .map(|i| {
                let t = f32::from(i) - 0.5;
                Vertex::new(axis[0] * t, axis[1] * t, axis[2] * t)
            })
            .collect();
        let indices = sequential_indices(vertices.len());
        Self {
            vertices,
            indices,
            topology: Topology::LineStrip,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Creates the vertex and index buffers, consuming the CPU copy.
    pub fn upload(self, device: &dyn GraphicsDevice) -> DeviceResult<Mesh> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&self.indices);

        let vertex_desc = BufferDesc::vertex(byte_len(vertex_bytes)?);
        let index_desc = BufferDesc::index(byte_len(index_bytes)?);

        let vertex_buffer = device.create_buffer(&vertex_desc, Some(vertex_bytes))?;
        let index_buffer = match device.create_buffer(&index_desc, Some(index_bytes)) {
            Ok(b) => b,
            Err(e) => {
                device.release(vertex_buffer.into());
                return Err(e);
            }
        };

        Ok(Mesh {
            vertex_buffer,
            index_buffer,
            index_count: self.index_count(),
            topology: self.topology,
        })
    }
}

fn sequential_indices(count: usize) -> Vec<u16> {
    (0..count).map(|i| i as u16).collect()
}

fn byte_len(bytes: &[u8]) -> DeviceResult<u32> {
    u32::try_from(bytes.len())
        .map_err(|_| DeviceError::InvalidDescriptor(format!("{} bytes exceeds buffer limit", bytes.len())))
}

// ── GPU-side mesh ─────────────────────────────────────────────────────────

/// Vertex and index buffers of one uploaded mesh. Immutable once created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Mesh {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub topology: Topology,
}

impl Mesh {
    /// Binds the vertex buffer to slot 0 and the 16-bit index buffer.
    ///
    /// Topology is left alone; each pass sets it explicitly.
    pub fn bind(&self, ctx: &mut dyn DeviceContext) -> DeviceResult<()> {
        ctx.set_vertex_buffer(0, Some(self.vertex_buffer), Vertex::STRIDE, 0)?;
        ctx.set_index_buffer(Some(self.index_buffer), IndexFormat::U16, 0)
    }

    pub fn draw(&self, ctx: &mut dyn DeviceContext) -> DeviceResult<()> {
        ctx.draw_indexed(self.index_count, 0, 0)
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        device.release(self.vertex_buffer.into());
        device.release(self.index_buffer.into());
    }
}

/// Uploaded meshes, keyed by kind.
#[derive(Debug, Default)]
pub struct GeometryStore {
    meshes: BTreeMap<MeshKind, Mesh>,
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly uploaded mesh. A mesh kind is only ever created once per load.
    pub fn insert(&mut self, kind: MeshKind, mesh: Mesh) -> DeviceResult<()> {
        if self.meshes.contains_key(&kind) {
            return Err(DeviceError::Rejected(format!("{kind} mesh created twice")));
        }
        self.meshes.insert(kind, mesh);
        Ok(())
    }

    pub fn get(&self, kind: MeshKind) -> Option<&Mesh> {
        self.meshes.get(&kind)
    }

    pub fn require(&self, kind: MeshKind) -> DeviceResult<&Mesh> {
        self.get(kind)
            .ok_or(DeviceError::MissingResource(kind.name()))
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn release_all(&mut self, device: &dyn GraphicsDevice) {
        for (_, mesh) in std::mem::take(&mut self.meshes) {
            mesh.release(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::RecordingDevice;

    #[test]
    fn plant_grid_is_41_by_41_points() {
        let grid = MeshData::plant_grid();
        assert_eq!(grid.vertices.len(), 41 * 41);
        assert_eq!(grid.indices.len(), grid.vertices.len());
        assert_eq!(grid.vertices[0].position, [-20.0, 0.0, -20.0]);
        assert_eq!(grid.vertices[1].position, [-20.0, 0.0, -19.0]);
        assert_eq!(grid.indices.last(), Some(&1680));
    }

    #[test]
    fn snake_strips_run_along_their_axis() {
        let x = MeshKind::SnakeStripX.build();
        let z = MeshKind::SnakeStripZ.build();
        assert_eq!(x.vertices.len(), 9);
        assert_eq!(x.vertices[0].position, [0.5, 0.0, 0.0]);
        assert_eq!(x.vertices[8].position, [8.5, 0.0, 0.0]);
        assert_eq!(z.vertices[3].position, [0.0, 0.0, 3.5]);
        assert_eq!(z.indices, (0..9).collect::<Vec<u16>>());
    }

    #[test]
    fn cube_indices_stay_in_range() {
        let cube = MeshData::cube();
        assert_eq!(cube.topology, MeshKind::Cube.topology());
        assert_eq!(cube.index_count(), 36);
        assert!(cube.indices.iter().all(|&i| usize::from(i) < cube.vertices.len()));
    }

    #[test]
    fn upload_creates_sized_buffers() {
        let device = RecordingDevice::new();
        let mesh = MeshData::full_screen_quad().upload(&device).unwrap();

        assert_eq!(mesh.index_count, 6);
        let vb = device.buffer_contents(mesh.vertex_buffer).unwrap();
        assert_eq!(vb.len(), 4 * Vertex::STRIDE as usize);
        let ib = device.buffer_contents(mesh.index_buffer).unwrap();
        assert_eq!(ib, bytemuck::cast_slice::<u16, u8>(&QUAD_INDICES).to_vec());
    }

    #[test]
    fn store_rejects_duplicate_kind_and_releases_everything() {
        let device = RecordingDevice::new();
        let mut store = GeometryStore::new();
        let cube = MeshData::cube().upload(&device).unwrap();
        store.insert(MeshKind::Cube, cube).unwrap();

        assert!(store.insert(MeshKind::Cube, cube).is_err());
        assert!(store.require(MeshKind::PlantGrid).is_err());

        store.release_all(&device);
        assert!(store.is_empty());
        assert_eq!(device.live_objects(), 0);
    }
}
