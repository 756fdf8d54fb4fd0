//! What gets loaded and how completions join together.

use std::fmt;

use crate::config::AssetConfig;
use crate::family::{PassFamily, TextureSlot};
use crate::geometry::MeshKind;
use crate::gfx::ShaderStage;

/// Plant billboards always sample this texture.
pub const PLANT_TEXTURE: &str = "grass.dds";

/// A node of the load graph.
///
/// Shader and texture nodes are leaves backed by a file read; mesh nodes and
/// `Ready` are AND-joins over other nodes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum LoadNode {
    Shader(PassFamily, ShaderStage),
    Texture(TextureSlot),
    Mesh(MeshKind),
    Ready,
}

impl fmt::Display for LoadNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadNode::Shader(family, stage) => write!(f, "{family} {stage}"),
            LoadNode::Texture(slot) => write!(f, "{slot} texture"),
            LoadNode::Mesh(kind) => write!(f, "{kind} mesh"),
            LoadNode::Ready => f.write_str("ready gate"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReadTask {
    pub node: LoadNode,
    pub file: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Join {
    pub node: LoadNode,
    pub after: Vec<LoadNode>,
}

/// Reads to issue and the joins that consume them.
#[derive(Debug, Clone, Default)]
pub struct LoadManifest {
    pub reads: Vec<ReadTask>,
    pub joins: Vec<Join>,
}

impl LoadManifest {
    /// The scene's full manifest: every family, every mesh, one ready gate.
    pub fn scene(assets: &AssetConfig) -> Self {
        let mut reads = Vec::new();
        for family in PassFamily::ALL {
            for &stage in family.stages() {
                if let Some(file) = family.shader_file(stage) {
                    reads.push(ReadTask {
                        node: LoadNode::Shader(family, stage),
                        file,
                    });
                }
            }
        }
        for slot in TextureSlot::ALL {
            let file = match slot {
                TextureSlot::PlantBillboard => PLANT_TEXTURE.to_string(),
                TextureSlot::UnderwaterScreen => assets.underwater_texture.clone(),
            };
            reads.push(ReadTask {
                node: LoadNode::Texture(slot),
                file,
            });
        }

        let mut joins: Vec<Join> = MeshKind::ALL
            .into_iter()
            .map(|kind| Join {
                node: LoadNode::Mesh(kind),
                after: family_nodes(kind.families()),
            })
            .collect();
        joins.push(Join {
            node: LoadNode::Ready,
            after: MeshKind::ALL.into_iter().map(LoadNode::Mesh).collect(),
        });

        Self { reads, joins }
    }

    pub fn task_count(&self) -> usize {
        self.reads.len() + self.joins.len()
    }
}

/// Every leaf a family contributes: its shader stages and its textures.
fn family_nodes(families: &[PassFamily]) -> Vec<LoadNode> {
    let mut nodes = Vec::new();
    for &family in families {
        nodes.extend(family.stages().iter().map(|&s| LoadNode::Shader(family, s)));
        nodes.extend(
            TextureSlot::ALL
                .into_iter()
                .filter(|slot| slot.family() == family)
                .map(LoadNode::Texture),
        );
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join<'a>(m: &'a LoadManifest, node: LoadNode) -> &'a Join {
        m.joins.iter().find(|j| j.node == node).unwrap()
    }

    #[test]
    fn scene_manifest_reads_every_stage_and_texture() {
        let m = LoadManifest::scene(&AssetConfig::default());
        // 2 + 2 + 2 + 2 + 4 + 4 + 3 + 2 + 3 + 3 shader stages, 2 textures
        assert_eq!(m.reads.len(), 29);
        assert!(m.reads.iter().any(|r| r.file == "WaterHull.cso"));
        assert!(m.reads.iter().any(|r| r.file == "SampleVertexShader.cso"));
        assert!(m.reads.iter().any(|r| r.file == "SnakeGeometry2.cso"));
        assert!(!m.reads.iter().any(|r| r.file.starts_with("Underwater")));
        assert_eq!(m.joins.len(), MeshKind::ALL.len() + 1);
        assert_eq!(m.task_count(), 35);
    }

    #[test]
    fn cube_waits_on_all_six_cube_families() {
        let m = LoadManifest::scene(&AssetConfig::default());
        let cube = join(&m, LoadNode::Mesh(MeshKind::Cube));
        assert_eq!(cube.after.len(), 16);
        assert!(cube.after.contains(&LoadNode::Shader(PassFamily::Water, ShaderStage::Domain)));
        assert!(cube.after.contains(&LoadNode::Shader(PassFamily::ImplicitShapes, ShaderStage::Vertex)));
        assert!(cube.after.contains(&LoadNode::Shader(PassFamily::Fractals, ShaderStage::Pixel)));
        assert!(!cube.after.iter().any(|n| matches!(n, LoadNode::Texture(_))));
    }

    #[test]
    fn each_snake_strip_waits_on_its_own_program() {
        let m = LoadManifest::scene(&AssetConfig::default());
        let x = join(&m, LoadNode::Mesh(MeshKind::SnakeStripX));
        let z = join(&m, LoadNode::Mesh(MeshKind::SnakeStripZ));
        assert!(x.after.iter().all(|n| matches!(n, LoadNode::Shader(PassFamily::Snakes, _))));
        assert!(z.after.iter().all(|n| matches!(n, LoadNode::Shader(PassFamily::Snakes2, _))));
        assert_eq!(z.after.len(), 3);
    }

    #[test]
    fn plant_grid_waits_on_its_texture() {
        let m = LoadManifest::scene(&AssetConfig::default());
        let plants = join(&m, LoadNode::Mesh(MeshKind::PlantGrid));
        assert!(plants.after.contains(&LoadNode::Texture(TextureSlot::PlantBillboard)));
        assert_eq!(plants.after.len(), 4);
    }

    #[test]
    fn underwater_texture_name_comes_from_config() {
        let assets = AssetConfig {
            underwater_texture: "caustics.dds".to_string(),
            ..AssetConfig::default()
        };
        let m = LoadManifest::scene(&assets);
        let read = m
            .reads
            .iter()
            .find(|r| r.node == LoadNode::Texture(TextureSlot::UnderwaterScreen))
            .unwrap();
        assert_eq!(read.file, "caustics.dds");
    }

    #[test]
    fn ready_waits_on_every_mesh() {
        let m = LoadManifest::scene(&AssetConfig::default());
        assert_eq!(join(&m, LoadNode::Ready).after.len(), 5);
    }
}
