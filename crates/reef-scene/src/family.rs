//! Pass families: the shader stages and textures that together render one effect.

use std::fmt;

use crate::gfx::ShaderStage;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PassFamily {
    Spheres,
    ImplicitShapes,
    ImplicitPrimitives,
    Fractals,
    Terrain,
    Water,
    Plants,
    Underwater,
    Snakes,
    Snakes2,
}

const VS_PS: &[ShaderStage] = &[ShaderStage::Vertex, ShaderStage::Pixel];
const VS_PS_GS: &[ShaderStage] = &[ShaderStage::Vertex, ShaderStage::Pixel, ShaderStage::Geometry];
const TESSELLATED: &[ShaderStage] = &[
    ShaderStage::Vertex,
    ShaderStage::Pixel,
    ShaderStage::Hull,
    ShaderStage::Domain,
];

impl PassFamily {
    pub const ALL: [PassFamily; 10] = [
        PassFamily::Spheres,
        PassFamily::ImplicitShapes,
        PassFamily::ImplicitPrimitives,
        PassFamily::Fractals,
        PassFamily::Terrain,
        PassFamily::Water,
        PassFamily::Plants,
        PassFamily::Underwater,
        PassFamily::Snakes,
        PassFamily::Snakes2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PassFamily::Spheres => "spheres",
            PassFamily::ImplicitShapes => "implicit-shapes",
            PassFamily::ImplicitPrimitives => "implicit-primitives",
            PassFamily::Fractals => "fractals",
            PassFamily::Terrain => "terrain",
            PassFamily::Water => "water",
            PassFamily::Plants => "plants",
            PassFamily::Underwater => "underwater",
            PassFamily::Snakes => "snakes",
            PassFamily::Snakes2 => "snakes-2",
        }
    }

    /// Shader stages the family's program is built from.
    pub fn stages(self) -> &'static [ShaderStage] {
        match self {
            PassFamily::Spheres
            | PassFamily::ImplicitShapes
            | PassFamily::ImplicitPrimitives
            | PassFamily::Fractals
            | PassFamily::Underwater => VS_PS,
            PassFamily::Terrain | PassFamily::Water => TESSELLATED,
            PassFamily::Plants | PassFamily::Snakes | PassFamily::Snakes2 => VS_PS_GS,
        }
    }

    pub fn uses_stage(self, stage: ShaderStage) -> bool {
        self.stages().contains(&stage)
    }

    fn file_prefix(self) -> &'static str {
        match self {
            PassFamily::Spheres => "ShinySphereRayTracer",
            PassFamily::ImplicitShapes => "ImplicitShapes",
            PassFamily::ImplicitPrimitives => "ImplicitPrimitives",
            PassFamily::Fractals => "Fractals",
            PassFamily::Terrain => "Terrain",
            PassFamily::Water => "Water",
            PassFamily::Plants => "Plant",
            PassFamily::Underwater => "Sample",
            PassFamily::Snakes | PassFamily::Snakes2 => "Snake",
        }
    }

    /// Text between the stage name and the extension.
    fn file_suffix(self) -> &'static str {
        match self {
            PassFamily::Underwater => "Shader",
            PassFamily::Snakes2 => "2",
            _ => "",
        }
    }

    /// Compiled bytecode file for `stage`, or `None` when the family has no such stage.
    pub fn shader_file(self, stage: ShaderStage) -> Option<String> {
        if !self.uses_stage(stage) {
            return None;
        }
        let stage_name = match stage {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Hull => "Hull",
            ShaderStage::Domain => "Domain",
            ShaderStage::Geometry => "Geometry",
            ShaderStage::Pixel => "Pixel",
        };
        Some(format!(
            "{}{stage_name}{}.cso",
            self.file_prefix(),
            self.file_suffix()
        ))
    }

    /// The vertex stage of this family also yields the primary input layout.
    pub fn derives_input_layout(self) -> bool {
        self == PassFamily::ImplicitShapes
    }
}

impl fmt::Display for PassFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Textures the scene samples, each owned by one family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum TextureSlot {
    PlantBillboard,
    UnderwaterScreen,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 2] = [TextureSlot::PlantBillboard, TextureSlot::UnderwaterScreen];

    pub fn family(self) -> PassFamily {
        match self {
            TextureSlot::PlantBillboard => PassFamily::Plants,
            TextureSlot::UnderwaterScreen => PassFamily::Underwater,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureSlot::PlantBillboard => "plant-billboard",
            TextureSlot::UnderwaterScreen => "underwater-screen",
        }
    }
}

impl fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terrain_files_cover_all_four_stages() {
        let files: Vec<String> = PassFamily::Terrain
            .stages()
            .iter()
            .filter_map(|s| PassFamily::Terrain.shader_file(*s))
            .collect();
        assert_eq!(
            files,
            ["TerrainVertex.cso", "TerrainPixel.cso", "TerrainHull.cso", "TerrainDomain.cso"]
        );
    }

    #[test]
    fn families_without_a_stage_have_no_file_for_it() {
        assert_eq!(PassFamily::Spheres.shader_file(ShaderStage::Geometry), None);
        assert_eq!(
            PassFamily::Spheres.shader_file(ShaderStage::Vertex).as_deref(),
            Some("ShinySphereRayTracerVertex.cso")
        );
        assert_eq!(
            PassFamily::Plants.shader_file(ShaderStage::Geometry).as_deref(),
            Some("PlantGeometry.cso")
        );
    }

    #[test]
    fn only_implicit_shapes_derive_the_input_layout() {
        let derived: Vec<_> = PassFamily::ALL
            .into_iter()
            .filter(|f| f.derives_input_layout())
            .collect();
        assert_eq!(derived, vec![PassFamily::ImplicitShapes]);
    }

    #[test]
    fn underwater_uses_the_sample_shader_pair() {
        let files: Vec<String> = PassFamily::Underwater
            .stages()
            .iter()
            .filter_map(|s| PassFamily::Underwater.shader_file(*s))
            .collect();
        assert_eq!(files, ["SampleVertexShader.cso", "SamplePixelShader.cso"]);
    }

    #[test]
    fn second_snake_program_has_its_own_files() {
        let files: Vec<String> = PassFamily::Snakes2
            .stages()
            .iter()
            .filter_map(|s| PassFamily::Snakes2.shader_file(*s))
            .collect();
        assert_eq!(files, ["SnakeVertex2.cso", "SnakePixel2.cso", "SnakeGeometry2.cso"]);
        assert_eq!(
            PassFamily::Snakes.shader_file(ShaderStage::Geometry).as_deref(),
            Some("SnakeGeometry.cso")
        );
    }

    #[test]
    fn cube_only_families_load_vertex_and_pixel_files() {
        assert_eq!(
            PassFamily::ImplicitShapes.shader_file(ShaderStage::Vertex).as_deref(),
            Some("ImplicitShapesVertex.cso")
        );
        assert_eq!(
            PassFamily::Fractals.shader_file(ShaderStage::Pixel).as_deref(),
            Some("FractalsPixel.cso")
        );
        assert_eq!(PassFamily::Fractals.shader_file(ShaderStage::Hull), None);
    }
}
