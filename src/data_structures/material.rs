//! Surface descriptions attached to mesh nodes.

/// Linear RGB colour with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Colour {
    pub const WHITE: Colour = Colour::rgb8(255, 255, 255);
    pub const BLACK: Colour = Colour::rgb8(0, 0, 0);
    pub const HOTPINK: Colour = Colour::rgb8(255, 105, 180);
    pub const ORANGE: Colour = Colour::rgb8(255, 165, 0);
    pub const SLATE_GREY: Colour = Colour::rgb8(112, 128, 144);

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

/// Which faces of a mesh are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    /// Only the inside faces, e.g. for a dome surrounding the camera.
    Back,
    Double,
}

/// A handle to a decoded texture. The pixel data itself stays with its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    /// Lit material.
    Standard { colour: Colour },
    /// Unlit material, optionally mapped with a texture.
    Basic {
        colour: Colour,
        map: Option<TextureRef>,
        side: Side,
    },
}

impl Material {
    pub fn colour(&self) -> Colour {
        match self {
            Material::Standard { colour } | Material::Basic { colour, .. } => *colour,
        }
    }
}
