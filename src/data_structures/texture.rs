//! Decoded textures and their load state.
//!
//! This module provides [`Texture`], decoded RGBA pixel data shared behind an
//! `Arc`, and [`TextureResource`], which tracks a texture from the moment its
//! fetch starts until it is either loaded or has failed.

use std::{fmt::Debug, sync::Arc};

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

use crate::data_structures::material::TextureRef;

/// Decoded RGBA8 image data.
///
/// Cloning is cheap; the pixels are shared.
#[derive(Clone)]
pub struct Texture {
    pub label: String,
    pub dimensions: (u32, u32),
    pub rgba: Arc<image::RgbaImage>,
}

impl Texture {
    /// Decode a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name, usually the source URL
    /// * `format` is an optional file format hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(bytes: &[u8], label: &str, format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(Self::from_image(&img, label))
    }

    pub fn from_image(img: &image::DynamicImage, label: &str) -> Self {
        Self {
            label: label.to_string(),
            dimensions: img.dimensions(),
            rgba: Arc::new(img.to_rgba8()),
        }
    }

    pub fn to_ref(&self) -> TextureRef {
        TextureRef {
            url: self.label.clone(),
            width: self.dimensions.0,
            height: self.dimensions.1,
        }
    }
}

impl Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("label", &self.label)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub enum LoadState {
    Pending,
    Loaded(Texture),
    Failed(String),
}

/// A texture identified by its source URL together with its load state.
#[derive(Clone, Debug)]
pub struct TextureResource {
    url: String,
    state: LoadState,
}

impl TextureResource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: LoadState::Pending,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LoadState::Pending)
    }

    pub fn texture(&self) -> Option<&Texture> {
        match &self.state {
            LoadState::Loaded(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn set_loaded(&mut self, texture: Texture) {
        self.state = LoadState::Loaded(texture);
    }

    pub fn set_failed(&mut self, reason: impl Into<String>) {
        self.state = LoadState::Failed(reason.into());
    }
}
