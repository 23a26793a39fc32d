//! Skin engine: turns an annotated skin file into live composited frames
//!
//! ## Pipeline
//!
//! ```text
//! skin file ──► SkinDocument ──► TextureCache ──► composite ──► Surface
//!               (load once)      (per viewport)   (per frame)
//!                                      │
//!                                      └──► elements_at (authoring hit tests)
//! ```
//!
//! ## Key Abstractions
//!
//! - [`Skin`]: what the application can do with any loaded skin.
//! - [`SkinKind`]: the closed set of skin formats, vector (`.svg`) and image
//!   grid (`.xml`).
//! - [`Surface`]: where textures live and frames are drawn; the engine holds
//!   only [`TextureId`](surface::TextureId)s.
//! - [`CoordinateMapper`]: the letterboxed mapping between skin units and
//!   viewport pixels that every stage shares.
//!
//! Loading is transactional: a failed load leaves the previous document and
//! textures in place. A failed rasterization skips the affected element.

pub mod compositor;
pub mod coords;
pub mod document;
pub mod elements;
pub mod error;
pub mod hit_test;
pub mod image_grid;
pub mod raster;
pub mod remap;
pub mod source;
pub mod surface;
pub mod vector;

#[cfg(test)]
pub(crate) mod fixtures;

pub use coords::CoordinateMapper;
pub use error::SkinError;
pub use hit_test::HitTestResult;
pub use image_grid::ImageGridSkin;
pub use remap::ColorRemap;
pub use surface::{PixmapSurface, Surface, TextureId};
pub use vector::VectorSkin;

use crate::controller::ControllerState;
use kurbo::{Point, Size};
use std::path::Path;

pub trait Skin {
    /// File the skin was loaded from
    fn path(&self) -> &Path;

    /// Replaces this skin with the one at `path`. On error nothing changes.
    fn load(&mut self, path: &Path, surface: &mut dyn Surface) -> Result<(), SkinError>;

    /// Stores the snapshot to draw next; returns whether it differs from the last one
    fn update_state(&mut self, state: Option<ControllerState>) -> bool;

    /// Rebuilds textures if the viewport changed, something invalidated them,
    /// or `force` is set. Zero-sized viewports are ignored.
    fn rasterize(
        &mut self,
        surface: &mut dyn Surface,
        width: u32,
        height: u32,
        force: bool,
    ) -> Result<(), SkinError>;

    /// Draws the current state, rasterizing first when needed
    fn render(&mut self, surface: &mut dyn Surface, width: u32, height: u32);

    fn render_state(
        &mut self,
        surface: &mut dyn Surface,
        state: Option<ControllerState>,
        width: u32,
        height: u32,
    ) -> bool {
        let changed = self.update_state(state);
        self.render(surface, width, height);
        changed
    }

    fn activate(&mut self);

    fn is_active(&self) -> bool;

    /// Releases every texture; the skin draws nothing until activated again
    fn deactivate(&mut self, surface: &mut dyn Surface);

    /// A fresh instance loaded again from [`path`](Self::path)
    fn try_clone(&self) -> Result<Self, SkinError>
    where
        Self: Sized;

    /// Declared artwork size, the natural window size for the skin
    fn default_size(&self) -> (u32, u32);

    fn device_name(&self) -> Option<&str>;

    /// Button slots and axes the skin reads
    fn element_counts(&self) -> (usize, usize);

    fn elements_at(&self, point: Point, viewport: Size) -> HitTestResult;
}

#[derive(Debug)]
pub enum SkinKind {
    Vector(VectorSkin),
    ImageGrid(ImageGridSkin),
}

impl SkinKind {
    /// Opens a skin, picking the format from the file extension
    pub fn open(path: &Path) -> Result<Self, SkinError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("svg") => Ok(Self::Vector(VectorSkin::open(path)?)),
            Some("xml") => Ok(Self::ImageGrid(ImageGridSkin::open(path)?)),
            _ => Err(SkinError::UnsupportedLayout(format!(
                "unknown skin format: {}",
                path.display()
            ))),
        }
    }

    fn inner(&self) -> &dyn Skin {
        match self {
            Self::Vector(skin) => skin,
            Self::ImageGrid(skin) => skin,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Skin {
        match self {
            Self::Vector(skin) => skin,
            Self::ImageGrid(skin) => skin,
        }
    }

    /// Remaps only apply to vector skins; returns whether it was applied
    pub fn apply_remap(&mut self, remap: ColorRemap) -> bool {
        match self {
            Self::Vector(skin) => {
                skin.apply_remap(remap);
                true
            }
            Self::ImageGrid(_) => false,
        }
    }

    pub fn clear_remap(&mut self) {
        if let Self::Vector(skin) = self {
            skin.clear_remap();
        }
    }
}

impl Skin for SkinKind {
    fn path(&self) -> &Path {
        self.inner().path()
    }

    /// Loads `path` in whatever format it has, switching kinds if needed
    fn load(&mut self, path: &Path, surface: &mut dyn Surface) -> Result<(), SkinError> {
        let mut fresh = Self::open(path)?;
        if self.is_active() {
            fresh.activate();
        }
        self.deactivate(surface);
        *self = fresh;
        Ok(())
    }

    fn update_state(&mut self, state: Option<ControllerState>) -> bool {
        self.inner_mut().update_state(state)
    }

    fn rasterize(
        &mut self,
        surface: &mut dyn Surface,
        width: u32,
        height: u32,
        force: bool,
    ) -> Result<(), SkinError> {
        self.inner_mut().rasterize(surface, width, height, force)
    }

    fn render(&mut self, surface: &mut dyn Surface, width: u32, height: u32) {
        self.inner_mut().render(surface, width, height)
    }

    fn activate(&mut self) {
        self.inner_mut().activate()
    }

    fn is_active(&self) -> bool {
        self.inner().is_active()
    }

    fn deactivate(&mut self, surface: &mut dyn Surface) {
        self.inner_mut().deactivate(surface)
    }

    fn try_clone(&self) -> Result<Self, SkinError> {
        match self {
            Self::Vector(skin) => Ok(Self::Vector(skin.try_clone()?)),
            Self::ImageGrid(skin) => Ok(Self::ImageGrid(skin.try_clone()?)),
        }
    }

    fn default_size(&self) -> (u32, u32) {
        self.inner().default_size()
    }

    fn device_name(&self) -> Option<&str> {
        self.inner().device_name()
    }

    fn element_counts(&self) -> (usize, usize) {
        self.inner().element_counts()
    }

    fn elements_at(&self, point: Point, viewport: Size) -> HitTestResult {
        self.inner().elements_at(point, viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::fixtures::PAD;

    #[test]
    fn dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let svg = dir.path().join("pad.SVG");
        std::fs::write(&svg, PAD).unwrap();
        let skin = SkinKind::open(&svg).unwrap();
        assert!(matches!(skin, SkinKind::Vector(_)));
        assert_eq!(skin.device_name(), Some("Test Pad"));

        let other = dir.path().join("pad.json");
        std::fs::write(&other, "{}").unwrap();
        assert!(matches!(
            SkinKind::open(&other),
            Err(SkinError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn load_keeps_activation_and_swaps_content() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.svg");
        let second = dir.path().join("second.svg");
        std::fs::write(&first, PAD).unwrap();
        std::fs::write(&second, PAD.replace("Test Pad", "Second Pad")).unwrap();

        let mut surface = PixmapSurface::default();
        let mut skin = SkinKind::open(&first).unwrap();
        skin.activate();
        skin.render(&mut surface, 100, 50);
        assert_eq!(surface.texture_count(), 8);

        skin.load(&second, &mut surface).unwrap();
        assert_eq!(surface.texture_count(), 0);
        assert_eq!(skin.device_name(), Some("Second Pad"));
        skin.render(&mut surface, 100, 50);
        assert_eq!(surface.texture_count(), 8);

        assert!(skin.load(&dir.path().join("missing.svg"), &mut surface).is_err());
        assert_eq!(skin.path(), second.as_path());
        assert_eq!(surface.texture_count(), 8);
    }
}
