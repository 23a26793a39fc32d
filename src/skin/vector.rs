//! Skins drawn from annotated SVG documents

use super::compositor::{composite, draw_order};
use super::coords::CoordinateMapper;
use super::document::SkinDocument;
use super::elements::Layer;
use super::error::SkinError;
use super::hit_test::{elements_at, HitTestResult};
use super::raster::{rasterize_vector, render_options, TextureCache};
use super::remap::ColorRemap;
use super::source::SourceTree;
use super::surface::Surface;
use super::Skin;
use crate::controller::{has_changed, ControllerState};
use kurbo::{Point, Size};
use resvg::usvg;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info};

pub struct VectorSkin {
    document: SkinDocument,
    /// Copy of the document markup that remaps and visibility passes act on
    working: SourceTree,
    layers: Vec<Layer>,
    mapper: CoordinateMapper,
    options: usvg::Options<'static>,
    cache: TextureCache,
    state: Option<ControllerState>,
    remap: Option<ColorRemap>,
    active: bool,
    dirty: bool,
}

impl fmt::Debug for VectorSkin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorSkin")
            .field("path", &self.document.path())
            .field("size", &self.document.size())
            .field("layers", &self.layers.len())
            .field("remap", &self.remap.as_ref().map(|remap| &remap.name))
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl VectorSkin {
    pub fn open(path: &Path) -> Result<Self, SkinError> {
        Ok(Self::from_document(SkinDocument::load(path)?))
    }

    pub fn from_document(document: SkinDocument) -> Self {
        let options = render_options(document.path().parent());
        Self {
            working: document.source().clone(),
            layers: draw_order(&document.elements().layers()),
            mapper: CoordinateMapper::new(document.size()),
            options,
            cache: TextureCache::default(),
            state: None,
            remap: None,
            active: false,
            dirty: true,
            document,
        }
    }

    pub fn document(&self) -> &SkinDocument {
        &self.document
    }

    pub fn remap(&self) -> Option<&ColorRemap> {
        self.remap.as_ref()
    }

    /// Recolors the working markup; textures are rebuilt on the next render
    pub fn apply_remap(&mut self, remap: ColorRemap) {
        let mut working = self.document.source().clone();
        let changed = remap.apply(&mut working);
        info!("Applied remap {:?} ({} values)", remap.name, changed);
        self.working = working;
        self.remap = Some(remap);
        self.dirty = true;
    }

    /// Back to the colors of the loaded document
    pub fn clear_remap(&mut self) {
        if self.remap.take().is_some() {
            self.working = self.document.source().clone();
            self.dirty = true;
        }
    }
}

impl Skin for VectorSkin {
    fn path(&self) -> &Path {
        self.document.path()
    }

    fn load(&mut self, path: &Path, surface: &mut dyn Surface) -> Result<(), SkinError> {
        let document = SkinDocument::load(path)?;
        self.cache.release_all(surface);
        let active = self.active;
        *self = Self::from_document(document);
        self.active = active;
        Ok(())
    }

    fn update_state(&mut self, state: Option<ControllerState>) -> bool {
        let changed = has_changed(self.state.as_ref(), state.as_ref());
        self.state = state;
        changed
    }

    fn rasterize(
        &mut self,
        surface: &mut dyn Surface,
        width: u32,
        height: u32,
        force: bool,
    ) -> Result<(), SkinError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        if !self.cache.needs_rebuild(width, height, force || self.dirty) {
            return Ok(());
        }
        let result = rasterize_vector(
            &mut self.working,
            self.document.elements(),
            &self.options,
            &self.mapper,
            (width, height),
            &mut self.cache,
            surface,
        );
        self.dirty = result.is_err();
        result
    }

    fn render(&mut self, surface: &mut dyn Surface, width: u32, height: u32) {
        if !self.active {
            debug!("Skipping render of inactive skin {}", self.path().display());
            return;
        }
        if let Err(e) = self.rasterize(surface, width, height, false) {
            error!("Rasterization of {} failed: {}", self.path().display(), e);
            return;
        }
        let idle = ControllerState::default();
        composite(
            &self.layers,
            &self.cache,
            self.state.as_ref().unwrap_or(&idle),
            &self.mapper,
            Size::new(f64::from(width), f64::from(height)),
            surface,
        );
    }

    fn activate(&mut self) {
        self.active = true;
        self.dirty = true;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn deactivate(&mut self, surface: &mut dyn Surface) {
        self.cache.release_all(surface);
        self.active = false;
    }

    fn try_clone(&self) -> Result<Self, SkinError> {
        Self::open(self.path())
    }

    fn default_size(&self) -> (u32, u32) {
        let size = self.document.size();
        (size.width.round() as u32, size.height.round() as u32)
    }

    fn device_name(&self) -> Option<&str> {
        self.document.device_name()
    }

    fn element_counts(&self) -> (usize, usize) {
        self.document.elements().input_counts()
    }

    fn elements_at(&self, point: Point, viewport: Size) -> HitTestResult {
        elements_at(&self.layers, &self.cache, &self.mapper, point, viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::fixtures::PAD;
    use crate::skin::surface::PixmapSurface;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn write_pad(dir: &TempDir, name: &str, markup: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, markup).unwrap();
        path
    }

    fn rgb(surface: &PixmapSurface, x: u32, y: u32) -> (u8, u8, u8) {
        let pixel = surface.frame().unwrap().pixel(x, y).unwrap().demultiply();
        (pixel.red(), pixel.green(), pixel.blue())
    }

    #[test]
    fn renders_pressed_button_and_deflected_stick() {
        let dir = tempfile::tempdir().unwrap();
        let mut skin = VectorSkin::open(&write_pad(&dir, "pad.svg", PAD)).unwrap();
        let mut surface = PixmapSurface::default();
        skin.activate();

        surface.begin_frame(100, 50);
        skin.render(&mut surface, 100, 50);
        assert_eq!(rgb(&surface, 10, 10), (255, 255, 255));
        assert_eq!(rgb(&surface, 70, 30), (0x88, 0x88, 0x88));

        let mut state = ControllerState::default();
        state.set_button(0, true);
        state.set_axis(0, 1.0);
        assert!(skin.update_state(Some(state.clone())));
        assert!(!skin.update_state(Some(state)));

        surface.begin_frame(100, 50);
        skin.render(&mut surface, 100, 50);
        assert_eq!(rgb(&surface, 10, 10), (255, 0, 0));
        // the stick moved 10 px right, uncovering the background
        assert_eq!(rgb(&surface, 63, 30), (0x20, 0x20, 0x20));
        assert_eq!(rgb(&surface, 80, 30), (0x88, 0x88, 0x88));
    }

    #[test]
    fn failed_load_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_pad(&dir, "pad.svg", PAD);
        let broken = write_pad(&dir, "broken.svg", &PAD.replace("axis-v=\"1\"", "axis-v=\"up\""));
        let mut skin = VectorSkin::open(&good).unwrap();
        let mut surface = PixmapSurface::default();

        assert!(skin.load(&broken, &mut surface).is_err());
        assert_eq!(skin.path(), good.as_path());
        assert_eq!(skin.element_counts(), (6, 5));
        assert_eq!(skin.device_name(), Some("Test Pad"));
    }

    #[test]
    fn clone_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pad(&dir, "pad.svg", PAD);
        let skin = VectorSkin::open(&path).unwrap();

        std::fs::write(&path, PAD.replace("Test Pad", "Other Pad")).unwrap();
        let clone = skin.try_clone().unwrap();
        assert_eq!(clone.device_name(), Some("Other Pad"));
        assert_eq!(skin.device_name(), Some("Test Pad"));
        assert_eq!(clone.default_size(), (100, 50));
    }

    #[test]
    fn remap_recolors_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let mut skin = VectorSkin::open(&write_pad(&dir, "pad.svg", PAD)).unwrap();
        let mut surface = PixmapSurface::default();
        skin.activate();

        skin.apply_remap(ColorRemap::new("dark").with_swap("#202020", "#000080"));
        surface.begin_frame(100, 50);
        skin.render(&mut surface, 100, 50);
        assert_eq!(rgb(&surface, 50, 45), (0, 0, 0x80));

        skin.clear_remap();
        surface.begin_frame(100, 50);
        skin.render(&mut surface, 100, 50);
        assert_eq!(rgb(&surface, 50, 45), (0x20, 0x20, 0x20));
    }

    #[test]
    fn hit_test_after_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut skin = VectorSkin::open(&write_pad(&dir, "pad.svg", PAD)).unwrap();
        let mut surface = PixmapSurface::default();
        skin.activate();
        surface.begin_frame(200, 100);
        skin.render(&mut surface, 200, 100);

        let hit = skin.elements_at(Point::new(140.0, 60.0), Size::new(200.0, 100.0));
        assert_eq!(hit.axes, BTreeSet::from([vec![0, 1]]));
        let hit = skin.elements_at(Point::new(20.0, 20.0), Size::new(200.0, 100.0));
        assert_eq!(hit.buttons, BTreeSet::from([0]));
    }

    #[test]
    fn inactive_skin_draws_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut skin = VectorSkin::open(&write_pad(&dir, "pad.svg", PAD)).unwrap();
        let mut surface = PixmapSurface::default();
        surface.begin_frame(100, 50);
        skin.render(&mut surface, 100, 50);
        assert_eq!(surface.texture_count(), 0);

        skin.activate();
        skin.render(&mut surface, 100, 50);
        assert_eq!(surface.texture_count(), 8);
        skin.deactivate(&mut surface);
        assert_eq!(surface.texture_count(), 0);
    }
}
