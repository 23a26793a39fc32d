//! Skins assembled from PNG images placed by an XML layout
//!
//! ```xml
//! <skin device-name="Wireless Controller">
//!   <background image="base.png"/>
//!   <button id="0" image="a.png" x="10" y="10" width="8" height="8"/>
//!   <button id="0" state="pressed" image="a_down.png" x="10" y="10" width="8" height="8"/>
//!   <stick id="0" axis-h="0" axis-v="1" offset-scale="10" image="stick.png" x="60" y="20" width="20" height="20"/>
//!   <trigger id="0" axis="4" offset-scale="5" image="lt.png" x="5" y="0" width="12" height="6"/>
//! </skin>
//! ```
//!
//! Coordinates are background-image pixels unless the background declares its
//! own `width`/`height`. Image paths are relative to the layout file. Images
//! are decoded once at load; every rasterization pass uploads them again with
//! bounds computed for the new viewport.

use super::compositor::{composite, draw_order};
use super::coords::CoordinateMapper;
use super::elements::{
    ElementTable, Layer, StickSpec, TriggerSpec, VisualRole, DEFAULT_STICK_Z, DEFAULT_TRIGGER_Z,
    MAX_SLOT_ID,
};
use super::error::SkinError;
use super::hit_test::{elements_at, HitTestResult};
use super::raster::{RenderElement, TextureCache};
use super::surface::Surface;
use super::Skin;
use crate::controller::{has_changed, ControllerState};
use kurbo::{Point, Rect, Size};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tiny_skia::Pixmap;
use tracing::{debug, error, info};

/// A decoded image and where it sits in layout units
#[derive(Debug, Clone)]
struct Placed {
    image: Pixmap,
    rect: Rect,
}

#[derive(Debug)]
pub struct ImageGridSkin {
    path: PathBuf,
    background: Pixmap,
    images: Vec<Placed>,
    elements: ElementTable<usize>,
    layers: Vec<Layer>,
    mapper: CoordinateMapper,
    device_name: Option<String>,
    cache: TextureCache,
    state: Option<ControllerState>,
    active: bool,
    dirty: bool,
}

impl ImageGridSkin {
    pub fn open(path: &Path) -> Result<Self, SkinError> {
        info!("Loading image-grid skin from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| SkinError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut skin = Self::parse(&text, base_dir)?;
        skin.path = path.to_path_buf();
        Ok(skin)
    }

    /// Parses a layout whose image paths are relative to `base_dir`
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, SkinError> {
        let document = roxmltree::Document::parse(text)?;
        let root = document.root_element();
        if root.tag_name().name() != "skin" {
            return Err(SkinError::UnsupportedLayout(format!(
                "expected <skin> root, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut background = None;
        let mut size = None;
        let mut images = Vec::new();
        let mut elements = ElementTable::default();

        for node in root.children().filter(|node| node.is_element()) {
            let kind = node.tag_name().name();
            if kind == "background" {
                let image = load_image(base_dir, required(&node, "image")?)?;
                let declared = Size::new(
                    optional(&node, "width")?.unwrap_or(f64::from(image.width())),
                    optional(&node, "height")?.unwrap_or(f64::from(image.height())),
                );
                size = Some(declared);
                background = Some(image);
                continue;
            }

            let visual = images.len();
            match kind {
                "button" => {
                    let role = if node.attribute("state") == Some("pressed") {
                        VisualRole::Pressed
                    } else {
                        VisualRole::Idle
                    };
                    let z_index = optional(&node, "z-index")?;
                    elements.add_button_visual(slot_id(&node)?, role, z_index, visual);
                }
                "stick" => elements.set_stick(StickSpec {
                    id: slot_id(&node)?,
                    z_index: optional(&node, "z-index")?.unwrap_or(DEFAULT_STICK_Z),
                    visual,
                    horizontal_axis: required(&node, "axis-h")?,
                    vertical_axis: required(&node, "axis-v")?,
                    offset_scale: required(&node, "offset-scale")?,
                }),
                "trigger" => elements.set_trigger(TriggerSpec {
                    id: slot_id(&node)?,
                    z_index: optional(&node, "z-index")?.unwrap_or(DEFAULT_TRIGGER_Z),
                    visual,
                    axis: required(&node, "axis")?,
                    offset_scale: required(&node, "offset-scale")?,
                }),
                other => {
                    debug!("Ignoring layout node <{}>", other);
                    continue;
                }
            }

            let image = load_image(base_dir, required(&node, "image")?)?;
            let origin = Point::new(required(&node, "x")?, required(&node, "y")?);
            let extent = Size::new(
                optional(&node, "width")?.unwrap_or(f64::from(image.width())),
                optional(&node, "height")?.unwrap_or(f64::from(image.height())),
            );
            images.push(Placed {
                image,
                rect: Rect::from_origin_size(origin, extent),
            });
        }

        let (Some(background), Some(size)) = (background, size) else {
            return Err(SkinError::UnsupportedLayout("layout has no <background>".into()));
        };
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(SkinError::DegenerateSize {
                width: size.width,
                height: size.height,
            });
        }

        let device_name = root.attribute("device-name").map(str::to_owned);
        info!(
            "Parsed image-grid skin: {} images, size {}x{}, device {:?}",
            images.len(),
            size.width,
            size.height,
            device_name
        );
        Ok(Self {
            path: PathBuf::new(),
            background,
            layers: draw_order(&elements.layers()),
            images,
            elements,
            mapper: CoordinateMapper::new(size),
            device_name,
            cache: TextureCache::default(),
            state: None,
            active: false,
            dirty: true,
        })
    }
}

impl Skin for ImageGridSkin {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self, path: &Path, surface: &mut dyn Surface) -> Result<(), SkinError> {
        let fresh = Self::open(path)?;
        self.cache.release_all(surface);
        let active = self.active;
        *self = fresh;
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

        self.cache.release_all(surface);
        let viewport = Size::new(f64::from(width), f64::from(height));
        let texture = surface.upload("background", &self.background);
        self.cache.set_base(RenderElement {
            texture,
            bounds: self
                .mapper
                .unproject_rect(self.mapper.skin_size().to_rect(), viewport),
        });
        for (key, role, visual) in self.elements.visuals() {
            let Some(placed) = self.images.get(visual) else {
                continue;
            };
            let texture = surface.upload(&format!("{key:?}/{role:?}"), &placed.image);
            let bounds = self.mapper.unproject_rect(placed.rect, viewport);
            self.cache.insert(key, role, RenderElement { texture, bounds });
        }
        self.cache.mark_built(width, height);
        self.dirty = false;
        debug!("Uploaded {} image-grid textures at {}x{}", self.cache.len(), width, height);
        Ok(())
    }

    fn render(&mut self, surface: &mut dyn Surface, width: u32, height: u32) {
        if !self.active {
            return;
        }
        if let Err(e) = self.rasterize(surface, width, height, false) {
            error!("Rasterization of {} failed: {}", self.path.display(), e);
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
        Self::open(&self.path)
    }

    fn default_size(&self) -> (u32, u32) {
        let size = self.mapper.skin_size();
        (size.width.round() as u32, size.height.round() as u32)
    }

    fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    fn element_counts(&self) -> (usize, usize) {
        self.elements.input_counts()
    }

    fn elements_at(&self, point: Point, viewport: Size) -> HitTestResult {
        elements_at(&self.layers, &self.cache, &self.mapper, point, viewport)
    }
}

fn load_image(base_dir: &Path, relative: String) -> Result<Pixmap, SkinError> {
    let path = base_dir.join(relative);
    Pixmap::load_png(&path).map_err(|e| SkinError::Image {
        reason: e.to_string(),
        path,
    })
}

fn optional<T: FromStr>(
    node: &roxmltree::Node<'_, '_>,
    attribute: &'static str,
) -> Result<Option<T>, SkinError> {
    let Some(value) = node.attribute(attribute) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| SkinError::InvalidAttribute {
            element: node.tag_name().name().to_owned(),
            attribute,
            value: value.to_owned(),
        })
}

/// The `id` of a layout node, rejected above [`MAX_SLOT_ID`]
fn slot_id(node: &roxmltree::Node<'_, '_>) -> Result<usize, SkinError> {
    let id = required::<usize>(node, "id")?;
    if id > MAX_SLOT_ID {
        return Err(SkinError::InvalidAttribute {
            element: node.tag_name().name().to_owned(),
            attribute: "id",
            value: id.to_string(),
        });
    }
    Ok(id)
}

fn required<T: FromStr>(
    node: &roxmltree::Node<'_, '_>,
    attribute: &'static str,
) -> Result<T, SkinError> {
    optional(node, attribute)?.ok_or_else(|| SkinError::MissingAttribute {
        element: node.tag_name().name().to_owned(),
        attribute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::elements::ElementKey;
    use crate::skin::surface::testing::RecordingSurface;
    use kurbo::Vec2;
    use tempfile::TempDir;
    use tiny_skia::Color;

    const LAYOUT: &str = r#"<skin device-name="Grid Pad">
      <background image="base.png"/>
      <button id="0" image="dot.png" x="10" y="10"/>
      <button id="0" state="pressed" image="dot.png" x="10" y="10" z-index="2"/>
      <button id="3" image="dot.png" x="30" y="10" width="8" height="8"/>
      <stick id="0" axis-h="0" axis-v="1" offset-scale="10" image="dot.png" x="60" y="20"/>
      <trigger id="0" axis="4" offset-scale="5" image="dot.png" x="80" y="2"/>
      <label text="ignored"/>
    </skin>"#;

    fn fixture_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut base = Pixmap::new(100, 50).unwrap();
        base.fill(Color::from_rgba8(32, 32, 32, 255));
        base.save_png(dir.path().join("base.png")).unwrap();
        let mut dot = Pixmap::new(4, 4).unwrap();
        dot.fill(Color::WHITE);
        dot.save_png(dir.path().join("dot.png")).unwrap();
        dir
    }

    fn write_layout(dir: &TempDir, layout: &str) -> PathBuf {
        let path = dir.path().join("layout.xml");
        std::fs::write(&path, layout).unwrap();
        path
    }

    #[test]
    fn parses_layout_and_images() {
        let dir = fixture_dir();
        let skin = ImageGridSkin::open(&write_layout(&dir, LAYOUT)).unwrap();
        assert_eq!(skin.default_size(), (100, 50));
        assert_eq!(skin.device_name(), Some("Grid Pad"));
        assert_eq!(skin.element_counts(), (4, 5));
        assert_eq!(skin.elements.buttons()[0].as_ref().unwrap().z_index, 2);
        assert_eq!(skin.images[0].rect, Rect::new(10.0, 10.0, 14.0, 14.0));
        assert_eq!(skin.images[2].rect, Rect::new(30.0, 10.0, 38.0, 18.0));
    }

    #[test]
    fn rasterize_scales_bounds_into_viewport() {
        let dir = fixture_dir();
        let mut skin = ImageGridSkin::open(&write_layout(&dir, LAYOUT)).unwrap();
        let mut surface = RecordingSurface::default();
        skin.activate();
        skin.render(&mut surface, 200, 200);

        // 100x50 layout in a square viewport: letterboxed by 50 px top and bottom
        let base = skin.cache.base().unwrap();
        assert_eq!(base.bounds, Rect::new(0.0, 50.0, 200.0, 150.0));
        let stick = *skin.cache.get(ElementKey::Stick(0), VisualRole::Idle).unwrap();
        assert_eq!(stick.bounds, Rect::new(120.0, 90.0, 128.0, 98.0));
        assert_eq!(surface.live_textures(), 6);

        let mut state = ControllerState::default();
        state.set_axis(0, -0.5);
        skin.update_state(Some(state));
        surface.clear_calls();
        skin.render(&mut surface, 200, 200);
        let (_, drawn) = surface
            .draws()
            .into_iter()
            .find(|(name, _)| name == "Stick(0)/Idle")
            .unwrap();
        // -0.5 * 10 * (200 / 100)
        assert_eq!(drawn, stick.bounds + Vec2::new(-10.0, 0.0));
    }

    #[test]
    fn missing_image_fails_the_load() {
        let dir = fixture_dir();
        let layout = LAYOUT.replace(r#"image="dot.png" x="60""#, r#"image="gone.png" x="60""#);
        assert!(matches!(
            ImageGridSkin::open(&write_layout(&dir, &layout)),
            Err(SkinError::Image { .. })
        ));
    }

    #[test]
    fn oversized_slot_id_fails_the_load() {
        let dir = fixture_dir();
        let layout = LAYOUT.replace(r#"<button id="3""#, r#"<button id="4000000000""#);
        match ImageGridSkin::open(&write_layout(&dir, &layout)) {
            Err(SkinError::InvalidAttribute {
                attribute, value, ..
            }) => {
                assert_eq!(attribute, "id");
                assert_eq!(value, "4000000000");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let highest = LAYOUT.replace(r#"<button id="3""#, r#"<button id="1023""#);
        let skin = ImageGridSkin::open(&write_layout(&dir, &highest)).unwrap();
        assert_eq!(skin.element_counts().0, 1024);
    }

    #[test]
    fn rejects_other_roots_and_missing_background() {
        let dir = fixture_dir();
        assert!(matches!(
            ImageGridSkin::parse("<svg/>", dir.path()),
            Err(SkinError::UnsupportedLayout(_))
        ));
        assert!(matches!(
            ImageGridSkin::parse("<skin/>", dir.path()),
            Err(SkinError::UnsupportedLayout(_))
        ));
    }
}
