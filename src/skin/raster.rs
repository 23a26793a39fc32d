//! Texture cache and the vector rasterizer that fills it
//!
//! ## Key Abstractions
//!
//! - [`TextureCache`]: the base texture plus one [`RenderElement`] per visual,
//!   tagged with the viewport size they were built for. It owns every texture
//!   it holds and releases all of them before each rebuild.
//! - [`rasterize_vector`]: one full pass over a vector skin. The base layer is
//!   drawn with every annotated visual hidden, then each visual is drawn alone
//!   (its branch of the tree visible, everything else hidden), cropped to its
//!   bounds and uploaded.
//!
//! Elements that produce no geometry or fall entirely outside the viewport are
//! skipped with a warning and simply never drawn.

use super::coords::CoordinateMapper;
use super::elements::{ElementKey, ElementTable, VisualRole};
use super::error::SkinError;
use super::source::{NodeId, SourceTree};
use super::surface::{Surface, TextureId};
use kurbo::{Rect, Size};
use resvg::usvg;
use std::collections::HashMap;
use std::path::Path;
use tiny_skia::{Color, IntRect, Pixmap, Transform};
use tracing::{debug, info, warn};

/// Padding added around each element's bounds, in viewport pixels
pub const BOUNDS_INFLATE: f64 = 3.0;

/// A cached texture and where it is drawn at rest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderElement {
    pub texture: TextureId,
    /// Viewport pixels, before any stick or trigger displacement
    pub bounds: Rect,
}

#[derive(Debug, Default)]
pub struct TextureCache {
    base: Option<RenderElement>,
    entries: HashMap<(ElementKey, VisualRole), RenderElement>,
    viewport: Option<(u32, u32)>,
}

impl TextureCache {
    /// Whether a pass is due for the given viewport
    pub fn needs_rebuild(&self, width: u32, height: u32, force: bool) -> bool {
        force || self.viewport != Some((width, height))
    }

    /// Viewport the current textures were built for
    pub fn viewport(&self) -> Option<Size> {
        self.viewport
            .map(|(width, height)| Size::new(f64::from(width), f64::from(height)))
    }

    pub fn base(&self) -> Option<&RenderElement> {
        self.base.as_ref()
    }

    pub fn set_base(&mut self, element: RenderElement) {
        self.base = Some(element);
    }

    pub fn get(&self, key: ElementKey, role: VisualRole) -> Option<&RenderElement> {
        self.entries.get(&(key, role))
    }

    pub fn insert(&mut self, key: ElementKey, role: VisualRole, element: RenderElement) {
        self.entries.insert((key, role), element);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.base.is_none()
    }

    pub fn mark_built(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    /// Makes the next render rebuild without touching the textures yet
    pub fn invalidate(&mut self) {
        self.viewport = None;
    }

    pub fn release_all(&mut self, surface: &mut dyn Surface) {
        if let Some(base) = self.base.take() {
            surface.release(base.texture);
        }
        for (_, element) in self.entries.drain() {
            surface.release(element.texture);
        }
        self.viewport = None;
    }
}

/// usvg options for rendering skins, with external images resolved relative
/// to `resources_dir` and system fonts available for text.
pub fn render_options(resources_dir: Option<&Path>) -> usvg::Options<'static> {
    let mut options = usvg::Options {
        resources_dir: resources_dir.map(Path::to_path_buf),
        ..usvg::Options::default()
    };
    options.fontdb_mut().load_system_fonts();
    options
}

/// Rebuilds every texture of a vector skin for a `width` x `height` viewport.
///
/// Leaves all nodes of `tree` visible when it returns, on success or not.
pub fn rasterize_vector(
    tree: &mut SourceTree,
    elements: &ElementTable<NodeId>,
    options: &usvg::Options<'_>,
    mapper: &CoordinateMapper,
    (width, height): (u32, u32),
    cache: &mut TextureCache,
    surface: &mut dyn Surface,
) -> Result<(), SkinError> {
    cache.release_all(surface);

    let viewport = Size::new(f64::from(width), f64::from(height));
    let mut scratch = Pixmap::new(width, height).ok_or(SkinError::DegenerateSize {
        width: viewport.width,
        height: viewport.height,
    })?;
    let pass = Pass {
        options,
        mapper,
        viewport,
        transform: mapper.raster_transform(viewport),
    };
    let visuals = elements.visuals();

    // Base layer: the artwork with every annotated visual switched off
    tree.show_all();
    for (_, _, node) in &visuals {
        tree.set_visible(*node, false);
    }
    let base = usvg::Tree::from_str(&tree.to_svg_string(), options);
    tree.show_all();
    let base = base?;
    resvg::render(&base, pass.transform, &mut scratch.as_mut());
    let texture = surface.upload("base", &scratch);
    cache.set_base(RenderElement {
        texture,
        bounds: viewport.to_rect(),
    });
    scratch.fill(Color::TRANSPARENT);

    tree.hide_all();
    let mut uploaded = 0;
    for (key, role, node) in visuals {
        tree.set_visible_recursive(node, true);
        tree.set_visible_to_root(node, true);
        let outcome = pass.crop_visual(tree, &mut scratch);
        tree.set_visible_recursive(node, false);
        tree.set_visible_to_root(node, false);

        match outcome {
            Ok(Some((image, bounds))) => {
                let texture = surface.upload(&format!("{key:?}/{role:?}"), &image);
                debug!("Rasterized {:?}/{:?} into {:?}", key, role, bounds);
                cache.insert(key, role, RenderElement { texture, bounds });
                uploaded += 1;
            }
            Ok(None) => warn!("Skipping {:?}/{:?}: nothing visible to rasterize", key, role),
            Err(e) => warn!("Skipping {:?}/{:?}: {}", key, role, e),
        }
    }
    tree.show_all();

    cache.mark_built(width, height);
    info!(
        "Rasterized skin at {}x{}: base + {} element textures",
        width, height, uploaded
    );
    Ok(())
}

/// Rounds coordinates to a 1/1000 px grid so float noise in curve bounds
/// does not push `expand` out by a whole pixel
fn snap(rect: Rect) -> Rect {
    let grid = |value: f64| (value * 1000.0).round() / 1000.0;
    Rect::new(grid(rect.x0), grid(rect.y0), grid(rect.x1), grid(rect.y1))
}

struct Pass<'a, 'o> {
    options: &'a usvg::Options<'o>,
    mapper: &'a CoordinateMapper,
    viewport: Size,
    transform: Transform,
}

impl Pass<'_, '_> {
    /// Renders the currently visible part of `tree` and crops it to its bounds
    fn crop_visual(
        &self,
        tree: &SourceTree,
        scratch: &mut Pixmap,
    ) -> Result<Option<(Pixmap, Rect)>, SkinError> {
        let rendered = usvg::Tree::from_str(&tree.to_svg_string(), self.options)?;
        if !rendered.root().has_children() {
            return Ok(None);
        }

        let declared = rendered.root().abs_stroke_bounding_box();
        let declared = Rect::new(
            f64::from(declared.left()),
            f64::from(declared.top()),
            f64::from(declared.right()),
            f64::from(declared.bottom()),
        );
        let bounds = self
            .mapper
            .unproject_rect(declared, self.viewport)
            .inflate(BOUNDS_INFLATE, BOUNDS_INFLATE);
        let bounds = snap(bounds)
            .expand()
            .intersect(self.viewport.to_rect());
        if bounds.width() < 1.0 || bounds.height() < 1.0 {
            return Ok(None);
        }

        resvg::render(&rendered, self.transform, &mut scratch.as_mut());
        let image = IntRect::from_xywh(
            bounds.x0 as i32,
            bounds.y0 as i32,
            bounds.width() as u32,
            bounds.height() as u32,
        )
        .and_then(|crop| scratch.clone_rect(crop));
        scratch.fill(Color::TRANSPARENT);

        Ok(image.map(|image| (image, bounds)))
    }
}
