//! Drawing targets for the skin engine
//!
//! The engine never talks to a graphics API directly. It uploads rasterized
//! images through a [`Surface`], keeps the returned [`TextureId`]s, and asks
//! the surface to draw them into rectangles given in viewport pixels. Texture
//! lifetime belongs to whoever holds the id: every upload is eventually
//! matched by a `release`.
//!
//! [`PixmapSurface`] composites into an offscreen `tiny_skia` bitmap and is
//! used for headless rendering; the viewer has its own egui-backed surface.

use kurbo::Rect;
use std::collections::HashMap;
use std::path::Path;
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::{debug, warn};

/// Handle to an image uploaded to a [`Surface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Something the compositor can upload images to and draw them on.
///
/// All calls happen on the thread that owns the graphics context.
pub trait Surface {
    /// Stores `image` (premultiplied RGBA) and returns a handle to it
    fn upload(&mut self, name: &str, image: &Pixmap) -> TextureId;

    /// Frees a previously uploaded image; unknown ids are ignored
    fn release(&mut self, texture: TextureId);

    /// Draws a texture stretched over `rect` (viewport pixels)
    fn draw(&mut self, texture: TextureId, rect: Rect);
}

/// CPU compositor over `tiny_skia` pixmaps
#[derive(Debug)]
pub struct PixmapSurface {
    textures: HashMap<TextureId, Pixmap>,
    next_id: u64,
    target: Option<Pixmap>,
    clear: Color,
}

impl Default for PixmapSurface {
    fn default() -> Self {
        Self::new(Color::TRANSPARENT)
    }
}

impl PixmapSurface {
    pub fn new(clear: Color) -> Self {
        Self {
            textures: HashMap::new(),
            next_id: 1,
            target: None,
            clear,
        }
    }

    /// Prepares a cleared target of the given size. Returns `false` for a zero
    /// sized target, in which case draws are dropped.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> bool {
        match &mut self.target {
            Some(target) if target.width() == width && target.height() == height => {
                target.fill(self.clear);
            }
            _ => {
                self.target = Pixmap::new(width, height);
                if let Some(target) = &mut self.target {
                    target.fill(self.clear);
                }
            }
        }
        self.target.is_some()
    }

    pub fn frame(&self) -> Option<&Pixmap> {
        self.target.as_ref()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, texture: TextureId) -> Option<&Pixmap> {
        self.textures.get(&texture)
    }

    pub fn save_png(&self, path: &Path) -> Result<(), std::io::Error> {
        let Some(frame) = &self.target else {
            return Err(std::io::Error::other("no frame has been rendered"));
        };
        frame.save_png(path).map_err(std::io::Error::other)
    }
}

impl Surface for PixmapSurface {
    fn upload(&mut self, name: &str, image: &Pixmap) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        debug!(
            "Uploading texture {} ({}x{}) as {:?}",
            name,
            image.width(),
            image.height(),
            id
        );
        self.textures.insert(id, image.clone());
        id
    }

    fn release(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn draw(&mut self, texture: TextureId, rect: Rect) {
        let (Some(target), Some(image)) = (&mut self.target, self.textures.get(&texture)) else {
            warn!("Dropping draw of {:?}: no target or unknown texture", texture);
            return;
        };
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }

        let transform = Transform::from_row(
            (rect.width() / f64::from(image.width())) as f32,
            0.0,
            0.0,
            (rect.height() / f64::from(image.height())) as f32,
            rect.x0 as f32,
            rect.y0 as f32,
        );
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        target.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One recorded surface call
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Upload(TextureId, String, u32, u32),
        Release(TextureId),
        Draw(TextureId, Rect),
    }

    /// Surface that only records what it was asked to do
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) calls: Vec<Call>,
        next_id: u64,
        live: HashMap<TextureId, String>,
    }

    impl RecordingSurface {
        pub(crate) fn draws(&self) -> Vec<(String, Rect)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Draw(id, rect) => Some((self.name_of(*id), *rect)),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn name_of(&self, id: TextureId) -> String {
            self.live.get(&id).cloned().unwrap_or_else(|| "<released>".into())
        }

        pub(crate) fn live_textures(&self) -> usize {
            self.live.len()
        }

        pub(crate) fn clear_calls(&mut self) {
            self.calls.clear();
        }
    }

    impl Surface for RecordingSurface {
        fn upload(&mut self, name: &str, image: &Pixmap) -> TextureId {
            self.next_id += 1;
            let id = TextureId(self.next_id);
            self.live.insert(id, name.to_owned());
            self.calls
                .push(Call::Upload(id, name.to_owned(), image.width(), image.height()));
            id
        }

        fn release(&mut self, texture: TextureId) {
            self.live.remove(&texture);
            self.calls.push(Call::Release(texture));
        }

        fn draw(&mut self, texture: TextureId, rect: Rect) {
            self.calls.push(Call::Draw(texture, rect));
        }
    }
}
