//! [`Surface`] backed by egui textures
//!
//! egui repaints the whole window every frame, so draws are kept in a list and
//! replayed by [`EguiSurface::paint`] until the compositor produces a new one.

use crate::skin::{Surface, TextureId};
use eframe::egui::{self, Color32, ColorImage, Painter, Pos2, TextureHandle, TextureOptions};
use kurbo::Rect;
use std::collections::HashMap;
use tiny_skia::Pixmap;
use tracing::{debug, warn};

pub struct EguiSurface {
    ctx: egui::Context,
    textures: HashMap<TextureId, TextureHandle>,
    next_id: u64,
    commands: Vec<(egui::TextureId, Rect)>,
}

impl EguiSurface {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            textures: HashMap::new(),
            next_id: 1,
            commands: Vec::new(),
        }
    }

    /// Drops the retained draw list before the compositor runs again
    pub fn begin_frame(&mut self) {
        self.commands.clear();
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Replays the draw list. Rects are in physical pixels relative to `origin`.
    pub fn paint(&self, painter: &Painter, origin: Pos2, pixels_per_point: f32) {
        let uv = egui::Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        for (texture, rect) in &self.commands {
            let min = origin
                + egui::vec2(rect.x0 as f32, rect.y0 as f32) / pixels_per_point;
            let size = egui::vec2(rect.width() as f32, rect.height() as f32) / pixels_per_point;
            painter.image(*texture, egui::Rect::from_min_size(min, size), uv, Color32::WHITE);
        }
    }
}

impl Surface for EguiSurface {
    fn upload(&mut self, name: &str, image: &Pixmap) -> TextureId {
        let id = TextureId::new(self.next_id);
        self.next_id += 1;
        let color_image = ColorImage::from_rgba_premultiplied(
            [image.width() as usize, image.height() as usize],
            image.data(),
        );
        let handle = self
            .ctx
            .load_texture(name, color_image, TextureOptions::LINEAR);
        debug!("Uploaded {} as {:?}", name, id);
        self.textures.insert(id, handle);
        id
    }

    fn release(&mut self, texture: TextureId) {
        // dropping the handle frees the texture
        self.textures.remove(&texture);
    }

    fn draw(&mut self, texture: TextureId, rect: Rect) {
        match self.textures.get(&texture) {
            Some(handle) => self.commands.push((handle.id(), rect)),
            None => warn!("Draw of unknown texture {:?}", texture),
        }
    }
}
