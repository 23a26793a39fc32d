//! Skin-space <-> viewport-space mapping with aspect-ratio letterboxing
//!
//! A skin declares its artwork in its own logical units. When the viewport has a
//! different aspect ratio, the artwork is scaled uniformly and centered, leaving
//! a band of padding either above/below or left/right of it:
//!
//! ```text
//!  skin wider than viewport        skin narrower than viewport
//!  ┌──────────────┐                ┌────┬──────┬────┐
//!  │   padding    │                │    │      │    │
//!  ├──────────────┤                │pad │ skin │pad │
//!  │     skin     │                │    │      │    │
//!  ├──────────────┤                └────┴──────┴────┘
//!  │   padding    │
//!  └──────────────┘
//! ```
//!
//! Every function here is pure. Degenerate sizes (zero, negative or non-finite
//! extents on either side) map points to themselves instead of producing NaN.

use kurbo::{Point, Rect, Size, Vec2};
use tiny_skia::Transform;

/// Placement of the scaled artwork inside a viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Top-left corner of the artwork in viewport pixels
    pub offset: Vec2,
    /// Size the artwork occupies in viewport pixels
    pub effective: Size,
}

/// Converts points between skin space and viewport space for one skin size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    skin: Size,
}

impl CoordinateMapper {
    pub fn new(skin: Size) -> Self {
        Self { skin }
    }

    pub fn skin_size(&self) -> Size {
        self.skin
    }

    fn is_degenerate(&self, viewport: Size) -> bool {
        !is_usable(self.skin) || !is_usable(viewport)
    }

    /// Computes where the artwork lands inside `viewport`.
    ///
    /// When the aspect ratios are exactly equal the horizontal branch is taken,
    /// which yields a zero offset on both axes.
    pub fn letterbox(&self, viewport: Size) -> Letterbox {
        if self.is_degenerate(viewport) {
            return Letterbox {
                offset: Vec2::ZERO,
                effective: viewport,
            };
        }

        let skin_ratio = self.skin.width / self.skin.height;
        let viewport_ratio = viewport.width / viewport.height;

        if skin_ratio > viewport_ratio {
            let effective_height = viewport.width / skin_ratio;
            Letterbox {
                offset: Vec2::new(0.0, (viewport.height - effective_height) / 2.0),
                effective: Size::new(viewport.width, effective_height),
            }
        } else {
            let effective_width = viewport.height * skin_ratio;
            Letterbox {
                offset: Vec2::new((viewport.width - effective_width) / 2.0, 0.0),
                effective: Size::new(effective_width, viewport.height),
            }
        }
    }

    /// Viewport pixel -> skin unit
    pub fn project(&self, point: Point, viewport: Size) -> Point {
        if self.is_degenerate(viewport) {
            return point;
        }
        let letterbox = self.letterbox(viewport);
        let local = point - letterbox.offset;
        Point::new(
            local.x / letterbox.effective.width * self.skin.width,
            local.y / letterbox.effective.height * self.skin.height,
        )
    }

    /// Skin unit -> viewport pixel, the exact inverse of [`project`](Self::project)
    pub fn unproject(&self, point: Point, viewport: Size) -> Point {
        if self.is_degenerate(viewport) {
            return point;
        }
        let letterbox = self.letterbox(viewport);
        Point::new(
            point.x / self.skin.width * letterbox.effective.width,
            point.y / self.skin.height * letterbox.effective.height,
        ) + letterbox.offset
    }

    pub fn project_rect(&self, rect: Rect, viewport: Size) -> Rect {
        Rect::from_points(
            self.project(Point::new(rect.x0, rect.y0), viewport),
            self.project(Point::new(rect.x1, rect.y1), viewport),
        )
    }

    pub fn unproject_rect(&self, rect: Rect, viewport: Size) -> Rect {
        Rect::from_points(
            self.unproject(Point::new(rect.x0, rect.y0), viewport),
            self.unproject(Point::new(rect.x1, rect.y1), viewport),
        )
    }

    /// Pixels per skin unit on each axis, measured against the whole viewport
    /// rather than the letterboxed area. Stick and trigger displacement uses this.
    pub fn displacement_scale(&self, viewport: Size) -> Vec2 {
        if self.is_degenerate(viewport) {
            return Vec2::new(1.0, 1.0);
        }
        Vec2::new(
            viewport.width / self.skin.width,
            viewport.height / self.skin.height,
        )
    }

    /// Raster transform equivalent to [`unproject`](Self::unproject)
    pub fn raster_transform(&self, viewport: Size) -> Transform {
        if self.is_degenerate(viewport) {
            return Transform::identity();
        }
        let letterbox = self.letterbox(viewport);
        Transform::from_row(
            (letterbox.effective.width / self.skin.width) as f32,
            0.0,
            0.0,
            (letterbox.effective.height / self.skin.height) as f32,
            letterbox.offset.x as f32,
            letterbox.offset.y as f32,
        )
    }
}

fn is_usable(size: Size) -> bool {
    size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
}
