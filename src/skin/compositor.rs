//! Frame compositor
//!
//! Draws one frame from cached textures. Layers are stable-sorted by z-index,
//! so elements with equal z keep their table order (buttons, sticks, triggers,
//! each by id). Everything below zero goes under the base texture, the rest on
//! top of it.

use super::coords::CoordinateMapper;
use super::elements::{Binding, Layer, VisualRole};
use super::raster::TextureCache;
use super::surface::Surface;
use crate::controller::ControllerState;
use kurbo::{Size, Vec2};

/// Sorts layers into drawing order
pub fn draw_order(layers: &[Layer]) -> Vec<Layer> {
    let mut ordered = layers.to_vec();
    ordered.sort_by_key(|layer| layer.z_index);
    ordered
}

/// Draws `layers` (already in [`draw_order`]) for `state` into `surface`
pub fn composite(
    layers: &[Layer],
    cache: &TextureCache,
    state: &ControllerState,
    mapper: &CoordinateMapper,
    viewport: Size,
    surface: &mut dyn Surface,
) {
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return;
    }

    let scale = mapper.displacement_scale(viewport);
    let split = layers.partition_point(|layer| layer.z_index < 0);
    let (below, above) = layers.split_at(split);

    for layer in below {
        draw_layer(layer, cache, state, scale, surface);
    }
    if let Some(base) = cache.base() {
        surface.draw(base.texture, base.bounds);
    }
    for layer in above {
        draw_layer(layer, cache, state, scale, surface);
    }
}

fn draw_layer(
    layer: &Layer,
    cache: &TextureCache,
    state: &ControllerState,
    scale: Vec2,
    surface: &mut dyn Surface,
) {
    let (role, offset) = match layer.binding {
        Binding::Button { index } => {
            let role = if state.button(index) {
                VisualRole::Pressed
            } else {
                VisualRole::Idle
            };
            (role, Vec2::ZERO)
        }
        Binding::Stick {
            horizontal_axis,
            vertical_axis,
            offset_scale,
        } => (
            VisualRole::Idle,
            Vec2::new(
                f64::from(state.axis(horizontal_axis)) * offset_scale * scale.x,
                f64::from(state.axis(vertical_axis)) * offset_scale * scale.y,
            ),
        ),
        Binding::Trigger { axis, offset_scale } => (
            VisualRole::Idle,
            Vec2::new(0.0, f64::from(state.axis(axis)) * offset_scale * scale.y),
        ),
    };

    // A missing texture (no such visual, or skipped at rasterization) draws nothing
    if let Some(element) = cache.get(layer.key, role) {
        surface.draw(element.texture, element.bounds + offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::document::SkinDocument;
    use crate::skin::elements::ElementKey;
    use crate::skin::fixtures::PAD;
    use crate::skin::raster::RenderElement;
    use crate::skin::surface::testing::RecordingSurface;
    use kurbo::Rect;
    use tiny_skia::Pixmap;

    /// Fills a cache by hand so draws can be traced by texture name
    fn fake_cache(layers: &[Layer], surface: &mut RecordingSurface) -> TextureCache {
        let pixel = Pixmap::new(1, 1).unwrap();
        let mut cache = TextureCache::default();
        let texture = surface.upload("base", &pixel);
        cache.set_base(RenderElement {
            texture,
            bounds: Rect::new(0.0, 0.0, 100.0, 50.0),
        });
        for (i, layer) in layers.iter().enumerate() {
            for role in [VisualRole::Idle, VisualRole::Pressed] {
                // mirror the fixture: button 5 has no idle visual, 2 and 3 no pressed one
                let missing = match (layer.key, role) {
                    (ElementKey::Button(5), VisualRole::Idle) => true,
                    (ElementKey::Button(0 | 5), VisualRole::Pressed) => false,
                    (_, VisualRole::Pressed) => true,
                    _ => false,
                };
                if missing {
                    continue;
                }
                let name = format!("{:?}/{:?}", layer.key, role);
                let texture = surface.upload(&name, &pixel);
                let x = i as f64 * 10.0;
                cache.insert(
                    layer.key,
                    role,
                    RenderElement {
                        texture,
                        bounds: Rect::new(x, 0.0, x + 8.0, 8.0),
                    },
                );
            }
        }
        cache.mark_built(100, 50);
        surface.clear_calls();
        cache
    }

    fn pad_layers() -> (Vec<Layer>, CoordinateMapper) {
        let document = SkinDocument::parse(PAD).unwrap();
        (
            draw_order(&document.elements().layers()),
            CoordinateMapper::new(document.size()),
        )
    }

    fn state(buttons: &[bool], axes: &[f32]) -> ControllerState {
        ControllerState::new(buttons.to_vec(), axes.to_vec())
    }

    #[test]
    fn idle_frame_draw_order() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);

        composite(
            &layers,
            &cache,
            &ControllerState::default(),
            &mapper,
            Size::new(100.0, 50.0),
            &mut surface,
        );

        let names: Vec<_> = surface.draws().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "Button(3)/Idle",
                "Trigger(1)/Idle",
                "base",
                "Button(0)/Idle",
                "Button(2)/Idle",
                "Stick(0)/Idle",
            ]
        );
    }

    #[test]
    fn negative_layers_always_precede_the_base() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);
        let z_of = |name: &str| {
            layers
                .iter()
                .find(|layer| name.starts_with(&format!("{:?}/", layer.key)))
                .map(|layer| layer.z_index)
        };

        let states = [
            ControllerState::default(),
            state(&[true; 6], &[1.0, -1.0, 0.0, 0.0, 1.0]),
            state(&[false, true, false, true, false, true], &[-0.5; 5]),
        ];
        for state in &states {
            surface.clear_calls();
            composite(&layers, &cache, state, &mapper, Size::new(100.0, 50.0), &mut surface);
            let names: Vec<_> = surface.draws().into_iter().map(|(name, _)| name).collect();
            let base = names.iter().position(|name| name == "base").unwrap();
            for (i, name) in names.iter().enumerate() {
                if i == base {
                    continue;
                }
                let z = z_of(name).unwrap();
                assert_eq!(i < base, z < 0, "{name} with z {z} drawn at {i}, base at {base}");
            }
        }
    }

    #[test]
    fn pressed_buttons_swap_visuals() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);

        composite(
            &layers,
            &cache,
            &state(&[true, false, true, false, false, true], &[]),
            &mapper,
            Size::new(100.0, 50.0),
            &mut surface,
        );

        let names: Vec<_> = surface.draws().into_iter().map(|(name, _)| name).collect();
        assert!(names.contains(&"Button(0)/Pressed".to_owned()));
        assert!(names.contains(&"Button(5)/Pressed".to_owned()));
        // button 2 is pressed but has no pressed visual
        assert!(!names.iter().any(|name| name.starts_with("Button(2)")));
        assert!(names.contains(&"Button(3)/Idle".to_owned()));
    }

    #[test]
    fn stick_shift_matches_offset_scale() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);
        let rest = cache.get(ElementKey::Stick(0), VisualRole::Idle).unwrap().bounds;

        composite(
            &layers,
            &cache,
            &state(&[], &[1.0, 0.0]),
            &mapper,
            Size::new(100.0, 50.0),
            &mut surface,
        );

        let (_, drawn) = surface
            .draws()
            .into_iter()
            .find(|(name, _)| name == "Stick(0)/Idle")
            .unwrap();
        assert_eq!(drawn, rest + Vec2::new(10.0, 0.0));
    }

    #[test]
    fn trigger_moves_vertically_with_viewport_scale() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);
        let rest = cache.get(ElementKey::Trigger(1), VisualRole::Idle).unwrap().bounds;

        // 100x100 viewport stretches skin units vertically by 2
        composite(
            &layers,
            &cache,
            &state(&[], &[0.0, 0.0, 0.0, 0.0, 0.5]),
            &mapper,
            Size::new(100.0, 100.0),
            &mut surface,
        );

        let (_, drawn) = surface
            .draws()
            .into_iter()
            .find(|(name, _)| name == "Trigger(1)/Idle")
            .unwrap();
        assert_eq!(drawn, rest + Vec2::new(0.0, 5.0));
    }

    #[test]
    fn degenerate_viewport_draws_nothing() {
        let (layers, mapper) = pad_layers();
        let mut surface = RecordingSurface::default();
        let cache = fake_cache(&layers, &mut surface);
        composite(
            &layers,
            &cache,
            &ControllerState::default(),
            &mapper,
            Size::new(0.0, 50.0),
            &mut surface,
        );
        assert!(surface.calls.is_empty());
    }
}
