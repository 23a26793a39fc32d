//! Reverse mapping from a viewport point to the elements drawn there
//!
//! Used by authoring tools to find out which inputs a click refers to. Bounds
//! are the resting ones: a deflected stick is still found where it sits when
//! centered. Overlapping elements all match.

use super::coords::CoordinateMapper;
use super::elements::{Binding, Layer, VisualRole};
use super::raster::TextureCache;
use kurbo::{Point, Size};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitTestResult {
    pub buttons: BTreeSet<usize>,
    /// Axis groups: `[horizontal, vertical]` for sticks, `[axis]` for triggers
    pub axes: BTreeSet<Vec<usize>>,
}

impl HitTestResult {
    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.axes.is_empty()
    }
}

pub fn elements_at(
    layers: &[Layer],
    cache: &TextureCache,
    mapper: &CoordinateMapper,
    point: Point,
    viewport: Size,
) -> HitTestResult {
    let mut result = HitTestResult::default();
    let Some(built_for) = cache.viewport() else {
        return result;
    };
    let target = mapper.project(point, viewport);

    for layer in layers {
        let hit = [VisualRole::Idle, VisualRole::Pressed]
            .into_iter()
            .filter_map(|role| cache.get(layer.key, role))
            .any(|element| mapper.project_rect(element.bounds, built_for).contains(target));
        if !hit {
            continue;
        }

        match layer.binding {
            Binding::Button { index } => {
                result.buttons.insert(index);
            }
            Binding::Stick {
                horizontal_axis,
                vertical_axis,
                ..
            } => {
                result.axes.insert(vec![horizontal_axis, vertical_axis]);
            }
            Binding::Trigger { axis, .. } => {
                result.axes.insert(vec![axis]);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::elements::ElementKey;
    use crate::skin::raster::RenderElement;
    use crate::skin::surface::TextureId;
    use kurbo::Rect;

    fn layer(key: ElementKey, binding: Binding) -> Layer {
        Layer {
            key,
            z_index: 0,
            binding,
        }
    }

    /// Cache built for a 200x100 viewport of a 100x50 skin
    fn setup() -> (Vec<Layer>, TextureCache, CoordinateMapper) {
        let layers = vec![
            layer(ElementKey::Button(0), Binding::Button { index: 0 }),
            layer(ElementKey::Button(4), Binding::Button { index: 4 }),
            layer(
                ElementKey::Stick(0),
                Binding::Stick {
                    horizontal_axis: 0,
                    vertical_axis: 1,
                    offset_scale: 10.0,
                },
            ),
            layer(
                ElementKey::Trigger(0),
                Binding::Trigger {
                    axis: 4,
                    offset_scale: 5.0,
                },
            ),
        ];
        let mut cache = TextureCache::default();
        let mut next = 0;
        let mut put = |key, role, bounds| {
            next += 1;
            cache.insert(
                key,
                role,
                RenderElement {
                    texture: TextureId::new(next),
                    bounds,
                },
            );
        };
        put(ElementKey::Button(0), VisualRole::Idle, Rect::new(0.0, 0.0, 40.0, 40.0));
        put(ElementKey::Button(4), VisualRole::Pressed, Rect::new(100.0, 0.0, 140.0, 40.0));
        put(ElementKey::Stick(0), VisualRole::Idle, Rect::new(20.0, 20.0, 60.0, 60.0));
        put(ElementKey::Trigger(0), VisualRole::Idle, Rect::new(180.0, 80.0, 200.0, 100.0));
        cache.mark_built(200, 100);
        (layers, cache, CoordinateMapper::new(Size::new(100.0, 50.0)))
    }

    #[test]
    fn overlapping_elements_all_match() {
        let (layers, cache, mapper) = setup();
        let result = elements_at(
            &layers,
            &cache,
            &mapper,
            Point::new(30.0, 30.0),
            Size::new(200.0, 100.0),
        );
        assert_eq!(result.buttons, BTreeSet::from([0]));
        assert_eq!(result.axes, BTreeSet::from([vec![0, 1]]));
    }

    #[test]
    fn pressed_only_visual_is_hit_in_another_viewport() {
        let (layers, cache, mapper) = setup();
        // (120,20) in the 200x100 build is (60,10) at 100x50
        let result = elements_at(
            &layers,
            &cache,
            &mapper,
            Point::new(60.0, 10.0),
            Size::new(100.0, 50.0),
        );
        assert_eq!(result.buttons, BTreeSet::from([4]));
        assert!(result.axes.is_empty());

        let trigger = elements_at(
            &layers,
            &cache,
            &mapper,
            Point::new(95.0, 45.0),
            Size::new(100.0, 50.0),
        );
        assert_eq!(trigger.axes, BTreeSet::from([vec![4]]));
    }

    #[test]
    fn misses_and_unbuilt_caches_are_empty() {
        let (layers, cache, mapper) = setup();
        let viewport = Size::new(200.0, 100.0);
        let miss = elements_at(&layers, &cache, &mapper, Point::new(150.0, 90.0), viewport);
        assert!(miss.is_empty());

        let empty = TextureCache::default();
        let unbuilt = elements_at(&layers, &empty, &mapper, Point::new(30.0, 30.0), viewport);
        assert!(unbuilt.is_empty());
    }
}
