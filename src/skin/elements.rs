//! Element table: the dense, id-indexed slots for buttons, sticks and triggers
//!
//! Ids from a skin are slot indices. Inserting id 5 into a table whose highest
//! id is 2 grows it with empty placeholders for 3 and 4, so a slot's position
//! always equals the button or axis group it animates.
//!
//! The table is generic over `V`, the handle of the visual that gets drawn: a
//! markup node for vector skins, an image index for image-grid skins.

/// Draw order for sticks without an explicit `z-index`
pub const DEFAULT_STICK_Z: i32 = 1;
/// Draw order for triggers without an explicit `z-index`
pub const DEFAULT_TRIGGER_Z: i32 = -1;
/// Draw order for buttons without an explicit `z-index`
pub const DEFAULT_BUTTON_Z: i32 = 0;
/// Highest slot id a skin may use; slots are allocated densely up to it
pub const MAX_SLOT_ID: usize = 1023;

/// Addresses one slot of one element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
    Button(usize),
    Stick(usize),
    Trigger(usize),
}

/// Which visual of a button is meant; sticks and triggers only have `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualRole {
    Idle,
    Pressed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonSpec<V> {
    pub id: usize,
    pub z_index: i32,
    pub idle: Option<V>,
    pub pressed: Option<V>,
}

impl<V> ButtonSpec<V> {
    pub fn has_pressed_variant(&self) -> bool {
        self.pressed.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StickSpec<V> {
    pub id: usize,
    pub z_index: i32,
    pub visual: V,
    pub horizontal_axis: usize,
    pub vertical_axis: usize,
    pub offset_scale: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSpec<V> {
    pub id: usize,
    pub z_index: i32,
    pub visual: V,
    pub axis: usize,
    pub offset_scale: f64,
}

/// Borrowed view of one populated slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementSpec<'a, V> {
    Button(&'a ButtonSpec<V>),
    Stick(&'a StickSpec<V>),
    Trigger(&'a TriggerSpec<V>),
}

impl<V> ElementSpec<'_, V> {
    pub fn key(&self) -> ElementKey {
        match self {
            ElementSpec::Button(spec) => ElementKey::Button(spec.id),
            ElementSpec::Stick(spec) => ElementKey::Stick(spec.id),
            ElementSpec::Trigger(spec) => ElementKey::Trigger(spec.id),
        }
    }

    pub fn z_index(&self) -> i32 {
        match self {
            ElementSpec::Button(spec) => spec.z_index,
            ElementSpec::Stick(spec) => spec.z_index,
            ElementSpec::Trigger(spec) => spec.z_index,
        }
    }
}

/// How an element reacts to controller state, stripped of its visual
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    Button {
        index: usize,
    },
    Stick {
        horizontal_axis: usize,
        vertical_axis: usize,
        offset_scale: f64,
    },
    Trigger {
        axis: usize,
        offset_scale: f64,
    },
}

/// One entry of the draw list handed to the compositor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    pub key: ElementKey,
    pub z_index: i32,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementTable<V> {
    buttons: Vec<Option<ButtonSpec<V>>>,
    sticks: Vec<Option<StickSpec<V>>>,
    triggers: Vec<Option<TriggerSpec<V>>>,
}

impl<V> Default for ElementTable<V> {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            sticks: Vec::new(),
            triggers: Vec::new(),
        }
    }
}

fn ensure_slot<T>(slots: &mut Vec<Option<T>>, id: usize) -> &mut Option<T> {
    if slots.len() <= id {
        slots.resize_with(id + 1, || None);
    }
    &mut slots[id]
}

impl<V: Copy> ElementTable<V> {
    /// Attaches an idle or pressed visual to button slot `id`.
    ///
    /// A later visual for the same role replaces the earlier one, and a later
    /// explicit `z_index` replaces whatever the slot had.
    pub fn add_button_visual(
        &mut self,
        id: usize,
        role: VisualRole,
        z_index: Option<i32>,
        visual: V,
    ) {
        let slot = ensure_slot(&mut self.buttons, id).get_or_insert_with(|| ButtonSpec {
            id,
            z_index: DEFAULT_BUTTON_Z,
            idle: None,
            pressed: None,
        });
        match role {
            VisualRole::Idle => slot.idle = Some(visual),
            VisualRole::Pressed => slot.pressed = Some(visual),
        }
        if let Some(z_index) = z_index {
            slot.z_index = z_index;
        }
    }

    pub fn set_stick(&mut self, spec: StickSpec<V>) {
        let id = spec.id;
        *ensure_slot(&mut self.sticks, id) = Some(spec);
    }

    pub fn set_trigger(&mut self, spec: TriggerSpec<V>) {
        let id = spec.id;
        *ensure_slot(&mut self.triggers, id) = Some(spec);
    }

    pub fn buttons(&self) -> &[Option<ButtonSpec<V>>] {
        &self.buttons
    }

    pub fn sticks(&self) -> &[Option<StickSpec<V>>] {
        &self.sticks
    }

    pub fn triggers(&self) -> &[Option<TriggerSpec<V>>] {
        &self.triggers
    }

    /// Populated slots: buttons, then sticks, then triggers, each by id
    pub fn iter(&self) -> impl Iterator<Item = ElementSpec<'_, V>> + '_ {
        let buttons = self.buttons.iter().flatten().map(ElementSpec::Button);
        let sticks = self.sticks.iter().flatten().map(ElementSpec::Stick);
        let triggers = self.triggers.iter().flatten().map(ElementSpec::Trigger);
        buttons.chain(sticks).chain(triggers)
    }

    /// Every visual handle together with the slot and role it belongs to
    pub fn visuals(&self) -> Vec<(ElementKey, VisualRole, V)> {
        let mut visuals = Vec::new();
        for element in self.iter() {
            match element {
                ElementSpec::Button(spec) => {
                    if let Some(idle) = spec.idle {
                        visuals.push((element.key(), VisualRole::Idle, idle));
                    }
                    if let Some(pressed) = spec.pressed {
                        visuals.push((element.key(), VisualRole::Pressed, pressed));
                    }
                }
                ElementSpec::Stick(spec) => {
                    visuals.push((element.key(), VisualRole::Idle, spec.visual))
                }
                ElementSpec::Trigger(spec) => {
                    visuals.push((element.key(), VisualRole::Idle, spec.visual))
                }
            }
        }
        visuals
    }

    /// Number of annotated visuals (a button with both variants counts twice)
    pub fn visual_count(&self) -> usize {
        self.visuals().len()
    }

    /// Button slot count and the number of axes any element reads
    pub fn input_counts(&self) -> (usize, usize) {
        let axes = self
            .iter()
            .filter_map(|element| match element {
                ElementSpec::Button(_) => None,
                ElementSpec::Stick(spec) => Some(spec.horizontal_axis.max(spec.vertical_axis) + 1),
                ElementSpec::Trigger(spec) => Some(spec.axis + 1),
            })
            .max()
            .unwrap_or(0);
        (self.buttons.len(), axes)
    }

    pub fn layers(&self) -> Vec<Layer> {
        self.iter()
            .map(|element| Layer {
                key: element.key(),
                z_index: element.z_index(),
                binding: match element {
                    ElementSpec::Button(spec) => Binding::Button { index: spec.id },
                    ElementSpec::Stick(spec) => Binding::Stick {
                        horizontal_axis: spec.horizontal_axis,
                        vertical_axis: spec.vertical_axis,
                        offset_scale: spec.offset_scale,
                    },
                    ElementSpec::Trigger(spec) => Binding::Trigger {
                        axis: spec.axis,
                        offset_scale: spec.offset_scale,
                    },
                },
            })
            .collect()
    }
}
