//! Skin document loader
//!
//! Reads an annotated SVG file and extracts the element table from it. The
//! recognized annotations are plain attributes on ordinary SVG nodes:
//!
//! | Attribute | Meaning |
//! |---|---|
//! | `button-id`, `button-state` | button slot; `pressed` marks the pressed visual |
//! | `stick-id`, `axis-h`, `axis-v`, `offset-scale` | stick slot and the axes that move it |
//! | `trigger-id`, `trigger-axis`, `offset-scale` | trigger slot and its axis |
//! | `z-index` | draw order relative to the static artwork |
//!
//! A node named `info` carries the `device-name` the skin is made for.
//!
//! Loading is all-or-nothing: the first malformed value aborts it.

use super::elements::{
    ElementTable, StickSpec, TriggerSpec, VisualRole, DEFAULT_STICK_Z, DEFAULT_TRIGGER_Z,
    MAX_SLOT_ID,
};
use super::error::SkinError;
use super::source::{NodeId, SourceTree};
use kurbo::Size;
use resvg::usvg;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// A parsed vector skin: markup, element table and document metadata
#[derive(Debug)]
pub struct SkinDocument {
    path: PathBuf,
    source: SourceTree,
    elements: ElementTable<NodeId>,
    size: Size,
    device_name: Option<String>,
}

impl SkinDocument {
    /// Reads and parses the skin at `path`
    pub fn load(path: &Path) -> Result<Self, SkinError> {
        info!("Loading vector skin from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| SkinError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = Self::parse(&text)?;
        document.path = path.to_path_buf();
        Ok(document)
    }

    /// Parses skin markup that did not come from a file
    pub fn parse(text: &str) -> Result<Self, SkinError> {
        let source = SourceTree::parse(text)?;
        let (elements, device_name) = collect_elements(&source)?;

        // A full usvg pass rejects structurally invalid documents up front and
        // resolves the declared size (width/height or viewBox).
        let tree = usvg::Tree::from_str(&source.to_svg_string(), &usvg::Options::default())?;
        let declared = tree.size();
        let size = Size::new(f64::from(declared.width()), f64::from(declared.height()));
        if !(size.width > 0.0 && size.height > 0.0) {
            return Err(SkinError::DegenerateSize {
                width: size.width,
                height: size.height,
            });
        }

        let (buttons, axes) = elements.input_counts();
        info!(
            "Parsed skin: {} visuals, {} button slots, {} axes, size {}x{}, device {:?}",
            elements.visual_count(),
            buttons,
            axes,
            size.width,
            size.height,
            device_name
        );

        Ok(Self {
            path: PathBuf::new(),
            source,
            elements,
            size,
            device_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &SourceTree {
        &self.source
    }

    pub fn elements(&self) -> &ElementTable<NodeId> {
        &self.elements
    }

    /// Declared size of the artwork in skin units
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

fn collect_elements(
    source: &SourceTree,
) -> Result<(ElementTable<NodeId>, Option<String>), SkinError> {
    let mut elements = ElementTable::default();
    let mut device_name = None;

    // The document element itself is never an annotation target
    for node in source.ids().skip(1) {
        let Some(name) = source.name(node) else {
            continue;
        };

        if name == "info" {
            let device = required::<String>(source, node, "device-name")?;
            debug!("Skin bound to device {:?}", device);
            device_name = Some(device);
        }

        if let Some(id) = slot_id(source, node, "button-id")? {
            let role = if source.attribute(node, "button-state") == Some("pressed") {
                VisualRole::Pressed
            } else {
                VisualRole::Idle
            };
            let z_index = optional::<i32>(source, node, "z-index")?;
            debug!("Button {} ({:?}) at node {:?}", id, role, node);
            elements.add_button_visual(id, role, z_index, node);
        } else if let Some(id) = slot_id(source, node, "stick-id")? {
            let spec = StickSpec {
                id,
                z_index: optional(source, node, "z-index")?.unwrap_or(DEFAULT_STICK_Z),
                visual: node,
                horizontal_axis: required(source, node, "axis-h")?,
                vertical_axis: required(source, node, "axis-v")?,
                offset_scale: required(source, node, "offset-scale")?,
            };
            debug!("Stick {:?}", spec);
            elements.set_stick(spec);
        } else if let Some(id) = slot_id(source, node, "trigger-id")? {
            let spec = TriggerSpec {
                id,
                z_index: optional(source, node, "z-index")?.unwrap_or(DEFAULT_TRIGGER_Z),
                visual: node,
                axis: required(source, node, "trigger-axis")?,
                offset_scale: required(source, node, "offset-scale")?,
            };
            debug!("Trigger {:?}", spec);
            elements.set_trigger(spec);
        }
    }

    Ok((elements, device_name))
}

fn optional<T: FromStr>(
    source: &SourceTree,
    node: NodeId,
    attribute: &'static str,
) -> Result<Option<T>, SkinError> {
    let Some(value) = source.attribute(node, attribute) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| SkinError::InvalidAttribute {
            element: source.name(node).unwrap_or_default().to_owned(),
            attribute,
            value: value.to_owned(),
        })
}

/// A slot id, rejected above [`MAX_SLOT_ID`]
fn slot_id(
    source: &SourceTree,
    node: NodeId,
    attribute: &'static str,
) -> Result<Option<usize>, SkinError> {
    match optional::<usize>(source, node, attribute)? {
        Some(id) if id > MAX_SLOT_ID => Err(SkinError::InvalidAttribute {
            element: source.name(node).unwrap_or_default().to_owned(),
            attribute,
            value: id.to_string(),
        }),
        id => Ok(id),
    }
}

fn required<T: FromStr>(
    source: &SourceTree,
    node: NodeId,
    attribute: &'static str,
) -> Result<T, SkinError> {
    optional(source, node, attribute)?.ok_or_else(|| SkinError::MissingAttribute {
        element: source.name(node).unwrap_or_default().to_owned(),
        attribute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::fixtures::PAD;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_elements_and_metadata_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PAD.as_bytes()).unwrap();

        let document = SkinDocument::load(file.path()).unwrap();
        assert_eq!(document.path(), file.path());
        assert_eq!(document.size(), Size::new(100.0, 50.0));
        assert_eq!(document.device_name(), Some("Test Pad"));

        let elements = document.elements();
        // seven attribute-tagged nodes, seven visuals
        assert_eq!(elements.visual_count(), 7);
        assert_eq!(elements.buttons().len(), 6);
        assert!(elements.buttons()[1].is_none());
        assert!(elements.buttons()[4].is_none());
        assert!(elements.buttons()[0].as_ref().unwrap().has_pressed_variant());
        assert_eq!(elements.buttons()[3].as_ref().unwrap().z_index, -2);

        let stick = elements.sticks()[0].as_ref().unwrap();
        assert_eq!((stick.horizontal_axis, stick.vertical_axis), (0, 1));
        assert_eq!(stick.offset_scale, 10.0);
        assert_eq!(stick.z_index, DEFAULT_STICK_Z);

        assert_eq!(elements.triggers().len(), 2);
        let trigger = elements.triggers()[1].as_ref().unwrap();
        assert_eq!(trigger.axis, 4);
        assert_eq!(trigger.z_index, DEFAULT_TRIGGER_Z);
    }

    #[test]
    fn malformed_numbers_fail_the_whole_load() {
        let broken = PAD.replace("axis-h=\"0\"", "axis-h=\"left\"");
        match SkinDocument::parse(&broken) {
            Err(SkinError::InvalidAttribute {
                attribute, value, ..
            }) => {
                assert_eq!(attribute, "axis-h");
                assert_eq!(value, "left");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn oversized_slot_ids_fail_the_load() {
        for tagged in ["button-id=\"3\"", "stick-id=\"0\"", "trigger-id=\"1\""] {
            let name = tagged.split('=').next().unwrap();
            let broken = PAD.replace(tagged, &format!("{name}=\"4000000000\""));
            assert!(
                matches!(
                    SkinDocument::parse(&broken),
                    Err(SkinError::InvalidAttribute { attribute, .. }) if attribute == name
                ),
                "{name} was accepted"
            );
        }

        let highest = PAD.replace("button-id=\"5\"", &format!("button-id=\"{MAX_SLOT_ID}\""));
        let document = SkinDocument::parse(&highest).unwrap();
        assert_eq!(document.elements().buttons().len(), MAX_SLOT_ID + 1);
    }

    #[test]
    fn missing_stick_attribute_fails() {
        let broken = PAD.replace(" offset-scale=\"10\"", "");
        assert!(matches!(
            SkinDocument::parse(&broken),
            Err(SkinError::MissingAttribute {
                attribute: "offset-scale",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SkinDocument::load(&dir.path().join("absent.svg"));
        assert!(matches!(result, Err(SkinError::Io { .. })));
    }

    #[test]
    fn structurally_invalid_svg_fails() {
        assert!(SkinDocument::parse("<svg xmlns=\"http://www.w3.org/2000/svg\"><g>").is_err());
        assert!(SkinDocument::parse("<html><body/></html>").is_err());
    }

    #[test]
    fn skin_without_info_has_no_device() {
        let anonymous = PAD.replace("<info device-name=\"Test Pad\"/>", "");
        let document = SkinDocument::parse(&anonymous).unwrap();
        assert_eq!(document.device_name(), None);
    }
}
