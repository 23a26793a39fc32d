//! Skin markup shared by the engine tests

/// 100x50 pad: buttons 0 (idle+pressed), 2, 3 (z -2) and 5 (pressed only),
/// stick 0 on axes 0/1, trigger 1 on axis 4.
pub(crate) const PAD: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50">
  <info device-name="Test Pad"/>
  <rect width="100" height="50" fill="#202020"/>
  <g id="buttons">
    <circle button-id="0" cx="10" cy="10" r="4" fill="#ffffff"/>
    <circle button-id="0" button-state="pressed" cx="10" cy="10" r="4" fill="#ff0000"/>
    <circle button-id="2" cx="20" cy="10" r="4" fill="#ffffff"/>
    <circle button-id="3" z-index="-2" cx="30" cy="10" r="4" fill="#ffffff"/>
    <circle button-id="5" button-state="pressed" cx="40" cy="10" r="4" fill="#00ff00"/>
  </g>
  <circle stick-id="0" axis-h="0" axis-v="1" offset-scale="10" cx="70" cy="30" r="8" fill="#888888"/>
  <rect trigger-id="1" trigger-axis="4" offset-scale="5" x="80" y="2" width="10" height="6" fill="#444444"/>
</svg>"##;
