//! padskin: a live game-controller overlay driven by annotated skins
//!
//! [`skin`] is the engine (loading, rasterizing, compositing, hit testing).
//! [`controller`] produces the input snapshots it draws, [`timing`] paces
//! frames and coalesces rebuilds, [`context`] ties a skin to its settings and
//! device, and [`ui`] is the eframe viewer around all of it.

pub mod config;
pub mod context;
pub mod controller;
pub mod skin;
pub mod timing;
pub mod ui;
