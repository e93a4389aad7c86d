//! Rendering and interaction core for the shared tabletop surface.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! canvas side of a tabletop session: translating raw pointer/wheel input into
//! viewport changes and scene mutations, generating the square or hex grid,
//! hit-testing tokens and text, and painting the layered scene. The host
//! JavaScript layer only wires DOM events to the engine and persists the
//! commits carried by the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`scene`] | In-memory scene store: background, tokens, text, selection |
//! | [`viewport`] | Pan/zoom viewport and coordinate conversions |
//! | [`grid`] | Square and hexagonal grid generation, hex cell cache |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against tokens and text annotations |
//! | [`render`] | Layered scene rendering onto a [`surface::Surface`] |
//! | [`surface`] | Drawing-surface port and a recording implementation |
//! | [`web`] | `CanvasRenderingContext2d` surface and image loading |
//! | [`config`] | Host-supplied tunables |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants (zoom limits, screen-pixel sizes, etc.) |

pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod grid;
pub mod hit;
pub mod input;
pub mod render;
pub mod scene;
pub mod surface;
pub mod viewport;
pub mod web;
