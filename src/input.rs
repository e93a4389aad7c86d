//! Input model: pointer buttons, input events, and the gesture state machine.
//!
//! The state machine is a pure function, [`transition`]: it reads the
//! viewport and scene, and returns the next [`InputState`] together with a
//! list of [`Effect`]s. It never mutates anything itself; the engine applies
//! the effects in order. This keeps every gesture testable without a canvas.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::config::TableConfig;
use crate::hit;
use crate::scene::{EntityRef, SceneStore};
use crate::surface::TextMeasure;
use crate::viewport::{Point, Viewport};

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button. Selects and drags entities.
    Primary,
    /// Middle mouse button. Ignored.
    Middle,
    /// Right mouse button. Pans the view.
    Secondary,
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down, zooms out).
    pub dy: f64,
}

/// A raw input event in screen space (CSS pixels relative to the canvas).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { screen: Point, button: Button },
    PointerMove { screen: Point },
    PointerUp { screen: Point, button: Button },
    Wheel { screen: Point, delta: WheelDelta },
    /// The pointer left the canvas; any gesture is abandoned.
    PointerLeave,
}

/// Cursor shape requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grabbing,
    Move,
}

impl Cursor {
    /// CSS `cursor` value.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grabbing => "grabbing",
            Self::Move => "move",
        }
    }
}

/// The gesture in progress between a press and its release.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next press.
    #[default]
    Idle,
    /// Secondary-button drag moving the view.
    Panning {
        /// Screen position of the previous pointer event, used to compute the pan delta.
        last_screen: Point,
    },
    /// Primary-button drag moving an entity.
    DraggingEntity {
        target: EntityRef,
        /// Pointer world position minus entity origin at grab time. Keeps the
        /// entity anchored at the grab point rather than snapping its origin
        /// to the pointer.
        grab_offset: Point,
        /// Whether any move happened since the press.
        moved: bool,
    },
}

impl InputState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Panning { .. } => "panning",
            Self::DraggingEntity { .. } => "dragging_entity",
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A side effect requested by a transition, applied by the engine in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Shift the viewport by a screen-space delta.
    PanBy(Point),
    /// Anchor-preserving zoom at a screen point.
    ZoomAt { anchor: Point, factor: f64 },
    /// Replace the selection.
    Select(Option<EntityRef>),
    /// Local-only move of an entity origin to a world position.
    MoveEntity { target: EntityRef, position: Point },
    /// Report the entity's final position to the persistence collaborator.
    CommitMove { target: EntityRef },
    SetCursor(Cursor),
    RenderNeeded,
}

/// Read-only view of everything a transition may consult.
pub struct InputContext<'a, M: TextMeasure + ?Sized> {
    pub viewport: &'a Viewport,
    pub scene: &'a SceneStore,
    pub config: &'a TableConfig,
    /// Used to size text annotations for hit-testing.
    pub measure: &'a M,
}

/// Advance the state machine by one event.
pub fn transition<M: TextMeasure + ?Sized>(
    state: InputState,
    event: InputEvent,
    ctx: &InputContext<'_, M>,
) -> (InputState, Vec<Effect>) {
    let (next, effects) = step(state, event, ctx);
    if next.name() != state.name() {
        tracing::trace!(from = state.name(), to = next.name(), "input state transition");
    }
    (next, effects)
}

fn step<M: TextMeasure + ?Sized>(
    state: InputState,
    event: InputEvent,
    ctx: &InputContext<'_, M>,
) -> (InputState, Vec<Effect>) {
    match (state, event) {
        // --- Press ---
        (InputState::Idle, InputEvent::PointerDown { screen, button: Button::Secondary }) => {
            (InputState::Panning { last_screen: screen }, vec![Effect::SetCursor(Cursor::Grabbing)])
        }
        (InputState::Idle, InputEvent::PointerDown { screen, button: Button::Primary }) => press_primary(screen, ctx),
        (_, InputEvent::PointerDown { .. }) => (state, Vec::new()),

        // --- Move ---
        (InputState::Panning { last_screen }, InputEvent::PointerMove { screen }) => {
            let delta = Point::new(screen.x - last_screen.x, screen.y - last_screen.y);
            (InputState::Panning { last_screen: screen }, vec![Effect::PanBy(delta), Effect::RenderNeeded])
        }
        (InputState::DraggingEntity { target, grab_offset, .. }, InputEvent::PointerMove { screen }) => {
            let world = ctx.viewport.screen_to_world(screen);
            let position = Point::new(world.x - grab_offset.x, world.y - grab_offset.y);
            (
                InputState::DraggingEntity { target, grab_offset, moved: true },
                vec![Effect::MoveEntity { target, position }, Effect::RenderNeeded],
            )
        }
        (InputState::Idle, InputEvent::PointerMove { .. }) => (state, Vec::new()),

        // --- Release ---
        (InputState::Panning { .. }, InputEvent::PointerUp { button: Button::Secondary, .. }) => {
            (InputState::Idle, vec![Effect::SetCursor(Cursor::Default)])
        }
        (InputState::DraggingEntity { target, moved, .. }, InputEvent::PointerUp { button: Button::Primary, .. }) => {
            let mut effects = Vec::with_capacity(2);
            if moved {
                effects.push(Effect::CommitMove { target });
            }
            effects.push(Effect::SetCursor(Cursor::Default));
            (InputState::Idle, effects)
        }
        (_, InputEvent::PointerUp { .. }) => (state, Vec::new()),

        // --- Wheel ---
        (InputState::DraggingEntity { .. }, InputEvent::Wheel { .. }) => (state, Vec::new()),
        (_, InputEvent::Wheel { screen, delta }) => {
            let factor = if delta.dy < 0.0 {
                ctx.config.wheel_zoom_in
            } else if delta.dy > 0.0 {
                ctx.config.wheel_zoom_out
            } else {
                return (state, Vec::new());
            };
            // The old pan anchor is stale after a zoom.
            let next = match state {
                InputState::Panning { .. } => InputState::Panning { last_screen: screen },
                other => other,
            };
            (next, vec![Effect::ZoomAt { anchor: screen, factor }, Effect::RenderNeeded])
        }

        // --- Leave ---
        (InputState::Idle, InputEvent::PointerLeave) => (state, Vec::new()),
        (_, InputEvent::PointerLeave) => (InputState::Idle, vec![Effect::SetCursor(Cursor::Default)]),
    }
}

fn press_primary<M: TextMeasure + ?Sized>(screen: Point, ctx: &InputContext<'_, M>) -> (InputState, Vec<Effect>) {
    let world = ctx.viewport.screen_to_world(screen);
    let style = ctx.config.text_style();
    match hit::hit_test(world, ctx.scene, ctx.viewport.zoom(), &style, ctx.measure) {
        Some(hit) => {
            let grab_offset = Point::new(world.x - hit.origin.x, world.y - hit.origin.y);
            (
                InputState::DraggingEntity { target: hit.target, grab_offset, moved: false },
                vec![Effect::Select(Some(hit.target)), Effect::SetCursor(Cursor::Move), Effect::RenderNeeded],
            )
        }
        None => (InputState::Idle, vec![Effect::Select(None), Effect::RenderNeeded]),
    }
}
