use web_sys::HtmlCanvasElement;

use serde::Serialize;

use crate::config::TableConfig;
use crate::error::{ConfigError, EngineError, SnapshotError, SurfaceError};
use crate::grid::GridConfig;
use crate::input::{self, Button, Effect, InputContext, InputEvent, InputState, WheelDelta};
use crate::render::{Frame, Renderer};
use crate::scene::{AssetRef, Entity, EntityPatch, EntityRef, NewText, NewToken, SceneSnapshot, SceneStore};
use crate::surface::{Surface, TextMeasure};
use crate::viewport::{Point, Viewport};
use crate::web::WebSurface;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Why a commit was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "lowercase")]
pub enum CommitReason {
    /// A drag ended after moving the entity.
    Moved(EntityRef),
    Added(EntityRef),
    /// The editor panel changed fields of the selected entity.
    Updated(EntityRef),
    Deleted(EntityRef),
}

/// The full scene after a local change, for the host to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub reason: CommitReason,
    pub snapshot: SceneSnapshot,
}

/// Actions returned from engine calls for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The scene or view changed; schedule a redraw.
    RenderNeeded,
    /// Persist this snapshot.
    Commit(Commit),
    /// The selection changed; carries a copy of the newly selected entity.
    SelectionChanged(Option<Entity>),
    /// CSS cursor value for the canvas element.
    SetCursor(String),
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug)]
pub struct EngineCore {
    pub scene: SceneStore,
    pub viewport: Viewport,
    pub grid: GridConfig,
    pub input: InputState,
    pub renderer: Renderer,
    pub config: TableConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::from_valid(TableConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine using `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `config` fails
    /// [`TableConfig::validate`].
    pub fn with_config(config: TableConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: TableConfig) -> Self {
        Self {
            scene: SceneStore::new(),
            viewport: Viewport::with_bounds(config.min_zoom, config.max_zoom),
            grid: GridConfig::default(),
            input: InputState::default(),
            renderer: Renderer::new(),
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }

    // --- Surface ---

    /// Record the canvas size in CSS pixels and the device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Action {
        self.viewport_width = width_css.max(0.0);
        self.viewport_height = height_css.max(0.0);
        self.dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        Action::RenderNeeded
    }

    /// Replace the grid settings from the host's controls.
    pub fn set_grid(&mut self, grid: GridConfig) -> Action {
        self.grid = grid;
        Action::RenderNeeded
    }

    // --- Scene inputs ---

    /// Set or clear the background map.
    pub fn set_background(&mut self, background: Option<AssetRef>) -> Action {
        self.scene.set_background(background);
        self.renderer.retain_assets(&self.scene.referenced_assets());
        Action::RenderNeeded
    }

    /// Add a token at the world-space center of the current view.
    pub fn add_token(&mut self, data: NewToken) -> Vec<Action> {
        let at = self.view_center();
        let id = self.scene.add_token(data, at, self.config.token_radius).id;
        vec![self.commit(CommitReason::Added(EntityRef::Token(id))), Action::RenderNeeded]
    }

    /// Add a text annotation at the world-space center of the current view.
    pub fn add_text(&mut self, data: NewText) -> Vec<Action> {
        let at = self.view_center();
        let id = self.scene.add_text(data, at).id;
        vec![self.commit(CommitReason::Added(EntityRef::Text(id))), Action::RenderNeeded]
    }

    /// Merge editor-panel fields into the selected entity. No-op without a
    /// selection.
    pub fn update_selected(&mut self, patch: &EntityPatch) -> Vec<Action> {
        let Some(selected) = self.scene.selection() else {
            return Vec::new();
        };
        if !self.scene.update_selected(patch) {
            return Vec::new();
        }
        vec![self.commit(CommitReason::Updated(selected)), Action::RenderNeeded]
    }

    /// Delete the selected entity. The `SelectionChanged(None)` action is the
    /// "nothing selected now" signal; without a selection nothing is returned.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(removed) = self.scene.delete_selected() else {
            return Vec::new();
        };
        let target = removed.entity_ref();
        self.abandon_drag_of(target);
        vec![
            self.commit(CommitReason::Deleted(target)),
            Action::SelectionChanged(None),
            Action::RenderNeeded,
        ]
    }

    /// Replace the scene with a snapshot pushed by the sync layer.
    pub fn replace_all(&mut self, snapshot: SceneSnapshot) -> Vec<Action> {
        let mut actions = Vec::with_capacity(2);
        if self.scene.replace_all(snapshot) {
            actions.push(Action::SelectionChanged(None));
        }
        self.renderer.retain_assets(&self.scene.referenced_assets());
        if let InputState::DraggingEntity { target, .. } = self.input {
            if !self.scene.contains(target) {
                self.input = InputState::Idle;
                actions.push(Action::SetCursor(input::Cursor::Default.as_css().to_owned()));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// [`EngineCore::replace_all`] from the snapshot's JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if `raw` is not a valid snapshot; the
    /// scene is left untouched.
    pub fn replace_all_json(&mut self, raw: &str) -> Result<Vec<Action>, SnapshotError> {
        let snapshot = SceneSnapshot::from_json(raw)?;
        Ok(self.replace_all(snapshot))
    }

    /// Drop images `surface` holds for assets the scene no longer uses.
    pub fn release_unused_images<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.retain_images(&self.scene.referenced_assets());
    }

    // --- Input ---

    /// Run one input event through the state machine and apply its effects.
    pub fn handle_event<M: TextMeasure + ?Sized>(&mut self, event: InputEvent, measure: &M) -> Vec<Action> {
        let ctx = InputContext { viewport: &self.viewport, scene: &self.scene, config: &self.config, measure };
        let (next, effects) = input::transition(self.input, event, &ctx);
        self.input = next;

        let mut actions = Vec::new();
        let mut render = false;
        for effect in effects {
            match effect {
                Effect::PanBy(delta) => self.viewport.pan_by(delta),
                Effect::ZoomAt { anchor, factor } => self.viewport.zoom_at(anchor, factor),
                Effect::Select(target) => {
                    if self.scene.select(target) {
                        actions.push(Action::SelectionChanged(self.scene.selected_entity()));
                    }
                }
                Effect::MoveEntity { target, position } => {
                    self.scene.set_position(target, position);
                }
                Effect::CommitMove { target } => {
                    if self.scene.contains(target) {
                        actions.push(self.commit(CommitReason::Moved(target)));
                    }
                }
                Effect::SetCursor(cursor) => actions.push(Action::SetCursor(cursor.as_css().to_owned())),
                Effect::RenderNeeded => render = true,
            }
        }
        if render {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // --- Render ---

    /// Draw the current state onto `surface`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any surface call fails.
    pub fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        let frame = Frame {
            scene: &self.scene,
            viewport: &self.viewport,
            grid: &self.grid,
            config: &self.config,
            width: self.viewport_width,
            height: self.viewport_height,
            dpr: self.dpr,
        };
        self.renderer.draw(surface, &frame)
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Option<EntityRef> {
        self.scene.selection()
    }

    #[must_use]
    pub fn selected_entity(&self) -> Option<Entity> {
        self.scene.selected_entity()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.scene.snapshot()
    }

    fn view_center(&self) -> Point {
        self.viewport.world_center(self.viewport_width, self.viewport_height)
    }

    fn abandon_drag_of(&mut self, target: EntityRef) {
        if matches!(self.input, InputState::DraggingEntity { target: t, .. } if t == target) {
            self.input = InputState::Idle;
        }
    }

    fn commit(&self, reason: CommitReason) -> Action {
        let snapshot = self.scene.snapshot();
        tracing::debug!(
            reason = ?reason,
            tokens = snapshot.tokens.len(),
            texts = snapshot.text_annotations.len(),
            "scene commit"
        );
        Action::Commit(Commit { reason, snapshot })
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    surface: WebSurface,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ContextUnavailable`] if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let surface = WebSurface::for_canvas(&canvas)?;
        Ok(Self { canvas, surface, core: EngineCore::new() })
    }

    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for an invalid `config`, or
    /// [`EngineError::Surface`] if the canvas has no 2D context.
    pub fn with_config(canvas: HtmlCanvasElement, config: TableConfig) -> Result<Self, EngineError> {
        let core = EngineCore::with_config(config)?;
        let surface = WebSurface::for_canvas(&canvas)?;
        Ok(Self { canvas, surface, core })
    }

    /// Register a JS function called when an image asset finishes loading
    /// (or fails), so the host can schedule a redraw.
    pub fn set_on_asset_settled(&mut self, callback: Option<js_sys::Function>) {
        self.surface.set_on_settled(callback);
    }

    // --- Viewport ---

    /// Update viewport dimensions and device pixel ratio, resizing the
    /// canvas backing store to match.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Action {
        let action = self.core.set_viewport(width_css, height_css, dpr);
        self.canvas.set_width((self.core.viewport_width * self.core.dpr).round() as u32);
        self.canvas.set_height((self.core.viewport_height * self.core.dpr).round() as u32);
        action
    }

    pub fn set_grid(&mut self, grid: GridConfig) -> Action {
        self.core.set_grid(grid)
    }

    // --- Delegated scene inputs ---

    pub fn set_background(&mut self, background: Option<AssetRef>) -> Action {
        let action = self.core.set_background(background);
        self.core.release_unused_images(&mut self.surface);
        action
    }

    pub fn add_token(&mut self, data: NewToken) -> Vec<Action> {
        self.core.add_token(data)
    }

    pub fn add_text(&mut self, data: NewText) -> Vec<Action> {
        self.core.add_text(data)
    }

    pub fn update_selected(&mut self, patch: &EntityPatch) -> Vec<Action> {
        self.core.update_selected(patch)
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        self.core.delete_selected()
    }

    pub fn replace_all(&mut self, snapshot: SceneSnapshot) -> Vec<Action> {
        let actions = self.core.replace_all(snapshot);
        self.core.release_unused_images(&mut self.surface);
        actions
    }

    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if `raw` is not a valid snapshot.
    pub fn replace_all_json(&mut self, raw: &str) -> Result<Vec<Action>, SnapshotError> {
        let snapshot = SceneSnapshot::from_json(raw)?;
        Ok(self.replace_all(snapshot))
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button) -> Vec<Action> {
        self.core.handle_event(InputEvent::PointerDown { screen, button }, &self.surface)
    }

    pub fn on_pointer_move(&mut self, screen: Point) -> Vec<Action> {
        self.core.handle_event(InputEvent::PointerMove { screen }, &self.surface)
    }

    pub fn on_pointer_up(&mut self, screen: Point, button: Button) -> Vec<Action> {
        self.core.handle_event(InputEvent::PointerUp { screen, button }, &self.surface)
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Action> {
        self.core.handle_event(InputEvent::Wheel { screen, delta }, &self.surface)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.core.handle_event(InputEvent::PointerLeave, &self.surface)
    }

    /// Whether the host should suppress the browser context menu. Secondary
    /// drag pans, so it always should.
    #[must_use]
    pub fn on_context_menu(&self) -> bool {
        true
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        self.core.draw(&mut self.surface)
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<EntityRef> {
        self.core.selection()
    }

    #[must_use]
    pub fn selected_entity(&self) -> Option<Entity> {
        self.core.selected_entity()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.core.viewport()
    }

    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.core.snapshot()
    }
}
