//! Scene model: tokens, text annotations, the background reference, and the
//! in-memory store that owns them.
//!
//! Tokens and text live in two ordered layers. Append order is draw order,
//! so the last entity in a layer is the topmost one for hit-testing. The store
//! also owns the single selection and keeps it pointing at a live entity:
//! every removal path clears it in the same call.
//!
//! Data enters this layer from the sync collaborator (a [`SceneSnapshot`]
//! passed to [`SceneStore::replace_all`]) and from the input engine (adds,
//! patches, drag moves). The renderer only reads it.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::cell::Cell;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{DEFAULT_TEXT_CONTENT, DEFAULT_TOKEN_NAME};
use crate::error::SnapshotError;
use crate::viewport::Point;

/// Unique identifier for a scene entity.
pub type EntityId = Uuid;

/// Opaque handle to an uploaded image (usually a URL). The core never
/// uploads; it only loads what the host hands it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a token is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Filled circle with a name label underneath.
    #[default]
    Shape,
    /// Bitmap sprite from `image`, centered on the token position.
    Image,
}

/// A movable token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: EntityId,
    /// Center in world coordinates.
    pub x: f64,
    pub y: f64,
    /// Radius in world units; also half the sprite side for image tokens.
    pub radius: f64,
    /// CSS color string.
    #[serde(default)]
    pub color: String,
    #[serde(default, alias = "displayName")]
    pub name: String,
    #[serde(default, rename = "renderKind")]
    pub kind: TokenKind,
    #[serde(default, rename = "imageRef", skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetRef>,
}

impl Token {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Inputs a text-bounds measurement depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBoundsKey {
    zoom: u64,
    font_px: u64,
}

impl TextBoundsKey {
    /// `font_px` is the screen-pixel font size before zoom compensation.
    #[must_use]
    pub fn new(zoom: f64, font_px: f64) -> Self {
        Self { zoom: zoom.to_bits(), font_px: font_px.to_bits() }
    }
}

/// World-space width/height of a text annotation, valid only for `key`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedBounds {
    pub key: TextBoundsKey,
    pub width: f64,
    pub height: f64,
}

/// A free text annotation. `x`/`y` is the top-left corner of the text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub content: String,
    /// Filled lazily by hit-testing and drawing; never serialized.
    #[serde(skip)]
    cached_bounds: Cell<Option<CachedBounds>>,
}

impl PartialEq for TextAnnotation {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.x == other.x && self.y == other.y && self.content == other.content
    }
}

impl TextAnnotation {
    #[must_use]
    pub fn new(id: EntityId, x: f64, y: f64, content: impl Into<String>) -> Self {
        Self { id, x, y, content: content.into(), cached_bounds: Cell::new(None) }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Cached `(width, height)` if it was measured under `key`.
    #[must_use]
    pub fn cached_bounds(&self, key: TextBoundsKey) -> Option<(f64, f64)> {
        self.cached_bounds
            .get()
            .filter(|c| c.key == key)
            .map(|c| (c.width, c.height))
    }

    pub fn store_bounds(&self, key: TextBoundsKey, width: f64, height: f64) {
        self.cached_bounds.set(Some(CachedBounds { key, width, height }));
    }

    pub fn invalidate_bounds(&self) {
        self.cached_bounds.set(None);
    }
}

/// Reference to an entity in one of the two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    Token(EntityId),
    Text(EntityId),
}

impl EntityRef {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Token(id) | Self::Text(id) => *id,
        }
    }
}

/// An owned copy of a scene entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Token(Token),
    Text(TextAnnotation),
}

impl Entity {
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Token(t) => EntityRef::Token(t.id),
            Self::Text(t) => EntityRef::Text(t.id),
        }
    }
}

/// Host-supplied fields for a new token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewToken {
    pub name: String,
    pub color: String,
    /// Sprite for an image token; a shape token is created when absent.
    pub image: Option<AssetRef>,
    /// Radius override; the engine's configured default is used when absent.
    pub radius: Option<f64>,
}

/// Host-supplied fields for a new text annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewText {
    pub content: String,
}

/// Sparse update for the selected entity. Only present fields are applied,
/// and only those that exist on the entity's kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Token only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Token only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Token only; ignored unless finite and positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Token only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
    /// Token only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<AssetRef>,
    /// Text only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Full scene state as exchanged with the sync collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    #[serde(default, rename = "backgroundRef")]
    pub background: Option<AssetRef>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
}

impl SceneSnapshot {
    /// Parse a snapshot pushed by the sync layer.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if `raw` is not a valid snapshot.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// In-memory store of the layered scene.
#[derive(Debug, Default)]
pub struct SceneStore {
    background: Option<AssetRef>,
    tokens: Vec<Token>,
    texts: Vec<TextAnnotation>,
    selection: Option<EntityRef>,
}

impl SceneStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Reads ---

    #[must_use]
    pub fn background(&self) -> Option<&AssetRef> {
        self.background.as_ref()
    }

    /// Tokens in draw order (bottom first).
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Text annotations in draw order (bottom first).
    #[must_use]
    pub fn texts(&self) -> &[TextAnnotation] {
        &self.texts
    }

    #[must_use]
    pub fn selection(&self) -> Option<EntityRef> {
        self.selection
    }

    #[must_use]
    pub fn token(&self, id: &EntityId) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == *id)
    }

    #[must_use]
    pub fn text(&self, id: &EntityId) -> Option<&TextAnnotation> {
        self.texts.iter().find(|t| t.id == *id)
    }

    #[must_use]
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Token(id) => self.token(&id).is_some(),
            EntityRef::Text(id) => self.text(&id).is_some(),
        }
    }

    /// An owned copy of the referenced entity.
    #[must_use]
    pub fn entity(&self, entity: EntityRef) -> Option<Entity> {
        match entity {
            EntityRef::Token(id) => self.token(&id).cloned().map(Entity::Token),
            EntityRef::Text(id) => self.text(&id).cloned().map(Entity::Text),
        }
    }

    /// An owned copy of the selected entity, if any.
    #[must_use]
    pub fn selected_entity(&self) -> Option<Entity> {
        self.selection.and_then(|s| self.entity(s))
    }

    #[must_use]
    pub fn position(&self, entity: EntityRef) -> Option<Point> {
        match entity {
            EntityRef::Token(id) => self.token(&id).map(Token::position),
            EntityRef::Text(id) => self.text(&id).map(TextAnnotation::position),
        }
    }

    /// Total number of entities across both layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len() + self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.texts.is_empty()
    }

    /// Copy the current scene for persistence.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            background: self.background.clone(),
            tokens: self.tokens.clone(),
            text_annotations: self.texts.clone(),
        }
    }

    /// Assets the scene draws: the background and every token sprite.
    #[must_use]
    pub fn referenced_assets(&self) -> HashSet<AssetRef> {
        self.background
            .iter()
            .chain(self.tokens.iter().filter_map(|t| t.image.as_ref()))
            .cloned()
            .collect()
    }

    // --- Mutations ---

    pub fn set_background(&mut self, background: Option<AssetRef>) {
        self.background = background;
    }

    /// Set the selection. A reference to a missing entity clears it.
    /// Returns `true` if the selection changed.
    pub fn select(&mut self, entity: Option<EntityRef>) -> bool {
        let next = entity.filter(|e| self.contains(*e));
        let changed = next != self.selection;
        self.selection = next;
        changed
    }

    /// Append a token centered at `at` with a fresh id. Blank names fall back
    /// to a default; `default_radius` is used unless the input overrides it.
    pub fn add_token(&mut self, data: NewToken, at: Point, default_radius: f64) -> &Token {
        let radius = data
            .radius
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(default_radius);
        let name = if data.name.trim().is_empty() {
            DEFAULT_TOKEN_NAME.to_owned()
        } else {
            data.name
        };
        let kind = if data.image.is_some() { TokenKind::Image } else { TokenKind::Shape };
        let index = self.tokens.len();
        self.tokens.push(Token {
            id: Uuid::new_v4(),
            x: at.x,
            y: at.y,
            radius,
            color: data.color,
            name,
            kind,
            image: data.image,
        });
        &self.tokens[index]
    }

    /// Append a text annotation anchored at `at` with a fresh id.
    pub fn add_text(&mut self, data: NewText, at: Point) -> &TextAnnotation {
        let content = if data.content.is_empty() {
            DEFAULT_TEXT_CONTENT.to_owned()
        } else {
            data.content
        };
        let index = self.texts.len();
        self.texts.push(TextAnnotation::new(Uuid::new_v4(), at.x, at.y, content));
        &self.texts[index]
    }

    /// Merge `patch` into the selected entity. Returns `false` if nothing is
    /// selected.
    pub fn update_selected(&mut self, patch: &EntityPatch) -> bool {
        let Some(selected) = self.selection else {
            return false;
        };
        match selected {
            EntityRef::Token(id) => {
                let Some(token) = self.tokens.iter_mut().find(|t| t.id == id) else {
                    return false;
                };
                apply_token_patch(token, patch);
            }
            EntityRef::Text(id) => {
                let Some(text) = self.texts.iter_mut().find(|t| t.id == id) else {
                    return false;
                };
                apply_text_patch(text, patch);
            }
        }
        true
    }

    /// Remove the selected entity and clear the selection. Returns the
    /// removed entity, or `None` when nothing was selected.
    pub fn delete_selected(&mut self) -> Option<Entity> {
        let selected = self.selection.take()?;
        self.remove(selected)
    }

    /// Remove an entity by reference. Clears the selection only if it
    /// pointed at the removed entity.
    pub fn remove(&mut self, entity: EntityRef) -> Option<Entity> {
        let removed = match entity {
            EntityRef::Token(id) => {
                let index = self.tokens.iter().position(|t| t.id == id)?;
                Entity::Token(self.tokens.remove(index))
            }
            EntityRef::Text(id) => {
                let index = self.texts.iter().position(|t| t.id == id)?;
                Entity::Text(self.texts.remove(index))
            }
        };
        if self.selection == Some(entity) {
            self.selection = None;
        }
        Some(removed)
    }

    /// Move an entity's origin. Returns `false` if it does not exist.
    pub fn set_position(&mut self, entity: EntityRef, pos: Point) -> bool {
        match entity {
            EntityRef::Token(id) => {
                let Some(token) = self.tokens.iter_mut().find(|t| t.id == id) else {
                    return false;
                };
                token.x = pos.x;
                token.y = pos.y;
            }
            EntityRef::Text(id) => {
                let Some(text) = self.texts.iter_mut().find(|t| t.id == id) else {
                    return false;
                };
                text.x = pos.x;
                text.y = pos.y;
            }
        }
        true
    }

    /// Replace the whole scene with `snapshot`. The selection survives only
    /// if the selected entity is present in the new scene. Returns `true` if
    /// the selection was dropped.
    pub fn replace_all(&mut self, snapshot: SceneSnapshot) -> bool {
        self.background = snapshot.background;
        self.tokens = snapshot.tokens;
        self.texts = snapshot.text_annotations;

        let stale = self.selection.filter(|s| !self.contains(*s));
        if let Some(stale) = stale {
            tracing::debug!(id = %stale.id(), "selection dropped by scene replace");
            self.selection = None;
        }
        stale.is_some()
    }
}

fn apply_token_patch(token: &mut Token, patch: &EntityPatch) {
    if let Some(x) = patch.x {
        token.x = x;
    }
    if let Some(y) = patch.y {
        token.y = y;
    }
    if let Some(ref name) = patch.name {
        token.name.clone_from(name);
    }
    if let Some(ref color) = patch.color {
        token.color.clone_from(color);
    }
    if let Some(radius) = patch.radius.filter(|r| r.is_finite() && *r > 0.0) {
        token.radius = radius;
    }
    if let Some(ref image) = patch.image {
        token.image = Some(image.clone());
        token.kind = TokenKind::Image;
    }
    if let Some(kind) = patch.kind {
        token.kind = kind;
    }
}

fn apply_text_patch(text: &mut TextAnnotation, patch: &EntityPatch) {
    if let Some(x) = patch.x {
        text.x = x;
    }
    if let Some(y) = patch.y {
        text.y = y;
    }
    if let Some(ref content) = patch.content {
        if *content != text.content {
            text.content.clone_from(content);
            text.invalidate_bounds();
        }
    }
}
