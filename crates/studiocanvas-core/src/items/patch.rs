//! Partial item updates and the mutation unit mirrored to collaborators.

use super::{ItemId, ItemKind, SceneItem, StyleField, StyleValue};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// One mergeable field of a [`SceneItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemField {
    Position,
    Size,
    ZIndex,
    /// The kind-specific payload (text, shape kind, endpoints, ...).
    Content,
    Style(StyleField),
}

impl ItemField {
    /// Every field of an item, in a stable order.
    pub fn all() -> impl Iterator<Item = ItemField> {
        [
            ItemField::Position,
            ItemField::Size,
            ItemField::ZIndex,
            ItemField::Content,
        ]
        .into_iter()
        .chain(StyleField::ALL.into_iter().map(ItemField::Style))
    }
}

/// A new value for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Position(Point),
    /// `None` returns the item to auto-sizing.
    Size(Option<Size>),
    ZIndex(i64),
    Content(ItemKind),
    Style(StyleValue),
}

impl FieldValue {
    pub fn field(&self) -> ItemField {
        match self {
            FieldValue::Position(_) => ItemField::Position,
            FieldValue::Size(_) => ItemField::Size,
            FieldValue::ZIndex(_) => ItemField::ZIndex,
            FieldValue::Content(_) => ItemField::Content,
            FieldValue::Style(v) => ItemField::Style(v.field()),
        }
    }

    /// Read the current value of `field` from an item.
    pub fn read(item: &SceneItem, field: ItemField) -> Self {
        match field {
            ItemField::Position => FieldValue::Position(item.position),
            ItemField::Size => FieldValue::Size(item.size),
            ItemField::ZIndex => FieldValue::ZIndex(item.z_index),
            ItemField::Content => FieldValue::Content(item.kind.clone()),
            ItemField::Style(f) => FieldValue::Style(item.style.value(f)),
        }
    }

    fn write(&self, item: &mut SceneItem) {
        match self {
            FieldValue::Position(p) => item.position = *p,
            FieldValue::Size(s) => item.size = *s,
            FieldValue::ZIndex(z) => item.z_index = *z,
            FieldValue::Content(kind) => item.kind = kind.clone(),
            FieldValue::Style(v) => item.style.set(v.clone()),
        }
    }
}

/// A partial update of an item's fields. The item id is never part of a patch.
///
/// Setting the same field twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemPatch {
    values: Vec<FieldValue>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, replacing any earlier value for the same field.
    pub fn set(mut self, value: FieldValue) -> Self {
        let field = value.field();
        self.values.retain(|v| v.field() != field);
        self.values.push(value);
        self
    }

    pub fn position(self, position: Point) -> Self {
        self.set(FieldValue::Position(position))
    }

    pub fn size(self, size: Option<Size>) -> Self {
        self.set(FieldValue::Size(size))
    }

    pub fn z_index(self, z_index: i64) -> Self {
        self.set(FieldValue::ZIndex(z_index))
    }

    pub fn content(self, kind: ItemKind) -> Self {
        self.set(FieldValue::Content(kind))
    }

    pub fn style(self, value: StyleValue) -> Self {
        self.set(FieldValue::Style(value))
    }

    /// Patch that rewrites every field of `item`.
    pub fn from_item(item: &SceneItem) -> Self {
        ItemField::all().fold(Self::new(), |patch, field| {
            patch.set(FieldValue::read(item, field))
        })
    }

    /// Minimal patch turning `old` into `new` (fields that differ).
    pub fn between(old: &SceneItem, new: &SceneItem) -> Self {
        ItemField::all()
            .map(|field| (FieldValue::read(old, field), FieldValue::read(new, field)))
            .filter(|(before, after)| before != after)
            .fold(Self::new(), |patch, (_, after)| patch.set(after))
    }

    /// Fold `other` into this patch; its values win.
    pub fn merge(self, other: ItemPatch) -> Self {
        other.values.into_iter().fold(self, ItemPatch::set)
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn fields(&self) -> impl Iterator<Item = ItemField> + '_ {
        self.values.iter().map(FieldValue::field)
    }

    pub fn touches(&self, field: ItemField) -> bool {
        self.fields().any(|f| f == field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the fields accepted by `keep`.
    pub fn retain(mut self, mut keep: impl FnMut(ItemField) -> bool) -> Self {
        self.values.retain(|v| keep(v.field()));
        self
    }

    /// Only the values that would change `item`.
    pub fn effective(&self, item: &SceneItem) -> ItemPatch {
        ItemPatch {
            values: self
                .values
                .iter()
                .filter(|v| FieldValue::read(item, v.field()) != **v)
                .cloned()
                .collect(),
        }
    }

    /// Apply the patch to a copy of `item`.
    pub fn apply(&self, item: &SceneItem) -> SceneItem {
        let mut updated = item.clone();
        for value in &self.values {
            value.write(&mut updated);
        }
        updated
    }
}

/// A single change to an item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Added { item: SceneItem },
    Updated { id: ItemId, patch: ItemPatch },
    Removed { id: ItemId },
}

impl Mutation {
    pub fn item_id(&self) -> ItemId {
        match self {
            Mutation::Added { item } => item.id(),
            Mutation::Updated { id, .. } | Mutation::Removed { id } => *id,
        }
    }
}
