// UI module - named drawables

pub mod color;
pub mod primitive;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::VulkanDevice;
use crate::error::RenderResult;
use crate::renderer::draw::DrawItem;

pub use color::rgba_to_aabbggrr;
pub use primitive::{Primitive, PrimitiveKind};

/// Primitives by unique name, iterated in name order so draw order is stable
#[derive(Default)]
pub struct UiRegistry {
    elements: BTreeMap<String, Primitive>,
}

impl UiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under `name`, returning whatever was there before
    pub fn add(&mut self, name: impl Into<String>, primitive: Primitive) -> Option<Primitive> {
        self.elements.insert(name.into(), primitive)
    }

    pub fn get(&self, name: &str) -> Option<&Primitive> {
        self.elements.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Primitive> {
        self.elements.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Primitive)> {
        self.elements.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Upload every dirty primitive; call between frames
    pub fn upload_dirty(&mut self, device: &Arc<VulkanDevice>) -> RenderResult<()> {
        for primitive in self.elements.values_mut().filter(|p| p.is_dirty()) {
            primitive.upload(device)?;
        }
        Ok(())
    }

    pub fn draw_items(&self) -> impl Iterator<Item = DrawItem> + '_ {
        self.elements.values().map(Primitive::draw_item)
    }
}
