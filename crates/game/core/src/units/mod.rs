//! Unit state: attributes, resources, equipment, statuses, templates.

mod attributes;
mod equipment;
mod resources;
mod status;
mod template;
mod unit;

pub use attributes::{AttributeKind, Attributes, DerivedStats};
pub use equipment::{Equipment, EquipmentSlot, EquippedItem};
pub use resources::{ResourceKind, ResourcePool, ResourceSet};
pub use status::{AttributeModifier, StatusBoard, StatusInstance, StatusKind};
pub use template::{HotkeyBar, UnitPlacement, UnitTemplate, UnitTemplateBuilder};
pub use unit::{DamageOutcome, Unit};
