use std::collections::HashMap;

use tracing::warn;

use crate::framework::{RenderContext, SpriteHandle};

use super::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityGuid(pub u64);

/// What the registry holds per live entity. The instance is owned here from
/// registration until removal; collections and the group are non-owning
/// indexes over it.
pub struct EntityRecord {
    pub guid: EntityGuid,
    pub instance: Box<dyn Entity>,
    pub collections: Vec<String>,
    pub group: Option<String>,
}

/// A named, ordered draw bucket. Groups render in creation order; members
/// render in vector order within the group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderGroup {
    pub name: String,
    pub members: Vec<SpriteHandle>,
}

pub struct EntityRegistration {
    pub instance: Box<dyn Entity>,
    pub collections: Vec<String>,
    pub group: Option<String>,
}

/// Lifetime and indexing authority for all entities in a level: flat list,
/// named collections, and named rendering groups.
#[derive(Default)]
pub struct EntityService {
    next_guid: u64,
    records: Vec<EntityRecord>,
    collections: HashMap<String, Vec<EntityGuid>>,
    groups: Vec<RenderGroup>,
}

impl EntityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups must exist before anything registers into them; creation order
    /// is draw order, later groups over earlier ones.
    pub fn create_group(&mut self, name: &str) {
        if self.groups.iter().any(|group| group.name == name) {
            warn!(group = name, "render_group_already_exists");
            return;
        }
        self.groups.push(RenderGroup {
            name: name.to_string(),
            members: Vec::new(),
        });
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|group| group.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&RenderGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn groups(&self) -> &[RenderGroup] {
        &self.groups
    }

    pub fn register_entity(&mut self, registration: EntityRegistration) -> EntityGuid {
        let guid = EntityGuid(self.next_guid);
        self.next_guid += 1;

        let EntityRegistration {
            instance,
            collections,
            group,
        } = registration;

        for collection in &collections {
            self.collections
                .entry(collection.clone())
                .or_default()
                .push(guid);
        }

        let group = match group {
            Some(name) => {
                if let Some(bucket) = self.groups.iter_mut().find(|group| group.name == name) {
                    bucket.members.extend(instance.core().sprite_handles());
                    Some(name)
                } else {
                    warn!(group = %name, "render_group_missing");
                    None
                }
            }
            None => None,
        };

        self.records.push(EntityRecord {
            guid,
            instance,
            collections,
            group,
        });
        guid
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, guid: EntityGuid) -> Option<&EntityRecord> {
        self.records.iter().find(|record| record.guid == guid)
    }

    pub fn get_mut(&mut self, guid: EntityGuid) -> Option<&mut EntityRecord> {
        self.records.iter_mut().find(|record| record.guid == guid)
    }

    pub fn all(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    /// Snapshot of matching guids, safe to hold while mutating the registry.
    pub fn guids_where(&self, predicate: impl Fn(&EntityRecord) -> bool) -> Vec<EntityGuid> {
        self.records
            .iter()
            .filter(|record| predicate(record))
            .map(|record| record.guid)
            .collect()
    }

    pub fn guids(&self) -> Vec<EntityGuid> {
        self.guids_where(|_| true)
    }

    /// Snapshot of a collection's members.
    pub fn collection(&self, name: &str) -> Vec<EntityGuid> {
        self.collections.get(name).cloned().unwrap_or_default()
    }

    /// Detaches the entity from the flat list, every collection, and its
    /// group. Returns the removed record, `None` when the guid is unknown.
    pub fn remove(&mut self, guid: EntityGuid) -> Option<EntityRecord> {
        let position = self
            .records
            .iter()
            .position(|record| record.guid == guid)?;
        let record = self.records.remove(position);

        for collection in &record.collections {
            if let Some(members) = self.collections.get_mut(collection) {
                members.retain(|member| *member != guid);
                if members.is_empty() {
                    self.collections.remove(collection);
                }
            }
        }

        if let Some(group_name) = &record.group {
            let handles = record.instance.core().sprite_handles();
            if let Some(group) = self
                .groups
                .iter_mut()
                .find(|group| &group.name == group_name)
            {
                group.members.retain(|member| !handles.contains(member));
            }
        }

        Some(record)
    }

    /// `remove` plus the instance's own destroy hook. Entities without
    /// visual state inherit the no-op default.
    pub fn destroy(&mut self, guid: EntityGuid, ctx: &mut dyn RenderContext) -> bool {
        match self.remove(guid) {
            Some(mut record) => {
                record.instance.destroy(ctx);
                true
            }
            None => false,
        }
    }

    pub fn remove_all(
        &mut self,
        predicate: impl Fn(&EntityRecord) -> bool,
    ) -> Vec<EntityRecord> {
        self.guids_where(predicate)
            .into_iter()
            .filter_map(|guid| self.remove(guid))
            .collect()
    }

    pub fn destroy_all(
        &mut self,
        predicate: impl Fn(&EntityRecord) -> bool,
        ctx: &mut dyn RenderContext,
    ) -> usize {
        let mut destroyed = 0;
        for guid in self.guids_where(predicate) {
            if self.destroy(guid, ctx) {
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Rebuilds a group's draw order from its entities: ascending z-index,
    /// then ascending bottom edge, so later z or lower on screen draws on
    /// top. The sort is stable and recomputed every frame because entities
    /// move.
    pub fn resort_group(&mut self, name: &str, ctx: &dyn RenderContext) {
        if !self.has_group(name) {
            return;
        }
        let mut ordered = Vec::<(i32, f32, Vec<SpriteHandle>)>::new();
        for record in &self.records {
            if record.group.as_deref() != Some(name) {
                continue;
            }
            let core = record.instance.core();
            let bottom = match core.sprite {
                Some(sprite) => ctx.sprite_bounds(sprite).bottom(),
                None => core.bounds().bottom(),
            };
            ordered.push((core.z_index, bottom, core.sprite_handles()));
        }
        ordered.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });
        let members = ordered
            .into_iter()
            .flat_map(|(_, _, handles)| handles)
            .collect();
        if let Some(group) = self.groups.iter_mut().find(|group| group.name == name) {
            group.members = members;
        }
    }
}
