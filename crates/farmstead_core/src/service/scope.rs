//! Scope expansion over the farm -> group -> animal hierarchy.

use crate::model::animal::{Animal, AnimalGroup};
use crate::model::{AnimalId, FarmId, GroupId};
use crate::repo::directory_repo::AnimalDirectory;
use crate::repo::vaccination_repo::VaccinationStore;
use crate::service::error::{RecordRef, VaccinationError, VaccinationResult};
use crate::service::VaccinationService;
use std::collections::HashMap;

/// Level of the herd hierarchy an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Farm(FarmId),
    Group(GroupId),
    Animal(AnimalId),
}

/// An animal together with the group that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedAnimal {
    pub animal: Animal,
    pub group: AnimalGroup,
}

impl<D: AnimalDirectory, S: VaccinationStore> VaccinationService<D, S> {
    /// Expands a scope into its animals, each paired with its group.
    ///
    /// A farm scope only ever yields animals from groups of that farm.
    /// Unknown group or animal ids fail `NotFound`; an empty farm yields an
    /// empty list.
    pub fn resolve_scope(&self, scope: &Scope) -> VaccinationResult<Vec<ScopedAnimal>> {
        match *scope {
            Scope::Farm(farm_id) => {
                let mut scoped = Vec::new();
                for group in self.directory.list_groups_by_farm(farm_id)? {
                    if group.farm_id != farm_id {
                        continue;
                    }
                    self.push_group_animals(group, &mut scoped)?;
                }
                Ok(scoped)
            }
            Scope::Group(group_id) => self.resolve_groups(&[group_id]),
            Scope::Animal(animal_id) => self.resolve_animals(&[animal_id]),
        }
    }

    /// Resolves several groups in input order.
    pub(super) fn resolve_groups(
        &self,
        group_ids: &[GroupId],
    ) -> VaccinationResult<Vec<ScopedAnimal>> {
        let mut scoped = Vec::new();
        for group_id in group_ids {
            let group = self.require_group(*group_id)?;
            self.push_group_animals(group, &mut scoped)?;
        }
        Ok(scoped)
    }

    /// Resolves explicit animal ids in input order; every id must exist.
    pub(super) fn resolve_animals(
        &self,
        animal_ids: &[AnimalId],
    ) -> VaccinationResult<Vec<ScopedAnimal>> {
        let mut groups: HashMap<GroupId, AnimalGroup> = HashMap::new();
        let mut scoped = Vec::with_capacity(animal_ids.len());
        for animal_id in animal_ids {
            let animal = self
                .directory
                .get_animal(*animal_id)?
                .ok_or(VaccinationError::NotFound {
                    target: RecordRef::Animal,
                    id: *animal_id,
                })?;
            let group = match groups.get(&animal.group_id) {
                Some(group) => group.clone(),
                None => {
                    let group = self.require_group(animal.group_id)?;
                    groups.insert(group.id, group.clone());
                    group
                }
            };
            scoped.push(ScopedAnimal { animal, group });
        }
        Ok(scoped)
    }

    fn require_group(&self, group_id: GroupId) -> VaccinationResult<AnimalGroup> {
        self.directory
            .get_group(group_id)?
            .ok_or(VaccinationError::NotFound {
                target: RecordRef::Group,
                id: group_id,
            })
    }

    fn push_group_animals(
        &self,
        group: AnimalGroup,
        scoped: &mut Vec<ScopedAnimal>,
    ) -> VaccinationResult<()> {
        for animal in self.directory.list_animals_by_group(group.id)? {
            scoped.push(ScopedAnimal {
                animal,
                group: group.clone(),
            });
        }
        Ok(())
    }
}
