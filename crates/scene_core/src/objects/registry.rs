use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use super::kinds::{
    blockers, bridges, doors, hazards, movers, pickups, points, portals, props, pushables,
    switches, three_phase, triggers,
};
use super::{InteractiveObject, LevelInfo, ObjectInfo, ObjectKind};

pub type ObjectFactory = fn(ObjectInfo, &LevelInfo) -> Box<dyn InteractiveObject>;

/// One variant type and the kind tags it serves.
#[derive(Clone, Copy)]
pub struct KindRegistration {
    pub type_name: &'static str,
    pub kinds: &'static [ObjectKind],
    pub factory: ObjectFactory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("kind {kind:?} claimed by both `{first}` and `{second}`")]
    DuplicateKind {
        kind: ObjectKind,
        first: &'static str,
        second: &'static str,
    },
    #[error("`{type_name}` declares no kinds")]
    EmptyKindList { type_name: &'static str },
}

pub const DEFAULT_REGISTRATIONS: &[KindRegistration] = &[
    KindRegistration {
        type_name: "ScriptTrigger",
        kinds: &[ObjectKind::AutoTrigger, ObjectKind::PreciseTrigger],
        factory: triggers::ScriptTrigger::build,
    },
    KindRegistration {
        type_name: "Door",
        kinds: &[ObjectKind::Door, ObjectKind::ElevatorDoor],
        factory: doors::Door::build,
    },
    KindRegistration {
        type_name: "Chest",
        kinds: &[ObjectKind::Chest, ObjectKind::RareChest],
        factory: pickups::Chest::build,
    },
    KindRegistration {
        type_name: "Switch",
        kinds: &[ObjectKind::Switch, ObjectKind::ToggleSwitch],
        factory: switches::Switch::build,
    },
    KindRegistration {
        type_name: "PedalSwitch",
        kinds: &[ObjectKind::PedalSwitch, ObjectKind::ElevatorPedal],
        factory: switches::PedalSwitch::build,
    },
    KindRegistration {
        type_name: "ThreePhaseSwitch",
        kinds: &[ObjectKind::ThreePhaseSwitch],
        factory: three_phase::ThreePhaseSwitch::build,
    },
    KindRegistration {
        type_name: "ThreePhaseBridge",
        kinds: &[ObjectKind::ThreePhaseBridge],
        factory: three_phase::ThreePhaseBridge::build,
    },
    KindRegistration {
        type_name: "SpecialSwitch",
        kinds: &[ObjectKind::SpecialSwitch],
        factory: switches::SpecialSwitch::build,
    },
    KindRegistration {
        type_name: "Collidable",
        kinds: &[ObjectKind::Collidable],
        factory: props::Collidable::build,
    },
    KindRegistration {
        type_name: "Shakeable",
        kinds: &[ObjectKind::Shakeable],
        factory: props::Shakeable::build,
    },
    KindRegistration {
        type_name: "Climbable",
        kinds: &[ObjectKind::Climbable],
        factory: movers::Climbable::build,
    },
    KindRegistration {
        type_name: "PushableBlock",
        kinds: &[ObjectKind::Pushable],
        factory: pushables::PushableBlock::build,
    },
    KindRegistration {
        type_name: "BidirectionalPushable",
        kinds: &[ObjectKind::BidirectionalPushable],
        factory: pushables::BidirectionalPushable::build,
    },
    KindRegistration {
        type_name: "Elevator",
        kinds: &[ObjectKind::Elevator],
        factory: movers::Elevator::build,
    },
    KindRegistration {
        type_name: "MovableCarrier",
        kinds: &[ObjectKind::MovableCarrier],
        factory: movers::MovableCarrier::build,
    },
    KindRegistration {
        type_name: "RotatingBridge",
        kinds: &[ObjectKind::RotatingBridge],
        factory: bridges::RotatingBridge::build,
    },
    KindRegistration {
        type_name: "DeployableBridge",
        kinds: &[ObjectKind::SuspensionBridge, ObjectKind::SwordBridge],
        factory: bridges::DeployableBridge::build,
    },
    KindRegistration {
        type_name: "SlideWay",
        kinds: &[ObjectKind::SlideWay],
        factory: movers::SlideWay::build,
    },
    KindRegistration {
        type_name: "Collectible",
        kinds: &[ObjectKind::Collectible],
        factory: pickups::Collectible::build,
    },
    KindRegistration {
        type_name: "Trap",
        kinds: &[ObjectKind::Trap],
        factory: hazards::Trap::build,
    },
    KindRegistration {
        type_name: "FallingObject",
        kinds: &[ObjectKind::FallableObstacle, ObjectKind::FallableWeapon],
        factory: hazards::FallingObject::build,
    },
    KindRegistration {
        type_name: "Blocker",
        kinds: &[ObjectKind::WindBlocker, ObjectKind::WaterSurfaceRoadBlocker],
        factory: blockers::Blocker::build,
    },
    KindRegistration {
        type_name: "RetractableBlocker",
        kinds: &[ObjectKind::RetractableBlocker],
        factory: blockers::RetractableBlocker::build,
    },
    KindRegistration {
        type_name: "GravityTrigger",
        kinds: &[ObjectKind::GravityTrigger],
        factory: triggers::GravityTrigger::build,
    },
    KindRegistration {
        type_name: "JumpPoint",
        kinds: &[ObjectKind::JumpableArea],
        factory: movers::JumpPoint::build,
    },
    KindRegistration {
        type_name: "SavingPoint",
        kinds: &[ObjectKind::SavingPoint],
        factory: points::SavingPoint::build,
    },
    KindRegistration {
        type_name: "InvestigationPoint",
        kinds: &[ObjectKind::InvestigationTrigger],
        factory: points::InvestigationPoint::build,
    },
    KindRegistration {
        type_name: "CameraTrigger",
        kinds: &[ObjectKind::CameraTrigger],
        factory: triggers::CameraTrigger::build,
    },
    KindRegistration {
        type_name: "BloomingFlower",
        kinds: &[ObjectKind::DivineTreeFlower],
        factory: portals::BloomingFlower::build,
    },
    KindRegistration {
        type_name: "ScenePortal",
        kinds: &[
            ObjectKind::DivineTreePortal,
            ObjectKind::SceneTransitionTrigger,
        ],
        factory: portals::ScenePortal::build,
    },
    KindRegistration {
        type_name: "StaticProp",
        kinds: &[ObjectKind::StaticProp],
        factory: props::StaticProp::build,
    },
    KindRegistration {
        type_name: "AnimatedProp",
        kinds: &[ObjectKind::AnimatedProp],
        factory: props::AnimatedProp::build,
    },
    KindRegistration {
        type_name: "Mechanism",
        kinds: &[ObjectKind::SpecialMechanism],
        factory: props::Mechanism::build,
    },
    KindRegistration {
        type_name: "BreakableWall",
        kinds: &[ObjectKind::BreakableWall],
        factory: props::BreakableWall::build,
    },
    KindRegistration {
        type_name: "Teleporter",
        kinds: &[ObjectKind::Teleporter],
        factory: movers::Teleporter::build,
    },
    KindRegistration {
        type_name: "TimedSwitch",
        kinds: &[ObjectKind::TimedSwitch],
        factory: switches::TimedSwitch::build,
    },
];

/// Kind tag to constructor, validated once when built.
pub struct ObjectRegistry {
    registrations: Vec<KindRegistration>,
    lookup_by_kind: HashMap<ObjectKind, usize>,
}

impl ObjectRegistry {
    pub fn build(registrations: &[KindRegistration]) -> Result<Self, RegistryError> {
        let mut registry = Self {
            registrations: Vec::with_capacity(registrations.len()),
            lookup_by_kind: HashMap::new(),
        };
        for registration in registrations {
            registry.register(*registration)?;
        }
        info!(
            types = registry.registrations.len(),
            kinds = registry.lookup_by_kind.len(),
            "object_registry_built"
        );
        Ok(registry)
    }

    pub fn with_default_kinds() -> Result<Self, RegistryError> {
        Self::build(DEFAULT_REGISTRATIONS)
    }

    fn register(&mut self, registration: KindRegistration) -> Result<(), RegistryError> {
        if registration.kinds.is_empty() {
            return Err(RegistryError::EmptyKindList {
                type_name: registration.type_name,
            });
        }
        for kind in registration.kinds {
            if let Some(existing) = self.lookup_by_kind.get(kind) {
                return Err(RegistryError::DuplicateKind {
                    kind: *kind,
                    first: self.registrations[*existing].type_name,
                    second: registration.type_name,
                });
            }
        }

        let index = self.registrations.len();
        self.registrations.push(registration);
        for kind in registration.kinds {
            self.lookup_by_kind.insert(*kind, index);
        }
        Ok(())
    }

    pub fn type_name_for(&self, kind: ObjectKind) -> Option<&'static str> {
        let index = self.lookup_by_kind.get(&kind)?;
        Some(self.registrations[*index].type_name)
    }

    pub fn registered_kind_count(&self) -> usize {
        self.lookup_by_kind.len()
    }

    /// `None` for unknown tags and for kinds no type serves; such objects are left out of the
    /// level.
    pub fn create(&self, info: ObjectInfo, level: &LevelInfo) -> Option<Box<dyn InteractiveObject>> {
        let Some(kind) = info.kind() else {
            debug!(object_id = info.id.0, kind_tag = info.kind_tag, "object_kind_unknown");
            return None;
        };
        let Some(index) = self.lookup_by_kind.get(&kind) else {
            debug!(object_id = info.id.0, kind = ?kind, "object_kind_unregistered");
            return None;
        };
        Some((self.registrations[*index].factory)(info, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::LevelId;
    use crate::objects::ObjectId;

    fn level() -> LevelInfo {
        LevelInfo::new(LevelId::new(0, 0))
    }

    #[test]
    fn default_table_covers_every_kind_but_the_editor_marker() {
        let registry = ObjectRegistry::with_default_kinds().expect("registry");
        assert_eq!(registry.registered_kind_count(), ObjectKind::ALL.len() - 1);
        for kind in ObjectKind::ALL {
            let expected = *kind != ObjectKind::EditorMarker;
            assert_eq!(registry.type_name_for(*kind).is_some(), expected, "{kind:?}");
        }
        assert_eq!(registry.type_name_for(ObjectKind::ElevatorDoor), Some("Door"));
    }

    #[test]
    fn duplicate_kind_claims_fail_the_build() {
        let table = [
            DEFAULT_REGISTRATIONS[0],
            KindRegistration {
                type_name: "OtherTrigger",
                kinds: &[ObjectKind::PreciseTrigger],
                factory: triggers::ScriptTrigger::build,
            },
        ];
        let error = ObjectRegistry::build(&table).err().expect("duplicate");
        assert_eq!(
            error,
            RegistryError::DuplicateKind {
                kind: ObjectKind::PreciseTrigger,
                first: "ScriptTrigger",
                second: "OtherTrigger",
            }
        );
    }

    #[test]
    fn registration_without_kinds_fails_the_build() {
        let table = [KindRegistration {
            type_name: "Nothing",
            kinds: &[],
            factory: props::StaticProp::build,
        }];
        assert!(matches!(
            ObjectRegistry::build(&table),
            Err(RegistryError::EmptyKindList { type_name: "Nothing" })
        ));
    }

    #[test]
    fn create_skips_unknown_and_unregistered_kinds() {
        let registry = ObjectRegistry::with_default_kinds().expect("registry");
        let door = ObjectInfo::new(ObjectId(1), ObjectKind::Door);
        let created = registry.create(door, &level()).expect("door");
        assert_eq!(created.core().kind(), Some(ObjectKind::Door));

        let marker = ObjectInfo::new(ObjectId(2), ObjectKind::EditorMarker);
        assert!(registry.create(marker, &level()).is_none());

        let mut unknown = ObjectInfo::new(ObjectId(3), ObjectKind::Door);
        unknown.kind_tag = 99;
        assert!(registry.create(unknown, &level()).is_none());
    }
}
