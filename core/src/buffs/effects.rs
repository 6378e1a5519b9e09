//! Translation of effect slots into command grants and modifier deltas.

use std::sync::Arc;

use super::Followups;
use crate::catalog::{BuffDefinition, CommandLookup, EffectSlot};
use crate::entity::EntityState;
use crate::events::BuffNotification;
use crate::ids::EntityId;

/// What a single effect slot does to its holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind<'a> {
    /// Grant the command while the buff is held
    Command(&'a str),
    /// Add `delta` to the named skill modifier while the buff is held
    SkillModifier { name: &'a str, delta: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectDirection {
    Apply,
    Revoke,
}

/// Applies and revokes a definition's effect slots on an entity.
///
/// Apply and revoke are exact inverses per slot, so applying then revoking
/// a buff leaves the entity's aggregate modifiers and commands unchanged.
/// Command grants are counted, so a command stays granted while any held
/// buff still grants it.
#[derive(Clone)]
pub struct EffectApplier {
    commands: Arc<dyn CommandLookup>,
}

impl EffectApplier {
    pub fn new(commands: Arc<dyn CommandLookup>) -> Self {
        Self { commands }
    }

    /// Resolve a slot. Empty slots resolve to nothing.
    pub fn classify<'a>(&self, slot: &'a EffectSlot) -> Option<EffectKind<'a>> {
        if slot.is_empty() {
            return None;
        }
        if slot.value == 1.0 && self.commands.is_command(&slot.name) {
            return Some(EffectKind::Command(&slot.name));
        }
        Some(EffectKind::SkillModifier {
            name: &slot.name,
            // Truncates toward zero
            delta: slot.value as i32,
        })
    }

    pub(crate) fn apply(
        &self,
        entity: EntityId,
        def: &BuffDefinition,
        state: &mut EntityState,
        out: &mut Followups,
    ) {
        self.run(entity, def, state, EffectDirection::Apply, out);
    }

    pub(crate) fn revoke(
        &self,
        entity: EntityId,
        def: &BuffDefinition,
        state: &mut EntityState,
        out: &mut Followups,
    ) {
        self.run(entity, def, state, EffectDirection::Revoke, out);
    }

    fn run(
        &self,
        entity: EntityId,
        def: &BuffDefinition,
        state: &mut EntityState,
        direction: EffectDirection,
        out: &mut Followups,
    ) {
        for slot in def.effect_slots() {
            let Some(kind) = self.classify(slot) else {
                continue;
            };
            match kind {
                EffectKind::Command(name) => match direction {
                    EffectDirection::Apply => {
                        let grants = state.commands.entry(name.to_string()).or_insert(0);
                        *grants += 1;
                        if *grants == 1 {
                            out.notify(BuffNotification::CommandGranted {
                                entity,
                                name: name.to_string(),
                            });
                        }
                    }
                    EffectDirection::Revoke => {
                        if release_grant(state, name) {
                            out.notify(BuffNotification::CommandRevoked {
                                entity,
                                name: name.to_string(),
                            });
                        }
                    }
                },
                EffectKind::SkillModifier { name, delta } => {
                    let delta = match direction {
                        EffectDirection::Apply => delta,
                        EffectDirection::Revoke => delta.saturating_neg(),
                    };
                    adjust_modifier(state, name, delta);
                    out.notify(BuffNotification::SkillModifierChanged {
                        entity,
                        name: name.to_string(),
                        delta,
                    });
                }
            }
        }
    }
}

/// Drop one grant of `name`. True when the last grant went away.
fn release_grant(state: &mut EntityState, name: &str) -> bool {
    if let Some(grants) = state.commands.get_mut(name)
        && *grants > 1
    {
        *grants -= 1;
        return false;
    }
    state.commands.remove(name).is_some()
}

fn adjust_modifier(state: &mut EntityState, name: &str, delta: i32) {
    let total = state.modifiers.get(name).copied().unwrap_or(0).saturating_add(delta);
    if total == 0 {
        state.modifiers.remove(name);
    } else {
        state.modifiers.insert(name.to_string(), total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffs::Followup;
    use crate::catalog::DefinitionSet;

    fn applier() -> EffectApplier {
        let mut set = DefinitionSet::new();
        set.add_command("burstRun");
        EffectApplier::new(Arc::new(set))
    }

    fn notifications(out: Followups) -> Vec<BuffNotification> {
        out.into_iter()
            .filter_map(|f| match f {
                Followup::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn classify_slots() {
        let applier = applier();
        assert_eq!(applier.classify(&EffectSlot::default()), None);
        assert_eq!(
            applier.classify(&EffectSlot::new("burstRun", 1.0)),
            Some(EffectKind::Command("burstRun"))
        );
        // A command name with any other magnitude is a modifier
        assert_eq!(
            applier.classify(&EffectSlot::new("burstRun", 2.0)),
            Some(EffectKind::SkillModifier { name: "burstRun", delta: 2 })
        );
        // A non-command with magnitude 1.0 is a modifier too
        assert_eq!(
            applier.classify(&EffectSlot::new("constitution", 1.0)),
            Some(EffectKind::SkillModifier { name: "constitution", delta: 1 })
        );
        assert_eq!(
            applier.classify(&EffectSlot::new("stamina", -7.9)),
            Some(EffectKind::SkillModifier { name: "stamina", delta: -7 })
        );
    }

    #[test]
    fn apply_then_revoke_restores_state() {
        let applier = applier();
        let def = BuffDefinition::new("rally", 30)
            .with_effect("burstRun", 1.0)
            .with_effect("constitution", 25.9)
            .with_effect("stamina", -10.0)
            .with_effect("", 99.0);

        let mut state = EntityState::default();
        state.modifiers.insert("constitution".to_string(), 4);
        state.commands.insert("sit".to_string(), 1);
        let before_mods = state.modifiers.clone();
        let before_cmds = state.commands.clone();

        let mut out = Followups::default();
        applier.apply(EntityId(1), &def, &mut state, &mut out);
        assert_eq!(state.modifiers.get("constitution"), Some(&29));
        assert_eq!(state.modifiers.get("stamina"), Some(&-10));
        assert_eq!(state.commands.get("burstRun"), Some(&1));

        applier.revoke(EntityId(1), &def, &mut state, &mut out);
        assert_eq!(state.modifiers, before_mods);
        assert_eq!(state.commands, before_cmds);

        let notes = notifications(out);
        assert_eq!(
            notes,
            vec![
                BuffNotification::CommandGranted { entity: EntityId(1), name: "burstRun".into() },
                BuffNotification::SkillModifierChanged { entity: EntityId(1), name: "constitution".into(), delta: 25 },
                BuffNotification::SkillModifierChanged { entity: EntityId(1), name: "stamina".into(), delta: -10 },
                BuffNotification::CommandRevoked { entity: EntityId(1), name: "burstRun".into() },
                BuffNotification::SkillModifierChanged { entity: EntityId(1), name: "constitution".into(), delta: -25 },
                BuffNotification::SkillModifierChanged { entity: EntityId(1), name: "stamina".into(), delta: 10 },
            ]
        );
    }

    #[test]
    fn shared_command_survives_first_revoke() {
        let applier = applier();
        let first = BuffDefinition::new("burstRun", 15).with_effect("burstRun", 1.0);
        let second = BuffDefinition::new("adrenal", 30).with_effect("burstRun", 1.0);

        let mut state = EntityState::default();
        let mut out = Followups::default();
        applier.apply(EntityId(1), &first, &mut state, &mut out);
        applier.apply(EntityId(1), &second, &mut state, &mut out);
        assert_eq!(state.commands.get("burstRun"), Some(&2));

        applier.revoke(EntityId(1), &first, &mut state, &mut out);
        assert_eq!(state.commands.get("burstRun"), Some(&1));

        applier.revoke(EntityId(1), &second, &mut state, &mut out);
        assert!(state.commands.is_empty());

        // One grant and one revoke, on the first apply and the last revoke
        assert_eq!(
            notifications(out),
            vec![
                BuffNotification::CommandGranted { entity: EntityId(1), name: "burstRun".into() },
                BuffNotification::CommandRevoked { entity: EntityId(1), name: "burstRun".into() },
            ]
        );
    }
}
