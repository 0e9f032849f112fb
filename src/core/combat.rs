/// Combat engine — one encounter between the player and a single enemy.
///
/// The encounter owns only encounter-local numbers (enemy hp and stamina,
/// the blocking and buff flags, the log). The player is passed in by value
/// and handed back in every [`Step`]. Delays are not waited on here: a step
/// names its follow-up event and delay, and the orchestrator schedules it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::progression::{award_xp, gain_limit};
use crate::core::tuning::Tuning;
use crate::schema::bankai::BankaiKind;
use crate::schema::enemy::Enemy;
use crate::schema::item::Scaling;
use crate::schema::player::PlayerState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("actions are only accepted on the player's turn (encounter is {0:?})")]
    NotPlayerTurn(TurnState),
}

/// Newtype wrapper for encounter IDs. Unique per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    PlayerTurn,
    /// The enemy is reacting or a delayed strike is pending.
    Resolving,
    Victory,
    Defeat,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    Attack,
    Block,
    Parry,
    Dodge,
    DrinkEstus,
    Bankai,
}

impl PlayerAction {
    pub const ALL: [PlayerAction; 6] = [
        PlayerAction::Attack,
        PlayerAction::Block,
        PlayerAction::Parry,
        PlayerAction::Dodge,
        PlayerAction::DrinkEstus,
        PlayerAction::Bankai,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Block => "block",
            Self::Parry => "parry",
            Self::Dodge => "dodge",
            Self::DrinkEstus => "estus",
            Self::Bankai => "bankai",
        }
    }

    pub fn parse(s: &str) -> Option<PlayerAction> {
        match s.to_lowercase().as_str() {
            "attack" | "a" => Some(Self::Attack),
            "block" | "b" => Some(Self::Block),
            "parry" | "p" => Some(Self::Parry),
            "dodge" | "d" => Some(Self::Dodge),
            "estus" | "drink" | "e" => Some(Self::DrinkEstus),
            "bankai" | "k" => Some(Self::Bankai),
            _ => None,
        }
    }
}

/// Screen-shake strength for a hit on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shake {
    Light,
    Medium,
    Heavy,
}

impl Shake {
    pub fn for_damage(damage: u32) -> Shake {
        if damage > 40 {
            Shake::Heavy
        } else if damage > 15 {
            Shake::Medium
        } else {
            Shake::Light
        }
    }
}

/// Presentation cue emitted alongside a state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEffect {
    ParrySuccess,
    Block,
    Dodge,
    Hit { damage: u32, shake: Shake },
    GuardBreak { damage: u32 },
    BankaiRelease { color: String },
}

/// A delayed transition owned by an encounter.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    EnemyTurn { multiplier: f64 },
    BankaiStrike { damage: u32 },
    AnnounceVictory { xp_awarded: u32, levels_gained: u32 },
    AnnounceDefeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowUp {
    pub delay_ms: u64,
    pub event: CombatEvent,
}

/// Terminal outcome, reported once the presentation delay has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatSignal {
    Victory { xp_awarded: u32, levels_gained: u32 },
    Defeat,
}

/// The next player state plus whatever the orchestrator must do next.
#[derive(Debug, Clone)]
pub struct Step {
    pub player: PlayerState,
    pub follow_up: Option<FollowUp>,
    pub signal: Option<CombatSignal>,
}

impl Step {
    fn idle(player: PlayerState) -> Step {
        Step {
            player,
            follow_up: None,
            signal: None,
        }
    }
}

/// Encounter-local state. Discarded when the encounter ends.
#[derive(Debug, Clone)]
pub struct Encounter {
    id: EncounterId,
    enemy: Enemy,
    enemy_hp: u32,
    enemy_stamina: u32,
    state: TurnState,
    blocking: bool,
    bankai_active: bool,
    outcome_processed: bool,
    log: Vec<String>,
    effects: Vec<CombatEffect>,
}

impl Encounter {
    pub fn new(id: EncounterId, enemy: Enemy) -> Encounter {
        let log = vec![format!("The battle with {} begins!", enemy.name)];
        info!(encounter = id.0, enemy = %enemy.id, hp = enemy.hp, "encounter_started");
        Encounter {
            id,
            enemy_hp: enemy.hp.min(enemy.max_hp),
            enemy_stamina: enemy.max_stamina,
            enemy,
            state: TurnState::PlayerTurn,
            blocking: false,
            bankai_active: false,
            outcome_processed: false,
            log,
            effects: Vec::new(),
        }
    }

    pub fn id(&self) -> EncounterId {
        self.id
    }

    pub fn enemy(&self) -> &Enemy {
        &self.enemy
    }

    pub fn enemy_hp(&self) -> u32 {
        self.enemy_hp
    }

    pub fn enemy_stamina(&self) -> u32 {
        self.enemy_stamina
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn bankai_active(&self) -> bool {
        self.bankai_active
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    fn note(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    /// Take the presentation cues produced since the last call.
    pub fn drain_effects(&mut self) -> Vec<CombatEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Resolve a player action. Only accepted on the player's turn; a
    /// second submission while the enemy is reacting is rejected.
    pub fn act<R: Rng>(
        &mut self,
        action: PlayerAction,
        player: PlayerState,
        tuning: &Tuning,
        rng: &mut R,
    ) -> Result<Step, CombatError> {
        if self.state != TurnState::PlayerTurn {
            debug!(
                encounter = self.id.0,
                action = action.name(),
                state = ?self.state,
                "action_rejected"
            );
            return Err(CombatError::NotPlayerTurn(self.state));
        }
        self.blocking = false;

        let step = match action {
            PlayerAction::Attack => self.attack(player, tuning, rng),
            PlayerAction::Block => self.block(player, tuning),
            PlayerAction::Parry => self.parry(player, tuning, rng),
            PlayerAction::Dodge => self.dodge(player, tuning, rng),
            PlayerAction::DrinkEstus => self.drink_estus(player, tuning),
            PlayerAction::Bankai => self.release_bankai(player, tuning),
        };
        debug!(
            encounter = self.id.0,
            action = action.name(),
            enemy_hp = self.enemy_hp,
            state = ?self.state,
            "player_action_resolved"
        );
        Ok(step)
    }

    /// Fire a delayed event previously returned in a [`FollowUp`]. Events
    /// that no longer apply to the current state are ignored.
    pub fn fire<R: Rng>(
        &mut self,
        event: CombatEvent,
        player: PlayerState,
        tuning: &Tuning,
        _rng: &mut R,
    ) -> Step {
        match event {
            CombatEvent::EnemyTurn { multiplier } if self.state == TurnState::Resolving => {
                self.enemy_turn(player, multiplier, tuning)
            }
            CombatEvent::BankaiStrike { damage } if self.state == TurnState::Resolving => {
                self.enemy_hp = self.enemy_hp.saturating_sub(damage);
                self.note(format!("BANKAI STRIKE! {} damage!", damage));
                self.state = TurnState::PlayerTurn;
                self.settle(player, None, tuning)
            }
            CombatEvent::AnnounceVictory {
                xp_awarded,
                levels_gained,
            } if self.state == TurnState::Victory => Step {
                player,
                follow_up: None,
                signal: Some(CombatSignal::Victory {
                    xp_awarded,
                    levels_gained,
                }),
            },
            CombatEvent::AnnounceDefeat if self.state == TurnState::Defeat => Step {
                player,
                follow_up: None,
                signal: Some(CombatSignal::Defeat),
            },
            other => {
                debug!(
                    encounter = self.id.0,
                    event = ?other,
                    state = ?self.state,
                    "combat_event_ignored"
                );
                Step::idle(player)
            }
        }
    }

    /// Re-run the victory/defeat check. Safe to call any number of times;
    /// the outcome is processed once per encounter.
    pub fn check_outcome(&mut self, player: PlayerState, tuning: &Tuning) -> Step {
        self.settle(player, None, tuning)
    }

    fn attack<R: Rng>(&mut self, player: PlayerState, tuning: &Tuning, rng: &mut R) -> Step {
        if player.stamina < tuning.attack_cost {
            self.note("Not enough stamina to attack!");
            return Step::idle(player);
        }

        let (weapon_name, stats) = player.weapon();
        let weapon_name = weapon_name.to_string();
        let mut stat_bonus = match stats.scaling {
            Scaling::Str => player.stats.strength,
            Scaling::Dex => player.stats.dexterity,
            Scaling::None => 0,
        };
        if self.bankai_active {
            stat_bonus += player.bankai.buff_strength();
        }

        let roll: f64 = rng.gen_range(0.0..tuning.attack_roll_max);
        let scaled = stat_bonus as f64 * tuning.attack_scaling_factor;
        let damage = (stats.damage as f64 + scaled + roll).floor() as u32;
        self.enemy_hp = self.enemy_hp.saturating_sub(damage);
        self.note(format!("You strike with {}! {} damage.", weapon_name, damage));

        let player = gain_limit(player.exerted(tuning.attack_cost), tuning.limit_gain_attack);
        self.end_turn(player, tuning.settle_delay_ms, 1.0, tuning)
    }

    fn block(&mut self, player: PlayerState, tuning: &Tuning) -> Step {
        self.blocking = true;
        self.note("You raise your shield and brace.");
        let player = player.rested(tuning.block_regen);
        self.end_turn(player, tuning.settle_delay_ms, 1.0, tuning)
    }

    fn parry<R: Rng>(&mut self, player: PlayerState, tuning: &Tuning, rng: &mut R) -> Step {
        if player.stamina < tuning.parry_cost {
            self.note("Too exhausted to parry!");
            return Step::idle(player);
        }

        let (weapon_name, stats) = player.weapon();
        let weapon_name = weapon_name.to_string();
        let chance = tuning.parry_chance(player.stats.dexterity, stats.parry_bonus);
        let player = player.exerted(tuning.parry_cost);

        if rng.gen::<f64>() < chance {
            self.effects.push(CombatEffect::ParrySuccess);
            self.note(format!("PERFECT PARRY! ({})", weapon_name));
            self.enemy_stamina = self
                .enemy_stamina
                .saturating_sub(tuning.parry_stamina_break);
            let player = gain_limit(player, tuning.limit_gain_parry);
            self.settle(player, None, tuning)
        } else {
            self.note("The parry fails! You are left open!");
            self.end_turn(
                player,
                tuning.failed_parry_delay_ms,
                tuning.failed_parry_multiplier,
                tuning,
            )
        }
    }

    fn dodge<R: Rng>(&mut self, player: PlayerState, tuning: &Tuning, rng: &mut R) -> Step {
        if player.stamina < tuning.dodge_cost {
            self.note("Too exhausted to dodge!");
            return Step::idle(player);
        }

        let chance = tuning.dodge_chance(player.stats.dexterity);
        let player = player.exerted(tuning.dodge_cost);

        if rng.gen::<f64>() < chance {
            self.effects.push(CombatEffect::Dodge);
            self.note("You slip past the blow and find an opening!");
            self.enemy_stamina = self
                .enemy_stamina
                .saturating_sub(tuning.dodge_stamina_break);
            let player = gain_limit(player, tuning.limit_gain_dodge);
            self.settle(player, None, tuning)
        } else {
            self.note("You fail to get clear!");
            self.end_turn(player, tuning.settle_delay_ms, 1.0, tuning)
        }
    }

    fn drink_estus(&mut self, mut player: PlayerState, tuning: &Tuning) -> Step {
        if player.estus == 0 {
            self.note("The Estus Flask is empty!");
            return Step::idle(player);
        }

        let heal = tuning.estus_heal(player.stats.vitality);
        player.estus -= 1;
        let player = player.healed(heal);
        self.note(format!("You drink from the Estus Flask. ({} left)", player.estus));
        self.end_turn(player, tuning.settle_delay_ms, 1.0, tuning)
    }

    fn release_bankai(&mut self, mut player: PlayerState, tuning: &Tuning) -> Step {
        if !player.limit_full() {
            self.note("The limit gauge is not full yet.");
            return Step::idle(player);
        }

        player.limit_gauge = 0;
        let bankai = player.bankai.clone();
        self.effects.push(CombatEffect::BankaiRelease {
            color: bankai.visual_color.clone(),
        });
        self.note(bankai.release_line());
        self.note(bankai.description.clone());
        info!(
            encounter = self.id.0,
            bankai = %bankai.name,
            buff = bankai.is_buff(),
            "bankai_released"
        );

        match bankai.kind {
            BankaiKind::Instant { damage_multiplier } => {
                let multiplier = if damage_multiplier > 0.0 {
                    damage_multiplier
                } else {
                    tuning.bankai_fallback_multiplier
                };
                let base = tuning.bankai_base_damage
                    + tuning.bankai_strength_factor * player.stats.strength;
                let damage = (base as f64 * multiplier).floor() as u32;
                self.state = TurnState::Resolving;
                Step {
                    player,
                    follow_up: Some(FollowUp {
                        delay_ms: tuning.bankai_strike_delay_ms,
                        event: CombatEvent::BankaiStrike { damage },
                    }),
                    signal: None,
                }
            }
            BankaiKind::Buff { .. } => {
                self.bankai_active = true;
                self.note("Your spiritual pressure surges! Your power rises.");
                self.settle(player, None, tuning)
            }
        }
    }

    fn enemy_turn(&mut self, player: PlayerState, multiplier: f64, tuning: &Tuning) -> Step {
        let mut player = gain_limit(player, tuning.limit_gain_enemy_turn);

        if self.enemy_stamina < tuning.enemy_rest_threshold {
            self.note(format!("{} stops to catch its breath...", self.enemy.name));
            self.enemy_stamina = (self.enemy_stamina + tuning.enemy_rest_recovery)
                .min(self.enemy.max_stamina);
            self.state = TurnState::PlayerTurn;
            debug!(encounter = self.id.0, enemy_stamina = self.enemy_stamina, "enemy_rested");
            return self.settle(player, None, tuning);
        }

        let damage = (self.enemy.damage as f64 * multiplier).floor() as u32;
        self.enemy_stamina = self
            .enemy_stamina
            .saturating_sub(tuning.enemy_attack_cost);

        let taken = if self.blocking {
            if player.stamina < tuning.block_stamina_cost {
                player.stamina = 0;
                player = player.damaged(damage);
                self.note("GUARD BREAK! You take the full blow.");
                self.effects.push(CombatEffect::GuardBreak { damage });
                self.effects.push(CombatEffect::Hit {
                    damage,
                    shake: Shake::for_damage(damage),
                });
                damage
            } else {
                let mut reduced = (damage as f64 * tuning.block_damage_factor).floor() as u32;
                if self.bankai_active {
                    reduced = (reduced as f64 * tuning.buffed_block_factor).floor() as u32;
                }
                player = player
                    .exerted(tuning.block_stamina_cost)
                    .damaged(reduced);
                self.note(format!(
                    "{} strikes your shield. The blow is absorbed.",
                    self.enemy.name
                ));
                self.effects.push(CombatEffect::Block);
                reduced
            }
        } else {
            player = player.damaged(damage);
            self.note(format!("{} strikes without mercy! {} damage.", self.enemy.name, damage));
            self.effects.push(CombatEffect::Hit {
                damage,
                shake: Shake::for_damage(damage),
            });
            damage
        };

        self.blocking = false;
        let player = player.rested(tuning.player_turn_regen);
        self.state = TurnState::PlayerTurn;
        info!(
            encounter = self.id.0,
            damage = taken,
            player_hp = player.hp,
            enemy_stamina = self.enemy_stamina,
            "enemy_turn_resolved"
        );
        self.settle(player, None, tuning)
    }

    /// Hand the turn to the enemy after `delay_ms`, unless the action just
    /// ended the fight.
    fn end_turn(
        &mut self,
        player: PlayerState,
        delay_ms: u64,
        multiplier: f64,
        tuning: &Tuning,
    ) -> Step {
        self.state = TurnState::Resolving;
        let follow_up = FollowUp {
            delay_ms,
            event: CombatEvent::EnemyTurn { multiplier },
        };
        self.settle(player, Some(follow_up), tuning)
    }

    /// Victory/defeat detection, guarded so it is processed exactly once.
    fn settle(
        &mut self,
        player: PlayerState,
        follow_up: Option<FollowUp>,
        tuning: &Tuning,
    ) -> Step {
        if self.outcome_processed {
            return Step::idle(player);
        }

        if self.enemy_hp == 0 {
            self.outcome_processed = true;
            self.state = TurnState::Victory;
            let xp_awarded = self.enemy.xp_reward;
            let award = award_xp(player, xp_awarded, tuning);
            self.note(format!("{} has fallen. ENEMY FELLED", self.enemy.name));
            info!(
                encounter = self.id.0,
                enemy = %self.enemy.id,
                xp_awarded,
                levels_gained = award.levels_gained,
                "encounter_victory"
            );
            return Step {
                player: award.player,
                follow_up: Some(FollowUp {
                    delay_ms: tuning.victory_delay_ms,
                    event: CombatEvent::AnnounceVictory {
                        xp_awarded,
                        levels_gained: award.levels_gained,
                    },
                }),
                signal: None,
            };
        }

        if player.is_dead() {
            self.outcome_processed = true;
            self.state = TurnState::Defeat;
            self.note("YOU DIED");
            info!(encounter = self.id.0, enemy = %self.enemy.id, "encounter_defeat");
            return Step {
                player,
                follow_up: Some(FollowUp {
                    delay_ms: tuning.defeat_delay_ms,
                    event: CombatEvent::AnnounceDefeat,
                }),
                signal: None,
            };
        }

        Step {
            player,
            follow_up,
            signal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::bankai::Bankai;
    use crate::schema::item::{Item, ItemId, ItemKind, WeaponStats};
    use crate::schema::player::PlayerStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn make_enemy(hp: u32, damage: u32) -> Enemy {
        Enemy {
            id: "celebi".to_string(),
            name: "Mehmet Celebi".to_string(),
            hp,
            max_hp: hp,
            damage,
            stamina: 100,
            max_stamina: 100,
            xp_reward: 500,
            description: "Lord of the Cracked Skull.".to_string(),
            image: None,
        }
    }

    fn make_player(kind: BankaiKind) -> PlayerState {
        PlayerState {
            name: "Chosen Undead".to_string(),
            hp: 100,
            max_hp: 100,
            stamina: 100,
            max_stamina: 100,
            estus: 5,
            inventory: vec![Item {
                id: ItemId("broken_sword".to_string()),
                name: "Broken Straight Sword".to_string(),
                description: String::new(),
                kind: ItemKind::Weapon,
                weapon_stats: Some(WeaponStats {
                    damage: 10,
                    scaling: Scaling::Str,
                    parry_bonus: 0.0,
                    description: String::new(),
                }),
            }],
            equipped_weapon: "Broken Straight Sword".to_string(),
            unlocked_codex_entries: Vec::new(),
            codex_images: HashMap::new(),
            stats: PlayerStats::default(),
            level: 1,
            xp: 0,
            xp_to_next_level: 100,
            attribute_points: 0,
            limit_gauge: 0,
            max_limit_gauge: 100,
            bankai: Bankai {
                name: "Thunder Serpent Seal".to_string(),
                release_command: "Roar".to_string(),
                description: "test".to_string(),
                visual_color: "#eab308".to_string(),
                kind,
            },
        }
    }

    fn instant() -> BankaiKind {
        BankaiKind::Instant {
            damage_multiplier: 5.0,
        }
    }

    fn buff() -> BankaiKind {
        BankaiKind::Buff {
            strength: 20,
            endurance: 20,
        }
    }

    fn encounter(hp: u32, damage: u32) -> Encounter {
        Encounter::new(EncounterId(1), make_enemy(hp, damage))
    }

    /// Fire the pending follow-up, as the orchestrator would.
    fn resolve(enc: &mut Encounter, step: Step, tuning: &Tuning, rng: &mut StdRng) -> Step {
        let follow_up = step.follow_up.expect("expected a follow-up");
        enc.fire(follow_up.event, step.player, tuning, rng)
    }

    #[test]
    fn attack_damage_in_expected_range() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let mut enc = encounter(200, 25);
            let step = enc
                .act(PlayerAction::Attack, make_player(instant()), &tuning, &mut rng)
                .unwrap();
            assert!(enc.enemy_hp() > 180 && enc.enemy_hp() <= 185, "hp {}", enc.enemy_hp());
            assert_eq!(step.player.stamina, 80);
            assert_eq!(step.player.limit_gauge, 5);
            assert_eq!(enc.state(), TurnState::Resolving);
            let follow_up = step.follow_up.unwrap();
            assert_eq!(follow_up.delay_ms, 1000);
            assert_eq!(follow_up.event, CombatEvent::EnemyTurn { multiplier: 1.0 });
        }
    }

    #[test]
    fn attack_without_stamina_is_logged_noop() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.stamina = 19;
        let step = enc
            .act(PlayerAction::Attack, player.clone(), &tuning, &mut rng)
            .unwrap();
        assert_eq!(step.player, player);
        assert!(step.follow_up.is_none());
        assert_eq!(enc.enemy_hp(), 200);
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        assert_eq!(enc.log().last().unwrap(), "Not enough stamina to attack!");
    }

    #[test]
    fn actions_rejected_while_resolving() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut enc = encounter(200, 25);
        let step = enc
            .act(PlayerAction::Block, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        let err = enc
            .act(PlayerAction::Attack, step.player, &tuning, &mut rng)
            .unwrap_err();
        assert_eq!(err, CombatError::NotPlayerTurn(TurnState::Resolving));
    }

    #[test]
    fn enemy_turn_hits_and_regenerates() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut enc = encounter(200, 25);
        let step = enc
            .act(PlayerAction::Attack, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        assert_eq!(step.player.hp, 75);
        // 80 after the attack, +25 regen
        assert_eq!(step.player.stamina, 100);
        // 5 from the attack, 2 at the start of the enemy turn
        assert_eq!(step.player.limit_gauge, 7);
        assert_eq!(enc.enemy_stamina(), 80);
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        let effects = enc.drain_effects();
        assert_eq!(
            effects,
            vec![CombatEffect::Hit {
                damage: 25,
                shake: Shake::Medium
            }]
        );
        assert!(enc.drain_effects().is_empty());
    }

    #[test]
    fn block_reduces_damage_and_costs_stamina() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.stamina = 50;
        let step = enc
            .act(PlayerAction::Block, player, &tuning, &mut rng)
            .unwrap();
        assert!(enc.is_blocking());
        assert_eq!(step.player.stamina, 60);
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        // floor(25 * 0.2) = 5
        assert_eq!(step.player.hp, 95);
        // 60 - 30 + 25
        assert_eq!(step.player.stamina, 55);
        assert!(!enc.is_blocking());
        assert_eq!(enc.drain_effects(), vec![CombatEffect::Block]);
    }

    #[test]
    fn guard_break_when_block_cannot_be_paid() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(6);
        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.stamina = 10;
        let step = enc
            .act(PlayerAction::Block, player, &tuning, &mut rng)
            .unwrap();
        // 10 + 10 regen, still short of the 30 block cost
        assert_eq!(step.player.stamina, 20);
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        assert_eq!(step.player.hp, 75);
        // drained to 0, then the end-of-turn regen
        assert_eq!(step.player.stamina, 25);
        let effects = enc.drain_effects();
        assert_eq!(effects[0], CombatEffect::GuardBreak { damage: 25 });
    }

    #[test]
    fn buffed_block_halves_again() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut enc = encounter(200, 60);
        let mut player = make_player(buff());
        player.limit_gauge = 100;
        let step = enc
            .act(PlayerAction::Bankai, player, &tuning, &mut rng)
            .unwrap();
        assert!(enc.bankai_active());
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        assert!(step.follow_up.is_none());
        assert_eq!(step.player.limit_gauge, 0);

        let step = enc
            .act(PlayerAction::Block, step.player, &tuning, &mut rng)
            .unwrap();
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        // floor(floor(60 * 0.2) * 0.5) = 6
        assert_eq!(step.player.hp, 94);
    }

    #[test]
    fn buff_adds_strength_to_attacks() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut enc = encounter(500, 10);
        let mut player = make_player(buff());
        player.limit_gauge = 100;
        let step = enc
            .act(PlayerAction::Bankai, player, &tuning, &mut rng)
            .unwrap();
        enc.act(PlayerAction::Attack, step.player, &tuning, &mut rng)
            .unwrap();
        // 10 + 0.5 * (10 + 20) + [0, 5) = [25, 30)
        let dealt = 500 - enc.enemy_hp();
        assert!((25..30).contains(&dealt), "dealt {}", dealt);
    }

    #[test]
    fn instant_bankai_strikes_after_delay() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut enc = encounter(1000, 10);
        let mut player = make_player(instant());
        player.limit_gauge = 100;
        let step = enc
            .act(PlayerAction::Bankai, player, &tuning, &mut rng)
            .unwrap();
        assert_eq!(enc.state(), TurnState::Resolving);
        assert_eq!(enc.enemy_hp(), 1000);
        let follow_up = step.follow_up.clone().unwrap();
        assert_eq!(follow_up.delay_ms, 2000);
        // floor((50 + 2 * 10) * 5)
        assert_eq!(follow_up.event, CombatEvent::BankaiStrike { damage: 350 });

        let step = resolve(&mut enc, step, &tuning, &mut rng);
        assert_eq!(enc.enemy_hp(), 650);
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        assert!(step.follow_up.is_none());
        assert!(matches!(
            enc.drain_effects()[0],
            CombatEffect::BankaiRelease { .. }
        ));
    }

    #[test]
    fn bankai_requires_full_gauge() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(10);
        let mut enc = encounter(200, 10);
        let mut player = make_player(instant());
        player.limit_gauge = 99;
        let step = enc
            .act(PlayerAction::Bankai, player, &tuning, &mut rng)
            .unwrap();
        assert_eq!(step.player.limit_gauge, 99);
        assert!(step.follow_up.is_none());
        assert_eq!(enc.state(), TurnState::PlayerTurn);
    }

    #[test]
    fn successful_parry_keeps_the_turn() {
        let tuning = Tuning {
            parry_base_chance: 2.0,
            ..Tuning::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut enc = encounter(200, 25);
        let step = enc
            .act(PlayerAction::Parry, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        assert!(step.follow_up.is_none());
        assert_eq!(step.player.stamina, 75);
        assert_eq!(step.player.limit_gauge, 30);
        assert_eq!(enc.enemy_stamina(), 50);
        assert_eq!(enc.drain_effects(), vec![CombatEffect::ParrySuccess]);
    }

    #[test]
    fn failed_parry_invites_heavier_counter() {
        let tuning = Tuning {
            parry_base_chance: -1.0,
            ..Tuning::default()
        };
        let mut rng = StdRng::seed_from_u64(12);
        let mut enc = encounter(200, 25);
        let step = enc
            .act(PlayerAction::Parry, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        let follow_up = step.follow_up.clone().unwrap();
        assert_eq!(follow_up.delay_ms, 500);
        assert_eq!(follow_up.event, CombatEvent::EnemyTurn { multiplier: 1.5 });
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        // floor(25 * 1.5)
        assert_eq!(step.player.hp, 63);
    }

    #[test]
    fn dodge_outcomes() {
        let sure = Tuning {
            dodge_base_chance: 2.0,
            ..Tuning::default()
        };
        let mut rng = StdRng::seed_from_u64(13);
        let mut enc = encounter(200, 25);
        let step = enc
            .act(PlayerAction::Dodge, make_player(instant()), &sure, &mut rng)
            .unwrap();
        assert_eq!(enc.state(), TurnState::PlayerTurn);
        assert_eq!(step.player.stamina, 85);
        assert_eq!(step.player.limit_gauge, 10);
        assert_eq!(enc.enemy_stamina(), 85);

        let never = Tuning {
            dodge_base_chance: -1.0,
            ..Tuning::default()
        };
        let step = enc
            .act(PlayerAction::Dodge, step.player, &never, &mut rng)
            .unwrap();
        assert_eq!(enc.state(), TurnState::Resolving);
        assert_eq!(
            step.follow_up.unwrap().event,
            CombatEvent::EnemyTurn { multiplier: 1.0 }
        );
    }

    #[test]
    fn estus_heals_and_ends_turn() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(14);
        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.hp = 20;
        let step = enc
            .act(PlayerAction::DrinkEstus, player, &tuning, &mut rng)
            .unwrap();
        // 50 + 2 * 10
        assert_eq!(step.player.hp, 90);
        assert_eq!(step.player.estus, 4);
        assert!(step.follow_up.is_some());

        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.hp = 95;
        let step = enc
            .act(PlayerAction::DrinkEstus, player, &tuning, &mut rng)
            .unwrap();
        assert_eq!(step.player.hp, 100);
    }

    #[test]
    fn empty_flask_is_noop() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(15);
        let mut enc = encounter(200, 25);
        let mut player = make_player(instant());
        player.estus = 0;
        player.hp = 30;
        let step = enc
            .act(PlayerAction::DrinkEstus, player, &tuning, &mut rng)
            .unwrap();
        assert_eq!(step.player.hp, 30);
        assert!(step.follow_up.is_none());
        assert_eq!(enc.state(), TurnState::PlayerTurn);
    }

    #[test]
    fn tired_enemy_rests_instead_of_attacking() {
        let tuning = Tuning {
            parry_base_chance: 2.0,
            ..Tuning::default()
        };
        let mut rng = StdRng::seed_from_u64(16);
        let mut enc = encounter(500, 25);
        let mut player = make_player(instant());
        player.stamina = 100;
        // two parries: 100 -> 50 -> 0 enemy stamina
        let step = enc.act(PlayerAction::Parry, player, &tuning, &mut rng).unwrap();
        let step = enc
            .act(PlayerAction::Parry, step.player, &tuning, &mut rng)
            .unwrap();
        assert_eq!(enc.enemy_stamina(), 0);
        let step = enc
            .act(PlayerAction::Attack, step.player, &tuning, &mut rng)
            .unwrap();
        let hp_before = step.player.hp;
        let stamina_before = step.player.stamina;
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        assert_eq!(step.player.hp, hp_before);
        assert_eq!(step.player.stamina, stamina_before);
        assert_eq!(enc.enemy_stamina(), 40);
        assert_eq!(enc.state(), TurnState::PlayerTurn);
    }

    #[test]
    fn victory_processed_once() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(17);
        let mut enc = encounter(10, 25);
        let step = enc
            .act(PlayerAction::Attack, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        assert_eq!(enc.enemy_hp(), 0);
        assert_eq!(enc.state(), TurnState::Victory);
        // 500 xp: 100 + 120 + 144 consumed, 136 left, threshold 172
        assert_eq!(step.player.level, 4);
        assert_eq!(step.player.xp, 136);
        let follow_up = step.follow_up.clone().unwrap();
        assert_eq!(follow_up.delay_ms, 4500);

        let again = enc.check_outcome(step.player.clone(), &tuning);
        assert_eq!(again.player, step.player);
        assert!(again.follow_up.is_none());
        let again = enc.check_outcome(again.player, &tuning);
        assert_eq!(again.player.level, 4);

        let announced = enc.fire(follow_up.event, again.player, &tuning, &mut rng);
        assert_eq!(
            announced.signal,
            Some(CombatSignal::Victory {
                xp_awarded: 500,
                levels_gained: 3
            })
        );
    }

    #[test]
    fn lethal_hit_leads_to_defeat() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(18);
        let mut enc = encounter(500, 150);
        let step = enc
            .act(PlayerAction::Attack, make_player(instant()), &tuning, &mut rng)
            .unwrap();
        let step = resolve(&mut enc, step, &tuning, &mut rng);
        assert_eq!(step.player.hp, 0);
        assert_eq!(enc.state(), TurnState::Defeat);
        let follow_up = step.follow_up.clone().unwrap();
        assert_eq!(follow_up.delay_ms, 1500);
        let step = enc.fire(follow_up.event, step.player, &tuning, &mut rng);
        assert_eq!(step.signal, Some(CombatSignal::Defeat));
        assert!(enc
            .act(PlayerAction::Attack, step.player, &tuning, &mut rng)
            .is_err());
    }

    #[test]
    fn stray_events_are_ignored() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(19);
        let mut enc = encounter(200, 25);
        let player = make_player(instant());
        let step = enc.fire(
            CombatEvent::EnemyTurn { multiplier: 1.0 },
            player.clone(),
            &tuning,
            &mut rng,
        );
        assert_eq!(step.player, player);
        let announce = CombatEvent::AnnounceVictory {
            xp_awarded: 1,
            levels_gained: 0,
        };
        let step = enc.fire(announce, step.player, &tuning, &mut rng);
        assert!(step.signal.is_none());
    }

    #[test]
    fn unarmed_fallback_damage() {
        let tuning = Tuning::default();
        let mut rng = StdRng::seed_from_u64(20);
        let mut enc = encounter(100, 25);
        let mut player = make_player(instant());
        player.equipped_weapon = "Nothing".to_string();
        enc.act(PlayerAction::Attack, player, &tuning, &mut rng)
            .unwrap();
        // 5 + 0 + [0, 5)
        assert!(enc.enemy_hp() > 90 && enc.enemy_hp() <= 95);
        assert!(enc.log().last().unwrap().contains("Fists"));
    }

    #[test]
    fn shake_thresholds() {
        assert_eq!(Shake::for_damage(15), Shake::Light);
        assert_eq!(Shake::for_damage(16), Shake::Medium);
        assert_eq!(Shake::for_damage(41), Shake::Heavy);
    }

    #[test]
    fn action_parse() {
        assert_eq!(PlayerAction::parse("ATTACK"), Some(PlayerAction::Attack));
        assert_eq!(PlayerAction::parse("e"), Some(PlayerAction::DrinkEstus));
        assert_eq!(PlayerAction::parse("flee"), None);
        for action in PlayerAction::ALL {
            assert_eq!(PlayerAction::parse(action.name()), Some(action));
        }
    }
}
