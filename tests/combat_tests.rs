/// Statistical and property-style checks of the combat engine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kiln_saga::core::combat::{
    CombatEffect, Encounter, EncounterId, PlayerAction, Step, TurnState,
};
use kiln_saga::core::content::ContentSet;
use kiln_saga::core::progression::generate_bankai;
use kiln_saga::core::tuning::Tuning;
use kiln_saga::schema::player::PlayerState;

fn fresh_player(seed: u64) -> PlayerState {
    let content = ContentSet::builtin().unwrap();
    content.initial_player(generate_bankai(&mut StdRng::seed_from_u64(seed)))
}

fn celebi() -> kiln_saga::schema::enemy::Enemy {
    ContentSet::builtin().unwrap().enemy("celebi").unwrap().clone()
}

fn parry_rate(dexterity: u32, trials: u32, seed: u64) -> f64 {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut player = fresh_player(1);
    player.stats.dexterity = dexterity;
    let enemy = celebi();

    let mut successes = 0;
    for i in 0..trials {
        let mut encounter = Encounter::new(EncounterId(i as u64), enemy.clone());
        encounter
            .act(PlayerAction::Parry, player.clone(), &tuning, &mut rng)
            .unwrap();
        // a successful parry keeps the turn
        if encounter.state() == TurnState::PlayerTurn {
            successes += 1;
        }
    }
    successes as f64 / trials as f64
}

#[test]
fn parry_rate_matches_formula() {
    let at_zero = parry_rate(0, 5000, 31);
    assert!((at_zero - 0.30).abs() < 0.03, "dex 0 parry rate {}", at_zero);

    let at_ten = parry_rate(10, 5000, 32);
    assert!((at_ten - 0.40).abs() < 0.03, "dex 10 parry rate {}", at_ten);
}

#[test]
fn dagger_bonus_raises_parry_rate() {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(77);
    let mut player = fresh_player(2);
    player.equipped_weapon = "Bandit's Knife".to_string();
    let enemy = celebi();

    let trials = 4000;
    let mut successes = 0;
    for i in 0..trials {
        let mut encounter = Encounter::new(EncounterId(i), enemy.clone());
        encounter
            .act(PlayerAction::Parry, player.clone(), &tuning, &mut rng)
            .unwrap();
        if encounter.state() == TurnState::PlayerTurn {
            successes += 1;
        }
    }
    // 0.30 + 0.10 + 0.25
    let rate = successes as f64 / trials as f64;
    assert!((rate - 0.65).abs() < 0.03, "dagger parry rate {}", rate);
}

#[test]
fn attack_damage_band_against_full_health_boss() {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(8);
    for i in 0..500 {
        let mut encounter = Encounter::new(EncounterId(i), celebi());
        encounter
            .act(PlayerAction::Attack, fresh_player(3), &tuning, &mut rng)
            .unwrap();
        assert!((181..=185).contains(&encounter.enemy_hp()));
    }
}

/// Drive a whole fight with random actions, firing follow-ups at once.
fn random_fight(seed: u64) -> (Encounter, PlayerState) {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut player = fresh_player(seed);
    let mut encounter = Encounter::new(EncounterId(seed), celebi());
    let mut last_hp = encounter.enemy_hp();

    for _ in 0..400 {
        if encounter.state().is_terminal() {
            break;
        }
        let action = PlayerAction::ALL[rng.gen_range(0..PlayerAction::ALL.len())];
        let mut step: Step = encounter
            .act(action, player, &tuning, &mut rng)
            .unwrap();
        while let Some(follow_up) = step.follow_up.take() {
            step = encounter.fire(follow_up.event, step.player, &tuning, &mut rng);
        }
        player = step.player;

        assert!(encounter.enemy_hp() <= last_hp, "enemy hp went up");
        assert!(player.hp <= player.max_hp);
        assert!(player.stamina <= player.max_stamina);
        assert!(player.limit_gauge <= player.max_limit_gauge);
        last_hp = encounter.enemy_hp();
    }
    (encounter, player)
}

#[test]
fn random_fights_keep_invariants() {
    for seed in 0..40 {
        let (encounter, player) = random_fight(seed);
        match encounter.state() {
            TurnState::Victory => assert_eq!(encounter.enemy_hp(), 0),
            TurnState::Defeat => assert!(player.is_dead()),
            other => assert!(!other.is_terminal()),
        }
    }
}

#[test]
fn guard_break_whenever_block_is_unaffordable() {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(12);
    for stamina in 0..20 {
        let mut player = fresh_player(4);
        player.stamina = stamina;
        let mut encounter = Encounter::new(EncounterId(1), celebi());
        let step = encounter
            .act(PlayerAction::Block, player, &tuning, &mut rng)
            .unwrap();
        let follow_up = step.follow_up.unwrap();
        let step = encounter.fire(follow_up.event, step.player, &tuning, &mut rng);
        assert_eq!(step.player.hp, 75);
        assert_eq!(step.player.stamina, tuning.player_turn_regen);
    }
}

fn block_from(stamina: u32, seed: u64) -> (Step, Vec<CombatEffect>) {
    let tuning = Tuning::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut player = fresh_player(4);
    player.stamina = stamina;
    let mut encounter = Encounter::new(EncounterId(1), celebi());
    let step = encounter
        .act(PlayerAction::Block, player, &tuning, &mut rng)
        .unwrap();
    let follow_up = step.follow_up.unwrap();
    let step = encounter.fire(follow_up.event, step.player, &tuning, &mut rng);
    (step, encounter.drain_effects())
}

#[test]
fn block_cost_boundary() {
    let tuning = Tuning::default();

    // 19 + 10 regen is one short of the cost
    let (step, effects) = block_from(19, 31);
    assert_eq!(step.player.hp, 75);
    assert_eq!(step.player.stamina, tuning.player_turn_regen);
    assert!(effects.contains(&CombatEffect::GuardBreak { damage: 25 }));
    assert!(!effects.contains(&CombatEffect::Block));

    // 20 + 10 pays exactly 30, leaving 0 before the end-of-turn regen
    let (step, effects) = block_from(20, 31);
    assert_eq!(step.player.hp, 95);
    assert_eq!(step.player.stamina, tuning.player_turn_regen);
    assert_eq!(effects, vec![CombatEffect::Block]);
}
