/// Play — interactive terminal shell for running a story.
///
/// Usage: play [--content <dir>] [--tuning <file>] [--seed <n>]
///
/// Commands:
///   <n>                 — take choice n of the current scene
///   attack|block|parry|dodge|estus|bankai — combat actions (a/b/p/d/e/k)
///   wait [ms]           — advance the clock (default: until idle)
///   stats               — show the player
///   spend <stat>        — spend an attribute point (vit/end/str/dex)
///   equip <name>        — equip a weapon from the inventory
///   codex [id]          — list unlocked entries or read one
///   prompt <id>         — show the image prompt for a codex entry or enemy
///   restart             — start the run over
///   help                — list commands
///   quit                — exit
use kiln_saga::core::codex::{self, TextSpan};
use kiln_saga::core::combat::{CombatEffect, PlayerAction};
use kiln_saga::core::game::{Game, GameEvent, Phase};
use kiln_saga::core::imagery::ImageTarget;
use kiln_saga::schema::player::Stat;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_usage();
        return;
    }

    let mut content_dir = None;
    let mut tuning_path = None;
    let mut seed = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_dir = Some(args[i].clone());
            }
            "--tuning" if i + 1 < args.len() => {
                i += 1;
                tuning_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                match args[i].parse::<u64>() {
                    Ok(n) => seed = Some(n),
                    Err(_) => {
                        eprintln!("Invalid seed: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = Game::builder();
    if let Some(dir) = content_dir {
        builder = builder.content_dir(dir);
    }
    if let Some(path) = tuning_path {
        builder = builder.tuning_file(path);
    }
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }
    let mut game = match builder.build() {
        Ok(game) => game,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("=== {} ===", game.content().story.title);
    println!("Your Bankai: {}", game.player().bankai.name);
    println!("Type 'help' for commands.\n");
    report(&mut game);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let prompt = match game.phase() {
            Phase::Story => "story> ",
            Phase::Combat => "combat> ",
            Phase::GameOver => "dead> ",
        };
        print!("{}", prompt);
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        if let Ok(n) = cmd.parse::<usize>() {
            if let Err(e) = game.choose(n) {
                println!("ERROR: {}", e);
            }
            report(&mut game);
            continue;
        }

        if let Some(action) = PlayerAction::parse(&cmd) {
            match game.act(action) {
                Ok(()) => {
                    drain(&mut game);
                    game.run_until_idle();
                    report(&mut game);
                }
                Err(e) => println!("ERROR: {}", e),
            }
            continue;
        }

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("The flame fades.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
            }
            "wait" | "advance" => {
                let fired = match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                    Some(ms) => game.advance(ms),
                    None => game.run_until_idle(),
                };
                println!("({} events fired, t={}ms)", fired, game.now_ms());
                report(&mut game);
            }
            "stats" | "s" => {
                print_stats(&game);
            }
            "spend" => {
                let Some(stat) = parts.get(1).and_then(|s| Stat::parse(s)) else {
                    println!("Usage: spend <vit|end|str|dex>");
                    continue;
                };
                match game.spend_attribute_point(stat) {
                    Ok(()) => println!(
                        "{} is now {} ({} points left)",
                        stat.name(),
                        game.player().stats.get(stat),
                        game.player().attribute_points
                    ),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "equip" => {
                if parts.len() < 2 {
                    println!("Usage: equip <weapon name>");
                    for item in game.player().inventory.iter().filter(|i| i.is_weapon()) {
                        println!("  {}", item.name);
                    }
                    continue;
                }
                let name = parts[1..].join(" ");
                match game.equip(&name) {
                    Ok(()) => println!("Equipped {}.", game.player().equipped_weapon),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "codex" | "c" => {
                print_codex(&game, parts.get(1).copied());
            }
            "prompt" => {
                let Some(id) = parts.get(1) else {
                    println!("Usage: prompt <codex or enemy id>");
                    continue;
                };
                let target = if game.content().enemy(id).is_some() {
                    ImageTarget::Enemy(id.to_string())
                } else {
                    ImageTarget::Codex(id.to_string())
                };
                match game.image_request(&target) {
                    Ok(request) => println!("{}", request.prompt),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "restart" => {
                game.restart();
                report(&mut game);
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn print_usage() {
    println!("Usage: play [--content <dir>] [--tuning <file>] [--seed <n>]");
    println!();
    println!("Without --content the built-in story is used.");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>                  Take choice n");
    println!("  attack|block|parry|dodge|estus|bankai");
    println!("                       Combat actions (a/b/p/d/e/k)");
    println!("  wait [ms]            Advance the clock (default: until idle)");
    println!("  stats                Show the player");
    println!("  spend <stat>         Spend an attribute point (vit/end/str/dex)");
    println!("  equip <name>         Equip a weapon by name");
    println!("  codex [id]           List unlocked entries or read one");
    println!("  prompt <id>          Show the image prompt for a codex entry or enemy");
    println!("  restart              Start the run over");
    println!("  quit                 Exit");
}

/// Print pending events, then whatever the current phase shows.
fn report(game: &mut Game) {
    drain(game);
    match game.phase() {
        Phase::Story => print_scene(game),
        Phase::Combat => print_combat(game),
        Phase::GameOver => {
            println!("\n    YOU DIED\n");
            println!("Type 'restart' to try again.");
        }
    }
}

fn drain(game: &mut Game) {
    for event in game.drain_events() {
        match event {
            GameEvent::EncounterStarted { enemy } => {
                println!("\n>>> {} blocks the way!", enemy);
            }
            GameEvent::Combat(effect) => print_effect(&effect),
            GameEvent::Victory {
                xp_awarded,
                levels_gained,
            } => {
                println!("\n    VICTORY ACHIEVED (+{} xp)", xp_awarded);
                if levels_gained > 0 {
                    println!(
                        "    Level up! {} attribute point(s) to spend.",
                        game.player().attribute_points
                    );
                }
            }
            GameEvent::Notice(text) => println!("* {}", text),
            GameEvent::ImageStored(target) => println!("* Image stored for {}", target.id()),
            GameEvent::PhaseChanged(_) | GameEvent::SceneEntered(_) | GameEvent::Defeat => {}
        }
    }
}

fn print_effect(effect: &CombatEffect) {
    match effect {
        CombatEffect::ParrySuccess => println!("  ~ PARRY! ~"),
        CombatEffect::Block => println!("  ~ blocked ~"),
        CombatEffect::Dodge => println!("  ~ dodged ~"),
        CombatEffect::Hit { damage, shake } => println!("  ~ hit for {} ({:?}) ~", damage, shake),
        CombatEffect::GuardBreak { damage } => println!("  ~ GUARD BROKEN, {} damage ~", damage),
        CombatEffect::BankaiRelease { color } => println!("  ~ the air turns {} ~", color),
    }
}

fn print_scene(game: &Game) {
    let Some(scene) = game.scene() else {
        println!("ERROR: scene '{}' is missing", game.scene_id());
        return;
    };

    println!();
    if let Some(speaker) = &scene.speaker {
        println!("[{}]", speaker);
        if let Some(summary) = codex::speaker_summary(game.content(), game.player(), speaker) {
            println!("  ({})", summary);
        }
    }

    let mut notes: Vec<(&str, &str)> = Vec::new();
    for paragraph in &scene.text {
        let mut rendered = String::new();
        for span in codex::annotate(paragraph, game.content().tooltips()) {
            match span {
                TextSpan::Plain(text) => rendered.push_str(text),
                TextSpan::Keyword { text, key, tooltip } => {
                    rendered.push('[');
                    rendered.push_str(text);
                    rendered.push(']');
                    if !notes.iter().any(|(k, _)| *k == key) {
                        notes.push((key, tooltip));
                    }
                }
            }
        }
        println!("{}\n", rendered);
    }
    for (key, tooltip) in &notes {
        println!("  [{}] {}", key, tooltip);
    }
    if !notes.is_empty() {
        println!();
    }

    for (index, choice) in game.available_choices() {
        println!("  {}. {}", index, choice.text);
    }
}

fn print_combat(game: &Game) {
    let Some(encounter) = game.encounter() else {
        return;
    };
    let enemy = encounter.enemy();
    let player = game.player();
    println!();
    for line in encounter.log().iter().rev().take(4).rev() {
        println!("  {}", line);
    }
    println!(
        "{}: {}/{} hp, {}/{} stamina",
        enemy.name, encounter.enemy_hp(), enemy.max_hp, encounter.enemy_stamina(), enemy.max_stamina
    );
    println!(
        "You: {}/{} hp, {}/{} stamina, {} estus, limit {}/{}{}",
        player.hp,
        player.max_hp,
        player.stamina,
        player.max_stamina,
        player.estus,
        player.limit_gauge,
        player.max_limit_gauge,
        if encounter.bankai_active() { " (BANKAI)" } else { "" }
    );
    let actions: Vec<&str> = PlayerAction::ALL.iter().map(|a| a.name()).collect();
    println!("Actions: {}", actions.join(", "));
}

fn print_stats(game: &Game) {
    let player = game.player();
    let (weapon, stats) = player.weapon();
    println!("{} (level {})", player.name, player.level);
    println!(
        "  hp {}/{}  stamina {}/{}  estus {}",
        player.hp, player.max_hp, player.stamina, player.max_stamina, player.estus
    );
    println!(
        "  xp {}/{}  attribute points {}",
        player.xp, player.xp_to_next_level, player.attribute_points
    );
    for stat in Stat::ALL {
        println!("  {:<10} {}", stat.name(), player.stats.get(stat));
    }
    println!(
        "  weapon: {} ({} dmg, {} scaling)",
        weapon,
        stats.damage,
        stats.scaling.label()
    );
    println!(
        "  bankai: {} ({})",
        player.bankai.name, player.bankai.release_command
    );
}

fn print_codex(game: &Game, id: Option<&str>) {
    match id {
        Some(id) => {
            if !codex::is_visible(game.player(), id) {
                println!("No unlocked entry named '{}'.", id);
                return;
            }
            let Some(entry) = game.content().codex_entry(id) else {
                println!("No entry named '{}'.", id);
                return;
            };
            println!("\n== {} ({}) ==", entry.title, entry.category.label());
            for paragraph in &entry.content {
                println!("{}\n", paragraph);
            }
            if game.player().codex_images.contains_key(id) {
                println!("(image stored)");
            }
        }
        None => {
            let entries = codex::visible_entries(game.content(), game.player(), None);
            if entries.is_empty() {
                println!("The codex is empty.");
            }
            for entry in entries {
                println!("  {:<12} {} [{}]", entry.id, entry.title, entry.category.label());
            }
        }
    }
}
