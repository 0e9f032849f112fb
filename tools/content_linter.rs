/// Content Linter — validates a story pack and reports likely content mistakes.
///
/// Usage: content_linter [<pack_dir>] [--tuning <file>]
///
/// Without a directory the built-in pack is checked.

use kiln_saga::core::content::ContentSet;
use kiln_saga::core::tuning::Tuning;
use kiln_saga::schema::scene::Transform;
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;
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
        println!("Usage: content_linter [<pack_dir>] [--tuning <file>]");
        process::exit(0);
    }

    let mut pack_dir = None;
    let mut tuning_path = None;

    let mut i = 1;
    while i < args.len() {
        if args[i] == "--tuning" && i + 1 < args.len() {
            i += 1;
            tuning_path = Some(args[i].clone());
        } else if pack_dir.is_none() {
            pack_dir = Some(args[i].clone());
        } else {
            eprintln!("ERROR: Unexpected argument '{}'", args[i]);
            process::exit(1);
        }
        i += 1;
    }

    let loaded = match &pack_dir {
        Some(dir) => {
            let path = Path::new(dir);
            if !path.is_dir() {
                eprintln!("ERROR: Path '{}' is not a directory", dir);
                process::exit(1);
            }
            ContentSet::load_from_dir(path)
        }
        None => ContentSet::builtin(),
    };
    let content = match loaded {
        Ok(content) => content,
        Err(e) => {
            eprintln!("ERROR: Failed to load content: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded '{}': {} scenes",
        content.story.title,
        content.scene_count()
    );

    let (mut errors, warnings) = lint_content(&content);

    if let Some(path) = &tuning_path {
        match Tuning::load_from_ron(Path::new(path)) {
            Ok(_) => println!("Tuning file '{}' is valid", path),
            Err(e) => errors.push(format!("Tuning file '{}': {}", path, e)),
        }
    }

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_unlocks<'a>(transform: &'a Transform, out: &mut FxHashSet<&'a str>) {
    match transform {
        Transform::UnlockCodex(id) => {
            out.insert(id.as_str());
        }
        Transform::All(transforms) => {
            for t in transforms {
                collect_unlocks(t, out);
            }
        }
        _ => {}
    }
}

fn lint_content(content: &ContentSet) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for id in content.unreachable_scenes() {
        warnings.push(format!("Scene '{}' is unreachable from the start scene", id));
    }

    let mut unlocked: FxHashSet<&str> = FxHashSet::default();
    let mut all_text = String::new();

    for id in content.scene_ids() {
        let Some(scene) = content.scene(id) else {
            continue;
        };

        if scene.choices.is_empty() && !scene.has_encounter() {
            warnings.push(format!("Scene '{}' has no choices (dead end)", id));
        }
        if scene.has_encounter() && scene.victory_scene.is_none() && scene.choices.is_empty() {
            warnings.push(format!(
                "Scene '{}' has an encounter but no victory scene or choice; victory returns to the start",
                id
            ));
        }
        if let Some(enemy) = scene.encounter.as_deref().and_then(|e| content.enemy(e)) {
            if enemy.hp > enemy.max_hp || enemy.stamina > enemy.max_stamina {
                errors.push(format!(
                    "Enemy '{}' starts above its maximum hp or stamina",
                    enemy.id
                ));
            }
        }
        if scene.text.is_empty() {
            warnings.push(format!("Scene '{}' has no text", id));
        }

        for choice in &scene.choices {
            if let Some(transform) = &choice.transform {
                collect_unlocks(transform, &mut unlocked);
            }
        }

        for paragraph in &scene.text {
            all_text.push_str(&paragraph.to_lowercase());
            all_text.push('\n');
        }
    }

    for entry in content.codex_entries() {
        if !unlocked.contains(entry.id.as_str()) {
            warnings.push(format!(
                "Codex entry '{}' is never unlocked by any choice",
                entry.id
            ));
        }
        if entry.content.is_empty() {
            warnings.push(format!("Codex entry '{}' has no paragraphs", entry.id));
        }
    }

    for keyword in content.tooltips().keys() {
        if !all_text.contains(&keyword.to_lowercase()) {
            warnings.push(format!(
                "Tooltip keyword '{}' never appears in scene text",
                keyword
            ));
        }
    }

    (errors, warnings)
}
