use std::collections::BTreeMap;
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use dialoguer::{theme::ColorfulTheme, Select};

use gd_data::ContentRegistry;
use gd_engine::fingerprint::daily_seed;
use gd_engine::save::{save_document, to_json};
use gd_engine::setup::{create_run, RunConfig};
use gd_engine::Engine;
use gd_types::action::{Action, ActionRecord, RewardPick};
use gd_types::event::EventKind;
use gd_types::state::{Encounter, GameState};
use gd_types::{ErrorKind, GameEvent, Mutator, RestOption};

mod autoplay;
mod packs;
mod repo;

const EXIT_OK: u8 = 0;
const EXIT_BAD_ARGS: u8 = 2;
const EXIT_PACK_ERROR: u8 = 3;
const EXIT_REPO_ERROR: u8 = 4;

struct Args {
    repo: PathBuf,
    seed: Option<u32>,
    mutator: Mutator,
    packs: Vec<String>,
    lang: String,
    auto: bool,
    metrics: bool,
    daily: bool,
    daily_date: Option<String>,
    max_commits: usize,
    save_path: Option<PathBuf>,
}

fn usage() -> &'static str {
    "usage: gd-cli <repo-path> [options]\n\
     \n\
     options:\n\
       --seed <n>          root seed (default 42)\n\
       --mutator <tag>     difficulty preset: none | hard\n\
       --pack <ref>        content pack directory (repeatable)\n\
       --lang <tag>        UI language tag (display only)\n\
       --auto              let the advisory policy play\n\
       --metrics           print an event summary at the end\n\
       --daily             derive the seed from today's date\n\
       --daily-date <d>    daily challenge date (YYYY-MM-DD)\n\
       --max-commits <n>   commit cap (default 2000)\n\
       --save <path>       write the final save document here"
}

fn parse_args() -> Result<Args, String> {
    let argv: Vec<String> = env::args().skip(1).collect();
    let mut args = Args {
        repo: PathBuf::new(),
        seed: None,
        mutator: Mutator::None,
        packs: Vec::new(),
        lang: "en".to_owned(),
        auto: false,
        metrics: false,
        daily: false,
        daily_date: None,
        max_commits: gd_engine::setup::DEFAULT_COMMIT_CAP,
        save_path: None,
    };

    let mut positional = None;
    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        let value = |i: &mut usize| -> Result<String, String> {
            *i += 1;
            argv.get(*i).cloned().ok_or_else(|| format!("{arg} needs a value"))
        };
        match arg {
            "-h" | "--help" => return Err(String::new()),
            "--seed" | "-s" => {
                let raw = value(&mut i)?;
                args.seed = Some(raw.parse().map_err(|_| format!("bad seed: {raw}"))?);
            }
            "--mutator" => {
                let raw = value(&mut i)?;
                args.mutator =
                    Mutator::parse(&raw).ok_or_else(|| format!("unknown mutator: {raw}"))?;
            }
            "--pack" => args.packs.push(value(&mut i)?),
            "--lang" => args.lang = value(&mut i)?,
            "--auto" => args.auto = true,
            "--metrics" => args.metrics = true,
            "--daily" => args.daily = true,
            "--daily-date" => args.daily_date = Some(value(&mut i)?),
            "--max-commits" => {
                let raw = value(&mut i)?;
                args.max_commits = raw.parse().map_err(|_| format!("bad commit cap: {raw}"))?;
            }
            "--save" => args.save_path = Some(PathBuf::from(value(&mut i)?)),
            _ if positional.is_none() && !arg.starts_with('-') => {
                positional = Some(PathBuf::from(arg));
            }
            _ => return Err(format!("unknown argument: {arg}")),
        }
        i += 1;
    }

    args.repo = positional.ok_or_else(|| "missing repository path".to_owned())?;
    Ok(args)
}

fn now_epoch() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs() as i64)
}

/// Civil date for a unix timestamp, as `YYYY-MM-DD` (UTC).
fn civil_date(epoch_secs: i64) -> String {
    let days = epoch_secs.div_euclid(86_400);
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };
    format!("{year:04}-{month:02}-{day:02}")
}

fn describe_event(event: &GameEvent) -> Option<String> {
    let line = match &event.kind {
        EventKind::ChapterStarted { chapter_index, chapter_type, enemy_count, .. } => {
            format!("== Chapter {} ({:?}) - {enemy_count} commits", chapter_index + 1, chapter_type)
        }
        EventKind::ChapterCompleted { chapter_index, gold_reward, exp_reward, .. } => {
            format!("== Chapter {} cleared (+{gold_reward}g +{exp_reward}xp)", chapter_index + 1)
        }
        EventKind::BattleStarted { enemy_name, enemy_hp, is_boss, .. } => {
            let tag = if *is_boss { " [BOSS]" } else { "" };
            format!("!! {enemy_name}{tag} ({enemy_hp} hp)")
        }
        EventKind::BattleEnded { result } => format!("-- battle ended: {result:?}"),
        EventKind::EnemyIntentRevealed { intent } => {
            format!("   intent: {:?} {}", intent.kind, intent.value)
        }
        EventKind::DamageDealt { source, target, amount, .. } => {
            format!("   {source} hits {target} for {amount}")
        }
        EventKind::CardPlayed { card, cost } => format!("   played {card} (cost {cost})"),
        EventKind::GoldGained { amount, reason } => format!("   +{amount} gold ({reason})"),
        EventKind::LevelUp { new_level, .. } => format!("   LEVEL UP -> {new_level}"),
        EventKind::EventResolved { event, choice_id, messages, .. } => {
            format!("   event {event}/{choice_id}: {}", messages.join(", "))
        }
        EventKind::GameEnded { result, enemies_defeated } => {
            format!("** run over: {result} ({enemies_defeated} enemies defeated)")
        }
        EventKind::Error { message, .. } => format!("   !! {message}"),
        _ => return None,
    };
    Some(line)
}

fn interactive_action(state: &GameState, registry: &ContentRegistry) -> Action {
    let theme = ColorfulTheme::default();

    if state.pending_reward.is_some() {
        let reward = state.pending_reward.as_ref().unwrap();
        let mut items: Vec<String> =
            reward.card_choices.iter().map(|c| format!("take card {c}")).collect();
        if reward.relic.is_some() {
            items.push("take the relic".to_owned());
        }
        if reward.heal > 0 {
            items.push(format!("heal {}", reward.heal));
        }
        items.push("skip".to_owned());
        let pick = Select::with_theme(&theme)
            .with_prompt("Reward")
            .items(&items)
            .default(0)
            .interact()
            .unwrap_or(items.len() - 1);
        let cards = reward.card_choices.len();
        let relic_slot = if reward.relic.is_some() { cards } else { usize::MAX };
        let heal_slot = cards + usize::from(reward.relic.is_some());
        return Action::PickReward {
            pick: if pick < cards {
                RewardPick::Card { index: pick }
            } else if pick == relic_slot {
                RewardPick::Relic
            } else if pick == heal_slot && reward.heal > 0 {
                RewardPick::Heal
            } else {
                RewardPick::Skip
            },
        };
    }

    match &state.encounter {
        Some(Encounter::Battle(_)) if !state.in_combat => Action::StartCombat,
        Some(Encounter::Battle(battle)) => {
            let hp = state.player.character.current_hp;
            let energy = state.player.energy.current;
            let mut items: Vec<String> = battle
                .deck
                .hand
                .iter()
                .map(|c| {
                    let cost = registry.card(&c.card).map_or(0, |d| d.cost);
                    format!("play {} (cost {cost})", c.card)
                })
                .collect();
            items.push("defend".to_owned());
            items.push("end turn".to_owned());
            items.push("escape".to_owned());
            let prompt = format!("hp {hp} | energy {energy} | enemy {}", battle.enemy.current_hp);
            let pick = Select::with_theme(&theme)
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact()
                .unwrap_or(items.len() - 2);
            let hand = battle.deck.hand.len();
            if pick < hand {
                Action::PlayCard { hand_index: pick }
            } else if pick == hand {
                Action::Defend
            } else if pick == hand + 1 {
                Action::EndTurn
            } else {
                Action::Escape
            }
        }
        Some(Encounter::Event(encounter)) => {
            let items: Vec<String> = registry
                .event(&encounter.event)
                .map(|e| e.choices.iter().map(|c| c.id.to_string()).collect())
                .unwrap_or_else(|| vec!["continue".to_owned()]);
            let pick = Select::with_theme(&theme)
                .with_prompt(format!("Event: {}", encounter.event))
                .items(&items)
                .default(0)
                .interact()
                .unwrap_or(0);
            Action::EventChoice { choice_index: pick }
        }
        Some(Encounter::Shop(shop)) => {
            let mut items: Vec<String> = shop
                .offers
                .iter()
                .map(|o| format!("{} ({}g)", o.label, o.cost))
                .collect();
            items.push("leave".to_owned());
            let pick = Select::with_theme(&theme)
                .with_prompt(format!("Shop | {}g", state.player.gold))
                .items(&items)
                .default(items.len() - 1)
                .interact()
                .unwrap_or(items.len() - 1);
            if pick < shop.offers.len() {
                Action::ShopBuy { offer_id: shop.offers[pick].id.clone() }
            } else {
                Action::ShopSkip
            }
        }
        Some(Encounter::Rest) => {
            let pick = Select::with_theme(&theme)
                .with_prompt("Rest")
                .items(&["heal", "focus"])
                .default(0)
                .interact()
                .unwrap_or(0);
            Action::RestChoice {
                option: if pick == 0 { RestOption::Heal } else { RestOption::Focus },
            }
        }
        None => Action::AdvanceNode,
    }
}

fn run() -> u8 {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            if message.is_empty() {
                println!("{}", usage());
                return EXIT_OK;
            }
            eprintln!("error: {message}\n\n{}", usage());
            return EXIT_BAD_ARGS;
        }
    };

    let registry = match packs::load_registry(&args.packs, env::var("GIT_DUNGEON_CONTENT_DIR").ok().as_deref()) {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("content pack error: {err}");
            return EXIT_PACK_ERROR;
        }
    };

    let commits = match repo::read_commits(&args.repo) {
        Ok(commits) => commits,
        Err(err) => {
            eprintln!("repository error: {err}");
            return EXIT_REPO_ERROR;
        }
    };

    let daily_date = if args.daily || args.daily_date.is_some() {
        Some(args.daily_date.clone().unwrap_or_else(|| civil_date(now_epoch())))
    } else {
        None
    };
    let seed = match &daily_date {
        Some(date) => daily_seed(date),
        None => args.seed.unwrap_or(42),
    };

    let config = RunConfig {
        seed,
        mutator: args.mutator,
        character: None,
        daily_date: daily_date.as_deref().map(Into::into),
        commit_cap: args.max_commits,
    };
    let created_at = now_epoch();
    let (mut state, events) = match create_run(&registry, commits, &config, created_at) {
        Ok(result) => result,
        Err(err) if err.kind == ErrorKind::ContentValidation => {
            eprintln!("content error: {err}");
            return EXIT_PACK_ERROR;
        }
        Err(err) => {
            eprintln!("repository error: {err}");
            return EXIT_REPO_ERROR;
        }
    };

    let tagline = if args.lang.starts_with("zh") { "用提交历史冒险" } else { "Battle through your commits!" };
    println!("=============================");
    println!("  G I T   D U N G E O N");
    println!("  {tagline}");
    println!("=============================");
    println!("run {} | seed {seed} | mutator {}", state.run_id, state.mutator.key());
    if let Some(date) = &daily_date {
        println!("daily challenge {date}");
    }

    let interactive = !args.auto && std::io::stdin().is_terminal();
    let mut action_log: Vec<ActionRecord> = Vec::new();
    let mut all_events = events;
    for event in &all_events {
        if let Some(line) = describe_event(event) {
            println!("{line}");
        }
    }

    while !state.is_game_over {
        let action = if interactive {
            interactive_action(&state, &registry)
        } else {
            autoplay::choose_action(&state, &registry)
        };
        let record = ActionRecord { action, at: now_epoch() };
        let (next, events) = Engine::apply(state, &registry, &record);
        state = next;
        for event in &events {
            if let Some(line) = describe_event(event) {
                println!("{line}");
            }
        }
        action_log.push(record);
        all_events.extend(events);
    }

    if let Some(path) = &args.save_path {
        let doc = save_document(&state, &action_log, created_at, daily_date.as_deref());
        if let Err(err) = std::fs::write(path, to_json(&doc)) {
            eprintln!("could not write save: {err}");
        } else {
            println!("save written to {}", path.display());
        }
    }

    if args.metrics {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for event in &all_events {
            let value = serde_json::to_value(event).expect("events serialise");
            if let Some(tag) = value.get("type").and_then(|t| t.as_str()) {
                *counts.entry(tag.to_owned()).or_insert(0) += 1;
            }
        }
        println!("\nevent summary:");
        for (kind, count) in counts {
            println!("  {kind:<24} {count}");
        }
    }

    println!(
        "\n{} | level {} | {} gold | {} enemies defeated",
        if state.is_victory { "VICTORY" } else { "DEFEAT" },
        state.player.character.level,
        state.player.gold,
        state.enemies_defeated.len()
    );
    EXIT_OK
}

fn main() -> ExitCode {
    ExitCode::from(run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civil_dates_are_correct() {
        assert_eq!(civil_date(0), "1970-01-01");
        assert_eq!(civil_date(86_400), "1970-01-02");
        assert_eq!(civil_date(1_700_000_000), "2023-11-14");
    }
}
