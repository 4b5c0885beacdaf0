//! Random game data for the mock server and for tests.
//!
//! Every generator takes the RNG explicitly so tests can seed it. The
//! shapes match what [`DataStore`](crate::store::DataStore) accepts inside
//! `player_update`, `world_update`, `token_usage_update` and `tasks_list`
//! frames.

// ============================================================================
// Imports
// ============================================================================

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use serde_json::{Map, Value, json};

use crate::transport::now_ms;

// ============================================================================
// Data Pools
// ============================================================================

const PLAYER_NAMES: &[&str] = &[
    "Steve", "Alex", "Herobrine", "Notch", "Jeb", "Dinnerbone", "EvilMai", "Builder", "Explorer",
    "Miner", "Farmer",
];

const GAME_MODES: &[&str] = &["survival", "creative", "adventure", "spectator"];

/// `(id, display name, max durability)`.
type Gear = (&'static str, &'static str, u32);

const WEAPONS: &[Gear] = &[
    ("minecraft:diamond_sword", "Diamond Sword", 1561),
    ("minecraft:iron_sword", "Iron Sword", 250),
    ("minecraft:golden_sword", "Golden Sword", 32),
    ("minecraft:stone_sword", "Stone Sword", 131),
    ("minecraft:wooden_sword", "Wooden Sword", 59),
    ("minecraft:bow", "Bow", 384),
    ("minecraft:crossbow", "Crossbow", 326),
    ("minecraft:trident", "Trident", 250),
];

const TOOLS: &[Gear] = &[
    ("minecraft:diamond_pickaxe", "Diamond Pickaxe", 1561),
    ("minecraft:iron_pickaxe", "Iron Pickaxe", 250),
    ("minecraft:diamond_axe", "Diamond Axe", 1561),
    ("minecraft:iron_axe", "Iron Axe", 250),
    ("minecraft:diamond_shovel", "Diamond Shovel", 1561),
    ("minecraft:iron_shovel", "Iron Shovel", 250),
    ("minecraft:diamond_hoe", "Diamond Hoe", 1561),
    ("minecraft:fishing_rod", "Fishing Rod", 64),
];

const HELMETS: &[Gear] = &[
    ("minecraft:diamond_helmet", "Diamond Helmet", 363),
    ("minecraft:iron_helmet", "Iron Helmet", 165),
    ("minecraft:golden_helmet", "Golden Helmet", 77),
    ("minecraft:leather_helmet", "Leather Cap", 55),
];

const CHESTPLATES: &[Gear] = &[
    ("minecraft:diamond_chestplate", "Diamond Chestplate", 528),
    ("minecraft:iron_chestplate", "Iron Chestplate", 240),
    ("minecraft:golden_chestplate", "Golden Chestplate", 112),
    ("minecraft:leather_chestplate", "Leather Tunic", 80),
];

const LEGGINGS: &[Gear] = &[
    ("minecraft:diamond_leggings", "Diamond Leggings", 495),
    ("minecraft:iron_leggings", "Iron Leggings", 225),
    ("minecraft:golden_leggings", "Golden Leggings", 105),
    ("minecraft:leather_leggings", "Leather Pants", 75),
];

const BOOTS: &[Gear] = &[
    ("minecraft:diamond_boots", "Diamond Boots", 429),
    ("minecraft:iron_boots", "Iron Boots", 195),
    ("minecraft:golden_boots", "Golden Boots", 91),
    ("minecraft:leather_boots", "Leather Boots", 65),
];

/// `(id, display name, max stack)`.
const ITEMS: &[(&str, &str, u32)] = &[
    ("minecraft:bread", "Bread", 64),
    ("minecraft:cooked_beef", "Steak", 64),
    ("minecraft:apple", "Apple", 64),
    ("minecraft:golden_apple", "Golden Apple", 64),
    ("minecraft:potion", "Potion", 1),
    ("minecraft:ender_pearl", "Ender Pearl", 16),
    ("minecraft:arrow", "Arrow", 64),
    ("minecraft:torch", "Torch", 64),
    ("minecraft:cobblestone", "Cobblestone", 64),
    ("minecraft:oak_log", "Oak Log", 64),
    ("minecraft:iron_ingot", "Iron Ingot", 64),
    ("minecraft:diamond", "Diamond", 64),
    ("minecraft:emerald", "Emerald", 64),
    ("minecraft:coal", "Coal", 64),
    ("minecraft:redstone", "Redstone Dust", 64),
];

/// `(id, display name, max level)`.
const ENCHANTMENTS: &[(&str, &str, u32)] = &[
    ("minecraft:sharpness", "Sharpness", 5),
    ("minecraft:unbreaking", "Unbreaking", 3),
    ("minecraft:efficiency", "Efficiency", 5),
    ("minecraft:protection", "Protection", 4),
    ("minecraft:fire_protection", "Fire Protection", 4),
    ("minecraft:mending", "Mending", 1),
];

const BLOCKS: &[&str] = &[
    "minecraft:stone",
    "minecraft:dirt",
    "minecraft:grass_block",
    "minecraft:oak_log",
    "minecraft:iron_ore",
    "minecraft:diamond_ore",
    "minecraft:water",
    "minecraft:lava",
    "minecraft:bedrock",
];

const ENTITIES: &[&str] = &[
    "minecraft:zombie",
    "minecraft:skeleton",
    "minecraft:creeper",
    "minecraft:cow",
    "minecraft:pig",
    "minecraft:chicken",
    "minecraft:villager",
    "minecraft:iron_golem",
];

const DIMENSIONS: &[&str] = &["minecraft:overworld", "minecraft:the_nether", "minecraft:the_end"];

const BIOMES: &[&str] = &[
    "minecraft:plains",
    "minecraft:forest",
    "minecraft:desert",
    "minecraft:mountains",
    "minecraft:ocean",
    "minecraft:swamp",
    "minecraft:jungle",
    "minecraft:savanna",
];

const WEATHER: &[&str] = &["clear", "rain", "thunder"];

const GAME_LOG_MODULES: &[&str] = &[
    "minecraft.server",
    "minecraft.world",
    "minecraft.player",
    "minecraft.network",
    "minecraft.command",
];

const MCP_LOG_MODULES: &[&str] = &["mcp.server", "mcp.tools", "mcp.websocket"];

const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARN", "ERROR"];

const MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4", "claude-3-sonnet"];

const OPERATIONS: &[&str] = &["chat_completion", "embedding", "fine_tuning", "moderation"];

/// `(category, details, done criteria, priority)`.
const TASK_TEMPLATES: &[(&str, &str, &str, &str)] = &[
    ("collection", "Collect 64 oak logs", "64 oak logs in the inventory", "medium"),
    ("collection", "Collect 64 cobblestone", "64 cobblestone in the inventory", "low"),
    ("collection", "Collect 10 diamonds", "10 diamonds obtained", "high"),
    ("collection", "Collect 32 iron ingots", "32 iron ingots smelted", "medium"),
    ("building", "Build a basic shelter", "A 4x4 house is standing", "high"),
    ("building", "Build a farm", "A 9x9 tilled farm exists", "medium"),
    ("building", "Build a nether portal", "The portal is lit", "high"),
    ("crafting", "Craft a diamond pickaxe", "Diamond pickaxe crafted", "high"),
    ("crafting", "Craft a full iron armor set", "All four iron pieces crafted", "medium"),
    ("crafting", "Craft a bow and arrows", "Bow and 64 arrows crafted", "low"),
    ("exploration", "Find a village", "Traded with a villager", "medium"),
    ("exploration", "Find a stronghold", "End portal activated", "high"),
    ("combat", "Defeat 10 zombies", "10 zombies defeated", "low"),
    ("combat", "Defeat the ender dragon", "Ender dragon defeated", "high"),
];

const TASK_PROGRESS: &[&str] = &["in progress", "not started", "waiting", "partially done"];

const DIFFICULTIES: &[&str] = &["easy", "medium", "hard", "expert"];

// ============================================================================
// Helpers
// ============================================================================

/// Picks one element. Pools are non-empty constants.
fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn enchantments<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
    let mut picked: Vec<Value> = Vec::new();
    for _ in 0..rng.random_range(1..=3) {
        let (id, name, max_level) = *pick(rng, ENCHANTMENTS);
        if picked.iter().any(|e| e["id"] == id) {
            continue;
        }
        picked.push(json!({ "id": id, "name": name, "level": rng.random_range(1..=max_level) }));
    }
    picked
}

fn gear_item<R: Rng + ?Sized>(rng: &mut R, gear: Gear, enchant_chance: f64) -> Map<String, Value> {
    let (id, name, max) = gear;
    let durability = rng.random_range(max / 10..=max);
    let enchants = if rng.random_bool(enchant_chance) {
        enchantments(rng)
    } else {
        Vec::new()
    };

    let item = json!({
        "id": id,
        "name": name,
        "display_name": name,
        "count": 1,
        "durability": durability,
        "max_durability": max,
        "damage": max - durability,
        "max_damage": max,
        "enchantments": enchants,
    });
    match item {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// An equipped item, or `null` 40% of the time.
fn equipment_slot<R: Rng + ?Sized>(rng: &mut R, pool: &[Gear]) -> Value {
    if rng.random_bool(0.4) {
        return Value::Null;
    }
    let gear = *pick(rng, pool);
    Value::Object(gear_item(rng, gear, 0.3))
}

fn inventory_items<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
    let mut items: Vec<Value> = Vec::new();

    for _ in 0..rng.random_range(8..20) {
        let slot = rng.random_range(0..36u32);
        if items.iter().any(|item| item["slot"] == slot) {
            continue;
        }

        let roll: f64 = rng.random();
        let mut item = if roll < 0.4 {
            let (id, name, max_count) = *pick(rng, ITEMS);
            let stackable = max_count > 1;
            let count = if stackable { rng.random_range(1..=max_count) } else { 1 };
            let mut map = Map::new();
            map.insert("id".into(), json!(id));
            map.insert("name".into(), json!(name));
            map.insert("display_name".into(), json!(name));
            map.insert("count".into(), json!(count));
            map.insert("stackable".into(), json!(stackable));
            map.insert("max_count".into(), json!(max_count));
            map
        } else if roll < 0.7 {
            let gear = *pick(rng, TOOLS);
            gear_item(rng, gear, 0.2)
        } else {
            let gear = *pick(rng, WEAPONS);
            gear_item(rng, gear, 0.2)
        };

        item.insert("slot".into(), json!(slot));
        items.push(Value::Object(item));
    }

    items
}

/// Formats world ticks as an in-game `HH:MM` clock.
#[must_use]
pub fn format_game_time(ticks: i64) -> String {
    // One in-game minute is 1000 / 60 ticks.
    let total_minutes = ticks * 60 / 1000;
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    format!("{hours:02}:{minutes:02}")
}

fn format_weather(weather: &str) -> &str {
    match weather {
        "clear" => "Clear",
        "rain" => "Rain",
        "thunder" => "Thunderstorm",
        other => other,
    }
}

// ============================================================================
// Generators
// ============================================================================

/// A player snapshot, the `data` of a `player_update` frame.
pub fn player<R: Rng + ?Sized>(rng: &mut R) -> Value {
    let items = inventory_items(rng);
    let occupied = items.len();
    let main_hand_pool: Vec<Gear> = WEAPONS.iter().chain(TOOLS).copied().collect();

    json!({
        "name": pick(rng, PLAYER_NAMES),
        "health": rng.random_range(1..=20),
        "max_health": 20,
        "food": rng.random_range(0..=20),
        "max_food": 20,
        "experience": rng.random_range(0..1000),
        "level": rng.random_range(1..50),
        "gamemode": pick(rng, GAME_MODES),
        "position": {
            "x": round2(rng.random_range(-1000.0..1000.0)),
            "y": round2(rng.random_range(1.0..256.0)),
            "z": round2(rng.random_range(-1000.0..1000.0)),
            "yaw": round2(rng.random_range(0.0..360.0)),
            "pitch": round2(rng.random_range(-90.0..90.0)),
            "on_ground": rng.random_bool(0.8),
        },
        "equipment": {
            "main_hand": equipment_slot(rng, &main_hand_pool),
            "helmet": equipment_slot(rng, HELMETS),
            "chestplate": equipment_slot(rng, CHESTPLATES),
            "leggings": equipment_slot(rng, LEGGINGS),
            "boots": equipment_slot(rng, BOOTS),
        },
        "inventory": {
            "occupied_slots": occupied,
            "total_slots": 36,
            "empty_slots": 36 - occupied,
            "items": items,
        },
    })
}

/// A world snapshot, the `data` of a `world_update` frame.
pub fn world<R: Rng + ?Sized>(rng: &mut R) -> Value {
    let time_of_day = rng.random_range(0..24_000i64);
    let weather = *pick(rng, WEATHER);

    let blocks: Vec<Value> = (0..rng.random_range(3..8))
        .map(|_| {
            json!({
                "type": pick(rng, BLOCKS),
                "position": {
                    "x": rng.random_range(-5..5),
                    "y": rng.random_range(-2..2),
                    "z": rng.random_range(-5..5),
                },
            })
        })
        .collect();

    let entities: Vec<Value> = (0..rng.random_range(0..5))
        .map(|_| {
            json!({
                "type": pick(rng, ENTITIES),
                "name": format!("entity_{}", rng.random_range(1000..10_000)),
                "position": {
                    "x": round2(rng.random_range(-10.0..10.0)),
                    "y": round2(rng.random_range(-2.0..5.0)),
                    "z": round2(rng.random_range(-10.0..10.0)),
                },
                "health": rng.random_range(1..=20),
                "distance": round2(rng.random_range(1.0..15.0)),
            })
        })
        .collect();

    json!({
        "time": {
            "time_of_day": time_of_day,
            "formatted_time": format_game_time(time_of_day),
            "day_count": rng.random_range(1..365),
        },
        "weather": {
            "weather": weather,
            "formatted_weather": format_weather(weather),
            "duration": rng.random_range(1000..10_000),
        },
        "location": {
            "dimension": pick(rng, DIMENSIONS),
            "biome": pick(rng, BIOMES),
            "light_level": rng.random_range(0..=15),
        },
        "nearby_blocks": blocks,
        "nearby_entities": entities,
    })
}

/// A full `log` frame. MCP entries draw from the `mcp.*` modules.
pub fn log_entry<R: Rng + ?Sized>(rng: &mut R, is_mcp: bool) -> Value {
    let modules = if is_mcp { MCP_LOG_MODULES } else { GAME_LOG_MODULES };

    let message = match rng.random_range(0..8) {
        0 => format!("Player {} joined the game", pick(rng, PLAYER_NAMES)),
        1 => format!("World time set to {}", rng.random_range(0..24_000)),
        2 => format!("Block broken: {}", pick(rng, BLOCKS)),
        3 => format!("Mob spawned: {}", pick(rng, ENTITIES)),
        4 => "WebSocket connection established".to_string(),
        5 => "Heartbeat ok".to_string(),
        6 => format!("Memory usage: {}%", rng.random_range(50..90)),
        _ => format!("Network latency: {}ms", rng.random_range(10..100)),
    };

    json!({
        "type": "log",
        "timestamp": now_ms(),
        "level": pick(rng, LOG_LEVELS),
        "module": pick(rng, modules),
        "message": message,
    })
}

fn model_usage<R: Rng + ?Sized>(rng: &mut R, model: &str, now: i64) -> Value {
    let prompt = rng.random_range(100..5000);
    let completion = rng.random_range(50..2000);

    json!({
        "model_name": model,
        "total_calls": rng.random_range(1..50),
        "total_prompt_tokens": prompt,
        "total_completion_tokens": completion,
        "total_tokens": prompt + completion,
        "total_cost": round2(rng.random_range(0.01..5.0)),
        "first_call_time": now - rng.random_range(86_400_000..604_800_000),
        "last_call_time": now - rng.random_range(3_600_000..86_400_000),
        "last_updated": now - rng.random_range(300_000..3_600_000),
    })
}

/// A token usage summary, the `data` of a `token_usage_update` frame.
pub fn token_usage<R: Rng + ?Sized>(rng: &mut R) -> Value {
    let now = now_ms();
    let utc_now = Utc::now();

    let history: Vec<Value> = (0..rng.random_range(5..15))
        .map(|_| {
            let at = utc_now - ChronoDuration::milliseconds(rng.random_range(0..86_400_000));
            json!({
                "timestamp": at.to_rfc3339(),
                "tokens_used": rng.random_range(10..500),
                "operation": pick(rng, OPERATIONS),
            })
        })
        .collect();

    let mut models = Map::new();
    let mut prompt_total = 0;
    let mut completion_total = 0;
    let mut calls_total = 0;
    let mut cost_total = 0.0;
    for model in MODELS {
        let usage = model_usage(rng, model, now);
        prompt_total += usage["total_prompt_tokens"].as_i64().unwrap_or(0);
        completion_total += usage["total_completion_tokens"].as_i64().unwrap_or(0);
        calls_total += usage["total_calls"].as_i64().unwrap_or(0);
        cost_total += usage["total_cost"].as_f64().unwrap_or(0.0);
        models.insert((*model).to_string(), usage);
    }

    json!({
        "current_usage": rng.random_range(1000..50_000),
        "limit": 100_000,
        "reset_time": (utc_now + ChronoDuration::hours(24)).to_rfc3339(),
        "usage_history": history,
        "total_cost": round2(cost_total),
        "total_prompt_tokens": prompt_total,
        "total_completion_tokens": completion_total,
        "total_tokens": prompt_total + completion_total,
        "total_calls": calls_total,
        "model_count": MODELS.len(),
        "models": models,
    })
}

fn task_tags(details: &str) -> Vec<&'static str> {
    const KEYWORDS: &[(&str, [&str; 2])] = &[
        ("Collect", ["collection", "gathering"]),
        ("Build", ["building", "construction"]),
        ("Craft", ["crafting", "creation"]),
        ("Find", ["exploration", "adventure"]),
        ("Defeat", ["combat", "battle"]),
        ("diamond", ["valuable", "rare"]),
        ("nether", ["nether", "dangerous"]),
        ("ender", ["end", "endgame"]),
        ("village", ["village", "trading"]),
    ];

    let mut tags = vec!["auto-generated"];
    for (keyword, keyword_tags) in KEYWORDS {
        if details.contains(keyword) {
            for tag in keyword_tags {
                if !tags.contains(tag) {
                    tags.push(*tag);
                }
            }
        }
    }
    tags
}

/// Between 5 and 11 tasks, the `data.tasks` of a `tasks_list` frame.
pub fn tasks<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
    let now = Utc::now();
    let stamp = now_ms();

    (0..rng.random_range(5..12))
        .map(|index| {
            let (category, details, criteria, priority) = *pick(rng, TASK_TEMPLATES);
            let done = rng.random_bool(0.3);
            let created = now - ChronoDuration::milliseconds(rng.random_range(0..604_800_000));
            let updated = created + ChronoDuration::milliseconds(rng.random_range(0..86_400_000));
            let progress = if done { "done" } else { *pick(rng, TASK_PROGRESS) };
            let dependencies: Vec<String> = if rng.random_bool(0.2) {
                vec![format!("task_{}", rng.random_range(1000..10_000))]
            } else {
                Vec::new()
            };

            json!({
                "id": format!("task_{stamp}_{}_{index}", rng.random_range(1000..10_000)),
                "details": details,
                "done_criteria": criteria,
                "progress": progress,
                "done": done,
                "priority": priority,
                "category": category,
                "created_at": created.to_rfc3339(),
                "updated_at": updated.to_rfc3339(),
                "estimated_time": rng.random_range(5..120),
                "difficulty": pick(rng, DIFFICULTIES),
                "dependencies": dependencies,
                "tags": task_tags(details),
            })
        })
        .collect()
}

// ============================================================================
// Frames
// ============================================================================

/// `{type: "player_update", data, timestamp}`.
pub fn player_frame<R: Rng + ?Sized>(rng: &mut R) -> Value {
    json!({ "type": "player_update", "data": player(rng), "timestamp": now_ms() })
}

/// `{type: "world_update", data, timestamp}`.
pub fn world_frame<R: Rng + ?Sized>(rng: &mut R) -> Value {
    json!({ "type": "world_update", "data": world(rng), "timestamp": now_ms() })
}

/// `{type: "token_usage_update", data, timestamp}`.
pub fn token_usage_frame<R: Rng + ?Sized>(rng: &mut R) -> Value {
    json!({ "type": "token_usage_update", "data": token_usage(rng), "timestamp": now_ms() })
}

/// `{type: "tasks_list", data: {tasks}, timestamp}`.
pub fn tasks_frame<R: Rng + ?Sized>(rng: &mut R) -> Value {
    json!({ "type": "tasks_list", "data": { "tasks": tasks(rng) }, "timestamp": now_ms() })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::config::Endpoint;
    use crate::store::DataStore;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_format_game_time() {
        assert_eq!(format_game_time(0), "00:00");
        assert_eq!(format_game_time(1000), "01:00");
        assert_eq!(format_game_time(6500), "06:30");
        assert_eq!(format_game_time(23_999), "23:59");
    }

    #[test]
    fn test_player_inventory_is_consistent() {
        let mut rng = rng();
        for _ in 0..20 {
            let player = player(&mut rng);
            let inventory = &player["inventory"];
            let items = inventory["items"].as_array().unwrap();
            assert_eq!(inventory["occupied_slots"], items.len());
            assert_eq!(
                inventory["empty_slots"].as_u64().unwrap() + items.len() as u64,
                36
            );

            let mut slots: Vec<u64> = items.iter().map(|i| i["slot"].as_u64().unwrap()).collect();
            slots.sort_unstable();
            slots.dedup();
            assert_eq!(slots.len(), items.len());
        }
    }

    #[test]
    fn test_enchantments_are_unique() {
        let mut rng = rng();
        for _ in 0..50 {
            let picked = enchantments(&mut rng);
            let mut ids: Vec<&str> = picked.iter().map(|e| e["id"].as_str().unwrap()).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), picked.len());
        }
    }

    #[test]
    fn test_mcp_log_modules() {
        let mut rng = rng();
        for _ in 0..20 {
            let entry = log_entry(&mut rng, true);
            assert!(entry["module"].as_str().unwrap().starts_with("mcp."));
            let entry = log_entry(&mut rng, false);
            assert!(entry["module"].as_str().unwrap().starts_with("minecraft."));
        }
    }

    #[test]
    fn test_token_usage_totals() {
        let usage = token_usage(&mut rng());
        let sum: i64 = usage["models"]
            .as_object()
            .unwrap()
            .values()
            .map(|m| m["total_tokens"].as_i64().unwrap())
            .sum();
        assert_eq!(usage["total_tokens"], sum);
        assert_eq!(usage["model_count"], 3);
    }

    #[test]
    fn test_task_tags() {
        assert_eq!(
            task_tags("Collect 10 diamonds"),
            vec!["auto-generated", "collection", "gathering", "valuable", "rare"]
        );
        assert_eq!(task_tags("Sleep"), vec!["auto-generated"]);
    }

    #[test]
    fn test_frames_feed_the_store() {
        let store = DataStore::new();
        let mut rng = rng();

        store.update_endpoint_data(Endpoint::Player, &player_frame(&mut rng));
        store.update_endpoint_data(Endpoint::World, &world_frame(&mut rng));
        store.update_endpoint_data(Endpoint::Logs, &log_entry(&mut rng, false));
        store.update_endpoint_data(Endpoint::TaskManager, &tasks_frame(&mut rng));

        let player = store.player_data().unwrap();
        assert!(PLAYER_NAMES.contains(&player.name.as_str()));
        assert_eq!(player.inventory.total_slots, 36);

        let world = store.world_data().unwrap();
        assert!(WEATHER.contains(&world.weather.weather.as_str()));
        assert_eq!(world.time.formatted_time.len(), 5);

        assert_eq!(store.log_count(), 1);
        assert!(store.tasks().len() >= 5);
    }
}
