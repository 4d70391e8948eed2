//! Chapter tuning — the per-chapter-type configuration table.
//!
//! Content packs may override any field per chapter type; overrides
//! merge field-wise, later packs winning per field.

use gd_types::enums::ChapterType;
use serde::{Deserialize, Serialize};

/// Configuration for one chapter type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterTuning {
    pub name_key: Box<str>,
    pub desc_key: Box<str>,
    pub min_commits: u32,
    pub max_commits: u32,
    pub boss_chance: f64,
    pub shop_enabled: bool,
    pub gold_bonus: f64,
    pub exp_bonus: f64,
    pub enemy_hp_multiplier: f64,
    pub enemy_atk_multiplier: f64,
}

/// Field-wise override payload from a content pack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_commits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_commits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss_chance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold_bonus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_bonus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_hp_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_atk_multiplier: Option<f64>,
}

impl ChapterTuning {
    /// Apply one override, field-wise.
    pub fn apply(&mut self, over: &ChapterOverride) {
        if let Some(v) = over.min_commits {
            self.min_commits = v;
        }
        if let Some(v) = over.max_commits {
            self.max_commits = v;
        }
        if let Some(v) = over.boss_chance {
            self.boss_chance = v;
        }
        if let Some(v) = over.shop_enabled {
            self.shop_enabled = v;
        }
        if let Some(v) = over.gold_bonus {
            self.gold_bonus = v;
        }
        if let Some(v) = over.exp_bonus {
            self.exp_bonus = v;
        }
        if let Some(v) = over.enemy_hp_multiplier {
            self.enemy_hp_multiplier = v;
        }
        if let Some(v) = over.enemy_atk_multiplier {
            self.enemy_atk_multiplier = v;
        }
    }
}

/// The default tuning for a chapter type.
pub fn default_tuning(chapter_type: ChapterType) -> ChapterTuning {
    let key = chapter_type.key();
    let (min, max, boss, shop, gold, exp, hp_mul, atk_mul) = match chapter_type {
        ChapterType::Initial => (1, 3, 0.0, false, 0.8, 0.8, 0.6, 0.6),
        ChapterType::Feature => (5, 30, 0.3, true, 1.0, 1.0, 1.0, 1.0),
        ChapterType::Fix => (3, 25, 0.4, true, 1.2, 1.3, 1.1, 1.4),
        ChapterType::Integration => (1, 10, 1.0, true, 2.0, 2.0, 2.0, 1.5),
        ChapterType::Legacy => (1, 15, 0.3, true, 1.5, 1.5, 1.3, 1.2),
    };
    ChapterTuning {
        name_key: format!("chapter.{key}.name").into(),
        desc_key: format!("chapter.{key}.desc").into(),
        min_commits: min,
        max_commits: max,
        boss_chance: boss,
        shop_enabled: shop,
        gold_bonus: gold,
        exp_bonus: exp,
        enemy_hp_multiplier: hp_mul,
        enemy_atk_multiplier: atk_mul,
    }
}
