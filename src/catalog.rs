//! The fixed, ordered list of factions users can rate
//!
//! The catalog is built once at startup (from configuration or the built-in
//! list) and never changes for the lifetime of the process. Its declaration
//! order is the tie-breaker for every ordered statistic.

use crate::error::{RatingError, Result};
use crate::types::{FactionName, OrderedMap, Score, ScoreSet};
use std::collections::HashSet;

/// Factions offered when no catalog is configured
pub const DEFAULT_FACTIONS: &[&str] = &[
    "绵绵细雨",
    "狂风暴雨",
    "王后恩赐",
    "国王圣谕",
    "炮击强化",
    "火力强化",
    "归元",
    "勇气激发",
    "狂战士秘技",
    "疯狂",
    "修罗之路",
    "拳王破天舞",
    "强化武器",
    "手枪手",
    "弥留之息",
    "爆裂",
    "重力修练",
    "愤怒之锤",
    "节制",
    "巅峰",
    "战斗姿态",
    "孤独的骑士",
    "和平之光",
    "狩猎时刻",
    "阿尔泰因科技",
    "超同步核心",
    "裁决许可",
    "饥渴",
    "月声",
    "冲击修炼",
    "极义：体术",
    "无尽冲动",
    "完美抑制",
    "终结袭击",
    "第二个伙伴",
    "捕食者",
    "处决者",
    "点火",
    "环流",
    "满月鬼门开",
    "晦朔边界",
    "经脉打通",
    "逆天之体",
    "一击必杀",
    "奥义乱舞",
    "心有灵犀",
    "高阶召唤",
    "奥义精通",
    "赤子之心",
    "野性",
    "幻兽觉醒",
];

/// Ordered set of unique faction names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionCatalog {
    factions: Vec<FactionName>,
}

impl FactionCatalog {
    /// Build a catalog, rejecting empty lists, blank names and duplicates
    pub fn new<I, S>(factions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<FactionName>,
    {
        let factions: Vec<FactionName> = factions.into_iter().map(Into::into).collect();

        if factions.is_empty() {
            return Err(RatingError::ConfigurationError {
                message: "Faction catalog cannot be empty".to_string(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(factions.len());
        for faction in &factions {
            if faction.trim().is_empty() {
                return Err(RatingError::ConfigurationError {
                    message: "Faction names cannot be blank".to_string(),
                }
                .into());
            }
            if !seen.insert(faction.as_str()) {
                return Err(RatingError::ConfigurationError {
                    message: format!("Duplicate faction in catalog: {}", faction),
                }
                .into());
            }
        }

        Ok(Self { factions })
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    pub fn contains(&self, faction: &str) -> bool {
        self.position(faction).is_some()
    }

    /// Declaration index of a faction
    pub fn position(&self, faction: &str) -> Option<usize> {
        self.factions.iter().position(|f| f == faction)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.factions.iter().map(String::as_str)
    }

    pub fn names(&self) -> &[FactionName] {
        &self.factions
    }

    /// Validate a raw submission and turn it into a ScoreSet.
    ///
    /// Every key must be a catalog member and every value must lie in 0..=5.
    /// The result is ordered by catalog declaration, not submission order;
    /// explicit zeros are kept.
    pub fn validate(&self, raw: &OrderedMap<String, i64>) -> Result<ScoreSet> {
        let mut slots: Vec<Option<Score>> = vec![None; self.factions.len()];

        for (faction, value) in raw.iter() {
            let idx = self
                .position(faction)
                .ok_or_else(|| RatingError::UnknownFaction {
                    faction: faction.clone(),
                })?;
            let score = Score::new(*value).ok_or_else(|| RatingError::InvalidScore {
                faction: faction.clone(),
                score: *value,
            })?;
            slots[idx] = Some(score);
        }

        Ok(self
            .factions
            .iter()
            .zip(slots)
            .filter_map(|(faction, slot)| slot.map(|score| (faction.clone(), score)))
            .collect())
    }
}

impl Default for FactionCatalog {
    fn default() -> Self {
        Self {
            factions: DEFAULT_FACTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }
}
