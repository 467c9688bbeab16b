//! Tunable simulation parameters.
//!
//! [`SimConfig`] is plain serde data. Every field has a default, so partial
//! config files only need to name what they change. File loading lives in
//! `beltworks-data`; this module only defines the shape and validation.

use crate::fixed::{Fixed64, per_tick, seconds_to_ticks};
use crate::item::ItemType;
use beltworks_spatial::TileKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A config value outside its valid range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },

    #[error("tick_rate must be at least 1")]
    ZeroTickRate,

    #[error("max_inference_passes must be at least 1")]
    ZeroInferencePasses,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Movement speeds in sub-cells per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTable {
    pub conveyor: f64,
    /// Splitters and filters.
    pub router: f64,
    pub merger: f64,
    /// Smelter, crusher, press and roller lanes.
    pub machine: f64,
    pub spawner: f64,
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            conveyor: 100.0,
            router: 24.0,
            merger: 24.0,
            machine: 24.0,
            spawner: 24.0,
        }
    }
}

/// One machine's conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecipeConfig {
    pub input: ItemType,
    pub output: ItemType,
    /// Seconds an item sits in the process cell.
    pub process_time: f64,
    pub value_multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeTable {
    pub crusher: RecipeConfig,
    pub smelter: RecipeConfig,
    pub press: RecipeConfig,
    pub roller: RecipeConfig,
}

impl Default for RecipeTable {
    fn default() -> Self {
        let recipe = |input, output, value_multiplier| RecipeConfig {
            input,
            output,
            process_time: 1.75,
            value_multiplier,
        };
        Self {
            crusher: recipe(ItemType::Ore, ItemType::Dust, 1.5),
            smelter: recipe(ItemType::Dust, ItemType::Ingot, 2.0),
            press: recipe(ItemType::Ingot, ItemType::Plate, 1.0),
            roller: recipe(ItemType::Plate, ItemType::Rod, 1.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub item_type: ItemType,
    pub value: f32,
    /// Seconds between spawns.
    pub interval: f64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            item_type: ItemType::Ore,
            value: 1.0,
            interval: 0.75,
        }
    }
}

/// Placement prices. Splitters and mergers are never bought directly; they
/// only appear by upgrading a conveyor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCosts {
    pub conveyor: f64,
    pub smelter: f64,
    pub sell_pad: f64,
    pub spawner: f64,
    pub crusher: f64,
    pub press: f64,
    pub roller: f64,
    pub filter: f64,
}

impl Default for TileCosts {
    fn default() -> Self {
        Self {
            conveyor: 1.0,
            smelter: 15.0,
            sell_pad: 10.0,
            spawner: 25.0,
            crusher: 20.0,
            press: 25.0,
            roller: 50.0,
            filter: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub starting_money: f64,
    /// Fraction of the placement price returned on removal.
    pub refund_rate: f64,
    pub costs: TileCosts,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_money: 200.0,
            refund_rate: 0.75,
            costs: TileCosts::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed ticks per simulated second.
    pub tick_rate: u32,
    /// Global factor applied to every movement speed.
    pub item_speed_multiplier: f64,
    pub speeds: SpeedTable,
    pub recipes: RecipeTable,
    pub spawner: SpawnerConfig,
    pub economy: EconomyConfig,
    /// Pass budget for topology inference.
    pub max_inference_passes: u32,
    /// Queue capacity per event kind between deliveries.
    pub event_buffer_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            item_speed_multiplier: 1.0,
            speeds: SpeedTable::default(),
            recipes: RecipeTable::default(),
            spawner: SpawnerConfig::default(),
            economy: EconomyConfig::default(),
            max_inference_passes: 4,
            event_buffer_capacity: 256,
        }
    }
}

impl SimConfig {
    /// Check value ranges. Loaders call this before handing a config out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.max_inference_passes == 0 {
            return Err(ConfigError::ZeroInferencePasses);
        }
        let positive = [
            ("item_speed_multiplier", self.item_speed_multiplier),
            ("speeds.conveyor", self.speeds.conveyor),
            ("speeds.router", self.speeds.router),
            ("speeds.merger", self.speeds.merger),
            ("speeds.machine", self.speeds.machine),
            ("speeds.spawner", self.speeds.spawner),
            ("recipes.crusher.process_time", self.recipes.crusher.process_time),
            ("recipes.smelter.process_time", self.recipes.smelter.process_time),
            ("recipes.press.process_time", self.recipes.press.process_time),
            ("recipes.roller.process_time", self.recipes.roller.process_time),
            ("spawner.interval", self.spawner.interval),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        let rate = self.economy.refund_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::OutOfUnitRange {
                field: "economy.refund_rate",
                value: rate,
            });
        }
        Ok(())
    }

    /// Sub-cells per tick for the lane speed of `kind`. Sell-pads consume
    /// on arrival and have no lane.
    pub fn speed_per_tick(&self, kind: TileKind) -> Fixed64 {
        let base = match kind {
            TileKind::Conveyor => self.speeds.conveyor,
            TileKind::Splitter
            | TileKind::FilterLeftRight
            | TileKind::FilterForwardRight
            | TileKind::FilterForwardLeft => self.speeds.router,
            TileKind::Merger => self.speeds.merger,
            TileKind::Smelter | TileKind::Crusher | TileKind::Press | TileKind::Roller => {
                self.speeds.machine
            }
            TileKind::Spawner => self.speeds.spawner,
            TileKind::SellPad | TileKind::Empty => 0.0,
        };
        per_tick(base * self.item_speed_multiplier, self.tick_rate)
    }

    /// The recipe a processing machine runs, if `kind` is one.
    pub fn recipe_for(&self, kind: TileKind) -> Option<&RecipeConfig> {
        match kind {
            TileKind::Crusher => Some(&self.recipes.crusher),
            TileKind::Smelter => Some(&self.recipes.smelter),
            TileKind::Press => Some(&self.recipes.press),
            TileKind::Roller => Some(&self.recipes.roller),
            _ => None,
        }
    }

    /// Price to place `kind` manually. `None` for kinds that cannot be bought.
    pub fn placement_cost(&self, kind: TileKind) -> Option<f64> {
        let costs = &self.economy.costs;
        match kind {
            TileKind::Conveyor => Some(costs.conveyor),
            TileKind::Smelter => Some(costs.smelter),
            TileKind::SellPad => Some(costs.sell_pad),
            TileKind::Spawner => Some(costs.spawner),
            TileKind::Crusher => Some(costs.crusher),
            TileKind::Press => Some(costs.press),
            TileKind::Roller => Some(costs.roller),
            TileKind::FilterLeftRight
            | TileKind::FilterForwardRight
            | TileKind::FilterForwardLeft => Some(costs.filter),
            TileKind::Splitter | TileKind::Merger | TileKind::Empty => None,
        }
    }

    /// Money returned when `kind` is sold back. Upgraded belts refund as the
    /// conveyor they were bought as.
    pub fn refund_for(&self, kind: TileKind) -> f64 {
        let paid = match kind {
            TileKind::Splitter | TileKind::Merger => Some(self.economy.costs.conveyor),
            other => self.placement_cost(other),
        };
        paid.unwrap_or(0.0) * self.economy.refund_rate
    }

    /// Spawn interval in ticks.
    pub fn spawn_interval_ticks(&self) -> u32 {
        seconds_to_ticks(self.spawner.interval, self.tick_rate)
    }
}
