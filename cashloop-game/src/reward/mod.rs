//! Seven-stage sequence run after a round is won.
//!
//! Reveal → Inventory → Placement → TownUpdated → NextGoal → Recap → Loop.
//! Stages are either time-boxed (a pending timer), gated on one player action,
//! or both. The only shortcuts jump forward to Recap; nothing cancels the flow.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::buildings::{BuildingCatalog, BuildingDef, BuildingId, PlotId};
use crate::config::RulesConfig;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::timers::{PendingTimer, TimerKind};
use crate::turn::RoundSummary;

pub mod grade;
pub use grade::{Grade, RecapGrade, recap_grade};

use crate::constants::NEXT_GOAL_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardStage {
    Reveal,
    Inventory,
    Placement,
    TownUpdated,
    NextGoal,
    Recap,
    Loop,
}

impl RewardStage {
    pub const ALL: [Self; 7] = [
        Self::Reveal,
        Self::Inventory,
        Self::Placement,
        Self::TownUpdated,
        Self::NextGoal,
        Self::Recap,
        Self::Loop,
    ];

    /// One-based position in the sequence.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Reveal => 1,
            Self::Inventory => 2,
            Self::Placement => 3,
            Self::TownUpdated => 4,
            Self::NextGoal => 5,
            Self::Recap => 6,
            Self::Loop => 7,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Reveal => Some(Self::Inventory),
            Self::Inventory => Some(Self::Placement),
            Self::Placement => Some(Self::TownUpdated),
            Self::TownUpdated => Some(Self::NextGoal),
            Self::NextGoal => Some(Self::Recap),
            Self::Recap => Some(Self::Loop),
            Self::Loop => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reveal => "reward reveal",
            Self::Inventory => "inventory",
            Self::Placement => "placement",
            Self::TownUpdated => "town update",
            Self::NextGoal => "next goal",
            Self::Recap => "recap",
            Self::Loop => "loop",
        }
    }

    /// Stages offering a jump straight to the recap.
    #[must_use]
    pub const fn can_skip_to_recap(self) -> bool {
        matches!(self, Self::Inventory | Self::NextGoal)
    }
}

impl fmt::Display for RewardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Town figures shown on the town-updated stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownView {
    pub level: u32,
    pub placed: usize,
    pub passive_income: u32,
}

impl TownView {
    #[must_use]
    pub fn read(ledger: &Ledger, catalog: &BuildingCatalog) -> Self {
        Self {
            level: ledger.town_level(),
            placed: ledger.placed_buildings().len(),
            passive_income: catalog.passive_income(ledger.placed_buildings()),
        }
    }
}

/// Inventory card for one building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingCard {
    pub id: BuildingId,
    pub name: String,
    pub cost: u32,
    pub owned: bool,
    pub affordable: bool,
}

/// Candidate shown on the next-goal stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOption {
    pub id: BuildingId,
    pub name: String,
    pub cost: u32,
    /// "Start module" is enabled only when wealth covers the cost.
    pub can_start: bool,
}

/// Result of clicking a plot on the placement stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementResult {
    Placed {
        plot: PlotId,
        building: BuildingId,
    },
    /// Occupied plots ignore clicks.
    Occupied { plot: PlotId },
    /// A building was already placed this flow; waiting on the settle timer.
    AlreadyPlaced,
}

/// Value returned to the host when the flow reaches Loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub summary: RoundSummary,
    pub placed: Option<(PlotId, BuildingId)>,
    pub goal: Option<BuildingId>,
    pub grade: RecapGrade,
    pub town: TownView,
}

/// Effect of a reward-flow command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStep {
    Stayed,
    Advanced(RewardStage),
    Completed(RewardOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFlow {
    summary: RoundSummary,
    stage: RewardStage,
    revealed: bool,
    selected: Option<BuildingId>,
    placed: Option<(PlotId, BuildingId)>,
    town_before: TownView,
    town_after: TownView,
    goal_preview: Option<BuildingId>,
    goal_started: Option<BuildingId>,
    grade: Option<RecapGrade>,
}

impl RewardFlow {
    #[must_use]
    pub fn new(summary: RoundSummary, ledger: &Ledger, catalog: &BuildingCatalog) -> Self {
        let town = TownView::read(ledger, catalog);
        Self {
            summary,
            stage: RewardStage::Reveal,
            revealed: false,
            selected: None,
            placed: None,
            town_before: town,
            town_after: town,
            goal_preview: None,
            goal_started: None,
            grade: None,
        }
    }

    #[must_use]
    pub const fn stage(&self) -> RewardStage {
        self.stage
    }

    #[must_use]
    pub const fn summary(&self) -> &RoundSummary {
        &self.summary
    }

    #[must_use]
    pub const fn selected_building(&self) -> Option<&BuildingId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub const fn placed(&self) -> Option<&(PlotId, BuildingId)> {
        self.placed.as_ref()
    }

    #[must_use]
    pub const fn goal_preview(&self) -> Option<&BuildingId> {
        self.goal_preview.as_ref()
    }

    #[must_use]
    pub const fn grade(&self) -> Option<RecapGrade> {
        self.grade
    }

    /// Town level and passive income before and after placement.
    #[must_use]
    pub const fn town_delta(&self) -> (TownView, TownView) {
        (self.town_before, self.town_after)
    }

    #[must_use]
    pub const fn pending_timer_kind(&self) -> Option<TimerKind> {
        match self.stage {
            RewardStage::Reveal if !self.revealed => Some(TimerKind::RewardReveal),
            RewardStage::Placement if self.placed.is_some() => Some(TimerKind::PlacementSettle),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending_timer(&self, rules: &RulesConfig) -> Option<PendingTimer> {
        self.pending_timer_kind()
            .map(|kind| PendingTimer::new(kind, &rules.pacing))
    }

    /// Owned and locked building cards for the inventory stage.
    #[must_use]
    pub fn inventory(ledger: &Ledger, catalog: &BuildingCatalog) -> Vec<BuildingCard> {
        catalog
            .iter()
            .map(|def| BuildingCard {
                id: def.id.clone(),
                name: def.name.clone(),
                cost: def.cost,
                owned: ledger.is_unlocked(&def.id),
                affordable: ledger.wealth() >= def.cost,
            })
            .collect()
    }

    /// Plots still open for building.
    #[must_use]
    pub fn empty_plots(ledger: &Ledger, rules: &RulesConfig) -> Vec<PlotId> {
        (0..rules.town_plots)
            .map(PlotId)
            .filter(|plot| ledger.is_plot_free(*plot))
            .collect()
    }

    /// Next three locked buildings, cheapest first.
    #[must_use]
    pub fn next_goals(ledger: &Ledger, catalog: &BuildingCatalog) -> Vec<GoalOption> {
        catalog
            .next_locked(|id| ledger.is_unlocked(id), NEXT_GOAL_COUNT)
            .into_iter()
            .map(|def| GoalOption {
                id: def.id.clone(),
                name: def.name.clone(),
                cost: def.cost,
                can_start: ledger.wealth() >= def.cost,
            })
            .collect()
    }

    /// Building the placement stage will use when no explicit pick was made:
    /// the cheapest affordable locked building, else the cheapest owned one.
    #[must_use]
    pub fn default_building<'a>(
        ledger: &Ledger,
        catalog: &'a BuildingCatalog,
    ) -> Option<&'a BuildingDef> {
        catalog
            .iter()
            .find(|def| !ledger.is_unlocked(&def.id) && ledger.wealth() >= def.cost)
            .or_else(|| catalog.iter().find(|def| ledger.is_unlocked(&def.id)))
    }

    /// Host timer fired.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedTimer` if `kind` is not the pending timer.
    pub fn on_timer(
        &mut self,
        kind: TimerKind,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
    ) -> Result<StageStep, EngineError> {
        let expected = self.pending_timer_kind();
        if expected != Some(kind) {
            return Err(EngineError::UnexpectedTimer {
                fired: kind,
                expected,
            });
        }
        match kind {
            TimerKind::RewardReveal => {
                ledger.claim_reward(self.summary.net_worth, self.summary.final_savings);
                self.revealed = true;
                log::info!(
                    "reward revealed: +{} wealth (now {})",
                    self.summary.net_worth,
                    ledger.wealth()
                );
                Ok(self.enter(RewardStage::Inventory, ledger, catalog))
            }
            TimerKind::PlacementSettle => Ok(self.enter(RewardStage::TownUpdated, ledger, catalog)),
            TimerKind::DiceRoll | TimerKind::TokenMove => Err(EngineError::UnexpectedTimer {
                fired: kind,
                expected,
            }),
        }
    }

    /// The player pressed "continue".
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` on time-boxed stages and after Loop,
    /// or `PlacementPending` while an empty plot could still be built on.
    pub fn advance(
        &mut self,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
        rules: &RulesConfig,
    ) -> Result<StageStep, EngineError> {
        match self.stage {
            RewardStage::Inventory | RewardStage::TownUpdated | RewardStage::Recap => {
                let next = self.stage.next().unwrap_or(RewardStage::Loop);
                Ok(self.enter(next, ledger, catalog))
            }
            RewardStage::NextGoal => Ok(self.enter(RewardStage::Recap, ledger, catalog)),
            RewardStage::Placement => {
                if self.placed.is_some() {
                    return Err(EngineError::transition("placement settling", "continue"));
                }
                let placeable = Self::default_building(ledger, catalog).is_some();
                if placeable && !Self::empty_plots(ledger, rules).is_empty() {
                    return Err(EngineError::PlacementPending);
                }
                Ok(self.enter(RewardStage::TownUpdated, ledger, catalog))
            }
            RewardStage::Reveal | RewardStage::Loop => {
                Err(EngineError::transition(self.stage.label(), "continue"))
            }
        }
    }

    /// Jump to the recap from a stage that offers the shortcut.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` elsewhere.
    pub fn skip_to_recap(
        &mut self,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
    ) -> Result<StageStep, EngineError> {
        if !self.stage.can_skip_to_recap() {
            return Err(EngineError::transition(self.stage.label(), "skip to recap"));
        }
        Ok(self.enter(RewardStage::Recap, ledger, catalog))
    }

    /// Pick which building to place.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBuilding`, `InsufficientWealth` for a locked building
    /// the player cannot unlock, or `InvalidStateTransition` outside of the
    /// inventory and placement stages.
    pub fn select_building(
        &mut self,
        id: &BuildingId,
        ledger: &Ledger,
        catalog: &BuildingCatalog,
    ) -> Result<(), EngineError> {
        if !matches!(self.stage, RewardStage::Inventory | RewardStage::Placement)
            || self.placed.is_some()
        {
            return Err(EngineError::transition(
                self.stage.label(),
                "select a building",
            ));
        }
        let def = catalog.get(id).ok_or_else(|| EngineError::UnknownBuilding {
            building: id.clone(),
        })?;
        if !ledger.is_unlocked(id) && ledger.wealth() < def.cost {
            return Err(crate::ledger::LedgerError::InsufficientWealth {
                needed: def.cost,
                available: ledger.wealth(),
            }
            .into());
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    /// Click a plot: unlock (idempotent) then place the selected building.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of placement, `UnknownPlot`
    /// for plots off the map, `NothingPlaceable` when no building is owned or
    /// affordable, or the ledger's rejection. Occupied plots are a no-op.
    pub fn select_plot(
        &mut self,
        plot: PlotId,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
        rules: &RulesConfig,
    ) -> Result<PlacementResult, EngineError> {
        if self.stage != RewardStage::Placement {
            return Err(EngineError::transition(
                self.stage.label(),
                "place a building",
            ));
        }
        if plot.0 >= rules.town_plots {
            return Err(EngineError::UnknownPlot { plot });
        }
        if self.placed.is_some() {
            return Ok(PlacementResult::AlreadyPlaced);
        }
        if !ledger.is_plot_free(plot) {
            log::debug!("{plot} already built on; ignoring click");
            return Ok(PlacementResult::Occupied { plot });
        }
        let def = match &self.selected {
            Some(id) => catalog.get(id).ok_or_else(|| EngineError::UnknownBuilding {
                building: id.clone(),
            })?,
            None => Self::default_building(ledger, catalog)
                .ok_or(EngineError::NothingPlaceable)?,
        };

        // Unlock first so a failed placement cannot charge wealth.
        if !ledger.is_unlocked(&def.id) && ledger.wealth() < def.cost {
            return Err(crate::ledger::LedgerError::InsufficientWealth {
                needed: def.cost,
                available: ledger.wealth(),
            }
            .into());
        }
        ledger.unlock_building(&def.id, def.cost)?;
        ledger.place_building(plot, &def.id, def.placement_bonus)?;
        log::info!(
            "placed {} on {plot} (+{} wealth)",
            def.id,
            def.placement_bonus
        );
        self.placed = Some((plot, def.id.clone()));
        self.town_after = TownView::read(ledger, catalog);
        Ok(PlacementResult::Placed {
            plot,
            building: def.id.clone(),
        })
    }

    /// Preview one of the next-goal candidates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` outside of the next-goal stage, or
    /// `UnknownBuilding` for ids that are not among the candidates.
    pub fn preview_goal(
        &mut self,
        id: &BuildingId,
        ledger: &Ledger,
        catalog: &BuildingCatalog,
    ) -> Result<GoalOption, EngineError> {
        if self.stage != RewardStage::NextGoal {
            return Err(EngineError::transition(
                self.stage.label(),
                "preview a goal",
            ));
        }
        let option = Self::next_goals(ledger, catalog)
            .into_iter()
            .find(|goal| &goal.id == id)
            .ok_or_else(|| EngineError::UnknownBuilding {
                building: id.clone(),
            })?;
        self.goal_preview = Some(id.clone());
        Ok(option)
    }

    /// "Start module" on the previewed goal; moves on to the recap.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientWealth` when the goal is out of reach, or
    /// `InvalidStateTransition` without a preview on the next-goal stage.
    pub fn start_goal_module(
        &mut self,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
    ) -> Result<StageStep, EngineError> {
        let (RewardStage::NextGoal, Some(id)) = (self.stage, self.goal_preview.clone()) else {
            return Err(EngineError::transition(
                self.stage.label(),
                "start a goal module",
            ));
        };
        let def = catalog.get(&id).ok_or_else(|| EngineError::UnknownBuilding {
            building: id.clone(),
        })?;
        if ledger.wealth() < def.cost {
            return Err(crate::ledger::LedgerError::InsufficientWealth {
                needed: def.cost,
                available: ledger.wealth(),
            }
            .into());
        }
        self.goal_started = Some(id);
        Ok(self.enter(RewardStage::Recap, ledger, catalog))
    }

    fn enter(
        &mut self,
        stage: RewardStage,
        ledger: &mut Ledger,
        catalog: &BuildingCatalog,
    ) -> StageStep {
        log::debug!("reward stage {} -> {}", self.stage, stage);
        self.stage = stage;
        match stage {
            RewardStage::Recap => {
                self.grade = Some(recap_grade(ledger.stats()));
                StageStep::Advanced(stage)
            }
            RewardStage::Loop => {
                let outcome = RewardOutcome {
                    summary: self.summary.clone(),
                    placed: self.placed.clone(),
                    goal: self.goal_started.clone(),
                    grade: self.grade.unwrap_or_else(|| recap_grade(ledger.stats())),
                    town: TownView::read(ledger, catalog),
                };
                StageStep::Completed(outcome)
            }
            _ => StageStep::Advanced(stage),
        }
    }
}
