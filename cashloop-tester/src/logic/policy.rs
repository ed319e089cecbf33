use std::fmt;
use std::str::FromStr;

use cashloop_game::{BuildingCard, BuildingId, ChoiceId, Decision, Ledger, PlotId};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice: ChoiceId,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(choice: ChoiceId, rationale: Option<String>) -> Self {
        Self { choice, rationale }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Select one of the enabled choices on a tile prompt.
    fn pick_choice(&mut self, ledger: &Ledger, decision: &Decision) -> PolicyDecision;

    /// Building to place after a win, or `None` for the engine's default.
    fn pick_building(&mut self, _ledger: &Ledger, _cards: &[BuildingCard]) -> Option<BuildingId> {
        None
    }

    /// Plot to build on.
    fn pick_plot(&mut self, free: &[PlotId]) -> Option<PlotId> {
        free.first().copied()
    }

    /// Answer a quiz question with `options` choices. `correct` is the key.
    fn answer_quiz(&mut self, correct: usize, _options: usize) -> usize {
        correct
    }
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Cautious,
    Spender,
    Borrower,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Cautious, Self::Spender, Self::Borrower, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Spender => "Spender",
            Self::Borrower => "Borrower",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::Spender => "spender",
            Self::Borrower => "borrower",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Spender => Box::new(SpenderPolicy),
            Self::Borrower => Box::new(BorrowerPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameplayStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy '{s}'"))
    }
}

struct CautiousPolicy;
struct SpenderPolicy;
struct BorrowerPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

/// First enabled choice in `preference`, else the first enabled one at all.
fn prefer(decision: &Decision, preference: &[ChoiceId]) -> ChoiceId {
    preference
        .iter()
        .copied()
        .find(|id| decision.choice(*id).is_some_and(|c| c.is_enabled()))
        .or_else(|| decision.enabled_choices().next().map(|c| c.id))
        .unwrap_or(ChoiceId::Skip)
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn pick_choice(&mut self, _ledger: &Ledger, decision: &Decision) -> PolicyDecision {
        let choice = prefer(
            decision,
            &[
                ChoiceId::ReportScam,
                ChoiceId::Collect,
                ChoiceId::Deposit,
                ChoiceId::SaveForGoal,
                ChoiceId::Pass,
                ChoiceId::Decline,
                ChoiceId::Skip,
            ],
        );
        PolicyDecision::new(choice, Some("save first".to_string()))
    }

    fn pick_building(&mut self, ledger: &Ledger, cards: &[BuildingCard]) -> Option<BuildingId> {
        // Reuse owned buildings rather than spending wealth.
        cards
            .iter()
            .find(|card| card.owned)
            .or_else(|| {
                cards
                    .iter()
                    .find(|card| card.affordable && ledger.wealth() >= card.cost)
            })
            .map(|card| card.id.clone())
    }
}

impl PlayerPolicy for SpenderPolicy {
    fn name(&self) -> &'static str {
        "Spender"
    }

    fn pick_choice(&mut self, _ledger: &Ledger, decision: &Decision) -> PolicyDecision {
        let choice = prefer(
            decision,
            &[
                ChoiceId::SpendOnWant,
                ChoiceId::BuyOutright,
                ChoiceId::Collect,
                ChoiceId::ReportScam,
                ChoiceId::Skip,
                ChoiceId::Decline,
                ChoiceId::Pass,
            ],
        );
        PolicyDecision::new(choice, Some("spend now".to_string()))
    }

    fn pick_building(&mut self, _ledger: &Ledger, cards: &[BuildingCard]) -> Option<BuildingId> {
        cards
            .iter()
            .filter(|card| card.owned || card.affordable)
            .max_by_key(|card| card.cost)
            .map(|card| card.id.clone())
    }

    fn pick_plot(&mut self, free: &[PlotId]) -> Option<PlotId> {
        free.last().copied()
    }
}

impl PlayerPolicy for BorrowerPolicy {
    fn name(&self) -> &'static str {
        "Borrower"
    }

    fn pick_choice(&mut self, ledger: &Ledger, decision: &Decision) -> PolicyDecision {
        let choice = prefer(
            decision,
            &[
                ChoiceId::TakeLoan,
                ChoiceId::Finance,
                ChoiceId::ReportScam,
                ChoiceId::Collect,
                ChoiceId::Deposit,
                ChoiceId::SaveForGoal,
                ChoiceId::Skip,
                ChoiceId::Pass,
            ],
        );
        let rationale = format!("outstanding {}", ledger.loan().outstanding());
        PolicyDecision::new(choice, Some(rationale))
    }

    fn answer_quiz(&mut self, correct: usize, options: usize) -> usize {
        // Misses unless the key is the last option.
        if correct + 1 < options { correct + 1 } else { correct }
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_choice(&mut self, _ledger: &Ledger, decision: &Decision) -> PolicyDecision {
        let enabled: Vec<ChoiceId> = decision.enabled_choices().map(|c| c.id).collect();
        let choice = enabled
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ChoiceId::Skip);
        PolicyDecision::new(choice, None)
    }

    fn pick_plot(&mut self, free: &[PlotId]) -> Option<PlotId> {
        free.choose(&mut self.rng).copied()
    }

    fn answer_quiz(&mut self, _correct: usize, options: usize) -> usize {
        self.rng.gen_range(0..options.max(1))
    }
}
