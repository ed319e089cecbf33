//! Centralized balance and tuning constants for the Cashloop reference rules.
//!
//! These are the defaults fed into [`crate::config::RulesConfig`]. Hosts can
//! override any of them through a rules file; the engine never reads these
//! directly outside of config defaults.

// Board ---------------------------------------------------------------------
pub(crate) const DICE_FACES: u8 = 6;

// Round economy -------------------------------------------------------------
pub(crate) const STARTING_WALLET: u32 = 200;
pub(crate) const WIN_THRESHOLD: u32 = 500;

// Tile effects --------------------------------------------------------------
pub(crate) const START_TILE_CREDIT: u32 = 20;
pub(crate) const SAVE_TILE_DEPOSIT: u32 = 50;
pub(crate) const INTEREST_RATE_PERCENT: u32 = 10;
pub(crate) const SCAM_LOSS: u32 = 30;
pub(crate) const SCAM_REPORT_REWARD: u32 = 10;
pub(crate) const BUDGET_AMOUNT: u32 = 40;
pub(crate) const PROPERTY_PRICE: u32 = 150;

// Loans ---------------------------------------------------------------------
pub(crate) const LOAN_TILE_BORROW: u32 = 100;
pub(crate) const LOAN_TILE_OWED: u32 = 120;
pub(crate) const PROPERTY_LOAN_BORROW: u32 = 150;
pub(crate) const PROPERTY_LOAN_OWED: u32 = 180;
pub(crate) const LAP_REPAYMENT: u32 = 40;

// Town ----------------------------------------------------------------------
pub(crate) const TOWN_PLOTS: u8 = 12;
pub(crate) const BUILDINGS_PER_TOWN_LEVEL: usize = 3;
pub(crate) const NEXT_GOAL_COUNT: usize = 3;

// Pacing (milliseconds, presentational only) ---------------------------------
pub(crate) const DICE_ROLL_MS: u32 = 900;
pub(crate) const TOKEN_MOVE_MS: u32 = 600;
pub(crate) const REWARD_REVEAL_MS: u32 = 1_500;
pub(crate) const PLACEMENT_SETTLE_MS: u32 = 800;

// Progression ---------------------------------------------------------------
pub(crate) const QUIZ_QUESTIONS: usize = 3;
pub(crate) const MAX_STARS: u8 = 3;

// Storage keys --------------------------------------------------------------
pub(crate) const PROFILE_KEY: &str = "cashloop.profile";
pub(crate) const CHAPTER_KEY_PREFIX: &str = "cashloop.chapter.";
