//! Battle system constants - all tunable values in one place

// Default field size
pub const DEFAULT_WIDTH: i32 = 40;
pub const DEFAULT_HEIGHT: i32 = 30;

// Pathfinding
pub const ORTHOGONAL_STEP_COST: f32 = 1.0;
pub const DIAGONAL_STEP_COST: f32 = 1.414;
pub const PATH_NODE_BUDGET: usize = 600;
/// Soft cost for stepping through a living ally, far from the goal.
pub const ALLY_PENALTY_FAR: f32 = 1.5;
/// Soft cost for stepping through a living ally, near the goal.
pub const ALLY_PENALTY_NEAR: f32 = 2.5;
/// Chebyshev radius around the goal inside which the crowding penalty applies.
pub const CROWD_RADIUS: i32 = 5;

// Attack-type classification thresholds (max weapon range)
pub const REACH_THRESHOLD: i32 = 2;
pub const RANGED_THRESHOLD: i32 = 4;
pub const LONG_RANGE_THRESHOLD: i32 = 8;

// Commander AI
pub const FAST_SPEED_THRESHOLD: i32 = 6;
pub const FLANKER_FAST_FRACTION: f32 = 0.25;
pub const RANGED_HEAVY_FRACTION: f32 = 0.40;
pub const AGGRESSIVE_RANGED_FRACTION: f32 = 0.10;
/// An enemy below this health fraction counts as wounded (cheap kill).
pub const WOUNDED_HP_FRACTION: f32 = 0.4;
/// Screeners intercept enemies within this range of the ranged cluster.
pub const SCREEN_INTERCEPT_RANGE: i32 = 5;
/// Flank orders resolve to re-targeting once within this radius of the goal.
pub const FLANK_ARRIVE_RADIUS: i32 = 4;
pub const PROTECT_ARRIVE_RADIUS: i32 = 2;
/// Hold orders still fire at anything within weapon range plus this slack.
pub const HOLD_FIRE_SLACK: i32 = 2;

// Movement phases
/// Fleeing units move at least this fast toward their edge.
pub const MIN_FLEE_SPEED: i32 = 3;
/// Approaching units this far ahead of the army median lose 1 speed.
pub const COHESION_LEAD_THRESHOLD: i32 = 5;
/// Units within `max_range + ENGAGED_SLACK` of an enemy count as engaged.
pub const ENGAGED_SLACK: i32 = 1;
/// Rounds a fleeing unit must sit on its flee edge before leaving the field.
pub const FLEE_EDGE_ROUNDS: u32 = 2;

// Charges
/// Charge reach multiplier: a charge may cover up to speed * this factor.
pub const CHARGE_RANGE_FACTOR: i32 = 2;

// Siege maps
/// Wall column as a fraction of field width (numerator / denominator).
pub const WALL_X_NUM: i32 = 2;
pub const WALL_X_DEN: i32 = 3;
pub const GATE_HP: i32 = 10;
pub const GATE_SAVE: i32 = 3;
/// Gate cells in the wall, centered vertically.
pub const GATE_SPAN: i32 = 6;

// Dice pipeline
/// Save threshold cap: 7 is unsavable (d6 can never reach it).
pub const SAVE_CAP: i32 = 7;
pub const RAMPART_SAVE_BONUS: i32 = 2;
pub const PHALANX_SAVE_BONUS: i32 = 1;

// Morale
pub const MORALE_DIE: i32 = 6;
pub const HALF_CASUALTY_FRACTION: f32 = 0.5;
pub const SEVERE_CASUALTY_FRACTION: f32 = 0.75;
/// Adjacent enemies required to trigger an in-combat stress check.
pub const STRESS_CONTACT_COUNT: usize = 2;

// Downed / regeneration
pub const DOWN_TIMER_MIN: u32 = 4;
pub const DOWN_TIMER_MAX: u32 = 8;
pub const DOWN_HEAL_MIN: i32 = 1;
pub const DOWN_HEAL_MAX: i32 = 4;
