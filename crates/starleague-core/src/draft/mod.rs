// Snake draft: pick order, per-pick budgets and pick legality.

pub mod budget;
pub mod order;
pub mod pick;

pub use budget::budget_for;
pub use order::{next_pick, snake_order, validate_draft_order, PickSlot};
pub use pick::{
    pool_exhausted, validate_pick, validate_withdraw, PickPlan, PickRequest, TeamBudget, WithdrawPlan,
};
