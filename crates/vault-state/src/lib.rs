//! Vault balance ledger: replays withdrawals and on-chain events against
//! an SPV vault's state.
//!
//! Authoritative mutation happens one confirmed event at a time through
//! [`VaultState::apply_event`]; [`VaultState::calculate_state_after`] is
//! the pure projection used to predict balances for a batch of
//! not-yet-confirmed withdrawals.  Both paths share the same arithmetic
//! and ordering checks.

mod errors;
mod events;
mod state;
mod withdrawal_state;

pub use errors::*;
pub use events::*;
pub use state::*;
pub use withdrawal_state::*;
