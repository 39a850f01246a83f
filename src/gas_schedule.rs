//! Fork-aware gas schedules.
//!
//! This module defines the gas costs and refunds that vary across hard
//! forks. Costs that never changed (arithmetic, memory, logs) stay as plain
//! constants in `gas_cost.rs`.
//!
//! # Fork history (gas-relevant changes)
//!
//! - **Frontier/Homestead**: original costs.
//! - **Tangerine Whistle (EIP-150)**: IO repricing (SLOAD, BALANCE,
//!   EXTCODE*, CALL, SELFDESTRUCT) and the 63/64 call gas rule.
//! - **Spurious Dragon (EIP-158/160/161)**: EXP byte cost, empty-account
//!   semantics for the new-account surcharges.
//! - **Byzantium and later**: unchanged within the supported range.

use crate::environment::Fork;

/// Gas costs and refunds that vary by fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    // Storage
    pub sload: u64,
    pub sstore_set: u64,
    pub sstore_reset: u64,
    pub sstore_clears_refund: u64,

    // Account access
    pub balance: u64,
    pub extcodesize: u64,
    pub extcodecopy_base: u64,
    pub extcodehash: u64,

    // Call family (base cost; endowment/new-account surcharges are separate)
    pub call_base: u64,
    pub call_value: u64,
    pub call_stipend: u64,
    pub call_new_account: u64,

    // Contract creation
    pub create: u64,
    pub code_deposit: u64,

    // Self-destruct
    pub selfdestruct: u64,
    pub selfdestruct_new_account: u64,
    pub selfdestruct_refund: u64,

    // EXP dynamic cost per exponent byte (EIP-160 repriced this)
    pub exp_byte: u64,

    /// EIP-150: subcalls keep 1/64 of the remaining gas for the caller.
    /// Before that, a caller could forward everything it had.
    pub has_63_64_rule: bool,

    /// EIP-161: new-account surcharges trigger on *empty* accounts receiving
    /// value, instead of on non-existent accounts.
    pub has_empty_account_semantics: bool,
}

impl FeeSchedule {
    /// The fee schedule active for a given fork.
    pub const fn for_fork(fork: Fork) -> &'static FeeSchedule {
        match fork {
            Fork::Frontier | Fork::Homestead => &FRONTIER_SCHEDULE,
            Fork::Tangerine => &TANGERINE_WHISTLE_SCHEDULE,
            Fork::SpuriousDragon => &SPURIOUS_DRAGON_SCHEDULE,
            Fork::Byzantium | Fork::Constantinople | Fork::Petersburg => &BYZANTIUM_SCHEDULE,
        }
    }
}

/// Frontier/Homestead schedule: the original Yellow Paper costs.
pub static FRONTIER_SCHEDULE: FeeSchedule = FeeSchedule {
    sload: 50,
    sstore_set: 20000,
    sstore_reset: 5000,
    sstore_clears_refund: 15000,

    balance: 20,
    extcodesize: 20,
    extcodecopy_base: 20,
    extcodehash: 20, // opcode did not exist yet

    call_base: 40,
    call_value: 9000,
    call_stipend: 2300,
    call_new_account: 25000,

    create: 32000,
    code_deposit: 200,

    selfdestruct: 0,
    selfdestruct_new_account: 0,
    selfdestruct_refund: 24000,

    exp_byte: 10,

    has_63_64_rule: false,
    has_empty_account_semantics: false,
};

/// Tangerine Whistle schedule (EIP-150): IO repricing against DoS attacks.
pub static TANGERINE_WHISTLE_SCHEDULE: FeeSchedule = FeeSchedule {
    sload: 200,

    balance: 400,
    extcodesize: 700,
    extcodecopy_base: 700,
    extcodehash: 400, // opcode did not exist yet

    call_base: 700,

    selfdestruct: 5000,
    selfdestruct_new_account: 25000,

    has_63_64_rule: true,

    ..FRONTIER_SCHEDULE
};

/// Spurious Dragon schedule: EXP repricing (EIP-160) and empty-account
/// semantics (EIP-161).
pub static SPURIOUS_DRAGON_SCHEDULE: FeeSchedule = FeeSchedule {
    exp_byte: 50,
    has_empty_account_semantics: true,
    ..TANGERINE_WHISTLE_SCHEDULE
};

/// Byzantium through Petersburg: no further changes to these costs.
pub static BYZANTIUM_SCHEDULE: FeeSchedule = SPURIOUS_DRAGON_SCHEDULE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontier_schedule() {
        let schedule = FeeSchedule::for_fork(Fork::Frontier);
        assert_eq!(schedule.sload, 50);
        assert_eq!(schedule.balance, 20);
        assert_eq!(schedule.call_base, 40);
        assert_eq!(schedule.exp_byte, 10);
        assert!(!schedule.has_63_64_rule);
    }

    #[test]
    fn homestead_shares_frontier_costs() {
        assert_eq!(
            FeeSchedule::for_fork(Fork::Homestead),
            FeeSchedule::for_fork(Fork::Frontier)
        );
    }

    #[test]
    fn tangerine_whistle_schedule() {
        let schedule = FeeSchedule::for_fork(Fork::Tangerine);
        assert_eq!(schedule.sload, 200);
        assert_eq!(schedule.balance, 400);
        assert_eq!(schedule.call_base, 700);
        assert_eq!(schedule.selfdestruct, 5000);
        assert!(schedule.has_63_64_rule);
        // EIP-160 is not active yet
        assert_eq!(schedule.exp_byte, 10);
    }

    #[test]
    fn spurious_dragon_schedule() {
        let schedule = FeeSchedule::for_fork(Fork::SpuriousDragon);
        assert_eq!(schedule.exp_byte, 50);
        assert!(schedule.has_empty_account_semantics);
    }

    #[test]
    fn byzantium_matches_spurious_dragon() {
        assert_eq!(
            FeeSchedule::for_fork(Fork::Byzantium),
            FeeSchedule::for_fork(Fork::SpuriousDragon)
        );
        assert_eq!(
            FeeSchedule::for_fork(Fork::Petersburg),
            FeeSchedule::for_fork(Fork::Byzantium)
        );
    }

    #[test]
    fn storage_costs_never_changed_in_range() {
        for fork in [Fork::Frontier, Fork::Tangerine, Fork::Petersburg] {
            let schedule = FeeSchedule::for_fork(fork);
            assert_eq!(schedule.sstore_set, 20000);
            assert_eq!(schedule.sstore_reset, 5000);
            assert_eq!(schedule.sstore_clears_refund, 15000);
        }
    }
}
