use crate::{constants::MAX_CODE_SIZE, gas_schedule::FeeSchedule};
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Hard forks the interpreter can execute under. Ordering matters: feature
/// gates are expressed as `fork >= Fork::X`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Fork {
    Frontier,
    Homestead,
    /// EIP-150: IO repricing and the 63/64 call gas rule.
    Tangerine,
    /// EIP-155/158/160/161/170.
    SpuriousDragon,
    /// EIP-140/211/214: REVERT, RETURNDATA*, STATICCALL.
    Byzantium,
    /// EIP-145/1014/1052: shifts, CREATE2, EXTCODEHASH.
    Constantinople,
    #[default]
    Petersburg,
}

/// Fork activation heights, the way a chain definition file states them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub homestead_block: u64,
    pub tangerine_block: u64,
    pub spurious_dragon_block: u64,
    pub byzantium_block: u64,
    pub constantinople_block: u64,
    pub petersburg_block: u64,
}

impl ChainConfig {
    /// The fork active at a given block height.
    pub fn fork_at(&self, block_number: u64) -> Fork {
        if block_number >= self.petersburg_block {
            Fork::Petersburg
        } else if block_number >= self.constantinople_block {
            Fork::Constantinople
        } else if block_number >= self.byzantium_block {
            Fork::Byzantium
        } else if block_number >= self.spurious_dragon_block {
            Fork::SpuriousDragon
        } else if block_number >= self.tangerine_block {
            Fork::Tangerine
        } else if block_number >= self.homestead_block {
            Fork::Homestead
        } else {
            Fork::Frontier
        }
    }

    /// Mainnet activation heights.
    pub fn mainnet() -> Self {
        Self {
            homestead_block: 1_150_000,
            tangerine_block: 2_463_000,
            spurious_dragon_block: 2_675_000,
            byzantium_block: 4_370_000,
            constantinople_block: 7_280_000,
            petersburg_block: 7_280_000,
        }
    }
}

/// Recognized execution options. Everything here is derived from the fork by
/// default, but hosts may override individual knobs (private chains do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmConfig {
    pub fork: Fork,
    /// EIP-170: deployments larger than this fail. `None` disables the cap.
    pub max_code_size: Option<usize>,
    /// Homestead (EIP-2): running out of gas while paying the code deposit
    /// is an exceptional failure instead of deploying an empty contract.
    pub exceptional_failed_code_deposit: bool,
    /// EIP-161: SELFDESTRUCT pays the new-account surcharge only when
    /// sending a positive balance to an empty account.
    pub charge_selfdestruct_for_new_account: bool,
}

impl EvmConfig {
    pub fn new(fork: Fork) -> Self {
        Self {
            fork,
            max_code_size: (fork >= Fork::SpuriousDragon).then_some(MAX_CODE_SIZE),
            exceptional_failed_code_deposit: fork >= Fork::Homestead,
            charge_selfdestruct_for_new_account: fork >= Fork::SpuriousDragon,
        }
    }

    pub fn schedule(&self) -> &'static FeeSchedule {
        FeeSchedule::for_fork(self.fork)
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self::new(Fork::default())
    }
}

/// Destination of the message the host asks the VM to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Call(Address),
    Create,
}

/// Per-transaction constants shared by every frame: the originating account,
/// gas pricing and the block context queried by the environment opcodes.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Externally owned account that initiated the top level call.
    pub origin: Address,
    pub gas_price: U256,
    /// Gas provided to the top level frame.
    pub gas_limit: u64,
    pub block_number: U256,
    pub coinbase: Address,
    pub timestamp: U256,
    pub difficulty: U256,
    pub block_gas_limit: u64,
    pub config: EvmConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_resolution_by_block_height() {
        let config = ChainConfig::mainnet();
        assert_eq!(config.fork_at(0), Fork::Frontier);
        assert_eq!(config.fork_at(1_150_000), Fork::Homestead);
        assert_eq!(config.fork_at(2_462_999), Fork::Homestead);
        assert_eq!(config.fork_at(2_463_000), Fork::Tangerine);
        assert_eq!(config.fork_at(2_675_000), Fork::SpuriousDragon);
        assert_eq!(config.fork_at(4_370_000), Fork::Byzantium);
        assert_eq!(config.fork_at(10_000_000), Fork::Petersburg);
    }

    #[test]
    fn config_gates_follow_fork() {
        let frontier = EvmConfig::new(Fork::Frontier);
        assert_eq!(frontier.max_code_size, None);
        assert!(!frontier.exceptional_failed_code_deposit);
        assert!(!frontier.charge_selfdestruct_for_new_account);

        let byzantium = EvmConfig::new(Fork::Byzantium);
        assert_eq!(byzantium.max_code_size, Some(0x6000));
        assert!(byzantium.exceptional_failed_code_deposit);
        assert!(byzantium.charge_selfdestruct_for_new_account);
    }
}
