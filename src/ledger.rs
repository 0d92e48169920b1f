//! Currency and reputation ledger the batcher credits eagerly.

use tracing::debug;

use crate::Amount;
use crate::model::TransactionReason;

/// Receives the converted amounts of every non-zero science event.
pub trait Ledger {
    fn add_funds(&mut self, amount: Amount, reason: TransactionReason);
    fn add_reputation(&mut self, amount: Amount, reason: TransactionReason);
}

impl<L: Ledger + ?Sized> Ledger for &mut L {
    fn add_funds(&mut self, amount: Amount, reason: TransactionReason) {
        (**self).add_funds(amount, reason);
    }

    fn add_reputation(&mut self, amount: Amount, reason: TransactionReason) {
        (**self).add_reputation(amount, reason);
    }
}

/// In-memory ledger keeping running totals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Treasury {
    funds: Amount,
    reputation: Amount,
    credits: u64,
}

impl Treasury {
    pub fn funds(&self) -> Amount {
        self.funds
    }

    pub fn reputation(&self) -> Amount {
        self.reputation
    }

    /// Number of individual credit calls received.
    pub fn credits(&self) -> u64 {
        self.credits
    }
}

impl Ledger for Treasury {
    fn add_funds(&mut self, amount: Amount, reason: TransactionReason) {
        self.funds += amount;
        self.credits += 1;
        debug!(amount = %amount, ?reason, total = %self.funds, "funds credited");
    }

    fn add_reputation(&mut self, amount: Amount, reason: TransactionReason) {
        self.reputation += amount;
        self.credits += 1;
        debug!(amount = %amount, ?reason, total = %self.reputation, "reputation credited");
    }
}
