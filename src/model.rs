//! Core domain types for the reward batcher.

use std::fmt;

use crate::Amount;

/// Raw event delivered by the host whenever science is received.
#[derive(Debug, Clone, PartialEq)]
pub struct ScienceEvent {
    /// Science points received; zero carries no reward.
    pub science: f64,
    /// Title of the experiment or subject that produced the science.
    pub subject: String,
}

impl ScienceEvent {
    pub fn new(science: f64, subject: impl Into<String>) -> Self {
        Self {
            science,
            subject: subject.into(),
        }
    }
}

/// Reason attached to every ledger credit issued by the batcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionReason {
    ScienceTransmission,
}

/// One converted reward, waiting in the backlog until the next flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    funds: Amount,
    reputation: Amount,
    subject: String,
}

impl ReportRecord {
    pub fn new(funds: Amount, reputation: Amount, subject: impl Into<String>) -> Self {
        Self {
            funds,
            reputation,
            subject: subject.into(),
        }
    }

    pub fn funds(&self) -> Amount {
        self.funds
    }

    pub fn reputation(&self) -> Amount {
        self.reputation
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Two-line block used in the flush notification.
impl fmt::Display for ReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " * {}:\n     {:.1} funds, {:.1} rep.",
            self.subject, self.funds, self.reputation
        )
    }
}
