use std::fmt;

use crate::Amount;
use crate::model::ReportRecord;
use crate::notify::{MessageColor, MessageIcon, Notification};

pub const SUMMARY_TITLE: &str = "New funds available!";
const SUMMARY_HEADER: &str = "Your recent research efforts have granted you the following rewards:";

/// Everything drained by one flush, with its totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    records: Vec<ReportRecord>,
    total_funds: Amount,
    total_reputation: Amount,
}

impl Summary {
    pub fn new(records: Vec<ReportRecord>) -> Self {
        let total_funds = records.iter().map(ReportRecord::funds).sum();
        let total_reputation = records.iter().map(ReportRecord::reputation).sum();
        Self {
            records,
            total_funds,
            total_reputation,
        }
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    pub fn total_funds(&self) -> Amount {
        self.total_funds
    }

    pub fn total_reputation(&self) -> Amount {
        self.total_reputation
    }

    /// Notification text; every line is newline-terminated.
    pub fn body(&self) -> String {
        self.to_string()
    }

    pub fn to_notification(&self) -> Notification {
        Notification::new(
            SUMMARY_TITLE,
            self.body(),
            MessageColor::Blue,
            MessageIcon::Message,
        )
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SUMMARY_HEADER}")?;
        writeln!(f)?;
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Total: {} funds, {} reputation.",
            self.total_funds, self.total_reputation
        )
    }
}
