pub mod amount;
pub mod bus;
pub mod csv;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod queue;
pub mod settings;
pub mod timer;

pub use amount::Amount;
pub use bus::{ScienceBus, Subscription, SubscriptionId};
pub use ledger::{Ledger, Treasury};
pub use model::{ReportRecord, ScienceEvent, TransactionReason};
pub use notify::{MessageColor, MessageIcon, Notification, Notifier, Outbox, WriterNotifier};
pub use queue::{BatchQueue, Summary};
pub use settings::{Settings, SettingsError};
pub use timer::{OneShotTimer, TimerState};
