//! User-facing notification surface.

use std::io::Write;

use tracing::error;

/// Button color of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageColor {
    Blue,
    Red,
}

/// Button icon of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageIcon {
    Message,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub color: MessageColor,
    pub icon: MessageIcon,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        color: MessageColor,
        icon: MessageIcon,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            color,
            icon,
        }
    }
}

/// Displays notifications to the user.
pub trait Notifier {
    fn post(&mut self, notification: Notification);
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn post(&mut self, notification: Notification) {
        (**self).post(notification);
    }
}

/// Notifier that keeps every posted message, in order.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    posted: Vec<Notification>,
}

impl Outbox {
    pub fn posted(&self) -> &[Notification] {
        &self.posted
    }

    pub fn len(&self) -> usize {
        self.posted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posted.is_empty()
    }

    pub fn last(&self) -> Option<&Notification> {
        self.posted.last()
    }
}

impl Notifier for Outbox {
    fn post(&mut self, notification: Notification) {
        self.posted.push(notification);
    }
}

/// Notifier printing each message as a `[title]` line followed by the body,
/// newline-terminated.
///
/// Write failures are logged and otherwise ignored.
pub struct WriterNotifier<W> {
    writer: W,
}

impl<W: Write> WriterNotifier<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterNotifier<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Notifier for WriterNotifier<W> {
    fn post(&mut self, notification: Notification) {
        let terminator = if notification.body.ends_with('\n') { "" } else { "\n" };
        let result = writeln!(self.writer, "[{}]", notification.title)
            .and_then(|()| write!(self.writer, "{}{terminator}", notification.body))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            error!(title = %notification.title, "failed to write notification: {e}");
        }
    }
}
