use crate::protocol::Envelope;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// One outbound item for the connection-driving loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(Envelope),
    /// Last command of a session: sent, then the loop closes the channel and exits.
    Disconnect(Envelope),
}

impl Command {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Command::Send(envelope) | Command::Disconnect(envelope) => envelope,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, Command::Disconnect(_))
    }
}

/// Unbounded FIFO between the application (producer) and the loop (single consumer).
/// The reconnection path can put a burst in front of everything already waiting.
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: Mutex<VecDeque<Command>>,
    notify: Notify,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never blocks.
    pub fn push_back(&self, command: Command) {
        self.items.lock().unwrap().push_back(command);
        self.notify.notify_one();
    }

    /// Puts `commands` at the head of the queue, keeping their relative order.
    pub fn push_front_all<I>(&self, commands: I)
    where
        I: IntoIterator<Item = Command>,
        I::IntoIter: DoubleEndedIterator,
    {
        {
            let mut items = self.items.lock().unwrap();
            for command in commands.into_iter().rev() {
                items.push_front(command);
            }
        }
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<Command> {
        self.items.lock().unwrap().pop_front()
    }

    /// Waits for the next command. Cancel-safe: a dropped call never loses a command.
    pub async fn pop(&self) -> Command {
        loop {
            let notified = self.notify.notified();
            if let Some(command) = self.try_pop() {
                return command;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Copy of the pending commands, head first.
    pub fn snapshot(&self) -> Vec<Command> {
        self.items.lock().unwrap().iter().cloned().collect()
    }
}
