//! Account-scoped change notifications

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::models::{AccountId, Transaction};

/// A change delivered to ledger views
#[derive(Debug, Clone)]
pub enum Message {
    TransactionAdded {
        account: AccountId,
        transaction: Arc<Transaction>,
    },
    TransactionRemoved {
        account: AccountId,
        transaction: Arc<Transaction>,
    },
    FileClosing,
}

impl Message {
    /// The account a message is scoped to; `None` for broadcast messages
    pub fn account(&self) -> Option<&AccountId> {
        match self {
            Message::TransactionAdded { account, .. } | Message::TransactionRemoved { account, .. } => {
                Some(account)
            }
            Message::FileClosing => None,
        }
    }
}

struct Subscriber {
    account: Option<AccountId>,
    sender: UnboundedSender<Message>,
}

/// Fan-out of messages to account subscribers
///
/// Posting never blocks. Subscribers whose receiving end was dropped are
/// pruned on the next post.
#[derive(Clone, Default)]
pub struct MessageBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive messages for one account, plus broadcasts
    pub fn subscribe(&self, account: AccountId) -> Subscription {
        self.register(Some(account))
    }

    /// Receive every message
    pub fn subscribe_all(&self) -> Subscription {
        self.register(None)
    }

    fn register(&self, account: Option<AccountId>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push(Subscriber { account, sender });
        Subscription { account, receiver }
    }

    pub fn post(&self, message: Message) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|subscriber| {
            let wanted = match (subscriber.account, message.account()) {
                (Some(mine), Some(theirs)) => &mine == theirs,
                _ => true,
            };
            if !wanted {
                return !subscriber.sender.is_closed();
            }
            subscriber.sender.send(message.clone()).is_ok()
        });
        log::trace!("posted {:?} to {} subscribers", message.account(), subscribers.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Receiving end of a bus subscription
pub struct Subscription {
    account: Option<AccountId>,
    receiver: UnboundedReceiver<Message>,
}

impl Subscription {
    pub fn account(&self) -> Option<&AccountId> {
        self.account.as_ref()
    }

    /// Next queued message without waiting
    pub fn try_next(&mut self) -> Option<Message> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next message; `None` once every bus handle is gone
    pub async fn next(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}
