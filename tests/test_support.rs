//! In-memory `Database` and `EventBus` doubles shared by the integration
//! tests. Neither is meant to be realistic beyond what the bridge itself
//! reads and calls — they exist to drive the bridge, not to exercise a real
//! persistence layer or event transport.

use std::collections::HashMap;
use std::sync::Mutex as SyncMutex;

use async_trait::async_trait;
use syncbridge::db::Database;
use syncbridge::error::BridgeError;
use syncbridge::event::{Event, EventBus, EventType, NamespaceListener};
use syncbridge::model::{Data, Message, Operation, TokenPool, TokenTransfer};

#[derive(Default)]
pub struct FakeDatabase {
    messages: SyncMutex<HashMap<String, Message>>,
    data: SyncMutex<HashMap<String, Vec<Data>>>,
    pools: SyncMutex<HashMap<String, TokenPool>>,
    transfers: SyncMutex<HashMap<String, TokenTransfer>>,
    operations: SyncMutex<HashMap<String, Operation>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_message(&self, message: Message) {
        self.messages.lock().unwrap().insert(message.id.clone(), message);
    }

    pub fn insert_message_data(&self, message_id: &str, data: Vec<Data>) {
        self.data.lock().unwrap().insert(message_id.to_string(), data);
    }

    pub fn insert_operation(&self, operation: Operation) {
        self.operations.lock().unwrap().insert(operation.id.clone(), operation);
    }

    pub fn insert_pool(&self, pool: TokenPool) {
        self.pools.lock().unwrap().insert(pool.id.clone(), pool);
    }

    pub fn insert_transfer(&self, transfer: TokenTransfer) {
        self.transfers.lock().unwrap().insert(transfer.local_id.clone(), transfer);
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn get_message_by_id(&self, id: &str) -> Result<Option<Message>, BridgeError> {
        Ok(self.messages.lock().unwrap().get(id).cloned())
    }

    async fn get_token_pool_by_id(&self, id: &str) -> Result<Option<TokenPool>, BridgeError> {
        Ok(self.pools.lock().unwrap().get(id).cloned())
    }

    async fn get_token_transfer(&self, local_id: &str) -> Result<Option<TokenTransfer>, BridgeError> {
        Ok(self.transfers.lock().unwrap().get(local_id).cloned())
    }

    async fn get_operation_by_id(&self, id: &str) -> Result<Option<Operation>, BridgeError> {
        Ok(self.operations.lock().unwrap().get(id).cloned())
    }

    async fn get_message_data(&self, message: &Message, _inline: bool) -> Result<Vec<Data>, BridgeError> {
        Ok(self.data.lock().unwrap().get(&message.id).cloned().unwrap_or_default())
    }
}

/// Records every listener attached so tests can push events directly into
/// it, and counts attach calls so P1/I5 (attach-once) can be asserted on.
#[derive(Default)]
pub struct FakeEventBus {
    listeners: SyncMutex<HashMap<String, NamespaceListener>>,
    attach_count: SyncMutex<HashMap<String, u32>>,
}

impl FakeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_count(&self, namespace: &str) -> u32 {
        *self.attach_count.lock().unwrap().get(namespace).unwrap_or(&0)
    }

    /// Delivers `event` to the namespace's listener, as the real bus would.
    /// Panics if nothing has attached to the namespace yet — a test bug, not
    /// a bridge bug.
    pub async fn emit(&self, event: Event) {
        let listener = self
            .listeners
            .lock()
            .unwrap()
            .get(&event.namespace)
            .cloned()
            .expect("no listener attached for namespace");
        listener(event).await.expect("listener returned an error");
    }

    pub fn confirm(namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type: EventType::MessageConfirmed,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn reject(namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type: EventType::MessageRejected,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn pool_confirmed(namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type: EventType::PoolConfirmed,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn pool_rejected(namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type: EventType::PoolRejected,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn transfer_confirmed(namespace: &str, reference: &str) -> Event {
        Event {
            id: format!("evt-{reference}"),
            event_type: EventType::TransferConfirmed,
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        }
    }

    pub fn transfer_op_failed(namespace: &str, operation_id: &str) -> Event {
        Event {
            id: format!("evt-{operation_id}"),
            event_type: EventType::TransferOpFailed,
            namespace: namespace.to_string(),
            reference: operation_id.to_string(),
        }
    }
}

#[async_trait]
impl EventBus for FakeEventBus {
    async fn add_namespace_listener(
        &self,
        namespace: &str,
        callback: NamespaceListener,
    ) -> Result<(), BridgeError> {
        self.listeners.lock().unwrap().insert(namespace.to_string(), callback);
        *self.attach_count.lock().unwrap().entry(namespace.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
