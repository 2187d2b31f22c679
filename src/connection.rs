use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::add::AddRequest;
use crate::ber::{BerClass, BerNode, TAG_SEQUENCE};
use crate::control::{encode_controls, Control};
use crate::error::LdapError;
use crate::message_id::{MessageId, MessageIdAllocator};

/// Write path to the server, provided by the caller. Implementations must
/// deliver the packet as one ordered unit; serialization of concurrent
/// transmits is the transport's concern.
pub trait Transport: Send + Sync {
    fn transmit(
        &self,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<(), LdapError>> + Send;
}

/// A decoded LDAPResult, produced by the connection's read loop and routed
/// back to the waiting caller by message ID.
#[derive(Debug, Clone)]
pub struct LdapResponse {
    pub result_code: i32,
    pub matched_dn: String,
    pub diagnostic_message: String,
}

impl LdapResponse {
    /// Result code 0 is success; anything else becomes a protocol error.
    pub fn success(self) -> Result<Self, LdapError> {
        if self.result_code == 0 {
            Ok(self)
        } else {
            Err(LdapError::Protocol {
                code: self.result_code,
                message: self.diagnostic_message,
            })
        }
    }
}

/// Rendezvous between callers waiting for replies and the read loop that
/// decodes them. A waiter registers before its packet is transmitted, so a
/// reply can never arrive ahead of its waiter.
#[derive(Debug, Default)]
pub struct ReplyRouter {
    pending: Mutex<HashMap<MessageId, oneshot::Sender<LdapResponse>>>,
}

impl ReplyRouter {
    fn pending(&self) -> MutexGuard<'_, HashMap<MessageId, oneshot::Sender<LdapResponse>>> {
        self.pending.lock().expect("reply router lock poisoned")
    }

    /// Register interest in the reply for `id`. Must happen before the
    /// request bytes reach the transport.
    pub fn register(&self, id: MessageId) -> oneshot::Receiver<LdapResponse> {
        let (tx, rx) = oneshot::channel();
        let previous = self.pending().insert(id, tx);
        debug_assert!(previous.is_none(), "message ID {} registered twice", id);
        rx
    }

    /// Hand a decoded reply to its waiter. Called by the read loop. A reply
    /// with no registered waiter (late, after timeout or cancellation) is
    /// logged and dropped; it never surfaces as a new response.
    pub fn deliver(&self, id: MessageId, response: LdapResponse) {
        let waiter = self.pending().remove(&id);
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    warn!("Waiter for message ID {} gone before delivery", id);
                }
            }
            None => {
                warn!("Discarding reply for message ID {} with no waiter", id);
            }
        }
    }

    /// Withdraw a waiter that gave up. Returns false if the entry was already
    /// gone (reply delivered first).
    pub fn deregister(&self, id: MessageId) -> bool {
        self.pending().remove(&id).is_some()
    }

    /// Drop every pending waiter; each sees its wait fail as cancelled.
    pub fn drain(&self) {
        let drained = {
            let mut pending = self.pending();
            let count = pending.len();
            pending.clear();
            count
        };
        if drained > 0 {
            debug!("Dropped {} pending waiters on connection close", drained);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}

/// Releases the message ID and its waiter registration on every exit path,
/// including the caller dropping its future mid-wait.
struct InFlightGuard<'a> {
    ids: &'a MessageIdAllocator,
    router: &'a ReplyRouter,
    id: MessageId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.router.deregister(self.id);
        self.ids.release(self.id);
    }
}

/// One LDAP connection's request side: allocates message IDs, wraps encoded
/// operations in the LDAPMessage envelope, transmits them and parks each
/// caller until the read loop routes its reply back.
#[derive(Debug)]
pub struct LdapConnection<T: Transport> {
    transport: T,
    ids: MessageIdAllocator,
    router: Arc<ReplyRouter>,
}

impl<T: Transport> LdapConnection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            ids: MessageIdAllocator::new(),
            router: Arc::new(ReplyRouter::default()),
        }
    }

    /// The router handle for the read loop that decodes inbound packets.
    pub fn router(&self) -> Arc<ReplyRouter> {
        Arc::clone(&self.router)
    }

    pub fn in_flight(&self) -> usize {
        self.ids.in_flight()
    }

    /// Send an Add and wait for its correlated response.
    pub async fn add(&self, request: &AddRequest) -> Result<LdapResponse, LdapError> {
        let operation = request.encode()?;
        self.send_request(operation, &request.controls, None).await
    }

    /// Like `add`, but gives up after `timeout`. The message ID is released
    /// and a reply arriving later is discarded by the router.
    pub async fn add_with_timeout(
        &self,
        request: &AddRequest,
        timeout: Duration,
    ) -> Result<LdapResponse, LdapError> {
        let operation = request.encode()?;
        self.send_request(operation, &request.controls, Some(timeout))
            .await
    }

    /// Shut down the request side: no new message IDs, and every caller
    /// still waiting is cancelled. Safe to call more than once.
    pub fn close(&self) {
        self.ids.shutdown();
        self.router.drain();
    }

    async fn send_request(
        &self,
        operation: BerNode,
        controls: &[Control],
        timeout: Option<Duration>,
    ) -> Result<LdapResponse, LdapError> {
        let id = self.ids.allocate().ok_or(LdapError::Closing)?;
        let guard = InFlightGuard {
            ids: &self.ids,
            router: &self.router,
            id,
        };

        let packet = build_envelope(id, operation, controls).to_bytes();
        let rx = self.router.register(id);
        debug!("Sending message ID {} ({} bytes)", id, packet.len());
        self.transport.transmit(&packet).await?;

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received.map_err(|_| LdapError::Cancelled),
                Err(_) => {
                    warn!("Timed out waiting for reply to message ID {}", id);
                    Err(LdapError::Timeout { id })
                }
            },
            None => rx.await.map_err(|_| LdapError::Cancelled),
        };
        drop(guard);
        outcome
    }
}

/// LDAPMessage ::= SEQUENCE { messageID, protocolOp, controls [0] OPTIONAL }.
/// The controls container is omitted entirely when there are none.
pub(crate) fn build_envelope(
    id: MessageId,
    operation: BerNode,
    controls: &[Control],
) -> BerNode {
    let mut envelope = BerNode::constructed(BerClass::Universal, TAG_SEQUENCE, "LDAP Message");
    envelope.append_child(BerNode::integer(id as i64, "Message ID"));
    envelope.append_child(operation);
    if !controls.is_empty() {
        envelope.append_child(encode_controls(controls));
    }
    envelope
}
