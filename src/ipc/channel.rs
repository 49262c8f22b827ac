/*!
 * Broker Channels
 * One dedicated worker thread per client connection
 *
 * Requests on a channel are served strictly in order; distinct channels run
 * concurrently and share nothing but the read-only session.
 */

use crate::api::session::BrokerSession;
use crate::core::errors::BrokerResult;
use crate::core::types::{ChannelId, ErrorCode};
use crate::security::BrokerConfig;
use crate::syscalls::{OperationRequest, OperationResponse};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use super::codec::{decode_request, encode_request, encode_response, EncodedResponse};

/// Failure of the channel itself. The operation may or may not have run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Broker channel is closed")]
    Disconnected,

    #[error("Broker dropped the request without replying")]
    NoReply,

    #[error("Malformed frame: {0}")]
    Malformed(String),
}

/// One queued request and where its answer goes
struct Envelope {
    frame: Bytes,
    reply: flume::Sender<EncodedResponse>,
}

/// Owns the session and spawns channel workers
#[derive(Clone)]
pub struct BrokerService {
    session: Arc<BrokerSession>,
    next_channel: Arc<AtomicU64>,
}

impl BrokerService {
    pub fn new(session: Arc<BrokerSession>) -> Self {
        Self {
            session,
            next_channel: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Initialize a fresh session. Initialization failure is fatal.
    pub fn start(config: &BrokerConfig) -> BrokerResult<Self> {
        let session = Arc::new(BrokerSession::new());
        session.initialize(config)?;
        Ok(Self::new(session))
    }

    pub fn session(&self) -> &Arc<BrokerSession> {
        &self.session
    }

    /// Spawn a worker for a new client connection
    pub fn open_channel(&self) -> BrokerResult<ChannelHandle> {
        let id = self.next_channel.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = flume::unbounded::<Envelope>();
        let session = Arc::clone(&self.session);

        let worker = thread::Builder::new()
            .name(format!("broker-channel-{}", id))
            .spawn(move || serve(id, &session, &receiver))?;

        info!(channel = id, "Channel opened");
        Ok(ChannelHandle {
            id,
            sender: Some(sender),
            worker: Some(worker),
        })
    }
}

/// Worker loop: decode, dispatch, encode, reply; until every sender is gone
fn serve(channel: ChannelId, session: &BrokerSession, receiver: &flume::Receiver<Envelope>) {
    let span = info_span!("channel", channel);
    let _guard = span.enter();

    while let Ok(Envelope { frame, reply }) = receiver.recv() {
        let response = match decode_request(&frame) {
            Ok(request) => session.dispatch_for(Some(channel), request),
            Err(err) => {
                warn!(%err, "Malformed request frame");
                OperationResponse::failure(ErrorCode::from_errno(libc::EINVAL))
            }
        };

        let encoded = match encode_response(response) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(%err, "Response could not be encoded");
                match encode_response(OperationResponse::failure(ErrorCode::from_errno(
                    libc::EMSGSIZE,
                ))) {
                    Ok(encoded) => encoded,
                    Err(_) => continue,
                }
            }
        };

        // An undelivered descriptor is dropped (closed) with the reply
        if reply.send(encoded).is_err() {
            debug!("Caller went away before the reply");
        }
    }

    info!("Channel closed");
}

/// Caller end of one channel
pub struct ChannelHandle {
    id: ChannelId,
    sender: Option<flume::Sender<Envelope>>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn sender(&self) -> Result<&flume::Sender<Envelope>, TransportError> {
        self.sender.as_ref().ok_or(TransportError::Disconnected)
    }

    fn envelope(
        request: &OperationRequest,
    ) -> Result<(Envelope, flume::Receiver<EncodedResponse>), TransportError> {
        let frame = encode_request(request).map_err(|e| TransportError::Malformed(e.to_string()))?;
        let (reply, reply_rx) = flume::bounded(1);
        Ok((Envelope { frame, reply }, reply_rx))
    }

    /// Send a request and block for its response
    pub fn call(&self, request: OperationRequest) -> Result<OperationResponse, TransportError> {
        let (envelope, reply_rx) = Self::envelope(&request)?;
        self.sender()?
            .send(envelope)
            .map_err(|_| TransportError::Disconnected)?;

        let encoded = reply_rx.recv().map_err(|_| TransportError::NoReply)?;
        encoded
            .decode()
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    /// Send a request and await its response
    pub async fn call_async(
        &self,
        request: OperationRequest,
    ) -> Result<OperationResponse, TransportError> {
        let (envelope, reply_rx) = Self::envelope(&request)?;
        self.sender()?
            .send_async(envelope)
            .await
            .map_err(|_| TransportError::Disconnected)?;

        let encoded = reply_rx
            .recv_async()
            .await
            .map_err(|_| TransportError::NoReply)?;
        encoded
            .decode()
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }

    /// Stop accepting requests and wait for queued ones to finish
    pub fn close(mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(channel = self.id, "Channel worker panicked");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        // Detach; the worker exits once its queue drains
        self.sender.take();
    }
}
