//! Service wiring
//!
//! Drives inbound transport events through the topic router and request
//! handler, publishing exactly one terminal message per accepted request.
//! Each accepted request runs in its own task; no state is shared between
//! requests beyond the read-only handler internals.

use crate::assembler::{self, RequestIds};
use crate::handler::{ErrorKind, RequestHandler};
use crate::transport::{InboundMessage, Publisher};
use g2p_common::messages::G2pPronounce;
use g2p_common::topic::{self, ParsedTopic};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// The G2P Hermes service.
#[derive(Clone)]
pub struct G2pService {
    handler: Arc<RequestHandler>,
    publisher: Arc<dyn Publisher>,
    site_ids: Arc<Vec<String>>,
}

impl G2pService {
    pub fn new(
        handler: Arc<RequestHandler>,
        publisher: Arc<dyn Publisher>,
        site_ids: Vec<String>,
    ) -> Self {
        Self {
            handler,
            publisher,
            site_ids: Arc::new(site_ids),
        }
    }

    /// Process inbound messages until the transport channel closes.
    ///
    /// Each message gets its own task so a slow backend never blocks the
    /// receive loop.
    pub async fn run(&self, mut events: mpsc::Receiver<InboundMessage>) {
        info!("G2P service ready");
        while let Some(message) = events.recv().await {
            let service = self.clone();
            tokio::spawn(async move {
                service.process(message).await;
            });
        }
        info!("Transport channel closed, stopping service");
    }

    /// Route and handle a single inbound message to completion.
    ///
    /// Unrecognized topics and foreign sites are discarded; everything
    /// else resolves to exactly one published reply.
    pub async fn process(&self, message: InboundMessage) {
        let parsed = match topic::route(&message.topic) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(%error, "Ignoring message");
                return;
            }
        };

        match parsed {
            ParsedTopic::Pronounce { site_id } => {
                self.process_pronounce(site_id, &message.payload).await;
            }
        }
    }

    async fn process_pronounce(&self, topic_site_id: String, payload: &[u8]) {
        let request = match serde_json::from_slice::<G2pPronounce>(payload) {
            Ok(mut request) => {
                // The payload's siteId wins when present; the topic
                // segment fills the gap otherwise.
                if request.site_id.is_empty() {
                    request.site_id = topic_site_id;
                }
                request
            }
            Err(error) => {
                // No usable correlation ids in an undecodable payload;
                // reply with what the topic gives us rather than dropping
                // the request silently.
                let ids = RequestIds {
                    request_id: String::new(),
                    site_id: topic_site_id,
                    session_id: None,
                };
                self.publish_error(&ids, &format!("invalid JSON payload: {error}"))
                    .await;
                return;
            }
        };

        if !self.accepts_site(&request.site_id) {
            debug!(site_id = %request.site_id, "Ignoring request for other site");
            return;
        }

        debug!(
            request_id = %request.request_id,
            site_id = %request.site_id,
            words = request.words.len(),
            "Handling pronounce request"
        );

        let ids = RequestIds {
            request_id: request.request_id.clone(),
            site_id: request.site_id.clone(),
            session_id: request.session_id.clone(),
        };

        let outcome = self.handler.handle(&request).await;

        match assembler::assemble(&ids, &outcome, &request.words) {
            Ok(reply) => {
                if let Err(err) = self.publisher.publish(&reply.topic, reply.payload).await {
                    error!(
                        %err,
                        request_id = %ids.request_id,
                        topic = %reply.topic,
                        "Failed to publish reply"
                    );
                }
            }
            Err(err) => {
                error!(%err, request_id = %ids.request_id, "Failed to assemble reply");
            }
        }
    }

    async fn publish_error(&self, ids: &RequestIds, message: &str) {
        match assembler::error_message(ids, ErrorKind::InvalidRequest, message, &[]) {
            Ok(reply) => {
                if let Err(err) = self.publisher.publish(&reply.topic, reply.payload).await {
                    error!(%err, "Failed to publish error reply");
                }
            }
            Err(err) => {
                error!(%err, "Failed to assemble error reply");
            }
        }
    }

    /// Site filter: an empty configured list accepts every site.
    fn accepts_site(&self, site_id: &str) -> bool {
        self.site_ids.is_empty() || self.site_ids.iter().any(|id| id == site_id)
    }
}
