use std::borrow::Cow;
use std::time::Duration;

use zhub::command::Command;
use zhub::events::HubEvent;
use zhub::wire::CommandsPayload;

use rumqttc::Outgoing;
use rumqttc::v5::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions,
    mqttbytes::QoS,
    mqttbytes::v5::{Filter, Packet},
};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until, timeout};

use tokio_util::sync::CancellationToken;

use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::GatewayConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::router::EventRouter;
use crate::topics::Topics;

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

fn not_connected() -> Error {
    Error::new(
        ErrorKind::NotConnected,
        "The session is not connected to the broker",
    )
}

fn closed(error: impl Into<Cow<'static, str>>) -> Error {
    Error::new(ErrorKind::Closed, error)
}

/// The connection state of a [`GatewaySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection to the broker.
    Disconnected,
    /// Waiting for the broker to acknowledge a connection.
    Connecting,
    /// Connected, with the subscriptions to all inbound topics requested.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        })
    }
}

struct Connection {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

// Queues a single request subscribing to all inbound topics.
//
// The client queue is drained only while the event loop is polled, so the
// request is never awaited. Returns `false` when the queue is full and the
// request has to be queued again later.
fn request_subscriptions(client: &AsyncClient, topics: &Topics) -> bool {
    let filters = topics
        .subscriptions()
        .iter()
        .map(|topic| Filter::new(topic.as_str(), QoS::AtLeastOnce));

    match client.try_subscribe_many(filters) {
        Ok(()) => true,
        Err(e) => {
            debug!("Subscriptions postponed: {e}");
            false
        }
    }
}

async fn wait_conn_ack(eventloop: &mut EventLoop) -> std::result::Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

/// A session connected to a single gateway through an `MQTT` broker.
///
/// A session is the sole owner of its broker connection. It subscribes to
/// the gateway inbound topics each time the broker acknowledges a
/// connection, so subscriptions survive reconnections.
///
/// Inbound messages are processed one at a time by [`Self::recv`], in the
/// order the broker delivers them.
#[derive(Debug)]
pub struct GatewaySession {
    config: GatewayConfig,
    client_id: String,
    router: EventRouter,
    state: SessionState,
    backoff: Backoff,
    retry_at: Option<Instant>,
    subscriptions_pending: bool,
    connection: Option<Connection>,
}

impl GatewaySession {
    /// Creates a disconnected [`GatewaySession`].
    ///
    /// Each session uses a randomly generated client identifier.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let router = EventRouter::new(config.gateway_address());
        Self::with_router(config, router)
    }

    /// Creates a disconnected [`GatewaySession`] routing inbound messages
    /// through the given [`EventRouter`].
    #[must_use]
    pub fn with_router(config: GatewayConfig, router: EventRouter) -> Self {
        Self {
            client_id: format!("zhub-{:016x}", rand::random::<u64>()),
            backoff: Backoff::new(config.backoff_config()),
            config,
            router,
            state: SessionState::Disconnected,
            retry_at: None,
            subscriptions_pending: false,
            connection: None,
        }
    }

    /// Returns the [`SessionState`].
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the [`GatewayConfig`].
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the gateway [`Topics`].
    #[must_use]
    pub const fn topics(&self) -> &Topics {
        self.router.topics()
    }

    /// Dispatches an inbound message to the [`EventRouter`].
    ///
    /// Returns [`None`] when the message does not produce any event.
    #[must_use]
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> Option<HubEvent> {
        self.router.route(topic, payload)
    }

    /// Connects to the broker and requests the subscriptions to the inbound
    /// topics.
    ///
    /// When the broker does not acknowledge the connection within the
    /// configured timeout, the connection is retried with an exponential
    /// backoff.
    ///
    /// Subscriptions are sent to the broker while [`Self::recv`] is polled.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorKind::Connection`] error when all retries have been
    /// exhausted.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Ok(());
        }

        loop {
            self.state = SessionState::Connecting;

            let connection = self.connection.get_or_insert_with(|| {
                let (client, eventloop) = AsyncClient::new(
                    mqtt_options(&self.config, &self.client_id),
                    self.config.capacity(),
                );
                Connection { client, eventloop }
            });

            match timeout(
                self.config.connect_timeout_time(),
                wait_conn_ack(&mut connection.eventloop),
            )
            .await
            {
                Ok(Ok(())) => {
                    self.subscriptions_pending =
                        !request_subscriptions(&connection.client, self.router.topics());
                    self.on_connected();
                    return Ok(());
                }
                Ok(Err(e)) => warn!(
                    "Impossible to connect to broker {}:{}: {e}",
                    self.config.broker_host(),
                    self.config.broker_port()
                ),
                Err(_) => warn!(
                    "Broker {}:{} did not acknowledge the connection within {:?}",
                    self.config.broker_host(),
                    self.config.broker_port(),
                    self.config.connect_timeout_time()
                ),
            }

            self.state = SessionState::Disconnected;
            let Some(delay) = self.backoff.next_delay() else {
                self.connection = None;
                return Err(Error::new(
                    ErrorKind::Connection,
                    format!(
                        "Impossible to connect to broker {}:{} after {} retries",
                        self.config.broker_host(),
                        self.config.broker_port(),
                        self.backoff.attempts()
                    ),
                ));
            };

            info!("Retrying connection in {delay:?}");
            sleep(delay).await;
        }
    }

    /// Publishes a sequence of [`Command`]s on the gateway commands topic.
    ///
    /// Each call queues exactly one message, which is sent to the broker
    /// while [`Self::recv`] is polled. An empty sequence means there is
    /// nothing to send, so no message is queued.
    ///
    /// This method never waits: a full client queue is reported as an error.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorKind::NotConnected`] error, without any network
    /// activity, when the session is not connected. Returns a
    /// [`ErrorKind::Publish`] error when the client queue is full, and a
    /// [`ErrorKind::Serialization`] error when the payload cannot be built.
    pub fn publish(&mut self, commands: &[Command]) -> Result<()> {
        let client = match (self.state, &self.connection) {
            (SessionState::Connected, Some(connection)) => &connection.client,
            _ => return Err(not_connected()),
        };

        if commands.is_empty() {
            debug!("No commands to publish");
            return Ok(());
        }

        let payload = serde_json::to_vec(&CommandsPayload::new(commands))?;
        let topic = self.router.topics().commands();

        client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| {
                Error::new(
                    ErrorKind::Publish,
                    format!("Impossible to publish on topic {topic}: {e}"),
                )
            })
    }

    /// Waits for the next [`HubEvent`].
    ///
    /// Transport failures are logged and recovered by reconnecting with an
    /// exponential backoff, then subscribing again to all inbound topics.
    /// Messages that do not produce any event are dropped.
    ///
    /// This method is cancel safe: a pending retry delay is resumed by the
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorKind::NotConnected`] error when the session has never
    /// been connected, and a [`ErrorKind::Connection`] error when all
    /// reconnection retries have been exhausted.
    pub async fn recv(&mut self) -> Result<HubEvent> {
        let Self {
            router,
            state,
            backoff,
            retry_at,
            subscriptions_pending,
            connection,
            ..
        } = self;

        let Some(Connection { client, eventloop }) = connection.as_mut() else {
            return Err(not_connected());
        };

        loop {
            if let Some(instant) = *retry_at {
                sleep_until(instant).await;
                *retry_at = None;
                *state = SessionState::Connecting;
            }

            if *subscriptions_pending {
                *subscriptions_pending = !request_subscriptions(client, router.topics());
            }

            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = String::from_utf8_lossy(&publish.topic);
                    if let Some(event) = router.route(&topic, &publish.payload) {
                        return Ok(event);
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Reconnected to broker, subscribing again");
                    *subscriptions_pending = !request_subscriptions(client, router.topics());
                    *state = SessionState::Connected;
                    backoff.reset();
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    debug!("Subscription acknowledged: {ack:?}");
                }
                Ok(_) => {}
                Err(e) => {
                    if *state == SessionState::Connected {
                        warn!("Connection to broker lost: {e}");
                    } else {
                        debug!("Reconnection failed: {e}");
                    }
                    *state = SessionState::Disconnected;

                    let Some(delay) = backoff.next_delay() else {
                        error!("No reconnection retries left");
                        return Err(Error::new(
                            ErrorKind::Connection,
                            format!("Connection lost after {} retries: {e}", backoff.attempts()),
                        ));
                    };
                    info!("Reconnecting in {delay:?}");
                    *retry_at = Some(Instant::now() + delay);
                }
            }
        }
    }

    /// Disconnects from the broker.
    ///
    /// When connected, the broker is notified within a short timeout.
    pub async fn disconnect(&mut self) {
        if let Some(Connection {
            client,
            mut eventloop,
        }) = self.connection.take()
        {
            if self.state == SessionState::Connected {
                match client.try_disconnect() {
                    Ok(()) => {
                        if timeout(DISCONNECT_TIMEOUT, send_disconnect(&mut eventloop))
                            .await
                            .is_err()
                        {
                            debug!("Disconnection not sent within {DISCONNECT_TIMEOUT:?}");
                        }
                    }
                    Err(e) => {
                        warn!("Impossible to notify the disconnection to the broker: {e}");
                    }
                }
            }
            drop(eventloop);
        }
        self.state = SessionState::Disconnected;
        self.retry_at = None;
    }

    /// Runs the session on its own task.
    ///
    /// The task connects the session if needed, then forwards every
    /// [`HubEvent`] to the returned receiver and serves the publish requests
    /// of the returned [`GatewayHandle`]. It stops on shutdown, when the
    /// receiver is dropped or when the connection cannot be recovered.
    #[must_use]
    pub fn spawn(self) -> (GatewayHandle, mpsc::Receiver<HubEvent>) {
        let capacity = self.config.capacity();
        let (request_sender, request_receiver) = mpsc::channel(capacity);
        let (event_sender, event_receiver) = mpsc::channel(capacity);
        let cancellation_token = CancellationToken::new();

        let task = tokio::spawn(run_session(
            self,
            request_receiver,
            event_sender,
            cancellation_token.clone(),
        ));

        (
            GatewayHandle {
                requests: request_sender,
                cancellation_token,
                task,
            },
            event_receiver,
        )
    }

    fn on_connected(&mut self) {
        info!(
            "Connected to broker {}:{} for gateway `{}`",
            self.config.broker_host(),
            self.config.broker_port(),
            self.config.gateway_address()
        );
        self.state = SessionState::Connected;
        self.backoff.reset();
        self.retry_at = None;
    }
}

// Drives the event loop until the queued requests, ending with the
// disconnection, have been sent.
async fn send_disconnect(eventloop: &mut EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

fn mqtt_options(config: &GatewayConfig, client_id: &str) -> MqttOptions {
    let mut mqttoptions = MqttOptions::new(client_id, config.broker_host(), config.broker_port());
    let _ = mqttoptions
        .set_keep_alive(config.keep_alive_time())
        .set_clean_start(true);
    mqttoptions
}

#[derive(Debug)]
enum Request {
    Publish {
        commands: Vec<Command>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// A handle to a [`GatewaySession`] running on its own task.
#[derive(Debug)]
pub struct GatewayHandle {
    requests: mpsc::Sender<Request>,
    cancellation_token: CancellationToken,
    task: JoinHandle<()>,
}

impl GatewayHandle {
    /// Publishes a sequence of [`Command`]s through the session.
    ///
    /// # Errors
    ///
    /// Returns the session publish errors, or a [`ErrorKind::Closed`] error
    /// when the session task is not running anymore.
    pub async fn publish(&self, commands: Vec<Command>) -> Result<()> {
        let (reply, response) = oneshot::channel();

        self.requests
            .send(Request::Publish { commands, reply })
            .await
            .map_err(|e| closed(format!("Impossible to send the request: {e}")))?;

        response
            .await
            .map_err(|e| closed(format!("Impossible to receive the response: {e}")))?
    }

    /// Checks whether the session task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the session task and waits for its termination.
    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        if let Err(e) = self.task.await {
            error!("Session task terminated abnormally: {e}");
        }
    }
}

async fn run_session(
    mut session: GatewaySession,
    mut requests: mpsc::Receiver<Request>,
    sender: mpsc::Sender<HubEvent>,
    cancellation_token: CancellationToken,
) {
    if session.state() != SessionState::Connected {
        tokio::select! {
            () = cancellation_token.cancelled() => {
                session.disconnect().await;
                return;
            }
            result = session.connect() => {
                if let Err(e) = result {
                    error!("Stop the session: {e}");
                    session.disconnect().await;
                    return;
                }
            }
        }
    }

    loop {
        tokio::select! {
            // Use the cancellation token to stop the loop
            () = cancellation_token.cancelled() => { break; }
            // Serve the handle requests
            Some(request) = requests.recv() => {
                let Request::Publish { commands, reply } = request;
                if reply.send(session.publish(&commands)).is_err() {
                    debug!("Publish response dropped by the requester");
                }
            }
            // Poll the events coming from the gateway
            event = session.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        error!("Stop the session: {e}");
                        break;
                    }
                };

                if let Err(e) = sender.send(event).await {
                    error!("Stop sending events to the receiver: {e}");
                    break;
                }
            }
        }
    }

    session.disconnect().await;
}
