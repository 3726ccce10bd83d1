//! Socket wiring and lifecycle of the knowledge-base service.

use std::sync::Arc;
use std::time::Duration;

use edgekb_bus::{BusConfig, BusError, Transport, ZmqCommandServer, ZmqPusher, ZmqSubscriber};
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::ingress::{command_ingress, telemetry_ingress};

/// How long a stopping task may take before it is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
const TELEMETRY_RETRY: Duration = Duration::from_secs(1);

/// Why the service loop ended.
enum Exit {
    Commands(Result<Result<(), BusError>, JoinError>),
    Telemetry(Result<Result<(), BusError>, JoinError>),
    Engine,
    Signal,
}

/// The knowledge-base service: one engine task fed by the command and
/// telemetry ingress tasks, publishing transitions on the event socket.
pub struct KbService {
    bus: BusConfig,
    queue_capacity: usize,
    shutdown: Arc<Notify>,
}

impl KbService {
    pub fn new(bus: BusConfig, queue_capacity: usize) -> Self {
        Self {
            bus,
            queue_capacity: queue_capacity.max(1),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notify this handle (`notify_one`) to stop a running service.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Bind the sockets and serve until `terminate`, a signal, the shutdown
    /// handle, or a fatal socket error.
    pub async fn run(self) -> Result<(), BusError> {
        let command_transport = self.bus.command_transport()?;
        let event_transport = self.bus.event_transport()?;
        let telemetry_transport = self.bus.telemetry_transport()?;

        let server = ZmqCommandServer::bind(&command_transport).await?;
        let publisher = ZmqPusher::bind(&event_transport).await?;
        info!(
            command = %command_transport,
            event = %event_transport,
            telemetry = %self.bus.endpoints.telemetry,
            queue_capacity = self.queue_capacity,
            "knowledge base service listening"
        );

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let stop = Arc::new(Notify::new());

        let mut engine = tokio::spawn(Engine::new(publisher).run(rx));
        let mut commands = tokio::spawn(command_ingress(server, tx.clone(), stop.clone()));
        let topics = self.bus.telemetry.topics.clone();
        let telemetry_stop = stop.clone();
        let mut telemetry = tokio::spawn(async move {
            let Some(subscriber) = connect_telemetry(&telemetry_transport, &telemetry_stop).await
            else {
                return Ok(());
            };
            telemetry_ingress(subscriber, topics, tx, telemetry_stop).await
        });

        let exit = tokio::select! {
            r = &mut commands => Exit::Commands(r),
            r = &mut telemetry => Exit::Telemetry(r),
            _ = &mut engine => Exit::Engine,
            _ = wait_for_shutdown(self.shutdown.clone()) => Exit::Signal,
        };

        let mut result = Ok(());
        let mut engine_done = false;
        let mut commands_done = false;
        let mut telemetry_done = false;
        match exit {
            Exit::Commands(r) => {
                commands_done = true;
                result = flatten("command ingress", r);
            }
            Exit::Telemetry(r) => {
                telemetry_done = true;
                result = flatten("telemetry ingress", r);
            }
            Exit::Engine => {
                engine_done = true;
                // Let the command ingress deliver the `terminate` reply.
                if let Ok(r) = tokio::time::timeout(SHUTDOWN_GRACE, &mut commands).await {
                    commands_done = true;
                    result = flatten("command ingress", r);
                }
            }
            Exit::Signal => info!("shutdown requested"),
        }

        stop.notify_waiters();
        if !commands_done {
            settle("command ingress", commands).await;
        }
        if !telemetry_done {
            settle("telemetry ingress", telemetry).await;
        }
        // Both senders are gone by now, so the engine drains and returns.
        if !engine_done {
            settle("engine", engine).await;
        }

        info!("knowledge base service stopped");
        result
    }
}

/// Connect the telemetry SUB socket, retrying until the producer is
/// reachable. `None` when `stop` fires first.
async fn connect_telemetry(transport: &Transport, stop: &Notify) -> Option<ZmqSubscriber> {
    loop {
        tokio::select! {
            r = ZmqSubscriber::connect(transport) => match r {
                Ok(subscriber) => return Some(subscriber),
                Err(e) => warn!(endpoint = %transport, error = %e, "telemetry connect failed, retrying"),
            },
            _ = stop.notified() => return None,
        }
        tokio::select! {
            _ = tokio::time::sleep(TELEMETRY_RETRY) => {}
            _ = stop.notified() => return None,
        }
    }
}

fn flatten(task: &str, joined: Result<Result<(), BusError>, JoinError>) -> Result<(), BusError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(task, error = %e, "task failed");
            Err(e)
        }
        Err(e) => {
            error!(task, error = %e, "task panicked");
            Err(BusError::Transport(format!("{task}: {e}")))
        }
    }
}

/// Wait up to [`SHUTDOWN_GRACE`] for a task, then abort it.
async fn settle<T>(task: &str, mut handle: JoinHandle<T>) {
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
        warn!(task, "did not stop in time, aborting");
        handle.abort();
    }
}

/// Wait for either an OS shutdown signal or a programmatic notification.
async fn wait_for_shutdown(external: Arc<Notify>) {
    tokio::select! {
        _ = os_signal() => {}
        _ = external.notified() => {}
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C elsewhere. Never resolves
/// when no handler can be installed.
async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {}
                    _ = sigterm.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "cannot install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    }
}
