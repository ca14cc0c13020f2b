//! Driver - owns a [`DataList`] and serialises its work
//!
//! Commands arrive on a channel and are handled one at a time. Fetches run
//! as spawned tasks tagged with a generation; starting a new fetch aborts
//! the previous one, so only the latest request can apply (last request
//! wins). Distribution and rendering always happen on the driver loop, so
//! one cascade completes before the next begins.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{DataListError, Result};
use crate::events::UiEvent;
use crate::transport::TransportError;
use crate::widget::DataList;

/// Inbox capacity of a driver
pub const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub enum Command {
    /// A user interaction; refetches when it qualifies
    Event(UiEvent),
    /// Refetch the current query
    Refresh,
    /// Finish the in-flight fetch, then stop
    Shutdown,
}

type FetchResult = (u64, std::result::Result<Value, TransportError>);

/// Sends commands to a running [`Driver`]
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
}

impl DriverHandle {
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DataListError::DriverStopped)
    }

    pub async fn event(&self, event: UiEvent) -> Result<()> {
        self.send(Command::Event(event)).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(Command::Refresh).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}

pub struct Driver {
    list: DataList,
    commands: mpsc::Receiver<Command>,
}

impl Driver {
    pub fn new(list: DataList) -> (Self, DriverHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        (
            Self { list, commands: rx },
            DriverHandle { commands: tx },
        )
    }

    /// Run on a new task; the task yields the list back when it stops
    pub fn spawn(self) -> JoinHandle<DataList> {
        tokio::spawn(self.run())
    }

    /// Handle commands until `Shutdown` (or every handle is dropped)
    pub async fn run(self) -> DataList {
        let Driver {
            mut list,
            mut commands,
        } = self;
        let mut generation: u64 = 0;
        let mut in_flight: Option<JoinHandle<FetchResult>> = None;
        let mut stopping = false;

        loop {
            tokio::select! {
                command = commands.recv(), if !stopping => {
                    let fetch = match command {
                        Some(Command::Event(event)) => list.apply_event(&event),
                        Some(Command::Refresh) => !list.is_disabled(),
                        Some(Command::Shutdown) | None => {
                            stopping = true;
                            false
                        }
                    };

                    if fetch {
                        generation += 1;
                        if let Some(previous) = in_flight.take() {
                            previous.abort();
                            debug!(generation, "superseding in-flight fetch");
                        }
                        let request = list.request();
                        let transport = Arc::clone(list.transport());
                        let current = generation;
                        in_flight = Some(tokio::spawn(async move {
                            (current, transport.request_json(&request).await)
                        }));
                    }

                    if stopping && in_flight.is_none() {
                        break;
                    }
                }
                joined = join_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    match joined {
                        Ok((fetched, response)) => {
                            debug!(fetched, "fetch complete");
                            match list.apply_response(response) {
                                Ok(changed) => debug!(changed = changed.len(), "response applied"),
                                Err(err) if err.is_runtime() => warn!(error = %err, "response reported"),
                                Err(err) => error!(error = %err, "response could not be applied"),
                            }
                        }
                        Err(err) => error!(error = %err, generation, "fetch task failed"),
                    }
                    if stopping {
                        break;
                    }
                }
            }
        }

        info!(generation, "driver stopped");
        list
    }
}

/// Await the in-flight fetch; never resolves when there is none
async fn join_in_flight(
    in_flight: &mut Option<JoinHandle<FetchResult>>,
) -> std::result::Result<FetchResult, JoinError> {
    match in_flight.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}
