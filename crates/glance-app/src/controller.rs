use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use glance_engine::LiveOcrEngine;

use crate::events::{AppCommand, command_loop};
use crate::io::stdin_reader;
use crate::sim::SimScreen;

/// Centralized channel management
pub struct ChannelSet {
    pub commands: (AsyncSender<AppCommand>, AsyncReceiver<AppCommand>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            commands: kanal::bounded_async(64),
        }
    }
}

/// Task spawning and lifecycle for the command-driven front end.
pub struct AppController {
    channels: ChannelSet,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new() -> Self {
        Self {
            channels: ChannelSet::new(),
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn spawn_tasks(
        &self,
        engine: LiveOcrEngine,
        sim: Arc<SimScreen>,
    ) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        tasks.spawn(command_loop(
            engine,
            sim,
            self.channels.commands.1.clone(),
            self.cancel_token.child_token(),
        ));

        tasks.spawn(stdin_reader(
            self.channels.commands.0.clone(),
            self.cancel_token.child_token(),
        ));

        tasks
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
