//! Reads commands from stdin and feeds them to the command loop.

use anyhow::Result;
use kanal::AsyncSender;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::events::{AppCommand, parse_command};

pub async fn stdin_reader(tx: AsyncSender<AppCommand>, cancel: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            // stdin closed; the command loop keeps running for the engine.
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(command) => {
                let quit = command == AppCommand::Quit;
                if tx.send(command).await.is_err() {
                    return Ok(());
                }
                if quit {
                    return Ok(());
                }
            }
            None => println!("unrecognized command, try \"help\""),
        }
    }
}
