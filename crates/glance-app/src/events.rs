//! Command parsing and the loop that applies commands to the engine.

use std::sync::Arc;

use anyhow::Result;
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

use glance_config::OcrSettings;
use glance_engine::LiveOcrEngine;
use glance_host::FocusOracle;
use glance_types::Point;

use crate::sim::SimScreen;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Start or stop the live loop.
    Toggle,
    /// Move simulated focus to another application.
    Focus(String),
    /// Change the text a simulated window shows.
    SetText { app: String, text: String },
    /// Mark one corner of the spotlight zone.
    Mark(i32, i32),
    /// Scan the spotlight zone once.
    Scan,
    /// Edit one key of the settings draft.
    Set { key: String, value: String },
    /// Apply the draft as new global settings.
    Apply,
    /// Save the draft as the focused application's profile.
    SaveProfile,
    /// Delete the focused application's profile.
    ResetProfile,
    /// List stored profiles.
    Profiles,
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<AppCommand> {
    let mut parts = line.split_whitespace();
    let command = match parts.next()? {
        "toggle" => AppCommand::Toggle,
        "focus" => AppCommand::Focus(parts.next()?.to_string()),
        "text" => {
            let app = parts.next()?.to_string();
            let text = parts.collect::<Vec<_>>().join(" ");
            AppCommand::SetText { app, text }
        }
        "mark" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            AppCommand::Mark(x, y)
        }
        "scan" => AppCommand::Scan,
        "set" => AppCommand::Set {
            key: parts.next()?.to_string(),
            value: parts.next()?.to_string(),
        },
        "apply" => AppCommand::Apply,
        "save-profile" => AppCommand::SaveProfile,
        "reset-profile" => AppCommand::ResetProfile,
        "profiles" => AppCommand::Profiles,
        "status" => AppCommand::Status,
        "help" => AppCommand::Help,
        "quit" | "exit" => AppCommand::Quit,
        _ => return None,
    };
    Some(command)
}

/// Write one draft value by its schema key name.
fn edit_draft(draft: &mut OcrSettings, key: &str, value: &str) -> Result<(), String> {
    fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
        value
            .parse()
            .map_err(|_| format!("{value:?} is not a valid value for {key}"))
    }

    match key {
        "cropUp" => draft.crop_up = parse(key, value)?,
        "cropLeft" => draft.crop_left = parse(key, value)?,
        "cropRight" => draft.crop_right = parse(key, value)?,
        "cropDown" => draft.crop_down = parse(key, value)?,
        "spotlight_cropUp" => draft.spotlight_crop_up = parse(key, value)?,
        "spotlight_cropLeft" => draft.spotlight_crop_left = parse(key, value)?,
        "spotlight_cropRight" => draft.spotlight_crop_right = parse(key, value)?,
        "spotlight_cropDown" => draft.spotlight_crop_down = parse(key, value)?,
        "target" => {
            let index: i64 = parse(key, value)?;
            draft.target = glance_types::TargetKind::from_index(index)
                .ok_or_else(|| format!("target must be 0-3, got {index}"))?;
        }
        "threshold" => draft.threshold = parse(key, value)?,
        "interval" => draft.interval = parse(key, value)?,
        _ => return Err(format!("unknown settings key {key:?}")),
    }
    Ok(())
}

const HELP: &str = "commands:\n  toggle                 start/stop live OCR\n  focus <app>            move simulated focus\n  text <app> <words...>  change a simulated window's text\n  mark <x> <y>           mark a spotlight corner (twice)\n  scan                   scan the spotlight zone once\n  set <key> <value>      edit the settings draft\n  apply                  apply draft as global settings\n  save-profile           save draft as the focused app's profile\n  reset-profile          delete the focused app's profile\n  profiles               list stored profiles\n  status                 show engine state\n  help / quit";

/// Apply commands until `Quit`, the channel closing, or cancellation.
pub async fn command_loop(
    engine: LiveOcrEngine,
    sim: Arc<SimScreen>,
    rx: AsyncReceiver<AppCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut draft = engine.global_settings().await;

    loop {
        let command = tokio::select! {
            received = rx.recv() => match received {
                Ok(command) => command,
                Err(_) => return Ok(()),
            },
            _ = cancel.cancelled() => return Ok(()),
        };
        tracing::debug!(?command, "handling command");

        match command {
            AppCommand::Toggle => {
                engine.toggle().await;
            }
            AppCommand::Focus(app) => match sim.focus(&app) {
                Some(name) => {
                    engine.handle_focus_change(&name).await;
                    let (_, effective) = engine.snapshot().await;
                    draft = effective;
                    println!("focused {name}");
                }
                None => println!("no such app; known: {}", sim.app_names().join(", ")),
            },
            AppCommand::SetText { app, text } => {
                if !sim.set_text(&app, &text) {
                    println!("no such app; known: {}", sim.app_names().join(", "));
                }
            }
            AppCommand::Mark(x, y) => engine.mark_spotlight_corner(Point::new(x, y)),
            AppCommand::Scan => engine.scan_spotlight().await,
            AppCommand::Set { key, value } => {
                if let Err(message) = edit_draft(&mut draft, &key, &value) {
                    println!("{message}");
                }
            }
            AppCommand::Apply => match engine.update_global_settings(draft.clone()).await {
                Ok(()) => println!("settings saved"),
                Err(error) => println!("settings not saved: {error}"),
            },
            AppCommand::SaveProfile => {
                let Some(app) = sim.foreground_app() else {
                    println!("no focused app to save a profile for");
                    continue;
                };
                match engine.save_profile(&app, &draft).await {
                    Ok(()) => println!("profile saved for {app}"),
                    Err(error) => println!("profile not saved: {error}"),
                }
            }
            AppCommand::ResetProfile => {
                let Some(app) = sim.foreground_app() else {
                    println!("no focused app");
                    continue;
                };
                match engine.reset_profile(&app) {
                    Ok(()) => {
                        draft = engine.global_settings().await;
                        println!("profile reset for {app}");
                    }
                    Err(error) => println!("profile not reset: {error}"),
                }
            }
            AppCommand::Profiles => {
                let profiles = engine.list_profiles();
                if profiles.is_empty() {
                    println!("no stored profiles");
                } else {
                    println!("profiles: {}", profiles.join(", "));
                }
            }
            AppCommand::Status => {
                let running = engine.is_running().await;
                let (app, effective) = engine.snapshot().await;
                println!(
                    "running: {running}, profile: {app}, target: {:?}, threshold: {}, interval: {}s",
                    effective.target, effective.threshold, effective.interval
                );
            }
            AppCommand::Help => println!("{HELP}"),
            AppCommand::Quit => {
                tracing::info!("quit requested");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_parse_to_commands() {
        assert_eq!(parse_command("toggle"), Some(AppCommand::Toggle));
        assert_eq!(
            parse_command("focus editor"),
            Some(AppCommand::Focus("editor".to_string()))
        );
        assert_eq!(parse_command("mark 120 45"), Some(AppCommand::Mark(120, 45)));
        assert_eq!(
            parse_command("set threshold 0.8"),
            Some(AppCommand::Set {
                key: "threshold".to_string(),
                value: "0.8".to_string()
            })
        );
        assert_eq!(
            parse_command("text editor build finished"),
            Some(AppCommand::SetText {
                app: "editor".to_string(),
                text: "build finished".to_string()
            })
        );
        assert_eq!(parse_command("exit"), Some(AppCommand::Quit));
        assert_eq!(parse_command("mark nope"), None);
        assert_eq!(parse_command("frobnicate"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn draft_edits_by_schema_key() {
        let mut draft = OcrSettings::default();
        edit_draft(&mut draft, "cropLeft", "25").unwrap();
        edit_draft(&mut draft, "threshold", "0.9").unwrap();
        edit_draft(&mut draft, "target", "3").unwrap();
        assert_eq!(draft.crop_left, 25);
        assert_eq!(draft.threshold, 0.9);
        assert_eq!(draft.target, glance_types::TargetKind::Focus);

        assert!(edit_draft(&mut draft, "target", "7").is_err());
        assert!(edit_draft(&mut draft, "threshold", "high").is_err());
        assert!(edit_draft(&mut draft, "brightness", "1").is_err());
    }
}
