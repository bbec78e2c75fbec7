use std::time::Duration;

use anyhow::Context;
use glimpse_config::Settings;
use glimpse_core::{Session, SessionHandle, UiCommand};
use glimpse_types::AppEvent;
use kanal::AsyncReceiver;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::hotkey::HotkeyTrigger;

/// Terminal stand-in for the host UI
#[derive(Debug, PartialEq)]
pub enum HostCommand {
    Ui(UiCommand),
    PrintLastText,
    Rebind(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  c            capture now
  l [ms]       start live mode
  s            stop live mode
  i <ms>       set live interval
  r <lang>     re-translate last text into <lang>
  t            print last recognized text
  k <binding>  change hotkey (e.g. ctrl+shift+KeyG)
  h            clear history
  x            stop the running capture
  q            quit";

pub fn parse_command(line: &str) -> Result<HostCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err("empty command".into());
    };
    let arg = parts.next();

    let parse_ms = |arg: &str| {
        arg.parse::<u64>()
            .map_err(|_| format!("'{arg}' is not a number of milliseconds"))
    };

    let command = match (verb, arg) {
        ("c", None) => HostCommand::Ui(UiCommand::TriggerCapture),
        ("l", None) => HostCommand::Ui(UiCommand::StartLiveMode { interval_ms: None }),
        ("l", Some(ms)) => HostCommand::Ui(UiCommand::StartLiveMode {
            interval_ms: Some(parse_ms(ms)?),
        }),
        ("s", None) => HostCommand::Ui(UiCommand::StopLiveMode),
        ("i", Some(ms)) => HostCommand::Ui(UiCommand::SetLiveInterval(parse_ms(ms)?)),
        ("r", Some(lang)) => HostCommand::Ui(UiCommand::RequestRetranslation {
            target_language: lang.to_string(),
        }),
        ("t", None) => HostCommand::PrintLastText,
        ("k", Some(binding)) => HostCommand::Rebind(binding.to_string()),
        ("h", None) => HostCommand::Ui(UiCommand::ClearHistory),
        ("x", None) => HostCommand::Ui(UiCommand::RequestStop),
        ("q", None) => HostCommand::Quit,
        ("?" | "help", _) => HostCommand::Help,
        _ => return Err(format!("unknown command '{}'", line.trim())),
    };

    if parts.next().is_some() {
        return Err(format!("too many arguments in '{}'", line.trim()));
    }
    Ok(command)
}

pub fn describe_event(event: &AppEvent) -> Option<String> {
    let line = match event {
        AppEvent::CaptureCompleted(success) if success.recognized_text.is_empty() => {
            "(no text recognized)".to_string()
        }
        AppEvent::CaptureCompleted(success) => format!(
            "{}\n  -> {}{}",
            success.recognized_text,
            success.translated_text,
            if success.cache_hit { " (cached)" } else { "" }
        ),
        AppEvent::CaptureFailed(failure) => format!("capture failed: {failure}"),
        AppEvent::LiveModeChanged { running } => {
            format!("live mode {}", if *running { "on" } else { "off" })
        }
        AppEvent::RetranslationCompleted {
            translated_text,
            target_language,
            ..
        } => format!("[{target_language}] {translated_text}"),
        AppEvent::RetranslationFailed { message } => format!("re-translation failed: {message}"),
        AppEvent::PrerequisitesMissing { missing } => {
            format!("missing configuration: {}", missing.join(", "))
        }
        AppEvent::HistoryCleared => "history cleared".to_string(),
        AppEvent::CaptureStateChanged { .. } | AppEvent::SettingsChanged(_) => return None,
    };
    Some(line)
}

async fn print_events(events: AsyncReceiver<AppEvent>) {
    while let Ok(event) = events.recv().await {
        tracing::debug!("[APP] Event: {:?}", std::mem::discriminant(&event));
        if let Some(line) = describe_event(&event) {
            println!("{line}");
        }
    }
    tracing::debug!("[APP] Event channel closed");
}

pub struct HostOptions {
    pub live: bool,
    pub interval_ms: Option<u64>,
    pub hotkey: Option<String>,
}

/// Application controller for task spawning and lifecycle.
///
/// Runs the session until `q`, end of input or Ctrl+C, then returns the final
/// settings for the profile.
pub async fn run(
    session: Session,
    handle: SessionHandle,
    events: AsyncReceiver<AppEvent>,
    options: HostOptions,
) -> anyhow::Result<Settings> {
    let session_task = tokio::spawn(session.run());
    let printer = tokio::spawn(print_events(events));

    let mut hotkey = options.hotkey.as_deref().and_then(|binding| {
        let mut trigger = match HotkeyTrigger::new(handle.clone()) {
            Ok(trigger) => trigger,
            Err(e) => {
                tracing::warn!("[APP] Hotkey unavailable: {e:#}");
                return None;
            }
        };
        match trigger.start(binding) {
            Ok(()) => Some(trigger),
            Err(e) => {
                tracing::warn!("[APP] Hotkey unavailable: {e:#}");
                None
            }
        }
    });

    if options.live {
        handle.start_live_mode(options.interval_ms).await?;
    }

    println!("{HELP}");
    let command_result = command_loop(&handle, hotkey.as_mut()).await;

    if let Some(mut trigger) = hotkey.take() {
        trigger.stop();
    }
    if handle.shutdown().await.is_err() {
        tracing::warn!("[APP] Session already stopped");
    }

    let settings = session_task.await.context("Session task panicked")?;
    if tokio::time::timeout(Duration::from_secs(1), printer)
        .await
        .is_err()
    {
        tracing::warn!("[APP] Event printer did not finish");
    }

    command_result.map(|()| settings)
}

async fn command_loop(
    handle: &SessionHandle,
    mut hotkey: Option<&mut HotkeyTrigger>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[APP] Ctrl+C received");
                return Ok(());
            }
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else {
            tracing::info!("[APP] End of input");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(HostCommand::Ui(command)) => handle.send(command).await?,
            Ok(HostCommand::PrintLastText) => {
                let text = handle.last_recognized_text();
                if text.is_empty() {
                    println!("(nothing captured yet)");
                } else {
                    println!("{text}");
                }
            }
            Ok(HostCommand::Rebind(binding)) => match hotkey.as_deref_mut() {
                Some(trigger) => match trigger.update_binding(&binding) {
                    Ok(()) => println!("hotkey set to {binding}"),
                    Err(e) => println!("{e:#}"),
                },
                None => println!("hotkey is disabled"),
            },
            Ok(HostCommand::Help) => println!("{HELP}"),
            Ok(HostCommand::Quit) => return Ok(()),
            Err(message) => println!("{message} (? for help)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use glimpse_types::{CaptureFailure, CaptureSuccess, FailureKind};

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("c"),
            Ok(HostCommand::Ui(UiCommand::TriggerCapture))
        );
        assert_eq!(
            parse_command("l 3000"),
            Ok(HostCommand::Ui(UiCommand::StartLiveMode {
                interval_ms: Some(3000)
            }))
        );
        assert_eq!(
            parse_command("  r   ja "),
            Ok(HostCommand::Ui(UiCommand::RequestRetranslation {
                target_language: "ja".into()
            }))
        );
        assert_eq!(
            parse_command("k alt+F9"),
            Ok(HostCommand::Rebind("alt+F9".into()))
        );
        assert_eq!(parse_command("q"), Ok(HostCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("r").is_err());
        assert!(parse_command("i soon").is_err());
        assert!(parse_command("c now").is_err());
        assert!(parse_command("z").is_err());
    }

    #[test]
    fn test_describe_events() {
        let completed = AppEvent::CaptureCompleted(CaptureSuccess {
            recognized_text: "Hallo".into(),
            translated_text: "Hello".into(),
            cache_hit: true,
        });
        assert_eq!(
            describe_event(&completed).as_deref(),
            Some("Hallo\n  -> Hello (cached)")
        );

        let failed = AppEvent::CaptureFailed(CaptureFailure {
            kind: FailureKind::CaptureRegion,
            message: "Invalid capture dimensions".into(),
        });
        assert!(describe_event(&failed).unwrap().starts_with("capture failed"));

        assert_eq!(
            describe_event(&AppEvent::CaptureStateChanged { running: true }),
            None
        );
    }
}
