use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use glimpse_core::{SessionHandle, UiCommand};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parse a binding such as `ctrl+shift+KeyG` or `alt+F9`
pub fn parse_binding(binding: &str) -> Result<HotKey> {
    HotKey::from_str(binding.trim()).with_context(|| format!("Invalid hotkey '{binding}'"))
}

/// Global hotkey that requests a capture each time it is pressed.
///
/// Only ever sends `TriggerCapture`; the session decides what happens.
pub struct HotkeyTrigger {
    manager: GlobalHotKeyManager,
    hotkey: Option<HotKey>,
    active_id: Arc<AtomicU32>,
    stop: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
    session: SessionHandle,
}

impl HotkeyTrigger {
    pub fn new(session: SessionHandle) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
        Ok(Self {
            manager,
            hotkey: None,
            active_id: Arc::new(AtomicU32::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
            poller: None,
            session,
        })
    }

    /// Register `binding` and start listening
    pub fn start(&mut self, binding: &str) -> Result<()> {
        if self.poller.is_some() {
            return self.update_binding(binding);
        }

        let hotkey = parse_binding(binding)?;
        self.manager
            .register(hotkey)
            .context("Failed to register hotkey")?;
        self.hotkey = Some(hotkey);
        self.active_id.store(hotkey.id(), Ordering::SeqCst);

        self.stop.store(false, Ordering::SeqCst);
        let active_id = self.active_id.clone();
        let stop = self.stop.clone();
        let session = self.session.clone();
        self.poller = Some(std::thread::spawn(move || {
            poll_loop(&active_id, &stop, &session)
        }));

        tracing::info!("[HOTKEY] Listening for {}", hotkey.into_string());
        Ok(())
    }

    /// Swap the binding. The old one stays active if the new one is rejected.
    pub fn update_binding(&mut self, binding: &str) -> Result<()> {
        let hotkey = parse_binding(binding)?;
        if self.hotkey == Some(hotkey) {
            return Ok(());
        }

        if let Some(old) = self.hotkey {
            self.manager
                .unregister(old)
                .context("Failed to unregister hotkey")?;
        }

        if let Err(e) = self.manager.register(hotkey) {
            if let Some(old) = self.hotkey
                && self.manager.register(old).is_err()
            {
                tracing::error!("[HOTKEY] Could not restore previous binding");
                self.hotkey = None;
                self.active_id.store(0, Ordering::SeqCst);
            }
            return Err(e).context("Failed to register hotkey");
        }

        self.hotkey = Some(hotkey);
        self.active_id.store(hotkey.id(), Ordering::SeqCst);
        tracing::info!("[HOTKEY] Binding changed to {}", hotkey.into_string());
        Ok(())
    }

    /// Unregister and stop the polling thread
    pub fn stop(&mut self) {
        if let Some(hotkey) = self.hotkey.take()
            && let Err(e) = self.manager.unregister(hotkey)
        {
            tracing::warn!("[HOTKEY] Failed to unregister: {e}");
        }
        self.active_id.store(0, Ordering::SeqCst);
        self.stop.store(true, Ordering::SeqCst);
        if let Some(poller) = self.poller.take()
            && poller.join().is_err()
        {
            tracing::error!("[HOTKEY] Poll thread panicked");
        }
    }
}

impl Drop for HotkeyTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(active_id: &AtomicU32, stop: &AtomicBool, session: &SessionHandle) {
    let receiver = GlobalHotKeyEvent::receiver();
    while !stop.load(Ordering::SeqCst) {
        let event = match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(e) if e.is_disconnected() => break,
            Err(_) => continue,
        };
        if event.state != HotKeyState::Pressed || event.id != active_id.load(Ordering::SeqCst) {
            continue;
        }

        match session.try_send(UiCommand::TriggerCapture) {
            Ok(true) => tracing::debug!("[HOTKEY] Capture requested"),
            Ok(false) => tracing::warn!("[HOTKEY] Command channel full, press dropped"),
            Err(_) => {
                tracing::debug!("[HOTKEY] Session closed");
                break;
            }
        }
    }
    tracing::debug!("[HOTKEY] Poll thread exited");
}

#[cfg(test)]
mod tests {
    use global_hotkey::hotkey::{Code, Modifiers};

    use super::*;

    #[test]
    fn test_parse_binding() {
        let hotkey = parse_binding(" ctrl+shift+KeyG ").unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyG)
        );
        assert_eq!(parse_binding("F9").unwrap(), HotKey::new(None, Code::F9));
    }

    #[test]
    fn test_parse_binding_rejects_garbage() {
        assert!(parse_binding("ctrl+").is_err());
        assert!(parse_binding("ctrl+banana").is_err());
    }
}
