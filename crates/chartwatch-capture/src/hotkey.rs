use anyhow::{Context, Result};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager,
    hotkey::{Code, HotKey, Modifiers},
};

/// Global shortcut that toggles monitoring, Ctrl+Shift+M
pub struct ToggleHotkey {
    manager: GlobalHotKeyManager,
    hotkey: HotKey,
}

impl ToggleHotkey {
    pub fn register() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
        let hotkey = HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyM);

        manager
            .register(hotkey)
            .context("Failed to register hotkey")?;

        Ok(Self { manager, hotkey })
    }

    /// Check if the hotkey was pressed (non-blocking)
    pub fn poll(&self) -> bool {
        let receiver = GlobalHotKeyEvent::receiver();
        match receiver.try_recv() {
            Ok(event) if event.id == self.hotkey.id() => {
                // Press and release both arrive, only count the press
                event.state == global_hotkey::HotKeyState::Pressed
            }
            Ok(event) => {
                tracing::trace!("Ignoring hotkey event {:?}", event.id);
                false
            }
            Err(_) => false,
        }
    }
}

impl Drop for ToggleHotkey {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.hotkey);
    }
}
