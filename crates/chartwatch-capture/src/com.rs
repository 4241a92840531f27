use chartwatch_core::{Error, Result};

/// RAII guard for COM initialization on the current thread.
///
/// Calls `CoUninitialize` when dropped, including on early return.
pub struct ComGuard;

impl ComGuard {
    pub fn initialize() -> Result<Self> {
        unsafe {
            windows::Win32::System::Com::CoInitializeEx(
                None,
                windows::Win32::System::Com::COINIT_MULTITHREADED,
            )
            .ok()
            .map_err(|e| Error::Recognition(format!("failed to initialize COM: {e}")))?;
        }
        Ok(ComGuard)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            windows::Win32::System::Com::CoUninitialize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_com_guard_reinitialize() {
        {
            let _guard = ComGuard::initialize().unwrap();
        }
        // Initializing again only works if the first guard cleaned up
        assert!(ComGuard::initialize().is_ok());
    }
}
