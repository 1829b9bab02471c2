//! Restart coalescing for processes that cache preference domains

use std::collections::BTreeSet;

/// Preference domain -> process that must be restarted to pick it up.
const DOMAIN_SUBSYSTEMS: &[(&str, &str)] = &[
    ("com.apple.dock", "Dock"),
    ("com.apple.finder", "Finder"),
    ("com.apple.systemuiserver", "SystemUIServer"),
    ("com.apple.menuextra.clock", "SystemUIServer"),
    ("NSGlobalDomain", "SystemUIServer"),
    ("com.apple.screencapture", "SystemUIServer"),
    ("com.apple.TimeMachine", "SystemUIServer"),
    ("com.apple.AppleMultitouchTrackpad", "SystemUIServer"),
    ("com.apple.Safari", "Safari"),
    ("com.apple.ActivityMonitor", "Activity Monitor"),
    ("com.apple.TextEdit", "TextEdit"),
    ("com.apple.MobileSMS", "Messages"),
    ("com.apple.iphonesimulator", "Simulator"),
    ("com.apple.dt.Xcode", "Xcode"),
];

/// Subsystem to restart after writing `domain`, if any.
pub fn subsystem_for(domain: &str) -> Option<&'static str> {
    DOMAIN_SUBSYSTEMS
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, subsystem)| *subsystem)
}

/// Accumulates touched subsystems so each one restarts once per run.
#[derive(Debug, Default)]
pub struct RestartCoalescer {
    pending: BTreeSet<&'static str>,
}

impl RestartCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a settings write to `domain`. Unmapped domains are ignored.
    pub fn note(&mut self, domain: &str) {
        if let Some(subsystem) = subsystem_for(domain) {
            self.pending.insert(subsystem);
        }
    }

    /// Queue a subsystem directly.
    pub fn note_subsystem(&mut self, subsystem: &'static str) {
        self.pending.insert(subsystem);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Restart every pending subsystem once, then clear.
    ///
    /// Failures (usually "no matching processes") are logged and ignored.
    /// Returns the subsystems that were asked to restart.
    pub fn flush<F>(&mut self, mut restart: F) -> Vec<&'static str>
    where
        F: FnMut(&str) -> anyhow::Result<()>,
    {
        let subsystems: Vec<&'static str> =
            std::mem::take(&mut self.pending).into_iter().collect();
        for &subsystem in &subsystems {
            log::info!("Restarting {subsystem}");
            if let Err(e) = restart(subsystem) {
                log::debug!("Restart of {subsystem} ignored: {e}");
            }
        }
        subsystems
    }
}
