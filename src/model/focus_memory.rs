use crate::common::collections::HashMap;
use crate::model::display::DisplayKey;
use crate::sys::window_system::pid_t;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRecord {
    pub pid: pid_t,
    pub title: String,
}

/// Last focused window per display, written when focus leaves a display and
/// read when it comes back.
#[derive(Debug, Default)]
pub struct FocusMemory {
    records: HashMap<DisplayKey, FocusRecord>,
}

impl FocusMemory {
    pub fn remember(&mut self, display: DisplayKey, pid: pid_t, title: impl Into<String>) {
        self.records.insert(display, FocusRecord { pid, title: title.into() });
    }

    pub fn recall(&self, display: DisplayKey) -> Option<&FocusRecord> { self.records.get(&display) }

    pub fn clear(&mut self) { self.records.clear(); }

    /// Picks the remembered window out of `candidates`: an exact pid and
    /// title match first, then any window of the same pid.
    pub fn resolve<'a, T>(
        &self,
        display: DisplayKey,
        candidates: &'a [T],
        identity: impl Fn(&T) -> (pid_t, &str),
    ) -> Option<&'a T> {
        let record = self.recall(display)?;
        candidates
            .iter()
            .find(|c| identity(c) == (record.pid, record.title.as_str()))
            .or_else(|| candidates.iter().find(|c| identity(c).0 == record.pid))
    }
}
