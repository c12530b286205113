//! Sanity check on submitted output rows, plus the one-shot warning slot the
//! next rendered page picks up.

use std::sync::Mutex;

/// Shown when a submission carried nothing beyond the task's own columns.
pub const NO_NEW_KEYS_WARNING: &str =
    "No new keys in output. Make sure your &lt;input&gt; elements have \"name\" attributes";

/// Warn when `submitted` contributes no key outside `expected_keys`.
///
/// Forms echo every task field back as hidden inputs, so a submission whose
/// keys are all task columns usually means the answer inputs were never given
/// a `name`. This only flags the row; it never rejects it.
pub fn check_output<'a, K>(submitted: K, expected_keys: &[String]) -> Option<String>
where
    K: IntoIterator<Item = &'a str>,
{
    let adds_new_key = submitted
        .into_iter()
        .any(|k| !expected_keys.iter().any(|e| e == k));
    if adds_new_key {
        None
    } else {
        Some(NO_NEW_KEYS_WARNING.to_string())
    }
}

/// Single pending message, consumed by the first reader.
#[derive(Debug, Default)]
pub struct FlashMessage {
    slot: Mutex<Option<String>>,
}

impl FlashMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending message.
    pub fn set(&self, message: impl Into<String>) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.into());
    }

    /// Return the pending message and clear it.
    pub fn take(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn warns_when_no_key_is_new() {
        let expected = headers(&["a", "b", "uid"]);
        assert_eq!(
            check_output(["uid"], &expected).as_deref(),
            Some(NO_NEW_KEYS_WARNING)
        );
        assert!(check_output(["a", "b", "uid"], &expected).is_some());
    }

    #[test]
    fn silent_when_a_key_is_new() {
        let expected = headers(&["a", "b", "uid"]);
        assert!(check_output(["a", "b", "uid", "notes"], &expected).is_none());
    }

    #[test]
    fn empty_submission_warns() {
        assert!(check_output(std::iter::empty(), &headers(&["a"])).is_some());
    }

    #[test]
    fn flash_is_read_once() {
        let flash = FlashMessage::new();
        assert_eq!(flash.take(), None);

        flash.set("first");
        flash.set("second");
        assert_eq!(flash.take().as_deref(), Some("second"));
        assert_eq!(flash.take(), None);
    }
}
