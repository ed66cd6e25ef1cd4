//! Hint economy: trading attempts for hint disclosure.
//!
//! ```text
//!   toggle()
//!     shown ───────────────────────────────► hide (free)
//!     hidden, no hint text ────────────────► refuse: HintUnavailable
//!     hidden, token for this attempt ──────► show newest hint (free)
//!     hidden, no token, last attempt ──────► refuse: NoAttemptsLeft
//!     hidden, no token ────────────────────► spend one attempt, mint token, show
//! ```
//!
//! A token is only good for the attempt it was minted at. Once the attempt
//! moves on (failed submission, timeout) the next reveal is paid for again.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, MAX_ATTEMPTS};

/// What a toggle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum HintToggle {
    /// The panel was closed.
    Hidden,
    /// The panel was reopened under an existing purchase.
    Reshown(String),
    /// An attempt was spent and the panel opened.
    Purchased(String),
}

/// Hint texts and the purchase token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HintEconomy {
    daily: Option<String>,
    latest: Option<String>,
    displayed: Option<String>,
    token: Option<u32>,
}

impl HintEconomy {
    /// Create an economy with no hint text yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the daily target hint fetched at round start.
    pub fn set_daily(&mut self, text: Option<String>) {
        self.daily = text.filter(|t| !t.trim().is_empty());
    }

    /// Offer a hint from a submission. The open panel keeps its text until
    /// it is next opened.
    pub fn offer(&mut self, text: Option<String>) {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            self.latest = Some(text);
        }
    }

    /// Newest hint text available.
    #[must_use]
    pub fn newest(&self) -> Option<&str> {
        self.latest.as_deref().or(self.daily.as_deref())
    }

    /// Text currently shown, `None` when the panel is closed.
    #[must_use]
    pub fn displayed(&self) -> Option<&str> {
        self.displayed.as_deref()
    }

    /// Attempt the current purchase token is valid for.
    #[must_use]
    pub fn token(&self) -> Option<u32> {
        self.token
    }

    /// Close the panel without touching the token.
    pub fn close(&mut self) {
        self.displayed = None;
    }

    /// Toggle the panel at `attempt`.
    ///
    /// On [`HintToggle::Purchased`] the caller must advance the attempt by
    /// one; the token has already been minted for that next attempt.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::HintUnavailable`] when there is no hint text and
    /// [`CoreError::NoAttemptsLeft`] when a purchase is needed on the last
    /// attempt. Neither changes any state.
    pub fn toggle(&mut self, attempt: u32) -> CoreResult<HintToggle> {
        if self.displayed.take().is_some() {
            return Ok(HintToggle::Hidden);
        }
        let text = self
            .newest()
            .map(str::to_string)
            .ok_or(CoreError::HintUnavailable)?;
        if self.token == Some(attempt) {
            self.displayed = Some(text.clone());
            return Ok(HintToggle::Reshown(text));
        }
        if attempt >= MAX_ATTEMPTS {
            return Err(CoreError::NoAttemptsLeft);
        }
        self.token = Some(attempt + 1);
        self.displayed = Some(text.clone());
        Ok(HintToggle::Purchased(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn economy() -> HintEconomy {
        let mut hints = HintEconomy::new();
        hints.set_daily(Some("Used for cutting".to_string()));
        hints
    }

    #[test]
    fn test_purchase_then_free_reshow() {
        let mut hints = economy();
        assert_eq!(
            hints.toggle(1).expect("purchase"),
            HintToggle::Purchased("Used for cutting".to_string())
        );
        assert_eq!(hints.token(), Some(2));

        assert_eq!(hints.toggle(2).expect("hide"), HintToggle::Hidden);
        assert_eq!(
            hints.toggle(2).expect("reshow"),
            HintToggle::Reshown("Used for cutting".to_string())
        );
    }

    #[test]
    fn test_token_expires_with_attempt() {
        let mut hints = economy();
        hints.toggle(1).expect("purchase");
        hints.close();
        assert!(matches!(hints.toggle(3), Ok(HintToggle::Purchased(_))));
        assert_eq!(hints.token(), Some(4));
    }

    #[test]
    fn test_refused_at_last_attempt() {
        let mut hints = economy();
        assert!(matches!(hints.toggle(MAX_ATTEMPTS), Err(CoreError::NoAttemptsLeft)));
        assert!(hints.displayed().is_none());
        assert!(hints.token().is_none());
    }

    #[test]
    fn test_refused_without_text() {
        let mut hints = HintEconomy::new();
        assert!(matches!(hints.toggle(1), Err(CoreError::HintUnavailable)));
        assert!(hints.token().is_none());
    }

    #[test]
    fn test_offer_does_not_replace_open_panel() {
        let mut hints = economy();
        hints.toggle(1).expect("purchase");
        hints.offer(Some("Sharp edge".to_string()));
        assert_eq!(hints.displayed(), Some("Used for cutting"));

        hints.toggle(2).expect("hide");
        assert_eq!(
            hints.toggle(2).expect("reshow"),
            HintToggle::Reshown("Sharp edge".to_string())
        );
    }

    #[test]
    fn test_blank_offer_ignored() {
        let mut hints = economy();
        hints.offer(Some("  ".to_string()));
        assert_eq!(hints.newest(), Some("Used for cutting"));
    }
}
