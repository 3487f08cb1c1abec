//! Admin edits to a conversation policy.
//!
//! Every setting command resolves to one `PolicyChange`. Numeric values are
//! clamped into their accepted range here, so a stored policy never carries
//! a value the commands could not have produced.

use std::ops::RangeInclusive;

use crate::database::{ChallengePolicy, ConversationPolicy, DEFAULT_WELCOME_TEMPLATE};

pub const VALID_DAYS_RANGE: RangeInclusive<u32> = 1..=365;
pub const MAX_WARNINGS_RANGE: RangeInclusive<u32> = 1..=10;
pub const MIN_ACCOUNT_AGE_RANGE: RangeInclusive<u32> = 0..=365;

/// On/off settings of a conversation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Challenge,
    Cooldown,
    AntiFlood,
    ProtectContent,
    DeleteServiceMessages,
}

impl Toggle {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Challenge => "Join challenge",
            Self::Cooldown => "Post cooldown",
            Self::AntiFlood => "Anti-flood",
            Self::ProtectContent => "Comment protection",
            Self::DeleteServiceMessages => "Join message cleanup",
        }
    }

    fn slot(self, policy: &mut ConversationPolicy) -> &mut bool {
        match self {
            Self::Challenge => &mut policy.challenge_enabled,
            Self::Cooldown => &mut policy.cooldown_enabled,
            Self::AntiFlood => &mut policy.anti_flood_enabled,
            Self::ProtectContent => &mut policy.protect_content,
            Self::DeleteServiceMessages => &mut policy.delete_service_messages,
        }
    }
}

/// Bundled settings applied in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Day-old accounts, challenge, cleanup, anti-flood with three warnings.
    Standard,
    /// Week-old accounts and two warnings, otherwise as `Standard`.
    Maximum,
    /// Every module on, thresholds untouched.
    AllOn,
    /// Every module off, thresholds untouched.
    AllOff,
}

impl Preset {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "max" | "maximum" => Some(Self::Maximum),
            "on" | "all_on" => Some(Self::AllOn),
            "off" | "all_off" => Some(Self::AllOff),
            _ => None,
        }
    }

    fn apply(self, policy: &mut ConversationPolicy) {
        let (min_age, max_warnings) = match self {
            Self::Standard => (1, 3),
            Self::Maximum => (7, 2),
            Self::AllOn | Self::AllOff => {
                let on = self == Self::AllOn;
                policy.enabled = on;
                policy.challenge_enabled = on;
                policy.delete_service_messages = on;
                policy.anti_flood_enabled = on;
                return;
            }
        };

        policy.enabled = true;
        policy.min_account_age_days = min_age;
        policy.challenge_enabled = true;
        policy.delete_service_messages = true;
        policy.anti_flood_enabled = true;
        policy.max_warnings = max_warnings;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyChange {
    Enabled(bool),
    Toggle(Toggle, bool),
    ChallengePolicy(ChallengePolicy),
    ChallengeValidDays(u32),
    MinAccountAge(u32),
    MaxWarnings(u32),
    WelcomeTemplate(String),
    ResetWelcome,
    Preset(Preset),
}

impl PolicyChange {
    pub fn apply(self, policy: &mut ConversationPolicy) {
        match self {
            Self::Enabled(on) => policy.enabled = on,
            Self::Toggle(toggle, on) => *toggle.slot(policy) = on,
            Self::ChallengePolicy(p) => policy.challenge_policy = p,
            Self::ChallengeValidDays(days) => {
                policy.challenge_valid_days = clamp(days, VALID_DAYS_RANGE);
            }
            Self::MinAccountAge(days) => {
                policy.min_account_age_days = clamp(days, MIN_ACCOUNT_AGE_RANGE);
            }
            Self::MaxWarnings(n) => policy.max_warnings = clamp(n, MAX_WARNINGS_RANGE),
            Self::WelcomeTemplate(text) => policy.welcome_template = text,
            Self::ResetWelcome => policy.welcome_template = DEFAULT_WELCOME_TEMPLATE.to_string(),
            Self::Preset(preset) => preset.apply(policy),
        }
    }
}

fn clamp(value: u32, range: RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(change: PolicyChange) -> ConversationPolicy {
        let mut policy = ConversationPolicy::defaults(-1);
        change.apply(&mut policy);
        policy
    }

    #[test]
    fn test_toggles_hit_their_own_field() {
        let policy = changed(PolicyChange::Toggle(Toggle::Cooldown, true));
        assert!(policy.cooldown_enabled);
        assert_eq!(
            ConversationPolicy {
                cooldown_enabled: false,
                ..policy
            },
            ConversationPolicy::defaults(-1)
        );

        assert!(!changed(PolicyChange::Toggle(Toggle::ProtectContent, false)).protect_content);
        assert!(!changed(PolicyChange::Toggle(Toggle::Challenge, false)).challenge_enabled);
    }

    #[test]
    fn test_numbers_are_clamped() {
        assert_eq!(changed(PolicyChange::ChallengeValidDays(0)).challenge_valid_days, 1);
        assert_eq!(changed(PolicyChange::ChallengeValidDays(u32::MAX)).challenge_valid_days, 365);
        assert_eq!(changed(PolicyChange::MaxWarnings(0)).max_warnings, 1);
        assert_eq!(changed(PolicyChange::MaxWarnings(50)).max_warnings, 10);
        assert_eq!(changed(PolicyChange::MinAccountAge(0)).min_account_age_days, 0);
        assert_eq!(changed(PolicyChange::MinAccountAge(1000)).min_account_age_days, 365);
    }

    #[test]
    fn test_welcome_reset_restores_default() {
        let mut policy = changed(PolicyChange::WelcomeTemplate("Hi {name}".into()));
        assert_eq!(policy.welcome_template, "Hi {name}");

        PolicyChange::ResetWelcome.apply(&mut policy);
        assert_eq!(policy.welcome_template, DEFAULT_WELCOME_TEMPLATE);
    }

    #[test]
    fn test_presets() {
        let mut policy = ConversationPolicy::defaults(-1);
        PolicyChange::Preset(Preset::AllOff).apply(&mut policy);
        assert!(!policy.enabled);
        assert!(!policy.challenge_enabled);
        assert!(!policy.delete_service_messages);
        assert!(!policy.anti_flood_enabled);
        assert_eq!(policy.max_warnings, 3);

        PolicyChange::Preset(Preset::Maximum).apply(&mut policy);
        assert!(policy.enabled && policy.challenge_enabled && policy.anti_flood_enabled);
        assert_eq!(policy.min_account_age_days, 7);
        assert_eq!(policy.max_warnings, 2);

        PolicyChange::Preset(Preset::Standard).apply(&mut policy);
        assert_eq!(policy.min_account_age_days, 1);
        assert_eq!(policy.max_warnings, 3);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(Preset::parse("Standard"), Some(Preset::Standard));
        assert_eq!(Preset::parse(" max "), Some(Preset::Maximum));
        assert_eq!(Preset::parse("off"), Some(Preset::AllOff));
        assert_eq!(Preset::parse("loud"), None);
    }
}
