//! Challenge button callbacks.
//!
//! Callback data is `captcha_verify_<uid>` for the correct button and
//! `captcha_bot_<uid>` for the wrong one, where `<uid>` is the challenged user.

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::moderation::{AnswerOutcome, ChallengeAnswerEvent, ModerationEvent, ModerationOutcome};

const VERIFY_PREFIX: &str = "captcha_verify_";
const BOT_PREFIX: &str = "captcha_bot_";

pub fn verify_data(user_id: u64) -> String {
    format!("{}{}", VERIFY_PREFIX, user_id)
}

pub fn bot_data(user_id: u64) -> String {
    format!("{}{}", BOT_PREFIX, user_id)
}

/// Parse callback data into (challenged user, correct answer).
pub fn parse_challenge_callback(data: &str) -> Option<(u64, bool)> {
    if let Some(uid) = data.strip_prefix(VERIFY_PREFIX) {
        return uid.parse().ok().map(|uid| (uid, true));
    }
    if let Some(uid) = data.strip_prefix(BOT_PREFIX) {
        return uid.parse().ok().map(|uid| (uid, false));
    }
    None
}

pub fn handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_callback_query()
        .filter(|q: CallbackQuery| {
            q.data
                .as_deref()
                .and_then(parse_challenge_callback)
                .is_some()
        })
        .endpoint(challenge_callback)
}

async fn challenge_callback(bot: ThrottledBot, q: CallbackQuery, state: AppState) -> anyhow::Result<()> {
    let Some((owner_id, correct)) = q.data.as_deref().and_then(parse_challenge_callback) else {
        return Ok(());
    };
    let Some(message) = q.regular_message() else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };

    let chat_id = message.chat.id.0;
    let event = ChallengeAnswerEvent {
        chat_id,
        responder_id: q.from.id.0,
        owner_id,
        correct,
    };
    debug!("Challenge answer {:?}", event);

    let ModerationOutcome::ChallengeAnswer(outcome) =
        state.engine.handle(ModerationEvent::ChallengeAnswer(event)).await
    else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let (text, alert) = callback_reply(outcome);

    if let Err(e) = bot
        .answer_callback_query(&q.id)
        .text(text)
        .show_alert(alert)
        .await
    {
        warn!("Failed to answer callback in {}: {}", chat_id, e);
    }
    Ok(())
}

/// Toast text for an answer outcome, and whether it shows as an alert.
fn callback_reply(outcome: AnswerOutcome) -> (String, bool) {
    match outcome {
        AnswerOutcome::Passed => ("✅ Verification passed. Welcome!".to_string(), false),
        AnswerOutcome::Retry { remaining } => (
            format!("⚠️ Wrong answer! Attempts left: {}", remaining),
            true,
        ),
        AnswerOutcome::Removed => ("🚫 Too many wrong answers.".to_string(), true),
        AnswerOutcome::NotYours => ("❌ This verification is not for you!".to_string(), true),
        AnswerOutcome::NoChallenge => ("ℹ️ This verification is no longer active.".to_string(), false),
        AnswerOutcome::RetryLater => ("❌ Verification error. Please try again.".to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge_callback() {
        assert_eq!(parse_challenge_callback("captcha_verify_42"), Some((42, true)));
        assert_eq!(parse_challenge_callback("captcha_bot_42"), Some((42, false)));
        assert_eq!(parse_challenge_callback(&verify_data(7)), Some((7, true)));
        assert_eq!(parse_challenge_callback(&bot_data(7)), Some((7, false)));
        assert_eq!(parse_challenge_callback("captcha_verify_"), None);
        assert_eq!(parse_challenge_callback("captcha_verify_x"), None);
        assert_eq!(parse_challenge_callback("warn_remove:1:2"), None);
    }

    #[test]
    fn test_callback_reply() {
        assert_eq!(
            callback_reply(AnswerOutcome::Retry { remaining: 2 }),
            ("⚠️ Wrong answer! Attempts left: 2".to_string(), true)
        );
        assert!(!callback_reply(AnswerOutcome::Passed).1);
        assert!(!callback_reply(AnswerOutcome::NoChallenge).1);
        assert!(callback_reply(AnswerOutcome::NotYours).1);
    }
}
