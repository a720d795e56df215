//! App and password help stage.
//!
//! Each topic answer ends with the navigation footer; the last topic shown
//! is kept in stage data.

use async_trait::async_trait;

use super::copy::{self, AppTopic};
use super::matches;
use crate::stages::registry::{DEFAULT_STAGE, StageContext, StageHandler, StageOutcome};

const BACK: &[&str] = &[
    "0",
    "voltar",
    "menu",
    "início",
    "inicio",
    "4",
    "voltar menu",
    "menu inicial",
];
const FAREWELL: &[&str] = &["5", "encerrar", "sair", "fim"];

const TOPICS: &[(&[&str], AppTopic)] = &[
    (&["1", "baixar", "download", "aplicativo"], AppTopic::Download),
    (
        &["2", "esqueci", "senha", "recuperar"],
        AppTopic::PasswordRecovery,
    ),
    (&["3", "bloqueada", "bloqueado"], AppTopic::BlockedQuestion),
    (&["sim", "1 sim"], AppTopic::BlockedYes),
    (&["não", "nao", "2 não", "2 nao"], AppTopic::BlockedNo),
];

/// Data key recording the last topic shown.
pub const LAST_TOPIC: &str = "last_topic";

/// `aplicativo` stage: app download and password help.
pub struct Aplicativo;

#[async_trait]
impl StageHandler for Aplicativo {
    async fn handle(&self, ctx: StageContext<'_>) -> StageOutcome {
        let msg = ctx.message;

        if !ctx.is_entry() {
            let text = msg.normalized_text();
            if matches(&text, BACK) {
                return StageOutcome::goto(DEFAULT_STAGE);
            }
            if matches(&text, FAREWELL) {
                msg.reply(copy::FAREWELL).await;
                return StageOutcome::handled();
            }
            if let Some((_, topic)) = TOPICS.iter().find(|(tokens, _)| matches(&text, tokens)) {
                if let Err(e) = ctx.state.data.set(LAST_TOPIC, topic.key()) {
                    tracing::warn!(user = %msg.user_id, "Failed to record topic: {e}");
                }
                msg.reply(&topic.reply()).await;
                return StageOutcome::handled();
            }
        }

        msg.reply(copy::APP_MENU).await;
        StageOutcome::handled()
    }
}
