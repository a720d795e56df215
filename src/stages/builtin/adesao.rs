//! Membership stage: enrollment instructions and the sign-up link.

use async_trait::async_trait;

use super::{copy, matches};
use crate::stages::registry::{DEFAULT_STAGE, StageContext, StageHandler, StageOutcome};

const BACK: &[&str] = &["0", "voltar", "menu", "início", "inicio"];
const LINK: &[&str] = &["link", "acessar", "formulário", "formulario"];

/// `adesao` stage: membership instructions.
pub struct Adesao;

#[async_trait]
impl StageHandler for Adesao {
    async fn handle(&self, ctx: StageContext<'_>) -> StageOutcome {
        let msg = ctx.message;
        let text = msg.normalized_text();

        if !ctx.is_entry() {
            if matches(&text, BACK) {
                return StageOutcome::goto(DEFAULT_STAGE);
            }
            if matches(&text, LINK) {
                msg.reply(copy::ADESAO_LINK).await;
                return StageOutcome::handled();
            }
        }

        msg.reply(copy::ADESAO_INSTRUCTIONS).await;
        StageOutcome::handled()
    }
}
