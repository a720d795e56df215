//! Main menu stage: numbered options that open the other stages.

use async_trait::async_trait;

use super::{ADESAO, APLICATIVO, copy, matches};
use crate::stages::registry::{StageContext, StageHandler, StageOutcome};

/// Menu option tokens and the stage each one opens.
const ROUTES: &[(&[&str], &str)] = &[
    (&["1", "adesão", "adesao"], ADESAO),
    (&["2", "aplicativo", "senha", "acesso"], APLICATIVO),
    (&["3", "capital", "investimento"], "capital"),
    (&["4", "empréstimos", "emprestimos"], "emprestimos"),
    (&["5", "parcerias"], "parcerias"),
    (&["6", "consultoria", "financeira"], "consultoria"),
    (&["7", "ex-colaborador", "excolaborador"], "excolaborador"),
    (
        &["8", "negociação", "negociacao", "dívidas", "dividas"],
        "negociacao",
    ),
    (&["9", "informe", "rendimentos"], "informe"),
    (
        &["10", "dúvida", "duvida", "não encontrou", "nao encontrou"],
        "duvidas",
    ),
];

const FAREWELL_TOKENS: &[&str] = &["11", "encerrar", "sair", "fim"];

/// `default` stage: the main menu.
pub struct MainMenu;

#[async_trait]
impl StageHandler for MainMenu {
    async fn handle(&self, ctx: StageContext<'_>) -> StageOutcome {
        let msg = ctx.message;

        if !ctx.is_entry() {
            let text = msg.normalized_text();
            if let Some((_, target)) = ROUTES.iter().find(|(tokens, _)| matches(&text, tokens)) {
                return StageOutcome::goto(target);
            }
            if matches(&text, FAREWELL_TOKENS) {
                msg.reply(copy::FAREWELL).await;
                return StageOutcome::handled();
            }
        }

        msg.reply(&copy::main_menu(msg.display_name())).await;
        StageOutcome::handled()
    }
}
