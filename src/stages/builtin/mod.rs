//! Built-in stage set: main menu, membership and app/password help.

mod adesao;
mod aplicativo;
pub mod copy;
mod main_menu;

pub use adesao::Adesao;
pub use aplicativo::Aplicativo;
pub use main_menu::MainMenu;

use crate::stages::registry::{DEFAULT_STAGE, StageDefinition, StageRegistry};

pub const ADESAO: &str = "adesao";
pub const APLICATIVO: &str = "aplicativo";

/// Main-menu targets served by stages the embedding deployment registers.
pub const EXTERNAL_TARGETS: &[&str] = &[
    "capital",
    "emprestimos",
    "parcerias",
    "consultoria",
    "excolaborador",
    "negociacao",
    "informe",
    "duvidas",
];

/// Declarative list of the built-in stages.
pub fn definitions() -> Vec<StageDefinition> {
    let mut menu_targets = vec![ADESAO, APLICATIVO];
    menu_targets.extend_from_slice(EXTERNAL_TARGETS);

    vec![
        StageDefinition::new(DEFAULT_STAGE, "Menu Principal")
            .with_description("Menu principal de atendimento")
            .with_handler(MainMenu)
            .with_next_stages(&menu_targets),
        StageDefinition::new(ADESAO, "Adesão")
            .with_description("Processo de adesão à Ativa Grupo SBF")
            .with_handler(Adesao)
            .with_next_stages(&[DEFAULT_STAGE]),
        StageDefinition::new(APLICATIVO, "Aplicativo ou Senha")
            .with_description("Ajuda com aplicativo e senhas de acesso")
            .with_handler(Aplicativo)
            .with_next_stages(&[DEFAULT_STAGE]),
    ]
}

pub fn registry() -> StageRegistry {
    StageRegistry::from_definitions(definitions())
}

/// Whether normalized `text` is one of `tokens`.
fn matches(text: &str, tokens: &[&str]) -> bool {
    tokens.contains(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_builtins() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(DEFAULT_STAGE));
        assert!(registry.contains(ADESAO));
        assert!(registry.contains(APLICATIVO));
        assert!(registry.can_navigate(DEFAULT_STAGE, APLICATIVO));
        assert!(registry.can_navigate(ADESAO, DEFAULT_STAGE));
        assert!(!registry.can_navigate(ADESAO, APLICATIVO));
    }

    #[test]
    fn only_external_targets_dangle() {
        let dangling: Vec<String> = registry()
            .dangling_targets()
            .into_iter()
            .map(|(from, to)| {
                assert_eq!(from, DEFAULT_STAGE);
                to
            })
            .collect();
        let mut expected: Vec<String> = EXTERNAL_TARGETS.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(dangling, expected);
    }

    mod flows {
        use std::sync::Arc;

        use super::super::aplicativo::LAST_TOPIC;
        use super::*;
        use crate::config::AllowList;
        use crate::message::testing::message;
        use crate::stages::{StageEngine, UserStageStore};
        use crate::store::LibSqlBackend;

        async fn engine() -> StageEngine {
            let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
            let store = UserStageStore::new(db, Arc::new(registry()), AllowList::default());
            StageEngine::new(Arc::new(store), AllowList::everyone())
        }

        async fn send(engine: &StageEngine, body: &str) -> (bool, Vec<String>) {
            let (msg, out) = message("5511999@s.whatsapp.net", body);
            let msg = msg.with_push_name("Ana");
            let ok = engine.process(&msg).await;
            (ok, out.replies())
        }

        async fn stage_of(engine: &StageEngine) -> String {
            engine.store().get("5511999").await.unwrap().current_stage
        }

        #[tokio::test]
        async fn greeting_shows_personalized_menu() {
            let engine = engine().await;
            let (ok, replies) = send(&engine, "Oi").await;
            assert!(ok);
            assert_eq!(replies, vec![copy::main_menu("Ana")]);
            assert!(replies[0].contains("Olá, Ana!"));
            assert_eq!(stage_of(&engine).await, DEFAULT_STAGE);
        }

        #[tokio::test]
        async fn option_one_opens_adesao_instructions() {
            let engine = engine().await;
            let (ok, replies) = send(&engine, " 1 ").await;
            assert!(ok);
            assert_eq!(replies, vec![copy::ADESAO_INSTRUCTIONS.to_string()]);
            assert_eq!(stage_of(&engine).await, ADESAO);

            let (_, replies) = send(&engine, "LINK").await;
            assert_eq!(replies, vec![copy::ADESAO_LINK.to_string()]);

            let (_, replies) = send(&engine, "voltar").await;
            assert_eq!(replies, vec![copy::main_menu("Ana")]);
            assert_eq!(stage_of(&engine).await, DEFAULT_STAGE);
        }

        #[tokio::test]
        async fn app_stage_shows_submenu_on_entry() {
            let engine = engine().await;
            let (_, replies) = send(&engine, "senha").await;
            assert_eq!(replies, vec![copy::APP_MENU.to_string()]);
            assert_eq!(stage_of(&engine).await, APLICATIVO);
        }

        #[tokio::test]
        async fn app_topics_record_last_topic() {
            let engine = engine().await;
            send(&engine, "2").await;

            let (_, replies) = send(&engine, "bloqueada").await;
            assert_eq!(replies, vec![copy::AppTopic::BlockedQuestion.reply()]);

            let (_, replies) = send(&engine, "sim").await;
            assert_eq!(replies, vec![copy::AppTopic::BlockedYes.reply()]);

            let state = engine.store().get("5511999").await.unwrap();
            assert_eq!(
                state.data.get::<String>(LAST_TOPIC).as_deref(),
                Some("blocked_yes")
            );

            let (_, replies) = send(&engine, "menu inicial").await;
            assert_eq!(replies, vec![copy::main_menu("Ana")]);
            let state = engine.store().get("5511999").await.unwrap();
            assert!(state.data.is_empty());
        }

        #[tokio::test]
        async fn repeated_selector_gives_same_reply() {
            let engine = engine().await;
            send(&engine, "aplicativo").await;
            let (_, first) = send(&engine, "download").await;
            let (_, second) = send(&engine, "download").await;
            assert_eq!(first, second);
        }

        #[tokio::test]
        async fn external_targets_fail_with_not_found() {
            let engine = engine().await;
            let (ok, replies) = send(&engine, "3").await;
            assert!(!ok);
            assert_eq!(
                replies,
                vec!["❌ Erro ao acessar: stage 'capital' não encontrado".to_string()]
            );
            assert_eq!(stage_of(&engine).await, DEFAULT_STAGE);
        }

        #[tokio::test]
        async fn farewell_keeps_stage() {
            let engine = engine().await;
            let (ok, replies) = send(&engine, "sair").await;
            assert!(ok);
            assert_eq!(replies, vec![copy::FAREWELL.to_string()]);
            assert_eq!(stage_of(&engine).await, DEFAULT_STAGE);
        }
    }
}
