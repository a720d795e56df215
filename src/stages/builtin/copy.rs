//! Reply bodies for the built-in stages.

pub const FAREWELL: &str = "👋 *Atendimento encerrado!*

Obrigado por entrar em contato conosco.

Se precisar de mais alguma coisa, é só me chamar novamente! 😊";

const MAIN_MENU: &str = "🏢 *Olá! Bem-vindo ao Whatsapp da Ativa Grupo SBF 😃*

Olá, {name}! 👋
Informamos que as mensagens deste canal devem ser apenas de texto. Não atendemos mensagens de voz ou ligações.

Escolha a opção desejada para atendimento:

📋 *MENU PRINCIPAL*

1️⃣ *Adesão* - Informações sobre adesão
2️⃣ *Aplicativo ou Senha* - Acesso ao sistema
3️⃣ *Capital (Investimento)* - Produtos de investimento
4️⃣ *Empréstimos* - Soluções de crédito
5️⃣ *Parcerias* - Oportunidades de parceria
6️⃣ *Consultoria Financeira* - Orientação especializada
7️⃣ *Ex-colaborador* - Atendimento para ex-funcionários
8️⃣ *Negociação de Dívidas* - Ex-colaborador
9️⃣ *Informe de Rendimentos* - Documentos fiscais
🔟 *Não encontrou sua dúvida?* - Atendimento personalizado
1️⃣1️⃣ *Encerrar Atendimento* - Finalizar conversa

💡 *Como usar:*
• Digite o *número* da opção (ex: 1, 2, 3...)
• Digite o *nome* da opção (ex: adesão, empréstimos)
• Use palavras-chave como *sair* ou *encerrar*

Escolha uma opção para continuar! ⬇️";

/// Main menu greeting `name`.
pub fn main_menu(name: &str) -> String {
    MAIN_MENU.replace("{name}", name)
}

pub const ADESAO_LINK: &str = "🔗 *Link para Adesão*

Para acessar o formulário de adesão, clique no link abaixo:

📋 *Formulário de Pessoa Física:*
https://wscredcoopsbf.facilinformatica.com.br/facweb/#formulario-de-pessoa-fisica

💡 *Dica:* Você pode copiar e colar o link no seu navegador.

Digite *0* para voltar ao menu principal.";

pub const ADESAO_INSTRUCTIONS: &str = "📋 *PROCESSO DE ADESÃO - ATIVA GRUPO SBF*

Para aderir à Ativa, siga os passos abaixo:

🔗 *1. Acesse o Link*
Para aderir à Ativa, acesse o link:
https://wscredcoopsbf.facilinformatica.com.br/facweb/#formulario-de-pessoa-fisica

📝 *2. Preencha o Formulário*
Em seguida, preencha os campos obrigatórios marcados com asterisco vermelho (*).

💾 *3. Salve os Dados*
Após inserir todos os dados necessários, clique em \"SALVAR\"

📄 *4. Termo de Consentimento*
Aparecerá na tela o Termo de Consentimento de Alteração de Dados Cadastrais. Leia atentamente e dê o aceite para prosseguir.

✅ *5. Confirmação*
Agora é só aguardar que o nosso time irá enviar um e-mail de boas-vindas e confirmação do cadastro.

💡 *Comandos disponíveis:*
• Digite *link* para acessar o formulário
• Digite *0* para voltar ao menu principal

Precisa de mais alguma informação sobre o processo de adesão?";

pub const APP_MENU: &str = "📱 *APLICATIVO OU SENHA DE ACESSO*

Escolha a opção desejada:

1️⃣ *Como baixar o aplicativo*
2️⃣ *Esqueci minha senha de acesso ao aplicativo*
3️⃣ *Senha bloqueada*
4️⃣ *Voltar ao menu inicial*
5️⃣ *Encerrar atendimento*

💡 *Como usar:*
• Digite o *número* da opção (ex: 1, 2, 3...)
• Digite palavras-chave como *baixar*, *senha*, *bloqueada*

Escolha uma opção para continuar! ⬇️";

const APP_NAVIGATION: &str = "📋 *Navegação:*
• Digite *0* para voltar ao menu principal
• Digite *5* para encerrar atendimento";

const APP_DOWNLOAD: &str = "📱 *Como baixar o aplicativo*

Você pode encontrar o nosso aplicativo pesquisando por \"Cooper Ativa\" em iOS ou Android.

🔍 *Como encontrar:*
• **iOS (App Store):** Procure por \"Cooper Ativa\"
• **Android (Google Play):** Procure por \"Cooper Ativa\"

💡 *Dica:* Certifique-se de baixar o aplicativo oficial da Cooperativa Ativa.";

const APP_PASSWORD_RECOVERY: &str = "🔑 *Esqueci minha senha de acesso ao aplicativo*

*Siga os passos abaixo:*

1️⃣ **Acesse o iBanking através deste link:**
https://wscredcoopsbf.facilinformatica.com.br/facweb/

2️⃣ **Informe seu CPF e clique no botão \"próxima\".**

3️⃣ **Clique no botão \"esqueceu a senha?\"**

4️⃣ **Digite o CPF e a data de nascimento e clique botão \"enviar\"**

5️⃣ **Você receberá uma senha temporária no e-mail cadastrado na Ativa**

6️⃣ **Após o recebimento, entre no site ou app da Cooper Ativa novamente, repita o passo 1 e entre utilizando a sua senha temporária**

7️⃣ **Após entrar, será necessário criar a sua senha definitiva. Para isso, insira sua senha temporária em \"Senha atual\", e crie a sua nova senha de 6 dígitos nos demais campos**

8️⃣ **Uma vez confirmada a nova senha definitiva, clique em \"ALTERAR SENHA\"**

9️⃣ **Para finalizar, aceite o termo de Consentimento para Tratamento de Dados para continuar.**";

const APP_BLOCKED_QUESTION: &str = "🔒 *Senha bloqueada*

Você tentou realizar o acesso via iBanking ou pelo aplicativo \"Cooper Ativa\" e recebeu a mensagem que sua senha estava bloqueada? 🔒

**Opções:**
• Digite *1* se SIM
• Digite *2* se NÃO";

const APP_BLOCKED_YES: &str = "📞 *Atendimento para senha bloqueada*

Informe sua matrícula e aguarde um instante, você será atendido em breve.

Nossa equipe entrará em contato com você para solucionar o bloqueio o mais breve possível.";

const APP_BLOCKED_NO: &str = "📧 *Reporte o erro*

Envie um print da tela com o erro para o e-mail cooperativa@gruposbf.com.br para que possamos verificar o erro.

Nossa equipe entrará em contato com você para solucionar o bloqueio o mais breve possível.";

/// Help topics of the app/password stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTopic {
    Download,
    PasswordRecovery,
    BlockedQuestion,
    BlockedYes,
    BlockedNo,
}

impl AppTopic {
    pub fn key(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::PasswordRecovery => "password_recovery",
            Self::BlockedQuestion => "blocked_question",
            Self::BlockedYes => "blocked_yes",
            Self::BlockedNo => "blocked_no",
        }
    }

    /// Topic body followed by the navigation footer.
    pub fn reply(self) -> String {
        let body = match self {
            Self::Download => APP_DOWNLOAD,
            Self::PasswordRecovery => APP_PASSWORD_RECOVERY,
            Self::BlockedQuestion => APP_BLOCKED_QUESTION,
            Self::BlockedYes => APP_BLOCKED_YES,
            Self::BlockedNo => APP_BLOCKED_NO,
        };
        format!("{body}\n\n{APP_NAVIGATION}")
    }
}
