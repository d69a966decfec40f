//! Slash-command parsing and the fixed replies of the auxiliary commands.

use {
    chrono::{DateTime, TimeZone},
    mapion_search::SEARCH_COMMAND,
    teloxide::types::{BotCommand, KeyboardButton, KeyboardMarkup},
};

pub const PHOTO_REPLY: &str = "Bela foto! Mas eu ainda só sei trabalhar com texto e comandos.";

pub const UNKNOWN_COMMAND: &str =
    "Comando desconhecido. Envie /ajuda para ver os comandos disponíveis.";

pub const HELP_TEXT: &str = "Comandos disponíveis:\n\
                             /start - Inicia a conversa e mostra o teclado\n\
                             /consultar [placa] - Consulta uma placa\n\
                             /ajuda - Mostra esta mensagem de ajuda\n\
                             /data - Exibe a data e hora atuais\n\
                             \n\
                             Você também pode enviar várias placas de uma vez, separadas por \
                             vírgula ou uma por linha.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Date,
    /// Begin a search; text after the command is the query itself.
    Search(Option<String>),
    Unknown(String),
    /// `/cmd@otherbot` in a group; not ours to answer.
    OtherBot,
}

/// Parse a leading slash command. Returns `None` for ordinary text.
///
/// The first word names the command, and a `@username` suffix must name this
/// bot.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let body = text.trim().strip_prefix('/')?;
    let (word, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    if word.is_empty() {
        return None;
    }
    let (name, target) = match word.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (word, None),
    };

    if let Some(target) = target
        && !bot_username.is_some_and(|me| me.eq_ignore_ascii_case(target))
    {
        return Some(Command::OtherBot);
    }

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "ajuda" | "help" => Command::Help,
        "data" => Command::Date,
        SEARCH_COMMAND => {
            let query = rest.trim();
            Command::Search((!query.is_empty()).then(|| query.to_string()))
        },
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}

/// Commands registered with Telegram for client-side autocomplete.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Inicia a conversa e mostra o teclado"),
        BotCommand::new(SEARCH_COMMAND, "Consulta uma placa"),
        BotCommand::new("ajuda", "Mostra os comandos disponíveis"),
        BotCommand::new("data", "Exibe a data e hora atuais"),
    ]
}

pub fn greeting(first_name: Option<&str>) -> String {
    match first_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            format!("Olá, {name}! Eu sou o Mapion. Use os botões abaixo para interagir.")
        },
        None => "Olá! Eu sou o Mapion. Use os botões abaixo para interagir.".to_string(),
    }
}

/// Reply keyboard shown by `/start`.
pub fn main_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(format!("/{SEARCH_COMMAND}"))],
        vec![KeyboardButton::new("/ajuda"), KeyboardButton::new("/data")],
    ])
    .resize_keyboard()
}

pub fn date_reply<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("Data e hora atuais: {}", now.format("%d/%m/%Y, %H:%M:%S"))
}
