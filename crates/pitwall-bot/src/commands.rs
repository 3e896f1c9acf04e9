#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BotCommand {
    Start,
    Menu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TelegramCommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CommandDef {
    command: BotCommand,
    patterns: &'static [&'static str],
    telegram_spec: TelegramCommandSpec,
}

const COMMAND_DEFS: &[CommandDef] = &[
    CommandDef {
        command: BotCommand::Start,
        patterns: &["/start"],
        telegram_spec: TelegramCommandSpec {
            command: "start",
            description: "Introduce the bot",
        },
    },
    CommandDef {
        command: BotCommand::Menu,
        patterns: &["/menu"],
        telegram_spec: TelegramCommandSpec {
            command: "menu",
            description: "Show the bot menu",
        },
    },
];

pub(crate) fn telegram_command_specs() -> Vec<TelegramCommandSpec> {
    COMMAND_DEFS.iter().map(|def| def.telegram_spec).collect()
}

pub(crate) fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();

    COMMAND_DEFS.iter().find_map(|def| {
        def.patterns
            .iter()
            .any(|pattern| command_matches(trimmed, pattern))
            .then_some(def.command)
    })
}

/// Whether a message should be routed as a command rather than a button.
pub(crate) fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

fn command_matches(trimmed_text: &str, command: &str) -> bool {
    if trimmed_text == command {
        return true;
    }

    trimmed_text
        .strip_prefix(command)
        .is_some_and(|stripped| stripped.starts_with('@'))
}
