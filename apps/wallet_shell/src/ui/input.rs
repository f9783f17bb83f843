use crate::backend_bridge::commands::BackendCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Command(BackendCommand),
    /// Form input change, keyed by the input's field name.
    Edit(String, String),
    SubmitTransfer,
    ShowForm,
    Help,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<ShellInput, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "" => ShellInput::Empty,
        "connect" => ShellInput::Command(BackendCommand::Connect),
        "disconnect" => ShellInput::Command(BackendCommand::Disconnect),
        "balance" => ShellInput::Command(BackendCommand::LoadBalance),
        "retry" => ShellInput::Command(BackendCommand::Retry),
        "status" => ShellInput::Command(BackendCommand::Status),
        "to" => ShellInput::Edit("toAddress".into(), required(rest, "to <address>")?),
        "amount" => ShellInput::Edit("toAmount".into(), required(rest, "amount <value>")?),
        "set" => {
            let usage = "set <field> <value>";
            let (field, value) = required(rest, usage)?
                .split_once(char::is_whitespace)
                .map(|(field, value)| (field.to_string(), value.trim().to_string()))
                .ok_or_else(|| format!("usage: {usage}"))?;
            ShellInput::Edit(field, value)
        }
        "transfer" | "send" => ShellInput::SubmitTransfer,
        "form" => ShellInput::ShowForm,
        "help" | "?" => ShellInput::Help,
        "quit" | "exit" => ShellInput::Quit,
        other => return Err(format!("unknown command '{other}'; type `help`")),
    };
    Ok(input)
}

fn required(value: &str, usage: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(value.to_string())
    }
}
