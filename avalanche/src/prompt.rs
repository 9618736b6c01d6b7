use std::io::{self, stdout};

use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use dialoguer::{theme::ColorfulTheme, Select};

/// Asks before a destructive operation.
/// Always true with "skip_prompt".
pub fn confirm(skip_prompt: bool, action: &str) -> io::Result<bool> {
    if skip_prompt {
        return Ok(true);
    }
    let options = &[
        format!("No, I am not ready to {}.", action),
        format!("Yes, let's {}.", action),
    ];
    let selected = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select your option")
        .items(&options[..])
        .default(0)
        .interact()?;
    Ok(selected == 1)
}

pub fn print_title(msg: &str) -> io::Result<()> {
    execute!(
        stdout(),
        SetForegroundColor(Color::Blue),
        Print(format!("\n{}\n", msg)),
        ResetColor
    )
}

pub fn print_success(msg: &str) -> io::Result<()> {
    execute!(
        stdout(),
        SetForegroundColor(Color::Green),
        Print(format!("\n{}\n", msg)),
        ResetColor
    )
}

pub fn print_warning(msg: &str) -> io::Result<()> {
    execute!(
        stdout(),
        SetForegroundColor(Color::Yellow),
        Print(format!("\n{}\n", msg)),
        ResetColor
    )
}
