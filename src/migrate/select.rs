//! Interactive choice of the target partition

use anyhow::Result;

use crate::device::Partition;
use crate::ui::{Level, emit};

/// Line-based user input.
pub trait Prompt {
    fn input(&self, message: &str) -> Result<String>;
}

pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn input(&self, message: &str) -> Result<String> {
        Ok(dialoguer::Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?)
    }
}

/// Resolve an answer given either as the 1-based number of a listed target
/// or as its device path.
pub fn resolve_selection<'a>(answer: &str, eligible: &'a [Partition]) -> Option<&'a Partition> {
    let answer = answer.trim();
    if let Ok(number) = answer.parse::<usize>() {
        return number.checked_sub(1).and_then(|index| eligible.get(index));
    }
    eligible.iter().find(|p| *p == answer)
}

/// Ask until the answer names one of `eligible`.
pub fn choose_target<'a>(prompt: &dyn Prompt, eligible: &'a [Partition]) -> Result<&'a Partition> {
    loop {
        let answer = prompt.input("Enter partition name or number")?;
        match resolve_selection(&answer, eligible) {
            Some(partition) => return Ok(partition),
            None => emit(
                Level::Warn,
                "migrate.select.invalid",
                &format!("Partition {} does not exist", answer.trim()),
                None,
            ),
        }
    }
}

pub fn confirmed(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y" | "j" | "J")
}
