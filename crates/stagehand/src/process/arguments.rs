//! Splits process-level configuration flags off the argument vector.
//!
//! Configuration flags (listed in `CONFIG_CLI_FLAGS`) must appear before any
//! controller flag. Anything after the first non-configuration token belongs
//! to the controller, even if it looks like a configuration flag.

use std::ffi::{OsStr, OsString};

use stagehand_config::CONFIG_CLI_FLAGS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

/// Argument vector split into loader and controller parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = match argument_text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*argument_text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered = vec![program.clone()];
    let mut index = 1usize;
    let mut pending_value = false;

    while let Some(argument) = args.get(index) {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            index += 1;
            continue;
        }
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                pending_value = needs_value;
                index += 1;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start: index,
    }
}

/// Program name followed by the controller's part of the vector.
pub(crate) fn controller_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<String> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start.max(1)))
        .map(|argument| argument.to_string_lossy().into_owned())
        .collect()
}
