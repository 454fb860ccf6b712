use std::env as stdenv;

/// Prompt shown before every line.
pub const DEFAULT_PROMPT: &str = "sh> ";
/// Largest number of stages in one pipeline.
pub const MAX_PIPES: usize = 10;
/// Size of an argument vector including its terminating slot.
pub const MAX_ARGS: usize = 64;
/// Number of lines kept by the history buffer.
pub const HISTORY_SIZE: usize = 100;

/// Tunables of the interpreter.
///
/// Values come from [`Default`] and can be overridden through the process
/// environment:
/// - `PIPESH_PROMPT`: the prompt string.
/// - `PIPESH_MAX_PIPES`: pipeline stage limit.
/// - `PIPESH_MAX_ARGS`: argument vector size (words per command is one less).
/// - `PIPESH_HISTORY_SIZE`: history capacity.
///
/// Numeric values that fail to parse, or are zero, leave the default in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    pub max_pipes: usize,
    pub max_args: usize,
    pub history_capacity: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_pipes: MAX_PIPES,
            max_args: MAX_ARGS,
            history_capacity: HISTORY_SIZE,
        }
    }
}

impl ShellConfig {
    /// Build the configuration from the current process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| stdenv::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(prompt) = lookup("PIPESH_PROMPT") {
            config.prompt = prompt;
        }
        let number = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
        };
        if let Some(n) = number("PIPESH_MAX_PIPES") {
            config.max_pipes = n;
        }
        // One slot is the terminator, so anything below 2 leaves no room for a program name.
        if let Some(n) = number("PIPESH_MAX_ARGS").filter(|n| *n >= 2) {
            config.max_args = n;
        }
        if let Some(n) = number("PIPESH_HISTORY_SIZE") {
            config.history_capacity = n;
        }
        config
    }
}
