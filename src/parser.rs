use crate::config::ShellConfig;
use crate::error::ParseError;
use tracing::trace;

const PIPE: char = '|';
const AND: &str = "&&";
const APPEND: &str = ">>";
const OUTPUT: char = '>';
const INPUT: char = '<';

/// Kind of redirection
///
/// Defines the specific operation mode for an I/O redirection (`<`, `>`, `>>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Input redirection (`<`): Reads standard input from a specified file.
    Input,
    /// Output redirection (`>`): Writes standard output to a file, **overwriting** the file if it exists.
    Output,
    /// Output redirection with append (`>>`): Writes standard output to a file, **appending** to the file if it exists.
    Append,
}

/// A single redirection attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: String,
}

/// The shape of one statement after operator splitting.
///
/// Only one operator governs a statement. Commands are kept as text: they are
/// split into words when their process is about to be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// Nothing but whitespace.
    Empty,
    /// A **pipeline** of commands connected by the pipe operator (`|`), in execution order.
    Pipeline(Vec<String>),
    /// Two statements joined by `&&`. The right one runs only if the left one
    /// was not interrupted.
    And { left: String, right: String },
    /// A command with one redirection.
    Redirect {
        command: String,
        redirect: Redirection,
    },
    /// A plain command.
    Command(String),
}

/// Decide which operator governs `statement` and split it accordingly.
///
/// Priority: `|`, then `&&`, then `>>`, `>`, `<`, and finally a plain command.
/// A `|` split that leaves a single non-empty part continues with that part.
pub fn parse_statement(statement: &str, config: &ShellConfig) -> Result<AstNode, ParseError> {
    let mut statement = statement.trim();
    if statement.is_empty() {
        return Ok(AstNode::Empty);
    }

    if statement.contains(PIPE) {
        let mut stages: Vec<&str> = statement
            .split(PIPE)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        match stages.len() {
            0 => return Err(ParseError::EmptyCommand),
            1 => statement = stages.remove(0),
            n if n > config.max_pipes => return Err(ParseError::TooManyStages(config.max_pipes)),
            n => {
                trace!(stages = n, "pipeline");
                return Ok(AstNode::Pipeline(
                    stages.into_iter().map(str::to_owned).collect(),
                ));
            }
        }
    }

    if let Some((left, right)) = statement.split_once(AND) {
        trace!(left, right, "conditional");
        return Ok(AstNode::And {
            left: left.trim().to_owned(),
            right: right.trim().to_owned(),
        });
    }

    let split = if let Some(parts) = statement.split_once(APPEND) {
        Some((parts, RedirectKind::Append))
    } else if let Some(parts) = statement.split_once(OUTPUT) {
        Some((parts, RedirectKind::Output))
    } else {
        statement
            .split_once(INPUT)
            .map(|parts| (parts, RedirectKind::Input))
    };

    match split {
        Some(((command, target), kind)) => parse_redirect(command, target, kind),
        None => Ok(AstNode::Command(statement.to_owned())),
    }
}

fn parse_redirect(command: &str, target: &str, kind: RedirectKind) -> Result<AstNode, ParseError> {
    let command = command.trim();
    let target = target.trim();
    if command.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    if target.is_empty() {
        return Err(ParseError::MissingTarget);
    }
    trace!(command, target, ?kind, "redirect");
    Ok(AstNode::Redirect {
        command: command.to_owned(),
        redirect: Redirection {
            kind,
            target: target.to_owned(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(statement: &str) -> Result<AstNode, ParseError> {
        parse_statement(statement, &ShellConfig::default())
    }

    fn redirect(command: &str, kind: RedirectKind, target: &str) -> AstNode {
        AstNode::Redirect {
            command: command.to_string(),
            redirect: Redirection {
                kind,
                target: target.to_string(),
            },
        }
    }

    #[test]
    fn test_plain_command() {
        assert_eq!(
            parse("  ls -l  ").unwrap(),
            AstNode::Command("ls -l".to_string())
        );
        assert_eq!(parse(" \t ").unwrap(), AstNode::Empty);
    }

    #[test]
    fn test_pipeline_stages_trimmed() {
        assert_eq!(
            parse("printf hi |tr a-z A-Z|  wc -c ").unwrap(),
            AstNode::Pipeline(vec![
                "printf hi".to_string(),
                "tr a-z A-Z".to_string(),
                "wc -c".to_string()
            ])
        );
    }

    #[test]
    fn test_single_part_pipe_falls_through() {
        assert_eq!(parse("ls |").unwrap(), AstNode::Command("ls".to_string()));
        assert_eq!(
            parse("| echo hi > out").unwrap(),
            redirect("echo hi", RedirectKind::Output, "out")
        );
        assert_eq!(parse(" | | "), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn test_pipe_takes_priority_over_other_operators() {
        assert_eq!(
            parse("echo a && echo b | cat").unwrap(),
            AstNode::Pipeline(vec!["echo a && echo b".to_string(), "cat".to_string()])
        );
    }

    #[test]
    fn test_too_many_stages() {
        let config = ShellConfig {
            max_pipes: 2,
            ..ShellConfig::default()
        };
        assert!(matches!(
            parse_statement("a | b", &config),
            Ok(AstNode::Pipeline(_))
        ));
        assert_eq!(
            parse_statement("a | b | c", &config),
            Err(ParseError::TooManyStages(2))
        );
    }

    #[test]
    fn test_and_splits_at_first_occurrence() {
        assert_eq!(
            parse("false && echo X && echo Y").unwrap(),
            AstNode::And {
                left: "false".to_string(),
                right: "echo X && echo Y".to_string()
            }
        );
    }

    #[test]
    fn test_and_before_redirection() {
        assert_eq!(
            parse("echo a > f && cat < f").unwrap(),
            AstNode::And {
                left: "echo a > f".to_string(),
                right: "cat < f".to_string()
            }
        );
    }

    #[test]
    fn test_append_before_truncate() {
        assert_eq!(
            parse("echo a >> out.txt").unwrap(),
            redirect("echo a", RedirectKind::Append, "out.txt")
        );
        assert_eq!(
            parse("echo a > out.txt").unwrap(),
            redirect("echo a", RedirectKind::Output, "out.txt")
        );
    }

    #[test]
    fn test_input_redirect() {
        assert_eq!(
            parse("cat <  in.txt ").unwrap(),
            redirect("cat", RedirectKind::Input, "in.txt")
        );
    }

    #[test]
    fn test_output_wins_over_input() {
        assert_eq!(
            parse("sort < in > out").unwrap(),
            redirect("sort < in", RedirectKind::Output, "out")
        );
    }

    #[test]
    fn test_redirect_errors() {
        assert_eq!(parse("> out"), Err(ParseError::EmptyCommand));
        assert_eq!(parse("echo hi >>  "), Err(ParseError::MissingTarget));
        assert_eq!(parse("cat <"), Err(ParseError::MissingTarget));
    }
}
