//! Slash commands for the REPL
//!
//! Anything that does not start with `/` is a question.

use crate::config::ProviderKind;
use crate::rag::SearchLimits;

/// REPL command types
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Exit,
    Clear,
    /// Toggle, or set when an argument is given
    Debug { enable: Option<bool> },
    Limits(SearchLimits),
    MinScore(f32),
    Provider(ProviderKind),
    Sources,
    /// Known command with bad arguments
    Invalid { usage: &'static str },
    Unknown { input: String },
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

fn parse_switch(arg: &str) -> Option<bool> {
    match arg.to_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let unknown = || Command::Unknown {
        input: trimmed.to_string(),
    };

    let Some(body) = trimmed.strip_prefix('/') else {
        return unknown();
    };
    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return unknown();
    };
    let args = &parts[1..];

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        "clear" | "cls" => Command::Clear,
        "debug" => match args.first() {
            None => Command::Debug { enable: None },
            Some(arg) => match parse_switch(arg) {
                Some(enable) => Command::Debug {
                    enable: Some(enable),
                },
                None => Command::Invalid {
                    usage: "/debug [on|off]",
                },
            },
        },
        "limits" => {
            let numbers: Vec<usize> = args.iter().filter_map(|a| a.parse().ok()).collect();
            if args.len() == 3 && numbers.len() == 3 {
                Command::Limits(SearchLimits {
                    rules: numbers[0],
                    cards: numbers[1],
                    rulings: numbers[2],
                })
            } else {
                Command::Invalid {
                    usage: "/limits RULES CARDS RULINGS",
                }
            }
        }
        "minscore" => match args.first().and_then(|a| a.parse::<f32>().ok()) {
            Some(score) if (0.0..=1.0).contains(&score) => Command::MinScore(score),
            _ => Command::Invalid {
                usage: "/minscore SCORE (0.0 - 1.0)",
            },
        },
        "provider" => match args.first().map(|a| a.to_lowercase()) {
            Some(p) if p == "openai" => Command::Provider(ProviderKind::OpenAi),
            Some(p) if p == "anthropic" => Command::Provider(ProviderKind::Anthropic),
            _ => Command::Invalid {
                usage: "/provider openai|anthropic",
            },
        },
        "sources" => Command::Sources,
        _ => unknown(),
    }
}

/// Lines for `/help`
pub const HELP: &[(&str, &str)] = &[
    ("/help, /h", "Show this help message"),
    ("/limits R C U", "Results per collection: rules, cards, rulings"),
    ("/minscore F", "Minimum similarity score (0.0 - 1.0)"),
    ("/provider NAME", "Switch language model: openai or anthropic"),
    ("/debug [on|off]", "Toggle showing the retrieved context"),
    ("/sources", "Show source counts of the last answer"),
    ("/clear, /cls", "Clear screen"),
    ("/exit, /quit, /q", "Exit REPL"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command("/help"));
        assert!(is_command("  /exit"));
        assert!(!is_command("How does trample work?"));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("/QUIT"), Command::Exit);
        assert_eq!(parse("/q"), Command::Exit);
        assert_eq!(parse("/cls"), Command::Clear);
        assert_eq!(parse("/sources"), Command::Sources);
    }

    #[test]
    fn test_debug_switch() {
        assert_eq!(parse("/debug"), Command::Debug { enable: None });
        assert_eq!(parse("/debug on"), Command::Debug { enable: Some(true) });
        assert_eq!(parse("/debug 0"), Command::Debug { enable: Some(false) });
        assert!(matches!(parse("/debug maybe"), Command::Invalid { .. }));
    }

    #[test]
    fn test_limits() {
        assert_eq!(
            parse("/limits 5 0 2"),
            Command::Limits(SearchLimits {
                rules: 5,
                cards: 0,
                rulings: 2
            })
        );
        assert!(matches!(parse("/limits 5 2"), Command::Invalid { .. }));
        assert!(matches!(parse("/limits a b c"), Command::Invalid { .. }));
    }

    #[test]
    fn test_min_score_range() {
        assert_eq!(parse("/minscore 0.6"), Command::MinScore(0.6));
        assert!(matches!(parse("/minscore 1.5"), Command::Invalid { .. }));
        assert!(matches!(parse("/minscore"), Command::Invalid { .. }));
    }

    #[test]
    fn test_provider() {
        assert_eq!(
            parse("/provider Anthropic"),
            Command::Provider(ProviderKind::Anthropic)
        );
        assert_eq!(parse("/provider openai"), Command::Provider(ProviderKind::OpenAi));
        assert!(matches!(parse("/provider ollama"), Command::Invalid { .. }));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            parse("/frobnicate"),
            Command::Unknown {
                input: "/frobnicate".to_string()
            }
        );
        assert!(matches!(parse("/"), Command::Unknown { .. }));
    }
}
