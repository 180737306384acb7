//! A small recursive-descent parser turning the dashed-verb argument
//! vector clients send (e.g. `window north --focus`,
//! `space 2 --label code`, `space --create focused --focus --take`) into
//! the typed [`Request`] the server acts on.

use crate::common::config::{Layer, Rule};
use crate::dispatcher::{
    Command, ConfigVerb, DisplayCommand, DisplayVerb, RuleVerb, SignalVerb, SpaceCommand, SpaceVerb,
    ToggleFlag, WindowCommand, WindowVerb,
};
use crate::error::{ErrorKind, Result};
use crate::selector::{DisplaySelector, SpaceSelector, WindowSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Displays,
    Spaces,
    Windows,
}

#[derive(Debug, Clone)]
pub enum Request {
    Command(Command),
    Query(QueryKind),
}

/// Parses a full argument vector (domain first, the rest as the body).
pub fn parse(args: &[String]) -> Result<Request> {
    let (domain, rest) = args.split_first().ok_or(ErrorKind::EmptyCommand)?;
    match domain.as_str() {
        "window" => parse_window(rest).map(Request::Command),
        "space" => parse_space(rest).map(Request::Command),
        "display" => parse_display(rest).map(Request::Command),
        "config" => parse_config(rest).map(Request::Command),
        "rule" => parse_rule(rest).map(Request::Command),
        "signal" => parse_signal(rest).map(Request::Command),
        "query" => parse_query(rest),
        other => Err(ErrorKind::UnknownDomain(other.to_string())),
    }
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index).map(String::as_str).ok_or_else(|| ErrorKind::MissingArgument(name.to_string()))
}

fn parse_window_selector(token: &str) -> Result<WindowSelector> {
    WindowSelector::parse(token).ok_or_else(|| ErrorKind::InvalidSelector(token.to_string()))
}

fn parse_window(args: &[String]) -> Result<Command> {
    let (target, idx) = match args.first() {
        Some(first) if !first.starts_with("--") => (parse_window_selector(first)?, 1),
        _ => (WindowSelector::Focused, 0),
    };
    let verb_token = arg(args, idx, "verb")?;
    let verb = match verb_token {
        "--focus" => WindowVerb::Focus,
        "--swap" => WindowVerb::Swap(parse_window_selector(arg(args, idx + 1, "window")?)?),
        "--warp" => WindowVerb::Warp(parse_window_selector(arg(args, idx + 1, "window")?)?),
        "--space" => WindowVerb::MoveToSpace(SpaceSelector::parse(arg(args, idx + 1, "space")?)),
        "--toggle" => {
            let flag = match arg(args, idx + 1, "flag")? {
                "float" => ToggleFlag::Float,
                "sticky" => ToggleFlag::Sticky,
                "shadow" => ToggleFlag::Shadow,
                other => return Err(ErrorKind::InvalidArgument(other.to_string())),
            };
            WindowVerb::Toggle(flag)
        }
        other => return Err(ErrorKind::UnknownCommand(other.to_string())),
    };
    Ok(Command::Window(WindowCommand { target, verb }))
}

fn parse_space(args: &[String]) -> Result<Command> {
    let (target, idx) = match args.first() {
        Some(first) if !first.starts_with("--") => (SpaceSelector::parse(first), 1),
        _ => (SpaceSelector::Focused, 0),
    };
    let verb_token = arg(args, idx, "verb")?;
    let verb = match verb_token {
        "--focus" => SpaceVerb::Focus,
        "--label" => SpaceVerb::Label(arg(args, idx + 1, "label")?.to_string()),
        "--destroy" => SpaceVerb::Destroy,
        "--rebuild" => SpaceVerb::Rebuild,
        "--create" => {
            let mut cursor = idx + 1;
            let display = match args.get(cursor) {
                Some(token) if !token.starts_with("--") => {
                    cursor += 1;
                    Some(DisplaySelector::parse(token))
                }
                _ => None,
            };
            let flags = &args[cursor.min(args.len())..];
            SpaceVerb::Create {
                display,
                focus: flags.iter().any(|f| f == "--focus"),
                take: flags.iter().any(|f| f == "--take"),
            }
        }
        other => return Err(ErrorKind::UnknownCommand(other.to_string())),
    };
    Ok(Command::Space(SpaceCommand { target, verb }))
}

fn parse_display(args: &[String]) -> Result<Command> {
    let (target, idx) = match args.first() {
        Some(first) if !first.starts_with("--") => (DisplaySelector::parse(first), 1),
        _ => (DisplaySelector::Focused, 0),
    };
    let verb_token = arg(args, idx, "verb")?;
    let verb = match verb_token {
        "--focus" => DisplayVerb::Focus,
        "--label" => DisplayVerb::Label(arg(args, idx + 1, "label")?.to_string()),
        other => return Err(ErrorKind::UnknownCommand(other.to_string())),
    };
    Ok(Command::Display(DisplayCommand { target, verb }))
}

fn parse_config(args: &[String]) -> Result<Command> {
    match arg(args, 0, "verb")? {
        "get" => Ok(Command::Config(ConfigVerb::Get(arg(args, 1, "key")?.to_string()))),
        "set" => Ok(Command::Config(ConfigVerb::Set(
            arg(args, 1, "key")?.to_string(),
            arg(args, 2, "value")?.to_string(),
        ))),
        other => Err(ErrorKind::UnknownCommand(other.to_string())),
    }
}

fn parse_rule(args: &[String]) -> Result<Command> {
    match arg(args, 0, "verb")? {
        "add" => {
            let pattern = arg(args, 1, "pattern")?.to_string();
            let mut rule = Rule {
                app_name_pattern: pattern,
                target_space_label: None,
                manage_override: None,
                opacity: None,
                layer: None,
            };
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--target-space" => {
                        rule.target_space_label = Some(arg(args, i + 1, "label")?.to_string());
                        i += 2;
                    }
                    "--no-manage" => {
                        rule.manage_override = Some(false);
                        i += 1;
                    }
                    "--opacity" => {
                        let value = arg(args, i + 1, "opacity")?;
                        rule.opacity =
                            Some(value.parse().map_err(|_| ErrorKind::InvalidValue(value.to_string()))?);
                        i += 2;
                    }
                    "--layer" => {
                        rule.layer = Some(match arg(args, i + 1, "layer")? {
                            "below" => Layer::Below,
                            "normal" => Layer::Normal,
                            "above" => Layer::Above,
                            other => return Err(ErrorKind::InvalidArgument(other.to_string())),
                        });
                        i += 2;
                    }
                    other => return Err(ErrorKind::InvalidArgument(other.to_string())),
                }
            }
            Ok(Command::Rule(RuleVerb::Add(rule)))
        }
        "remove" => Ok(Command::Rule(RuleVerb::Remove(arg(args, 1, "pattern")?.to_string()))),
        other => Err(ErrorKind::UnknownCommand(other.to_string())),
    }
}

fn parse_signal(args: &[String]) -> Result<Command> {
    match arg(args, 0, "verb")? {
        "add" => Ok(Command::Signal(SignalVerb::Add {
            event: arg(args, 1, "event")?.to_string(),
            action: arg(args, 2, "action")?.to_string(),
        })),
        "remove" => Ok(Command::Signal(SignalVerb::Remove { event: arg(args, 1, "event")?.to_string() })),
        other => Err(ErrorKind::UnknownCommand(other.to_string())),
    }
}

fn parse_query(args: &[String]) -> Result<Request> {
    match arg(args, 0, "query")? {
        "--displays" => Ok(Request::Query(QueryKind::Displays)),
        "--spaces" => Ok(Request::Query(QueryKind::Spaces)),
        "--windows" => Ok(Request::Query(QueryKind::Windows)),
        other => Err(ErrorKind::InvalidArgument(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> { s.split_whitespace().map(String::from).collect() }

    #[test]
    fn window_swap_defaults_target_to_focused() {
        let req = parse(&args("window --swap 200")).unwrap();
        let Request::Command(Command::Window(cmd)) = req else { panic!("expected window command") };
        assert_eq!(cmd.target, WindowSelector::Focused);
        assert!(matches!(cmd.verb, WindowVerb::Swap(WindowSelector::Id(crate::model::ids::WindowId(200)))));
    }

    #[test]
    fn window_directional_focus_parses_target_then_verb() {
        let req = parse(&args("window north --focus")).unwrap();
        let Request::Command(Command::Window(cmd)) = req else { panic!("expected window command") };
        assert_eq!(cmd.target, WindowSelector::North);
        assert!(matches!(cmd.verb, WindowVerb::Focus));
    }

    #[test]
    fn space_create_with_flags_in_any_order() {
        let req = parse(&args("space --create focused --focus --take")).unwrap();
        let Request::Command(Command::Space(cmd)) = req else { panic!("expected space command") };
        let SpaceVerb::Create { display, focus, take } = cmd.verb else { panic!("expected create") };
        assert_eq!(display, Some(DisplaySelector::Focused));
        assert!(focus && take);
    }

    #[test]
    fn space_label_sets_numeric_index_target() {
        let req = parse(&args("space 2 --label code")).unwrap();
        let Request::Command(Command::Space(cmd)) = req else { panic!("expected space command") };
        assert_eq!(cmd.target, SpaceSelector::Index(2));
        assert!(matches!(cmd.verb, SpaceVerb::Label(ref l) if l == "code"));
    }

    #[test]
    fn query_parses_flag() {
        let req = parse(&args("query --windows")).unwrap();
        assert!(matches!(req, Request::Query(QueryKind::Windows)));
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(matches!(parse(&[]), Err(ErrorKind::EmptyCommand)));
    }

    #[test]
    fn unknown_domain_is_an_error() {
        let err = parse(&args("gizmo --focus")).unwrap_err();
        assert_eq!(err, ErrorKind::UnknownDomain("gizmo".to_string()));
    }
}
