//! `.env` file support for the binary.
//!
//! Lines are `KEY=value`, optionally prefixed with `export`. Values may be bare (a `#`
//! starts a comment), single-quoted (literal) or double-quoted (with `\n`, `\t`, `\r`,
//! `\\` and `\"` escapes). Variables already present in the process environment win.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvFileError {
    #[error("`--env-file` provided more than once")]
    DuplicateFlag,
    #[error("`--env-file` requires a path argument")]
    MissingPath,
    #[error("unrecognised argument: {0}")]
    UnknownArgument(String),
    #[error("argument contains invalid UTF-8")]
    InvalidArgument,
    #[error("env file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("{path}:{line}: {message}")]
    Syntax { path: PathBuf, line: usize, message: String },
}

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    /// Named on the command line rather than found in the working directory.
    pub explicit: bool,
}

/// Pick the env file from `--env-file PATH` / `--env-file=PATH`, else `./.env`, and load it.
pub fn configure_from_args<I>(args: I) -> Result<Option<LoadedEnvFile>, EnvFileError>
where
    I: IntoIterator<Item = std::ffi::OsString>,
{
    let explicit = env_file_argument(args)?;
    let (path, explicit) = match explicit {
        Some(path) if !path.is_file() => return Err(EnvFileError::NotFound(path)),
        Some(path) => (path, true),
        None => {
            let cwd = std::env::current_dir().map_err(|e| EnvFileError::Io {
                path: PathBuf::from("."),
                message: e.to_string(),
            })?;
            let candidate = cwd.join(".env");
            if !candidate.is_file() {
                return Ok(None);
            }
            (candidate, false)
        }
    };

    for (key, value) in parse_file(&path)? {
        if std::env::var_os(&key).is_none() {
            // SAFETY: called from `main` before any other thread is spawned.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(Some(LoadedEnvFile { path, explicit }))
}

fn env_file_argument<I>(args: I) -> Result<Option<PathBuf>, EnvFileError>
where
    I: IntoIterator<Item = std::ffi::OsString>,
{
    let mut args = args.into_iter();
    let mut found: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let arg = arg.into_string().map_err(|_| EnvFileError::InvalidArgument)?;
        let path = if arg == "--env-file" {
            args.next().map(PathBuf::from).ok_or(EnvFileError::MissingPath)?
        } else if let Some(inline) = arg.strip_prefix("--env-file=") {
            if inline.is_empty() {
                return Err(EnvFileError::MissingPath);
            }
            PathBuf::from(inline)
        } else if arg == "--" {
            break;
        } else {
            return Err(EnvFileError::UnknownArgument(arg));
        };
        if found.replace(path).is_some() {
            return Err(EnvFileError::DuplicateFlag);
        }
    }
    Ok(found)
}

pub fn parse_file(path: &Path) -> Result<Vec<(String, String)>, EnvFileError> {
    let text = fs::read_to_string(path).map_err(|e| EnvFileError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            parse_line(line)
                .map_err(|message| EnvFileError::Syntax {
                    path: path.to_path_buf(),
                    line: index + 1,
                    message,
                })
                .transpose()
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map_or(line, str::trim_start);

    let (key, raw_value) = line.split_once('=').ok_or("missing '=' in assignment")?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.contains(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {key}"));
    }
    Ok(Some((key.to_string(), parse_value(raw_value.trim())?)))
}

fn parse_value(raw: &str) -> Result<String, String> {
    let mut chars = raw.chars();
    match chars.next() {
        None => Ok(String::new()),
        Some('"') => quoted(chars.as_str(), '"', true),
        Some('\'') => quoted(chars.as_str(), '\'', false),
        Some(_) => Ok(raw.split('#').next().unwrap_or_default().trim_end().to_string()),
    }
}

/// Read up to the closing `quote`; only a comment may follow it.
fn quoted(body: &str, quote: char, escapes: bool) -> Result<String, String> {
    let mut out = String::new();
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if escapes => {
                let escaped = chars.next().ok_or("unterminated escape sequence")?;
                out.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => {
                let rest = chars.as_str().trim();
                return if rest.is_empty() || rest.starts_with('#') {
                    Ok(out)
                } else {
                    Err(format!("unexpected characters after closing {quote}"))
                };
            }
            c => out.push(c),
        }
    }
    Err(format!("unterminated {quote}-quoted value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_assignments() {
        assert_eq!(parse_line("  # comment"), Ok(None));
        assert_eq!(
            parse_line("export HIVE_USERNAME=me@example.com # inline"),
            Ok(Some(("HIVE_USERNAME".into(), "me@example.com".into())))
        );
        assert_eq!(
            parse_line(r#"HIVE_PASSWORD="a \"quoted\" #secret""#),
            Ok(Some(("HIVE_PASSWORD".into(), r#"a "quoted" #secret"#.into())))
        );
        assert_eq!(
            parse_line(r"RAW='no \n escapes'"),
            Ok(Some(("RAW".into(), r"no \n escapes".into())))
        );
        assert_eq!(parse_line("EMPTY="), Ok(Some(("EMPTY".into(), String::new()))));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line("NOEQUALS").is_err());
        assert!(parse_line("=value").is_err());
        assert!(parse_line("BAD KEY=1").is_err());
        assert!(parse_line(r#"OPEN="unterminated"#).is_err());
        assert!(parse_line(r#"TAIL="x" y"#).is_err());
    }

    #[test]
    fn reads_env_file_flag() {
        assert_eq!(env_file_argument(args(&[])), Ok(None));
        assert_eq!(
            env_file_argument(args(&["--env-file", "prod.env"])),
            Ok(Some(PathBuf::from("prod.env")))
        );
        assert_eq!(
            env_file_argument(args(&["--env-file=dev.env", "--", "ignored"])),
            Ok(Some(PathBuf::from("dev.env")))
        );
        assert_eq!(env_file_argument(args(&["--env-file"])), Err(EnvFileError::MissingPath));
        assert_eq!(
            env_file_argument(args(&["--env-file=a", "--env-file=b"])),
            Err(EnvFileError::DuplicateFlag)
        );
        assert_eq!(
            env_file_argument(args(&["--verbose"])),
            Err(EnvFileError::UnknownArgument("--verbose".into()))
        );
    }

    #[test]
    fn reports_line_numbers() {
        let dir = std::env::temp_dir().join(format!("hive-state-envfile-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("broken.env");
        fs::write(&path, "OK=1\n\nBROKEN\n").expect("write");

        match parse_file(&path) {
            Err(EnvFileError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
        fs::remove_dir_all(&dir).ok();
    }
}
