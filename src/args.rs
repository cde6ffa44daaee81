use std::error::Error;
use std::path::PathBuf;

use crate::page::SortMode;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Extract a string value for a flag
    pub fn extract_value(
        &mut self,
        flag: &str,
    ) -> Result<String, Box<dyn Error>> {
        self.iter.next().ok_or_else(|| {
            format!("Provide a value after {} for {}", flag, self.command_name)
                .into()
        })
    }

    /// Extract and parse a sort mode for --sort
    pub fn extract_sort(&mut self) -> Result<SortMode, Box<dyn Error>> {
        let raw = self.extract_value("--sort")?;
        Ok(raw.parse::<SortMode>()?)
    }

    /// Check if there are remaining arguments
    pub fn has_more(&self) -> bool {
        self.iter.len() > 0
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }

    pub fn unexpected(&self, arg: &str) -> Box<dyn Error> {
        format!("Unknown flag for {}: {arg}", self.command_name).into()
    }
}

/// Flags shared by the listing and page commands
#[derive(Default, Debug)]
pub struct CommonFlags {
    pub sort: SortMode,
    pub ascending: Option<bool>,
    pub search: Option<String>,
    pub plain: bool,
    pub edit: bool,
    pub template: Option<PathBuf>,
    pub status: Option<String>,
    pub from: Option<PathBuf>,
    pub positional: Vec<String>,
}

impl CommonFlags {
    /// Parse every flag a command may take; callers ignore what they do not use.
    pub fn parse(
        args: Vec<String>,
        command_name: &str,
    ) -> Result<Self, Box<dyn Error>> {
        let mut flags = Self::default();
        let mut parser = ArgParser::new(args, command_name);
        while let Some(arg) = parser.next() {
            match arg.as_str() {
                "--sort" => flags.sort = parser.extract_sort()?,
                "--asc" => flags.ascending = Some(true),
                "--desc" => flags.ascending = Some(false),
                "-s" | "--search" => {
                    flags.search = Some(parser.extract_value(&arg)?)
                }
                "--plain" => flags.plain = true,
                "--edit" | "-e" => flags.edit = true,
                "--template" => {
                    flags.template =
                        Some(PathBuf::from(parser.extract_value(&arg)?))
                }
                "--status" => flags.status = Some(parser.extract_value(&arg)?),
                "--from" => {
                    flags.from = Some(PathBuf::from(parser.extract_value(&arg)?))
                }
                other if other.starts_with('-') && other.len() > 1 => {
                    return Err(parser.unexpected(other));
                }
                _ => flags.positional.push(arg),
            }
        }
        Ok(flags)
    }
}

/// Pull a global `--dir <path>` out of the argument list, wherever it sits.
pub fn take_dir_flag(
    args: Vec<String>,
) -> Result<(Option<PathBuf>, Vec<String>), Box<dyn Error>> {
    let mut dir = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--dir" || arg == "-d" {
            let value =
                iter.next().ok_or("Provide a directory after --dir")?;
            dir = Some(PathBuf::from(value));
        } else if let Some(value) = arg.strip_prefix("--dir=") {
            dir = Some(PathBuf::from(value));
        } else {
            rest.push(arg);
        }
    }
    Ok((dir, rest))
}
