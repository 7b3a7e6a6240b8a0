use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use std::path::PathBuf;

/// Output directory used when `--output` is not given.
pub const DEFAULT_OUTPUT_DIR: &str = "json-converted";

pub struct Config {
    /// Repository root, or the clone destination when `git_url` is set.
    pub directory: PathBuf,
    pub output_dir: PathBuf,
    /// Credit line; defaults to `Downloaded from {git_url}` when cloning.
    pub credit: Option<String>,
    /// Elements removed from passages, e.g. `tei:note`.
    pub exclude_nodes: Vec<String>,
    pub verbosity: u8,
    pub silent: bool,
    #[cfg(feature = "git")]
    pub git_url: Option<String>,
    #[cfg(feature = "git")]
    pub git_branch: Option<String>,
}

impl Config {
    /// A configuration converting `directory` with every option at its default.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            credit: None,
            exclude_nodes: Vec::new(),
            verbosity: 0,
            silent: false,
            #[cfg(feature = "git")]
            git_url: None,
            #[cfg(feature = "git")]
            git_branch: None,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.silent {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let mut config = Self::new(
            matches
                .get_one::<String>("directory")
                .map(PathBuf::from)
                .unwrap_or_default(),
        );

        if let Some(output) = matches.get_one::<String>("output") {
            config.output_dir = PathBuf::from(output);
        }
        config.credit = matches.get_one::<String>("credit").cloned();
        config.exclude_nodes = matches
            .get_many::<String>("exclude_nodes")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();
        config.verbosity = matches.get_count("verbose");
        config.silent = matches.get_flag("silent");

        #[cfg(feature = "git")]
        {
            config.git_url = matches.get_one::<String>("git").cloned();
            config.git_branch = matches.get_one::<String>("branch").cloned();
        }

        config
    }
}

pub fn command() -> Command {
    let command = Command::new("cts2json")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Converts CapiTainS-based repositories into CLTK JSON corpora")
        .arg(
            Arg::new("directory")
                .value_name("DIRECTORY")
                .help("Repository to convert, or destination directory for cloning")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Directory receiving the JSON files [default: json-converted]")
                .num_args(1),
        )
        .arg(
            Arg::new("credit")
                .long("credit")
                .value_name("TEXT")
                .help("Credit line to use in the JSON files")
                .num_args(1),
        )
        .arg(
            Arg::new("exclude_nodes")
                .long("exclude-nodes")
                .value_name("NODE")
                .help("Nodes to exclude from passages with \"tei:\" prefix, e.g. --exclude-nodes tei:note tei:orig")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("silent")
                .long("silent")
                .help("Show only errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase logging verbosity (-v debug, -vv trace)")
                .action(ArgAction::Count),
        );

    #[cfg(feature = "git")]
    let command = command
        .arg(
            Arg::new("git")
                .long("git")
                .value_name("URL")
                .help("Address of a repository to clone into DIRECTORY")
                .num_args(1),
        )
        .arg(
            Arg::new("branch")
                .long("branch")
                .value_name("BRANCH")
                .help("Branch to check out after cloning")
                .requires("git")
                .num_args(1),
        );

    command
}

pub fn parse_args() -> Result<Config> {
    let matches = command().get_matches();
    Ok(Config::from_matches(&matches))
}
