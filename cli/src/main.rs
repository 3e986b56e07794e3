//! Px CLI - Configure and control the Px proxy agent
//!
//! Resolves settings from `px.ini`, `PX_` environment variables and the
//! flags below, then runs the requested action or starts Px.

mod commands;

use clap::{Args, Parser};
use px_core::config::sources;
use px_core::{HostContext, LogLocation};

#[derive(Parser, Debug)]
#[command(name = "px")]
#[command(
    author,
    version,
    about = "An HTTP(s) proxy agent that authenticates through an upstream proxy"
)]
struct Cli {
    /// Config file to use instead of px.ini
    #[arg(long, require_equals = true, value_name = "PATH")]
    config: Option<String>,

    /// Save resolved settings to the config file and exit
    #[arg(long)]
    save: bool,

    /// Store the upstream proxy password for `username`
    #[arg(long)]
    password: bool,

    /// Start Px when the user logs in
    #[arg(long)]
    install: bool,

    /// Stop starting Px at login
    #[arg(long)]
    uninstall: bool,

    /// Stop all running Px instances
    #[arg(long)]
    quit: bool,

    /// Stop running instances, then start
    #[arg(long)]
    restart: bool,

    /// Log to debug-<name>.log next to the executable
    #[arg(long)]
    debug: bool,

    /// Log to a uniquely named file in the working directory
    #[arg(long)]
    uniqlog: bool,

    /// Log to stdout, implies --foreground unless --debug or --uniqlog is given
    #[arg(long)]
    verbose: bool,

    #[command(flatten)]
    settings: SettingArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    Restart,
    Save,
    Password,
}

/// One optional flag per configuration key. A bare flag means `1`.
#[derive(Args, Debug)]
struct SettingArgs {
    /// Upstream proxy servers, comma separated host:port
    #[arg(long, alias = "proxy", require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    server: Option<String>,

    /// PAC file URL or path
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    pac: Option<String>,

    /// PAC file encoding
    #[arg(long = "pac_encoding", require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    pac_encoding: Option<String>,

    /// Port to listen on
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    port: Option<String>,

    /// Interfaces to listen on, comma separated
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    listen: Option<String>,

    /// Allow remote clients
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    gateway: Option<String>,

    /// Only allow clients on this host
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    hostonly: Option<String>,

    /// Client IPs allowed in gateway mode
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    allow: Option<String>,

    /// Hosts to connect to directly
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    noproxy: Option<String>,

    /// Override the client User-Agent
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    useragent: Option<String>,

    /// Upstream username, domain\username
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    username: Option<String>,

    /// Upstream authentication scheme
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    auth: Option<String>,

    /// Worker processes
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    workers: Option<String>,

    /// Threads per worker
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    threads: Option<String>,

    /// Idle timeout in seconds
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    idle: Option<String>,

    /// Socket timeout in seconds
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    socktimeout: Option<String>,

    /// Seconds between OS proxy refreshes
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    proxyreload: Option<String>,

    /// Stay attached to the console
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    foreground: Option<String>,

    /// Log location: 0 none, 1 install dir, 2 working dir, 3 unique file, 4 stdout
    #[arg(long, require_equals = true, num_args = 0..=1, default_missing_value = "1")]
    log: Option<String>,
}

impl SettingArgs {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let fields = [
            ("server", &self.server),
            ("pac", &self.pac),
            ("pac_encoding", &self.pac_encoding),
            ("port", &self.port),
            ("listen", &self.listen),
            ("gateway", &self.gateway),
            ("hostonly", &self.hostonly),
            ("allow", &self.allow),
            ("noproxy", &self.noproxy),
            ("useragent", &self.useragent),
            ("username", &self.username),
            ("auth", &self.auth),
            ("workers", &self.workers),
            ("threads", &self.threads),
            ("idle", &self.idle),
            ("socktimeout", &self.socktimeout),
            ("proxyreload", &self.proxyreload),
            ("foreground", &self.foreground),
            ("log", &self.log),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
            .collect()
    }
}

impl Cli {
    /// Normalized flag pairs handed to the resolver.
    fn flags(&self) -> sources::Pairs {
        let mut pairs = self.settings.pairs();
        if let Some(config) = &self.config {
            pairs.push(("config", config.clone()));
        }
        if self.save {
            pairs.push(("save", "1".to_string()));
        }
        if self.log_override() == Some(LogLocation::Stdout) && self.settings.foreground.is_none() {
            pairs.push(("foreground", "1".to_string()));
        }
        sources::normalize_flags(pairs)
    }

    /// Log location forced by `--debug`, `--uniqlog` or `--verbose`, in
    /// that order.
    fn log_override(&self) -> Option<LogLocation> {
        if self.debug {
            Some(LogLocation::InstallDir)
        } else if self.uniqlog {
            Some(LogLocation::UniqueFile)
        } else if self.verbose {
            Some(LogLocation::Stdout)
        } else {
            None
        }
    }

    /// The one action run before startup, by priority.
    fn action(&self) -> Option<Action> {
        if self.quit {
            Some(Action::Quit)
        } else if self.restart {
            Some(Action::Restart)
        } else if self.save {
            Some(Action::Save)
        } else if self.password {
            Some(Action::Password)
        } else {
            None
        }
    }

    fn process_name(&self) -> &'static str {
        if self.quit {
            "quit"
        } else {
            "main"
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let host = HostContext::current()?.with_process_name(cli.process_name());
    let mut inputs = px_core::ConfigInputs::from_process(cli.flags(), host);
    inputs.log_override = cli.log_override();

    let resolution = px_core::resolve(&inputs)?;
    for warning in &resolution.warnings {
        eprintln!("{}", warning);
    }

    if cli.install {
        commands::service::install(&cli.settings.pairs())?;
    } else if cli.uninstall {
        commands::service::uninstall()?;
    }

    match cli.action() {
        Some(Action::Quit) => {
            let quiet = commands::quit::run()?;
            std::process::exit(if quiet { 0 } else { 1 });
        }
        Some(Action::Restart) => {
            if !commands::quit::run()? {
                anyhow::bail!("Px instances are still running");
            }
        }
        Some(Action::Save) => return commands::save::run(&resolution),
        Some(Action::Password) => return commands::password::run(&resolution),
        None => {}
    }

    commands::start::run(resolution)
}
