use clap::{Parser, Subcommand};
use colored::*;
use svcguard_core::{
    ControlSession, ObservedStatus, RemediationController, ServiceControl, ServiceObserver,
    ServiceSpec, ServiceState, StartPhase, SystemdControl, VERSION,
};

#[derive(Parser)]
#[command(name = "svcguard")]
#[command(author = "svcguard Team")]
#[command(version = VERSION)]
#[command(about = "Service watchdog - CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current status of services
    Query {
        /// Unit names, e.g. cups.service
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Continuous status display (updates every 2 seconds)
    Watch {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Start a stopped service and confirm it is running
    Start { name: String },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Query { names }) => {
            println!("{}", "=== svcguard Query ===".green().bold());
            show_status(&names);
        }
        Some(Commands::Watch { names }) => {
            println!("{}", "=== svcguard Watch Mode ===".green().bold());
            println!("Press Ctrl+C to exit...\n");
            watch_mode(&names);
        }
        Some(Commands::Start { name }) => {
            println!("{}", "=== svcguard Start ===".yellow().bold());
            start(&name);
        }
        Some(Commands::Version) => {
            println!("svcguard v{}", VERSION);
            println!("Service state reconciliation and remediation");
        }
        None => {
            println!("svcguard v{} - run with --help for commands", VERSION);
        }
    }
}

fn connect() -> Box<dyn ControlSession> {
    match SystemdControl::new().connect() {
        Ok(session) => session,
        Err(e) => {
            println!("{}", format!("❌ {}", e).red());
            std::process::exit(1);
        }
    }
}

fn colored_status(observed: &ObservedStatus) -> ColoredString {
    let text = observed.status.to_string();
    match observed.status {
        ServiceState::Running => text.green(),
        ServiceState::Stopped => text.yellow(),
        ServiceState::NotFound | ServiceState::Unknown => text.red(),
        ServiceState::Other(_) => text.cyan(),
    }
}

fn show_status(names: &[String]) {
    let session = connect();
    let observer = ServiceObserver::new();

    println!();
    for name in names {
        let observed = observer.observe(session.as_ref(), &ServiceSpec::new(name));
        if observed.has_error() {
            println!("  {:<32} {}  ({})", name, colored_status(&observed), observed.error);
        } else {
            println!("  {:<32} {}", name, colored_status(&observed));
        }
    }
    println!();
}

fn watch_mode(names: &[String]) {
    loop {
        // Clear screen
        print!("\x1B[2J\x1B[1;1H");

        show_status(names);

        std::thread::sleep(std::time::Duration::from_secs(2));
    }
}

fn start(name: &str) {
    let session = connect();
    let spec = ServiceSpec::new(name).expecting("running").auto_start();
    let observed = ServiceObserver::new().observe(session.as_ref(), &spec);

    if !spec.authorizes_start(observed.status) {
        println!(
            "{}",
            format!("⚠️  {} is '{}', nothing to start", name, observed.status).yellow()
        );
        return;
    }

    let controller = RemediationController::new();
    println!(
        "Starting {} (confirming after {})...",
        name,
        humantime::format_duration(controller.confirm_delay())
    );

    let (after, outcome) = controller.remediate(session.as_ref(), &spec, &observed);
    match outcome.phase {
        StartPhase::Confirmed => {
            println!("{}", format!("✅ {} is now running", name).green());
        }
        StartPhase::Unconfirmed => {
            println!(
                "{}",
                format!("⚠️  {} started but reports '{}'", name, after.status).yellow()
            );
        }
        StartPhase::Failed | StartPhase::Starting => {
            println!("{}", format!("❌ Failed to start {}: {}", name, after.error).red());
            std::process::exit(1);
        }
    }
}
