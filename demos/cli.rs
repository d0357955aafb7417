//! A small ipmitool-style front end over the library.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use ipmi_lan::chassis::ChassisControlAction;
use ipmi_lan::commands::PrivilegeLevel;
use ipmi_lan::conn::{ConnectionOptions, Interface};
use ipmi_lan::crypto::{AuthAlgorithm, ConfidentialityAlgorithm, IntegrityAlgorithm};
use ipmi_lan::{Client, LogOutput, Logger};

#[derive(Parser)]
#[command(name = "ipmi-cli", about = "Query a BMC over IPMI v1.5 or v2.0")]
struct Cli {
    /// BMC hostname or address.
    #[arg(short = 'H', long)]
    hostname: String,

    /// UDP port of the BMC.
    #[arg(short = 'p', long, default_value_t = 623)]
    port: u16,

    #[arg(short = 'U', long, default_value = "")]
    username: String,

    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// Session interface: lan (v1.5) or lanplus (v2.0).
    #[arg(short = 'I', long, default_value = "lanplus")]
    interface: Interface,

    /// Requested privilege level.
    #[arg(short = 'L', long, default_value = "administrator")]
    privilege: PrivilegeLevel,

    /// RAKP authentication algorithm (lanplus).
    #[arg(long, default_value = "hmac-sha1")]
    auth: AuthAlgorithm,

    /// Per-packet integrity algorithm (lanplus).
    #[arg(long, default_value = "none")]
    integrity: IntegrityAlgorithm,

    /// Payload confidentiality algorithm (lanplus).
    #[arg(long, default_value = "none")]
    confidentiality: ConfidentialityAlgorithm,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chassis power state and control.
    Chassis {
        #[command(subcommand)]
        command: ChassisCommands,
    },
    /// Sensor data repository.
    Sdr {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Sensor readings.
    Sensor {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// System event log.
    Sel {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Management controller.
    Mc {
        #[command(subcommand)]
        command: McCommands,
    },
}

#[derive(Subcommand)]
enum ChassisCommands {
    /// Print the chassis status.
    Status,
    /// Print the chassis capabilities.
    Capabilities,
    /// Change the power state: off, on, cycle, reset, diag, soft.
    Control { action: ChassisControlAction },
}

#[derive(Subcommand)]
enum ListCommand {
    List,
}

#[derive(Subcommand)]
enum McCommands {
    /// Print the device identity.
    Info,
}

fn run(cli: Cli) -> Result<(), ipmi_lan::Error> {
    let options = ConnectionOptions::new(cli.hostname)
        .port(cli.port)
        .credentials(cli.username, cli.password)
        .interface(cli.interface)
        .privilege(cli.privilege)
        .algorithms(cli.auth, cli.integrity, cli.confidentiality);

    let mut client = Client::connect(options)?;
    let output = LogOutput::StdOut;

    let result = match cli.command {
        Commands::Chassis { command } => match command {
            ChassisCommands::Status => client.chassis_status().map(|status| {
                Logger::log(&output, &status);
            }),
            ChassisCommands::Capabilities => client.chassis_capabilities().map(|caps| {
                println!("Intrusion sensor:     {}", caps.intrusion_sensor());
                println!("Front panel lockout:  {}", caps.front_panel_lockout());
                println!("Diagnostic interrupt: {}", caps.diagnostic_interrupt());
                println!("Power interlock:      {}", caps.power_interlock());
            }),
            ChassisCommands::Control { action } => client.chassis_control(action).map(|()| {
                println!("chassis control: ok");
            }),
        },
        Commands::Sdr { command: ListCommand::List } => client.list_sdr().map(|records| {
            for record in &records {
                Logger::log(&output, record);
            }
            println!("{} records", records.len());
        }),
        Commands::Sensor { command: ListCommand::List } => {
            client.list_sdr().map(|records| {
                for record in &records {
                    let Some(full) = record.full_sensor() else {
                        continue;
                    };

                    match client.read_sensor(full) {
                        Ok(value) => println!("{:<16} {value:.3}", full.id_string.text()),
                        Err(e) => println!("{:<16} {e}", full.id_string.text()),
                    }
                }
            })
        }
        Commands::Sel { command: ListCommand::List } => client.list_sel().map(|entries| {
            for entry in &entries {
                Logger::log(&output, entry);
            }
            println!("{} entries", entries.len());
        }),
        Commands::Mc { command: McCommands::Info } => client.device_id().map(|id| {
            Logger::log(&output, &id);
            if let Ok(guid) = client.device_guid() {
                println!("GUID: {guid}");
            }
        }),
    };

    client.close()?;
    result
}

fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
