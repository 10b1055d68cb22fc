//! unimacd - UniMAC switch port/VLAN manager
//!
//! Loads the switch config, initializes the manager against the simulated
//! QuarterDeck backend and applies the requested operation.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qd_hal::SimulatedSwitch;
use unimac_mgr::audit::{AuditCategory, AuditOutcome, AuditRecord};
use unimac_mgr::{
    audit_log, NetConfigStore, UnimacConfig, UnmManager, UnmResult, DEFAULT_CONFIG_PATH,
};
use unimac_types::{PortId, PortSet, VlanId};

/// UniMAC switch port/VLAN manager
#[derive(Parser, Debug)]
#[command(name = "unimacd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG when absent
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the port-to-VLAN map and VLAN membership
    Show {
        /// Print the full table snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move ports between VLANs, e.g. `move 0=2 3=disabled`
    Move {
        #[arg(required = true, value_parser = parse_move)]
        moves: Vec<(PortId, VlanId)>,
    },
    /// Rewrite the port groups of a VLAN, e.g. `create 2 1,2,3`
    Create {
        vid: VlanId,
        ports: PortSet,
    },
}

fn parse_move(s: &str) -> Result<(PortId, VlanId), String> {
    let (port, vid) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <port>=<vid>, got \"{}\"", s))?;
    let port = port.parse().map_err(|e| format!("{}", e))?;
    let vid = vid.parse().map_err(|e| format!("{}", e))?;
    Ok((port, vid))
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("unimacd failed: {}", e);
            let status = e.status();
            eprintln!("unimacd: {} ({}, 0x{:02x})", e, status, status.as_raw());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> UnmResult<()> {
    let config = UnimacConfig::load_or_default(&args.config)?;
    config.validate()?;
    let layout = config.layout()?;

    let store = Arc::new(NetConfigStore::new());
    let net_config = config.net_config(&layout)?;
    let source = if net_config.is_some() { "config" } else { "board default" };
    if let Some(net_config) = net_config {
        store.set(net_config);
    }
    audit_log!(AuditRecord::new(
        AuditCategory::ConfigurationChange,
        "unimacd",
        "load_config"
    )
    .with_outcome(AuditOutcome::Success)
    .with_object_id(args.config.display().to_string())
    .with_details(json!({
        "board": config.switch.board.as_str(),
        "layout": layout.to_string(),
        "netconf": source,
    })));

    info!("Starting unimacd: board {}, {}", config.switch.board, layout);

    let fallback = config.switch.board.default_config_for(&layout);
    let switch = Arc::new(SimulatedSwitch::new(layout.num_ports()));
    let manager = UnmManager::new(layout, switch, store.clone()).with_fallback(fallback.clone());
    manager.initialize()?;
    manager.sync_vlans()?;

    let names = |vid: VlanId| {
        store
            .vlan_name(vid)
            .or_else(|| fallback.vlans.get(&vid).map(|vlan| vlan.name.clone()))
            .unwrap_or_default()
    };

    match &args.command {
        None | Some(Command::Show { json: false }) => show(&manager, names),
        Some(Command::Show { json: true }) => show_json(&manager),
        Some(Command::Move { moves }) => {
            for (port, vid) in moves {
                manager.move_port(*port, *vid)?;
            }
            show(&manager, names)
        }
        Some(Command::Create { vid, ports }) => {
            manager.create_vlan(*vid, *ports)?;
            show(&manager, names)
        }
    }
}

fn show(manager: &UnmManager, vlan_name: impl Fn(VlanId) -> String) -> UnmResult<()> {
    let snapshot = manager.snapshot()?;

    println!("{}", snapshot.layout);
    println!("{:<6} {:<10}", "PORT", "VLAN");
    for (port, vid) in &snapshot.vid_of_port {
        println!("{:<6} {:<10}", port.to_string(), vlan_label(*vid));
    }

    println!();
    println!("{:<10} {:<8} {:<6} {}", "VLAN", "NAME", "PORTS", "MEMBERS");
    for (vid, vlan) in &snapshot.vlans {
        println!(
            "{:<10} {:<8} {:<6} {}",
            vlan_label(*vid),
            vlan_name(*vid),
            vlan.count,
            vlan.members
        );
    }

    println!();
    println!("user VLANs: {}", snapshot.number_of_vids);
    println!("cpu port mask: {}", snapshot.cpu_port_mask);
    Ok(())
}

fn show_json(manager: &UnmManager) -> UnmResult<()> {
    let snapshot = manager.snapshot()?;
    let out = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| unimac_mgr::UnmError::config(format!("Failed to serialize snapshot: {}", e)))?;
    println!("{}", out);
    Ok(())
}

fn vlan_label(vid: VlanId) -> String {
    if vid.is_disabled() {
        "disabled".to_string()
    } else if vid.is_isolated() {
        "isolated".to_string()
    } else {
        vid.to_string()
    }
}
