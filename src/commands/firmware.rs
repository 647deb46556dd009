//! Commands talking to the firmware over the serial port

use std::path::Path;
use std::time::Duration;

use kitcommander_core::kit::{FirmwareFunction, ProtocolId};
use kitcommander_kit::{setup_kit, FirmwareSession, ProgramStrategy, SetupOptions};
use kitcommander_serial::{DriverConfig, FirmwareCommand, SerialTransport};

use super::kit::spinner;
use super::Context;
use crate::cli::LinkArgs;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open a session, either on `--port` or by setting the kit up first
fn open_session(
    ctx: &Context<'_>,
    link: &LinkArgs,
    protocol: ProtocolId,
    default_function: FirmwareFunction,
) -> Result<FirmwareSession<SerialTransport>, Box<dyn std::error::Error>> {
    let timeout = Duration::from_secs(link.timeout);

    if let Some(port) = &link.port {
        let baud = link.baud.unwrap_or(protocol.default_baud());
        let transport = SerialTransport::open(port, baud, timeout)?;
        return Ok(FirmwareSession::new(protocol, transport, DriverConfig::default())?);
    }

    let options = SetupOptions {
        skip_programming: link.skip_programming,
        firmware_dir: ctx.firmware_dir.to_path_buf(),
        programmer: link.kit.programmer.clone(),
        pack_dir: ctx.pack_dir(link.kit.pack_dir.as_deref()),
        strategy: ProgramStrategy::Cached,
    };
    let function = link.function.unwrap_or(default_function);

    let pb = spinner(format!("Setting up kit for {}...", function));
    let result = setup_kit(ctx.db, function, &options, None);
    pb.finish_and_clear();
    let setup = result?;

    if setup.protocol_id() != Some(protocol) {
        return Err(format!(
            "'{}' firmware does not speak {} (got {:?})",
            function,
            protocol,
            setup.protocol_id()
        )
        .into());
    }
    match link.baud {
        Some(baud) => {
            let port = setup.port.as_deref().ok_or("kit has no accessible serial port")?;
            let transport = SerialTransport::open(port, baud, timeout)?;
            Ok(FirmwareSession::new(protocol, transport, DriverConfig::default())?)
        }
        None => Ok(setup.connect(timeout)?),
    }
}

/// Send one command to the provisioning firmware
pub fn run_command(
    ctx: &Context<'_>,
    link: &LinkArgs,
    name: &str,
    args: &[String],
    blob: Option<&Path>,
) -> CmdResult {
    let session = open_session(ctx, link, ProtocolId::ProvisioningV2, FirmwareFunction::IotProvision)?;
    let FirmwareSession::Provisioning(mut driver) = session else {
        return Err("not a provisioning firmware session".into());
    };

    let mut cmd = FirmwareCommand::new(name).args(args.iter().cloned());
    if let Some(path) = blob {
        cmd = cmd.blob(std::fs::read(path)?);
    }

    let response = driver.firmware_command(&cmd)?;
    if !response.is_empty() {
        println!("{}", response);
    }
    Ok(())
}

/// Synchronize with the provisioning firmware and print its version
pub fn run_ping(ctx: &Context<'_>, link: &LinkArgs) -> CmdResult {
    let session = open_session(ctx, link, ProtocolId::ProvisioningV2, FirmwareFunction::IotProvision)?;
    let FirmwareSession::Provisioning(mut driver) = session else {
        return Err("not a provisioning firmware session".into());
    };

    driver.synchronize()?;
    println!("Firmware is alive (sequence {})", driver.sequence_number());

    match driver.command("MC+VERSION", &["FIRMWARE"]) {
        Ok(version) => println!("Firmware version: {}", version),
        Err(e) => log::warn!("Unable to read firmware version: {}", e),
    }
    Ok(())
}

/// Send one command to a demo application
pub fn run_demo_command(
    ctx: &Context<'_>,
    link: &LinkArgs,
    name: &str,
    args: &[String],
) -> CmdResult {
    let mut session = open_session(ctx, link, ProtocolId::WxDemoV1, FirmwareFunction::DemoAws)?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let response = session.request(name, &args)?;
    print!("{}", response);
    Ok(())
}
