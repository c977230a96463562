use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::time::Duration;

use crate::config::Config;
use crate::modbus::RequestFrame;
use crate::services::DataService;

pub fn build_cli() -> Command {
    Command::new("soil-sensor")
        .version(crate::VERSION)
        .about("Reads humidity, temperature, EC and pH from an RS485 soil sensor over Modbus RTU")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Serial port name, overrides the UART index"),
        )
        .arg(
            Arg::new("uart")
                .long("uart")
                .value_name("INDEX")
                .value_parser(value_parser!(u8))
                .help("UART index used to derive the port name"),
        )
        .arg(
            Arg::new("tx-pin")
                .long("tx-pin")
                .value_name("PIN")
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("rx-pin")
                .long("rx-pin")
                .value_name("PIN")
                .value_parser(value_parser!(u8)),
        )
        .arg(
            Arg::new("baud")
                .short('b')
                .long("baud")
                .value_name("RATE")
                .value_parser(value_parser!(u32))
                .help("Baud rate (sensor default 4800)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("MS")
                .value_parser(value_parser!(u64))
                .help("Serial read timeout in milliseconds"),
        )
        .arg(
            Arg::new("parity")
                .long("parity")
                .value_parser(["none", "even", "odd"]),
        )
        .arg(
            Arg::new("verify-crc")
                .long("verify-crc")
                .action(ArgAction::SetTrue)
                .help("Reject responses whose CRC does not match"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(["console", "json", "csv"])
                .help("Output format"),
        )
        .arg(
            Arg::new("output-file")
                .short('o')
                .long("output-file")
                .value_name("FILE")
                .help("Append readings to this file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Debug logging, including raw frames"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("read").about("Run one request/response cycle"))
        .subcommand(
            Command::new("monitor")
                .about("Poll the sensor until Ctrl+C")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .value_parser(value_parser!(u64))
                        .help("Seconds between cycles"),
                ),
        )
        .subcommand(Command::new("frame").about("Print the request frame"))
        .subcommand(Command::new("ports").about("List available serial ports"))
        .subcommand(
            Command::new("init-config")
                .about("Write the default configuration to a file")
                .arg(Arg::new("path").required(true).value_name("PATH")),
        )
}

pub async fn handle_subcommands(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("init-config", sub)) => {
            let path = sub
                .get_one::<String>("path")
                .context("missing configuration path")?;
            Config::default().save_to_file(path)?;
            println!("✅ Default configuration written to {}", path);
        }
        Some(("ports", _)) => list_serial_ports()?,
        Some(("frame", _)) => {
            let config = Config::from_matches(matches)?;
            let frame = RequestFrame::build(&config.request);
            println!("📤 Request frame: {}", frame);
            println!("🔢 CRC: 0x{:04X} (low 0x{:02X}, high 0x{:02X})", frame.crc(), frame.crc() & 0xFF, frame.crc() >> 8);
        }
        Some(("read", _)) => {
            let config = Config::from_matches(matches)?;
            let mut service = DataService::from_config(&config)?;
            service.read_once().context("sensor read failed")?;
        }
        Some(("monitor", sub)) => {
            let mut config = Config::from_matches(matches)?;
            if let Some(&seconds) = sub.get_one::<u64>("interval") {
                config.polling.interval_seconds = seconds;
                config.validate()?;
            }

            let mut service = DataService::from_config(&config)?;
            let stats = service
                .run(Duration::from_secs(config.polling.interval_seconds))
                .await?;
            info!("👋 Monitor finished after {} cycles", stats.total_reads());
        }
        _ => unreachable!("clap enforces a subcommand"),
    }

    Ok(())
}

fn list_serial_ports() -> anyhow::Result<()> {
    let ports = serialport::available_ports().context("failed to enumerate serial ports")?;
    println!("📡 Available Serial Ports:");
    if ports.is_empty() {
        println!("   ⚠️  No serial ports found");
        return Ok(());
    }

    for (index, port) in ports.iter().enumerate() {
        println!("   {}. {}", index + 1, port.port_name);
        if let serialport::SerialPortType::UsbPort(usb_info) = &port.port_type {
            if let Some(manufacturer) = &usb_info.manufacturer {
                println!("      📱 Manufacturer: {}", manufacturer);
            }
            if let Some(serial_number) = &usb_info.serial_number {
                println!("      🔢 Serial Number: {}", serial_number);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParityConfig;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let matches = build_cli()
            .try_get_matches_from([
                "soil-sensor", "--port", "/dev/ttyUSB0", "--baud", "9600", "--tx-pin", "26",
                "--rx-pin", "25", "--parity", "even", "--verify-crc", "--format", "json", "read",
            ])
            .unwrap();

        let config = Config::from_matches(&matches).unwrap();
        assert_eq!(config.uart.port_name(), "/dev/ttyUSB0");
        assert_eq!(config.uart.baud_rate, 9600);
        assert_eq!(config.uart.tx_pin, 26);
        assert_eq!(config.uart.rx_pin, 25);
        assert_eq!(config.uart.parity, ParityConfig::Even);
        assert!(config.verify_response_crc);
        assert_eq!(config.output.format, "json");
        assert_eq!(config.uart.timeout_ms, 200);
    }

    #[test]
    fn test_config_file_is_read_before_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor.toml");
        std::fs::write(&path, "[uart]\nbaud_rate = 19200\nuart_index = 3\n").unwrap();

        let matches = build_cli()
            .try_get_matches_from(["soil-sensor", "--config", path.to_str().unwrap(), "--uart", "2", "frame"])
            .unwrap();
        let config = Config::from_matches(&matches).unwrap();
        assert_eq!(config.uart.baud_rate, 19200);
        assert_eq!(config.uart.uart_index, 2);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(build_cli().try_get_matches_from(["soil-sensor"]).is_err());
    }
}
