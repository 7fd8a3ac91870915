use crate::runtime::error::RuntimeError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub show_help: bool,
    /// Simulated seconds to run.
    pub run_seconds: f64,
    pub time_step_us: u64,
    /// Desired world position, z down.
    pub target: [f64; 3],
    pub start_depth: Option<f64>,
    pub vehicle_config: Option<PathBuf>,
    pub record_path: Option<PathBuf>,
    /// Simulated seconds between progress reports.
    pub report_every_s: f64,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: 10.0,
            time_step_us: 4_000,
            target: [0.0, 0.0, 2.0],
            start_depth: None,
            vehicle_config: None,
            record_path: None,
            report_every_s: 1.0,
            json_logs: false,
            log_dir: None,
        }
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &'static str) -> Result<&'a str, RuntimeError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or(RuntimeError::MissingValue(flag))
}

fn number(flag: &'static str, raw: &str) -> Result<f64, RuntimeError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(RuntimeError::InvalidValue {
            flag,
            value: raw.to_string(),
        }),
    }
}

fn parse_target(raw: &str) -> Result<[f64; 3], RuntimeError> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return Err(RuntimeError::InvalidValue {
            flag: "--target",
            value: raw.to_string(),
        });
    }
    Ok([
        number("--target", parts[0])?,
        number("--target", parts[1])?,
        number("--target", parts[2])?,
    ])
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, RuntimeError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    /// `args[0]` is the program name.
    pub fn from_args(args: &[String]) -> Result<Self, RuntimeError> {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-seconds" => {
                    let seconds = number("--run-seconds", value(args, i, "--run-seconds")?)?;
                    if seconds < 0.0 {
                        return Err(RuntimeError::InvalidValue {
                            flag: "--run-seconds",
                            value: seconds.to_string(),
                        });
                    }
                    cfg.run_seconds = seconds;
                    i += 1;
                }
                "--time-step-us" => {
                    let raw = value(args, i, "--time-step-us")?;
                    cfg.time_step_us = match raw.parse::<u64>() {
                        Ok(us) if us > 0 => us,
                        _ => {
                            return Err(RuntimeError::InvalidValue {
                                flag: "--time-step-us",
                                value: raw.to_string(),
                            })
                        }
                    };
                    i += 1;
                }
                "--target" => {
                    cfg.target = parse_target(value(args, i, "--target")?)?;
                    i += 1;
                }
                "--start-depth" => {
                    cfg.start_depth = Some(number("--start-depth", value(args, i, "--start-depth")?)?);
                    i += 1;
                }
                "--vehicle-config" => {
                    cfg.vehicle_config = Some(PathBuf::from(value(args, i, "--vehicle-config")?));
                    i += 1;
                }
                "--record" => {
                    cfg.record_path = Some(PathBuf::from(value(args, i, "--record")?));
                    i += 1;
                }
                "--report-every" => {
                    let every = number("--report-every", value(args, i, "--report-every")?)?;
                    if every <= 0.0 {
                        return Err(RuntimeError::InvalidValue {
                            flag: "--report-every",
                            value: every.to_string(),
                        });
                    }
                    cfg.report_every_s = every;
                    i += 1;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--log-dir" => {
                    cfg.log_dir = Some(PathBuf::from(value(args, i, "--log-dir")?));
                    i += 1;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                other => return Err(RuntimeError::UnknownArgument(other.to_string())),
            }
            i += 1;
        }
        Ok(cfg)
    }

    pub fn print_help() {
        println!(
            r#"uuv-sim - Headless underwater vehicle simulation

USAGE:
    uuv-sim [OPTIONS]

OPTIONS:
    --run-seconds <SECS>      Simulated duration [default: 10]
    --time-step-us <US>       Physics step in microseconds [default: 4000]
    --target <X,Y,Z>          Desired world position, z down [default: 0,0,2]
    --start-depth <M>         Initial depth of the vehicle [default: 0]
    --vehicle-config <PATH>   Vehicle description (JSON); built-in 8-thruster hull otherwise
    --record <PATH>           Write sensor and motor telemetry to a JSONL file
    --report-every <SECS>     Simulated seconds between progress logs [default: 1]
    --json-logs               Output logs in JSON format (for log aggregation)
    --log-dir <DIR>           Also write JSON logs to a daily rotated file in DIR
    -h, --help                Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log filter (e.g., RUST_LOG=debug,uuv_core=trace)

EXAMPLES:
    # Dive to 5 m and hold for a minute
    uuv-sim --target 0,0,5 --run-seconds 60

    # Record telemetry for offline analysis
    uuv-sim --run-seconds 30 --record /tmp/dive.jsonl --json-logs
"#
        );
    }
}
