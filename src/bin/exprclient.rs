use std::{error::Error, process::ExitCode, time::Duration};

use clap::Parser;
use exprclient::{
    Session,
    connection::{self, ConnectOptions, DEFAULT_PORT},
};
use log::{error, warn};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port of the evaluator service
    #[arg(short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Connect over TLS, the only supported transport
    #[arg(short = 's')]
    tls: bool,
    /// Accept any server certificate
    #[arg(long)]
    insecure: bool,
    /// Socket read/write timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Host name of the evaluator service
    host: String,
    /// Identity token sent in the greeting
    token: String,
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    if !cli.tls {
        eprintln!("only TLS connections are supported, pass -s");
        return Ok(ExitCode::FAILURE);
    }

    let options = ConnectOptions {
        port: cli.port,
        verify_certificates: !cli.insecure,
        timeout: cli.timeout.map(Duration::from_secs),
    };

    let mut stream = match connection::connect(&cli.host, &options) {
        Ok(stream) => stream,
        Err(e) => {
            error!("{e}");
            eprintln!("Connection failed.");
            return Ok(ExitCode::FAILURE);
        }
    };

    let farewell = Session::new(&mut stream, cli.token).run()?;
    println!("{}", farewell.line);

    if let Err(e) = connection::close(&mut stream) {
        warn!("failed to close connection cleanly: {e}");
    }

    Ok(ExitCode::SUCCESS)
}
