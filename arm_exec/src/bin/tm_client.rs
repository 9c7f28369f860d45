//! # Telemetry client
//!
//! Polls the arm's telemetry server and logs the joint and gripper commands each record would
//! produce for the physical arm. Reconnects whenever the connection is lost.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::{
    io::{self, BufRead, BufReader, Write},
    net::TcpStream,
    thread,
    time::Duration,
};
use structopt::StructOpt;

// Internal
use comms_if::{
    net::{self, NetParams},
    tm::{ArmTm, TmParseError},
};
use util::{
    logger::{logger_init, LogParams},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time to wait before reconnecting after a failure.
const RECONNECT_PERIOD: Duration = Duration::from_secs(2);

/// Time to wait for a response before treating the connection as lost.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Telemetry client
#[derive(Debug, StructOpt)]
#[structopt(name = "tm_client")]
struct Opts {
    /// Server to connect to, overrides the endpoint in net.toml
    #[structopt(long)]
    endpoint: Option<String>,

    /// Period between requests in milliseconds
    #[structopt(long, default_value = "20")]
    period_ms: u64,

    /// Log level
    #[structopt(long, default_value = "info")]
    log_level: String,
}

/// One open connection to the server.
struct Connection {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Failures which end a connection.
#[derive(Debug, thiserror::Error)]
enum PollError {
    #[error("Connection failed: {0}")]
    Io(#[from] io::Error),

    #[error("Could not parse telemetry record: {0}")]
    Parse(#[from] TmParseError),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    let session = Session::new("tm_client", "sessions")
        .wrap_err("Failed to create the session")?;

    let log_params = LogParams {
        level: opts.log_level.clone(),
        ..Default::default()
    };
    logger_init(&log_params, &session).wrap_err("Failed to initialise logging")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let endpoint = opts.endpoint.clone().unwrap_or(net_params.tm_endpoint);
    let period = Duration::from_millis(opts.period_ms);

    info!("Telemetry client polling {} every {:?}", endpoint, period);

    let mut last_seq = None;

    loop {
        let mut conn = match Connection::open(&endpoint) {
            Ok(c) => {
                info!("Connected to {}", endpoint);
                c
            }
            Err(e) => {
                warn!("{}, retrying in {:?}", e, RECONNECT_PERIOD);
                thread::sleep(RECONNECT_PERIOD);
                continue;
            }
        };

        loop {
            match conn.poll(&net_params.tm_request) {
                Ok(tm) => {
                    handle_tm(&tm, last_seq);
                    last_seq = Some(tm.seq);
                }
                Err(e) => {
                    warn!(
                        "Dropping connection to {} ({}), reconnecting in {:?}",
                        endpoint, e, RECONNECT_PERIOD
                    );
                    thread::sleep(RECONNECT_PERIOD);
                    break;
                }
            }

            thread::sleep(period);
        }
    }
}

/// Log the commands the record would produce.
fn handle_tm(tm: &ArmTm, last_seq: Option<u64>) {
    if last_seq == Some(tm.seq) {
        debug!("No new telemetry since seq {}", tm.seq);
        return;
    }

    info!(
        "seq {} ts {:.3}: joints {:?} mdeg, jaw {}",
        tm.seq,
        tm.ts_s,
        tm.target_mdeg(),
        tm.jaw_cmd()
    );
}

impl Connection {
    fn open(endpoint: &str) -> Result<Self, net::NetError> {
        let stream = net::connect(endpoint)?;

        let configure = |s: &TcpStream| -> io::Result<TcpStream> {
            s.set_read_timeout(Some(RESPONSE_TIMEOUT))?;
            s.try_clone()
        };
        let writer =
            configure(&stream).map_err(|e| net::NetError::ConnectError(endpoint.into(), e))?;

        Ok(Self {
            writer,
            reader: BufReader::new(stream),
        })
    }

    /// Request one record and parse it.
    fn poll(&mut self, token: &str) -> Result<ArmTm, PollError> {
        let line = self.request(token)?;
        Ok(ArmTm::from_record(&line)?)
    }

    /// Send one request and wait for its response line.
    fn request(&mut self, token: &str) -> io::Result<String> {
        self.writer.write_all(format!("{}\n", token).as_bytes())?;
        self.writer.flush()?;

        let mut line = String::new();
        match self.reader.read_line(&mut line)? {
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )),
            _ => Ok(line),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;

    /// Serve one peer, answering each request with the next of `responses`.
    fn serve(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);

            for response in responses {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    return;
                }
                writer.write_all(response.as_bytes()).unwrap();
            }
        });

        endpoint
    }

    #[test]
    fn test_poll_parses_record() {
        let endpoint = serve(vec![
            "{\"seq\":3,\"ts\":0.5,\"target_deg\":[1,2,3,4,5,6],\"current_deg\":[0,0,0,0,0,0],\"piper_jaw\":10}\n",
        ]);
        let mut conn = Connection::open(&endpoint).unwrap();

        let tm = conn.poll("get").unwrap();
        assert_eq!(tm.seq, 3);
        assert_eq!(tm.jaw_cmd(), 10);
    }

    #[test]
    fn test_bad_record_ends_connection() {
        let endpoint = serve(vec!["not a record\n"]);
        let mut conn = Connection::open(&endpoint).unwrap();

        match conn.poll("get") {
            Err(PollError::Parse(_)) => (),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_server_ends_connection() {
        let endpoint = serve(vec![]);
        let mut conn = Connection::open(&endpoint).unwrap();

        match conn.poll("get") {
            Err(PollError::Io(_)) => (),
            other => panic!("expected an io error, got {:?}", other),
        }
    }
}
