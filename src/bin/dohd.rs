use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use getopts::Options;

use dohd::dns::context::ServerContext;
use dohd::dns::doh::DohServer;

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

/// Main entry point for the dohd gateway
fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("v", "verbose", "log decoded queries and answers");
    opts.optopt(
        "u",
        "upstream",
        "Upstream DNS server to forward queries to (e.g. 1.1.1.1:53)",
        "ADDR",
    );
    opts.optopt("p", "port", "Port for the HTTP listener", "PORT");
    opts.optopt(
        "t",
        "timeout",
        "Per-operation upstream timeout in milliseconds",
        "MS",
    );

    let opt_matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => panic!("{}", f.to_string()),
    };

    if opt_matches.opt_present("h") {
        print_usage(&program, opts);
        return;
    }

    let mut context = ServerContext::default();
    context.verbose = opt_matches.opt_present("v");

    let level = if context.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level).expect("Failed to initialize logger");

    if let Some(upstream) = opt_matches.opt_str("u") {
        match upstream.parse::<SocketAddr>() {
            Ok(addr) => context.upstream = addr,
            Err(_) => {
                log::warn!(
                    "Upstream '{}' is not a valid socket address, keeping {}",
                    upstream,
                    context.upstream
                );
            }
        }
    }

    if let Some(port) = opt_matches.opt_str("p") {
        match port.parse::<u16>() {
            Ok(port) => context.http_port = port,
            Err(_) => {
                log::warn!(
                    "Port '{}' is not a valid port number, keeping {}",
                    port,
                    context.http_port
                );
            }
        }
    }

    if let Some(timeout) = opt_matches.opt_str("t") {
        match timeout.parse::<u64>() {
            Ok(ms) => context.timeout = std::time::Duration::from_millis(ms),
            Err(_) => {
                log::warn!(
                    "Timeout '{}' is not a valid millisecond count, keeping {:?}",
                    timeout,
                    context.timeout
                );
            }
        }
    }

    DohServer::new(Arc::new(context)).run_server();
}
