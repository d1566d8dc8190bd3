//! regman: snapshot a Docker registry's repositories and tags

use regman::cli::{Args, Runner};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args().from_env();
    let runner = Runner::new(args);

    match runner.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            runner.logger().error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
