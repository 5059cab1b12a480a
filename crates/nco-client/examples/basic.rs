//! Basic connect, query and close against the in-memory transport.
//!
//! # Running
//!
//! ```bash
//! cargo run -p nco-client --example basic
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use nco_client::{Config, Context, Error, TdsConnector, Value};
use nco_testing::{MockResponse, MockTransport};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let transport = MockTransport::builder()
        .with_response(
            "select Node, Severity from alerts.status",
            MockResponse::rows(
                ["Node", "Severity"],
                vec![
                    vec![Value::from("edge-router-1\0"), Value::Int(5)],
                    vec![Value::from("core-switch-2\0"), Value::Int(3)],
                ],
            ),
        )
        .build();

    let config = Config::from_connection_string(
        "Server=omnihost;Port=4100;User Id=root;Password=;App=basic-example",
    )?;
    let connector = TdsConnector::from_config(transport, &config);

    println!("Connecting to {}...", config.address);
    let conn = connector
        .connect_config(&Context::background(), &config)
        .await?;

    let ctx = Context::with_timeout(Duration::from_secs(5));
    let result = conn
        .execute(&ctx, &"select Node, Severity from alerts.status".into())
        .await?;

    println!("{}", result.rows.columns.join(" | "));
    for i in 0..result.rows.len() {
        let node = result.rows.get(i, "Node").and_then(Value::as_str).unwrap_or("");
        let severity = result.rows.get(i, "Severity").and_then(Value::as_i64);
        match severity {
            Some(severity) => println!("{node} | {severity}"),
            None => println!("{node} | NULL"),
        }
    }
    println!("Rows affected: {}", result.affected_rows);

    conn.close().await?;
    Ok(())
}
